use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Errors raised along the acquisition path: retrieval, extraction,
/// metadata generation and signal loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("size mismatch for {path}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: usize,
        last: Box<Error>,
    },

    #[error("download of {path} interrupted")]
    Interrupted { path: PathBuf },

    #[error("archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("MAT file {path}: {message}")]
    Mat { path: PathBuf, message: String },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("metadata {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("raw file for '{key}' not found at {path}")]
    MissingRawFile { key: String, path: PathBuf },

    #[error("signal file {path}: {message}")]
    Signal { path: PathBuf, message: String },

    #[error("no signal matching '{selector}' in {path}")]
    MissingSignal { path: PathBuf, selector: String },

    #[error("trace for '{key}' has {len} samples, need at least {sample_size}")]
    ShortTrace {
        key: String,
        len: usize,
        sample_size: usize,
    },

    #[error("row width {actual} does not match signal matrix width {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Archive {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether a retrieval failure may succeed when attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http { source, .. } => {
                source.is_timeout()
                    || source.is_connect()
                    || source.is_body()
                    || source.is_request()
            }
            Error::HttpStatus { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            Error::SizeMismatch { .. } | Error::Io { .. } => true,
            _ => false,
        }
    }
}
