use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff for downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Limit on each connect or read; a stalled body fails the attempt.
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            timeout_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(32) as u32;
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Blocking HTTP downloader with size verification, bounded retries and
/// cooperative cancellation.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    cancel: Arc<AtomicBool>,
    progress: bool,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("rolbearing/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_millis(policy.timeout_ms))
            .timeout(Duration::from_millis(policy.timeout_ms))
            .build()
            .map_err(|source| Error::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            policy,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: true,
        })
    }

    /// Share a cancel flag (set from a Ctrl-C handler).
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Size announced by a HEAD request, if the server reports one.
    pub fn expected_size(&self, url: &str) -> Result<Option<u64>> {
        let resp = self.client.head(url).send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        if matches!(status.as_u16(), 403 | 405 | 501) {
            log::debug!("HEAD not allowed for {url} ({status}), size unknown");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok()))
    }

    /// Download `url` to `dir/file_name` unless a correctly sized copy is
    /// already there. Transient failures and size mismatches are retried
    /// with backoff; the last error is reported once attempts run out.
    pub fn fetch(&self, url: &str, dir: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let path = dir.join(file_name);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.try_fetch(url, &path) {
                Ok(()) => return Ok(path),
                Err(err) => err,
            };
            if self.cancelled() && !matches!(err, Error::Interrupted { .. }) {
                log::warn!("Download stopped manually after: {err}");
                return Err(Error::Interrupted { path });
            }
            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= self.policy.max_attempts {
                return Err(Error::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            let delay = self.policy.delay(attempt);
            log::warn!(
                "Download of {file_name} failed ({err}); attempt {}/{} in {delay:?}",
                attempt + 1,
                self.policy.max_attempts
            );
            if !self.pause(delay) {
                return Err(Error::Interrupted { path });
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Sleep for `delay` in short slices; `false` if cancelled meanwhile.
    fn pause(&self, delay: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(50);
        let mut left = delay;
        while !left.is_zero() {
            if self.cancelled() {
                return false;
            }
            let step = left.min(SLICE);
            std::thread::sleep(step);
            left -= step;
        }
        !self.cancelled()
    }

    /// Per-file download of `names` under `base_url`, skipping files already
    /// on disk with the right size.
    pub fn fetch_all(&self, base_url: &str, dir: &Path, names: &[String]) -> Result<Vec<PathBuf>> {
        let base = base_url.trim_end_matches('/');
        names
            .iter()
            .map(|name| self.fetch(&format!("{base}/{name}"), dir, name))
            .collect()
    }

    fn try_fetch(&self, url: &str, path: &Path) -> Result<()> {
        let expected = self.expected_size(url)?;

        if let Ok(meta) = std::fs::metadata(path) {
            match expected {
                Some(size) if size == meta.len() => {
                    log::info!("{} already downloaded", path.display());
                    return Ok(());
                }
                None => {
                    log::info!("{} present, size unknown upstream; keeping it", path.display());
                    return Ok(());
                }
                Some(size) => {
                    log::warn!(
                        "{} has {} bytes, expected {size}; downloading again",
                        path.display(),
                        meta.len()
                    );
                    std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
                }
            }
        }

        if let Err(err) = self.stream(url, path, expected) {
            let _ = std::fs::remove_file(path);
            return Err(err);
        }

        if let Some(size) = expected {
            let actual = std::fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
            if actual != size {
                std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
                return Err(Error::SizeMismatch {
                    path: path.to_path_buf(),
                    expected: size,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn stream(&self, url: &str, path: &Path, expected: Option<u64>) -> Result<()> {
        let mut resp = self.client.get(url).send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        if !resp.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let total = expected.or_else(|| {
            resp.headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        });
        let bar = self.progress_bar(total, path);
        log::info!("Downloading {url} -> {}", path.display());

        let mut file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            if self.cancelled() {
                bar.abandon_with_message("interrupted");
                log::warn!("Download stopped manually: {}", path.display());
                return Err(Error::Interrupted {
                    path: path.to_path_buf(),
                });
            }
            let n = resp.read(&mut buf).map_err(|e| Error::io(path, e))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(|e| Error::io(path, e))?;
            bar.inc(n as u64);
        }
        file.flush().map_err(|e| Error::io(path, e))?;
        bar.finish_and_clear();
        log::info!("The file has been downloaded to {}", path.display());
        Ok(())
    }

    fn progress_bar(&self, total: Option<u64>, path: &Path) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1000,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(800));
        assert_eq!(policy.delay(5), Duration::from_millis(1000));
        assert_eq!(policy.delay(60), Duration::from_millis(1000));
    }

    #[test]
    fn retry_policy_fills_missing_fields_from_default() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay_ms, RetryPolicy::default().base_delay_ms);
        assert_eq!(policy.timeout_ms, 30_000);
    }

    #[test]
    fn pause_returns_early_once_cancelled() {
        let fetcher = Fetcher::new(RetryPolicy::default())
            .unwrap()
            .with_cancel(Arc::new(AtomicBool::new(true)));
        let started = std::time::Instant::now();
        assert!(!fetcher.pause(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
