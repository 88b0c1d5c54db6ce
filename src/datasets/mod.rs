/// Dataset loaders.
///
/// Every public bearing dataset is described by a [`Dataset`]: where its
/// raw files come from, how file names become labels, which signal to read
/// from each file and how to cut it into windows. [`DatasetLoader`] drives
/// the shared pipeline on top of those hooks:
///
/// ```text
///   download ──▶ extract ──▶ metadata csv ──▶ load_acquisitions ──▶ cache
///   (Fetcher)    (archive)   (generate)       (read + window)
/// ```
pub mod cwru;
pub mod hust;
pub mod mfpt;
pub mod ottawa;
pub mod paderborn;
pub mod xjut;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::loader::{self, Channel};
use crate::data::metadata::{self, MetadataSpec};
use crate::data::model::{Acquisitions, BearingRecord};
use crate::data::window::WindowStrategy;
use crate::error::{Error, Result};
use crate::fetch::{self, Fetcher};

pub use cwru::Cwru;
pub use hust::Hust;
pub use mfpt::Mfpt;
pub use ottawa::Ottawa;
pub use paderborn::Paderborn;
pub use xjut::Xjut;

/// Default acquisition window length.
pub const DEFAULT_SAMPLE_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Dataset description
// ---------------------------------------------------------------------------

/// A file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub file_name: String,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

/// Where raw files come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Archives saved in the raw directory, then extracted into the files
    /// directory keeping members that match `members`. Continuation volumes
    /// of a multi-part RAR are downloaded but only the first part is opened.
    Archives {
        files: Vec<RemoteFile>,
        members: Regex,
    },
    /// Raw files under one base URL, saved straight into the files
    /// directory.
    Files { base_url: String, names: Vec<String> },
}

/// How the metadata table is produced.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    /// Derived from the extracted file names.
    Generated(MetadataSpec),
    /// Fixed table shipped with the crate.
    Table {
        headers: Vec<String>,
        records: Vec<BearingRecord>,
    },
}

/// How a class label is derived from a metadata row.
#[derive(Debug, Clone)]
pub enum LabelRule {
    /// The composite key itself.
    FullKey,
    /// First character of the composite key (`IR007,0` -> `I`).
    FirstChar,
    /// One label column.
    Field(usize),
    /// A capture group of a regex applied to the composite key.
    Capture { pattern: Regex, group: usize },
}

impl LabelRule {
    pub fn label(&self, record: &BearingRecord) -> Option<String> {
        match self {
            LabelRule::FullKey => Some(record.key()),
            LabelRule::FirstChar => record.key().chars().next().map(String::from),
            LabelRule::Field(i) => record.labels.get(*i).cloned(),
            LabelRule::Capture { pattern, group } => pattern
                .captures(&record.key())
                .and_then(|caps| caps.get(*group))
                .map(|m| m.as_str().to_string()),
        }
    }
}

/// Per-dataset hooks. Everything else is shared by [`DatasetLoader`].
pub trait Dataset: Send + Sync {
    /// Short lowercase name used for directories and metadata files.
    fn name(&self) -> &str;

    fn source(&self) -> &Source;

    fn metadata(&self) -> &MetadataSource;

    /// Channel selectors handed to [`loader::read_channels`].
    fn channels(&self) -> &[Regex];

    fn label_rule(&self) -> &LabelRule;

    fn window(&self) -> WindowStrategy {
        WindowStrategy::Truncate
    }

    /// Labels counted as healthy when binarizing.
    fn healthy_labels(&self) -> Vec<String> {
        vec!["N".to_string()]
    }

    /// Files that lack one of the channels are skipped instead of failing.
    fn skip_incomplete(&self) -> bool {
        false
    }

    /// Number of channels per window row.
    fn channel_count(&self) -> usize {
        self.channels().len().max(1)
    }

    /// Read the selected channels of one raw file. Every selector must
    /// match.
    fn read_signal(&self, path: &Path) -> Result<Vec<Channel>> {
        let channels = loader::read_channels(path, self.channels())?;
        if let Some(missing) = self
            .channels()
            .iter()
            .find(|sel| !channels.iter().any(|c| sel.is_match(&c.name)))
        {
            return Err(Error::MissingSignal {
                path: path.to_path_buf(),
                selector: missing.to_string(),
            });
        }
        Ok(channels)
    }

    /// Fetch and unpack the raw files, then write the metadata table.
    fn download(&self, layout: &DatasetLayout, fetcher: &Fetcher) -> Result<()> {
        let files_dir = layout.files_dir();
        match self.source() {
            Source::Files { base_url, names } => {
                fetcher.fetch_all(base_url, &files_dir, names)?;
            }
            Source::Archives { files, members } => {
                let raw_dir = layout.raw_dir();
                for file in files {
                    fetcher.fetch(&file.url, &raw_dir, &file.file_name)?;
                }
                for file in files.iter().filter(|f| !is_continuation_volume(&f.file_name)) {
                    fetch::extract(&raw_dir.join(&file.file_name), &files_dir, members, false)?;
                }
            }
        }
        self.write_metadata(layout)?;
        Ok(())
    }

    /// (Re)build `<name>_bearings.csv`. Returns the number of rows.
    fn write_metadata(&self, layout: &DatasetLayout) -> Result<usize> {
        let out = layout.metadata_path();
        match self.metadata() {
            MetadataSource::Generated(spec) => metadata::generate(&layout.files_dir(), &out, spec),
            MetadataSource::Table { headers, records } => {
                metadata::write_records(&out, headers, records)?;
                log::info!("Metadata file {} written ({} rows)", out.display(), records.len());
                Ok(records.len())
            }
        }
    }
}

/// `true` for `.part02.rar` and later volumes.
pub fn is_continuation_volume(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    let Some(stem) = lower.strip_suffix(".rar") else {
        return false;
    };
    stem.rsplit_once(".part")
        .and_then(|(_, n)| n.parse::<u32>().ok())
        .is_some_and(|n| n > 1)
}

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------

/// Directory layout of one dataset under a data root:
///
/// ```text
///  <root>/data/<name>_raw/                    downloads
///  <root>/data/<name>_raw/<name>_bearing/     raw signal files
///  <root>/dataset_metadata/<name>_bearings.csv
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    name: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("data").join(format!("{}_raw", self.name))
    }

    pub fn files_dir(&self) -> PathBuf {
        self.raw_dir().join(format!("{}_bearing", self.name))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root
            .join("dataset_metadata")
            .join(format!("{}_bearings.csv", self.name))
    }
}

// ---------------------------------------------------------------------------
// DatasetLoader
// ---------------------------------------------------------------------------

/// Shared loading pipeline with an in-memory acquisition cache.
pub struct DatasetLoader {
    dataset: Box<dyn Dataset>,
    layout: DatasetLayout,
    sample_size: usize,
    cache: Option<Acquisitions>,
}

impl DatasetLoader {
    pub fn new(dataset: Box<dyn Dataset>, root: impl Into<PathBuf>) -> Self {
        let layout = DatasetLayout::new(root, dataset.name());
        Self {
            dataset,
            layout,
            sample_size: DEFAULT_SAMPLE_SIZE,
            cache: None,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.set_sample_size(sample_size);
        self
    }

    pub fn dataset(&self) -> &dyn Dataset {
        self.dataset.as_ref()
    }

    pub fn name(&self) -> &str {
        self.dataset.name()
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Change the window length. A cached matrix has the old width, so it
    /// is dropped.
    pub fn set_sample_size(&mut self, sample_size: usize) {
        if sample_size != self.sample_size {
            self.cache = None;
        }
        self.sample_size = sample_size;
    }

    pub fn healthy_labels(&self) -> BTreeSet<String> {
        self.dataset.healthy_labels().into_iter().collect()
    }

    /// Metadata table and raw-file directory are both present.
    pub fn is_downloaded(&self) -> bool {
        self.layout.metadata_path().is_file() && self.layout.files_dir().is_dir()
    }

    pub fn download(&self, fetcher: &Fetcher) -> Result<()> {
        log::info!("Preparing dataset {}", self.name());
        self.dataset.download(&self.layout, fetcher)
    }

    pub fn write_metadata(&self) -> Result<usize> {
        self.dataset.write_metadata(&self.layout)
    }

    /// Rows of the metadata table.
    pub fn get_bearings(&self) -> Result<Vec<BearingRecord>> {
        metadata::read_records(&self.layout.metadata_path())
    }

    /// Composite key and raw-file path per metadata row, in table order.
    pub fn get_files_path(&self) -> Result<Vec<(String, PathBuf)>> {
        let files_dir = self.layout.files_dir();
        Ok(self
            .get_bearings()?
            .into_iter()
            .map(|r| (r.key(), files_dir.join(&r.file)))
            .collect())
    }

    /// Read every raw file and build a fresh acquisition matrix. Fails
    /// before reading anything if a metadata row points at a missing file.
    pub fn load_acquisitions(&self) -> Result<Acquisitions> {
        let files_dir = self.layout.files_dir();
        let records = self.get_bearings()?;
        let rule = self.dataset.label_rule();

        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let path = files_dir.join(&record.file);
            if !path.is_file() {
                return Err(Error::MissingRawFile {
                    key: record.key(),
                    path,
                });
            }
            let label = rule.label(record).ok_or_else(|| {
                Error::metadata(
                    self.layout.metadata_path(),
                    format!("no label for row '{record}' under {rule:?}"),
                )
            })?;
            entries.push((record.key(), label, path));
        }

        let window = self.dataset.window();
        let mut acq = Acquisitions::new(self.sample_size * self.dataset.channel_count());
        for (key, label, path) in entries {
            let channels = match self.dataset.read_signal(&path) {
                Ok(channels) => channels,
                Err(err @ Error::MissingSignal { .. }) if self.dataset.skip_incomplete() => {
                    log::warn!("Skipping {key}: {err}");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let rows = window.windows(&key, &channels, self.sample_size)?;
            log::debug!("{key}: {} window(s) from {}", rows.len(), path.display());
            for row in rows {
                acq.push(&row, label.as_str(), key.as_str())?;
            }
        }

        log::info!(
            "{}: {} acquisitions of width {} loaded",
            self.name(),
            acq.len(),
            acq.width()
        );
        Ok(acq)
    }

    /// Cached acquisitions, loading them on first use.
    pub fn get_acquisitions(&mut self) -> Result<&Acquisitions> {
        if self.cache.is_none() {
            self.cache = Some(self.load_acquisitions()?);
        }
        self.cache
            .as_ref()
            .ok_or_else(|| Error::Unsupported("acquisition cache unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// DatasetKind – named constructor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Cwru,
    Hust,
    Ottawa,
    Xjut,
    Mfpt,
    Paderborn,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Cwru,
        DatasetKind::Hust,
        DatasetKind::Ottawa,
        DatasetKind::Xjut,
        DatasetKind::Mfpt,
        DatasetKind::Paderborn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Cwru => "cwru",
            DatasetKind::Hust => "hust",
            DatasetKind::Ottawa => "ottawa",
            DatasetKind::Xjut => "xjut",
            DatasetKind::Mfpt => "mfpt",
            DatasetKind::Paderborn => "paderborn",
        }
    }

    pub fn build(self) -> Result<Box<dyn Dataset>> {
        Ok(match self {
            DatasetKind::Cwru => Box::new(Cwru::new()?),
            DatasetKind::Hust => Box::new(Hust::new()?),
            DatasetKind::Ottawa => Box::new(Ottawa::new()?),
            DatasetKind::Xjut => Box::new(Xjut::new()?),
            DatasetKind::Mfpt => Box::new(Mfpt::new()?),
            DatasetKind::Paderborn => Box::new(Paderborn::new()?),
        })
    }

    pub fn loader(self, root: impl Into<PathBuf>) -> Result<DatasetLoader> {
        Ok(DatasetLoader::new(self.build()?, root))
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Unsupported(format!("unknown dataset '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(labels: &[&str]) -> BearingRecord {
        BearingRecord::new(labels.iter().map(|s| s.to_string()).collect(), "x.mat")
    }

    #[test]
    fn label_rules() {
        let r = record(&["IR007", "0"]);
        assert_eq!(LabelRule::FullKey.label(&r).as_deref(), Some("IR007,0"));
        assert_eq!(LabelRule::FirstChar.label(&r).as_deref(), Some("I"));
        assert_eq!(LabelRule::Field(1).label(&r).as_deref(), Some("0"));
        assert_eq!(LabelRule::Field(2).label(&r), None);

        let capture = LabelRule::Capture {
            pattern: Regex::new(r"^([A-Z])_").unwrap(),
            group: 1,
        };
        assert_eq!(capture.label(&record(&["H_1_0"])).as_deref(), Some("H"));
        assert_eq!(capture.label(&record(&["healthy"])), None);
    }

    #[test]
    fn continuation_volumes() {
        assert!(!is_continuation_volume("xjut_bearing.part01.rar"));
        assert!(is_continuation_volume("xjut_bearing.part02.rar"));
        assert!(is_continuation_volume("XJUT_BEARING.PART10.RAR"));
        assert!(!is_continuation_volume("K001.rar"));
        assert!(!is_continuation_volume("raw.zip"));
    }

    #[test]
    fn layout_paths() {
        let layout = DatasetLayout::new("/data", "hust");
        assert_eq!(layout.raw_dir(), Path::new("/data/data/hust_raw"));
        assert_eq!(layout.files_dir(), Path::new("/data/data/hust_raw/hust_bearing"));
        assert_eq!(
            layout.metadata_path(),
            Path::new("/data/dataset_metadata/hust_bearings.csv")
        );
    }

    #[test]
    fn every_kind_builds_and_parses_its_name() {
        for kind in DatasetKind::ALL {
            let dataset = kind.build().unwrap();
            assert_eq!(dataset.name(), kind.name());
            assert_eq!(kind.name().parse::<DatasetKind>().unwrap(), kind);
        }
        assert!("nasa".parse::<DatasetKind>().is_err());
    }
}
