use std::collections::BTreeMap;
use std::path::Path;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::model::BearingRecord;
use crate::error::{Error, Result};

/// What to do with a raw file whose name does not match the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMismatch {
    #[default]
    Skip,
    Fail,
}

/// Maps the text of one capture group to a fault category, emitted as the
/// first label column.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub group: usize,
    pub table: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// MetadataSpec
// ---------------------------------------------------------------------------

/// How a dataset turns raw file names into label rows.
#[derive(Debug, Clone)]
pub struct MetadataSpec {
    pub pattern: Regex,
    /// Label column headers; `file` is appended.
    pub headers: Vec<String>,
    /// Replacement templates (`$1`, `620$2`, `${3}00_W`); one label column
    /// each. Empty means one column per capture group.
    pub columns: Vec<String>,
    pub lookup: Option<Lookup>,
    pub on_mismatch: OnMismatch,
}

impl MetadataSpec {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            headers: Vec::new(),
            columns: Vec::new(),
            lookup: None,
            on_mismatch: OnMismatch::Skip,
        })
    }

    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn columns(mut self, templates: &[&str]) -> Self {
        self.columns = templates.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn lookup(mut self, group: usize, table: &[(&str, &str)]) -> Self {
        self.lookup = Some(Lookup {
            group,
            table: table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn on_mismatch(mut self, policy: OnMismatch) -> Self {
        self.on_mismatch = policy;
        self
    }

    /// Label row for one file name, or `None` when the name does not match
    /// (or names an id missing from the lookup table).
    pub fn record_for(&self, file_name: &str) -> Option<BearingRecord> {
        let caps = self.pattern.captures(file_name)?;
        let mut labels = Vec::new();

        if let Some(lookup) = &self.lookup {
            let id = caps.get(lookup.group)?.as_str();
            let Some(category) = lookup.table.get(id) else {
                log::debug!("{file_name}: '{id}' not in lookup table");
                return None;
            };
            labels.push(category.clone());
        }

        if self.columns.is_empty() {
            labels.extend(
                caps.iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default()),
            );
        } else {
            labels.extend(self.columns.iter().map(|t| expand(&caps, t)));
        }
        Some(BearingRecord::new(labels, file_name))
    }
}

fn expand(caps: &Captures<'_>, template: &str) -> String {
    let mut out = String::new();
    caps.expand(template, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Scan `raw_dir`, derive one row per matching file (sorted by name) and
/// write the table to `out_csv`. Returns the number of rows written.
pub fn generate(raw_dir: &Path, out_csv: &Path, spec: &MetadataSpec) -> Result<usize> {
    let entries = std::fs::read_dir(raw_dir).map_err(|e| Error::io(raw_dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(raw_dir, e))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut records = Vec::with_capacity(names.len());
    for name in &names {
        match spec.record_for(name) {
            Some(record) => records.push(record),
            None if spec.on_mismatch == OnMismatch::Fail => {
                return Err(Error::metadata(
                    raw_dir,
                    format!("'{name}' does not match '{}'", spec.pattern),
                ));
            }
            None => log::debug!("skipping {name}: no match for '{}'", spec.pattern),
        }
    }

    write_records(out_csv, &spec.headers, &records)?;
    log::info!(
        "Metadata file {} created: {} of {} files labeled",
        out_csv.display(),
        records.len(),
        names.len()
    );
    Ok(records.len())
}

/// Write a metadata table. Missing label headers are named `label_<n>`.
pub fn write_records(path: &Path, headers: &[String], records: &[BearingRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let width = records
        .iter()
        .map(|r| r.labels.len())
        .max()
        .unwrap_or(headers.len());

    let mut header_row: Vec<String> = headers.to_vec();
    for i in header_row.len()..width {
        header_row.push(format!("label_{}", i + 1));
    }
    header_row.push("file".to_string());

    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    writer
        .write_record(&header_row)
        .map_err(|e| Error::csv(path, e))?;
    for record in records {
        writer
            .write_record(record.labels.iter().chain(std::iter::once(&record.file)))
            .map_err(|e| Error::csv(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read a metadata table: header skipped, last column is the file name,
/// everything before it is a label column.
pub fn read_records(path: &Path) -> Result<Vec<BearingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::csv(path, e))?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(|e| Error::csv(path, e))?;
        let fields: Vec<&str> = row.iter().collect();
        let Some((file, labels)) = fields.split_last() else {
            continue;
        };
        if labels.is_empty() || file.trim().is_empty() {
            return Err(Error::metadata(
                path,
                format!("row {row_no}: expected label columns followed by a file name"),
            ));
        }
        records.push(BearingRecord::new(
            labels.iter().map(|s| s.to_string()).collect(),
            file.trim(),
        ));
    }
    Ok(records)
}
