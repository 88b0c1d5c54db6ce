use std::path::Path;

use regex::Regex;

use super::mat::MatFile;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Channel – one named sensor trace
// ---------------------------------------------------------------------------

/// A raw sensor trace pulled out of an acquisition file.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// MAT key path or CSV column header the samples came from.
    pub name: String,
    pub samples: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read the channels selected by `selectors` from a raw file.  Dispatch by
/// extension.
///
/// Supported formats:
/// * `.mat` – selectors match flattened key paths (`X097_DE_time`, `bearing.gs`)
/// * `.csv` – selectors match header names (`Horizontal_vibration_signals`)
///
/// Channels come back in selector order. A selector that matches nothing is
/// skipped; callers decide whether a missing channel is fatal.
pub fn read_channels(path: &Path, selectors: &[Regex]) -> Result<Vec<Channel>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "mat" => read_mat(path, selectors),
        "csv" => read_csv(path, selectors),
        other => Err(Error::Unsupported(format!(
            "unsupported raw file extension .{other} ({})",
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// MAT reader
// ---------------------------------------------------------------------------

fn read_mat(path: &Path, selectors: &[Regex]) -> Result<Vec<Channel>> {
    let mat = MatFile::open(path)?;
    let mut channels = Vec::with_capacity(selectors.len());

    for selector in selectors {
        let Some((key, array)) = mat.find_numeric(selector) else {
            log::debug!("{}: no key matches '{selector}'", path.display());
            continue;
        };
        // Matrices are flattened row by row into one trace.
        if array.rows() > 1 && array.cols() > 1 {
            log::debug!(
                "{}: '{key}' is {:?}, flattening row-major",
                path.display(),
                array.dims
            );
        }
        let samples = array.row_major();
        channels.push(Channel { name: key, samples });
    }

    Ok(channels)
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one sample per row.
fn read_csv(path: &Path, selectors: &[Regex]) -> Result<Vec<Channel>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::csv(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    // Resolve header column positions by pattern
    let columns: Vec<(usize, String)> = selectors
        .iter()
        .filter_map(|selector| {
            let found = headers.iter().position(|h| selector.is_match(h));
            if found.is_none() {
                log::debug!("{}: no column matches '{selector}'", path.display());
            }
            found.map(|i| (i, headers[i].clone()))
        })
        .collect();

    let mut samples: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::csv(path, e))?;
        for ((col_idx, col_name), out) in columns.iter().zip(samples.iter_mut()) {
            let cell = record.get(*col_idx).unwrap_or("").trim();
            let value = cell.parse::<f64>().map_err(|_| Error::Signal {
                path: path.to_path_buf(),
                message: format!("row {row_no}, column '{col_name}': '{cell}' is not a number"),
            })?;
            out.push(value);
        }
    }

    Ok(columns
        .into_iter()
        .zip(samples)
        .map(|((_, name), samples)| Channel { name, samples })
        .collect())
}
