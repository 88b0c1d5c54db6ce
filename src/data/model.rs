use std::collections::BTreeMap;
use std::fmt;

use ndarray::{concatenate, Array2, ArrayView1, Axis};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// BearingRecord – one row of a metadata table
// ---------------------------------------------------------------------------

/// Label columns plus the raw file they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearingRecord {
    pub labels: Vec<String>,
    pub file: String,
}

impl BearingRecord {
    pub fn new(labels: Vec<String>, file: impl Into<String>) -> Self {
        Self {
            labels,
            file: file.into(),
        }
    }

    /// Composite key: label columns joined with `,`.
    pub fn key(&self) -> String {
        self.labels.join(",")
    }
}

impl fmt::Display for BearingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.key(), self.file)
    }
}

// ---------------------------------------------------------------------------
// Acquisitions – signal matrix with parallel label/key vectors
// ---------------------------------------------------------------------------

/// Fixed-width windows stacked row by row, each tagged with the label and
/// metadata key of the file it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisitions {
    signals: Array2<f64>,
    labels: Vec<String>,
    keys: Vec<String>,
}

impl Acquisitions {
    /// Empty matrix with `width` columns.
    pub fn new(width: usize) -> Self {
        Self {
            signals: Array2::zeros((0, width)),
            labels: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Append one window. The row must match the matrix width.
    pub fn push(
        &mut self,
        row: &[f64],
        label: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<()> {
        if row.len() != self.width() {
            return Err(Error::ShapeMismatch {
                expected: self.width(),
                actual: row.len(),
            });
        }
        self.signals
            .push_row(ArrayView1::from(row))
            .map_err(|_| Error::ShapeMismatch {
                expected: self.signals.ncols(),
                actual: row.len(),
            })?;
        self.labels.push(label.into());
        self.keys.push(key.into());
        Ok(())
    }

    pub fn signals(&self) -> &Array2<f64> {
        &self.signals
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn width(&self) -> usize {
        self.signals.ncols()
    }

    /// Same rows, new labels (e.g. after binarization).
    pub fn relabel(&self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.len() {
            return Err(Error::ShapeMismatch {
                expected: self.len(),
                actual: labels.len(),
            });
        }
        Ok(Self {
            signals: self.signals.clone(),
            labels,
            keys: self.keys.clone(),
        })
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            signals: self.signals.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
        }
    }

    /// Row-stack several datasets into one.
    pub fn concat(parts: &[&Acquisitions]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Err(Error::Unsupported("no acquisitions to merge".into()));
        };
        if let Some(bad) = parts.iter().find(|p| p.width() != first.width()) {
            return Err(Error::ShapeMismatch {
                expected: first.width(),
                actual: bad.width(),
            });
        }
        let views: Vec<_> = parts.iter().map(|p| p.signals.view()).collect();
        let signals = concatenate(Axis(0), &views).map_err(|_| Error::ShapeMismatch {
            expected: first.width(),
            actual: first.width(),
        })?;
        Ok(Self {
            signals,
            labels: parts.iter().flat_map(|p| p.labels.iter().cloned()).collect(),
            keys: parts.iter().flat_map(|p| p.keys.iter().cloned()).collect(),
        })
    }

    /// Number of rows per label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}
