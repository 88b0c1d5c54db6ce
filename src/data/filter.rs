use std::collections::BTreeSet;

use super::model::Acquisitions;
use crate::error::Result;

/// Binary class for labels in the healthy set.
pub const HEALTHY: &str = "N";
/// Binary class for every other label.
pub const FAULTY: &str = "F";

// ---------------------------------------------------------------------------
// Healthy / faulty binarization
// ---------------------------------------------------------------------------

/// Map every label to `N` when it is in `healthy`, `F` otherwise.
pub fn binarize<S: AsRef<str>>(labels: &[S], healthy: &BTreeSet<String>) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            if healthy.contains(label.as_ref()) {
                HEALTHY.to_string()
            } else {
                FAULTY.to_string()
            }
        })
        .collect()
}

/// [`binarize`] applied to a whole acquisition set.
pub fn binarize_acquisitions(
    acq: &Acquisitions,
    healthy: &BTreeSet<String>,
) -> Result<Acquisitions> {
    acq.relabel(binarize(acq.labels(), healthy))
}

// ---------------------------------------------------------------------------
// Label selection
// ---------------------------------------------------------------------------

/// Return indices of rows whose label is in `selected`.
///
/// An empty selection means "no filter" and keeps every row.
fn filtered_indices(acq: &Acquisitions, selected: &BTreeSet<String>) -> Vec<usize> {
    acq.labels()
        .iter()
        .enumerate()
        .filter(|(_, label)| selected.is_empty() || selected.contains(label.as_str()))
        .map(|(i, _)| i)
        .collect()
}

/// Keep only the rows passing [`filtered_indices`].
pub fn select(acq: &Acquisitions, selected: &BTreeSet<String>) -> Acquisitions {
    acq.select_rows(&filtered_indices(acq, selected))
}
