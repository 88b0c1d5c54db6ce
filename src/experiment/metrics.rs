use std::collections::BTreeSet;

use ndarray::Array2;

use super::results::ResultRow;

/// Fraction of positions where prediction equals the actual label.
pub fn accuracy<S: AsRef<str>>(actual: &[S], predicted: &[S]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a.as_ref() == p.as_ref())
        .count();
    hits as f64 / actual.len() as f64
}

/// Sorted union of actual and predicted labels.
pub fn label_set<S: AsRef<str>>(actual: &[S], predicted: &[S]) -> Vec<String> {
    actual
        .iter()
        .chain(predicted)
        .map(|s| s.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows are actual labels, columns predicted, both in [`label_set`] order.
pub fn confusion_matrix<S: AsRef<str>>(
    actual: &[S],
    predicted: &[S],
) -> (Vec<String>, Array2<usize>) {
    let labels = label_set(actual, predicted);
    let index = |s: &str| labels.iter().position(|l| l == s).unwrap_or(0);
    let mut matrix = Array2::zeros((labels.len(), labels.len()));
    for (a, p) in actual.iter().zip(predicted) {
        matrix[[index(a.as_ref()), index(p.as_ref())]] += 1;
    }
    (labels, matrix)
}

/// Plain-text table of a [`confusion_matrix`], one row per actual label.
pub fn format_confusion(labels: &[String], matrix: &Array2<usize>) -> String {
    let width = labels
        .iter()
        .map(String::len)
        .chain(matrix.iter().map(|n| n.to_string().len()))
        .chain(std::iter::once("actual\\pred".len()))
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<width$}", "actual\\pred");
    for label in labels {
        out.push_str(&format!(" {label:>width$}"));
    }
    for (label, row) in labels.iter().zip(matrix.outer_iter()) {
        out.push('\n');
        out.push_str(&format!("{label:<width$}"));
        for n in row {
            out.push_str(&format!(" {n:>width$}"));
        }
    }
    out
}

/// Unweighted mean of per-class F1. A class with no true or predicted
/// positives scores 0.
pub fn f1_macro<S: AsRef<str>>(actual: &[S], predicted: &[S]) -> f64 {
    let (labels, cm) = confusion_matrix(actual, predicted);
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = (0..labels.len())
        .map(|i| {
            let tp = cm[[i, i]] as f64;
            let actual_pos = cm.row(i).sum() as f64;
            let predicted_pos = cm.column(i).sum() as f64;
            let denom = actual_pos + predicted_pos;
            if denom > 0.0 {
                2.0 * tp / denom
            } else {
                0.0
            }
        })
        .sum();
    total / labels.len() as f64
}

// ---------------------------------------------------------------------------
// Summaries over saved results
// ---------------------------------------------------------------------------

/// Scores of one classifier on one dataset across all saved runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub dataset: String,
    pub classifier: String,
    pub accuracy: Vec<f64>,
    pub f1_macro: Vec<f64>,
    /// Labels of every run, pooled.
    pub actual: Vec<String>,
    pub predicted: Vec<String>,
}

impl Summary {
    /// Confusion matrix over the pooled labels of all runs.
    pub fn confusion(&self) -> (Vec<String>, Array2<usize>) {
        confusion_matrix(&self.actual, &self.predicted)
    }

    pub fn mean_accuracy(&self) -> f64 {
        mean(&self.accuracy)
    }

    pub fn std_accuracy(&self) -> Option<f64> {
        stdev(&self.accuracy)
    }

    pub fn mean_f1(&self) -> f64 {
        mean(&self.f1_macro)
    }

    pub fn std_f1(&self) -> Option<f64> {
        stdev(&self.f1_macro)
    }
}

/// Group rows by (dataset, classifier) in first-seen order and score each.
pub fn scores(rows: &[ResultRow]) -> Vec<Summary> {
    let mut out: Vec<Summary> = Vec::new();
    for row in rows {
        let actual = row.actual_labels();
        let predicted = row.predicted_labels();
        let acc = accuracy(&actual, &predicted);
        let f1 = f1_macro(&actual, &predicted);

        match out
            .iter_mut()
            .find(|s| s.dataset == row.dataset && s.classifier == row.classifier)
        {
            Some(summary) => {
                summary.accuracy.push(acc);
                summary.f1_macro.push(f1);
                summary.actual.extend(actual);
                summary.predicted.extend(predicted);
            }
            None => out.push(Summary {
                dataset: row.dataset.clone(),
                classifier: row.classifier.clone(),
                accuracy: vec![acc],
                f1_macro: vec![f1],
                actual,
                predicted,
            }),
        }
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; undefined below two values.
pub fn stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}
