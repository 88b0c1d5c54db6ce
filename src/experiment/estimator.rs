use std::collections::BTreeMap;

use anyhow::{bail, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A trainable classifier over signal rows.
///
/// The built-in pipeline keeps feature extraction, scaling and
/// classification minimal; richer models plug in here.
pub trait Estimator: Send {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[String]) -> Result<()>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<String>>;

    /// Class probabilities, one column per entry of [`Estimator::classes`].
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Classes seen by `fit`, sorted.
    fn classes(&self) -> &[String];
}

// ---------------------------------------------------------------------------
// Named classifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Statistical time features, standard scaling, 5-nearest neighbours.
    Knn,
}

impl ClassifierKind {
    pub fn label(self) -> &'static str {
        match self {
            ClassifierKind::Knn => "K-Nearest Neighbors",
        }
    }

    pub fn build(self) -> Box<dyn Estimator> {
        match self {
            ClassifierKind::Knn => Box::new(Pipeline::new(Knn::new(5))),
        }
    }
}

// ---------------------------------------------------------------------------
// Feature extraction
// ---------------------------------------------------------------------------

/// Time-domain statistics of a window: mean, standard deviation, skewness,
/// kurtosis, peak, RMS, crest, shape, impulse and margin factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalTime;

impl StatisticalTime {
    pub const N_FEATURES: usize = 10;

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros((x.nrows(), Self::N_FEATURES));
        for (row, mut features) in x.outer_iter().zip(out.outer_iter_mut()) {
            features.assign(&ArrayView1::from(&Self::row_features(row)[..]));
        }
        out
    }

    fn row_features(row: ArrayView1<'_, f64>) -> [f64; Self::N_FEATURES] {
        let n = row.len().max(1) as f64;
        let mean = row.sum() / n;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let (skew, kurt) = if std > 0.0 {
            let m3 = row.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
            let m4 = row.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / n;
            (m3 / std.powi(3), m4 / var.powi(2) - 3.0)
        } else {
            (0.0, 0.0)
        };
        let peak = row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let rms = (row.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        let abs_mean = row.iter().map(|v| v.abs()).sum::<f64>() / n;
        let sqrt_mean = (row.iter().map(|v| v.abs().sqrt()).sum::<f64>() / n).powi(2);
        let ratio = |a: f64, b: f64| if b > 0.0 { a / b } else { 0.0 };

        [
            mean,
            std,
            skew,
            kurt,
            peak,
            rms,
            ratio(peak, rms),
            ratio(rms, abs_mean),
            ratio(peak, abs_mean),
            ratio(peak, sqrt_mean),
        ]
    }
}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Zero mean, unit variance per column. Constant columns are left centred.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<()> {
        let Some(mean) = x.mean_axis(Axis(0)) else {
            bail!("cannot fit a scaler on zero rows");
        };
        self.scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        self.mean = mean;
        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            bail!(
                "scaler fitted on {} columns, got {}",
                self.mean.len(),
                x.ncols()
            );
        }
        Ok((&x - &self.mean) / &self.scale)
    }
}

// ---------------------------------------------------------------------------
// k-nearest neighbours
// ---------------------------------------------------------------------------

/// Uniform-weight k-NN with Euclidean distance.
#[derive(Debug, Clone)]
pub struct Knn {
    k: usize,
    x: Array2<f64>,
    y: Vec<usize>,
    classes: Vec<String>,
}

impl Knn {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            x: Array2::zeros((0, 0)),
            y: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[String]) -> Result<()> {
        if x.nrows() != y.len() {
            bail!("{} rows but {} labels", x.nrows(), y.len());
        }
        if y.is_empty() {
            bail!("cannot fit on an empty training set");
        }
        let index: BTreeMap<&str, usize> = {
            let mut names: Vec<&str> = y.iter().map(String::as_str).collect();
            names.sort_unstable();
            names.dedup();
            names.into_iter().enumerate().map(|(i, n)| (n, i)).collect()
        };
        self.classes = index.keys().map(|s| s.to_string()).collect();
        self.y = y.iter().map(|label| index[label.as_str()]).collect();
        self.x = x.to_owned();
        Ok(())
    }

    /// Vote share of each class among the `k` nearest training rows.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            bail!("k-NN used before fit");
        }
        if x.ncols() != self.x.ncols() {
            bail!("fitted on {} columns, got {}", self.x.ncols(), x.ncols());
        }
        let k = self.k.min(self.y.len());
        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));

        for (row, mut out) in x.outer_iter().zip(proba.outer_iter_mut()) {
            let mut dist: Vec<(f64, usize)> = self
                .x
                .outer_iter()
                .zip(&self.y)
                .map(|(train, &class)| {
                    let d = (&train - &row).mapv(|v| v * v).sum();
                    (d, class)
                })
                .collect();
            dist.sort_by(|a, b| a.0.total_cmp(&b.0));
            for &(_, class) in &dist[..k] {
                out[class] += 1.0;
            }
            out.mapv_inplace(|votes| votes / k as f64);
        }
        Ok(proba)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Index of the largest entry per row; ties go to the lower index.
fn argmax_rows(proba: &Array2<f64>) -> Vec<usize> {
    proba
        .outer_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
                    if p > best.1 {
                        (i, p)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// `StatisticalTime -> StandardScaler -> Knn`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    features: StatisticalTime,
    scaler: StandardScaler,
    knn: Knn,
}

impl Pipeline {
    pub fn new(knn: Knn) -> Self {
        Self {
            features: StatisticalTime,
            scaler: StandardScaler::default(),
            knn,
        }
    }

    fn prepare(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.scaler.transform(self.features.transform(x).view())
    }
}

impl Estimator for Pipeline {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[String]) -> Result<()> {
        let features = self.features.transform(x);
        self.scaler.fit(features.view())?;
        let scaled = self.scaler.transform(features.view())?;
        self.knn.fit(scaled.view(), y)
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<String>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_rows(&proba)
            .into_iter()
            .map(|i| self.knn.classes()[i].clone())
            .collect())
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.knn.predict_proba(self.prepare(x)?.view())
    }

    fn classes(&self) -> &[String] {
        self.knn.classes()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn statistical_features_of_a_square_wave() {
        let x = array![[1.0, -1.0, 1.0, -1.0]];
        let f = StatisticalTime.transform(x.view());
        assert_eq!(f.dim(), (1, StatisticalTime::N_FEATURES));
        assert_eq!(f[[0, 0]], 0.0); // mean
        assert_eq!(f[[0, 1]], 1.0); // std
        assert_eq!(f[[0, 4]], 1.0); // peak
        assert_eq!(f[[0, 6]], 1.0); // crest
    }

    #[test]
    fn scaler_centres_and_scales_columns() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let mut scaler = StandardScaler::default();
        scaler.fit(x.view()).unwrap();
        let t = scaler.transform(x.view()).unwrap();
        assert_eq!(t, array![[-1.0, 0.0], [1.0, 0.0]]);
        assert!(scaler.transform(array![[1.0]].view()).is_err());
    }

    #[test]
    fn knn_votes_among_nearest_rows() {
        let x = array![[0.0], [0.1], [0.2], [10.0], [10.1]];
        let mut knn = Knn::new(3);
        knn.fit(x.view(), &labels(&["N", "N", "N", "F", "F"])).unwrap();
        assert_eq!(knn.classes(), ["F", "N"]);

        let proba = knn.predict_proba(array![[0.05], [9.9]].view()).unwrap();
        assert_eq!(proba.row(0).to_vec(), [0.0, 1.0]);
        assert!((proba[[1, 0]] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pipeline_separates_quiet_from_noisy_windows() {
        let quiet: Vec<f64> = (0..64).map(|i| (i as f64 * 0.3).sin() * 0.1).collect();
        let loud: Vec<f64> = (0..64)
            .map(|i| (i as f64 * 0.3).sin() * 5.0 + if i % 7 == 0 { 9.0 } else { 0.0 })
            .collect();
        let mut rows = Vec::new();
        for shift in 0..4 {
            rows.extend(quiet.iter().map(|v| v + shift as f64 * 0.01));
            rows.extend(loud.iter().map(|v| v + shift as f64 * 0.01));
        }
        let x = Array2::from_shape_vec((8, 64), rows).unwrap();
        let y = labels(&["N", "F", "N", "F", "N", "F", "N", "F"]);

        let mut model = ClassifierKind::Knn.build();
        model.fit(x.view(), &y).unwrap();
        assert_eq!(model.predict(x.view()).unwrap(), y);
        assert_eq!(model.predict_proba(x.view()).unwrap().dim(), (8, 2));
    }
}
