/// Experiment runner: train on source datasets, evaluate on targets.
///
/// ```text
///   sources ──▶ DatasetLoader ──┐                   ┌──▶ results/<stamp>.csv
///                               ├─▶ binarize ─▶ fit/predict (TaskRunner)
///   targets ──▶ DatasetLoader ──┘                   └──▶ results/execution_time
/// ```
pub mod estimator;
pub mod executor;
pub mod metrics;
/// Results CSV: one row per (dataset, classifier) run, list columns stored
/// as bracketed literals.
///
/// ```text
/// dataset,classifier,y_actual,y_pred,y_proba
/// cwru,K-Nearest Neighbors,"['F', 'N']","['F', 'F']","[[1.0, 0.0], [0.6, 0.4]]"
/// ```
pub mod results;

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter;
use crate::data::model::Acquisitions;
use crate::datasets::{DatasetKind, DatasetLoader, DEFAULT_SAMPLE_SIZE};
use crate::fetch::{Fetcher, RetryPolicy};

pub use estimator::{ClassifierKind, Estimator};
pub use executor::TaskRunner;
pub use results::{Literal, ResultRow};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Experiment settings, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Holds `data/` and `dataset_metadata/`.
    pub data_root: PathBuf,
    pub results_dir: PathBuf,
    pub sources: Vec<DatasetKind>,
    /// Empty means "evaluate on the sources".
    pub targets: Vec<DatasetKind>,
    pub classifiers: Vec<ClassifierKind>,
    /// Labels mapped to `N`; defaults to the union of each dataset's own
    /// healthy labels.
    pub healthy_labels: Option<Vec<String>>,
    /// Collapse labels to healthy/faulty before training.
    pub binarize: bool,
    pub sample_size: usize,
    pub runner: TaskRunner,
    /// Fetch datasets that are not on disk yet.
    pub download: bool,
    pub retry: RetryPolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("datasets"),
            results_dir: PathBuf::from("log"),
            sources: vec![DatasetKind::Cwru],
            targets: Vec::new(),
            classifiers: vec![ClassifierKind::Knn],
            healthy_labels: None,
            binarize: true,
            sample_size: DEFAULT_SAMPLE_SIZE,
            runner: TaskRunner::Inline,
            download: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("at least one source dataset is required");
        }
        if self.classifiers.is_empty() {
            bail!("at least one classifier is required");
        }
        if self.sample_size == 0 {
            bail!("sample_size must be positive");
        }
        Ok(())
    }

    pub fn targets(&self) -> &[DatasetKind] {
        if self.targets.is_empty() {
            &self.sources
        } else {
            &self.targets
        }
    }
}

// ---------------------------------------------------------------------------
// Experimenter
// ---------------------------------------------------------------------------

/// Merged acquisitions of one or more datasets.
struct Split {
    name: String,
    acquisitions: Acquisitions,
    healthy: BTreeSet<String>,
}

pub struct Experimenter {
    config: ExperimentConfig,
    fetcher: Fetcher,
}

impl Experimenter {
    pub fn new(config: ExperimentConfig, fetcher: Fetcher) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, fetcher })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run every classifier on every target, save the results and return
    /// the results file.
    pub fn run(&self) -> Result<PathBuf> {
        let started = Instant::now();
        let sources = names(&self.config.sources);
        let targets = names(self.config.targets());
        log::info!("### Source: {sources} ###");
        log::info!("### Target: {targets} ###");
        self.log_time(&format!("{sources} x {targets}"))?;

        let train = self.split(&self.config.sources)?;
        let mut rows = Vec::new();
        for &target in self.config.targets() {
            let test = if self.config.sources == [target] {
                Split {
                    name: target.name().to_string(),
                    acquisitions: train.acquisitions.clone(),
                    healthy: train.healthy.clone(),
                }
            } else {
                self.split(&[target])?
            };
            rows.extend(self.evaluate(&train, &test)?);
        }

        let path = results::save_results(&self.config.results_dir, &rows)?;
        for summary in metrics::scores(&rows) {
            log::info!(
                "# {} on {}: accuracy {:.4}, F1 macro {:.4}",
                summary.classifier,
                summary.dataset,
                summary.mean_accuracy(),
                summary.mean_f1()
            );
        }
        self.log_time(&format!("{} s", started.elapsed().as_secs_f64()))?;
        Ok(path)
    }

    fn loader(&self, kind: DatasetKind) -> Result<DatasetLoader> {
        let loader = kind
            .loader(&self.config.data_root)?
            .with_sample_size(self.config.sample_size);
        if !loader.is_downloaded() {
            if !self.config.download {
                bail!(
                    "dataset {kind} not found under {} and downloads are disabled",
                    self.config.data_root.display()
                );
            }
            loader
                .download(&self.fetcher)
                .with_context(|| format!("downloading {kind}"))?;
        }
        Ok(loader)
    }

    fn split(&self, kinds: &[DatasetKind]) -> Result<Split> {
        let mut parts = Vec::with_capacity(kinds.len());
        let mut healthy = BTreeSet::new();
        for &kind in kinds {
            let mut loader = self.loader(kind)?;
            healthy.extend(loader.healthy_labels());
            let acquisitions = loader
                .get_acquisitions()
                .with_context(|| format!("loading {kind}"))?
                .clone();
            parts.push(acquisitions);
        }
        if let Some(labels) = &self.config.healthy_labels {
            healthy = labels.iter().cloned().collect();
        }

        let refs: Vec<&Acquisitions> = parts.iter().collect();
        let mut acquisitions = Acquisitions::concat(&refs)?;
        if self.config.binarize {
            acquisitions = filter::binarize_acquisitions(&acquisitions, &healthy)?;
        }
        for (label, count) in acquisitions.label_counts() {
            log::info!("{}: {label} = {count}", names(kinds));
        }
        Ok(Split {
            name: names(kinds),
            acquisitions,
            healthy,
        })
    }

    fn evaluate(&self, train: &Split, test: &Split) -> Result<Vec<ResultRow>> {
        log::info!("Performing experiments on {}", test.name);
        let mut rows = Vec::new();
        for &kind in &self.config.classifiers {
            let started = Instant::now();
            let x_train = train.acquisitions.signals().clone();
            let y_train = train.acquisitions.labels().to_vec();
            let x_test = test.acquisitions.signals().clone();

            let (y_pred, y_proba) = self.config.runner.run(move || {
                let mut model = kind.build();
                model.fit(x_train.view(), &y_train)?;
                let y_pred = model.predict(x_test.view())?;
                let y_proba = model.predict_proba(x_test.view())?;
                Ok((y_pred, y_proba))
            })?;
            self.log_time(&format!("{} s", started.elapsed().as_secs_f64()))?;

            let y_actual = test.acquisitions.labels();
            let (labels, confusion) = metrics::confusion_matrix(y_actual, &y_pred);
            log::info!(
                "{}: accuracy {:.4}, F1 macro {:.4}\n{}",
                kind.label(),
                metrics::accuracy(y_actual, &y_pred),
                metrics::f1_macro(y_actual, &y_pred),
                metrics::format_confusion(&labels, &confusion)
            );
            rows.push(ResultRow {
                dataset: test.name.clone(),
                classifier: kind.label().to_string(),
                y_actual: y_actual.iter().map(|l| Literal::Str(l.clone())).collect(),
                y_pred: y_pred.into_iter().map(Literal::Str).collect(),
                y_proba: y_proba.outer_iter().map(|r| r.to_vec()).collect(),
            });
        }
        Ok(rows)
    }

    /// Append one line to `<results_dir>/execution_time`.
    fn log_time(&self, message: &str) -> Result<()> {
        let dir = &self.config.results_dir;
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join("execution_time");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        writeln!(file, "{message}").with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn names(kinds: &[DatasetKind]) -> String {
    kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join("+")
}
