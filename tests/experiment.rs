mod common;

use std::collections::BTreeSet;
use std::path::Path;

use common::{ramp, write_mat};
use rolbearing::datasets::{DatasetKind, MetadataSource};
use rolbearing::experiment::{
    metrics, results, ClassifierKind, ExperimentConfig, Experimenter, TaskRunner,
};
use rolbearing::fetch::{Fetcher, RetryPolicy};

/// CWRU layout with every listed file present: healthy traces are smooth
/// ramps, faulty ones carry a periodic spike.
fn synthetic_cwru(root: &Path, len: usize) {
    let loader = DatasetKind::Cwru.loader(root).unwrap();
    let MetadataSource::Table { records, .. } = loader.dataset().metadata() else {
        panic!("cwru ships a fixed table");
    };
    let files = loader.layout().files_dir();
    for record in records {
        let number = record.file.trim_end_matches(".mat");
        let healthy = record.key().starts_with('N');
        let trace: Vec<f64> = ramp(0.0, len)
            .into_iter()
            .map(|i| {
                let base = (i * 0.05).sin();
                if !healthy && i as usize % 37 == 0 {
                    base + 8.0
                } else {
                    base
                }
            })
            .collect();
        let drive_end = format!("X{number:0>3}_DE_time");
        let fan_end = format!("X{number:0>3}_FE_time");
        write_mat(
            &files.join(&record.file),
            &[(drive_end.as_str(), trace.clone()), (fan_end.as_str(), trace)],
        );
    }
    loader.write_metadata().unwrap();
}

#[test]
fn runs_cwru_offline_and_saves_binary_results() {
    let root = tempfile::tempdir().unwrap();
    synthetic_cwru(root.path(), 512);
    let results_dir = root.path().join("log");

    let config = ExperimentConfig {
        data_root: root.path().to_path_buf(),
        results_dir: results_dir.clone(),
        sources: vec![DatasetKind::Cwru],
        classifiers: vec![ClassifierKind::Knn],
        sample_size: 256,
        runner: TaskRunner::Isolated,
        download: false,
        ..ExperimentConfig::default()
    };
    let fetcher = Fetcher::new(RetryPolicy::default()).unwrap().with_progress(false);
    let path = Experimenter::new(config, fetcher).unwrap().run().unwrap();

    let rows = results::load_results(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dataset, "cwru");
    assert_eq!(rows[0].classifier, "K-Nearest Neighbors");
    // 40 files, two 256-sample windows each.
    assert_eq!(rows[0].y_actual.len(), 80);
    assert_eq!(rows[0].y_proba.len(), 80);

    let labels: BTreeSet<String> = rows[0].actual_labels().into_iter().collect();
    assert_eq!(labels, BTreeSet::from(["F".to_string(), "N".to_string()]));

    let summary = &metrics::scores(&rows)[0];
    let (classes, confusion) = summary.confusion();
    assert_eq!(classes, ["F", "N"]);
    assert_eq!(confusion.sum(), 80);
    // Four healthy files, two windows each.
    assert_eq!(confusion.row(1).sum(), 8);
    assert!(results_dir.join("execution_time").is_file());
}

#[test]
fn missing_dataset_with_downloads_disabled_fails() {
    let root = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        data_root: root.path().to_path_buf(),
        results_dir: root.path().join("log"),
        sources: vec![DatasetKind::Ottawa],
        download: false,
        ..ExperimentConfig::default()
    };
    let fetcher = Fetcher::new(RetryPolicy::default()).unwrap();
    let err = Experimenter::new(config, fetcher).unwrap().run().unwrap_err();
    assert!(err.to_string().contains("downloads are disabled"));
}
