mod common;

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use zip::write::SimpleFileOptions;

use common::{serve, Reply, TestDataset};
use rolbearing::data::mat::MatWriter;
use rolbearing::data::metadata::MetadataSpec;
use rolbearing::datasets::{DatasetLoader, LabelRule, MetadataSource, RemoteFile, Source};
use rolbearing::fetch::{Fetcher, RetryPolicy};
use rolbearing::Error;

const BODY: &[u8] = b"0123456789";

fn fetcher() -> Fetcher {
    Fetcher::new(RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 2,
        timeout_ms: 5_000,
    })
    .unwrap()
    .with_progress(false)
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[test]
fn downloads_once_then_keeps_the_file() {
    let gets = counter();
    let seen = Arc::clone(&gets);
    let base = serve(move |method, _| {
        if method == "GET" {
            seen.fetch_add(1, Ordering::SeqCst);
        }
        Reply::ok(BODY)
    });
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher();

    let path = fetcher.fetch(&format!("{base}/97.mat"), dir.path(), "97.mat").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), BODY);
    fetcher.fetch(&format!("{base}/97.mat"), dir.path(), "97.mat").unwrap();
    assert_eq!(gets.load(Ordering::SeqCst), 1);
}

#[test]
fn wrong_sized_local_copy_is_replaced() {
    let base = serve(|_, _| Reply::ok(BODY));
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.zip"), b"old").unwrap();

    let path = fetcher().fetch(&format!("{base}/a.zip"), dir.path(), "a.zip").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), BODY);
}

#[test]
fn short_body_is_retried() {
    let gets = counter();
    let seen = Arc::clone(&gets);
    let base = serve(move |method, _| match method {
        "HEAD" => Reply::ok(BODY),
        _ if seen.fetch_add(1, Ordering::SeqCst) == 0 => Reply::ok(&BODY[..4]),
        _ => Reply::ok(BODY),
    });
    let dir = tempfile::tempdir().unwrap();

    let path = fetcher().fetch(&format!("{base}/f"), dir.path(), "f").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), BODY);
    assert_eq!(gets.load(Ordering::SeqCst), 2);
}

#[test]
fn unavailable_server_exhausts_retries() {
    let hits = counter();
    let seen = Arc::clone(&hits);
    let base = serve(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Reply::status(503)
    });
    let dir = tempfile::tempdir().unwrap();

    match fetcher().fetch(&format!("{base}/f"), dir.path(), "f") {
        Err(Error::RetriesExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, Error::HttpStatus { status: 503, .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(!dir.path().join("f").exists());
}

#[test]
fn not_found_is_not_retried() {
    let hits = counter();
    let seen = Arc::clone(&hits);
    let base = serve(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Reply::status(404)
    });
    let dir = tempfile::tempdir().unwrap();

    let err = fetcher().fetch(&format!("{base}/f"), dir.path(), "f").unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn cancelled_download_leaves_no_partial_file() {
    let base = serve(|_, _| Reply::ok(&[7u8; 8192]));
    let dir = tempfile::tempdir().unwrap();
    let fetcher = fetcher().with_cancel(Arc::new(AtomicBool::new(true)));

    let err = fetcher.fetch(&format!("{base}/big"), dir.path(), "big").unwrap_err();
    assert!(matches!(err, Error::Interrupted { .. }));
    assert!(!dir.path().join("big").exists());
}

#[test]
fn cancel_during_stalled_body_returns_promptly() {
    // Announces 100 bytes, sends 10, then goes silent.
    let base = serve(|method, _| match method {
        "HEAD" => Reply::ok(&[0u8; 100]),
        _ => Reply {
            length: Some(100),
            stall: true,
            ..Reply::ok(BODY)
        },
    });
    let dir = tempfile::tempdir().unwrap();
    let cancel = Arc::new(AtomicBool::new(false));
    let fetcher = Fetcher::new(RetryPolicy {
        max_attempts: 5,
        base_delay_ms: 1,
        max_delay_ms: 2,
        timeout_ms: 500,
    })
    .unwrap()
    .with_progress(false)
    .with_cancel(Arc::clone(&cancel));

    let url = format!("{base}/stalled.mat");
    let target = dir.path().to_path_buf();
    let worker = std::thread::spawn(move || fetcher.fetch(&url, &target, "stalled.mat"));
    std::thread::sleep(Duration::from_millis(300));
    cancel.store(true, Ordering::SeqCst);
    let cancelled_at = Instant::now();

    let result = worker.join().unwrap();
    assert!(cancelled_at.elapsed() < Duration::from_secs(3));
    assert!(matches!(result, Err(Error::Interrupted { .. })));
    assert!(!dir.path().join("stalled.mat").exists());
}

#[test]
fn fetch_all_joins_names_under_base_url() {
    let base = serve(|_, path| Reply::ok(path.as_bytes()));
    let dir = tempfile::tempdir().unwrap();
    let names = vec!["K001.rar".to_string(), "KA04.rar".to_string()];

    let paths = fetcher().fetch_all(&format!("{base}/"), dir.path(), &names).unwrap();
    assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "/KA04.rar");
}

#[test]
fn file_dataset_downloads_each_name_under_its_base_url() {
    let base = serve(|_, path| {
        let mut mat = MatWriter::new();
        let offset = if path.ends_with("130.mat") { 1000.0 } else { 0.0 };
        mat.add_vector("X_DE_time", &common::ramp(offset, 64));
        Reply::ok(&mat.to_bytes().unwrap())
    });
    let root = tempfile::tempdir().unwrap();
    let mut dataset = TestDataset::table(
        "files",
        &[("IR007", "0", "105.mat"), ("OR007", "0", "130.mat")],
    );
    dataset.source = Source::Files {
        base_url: format!("{base}/files/"),
        names: vec!["105.mat".into(), "130.mat".into()],
    };

    let mut loader = DatasetLoader::new(Box::new(dataset), root.path()).with_sample_size(32);
    loader.download(&fetcher()).unwrap();
    assert!(loader.layout().files_dir().join("130.mat").is_file());

    let acq = loader.get_acquisitions().unwrap();
    assert_eq!(acq.signals()[[1, 0]], 1000.0);
}

/// Zip holding two HUST-style MAT files plus a readme.
fn hust_archive() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, offset) in [("raw/N504.mat", 0.0), ("raw/OB602.mat", 10.0)] {
        let mut mat = MatWriter::new();
        mat.add_vector("data", &common::ramp(offset, 64));
        zip.start_file(name, options).unwrap();
        zip.write_all(&mat.to_bytes().unwrap()).unwrap();
    }
    zip.start_file("raw/readme.txt", options).unwrap();
    zip.write_all(b"HUST bearing dataset").unwrap();
    zip.finish().unwrap().into_inner()
}

#[test]
fn archive_dataset_downloads_extracts_and_loads() {
    let archive = hust_archive();
    let base = serve(move |_, _| Reply::ok(&archive));
    let root = tempfile::tempdir().unwrap();

    let mut dataset = TestDataset::table("hust", &[]);
    dataset.source = Source::Archives {
        files: vec![RemoteFile::new(format!("{base}/hust.zip"), "hust_bearing.zip")],
        members: Regex::new(r"([^/]+\.mat)$").unwrap(),
    };
    dataset.metadata = MetadataSource::Generated(
        MetadataSpec::new(r"^([A-Za-z]+)(\d)\d*(\d)\.mat$")
            .unwrap()
            .headers(&["defect", "bearing", "condition"])
            .columns(&["$1", "620$2", "${3}00_W"]),
    );
    dataset.channels = vec![Regex::new("^data$").unwrap()];
    dataset.rule = LabelRule::Field(0);

    let mut loader = DatasetLoader::new(Box::new(dataset), root.path()).with_sample_size(32);
    assert!(!loader.is_downloaded());
    loader.download(&fetcher()).unwrap();
    assert!(loader.is_downloaded());
    assert!(loader.layout().raw_dir().join("hust_bearing.zip").is_file());
    assert!(!loader.layout().files_dir().join("readme.txt").exists());

    let mut keys: Vec<String> = loader.get_bearings().unwrap().iter().map(|r| r.key()).collect();
    keys.sort();
    assert_eq!(keys, ["N,6205,400_W", "OB,6206,200_W"]);

    let acq = loader.get_acquisitions().unwrap();
    assert_eq!(acq.len(), 2);
    assert_eq!(acq.label_counts().get("OB"), Some(&1));
}
