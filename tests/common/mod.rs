//! Shared fixtures: a throwaway HTTP server and a configurable dataset.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use regex::Regex;

use rolbearing::data::mat::MatWriter;
use rolbearing::data::model::BearingRecord;
use rolbearing::data::window::WindowStrategy;
use rolbearing::datasets::{Dataset, LabelRule, MetadataSource, Source};

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Content-Length to announce; defaults to the body length.
    pub length: Option<usize>,
    /// Hold the connection open after the body instead of closing it.
    pub stall: bool,
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Self {
            status: 200,
            body: body.to_vec(),
            length: None,
            stall: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            length: None,
            stall: false,
        }
    }
}

/// Serve `handler(method, path)` on a local port, one connection per
/// request. Returns the base URL.
pub fn serve<F>(handler: F) -> String
where
    F: Fn(&str, &str) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) if line == "\r\n" || line == "\n" => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or("").to_string();
            let path = parts.next().unwrap_or("/").to_string();
            let reply = handler(&method, &path);

            let head = format!(
                "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reply.status,
                reply.length.unwrap_or(reply.body.len())
            );
            let _ = stream.write_all(head.as_bytes());
            if method != "HEAD" {
                let _ = stream.write_all(&reply.body);
            }
            let _ = stream.flush();
            if reply.stall {
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_secs(30));
                    drop(stream);
                });
            }
        }
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A dataset whose every hook is set by the test.
pub struct TestDataset {
    pub name: String,
    pub source: Source,
    pub metadata: MetadataSource,
    pub channels: Vec<Regex>,
    pub rule: LabelRule,
    pub window: WindowStrategy,
    pub skip_incomplete: bool,
}

impl TestDataset {
    /// Fixed table of `(condition, load, file)` rows, one `_DE_time`
    /// channel, labels are the full key.
    pub fn table(name: &str, rows: &[(&str, &str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            source: Source::Files {
                base_url: String::new(),
                names: Vec::new(),
            },
            metadata: MetadataSource::Table {
                headers: vec!["condition".into(), "load".into()],
                records: rows
                    .iter()
                    .map(|(cond, load, file)| {
                        BearingRecord::new(vec![cond.to_string(), load.to_string()], *file)
                    })
                    .collect(),
            },
            channels: vec![Regex::new("_DE_time$").unwrap()],
            rule: LabelRule::FullKey,
            window: WindowStrategy::Truncate,
            skip_incomplete: false,
        }
    }
}

impl Dataset for TestDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &Source {
        &self.source
    }

    fn metadata(&self) -> &MetadataSource {
        &self.metadata
    }

    fn channels(&self) -> &[Regex] {
        &self.channels
    }

    fn label_rule(&self) -> &LabelRule {
        &self.rule
    }

    fn window(&self) -> WindowStrategy {
        self.window
    }

    fn skip_incomplete(&self) -> bool {
        self.skip_incomplete
    }
}

/// Ramp `start, start + 1, ...` of length `n`.
pub fn ramp(start: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + i as f64).collect()
}

/// Write a MAT file holding the given named vectors.
pub fn write_mat(path: &Path, vectors: &[(&str, Vec<f64>)]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = MatWriter::new();
    for (name, values) in vectors {
        writer.add_vector(name, values);
    }
    writer.write(path).unwrap();
}
