use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rolbearing::data::mat::MatWriter;
use rolbearing::datasets::{DatasetKind, MetadataSource};

/// Sampling rate of the 12k drive-end recordings.
const FS: f64 = 12_000.0;
/// Shaft speed, Hz (about 1797 rpm).
const SHAFT_HZ: f64 = 29.95;

/// Write a synthetic CWRU-shaped dataset (MAT files plus metadata table)
/// so the loaders and the experiment runner can be exercised offline.
#[derive(Parser)]
struct Opts {
    /// Data root; files land in `<root>/data/cwru_raw/cwru_bearing/`
    #[arg(long, default_value = "datasets")]
    root: PathBuf,
    /// Samples per channel and file
    #[arg(long, default_value_t = 4 * 4096)]
    samples: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Seeded splitmix64 stream for the measurement noise.
struct Noise(u64);

impl Noise {
    /// Uniform in [0, 1).
    fn unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        (z ^ (z >> 31)) as f64 / 2f64.powi(64)
    }

    /// Zero-mean normal sample (Box-Muller).
    fn normal(&mut self, std_dev: f64) -> f64 {
        let r = (-2.0 * self.unit().max(f64::MIN_POSITIVE).ln()).sqrt();
        std_dev * r * (2.0 * PI * self.unit()).cos()
    }
}

/// Impact repetition rate (multiples of shaft speed) for a 6205 bearing,
/// keyed by the first letter of the condition code.
fn fault_order(condition: &str) -> Option<f64> {
    match condition.chars().next()? {
        'I' => Some(5.4152),
        'O' => Some(3.5848),
        'B' => Some(4.7135),
        _ => None,
    }
}

/// Fault diameter in thousandths of an inch (`IR014` -> 14).
fn severity(condition: &str) -> f64 {
    condition
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(3)
        .collect::<String>()
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// Shaft harmonic plus noise, with decaying resonance bursts at the fault
/// rate for damaged bearings.
fn trace(condition: &str, load: usize, n: usize, gain: f64, noise: &mut Noise) -> Vec<f64> {
    let shaft = SHAFT_HZ - load as f64 * 0.3;
    let impact_period = fault_order(condition).map(|order| FS / (order * shaft));
    let amplitude = 0.2 + severity(condition) / 10.0;

    (0..n)
        .map(|i| {
            let t = i as f64 / FS;
            let mut v = 0.05 * (2.0 * PI * shaft * t).sin() + noise.normal(0.02);
            if let Some(period) = impact_period {
                let since = (i as f64) % period;
                v += amplitude * (-since / 40.0).exp() * (2.0 * PI * 3_000.0 * since / FS).sin();
            }
            v * gain
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let mut noise = Noise(opts.seed);

    let loader = DatasetKind::Cwru.loader(&opts.root)?;
    let files_dir = loader.layout().files_dir();
    std::fs::create_dir_all(&files_dir)
        .with_context(|| format!("creating {}", files_dir.display()))?;

    let MetadataSource::Table { records, .. } = loader.dataset().metadata() else {
        anyhow::bail!("cwru is expected to ship a fixed file table");
    };

    for record in records {
        // Keys look like `IR007_2`: condition, then motor load in hp.
        let key = record.key();
        let (condition, load) = key.rsplit_once('_').unwrap_or((key.as_str(), "0"));
        let load: usize = load.parse().unwrap_or(0);
        let number = record.file.trim_end_matches(".mat");

        let drive_end = trace(condition, load, opts.samples, 1.0, &mut noise);
        let fan_end = trace(condition, load, opts.samples, 0.4, &mut noise);
        let rpm = (SHAFT_HZ - load as f64 * 0.3) * 60.0;

        let mut writer = MatWriter::new().compressed(true);
        writer
            .add_vector(&format!("X{number:0>3}_DE_time"), &drive_end)
            .add_vector(&format!("X{number:0>3}_FE_time"), &fan_end)
            .add_vector(&format!("X{number:0>3}RPM"), &[rpm]);
        let path = files_dir.join(&record.file);
        writer
            .write(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        log::debug!("{key} -> {}", path.display());
    }

    let rows = loader.write_metadata()?;
    println!(
        "Generated {rows} files in {} ({} samples per channel)",
        files_dir.display(),
        opts.samples
    );
    Ok(())
}
