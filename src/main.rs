use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use rolbearing::data::filter;
use rolbearing::datasets::{DatasetKind, DEFAULT_SAMPLE_SIZE};
use rolbearing::experiment::{
    metrics, results, ClassifierKind, ExperimentConfig, Experimenter, TaskRunner,
};
use rolbearing::fetch::{Fetcher, RetryPolicy};

#[derive(Parser)]
#[command(name = "rolbearing", version, about = "Bearing fault datasets and experiments")]
struct Cli {
    /// Directory holding `data/` and `dataset_metadata/`
    #[arg(long, global = true, default_value = "datasets")]
    root: PathBuf,

    /// Hide download progress bars
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download and extract a dataset, then write its metadata table
    Download { dataset: DatasetKind },
    /// Rebuild the metadata table from already extracted files
    Metadata { dataset: DatasetKind },
    /// Load a dataset and print its acquisition summary
    Inspect {
        dataset: DatasetKind,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
        /// Only count acquisitions with these labels
        #[arg(long = "label", value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Train on source datasets and evaluate on targets
    Run(RunArgs),
    /// Accuracy and macro F1 of a saved results file
    Scores { file: PathBuf },
}

#[derive(Args)]
struct RunArgs {
    /// JSON experiment config; other run flags are ignored when given
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long = "source", value_delimiter = ',', default_value = "cwru")]
    sources: Vec<DatasetKind>,
    /// Defaults to the sources
    #[arg(long = "target", value_delimiter = ',')]
    targets: Vec<DatasetKind>,
    #[arg(long = "classifier", value_delimiter = ',', default_value = "knn")]
    classifiers: Vec<ClassifierKind>,
    /// Labels counted as healthy (default: each dataset's own)
    #[arg(long = "healthy", value_delimiter = ',')]
    healthy: Vec<String>,
    /// Keep the original multi-class labels
    #[arg(long)]
    multiclass: bool,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,
    /// Run each fit/predict on a separate worker
    #[arg(long)]
    isolate: bool,
    /// Fail instead of downloading missing datasets
    #[arg(long)]
    no_download: bool,
    #[arg(long, default_value = "log")]
    results_dir: PathBuf,
}

impl RunArgs {
    fn into_config(self, root: PathBuf) -> Result<ExperimentConfig> {
        if let Some(path) = &self.config {
            return ExperimentConfig::load(path);
        }
        let config = ExperimentConfig {
            data_root: root,
            results_dir: self.results_dir,
            sources: self.sources,
            targets: self.targets,
            classifiers: self.classifiers,
            healthy_labels: (!self.healthy.is_empty()).then_some(self.healthy),
            binarize: !self.multiclass,
            sample_size: self.sample_size,
            runner: if self.isolate {
                TaskRunner::Isolated
            } else {
                TaskRunner::Inline
            },
            download: !self.no_download,
            retry: RetryPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            log::warn!("Second interrupt, exiting");
            std::process::exit(130);
        }
        log::warn!("Interrupt received, stopping downloads; press Ctrl-C again to quit");
    })
    .context("installing Ctrl-C handler")?;

    let fetcher = |policy: RetryPolicy| -> Result<Fetcher> {
        Ok(Fetcher::new(policy)?
            .with_cancel(Arc::clone(&cancel))
            .with_progress(!cli.quiet))
    };

    match cli.command {
        Command::Download { dataset } => {
            let loader = dataset.loader(&cli.root)?;
            loader
                .download(&fetcher(RetryPolicy::default())?)
                .with_context(|| format!("downloading {dataset}"))?;
            println!(
                "{dataset}: {} bearings listed in {}",
                loader.get_bearings()?.len(),
                loader.layout().metadata_path().display()
            );
        }
        Command::Metadata { dataset } => {
            let loader = dataset.loader(&cli.root)?;
            let rows = loader.write_metadata()?;
            println!("{dataset}: {rows} rows -> {}", loader.layout().metadata_path().display());
        }
        Command::Inspect {
            dataset,
            sample_size,
            labels,
        } => {
            let mut loader = dataset.loader(&cli.root)?.with_sample_size(sample_size);
            let all = loader
                .get_acquisitions()
                .with_context(|| format!("loading {dataset}"))?;
            let acq = filter::select(all, &labels.into_iter().collect());
            println!(
                "{dataset}: {} acquisitions x {} samples",
                acq.len(),
                acq.width()
            );
            for (label, count) in acq.label_counts() {
                println!("  {label:>8}  {count}");
            }
        }
        Command::Run(args) => {
            let config = args.into_config(cli.root.clone())?;
            let experimenter = Experimenter::new(config.clone(), fetcher(config.retry)?)?;
            let path = experimenter.run()?;
            println!("Results written to {}", path.display());
        }
        Command::Scores { file } => {
            let rows = results::load_results(&file)?;
            for summary in metrics::scores(&rows) {
                let spread =
                    |s: Option<f64>| s.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
                println!("# Classification Model: {} ({}) #", summary.classifier, summary.dataset);
                println!(
                    "Accuracy: {:?} Mean: {:.4} Std: {}",
                    summary.accuracy,
                    summary.mean_accuracy(),
                    spread(summary.std_accuracy())
                );
                println!(
                    "F1 Macro: {:?} Mean: {:.4} Std: {}",
                    summary.f1_macro,
                    summary.mean_f1(),
                    spread(summary.std_f1())
                );
                let (labels, confusion) = summary.confusion();
                println!("Confusion matrix:\n{}", metrics::format_confusion(&labels, &confusion));
                println!();
            }
        }
    }
    Ok(())
}
