//! Command-line driver: `ferrite-net train` fits the MNIST classifier and
//! writes the model file; `ferrite-net evaluate` loads it and scores the test
//! set.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ferrite_net::data::mnist::{load_split, Split};
use ferrite_net::{evaluate, train_loop, CrossEntropyLoss, NetworkSpec, TrainConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Train,
    Evaluate,
}

#[derive(Parser, Debug)]
#[command(name = "ferrite-net")]
#[command(about = "Train or evaluate a feed-forward MNIST classifier", long_about = None)]
struct Cli {
    /// `train` fits a fresh network and saves it; `evaluate` loads the saved
    /// model and scores the test set
    #[arg(value_enum)]
    mode: Mode,

    /// Directory holding the four MNIST IDX files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Model file written by `train` and read by `evaluate`
    #[arg(long, default_value = "mnist_model.bin")]
    model: PathBuf,

    /// JSON network spec; defaults to 784-512-512-512-512-10
    #[arg(long)]
    spec: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    epochs: usize,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.01)]
    learning_rate: f32,

    /// Seed for weight initialization and shuffling
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Reshuffle the training set every epoch
    #[arg(long)]
    shuffle: bool,

    /// Clamp gradients to [-LIMIT, LIMIT] before each SGD step
    #[arg(long, value_name = "LIMIT")]
    clip_gradients: Option<f32>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_status(&e));
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// `--help` and `--version` print to stdout and succeed; every other parse
/// failure, including a missing or unknown mode, exits with 1.
fn parse_failure_status(e: &clap::Error) -> u8 {
    u8::from(e.use_stderr())
}

fn run(cli: Cli) -> Result<()> {
    let spec = match &cli.spec {
        Some(path) => NetworkSpec::load_json(path)
            .with_context(|| format!("failed to read network spec {}", path.display()))?,
        None => NetworkSpec::mnist(),
    };
    let num_classes = spec
        .output_size()
        .context("network spec has no dense layer")?;

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut network = spec.build(&mut rng).context("invalid network spec")?;
    info!(name = %spec.name, summary = %network.summary(), "network initialized");

    let loss = CrossEntropyLoss;

    match cli.mode {
        Mode::Train => {
            let train = load_split(&cli.data_dir, Split::Train, num_classes)
                .with_context(|| format!("failed to load training set from {}", cli.data_dir.display()))?;

            let config = TrainConfig {
                epochs: cli.epochs,
                batch_size: cli.batch_size,
                learning_rate: cli.learning_rate,
                clip_gradients: cli.clip_gradients,
                shuffle: cli.shuffle,
                ..TrainConfig::default()
            };
            let optimizer = config.optimizer().context("invalid training configuration")?;
            info!(?config, "starting training");
            train_loop(&mut network, &train, &loss, &optimizer, &config, &mut rng)
                .context("training failed")?;

            network
                .save_file(&cli.model)
                .with_context(|| format!("failed to save model to {}", cli.model.display()))?;
            info!(path = %cli.model.display(), "model saved");
        }
        Mode::Evaluate => {
            network
                .load_file(&cli.model)
                .with_context(|| format!("failed to load model from {}", cli.model.display()))?;
            info!(path = %cli.model.display(), "model loaded");

            let test = load_split(&cli.data_dir, Split::Test, num_classes)
                .with_context(|| format!("failed to load test set from {}", cli.data_dir.display()))?;
            evaluate(&mut network, &test, &loss).context("evaluation failed")?;
        }
    }

    Ok(())
}
