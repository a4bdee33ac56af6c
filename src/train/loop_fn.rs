use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::data::mnist::Dataset;
use crate::error::{Error, Result};
use crate::loss::Loss;
use crate::network::network::Network;
use crate::optim::sgd::Optimizer;
use crate::train::accuracy::calculate_batch_accuracy;
use crate::train::epoch_stats::{EpochStats, EvalStats};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs of mini-batch gradient
/// descent and returns one `EpochStats` per epoch.
///
/// Each batch runs forward → loss → gradient → backward → update before the
/// next one starts. `rng` is only used when `config.shuffle` is set.
///
/// # Errors
/// Fails on an empty dataset, a zero batch size, or the first error raised
/// by any stage; a failure aborts the whole run.
pub fn train_loop<R: Rng + ?Sized>(
    network: &mut Network,
    dataset: &Dataset,
    loss: &dyn Loss,
    optimizer: &dyn Optimizer,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<Vec<EpochStats>> {
    if dataset.is_empty() {
        return Err(Error::InvalidDataset("training set is empty".to_owned()));
    }
    if config.batch_size == 0 {
        return Err(Error::InvalidConfig("batch_size must be at least 1".to_owned()));
    }

    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let (train_loss, correct) = run_one_epoch(network, dataset, loss, optimizer, config, rng)?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy: correct as f32 / dataset.len() as f32,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            epoch = stats.epoch,
            total = stats.total_epochs,
            loss = stats.train_loss,
            accuracy = %format!("{:.2}%", stats.train_accuracy * 100.0),
            elapsed_ms = stats.elapsed_ms,
            "epoch finished"
        );
        history.push(stats);
    }

    Ok(history)
}

/// Runs one forward pass over the whole held-out set. Never trains.
pub fn evaluate(network: &mut Network, dataset: &Dataset, loss: &dyn Loss) -> Result<EvalStats> {
    if dataset.is_empty() {
        return Err(Error::InvalidDataset("evaluation set is empty".to_owned()));
    }

    let predictions = network.forward(&dataset.images)?;
    let mean_loss = loss.calculate_loss(&predictions, &dataset.labels)?;
    let correct = calculate_batch_accuracy(&predictions, &dataset.labels);

    let stats = EvalStats {
        loss: mean_loss,
        accuracy: correct as f32 / dataset.len() as f32,
        correct,
        samples: dataset.len(),
    };
    info!(
        loss = stats.loss,
        accuracy = %format!("{:.2}%", stats.accuracy * 100.0),
        samples = stats.samples,
        "evaluation finished"
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// One full pass over the training data. Returns the sample-weighted mean
/// loss and the number of correctly classified samples.
fn run_one_epoch<R: Rng + ?Sized>(
    network: &mut Network,
    dataset: &Dataset,
    loss: &dyn Loss,
    optimizer: &dyn Optimizer,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<(f32, usize)> {
    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    if config.shuffle {
        indices.shuffle(rng);
    }

    let n_batches = (n + config.batch_size - 1) / config.batch_size;
    let mut total_loss = 0.0f32;
    let mut correct = 0usize;

    for (batch, chunk) in indices.chunks(config.batch_size).enumerate() {
        let inputs = dataset.images.select_rows(chunk);
        let targets = dataset.labels.select_rows(chunk);

        let predictions = network.forward(&inputs)?;
        let batch_loss = loss.calculate_loss(&predictions, &targets)?;
        let gradient = loss.calculate_gradient(&predictions, &targets)?;
        network.backward(&gradient)?;
        network.update(optimizer)?;

        total_loss += batch_loss * chunk.len() as f32;
        correct += calculate_batch_accuracy(&predictions, &targets);

        if config.log_every > 0 && batch % config.log_every == 0 {
            debug!(batch, total = n_batches, loss = batch_loss, "processing batch");
        }
    }

    Ok((total_loss / n as f32, correct))
}
