use crate::error::Result;
use crate::optim::sgd::Sgd;

/// Hyperparameters for a `train_loop` run.
///
/// # Fields
/// - `epochs`         — total number of full passes over the training data
/// - `batch_size`     — samples per mini-batch; the last batch may be short
/// - `learning_rate`  — SGD step size
/// - `clip_gradients` — when set, gradients are clamped to `[-c, c]` before
///                      the SGD step
/// - `shuffle`        — reshuffle sample order at the start of every epoch
/// - `log_every`      — emit a progress line every N batches; `0` disables it
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub clip_gradients: Option<f32>,
    pub shuffle: bool,
    pub log_every: usize,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no clipping, no shuffling and the default
    /// progress interval.
    pub fn new(epochs: usize, batch_size: usize, learning_rate: f32) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            learning_rate,
            ..TrainConfig::default()
        }
    }

    /// The optimizer these settings describe. Fails with `InvalidConfig` on a
    /// non-finite clip limit.
    pub fn optimizer(&self) -> Result<Sgd> {
        match self.clip_gradients {
            Some(limit) => Sgd::with_clipping(self.learning_rate, limit),
            None => Ok(Sgd::new(self.learning_rate)),
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.01,
            clip_gradients: None,
            shuffle: false,
            log_every: 100,
        }
    }
}
