use serde::{Deserialize, Serialize};

/// Per-epoch training statistics returned by `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss per sample over this epoch.
    pub train_loss: f32,
    /// Fraction of training samples classified correctly, in [0, 1].
    pub train_accuracy: f32,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Result of a single forward pass over a held-out set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStats {
    pub loss: f32,
    pub accuracy: f32,
    pub correct: usize,
    pub samples: usize,
}
