pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationKind;
pub use layers::{ActivationLayer, DenseLayer, Layer};
pub use network::{LayerSpec, Network, NetworkSpec};
pub use loss::{CrossEntropyLoss, Loss};
pub use optim::sgd::{Optimizer, Sgd};
pub use data::mnist::{Dataset, Split};
pub use train::{calculate_batch_accuracy, evaluate, train_loop, EpochStats, EvalStats, TrainConfig};
