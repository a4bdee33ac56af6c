pub mod accuracy;
pub mod epoch_stats;
pub mod loop_fn;
pub mod train_config;

pub use accuracy::{argmax, calculate_batch_accuracy};
pub use epoch_stats::{EpochStats, EvalStats};
pub use loop_fn::{evaluate, train_loop};
pub use train_config::TrainConfig;
