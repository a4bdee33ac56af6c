pub mod sgd;

pub use sgd::{Optimizer, Sgd};
