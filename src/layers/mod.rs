pub mod activation_layer;
pub mod dense;

pub use activation_layer::ActivationLayer;
pub use dense::DenseLayer;

use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Optimizer;

/// One stage of a sequential network.
///
/// `forward` must cache whatever the paired `backward` needs. `backward`
/// takes ∂L/∂output for the most recent forward batch and returns
/// ∂L/∂input; calling it first, or with a differently shaped gradient, is
/// an error. Parameter-free layers keep the default no-op `update`, `save`
/// and `load`.
pub trait Layer: fmt::Debug + Send {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix>;

    fn backward(&mut self, gradient: &Matrix) -> Result<Matrix>;

    /// Applies `optimizer` to this layer's parameters using the gradients
    /// from the last `backward`.
    fn update(&mut self, _optimizer: &dyn Optimizer) -> Result<()> {
        Ok(())
    }

    fn save(&self, _writer: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn load(&mut self, _reader: &mut dyn Read) -> Result<()> {
        Ok(())
    }

    /// Short label used in logs.
    fn name(&self) -> String;

    /// `(input_size, output_size)` for layers with a fixed width; `None` for
    /// layers that preserve whatever width they are given.
    fn dims(&self) -> Option<(usize, usize)> {
        None
    }
}
