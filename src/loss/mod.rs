pub mod cross_entropy;

pub use cross_entropy::CrossEntropyLoss;

use crate::error::Result;
use crate::math::matrix::Matrix;

/// A batch loss: a scalar for reporting plus the gradient w.r.t. the
/// predictions that seeds the backward pass.
pub trait Loss {
    fn calculate_loss(&self, predictions: &Matrix, targets: &Matrix) -> Result<f32>;
    fn calculate_gradient(&self, predictions: &Matrix, targets: &Matrix) -> Result<Matrix>;
}
