use crate::error::{Error, Result};
use crate::loss::Loss;
use crate::math::matrix::Matrix;

/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f32 = 1e-9;

fn check_shapes(predictions: &Matrix, targets: &Matrix) -> Result<()> {
    if predictions.shape() != targets.shape() {
        return Err(Error::shape("CrossEntropyLoss", targets.shape(), predictions.shape()));
    }
    Ok(())
}

impl Loss for CrossEntropyLoss {
    /// Batch-mean cross-entropy:
    ///   L = -(1/batch) * sum_i sum_j targets[i][j] * ln(predictions[i][j] + eps)
    ///
    /// An empty batch has loss 0.
    fn calculate_loss(&self, predictions: &Matrix, targets: &Matrix) -> Result<f32> {
        check_shapes(predictions, targets)?;
        if predictions.rows == 0 {
            return Ok(0.0);
        }
        let total: f32 = predictions
            .data
            .iter()
            .zip(targets.data.iter())
            .flat_map(|(p_row, t_row)| p_row.iter().zip(t_row.iter()))
            .map(|(p, t)| t * (p + EPS).ln())
            .sum();
        Ok(-total / predictions.rows as f32)
    }

    /// Gradient of the combined Softmax + cross-entropy w.r.t. the pre-softmax
    /// logits: `predictions - targets`, element-wise and not averaged.
    ///
    /// The Softmax layer's backward pass is the identity so this is not
    /// double-applied. Dense layers do the batch averaging.
    fn calculate_gradient(&self, predictions: &Matrix, targets: &Matrix) -> Result<Matrix> {
        check_shapes(predictions, targets)?;
        Ok(predictions - targets)
    }
}
