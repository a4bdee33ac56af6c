use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A stateless parameter-update rule. Layers hand it their own parameters
/// together with the batch-averaged gradients from the last backward pass.
pub trait Optimizer {
    fn update_matrix(&self, params: &mut Matrix, grads: &Matrix) -> Result<()>;
    fn update_vector(&self, params: &mut [f32], grads: &[f32]) -> Result<()>;
}

/// Plain stochastic gradient descent: `p -= learning_rate * g`.
///
/// `with_clipping` selects the alternate policy that clamps every gradient
/// to `[-limit, limit]` before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f32,
    pub clip: Option<f32>,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Sgd {
        Sgd { learning_rate, clip: None }
    }

    /// Clipping SGD. `limit` must be finite; its sign is ignored.
    pub fn with_clipping(learning_rate: f32, limit: f32) -> Result<Sgd> {
        if !limit.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "gradient clip limit must be finite, got {}",
                limit
            )));
        }
        Ok(Sgd { learning_rate, clip: Some(limit.abs()) })
    }

    fn step(&self, param: &mut f32, grad: f32) {
        // max/min rather than clamp: a NaN limit set through the public field
        // must not panic.
        let grad = match self.clip {
            Some(limit) => grad.max(-limit).min(limit),
            None => grad,
        };
        *param -= self.learning_rate * grad;
    }
}

impl Optimizer for Sgd {
    fn update_matrix(&self, params: &mut Matrix, grads: &Matrix) -> Result<()> {
        if params.shape() != grads.shape() {
            return Err(Error::shape("Sgd::update_matrix", params.shape(), grads.shape()));
        }
        for (p_row, g_row) in params.data.iter_mut().zip(grads.data.iter()) {
            for (p, &g) in p_row.iter_mut().zip(g_row.iter()) {
                self.step(p, g);
            }
        }
        Ok(())
    }

    fn update_vector(&self, params: &mut [f32], grads: &[f32]) -> Result<()> {
        if params.len() != grads.len() {
            return Err(Error::shape("Sgd::update_vector", (1, params.len()), (1, grads.len())));
        }
        for (p, &g) in params.iter_mut().zip(grads.iter()) {
            self.step(p, g);
        }
        Ok(())
    }
}
