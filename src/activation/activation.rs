use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::math::matrix::Matrix;

/// The closed set of pointwise activations an `ActivationLayer` can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Relu,
    /// Row-wise softmax. Its backward pass is the identity: it is only valid
    /// as the final layer, paired with `CrossEntropyLoss`, whose gradient is
    /// already the combined softmax + cross-entropy gradient.
    Softmax,
}

impl ActivationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationKind::Relu => "relu",
            ActivationKind::Softmax => "softmax",
        }
    }

    /// Applies the activation to a whole batch.
    pub fn apply(&self, input: &Matrix) -> Matrix {
        match self {
            ActivationKind::Relu => input.map(|x| x.max(0.0)),
            ActivationKind::Softmax => Matrix {
                rows: input.rows,
                cols: input.cols,
                data: input.data.iter().map(|row| softmax(row)).collect(),
            },
        }
    }

    /// Maps the upstream gradient to the gradient w.r.t. the cached input.
    pub fn derivative(&self, input: &Matrix, upstream: &Matrix) -> Matrix {
        match self {
            // Input exactly 0 gets gradient 0.
            ActivationKind::Relu => upstream.hadamard(&input.map(|x| if x > 0.0 { 1.0 } else { 0.0 })),
            ActivationKind::Softmax => upstream.clone(),
        }
    }
}

/// Numerically stable softmax of one row: the row max is subtracted before
/// exponentiating.
pub fn softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl FromStr for ActivationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relu" => Ok(ActivationKind::Relu),
            "softmax" => Ok(ActivationKind::Softmax),
            other => Err(Error::UnsupportedActivation(other.to_owned())),
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
