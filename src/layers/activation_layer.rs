use crate::activation::activation::ActivationKind;
use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::math::matrix::Matrix;

/// Parameter-free layer applying an `ActivationKind` to every row.
#[derive(Debug)]
pub struct ActivationLayer {
    pub kind: ActivationKind,
    input: Option<Matrix>,
}

impl ActivationLayer {
    pub fn new(kind: ActivationKind) -> ActivationLayer {
        ActivationLayer { kind, input: None }
    }

    /// Builds a layer from its name (`"relu"` or `"softmax"`).
    pub fn from_name(name: &str) -> Result<ActivationLayer> {
        Ok(ActivationLayer::new(name.parse()?))
    }

    pub fn relu() -> ActivationLayer {
        ActivationLayer::new(ActivationKind::Relu)
    }

    pub fn softmax() -> ActivationLayer {
        ActivationLayer::new(ActivationKind::Softmax)
    }
}

impl Layer for ActivationLayer {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let output = self.kind.apply(input);
        self.input = Some(input.clone());
        Ok(output)
    }

    fn backward(&mut self, gradient: &Matrix) -> Result<Matrix> {
        let input = self
            .input
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("ActivationLayer"))?;
        if gradient.shape() != input.shape() {
            return Err(Error::shape("ActivationLayer::backward", input.shape(), gradient.shape()));
        }
        Ok(self.kind.derivative(input, gradient))
    }

    fn name(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;
    use approx::assert_abs_diff_eq;

    #[test]
    fn from_name_rejects_unknown_kind() {
        assert!(matches!(
            ActivationLayer::from_name("sigmoid"),
            Err(Error::UnsupportedActivation(_))
        ));
    }

    #[test]
    fn relu_backward_masks_non_positive_inputs() {
        let mut layer = ActivationLayer::relu();
        let x = Matrix::from_rows(vec![vec![-1.0, 0.0, 2.0], vec![3.0, -0.5, 1e-7]]).unwrap();
        layer.forward(&x).unwrap();
        let g = Matrix::from_rows(vec![vec![5.0, 6.0, 7.0], vec![-1.0, 2.0, 0.25]]).unwrap();
        let dx = layer.backward(&g).unwrap();
        assert_eq!(dx.data, vec![vec![0.0, 0.0, 7.0], vec![-1.0, 0.0, 0.25]]);
    }

    #[test]
    fn softmax_forward_rows_sum_to_one() {
        let mut layer = ActivationLayer::softmax();
        let x = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![500.0, -500.0, 499.0]]).unwrap();
        let y = layer.forward(&x).unwrap();
        for row in &y.data {
            assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn softmax_backward_passes_gradient_through() {
        let mut layer = ActivationLayer::softmax();
        let x = Matrix::from_rows(vec![vec![0.1, 0.2]]).unwrap();
        layer.forward(&x).unwrap();
        let g = Matrix::from_rows(vec![vec![0.3, -0.3]]).unwrap();
        assert_eq!(layer.backward(&g).unwrap(), g);
    }

    #[test]
    fn backward_before_forward_fails() {
        let mut layer = ActivationLayer::relu();
        assert!(matches!(
            layer.backward(&Matrix::zeros(1, 1)),
            Err(Error::BackwardBeforeForward(_))
        ));
    }

    #[test]
    fn backward_rejects_shape_change() {
        let mut layer = ActivationLayer::relu();
        layer.forward(&Matrix::zeros(2, 3)).unwrap();
        assert!(matches!(layer.backward(&Matrix::zeros(2, 4)), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn has_no_parameters_to_update_save_or_load() {
        let mut layer = ActivationLayer::relu();
        layer.update(&Sgd::new(1.0)).unwrap();
        let mut buf = Vec::new();
        layer.save(&mut buf).unwrap();
        assert!(buf.is_empty());
        layer.load(&mut [1u8, 2, 3].as_slice()).unwrap();
        assert_eq!(layer.dims(), None);
    }
}
