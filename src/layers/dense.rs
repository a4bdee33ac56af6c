use rand::Rng;
use std::io::{self, Read, Write};
use std::mem::size_of;

use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::math::matrix::Matrix;
use crate::optim::sgd::Optimizer;

/// Half-width of the uniform range used for fresh weights.
pub const INIT_RANGE: f32 = 0.1;

/// Fully-connected layer: `output = input · weights + biases`.
///
/// `weights` is `input_size × output_size`, `biases` has `output_size`
/// entries. Gradients are batch-averaged and kept until the next backward.
#[derive(Debug)]
pub struct DenseLayer {
    pub weights: Matrix,
    pub biases: Vec<f32>,
    weight_gradients: Matrix,
    bias_gradients: Vec<f32>,
    input: Option<Matrix>, // last forward batch, needed for the weight gradient
}

impl DenseLayer {
    /// Weights uniform in `[-0.1, 0.1]`, biases zero.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> DenseLayer {
        let weights = Matrix::random_uniform(input_size, output_size, -INIT_RANGE, INIT_RANGE, rng);
        DenseLayer::with_weights(weights, vec![0.0; output_size])
    }

    /// Builds a layer from explicit parameters.
    pub fn from_parameters(weights: Matrix, biases: Vec<f32>) -> Result<DenseLayer> {
        if biases.len() != weights.cols {
            return Err(Error::shape("DenseLayer::from_parameters", (1, weights.cols), (1, biases.len())));
        }
        Ok(DenseLayer::with_weights(weights, biases))
    }

    fn with_weights(weights: Matrix, biases: Vec<f32>) -> DenseLayer {
        let (rows, cols) = weights.shape();
        DenseLayer {
            weights,
            bias_gradients: vec![0.0; biases.len()],
            biases,
            weight_gradients: Matrix::zeros(rows, cols),
            input: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn output_size(&self) -> usize {
        self.weights.cols
    }

    pub fn weight_gradients(&self) -> &Matrix {
        &self.weight_gradients
    }

    pub fn bias_gradients(&self) -> &[f32] {
        &self.bias_gradients
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        if input.cols != self.input_size() {
            return Err(Error::shape(
                "DenseLayer::forward",
                (input.rows, self.input_size()),
                input.shape(),
            ));
        }
        self.input = Some(input.clone());

        let mut output = input * &self.weights;
        output.add_row_vector(&self.biases);
        Ok(output)
    }

    fn backward(&mut self, gradient: &Matrix) -> Result<Matrix> {
        let input = self
            .input
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("DenseLayer"))?;
        let expected = (input.rows, self.output_size());
        if gradient.shape() != expected {
            return Err(Error::shape("DenseLayer::backward", expected, gradient.shape()));
        }

        let inv_batch = 1.0 / gradient.rows.max(1) as f32;

        // dW = xᵀ·G / batch
        self.weight_gradients = (&input.transpose() * gradient).map(|x| x * inv_batch);
        // db = column sums of G / batch
        self.bias_gradients = gradient.column_sums().into_iter().map(|x| x * inv_batch).collect();

        // dx = G·Wᵀ, per example, not averaged
        Ok(gradient * &self.weights.transpose())
    }

    fn update(&mut self, optimizer: &dyn Optimizer) -> Result<()> {
        optimizer.update_matrix(&mut self.weights, &self.weight_gradients)?;
        optimizer.update_vector(&mut self.biases, &self.bias_gradients)
    }

    /// Writes `input_size`, `output_size` (native `usize`), the weights row by
    /// row and then the biases (native `f32`).
    fn save(&self, writer: &mut dyn Write) -> Result<()> {
        write_usize(writer, self.input_size())?;
        write_usize(writer, self.output_size())?;
        for row in &self.weights.data {
            write_f32s(writer, row)?;
        }
        write_f32s(writer, &self.biases)?;
        Ok(())
    }

    /// Reads a record written by `save`. The layer adopts the shape declared
    /// in the stream, whatever it was constructed with.
    fn load(&mut self, reader: &mut dyn Read) -> Result<()> {
        let input_size = read_usize(reader)?;
        let output_size = read_usize(reader)?;
        if input_size == 0 || output_size == 0 {
            return Err(Error::ModelFormat(format!(
                "dense layer declares an empty shape {}x{}",
                input_size, output_size
            )));
        }

        let n_values = input_size
            .checked_add(1)
            .and_then(|rows| rows.checked_mul(output_size))
            .and_then(|n| n.checked_mul(size_of::<f32>()).map(|_| n))
            .ok_or_else(|| {
                Error::ModelFormat(format!(
                    "dense layer shape {}x{} overflows",
                    input_size, output_size
                ))
            })?;
        let values = read_f32s(reader, n_values)?;

        let (weight_values, bias_values) = values.split_at(input_size * output_size);
        let weights = Matrix {
            rows: input_size,
            cols: output_size,
            data: weight_values.chunks_exact(output_size).map(|c| c.to_vec()).collect(),
        };

        *self = DenseLayer::with_weights(weights, bias_values.to_vec());
        Ok(())
    }

    fn name(&self) -> String {
        format!("dense({}->{})", self.input_size(), self.output_size())
    }

    fn dims(&self) -> Option<(usize, usize)> {
        Some((self.input_size(), self.output_size()))
    }
}

fn write_usize(writer: &mut dyn Write, value: usize) -> io::Result<()> {
    writer.write_all(&value.to_ne_bytes())
}

fn read_usize(reader: &mut dyn Read) -> io::Result<usize> {
    let mut buf = [0u8; size_of::<usize>()];
    reader.read_exact(&mut buf)?;
    Ok(usize::from_ne_bytes(buf))
}

fn write_f32s(writer: &mut dyn Write, values: &[f32]) -> io::Result<()> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    writer.write_all(&bytes)
}

/// Reads exactly `count` floats. The buffer grows with the data actually
/// present, so a corrupt huge count fails with `UnexpectedEof` instead of
/// allocating up front.
fn read_f32s(reader: &mut dyn Read, count: usize) -> io::Result<Vec<f32>> {
    let n_bytes = (count * size_of::<f32>()) as u64;
    let mut buf = Vec::new();
    (&mut *reader).take(n_bytes).read_to_end(&mut buf)?;
    if (buf.len() as u64) < n_bytes {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes of parameters, found {}", n_bytes, buf.len()),
        ));
    }
    Ok(buf
        .chunks_exact(size_of::<f32>())
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::Sgd;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer_2x3() -> DenseLayer {
        let w = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        DenseLayer::from_parameters(w, vec![0.5, -0.5, 0.0]).unwrap()
    }

    #[test]
    fn new_layer_has_small_weights_and_zero_biases() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = DenseLayer::new(5, 4, &mut rng);
        assert_eq!(layer.weights.shape(), (5, 4));
        assert!(layer.weights.data.iter().flatten().all(|w| w.abs() <= INIT_RANGE));
        assert_eq!(layer.biases, vec![0.0; 4]);
    }

    #[test]
    fn forward_adds_bias_to_product() {
        let mut layer = layer_2x3();
        let x = Matrix::from_rows(vec![vec![1.0, 1.0], vec![0.0, 2.0]]).unwrap();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.data, vec![vec![5.5, 6.5, 9.0], vec![8.5, 9.5, 12.0]]);
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut layer = layer_2x3();
        let x = Matrix::zeros(1, 3);
        assert!(matches!(layer.forward(&x), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn backward_before_forward_fails() {
        let mut layer = layer_2x3();
        let g = Matrix::zeros(1, 3);
        assert!(matches!(layer.backward(&g), Err(Error::BackwardBeforeForward(_))));
    }

    #[test]
    fn backward_rejects_gradient_of_wrong_shape() {
        let mut layer = layer_2x3();
        layer.forward(&Matrix::zeros(2, 2)).unwrap();
        assert!(layer.backward(&Matrix::zeros(2, 2)).is_err());
        assert!(layer.backward(&Matrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn backward_averages_parameter_gradients_but_not_input_gradient() {
        let mut layer = layer_2x3();
        let x = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
        layer.forward(&x).unwrap();
        let g = Matrix::from_rows(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]]).unwrap();
        let dx = layer.backward(&g).unwrap();

        // dW[k][j] = (1/2) Σ_i x[i][k] g[i][j]
        assert_eq!(
            layer.weight_gradients().data,
            vec![vec![0.5, 0.0, 0.0], vec![0.0, 1.0, 1.0]]
        );
        assert_eq!(layer.bias_gradients(), &[0.5, 0.5, 0.5]);
        // dx[i][k] = Σ_j g[i][j] W[k][j]
        assert_eq!(dx.data, vec![vec![1.0, 4.0], vec![5.0, 11.0]]);
    }

    #[test]
    fn update_moves_against_gradient() {
        let mut layer = layer_2x3();
        layer.forward(&Matrix::from_rows(vec![vec![1.0, 0.0]]).unwrap()).unwrap();
        layer.backward(&Matrix::from_rows(vec![vec![1.0, 0.0, 0.0]]).unwrap()).unwrap();
        layer.update(&Sgd::new(0.1)).unwrap();
        assert_abs_diff_eq!(layer.weights.data[0][0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(layer.weights.data[1][0], 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(layer.biases[0], 0.4, epsilon = 1e-6);
    }

    #[test]
    fn save_writes_legacy_layout() {
        let layer = layer_2x3();
        let mut buf = Vec::new();
        layer.save(&mut buf).unwrap();
        assert_eq!(buf.len(), 2 * size_of::<usize>() + (6 + 3) * 4);
        assert_eq!(&buf[..size_of::<usize>()], &2usize.to_ne_bytes());
        let first_weight = &buf[2 * size_of::<usize>()..2 * size_of::<usize>() + 4];
        assert_eq!(first_weight, &1.0f32.to_ne_bytes());
    }

    #[test]
    fn load_restores_parameters_bit_for_bit() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut original = DenseLayer::new(3, 2, &mut rng);
        original.biases = vec![0.25, -0.125];
        let mut buf = Vec::new();
        original.save(&mut buf).unwrap();

        let mut restored = DenseLayer::new(3, 2, &mut rng);
        restored.load(&mut buf.as_slice()).unwrap();

        let x = Matrix::from_rows(vec![vec![0.3, -1.7, 2.2]]).unwrap();
        let a = original.forward(&x).unwrap();
        let b = restored.forward(&x).unwrap();
        for (va, vb) in a.data[0].iter().zip(b.data[0].iter()) {
            assert_eq!(va.to_bits(), vb.to_bits());
        }
    }

    #[test]
    fn load_adopts_stream_shape() {
        let mut buf = Vec::new();
        layer_2x3().save(&mut buf).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut other = DenseLayer::new(7, 7, &mut rng);
        other.load(&mut buf.as_slice()).unwrap();
        assert_eq!(other.dims(), Some((2, 3)));
        assert_eq!(other.biases, vec![0.5, -0.5, 0.0]);
    }

    #[test]
    fn load_truncated_stream_is_io_error() {
        let mut buf = Vec::new();
        layer_2x3().save(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        let mut layer = layer_2x3();
        match layer.load(&mut buf.as_slice()) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn load_rejects_overflowing_shape() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&usize::MAX.to_ne_bytes());
        buf.extend_from_slice(&2usize.to_ne_bytes());
        let mut layer = layer_2x3();
        assert!(matches!(layer.load(&mut buf.as_slice()), Err(Error::ModelFormat(_))));
    }
}
