use rand::Rng;
use rayon::prelude::*;
use std::fmt;
use std::ops::{Mul, Sub};

use crate::error::{Error, Result};

/// Row-major `f32` matrix. Used both as a batch tensor (batch × features)
/// and as a dense layer's weight matrix (input_size × output_size).
///
/// Every row is expected to hold exactly `cols` values. `from_rows` checks
/// this; code that fills the public fields directly must keep it.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f32>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Samples every entry uniformly from `[min, max]`.
    pub fn random_uniform<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        min: f32,
        max: f32,
        rng: &mut R,
    ) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for row in res.data.iter_mut() {
            for val in row.iter_mut() {
                *val = rng.gen_range(min..=max);
            }
        }

        res
    }

    /// Builds a matrix from rows, rejecting ragged input.
    /// An empty vector yields a 0×0 matrix.
    pub fn from_rows(data: Vec<Vec<f32>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, |row| row.len());
        if let Some((row, bad)) = data.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(Error::RaggedBatch {
                row,
                expected: cols,
                got: bad.len(),
            });
        }

        Ok(Matrix {
            rows: data.len(),
            cols,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Copies the given rows, in the given order, into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        Matrix {
            rows: indices.len(),
            cols: self.cols,
            data: indices.iter().map(|&i| self.data[i].clone()).collect(),
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f32) -> f32,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Adds `vector` to every row (bias broadcast).
    ///
    /// # Panics
    /// Panics if `vector.len() != self.cols`.
    pub fn add_row_vector(&mut self, vector: &[f32]) {
        assert_eq!(vector.len(), self.cols, "row vector length must equal column count");
        for row in self.data.iter_mut() {
            for (val, b) in row.iter_mut().zip(vector) {
                *val += b;
            }
        }
    }

    /// Sum of each column, i.e. the reduction over the batch axis.
    pub fn column_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.cols];
        for row in &self.data {
            for (s, v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        sums
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    ///
    /// # Panics
    /// Panics if the shapes differ.
    pub fn hadamard(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.shape(), rhs.shape(), "Matrices are of incorrect sizes");
        let data = self
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(row_a, row_b)| row_a.iter().zip(row_b.iter()).map(|(x, y)| x * y).collect())
            .collect();
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            rows: 0,
            cols: 0,
            data: vec![],
        }
    }
}

impl Sub for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, self.cols);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] - rhs.data[i][j];
            }
        }

        res
    }
}

/// Matrix product. Output rows are independent, so they are computed in
/// parallel.
impl Mul for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.cols != rhs.rows {
            panic!("Matrices are of incorrect sizes")
        }

        let data: Vec<Vec<f32>> = self
            .data
            .par_iter()
            .map(|row| {
                let mut out = vec![0.0f32; rhs.cols];
                for (k, &a) in row.iter().enumerate() {
                    for (o, &b) in out.iter_mut().zip(rhs.data[k].iter()) {
                        *o += a * b;
                    }
                }
                out
            })
            .collect();

        Matrix {
            rows: self.rows,
            cols: rhs.cols,
            data,
        }
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.data {
            let line: Vec<String> = row.iter().map(|v| format!("{:.3}", v)).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
