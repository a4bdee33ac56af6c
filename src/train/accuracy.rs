use crate::math::matrix::Matrix;

/// Index of the maximum element in a slice; the first maximum wins on ties
/// and an empty slice yields 0.
pub fn argmax(v: &[f32]) -> usize {
    let mut best = 0;
    for (i, &x) in v.iter().enumerate() {
        if x > v[best] {
            best = i;
        }
    }
    best
}

/// Number of rows whose predicted class (argmax) matches the target's.
pub fn calculate_batch_accuracy(predictions: &Matrix, targets: &Matrix) -> usize {
    predictions
        .data
        .iter()
        .zip(targets.data.iter())
        .filter(|(p, t)| argmax(p) == argmax(t))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_matching_rows() {
        let p = Matrix::from_rows(vec![vec![0.1, 0.9], vec![0.8, 0.2]]).unwrap();
        let t = Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(calculate_batch_accuracy(&p, &t), 2);
    }

    #[test]
    fn counts_misses() {
        let p = Matrix::from_rows(vec![vec![0.6, 0.4], vec![0.8, 0.2]]).unwrap();
        let t = Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(calculate_batch_accuracy(&p, &t), 1);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
