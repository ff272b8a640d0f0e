use ndarray::{s, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, SgdError};
use crate::{Matrix, Vector};

/// Shuffles the samples with `seed` and holds out `test_size` of them.
///
/// Returns `(x_train, x_test, y_train, y_test)`.
pub fn train_test_split(
    x: &Matrix,
    y: &Vector,
    test_size: f64,
    seed: u64,
) -> Result<(Matrix, Matrix, Vector, Vector)> {
    if x.nrows() != y.len() {
        return Err(SgdError::SampleMismatch { x: x.nrows(), y: y.len() });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SgdError::invalid("test_size", "must be between 0 and 1"));
    }

    let n_samples = x.nrows();
    let n_test = (n_samples as f64 * test_size).round() as usize;
    if n_test == 0 || n_test == n_samples {
        return Err(SgdError::invalid(
            "test_size",
            format!("{} leaves an empty split of {} samples", test_size, n_samples),
        ));
    }

    let mut order: Vec<usize> = (0..n_samples).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let (test_idx, train_idx) = order.split_at(n_test);

    Ok((
        x.select(Axis(0), train_idx),
        x.select(Axis(0), test_idx),
        y.select(Axis(0), train_idx),
        y.select(Axis(0), test_idx),
    ))
}

/// Isotropic Gaussian blobs, `n_per_center` samples around each row of
/// `centers`, labelled `0.0, 1.0, ...` in center order.
pub fn make_blobs(
    centers: &Matrix,
    n_per_center: usize,
    std: f64,
    seed: u64,
) -> Result<(Matrix, Vector)> {
    let n_centers = centers.nrows();
    let n_features = centers.ncols();
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std)
        .map_err(|e| SgdError::invalid("std", e.to_string()))?;

    let mut x = Matrix::random_using((n_centers * n_per_center, n_features), noise, &mut rng);
    let mut y = Vector::zeros(n_centers * n_per_center);

    for (k, center) in centers.rows().into_iter().enumerate() {
        let block = s![k * n_per_center..(k + 1) * n_per_center, ..];
        for mut row in x.slice_mut(block).rows_mut() {
            row += &center;
        }
        y.slice_mut(s![k * n_per_center..(k + 1) * n_per_center]).fill(k as f64);
    }

    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_train_test_split() {
        let x = Matrix::from_shape_fn((100, 5), |(i, _)| i as f64);
        let y = Vector::from_iter((0..100).map(|i| i as f64));

        let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(x_train.nrows(), 80);
        assert_eq!(x_test.nrows(), 20);
        assert_eq!(y_train.len(), 80);
        for (row, label) in x_test.rows().into_iter().zip(y_test.iter()) {
            assert_eq!(row[0], *label);
        }

        let again = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(again.3, y_test);
    }

    #[test]
    fn test_train_test_split_invalid() {
        let x = Matrix::zeros((4, 1));
        let y = Vector::zeros(4);
        assert!(train_test_split(&x, &y, 1.5, 0).is_err());
        assert!(train_test_split(&x, &y, 0.05, 0).is_err());
        assert!(train_test_split(&x, &Vector::zeros(3), 0.5, 0).is_err());
    }

    #[test]
    fn test_make_blobs() {
        let centers = array![[10.0, 10.0], [-10.0, -10.0]];
        let (x, y) = make_blobs(&centers, 25, 0.5, 3).unwrap();

        assert_eq!(x.shape(), &[50, 2]);
        assert_eq!(y[0], 0.0);
        assert_eq!(y[49], 1.0);
        assert!(make_blobs(&centers, 5, -1.0, 0).is_err());
        let first_mean = x.slice(s![..25, ..]).mean_axis(Axis(0)).unwrap();
        assert!((first_mean[0] - 10.0).abs() < 1.0);
    }
}
