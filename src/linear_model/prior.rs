use ndarray::{ArrayView1, Axis};

use crate::error::{Result, SgdError};
use crate::{Matrix, Vector};

/// Gaussian prior over the coefficients.
///
/// The penalty added to the objective is
/// `alpha / 2 * sum_j precision[j] * (w[j] - mean[j])^2`, so regularization
/// pulls each weight toward its prior mean instead of toward zero. A feature
/// with zero precision is left unregularized.
///
/// Both matrices hold either a single row, shared by every one-vs-rest
/// sub-problem, or one row per coefficient row of the fitted model.
#[derive(Clone, Debug, PartialEq)]
pub struct Prior {
    mean: Matrix,
    precision: Matrix,
}

impl Prior {
    pub fn new(mean: Vector, precision: Vector) -> Result<Self> {
        let n = mean.len();
        let mean = mean.insert_axis(Axis(0));
        let precision = precision.insert_axis(Axis(0));
        if precision.ncols() != n {
            return Err(SgdError::invalid(
                "prior",
                format!("mean has {} features but precision has {}", n, precision.ncols()),
            ));
        }
        Self::per_class(mean, precision)
    }

    /// Same precision for every feature.
    pub fn isotropic(mean: Vector, precision: f64) -> Result<Self> {
        let precision = Vector::from_elem(mean.len(), precision);
        Self::new(mean, precision)
    }

    pub fn per_class(mean: Matrix, precision: Matrix) -> Result<Self> {
        if mean.shape() != precision.shape() {
            return Err(SgdError::invalid(
                "prior",
                format!(
                    "mean shape {:?} doesn't match precision shape {:?}",
                    mean.shape(),
                    precision.shape()
                ),
            ));
        }
        if mean.nrows() == 0 || mean.ncols() == 0 {
            return Err(SgdError::invalid("prior", "mean must not be empty"));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(SgdError::invalid("prior", "mean must be finite"));
        }
        if precision.iter().any(|&p| !p.is_finite() || p < 0.0) {
            return Err(SgdError::invalid("prior", "precision must be finite and non-negative"));
        }

        Ok(Self { mean, precision })
    }

    pub fn n_features(&self) -> usize {
        self.mean.ncols()
    }

    pub fn n_rows(&self) -> usize {
        self.mean.nrows()
    }

    pub fn mean(&self, k: usize) -> ArrayView1<'_, f64> {
        self.mean.row(self.row_index(k))
    }

    pub fn precision(&self, k: usize) -> ArrayView1<'_, f64> {
        self.precision.row(self.row_index(k))
    }

    /// Checks the prior fits a model with `n_coef` coefficient rows.
    pub(crate) fn check(&self, n_coef: usize, n_features: usize) -> Result<()> {
        if self.n_features() != n_features {
            return Err(SgdError::invalid(
                "prior",
                format!(
                    "prior has {} features but X has {}",
                    self.n_features(),
                    n_features
                ),
            ));
        }
        if self.n_rows() != 1 && self.n_rows() != n_coef {
            return Err(SgdError::invalid(
                "prior",
                format!(
                    "prior has {} rows, expected 1 or {}",
                    self.n_rows(),
                    n_coef
                ),
            ));
        }
        Ok(())
    }

    /// Value of the penalty for a coefficient row, without the `alpha` factor.
    pub fn penalty(&self, k: usize, coef: ArrayView1<f64>) -> f64 {
        let mean = self.mean(k);
        let precision = self.precision(k);
        0.5 * coef
            .iter()
            .zip(mean.iter())
            .zip(precision.iter())
            .map(|((&w, &m), &p)| p * (w - m) * (w - m))
            .sum::<f64>()
    }

    fn row_index(&self, k: usize) -> usize {
        if self.n_rows() == 1 { 0 } else { k }
    }
}
