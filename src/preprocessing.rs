use ndarray::Axis;

use crate::error::{Result, SgdError};
use crate::{Matrix, Vector};

/// Standardizes features to zero mean and unit variance.
///
/// SGD is sensitive to feature scaling; columns with zero variance are only
/// centered.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    mean: Option<Vector>,
    scale: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { mean: None, scale: None }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| SgdError::EmptyInput("cannot fit a scaler on zero samples".to_string()))?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > 1e-12 { std } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self.mean.as_ref().ok_or(SgdError::NotFitted)?;
        let scale = self.scale.as_ref().ok_or(SgdError::NotFitted)?;

        if data.ncols() != mean.len() {
            return Err(SgdError::FeatureMismatch { expected: mean.len(), found: data.ncols() });
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row -= mean;
            row /= scale;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }

    pub fn mean(&self) -> Option<&Vector> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Vector> {
        self.scale.as_ref()
    }
}
