use thiserror::Error;

/// Errors raised while configuring, fitting or querying an estimator.
#[derive(Debug, Error)]
pub enum SgdError {
    #[error("Number of samples in X ({x}) and y ({y}) must match")]
    SampleMismatch { x: usize, y: usize },

    #[error("Number of features in X ({found}) doesn't match training data ({expected})")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("Model not fitted. Call fit() first.")]
    NotFitted,

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid labels: {0}")]
    InvalidLabels(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Input {0} contains NaN or infinity")]
    NonFinite(&'static str),

    #[error(
        "Floating-point under-/overflow occurred at epoch #{epoch}. \
         Scaling input data with StandardScaler might help."
    )]
    Diverged { epoch: usize },

    #[error("probability estimates are not available for loss={0:?}")]
    ProbabilityUnsupported(String),

    #[error("Invalid sparse matrix: {0}")]
    InvalidSparse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SgdError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SgdError::InvalidParameter { name, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, SgdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SgdError::FeatureMismatch { expected: 3, found: 2 };
        assert!(err.to_string().contains("(2)"));
        assert!(err.to_string().contains("(3)"));

        let err = SgdError::Diverged { epoch: 4 };
        assert!(err.to_string().contains("epoch #4"));

        let err = SgdError::NonFinite("X");
        assert_eq!(err.to_string(), "Input X contains NaN or infinity");

        let err = SgdError::invalid("alpha", "must be non-negative");
        assert_eq!(err.to_string(), "Invalid parameter alpha: must be non-negative");
    }

    #[test]
    fn test_json_error_converts() {
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: SgdError = parsed.unwrap_err().into();
        assert!(matches!(err, SgdError::Json(_)));
    }
}
