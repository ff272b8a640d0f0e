//! Serializable estimator settings.
//!
//! ```rust
//! use priorsgd::config::SgdConfig;
//! use priorsgd::SGDClassifier;
//!
//! let config = SgdConfig::from_json(r#"{
//!     "loss": "log",
//!     "alpha": 0.01,
//!     "prior": { "mean": [0.5, -0.5], "precision": [1.0, 1.0] }
//! }"#).unwrap();
//! let model = SGDClassifier::from_config(&config).unwrap();
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::linear_model::{ClassWeight, LearningRate, Loss, Penalty, Prior};
use crate::Vector;

/// Prior mean and precision shared by every class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorSpec {
    pub mean: Vec<f64>,
    pub precision: Vec<f64>,
}

impl PriorSpec {
    pub fn to_prior(&self) -> Result<Prior> {
        Prior::new(Vector::from(self.mean.clone()), Vector::from(self.precision.clone()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub loss: Loss,
    pub penalty: Penalty,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    pub tol: Option<f64>,
    pub shuffle: bool,
    pub epsilon: f64,
    pub random_state: Option<u64>,
    pub learning_rate: LearningRate,
    pub eta0: f64,
    pub power_t: f64,
    pub n_iter_no_change: usize,
    pub warm_start: bool,
    pub class_weight: ClassWeight,
    pub prior: Option<PriorSpec>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            loss: Loss::Hinge,
            penalty: Penalty::L2,
            alpha: 1e-4,
            l1_ratio: 0.15,
            fit_intercept: true,
            max_iter: 1000,
            tol: Some(1e-3),
            shuffle: true,
            epsilon: 0.1,
            random_state: None,
            learning_rate: LearningRate::Optimal,
            eta0: 0.0,
            power_t: 0.5,
            n_iter_no_change: 5,
            warm_start: false,
            class_weight: ClassWeight::None,
            prior: None,
        }
    }
}

impl SgdConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SgdError;
    use crate::SGDClassifier;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = SgdConfig::from_json(r#"{"loss": "modified_huber", "alpha": 0.5}"#).unwrap();
        assert_eq!(config.loss, Loss::ModifiedHuber);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.max_iter, 1000);
        assert_eq!(config.learning_rate, LearningRate::Optimal);
    }

    #[test]
    fn test_enum_spelling() {
        let config = SgdConfig::from_json(
            r#"{"penalty": "elastic_net", "learning_rate": "inv_scaling", "eta0": 0.1,
                "class_weight": "balanced"}"#,
        )
        .unwrap();
        assert_eq!(config.penalty, Penalty::ElasticNet);
        assert_eq!(config.learning_rate, LearningRate::InvScaling);
        assert_eq!(config.class_weight, ClassWeight::Balanced);
    }

    #[test]
    fn test_json_round_trip_preserves_prior() {
        let config = SgdConfig {
            prior: Some(PriorSpec { mean: vec![1.0, 2.0], precision: vec![0.5, 0.5] }),
            random_state: Some(9),
            ..SgdConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(SgdConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_from_config_selects_prior_penalty() {
        let config = SgdConfig::from_json(r#"{"prior": {"mean": [0.0], "precision": [2.0]}}"#)
            .unwrap();
        let model = SGDClassifier::from_config(&config).unwrap();
        assert!(!model.is_fitted());

        let bad = SgdConfig::from_json(r#"{"prior": {"mean": [0.0, 1.0], "precision": [2.0]}}"#)
            .unwrap();
        assert!(SGDClassifier::from_config(&bad).is_err());

        let bad = SgdConfig { alpha: -1.0, ..SgdConfig::default() };
        assert!(matches!(
            SGDClassifier::from_config(&bad),
            Err(SgdError::InvalidParameter { name: "alpha", .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(SgdConfig::from_json("{"), Err(SgdError::Json(_))));
        assert!(matches!(
            SgdConfig::from_file("/nonexistent/priorsgd.json"),
            Err(SgdError::Io(_))
        ));
    }
}
