pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod build_config;
pub mod config;
pub mod dataset;
pub mod error;
pub mod linear_model;
pub mod metrics;
pub mod preprocessing;
pub mod seq_dataset;
pub mod sparse;
pub mod weight_vector;

pub use error::{Result, SgdError};
pub use linear_model::{
    ClassWeight, Hinge, Huber, LearningRate, Log, Loss, LossFunction, ModifiedHuber, Penalty,
    Prior, SGDClassifier, SquaredLoss,
};
pub use preprocessing::StandardScaler;
pub use seq_dataset::FeatureMatrix;
pub use sparse::CsrMatrix;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
