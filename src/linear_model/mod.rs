//! Linear classifiers trained by stochastic gradient descent.
//!
//! This module provides:
//! - `SGDClassifier`: binary and one-vs-rest linear classification
//! - loss functions (`Hinge`, `Log`, `ModifiedHuber`, `SquaredLoss`, `Huber`, ...)
//! - `Prior`: a Gaussian prior the weights are regularized toward
//! - `plain_sgd`: the per-sample update kernel behind the estimator
//!
//! # Examples
//!
//! ## Plain L2 regularization
//! ```rust
//! use priorsgd::{SGDClassifier, Loss};
//! use ndarray::array;
//!
//! let x = array![[1.0, 2.0], [2.0, 1.0], [-1.0, -2.0], [-2.0, -1.0]];
//! let y = array![1.0, 1.0, 0.0, 0.0];
//!
//! let mut model = SGDClassifier::new().loss(Loss::Log).random_state(42);
//! model.fit(&x, &y).unwrap();
//! let predictions = model.predict(&x).unwrap();
//! let probabilities = model.predict_proba(&x).unwrap();
//! assert_eq!(probabilities.ncols(), 2);
//! ```
//!
//! ## Regularization toward a prior
//! ```rust
//! use priorsgd::{Prior, SGDClassifier};
//! use ndarray::array;
//!
//! let x = array![[1.0, 2.0], [2.0, 1.0], [-1.0, -2.0], [-2.0, -1.0]];
//! let y = array![1.0, 1.0, 0.0, 0.0];
//!
//! // Weights learned on a related task; the second feature is trusted more.
//! let prior = Prior::new(array![0.8, 1.2], array![1.0, 10.0]).unwrap();
//! let mut model = SGDClassifier::new().prior(prior).alpha(0.01).random_state(0);
//! model.fit(&x, &y).unwrap();
//! let coef = model.coef().unwrap();
//! ```

mod loss;
mod prior;
mod sgd_fast;
mod stochastic_gradient;

pub use loss::{
    EpsilonInsensitive, Hinge, Huber, Log, Loss, LossFunction, ModifiedHuber,
    SquaredEpsilonInsensitive, SquaredHinge, SquaredLoss,
};
pub use prior::Prior;
pub use sgd_fast::{plain_sgd, LearningRate, Penalty, PriorRow, SgdOutcome, SgdParams};
pub use stochastic_gradient::{ClassWeight, SGDClassifier};
