use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use log::debug;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::loss::LossFunction;
use crate::error::{Result, SgdError};
use crate::seq_dataset::SequentialDataset;
use crate::weight_vector::WeightVector;
use crate::Vector;

const MAX_DLOSS: f64 = 1e12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    None,
    #[default]
    L2,
    L1,
    ElasticNet,
    /// Shrinkage toward a [`Prior`](super::Prior) mean.
    Prior,
}

impl FromStr for Penalty {
    type Err = SgdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Penalty::None),
            "l2" => Ok(Penalty::L2),
            "l1" => Ok(Penalty::L1),
            "elasticnet" | "elastic_net" => Ok(Penalty::ElasticNet),
            "prior" => Ok(Penalty::Prior),
            other => Err(SgdError::invalid("penalty", format!("unknown penalty {:?}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRate {
    /// `eta = eta0`
    Constant,
    /// `eta = 1 / (alpha * (t + t0))`
    #[default]
    Optimal,
    /// `eta = eta0 / t^power_t`
    InvScaling,
    /// `eta0`, divided by 5 whenever the loss stops improving.
    Adaptive,
}

impl FromStr for LearningRate {
    type Err = SgdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(LearningRate::Constant),
            "optimal" => Ok(LearningRate::Optimal),
            "invscaling" | "inv_scaling" => Ok(LearningRate::InvScaling),
            "adaptive" => Ok(LearningRate::Adaptive),
            other => Err(SgdError::invalid(
                "learning_rate",
                format!("unknown learning rate {:?}", other),
            )),
        }
    }
}

impl fmt::Display for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LearningRate::Constant => "constant",
            LearningRate::Optimal => "optimal",
            LearningRate::InvScaling => "invscaling",
            LearningRate::Adaptive => "adaptive",
        };
        f.write_str(name)
    }
}

/// Prior mean and precision for the coefficient row being trained.
#[derive(Clone, Copy, Debug)]
pub struct PriorRow<'a> {
    pub mean: ArrayView1<'a, f64>,
    pub precision: ArrayView1<'a, f64>,
}

pub struct SgdParams<'a> {
    pub loss: &'a dyn LossFunction,
    pub penalty: Penalty,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub prior: Option<PriorRow<'a>>,
    pub max_iter: usize,
    pub tol: Option<f64>,
    pub n_iter_no_change: usize,
    pub fit_intercept: bool,
    pub shuffle: bool,
    pub learning_rate: LearningRate,
    pub eta0: f64,
    pub power_t: f64,
    pub weight_pos: f64,
    pub weight_neg: f64,
    /// Update counter carried over from earlier calls; 1.0 for a fresh model.
    pub t: f64,
}

#[derive(Clone, Debug)]
pub struct SgdOutcome {
    pub weights: Vector,
    pub intercept: f64,
    pub n_iter: usize,
    pub t: f64,
}

/// Trains one binary linear model by plain stochastic gradient descent.
///
/// Targets in `dataset` must be encoded as `+1` / `-1`.
pub fn plain_sgd(
    weights: Vector,
    intercept: f64,
    dataset: &mut dyn SequentialDataset,
    params: &SgdParams<'_>,
) -> Result<SgdOutcome> {
    let n_samples = dataset.n_samples();
    let n_features = weights.len();
    let intercept_decay = dataset.intercept_decay();

    let prior = match (params.penalty, params.prior) {
        (Penalty::Prior, Some(prior)) => {
            if prior.mean.len() != n_features || prior.precision.len() != n_features {
                return Err(SgdError::invalid(
                    "prior",
                    format!("prior length doesn't match {} features", n_features),
                ));
            }
            Some(prior)
        }
        (Penalty::Prior, None) => {
            return Err(SgdError::invalid("prior", "penalty 'prior' requires a prior"));
        }
        _ => None,
    };

    let l1_ratio = match params.penalty {
        Penalty::L1 => 1.0,
        Penalty::ElasticNet => params.l1_ratio,
        _ => 0.0,
    };
    let shrinks_l2 = matches!(params.penalty, Penalty::L2 | Penalty::ElasticNet);
    let truncates_l1 = matches!(params.penalty, Penalty::L1 | Penalty::ElasticNet);

    let mut w = WeightVector::new(weights);
    let mut intercept = intercept;
    let mut t = params.t;
    let mut eta = params.eta0;

    let mut u = 0.0;
    let mut q = if truncates_l1 { Vector::zeros(n_features) } else { Vector::zeros(0) };

    let optimal_init = if params.learning_rate == LearningRate::Optimal {
        let typw = (1.0 / params.alpha.sqrt()).sqrt();
        let initial_eta0 = typw / params.loss.dloss(-typw, 1.0).max(1.0);
        1.0 / (initial_eta0 * params.alpha)
    } else {
        0.0
    };

    let mut best_loss = f64::INFINITY;
    let mut no_improvement_count = 0;
    let mut n_iter = 0;
    let started = Instant::now();

    for epoch in 0..params.max_iter {
        debug!("-- Epoch {}", epoch + 1);
        if params.shuffle {
            dataset.shuffle();
        }

        let mut sumloss = 0.0;
        for _ in 0..n_samples {
            let sample = dataset.next();
            let p = w.dot(sample.indices, sample.values) + intercept;

            eta = match params.learning_rate {
                LearningRate::Optimal => 1.0 / (params.alpha * (optimal_init + t - 1.0)),
                LearningRate::InvScaling => params.eta0 / t.powf(params.power_t),
                LearningRate::Constant | LearningRate::Adaptive => eta,
            };

            sumloss += params.loss.loss(p, sample.y);

            let class_weight = if sample.y > 0.0 { params.weight_pos } else { params.weight_neg };
            let update = (-params.loss.dloss(p, sample.y)).clamp(-MAX_DLOSS, MAX_DLOSS)
                * class_weight
                * sample.sample_weight;

            if shrinks_l2 {
                w.scale((1.0 - (1.0 - l1_ratio) * eta * params.alpha).max(0.0));
            }
            if let Some(prior) = prior {
                w.shrink_toward(prior.mean, prior.precision, eta * params.alpha);
            }

            if update != 0.0 {
                w.add(sample.indices, sample.values, eta * update);
                if params.fit_intercept {
                    intercept += eta * update * intercept_decay;
                }
            }

            if truncates_l1 {
                u += l1_ratio * eta * params.alpha;
                w.l1_truncate(sample.indices, u, &mut q);
            }

            t += 1.0;
        }

        w.reset_wscale();
        n_iter = epoch + 1;

        debug!(
            "Norm: {:.2}, NNZs: {}, Bias: {:.6}, T: {}, Avg. loss: {:.6}",
            w.norm(),
            w.nnz(),
            intercept,
            t,
            sumloss / n_samples.max(1) as f64
        );
        debug!("Total training time: {:.2} seconds.", started.elapsed().as_secs_f64());

        if !w.is_finite() || !intercept.is_finite() {
            return Err(SgdError::Diverged { epoch: epoch + 1 });
        }

        if let Some(tol) = params.tol {
            if sumloss > best_loss - tol * n_samples as f64 {
                no_improvement_count += 1;
            } else {
                no_improvement_count = 0;
            }
            if sumloss < best_loss {
                best_loss = sumloss;
            }

            if no_improvement_count >= params.n_iter_no_change {
                if params.learning_rate == LearningRate::Adaptive && eta > 1e-6 {
                    eta /= 5.0;
                    no_improvement_count = 0;
                } else {
                    debug!(
                        "Convergence after {} epochs took {:.2} seconds",
                        n_iter,
                        started.elapsed().as_secs_f64()
                    );
                    break;
                }
            }
        }
    }

    Ok(SgdOutcome { weights: w.to_vector(), intercept, n_iter, t })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_model::loss::{Hinge, Log, SquaredLoss};
    use crate::seq_dataset::ArrayDataset;
    use crate::Matrix;
    use ndarray::array;

    fn params<'a>(loss: &'a dyn LossFunction) -> SgdParams<'a> {
        SgdParams {
            loss,
            penalty: Penalty::L2,
            alpha: 1e-4,
            l1_ratio: 0.15,
            prior: None,
            max_iter: 50,
            tol: None,
            n_iter_no_change: 5,
            fit_intercept: true,
            shuffle: true,
            learning_rate: LearningRate::Optimal,
            eta0: 0.0,
            power_t: 0.5,
            weight_pos: 1.0,
            weight_neg: 1.0,
            t: 1.0,
        }
    }

    fn separable() -> (Matrix, Vector) {
        let x = array![
            [2.0, 1.0],
            [3.0, 2.0],
            [2.5, 3.0],
            [-2.0, -1.0],
            [-3.0, -2.5],
            [-1.5, -3.0]
        ];
        let y = array![1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
        (x, y)
    }

    #[test]
    fn test_hinge_separates_data() {
        let (x, y) = separable();
        let sw = Vector::ones(6);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 3);
        let loss = Hinge::default();

        let outcome = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &params(&loss)).unwrap();
        let scores = x.dot(&outcome.weights) + outcome.intercept;
        for (score, label) in scores.iter().zip(y.iter()) {
            assert!(score * label > 0.0);
        }
        assert_eq!(outcome.n_iter, 50);
        assert_eq!(outcome.t, 1.0 + 50.0 * 6.0);
    }

    #[test]
    fn test_tolerance_stops_early() {
        let (x, y) = separable();
        let sw = Vector::ones(6);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let loss = Log;
        let mut p = params(&loss);
        p.max_iter = 1000;
        p.tol = Some(1e-3);

        let outcome = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap();
        assert!(outcome.n_iter < 1000);
        assert!(outcome.n_iter > p.n_iter_no_change);
    }

    #[test]
    fn test_prior_penalty_pulls_toward_mean() {
        let (x, y) = separable();
        let sw = Vector::ones(6);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let loss = Hinge::default();
        let mean = array![-4.0, 7.0];
        let precision = array![1.0, 1.0];

        let mut p = params(&loss);
        p.penalty = Penalty::Prior;
        p.alpha = 100.0;
        p.learning_rate = LearningRate::Constant;
        p.eta0 = 0.01;
        p.fit_intercept = false;
        p.prior = Some(PriorRow { mean: mean.view(), precision: precision.view() });

        let outcome = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap();
        assert!((outcome.weights[0] + 4.0).abs() < 0.1);
        assert!((outcome.weights[1] - 7.0).abs() < 0.1);
    }

    #[test]
    fn test_prior_penalty_without_prior_is_rejected() {
        let (x, y) = separable();
        let sw = Vector::ones(6);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let loss = Hinge::default();
        let mut p = params(&loss);
        p.penalty = Penalty::Prior;

        assert!(plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).is_err());
    }

    #[test]
    fn test_l1_produces_sparse_weights() {
        let x = array![
            [1.0, 0.01],
            [2.0, -0.02],
            [-1.0, 0.01],
            [-2.0, -0.01]
        ];
        let y = array![1.0, 1.0, -1.0, -1.0];
        let sw = Vector::ones(4);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 1);
        let loss = Hinge::default();
        let mut p = params(&loss);
        p.penalty = Penalty::L1;
        p.alpha = 0.05;
        p.learning_rate = LearningRate::Constant;
        p.eta0 = 0.1;

        let outcome = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap();
        assert!(outcome.weights[0] > 0.0);
        assert_eq!(outcome.weights[1], 0.0);
    }

    #[test]
    fn test_adaptive_divides_eta_before_stopping() {
        let (x, y) = separable();
        let sw = Vector::ones(6);
        let loss = Hinge::default();
        let mut p = params(&loss);
        p.max_iter = 1000;
        // Every epoch after the first counts as no improvement.
        p.tol = Some(1e6);
        p.n_iter_no_change = 2;
        p.eta0 = 0.1;

        p.learning_rate = LearningRate::Constant;
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let constant = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap();
        assert_eq!(constant.n_iter, 3);

        // eta goes 0.1 -> 0.02 -> ... -> 2.56e-7 in eight divisions, two
        // epochs apart, before dropping under 1e-6 stops training.
        p.learning_rate = LearningRate::Adaptive;
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let adaptive = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap();
        assert_eq!(adaptive.n_iter, 19);
        assert_eq!(adaptive.t, 1.0 + 19.0 * 6.0);
    }

    #[test]
    fn test_invscaling_step_size() {
        let x = array![[1.0]];
        let y = array![1.0];
        let sw = Vector::ones(1);
        let loss = SquaredLoss;
        let mut p = params(&loss);
        p.penalty = Penalty::None;
        p.learning_rate = LearningRate::InvScaling;
        p.eta0 = 1.0;
        p.power_t = 0.5;
        p.max_iter = 1;
        p.shuffle = false;
        p.fit_intercept = false;
        p.t = 4.0;

        // One step from zero with dloss = -1 moves the weight by eta0 / sqrt(4).
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let outcome = plain_sgd(Vector::zeros(1), 0.0, &mut dataset, &p).unwrap();
        assert!((outcome.weights[0] - 0.5).abs() < 1e-12);
        assert_eq!(outcome.t, 5.0);

        p.power_t = 0.0;
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let outcome = plain_sgd(Vector::zeros(1), 0.0, &mut dataset, &p).unwrap();
        assert!((outcome.weights[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_elastic_net_mixes_l2_and_l1() {
        let x = array![
            [1.0, 0.5],
            [2.0, -0.2],
            [-1.0, 0.3],
            [-2.0, -0.4]
        ];
        let y = array![1.0, 1.0, -1.0, -1.0];
        let sw = Vector::ones(4);
        let loss = Hinge::default();
        let run = |penalty: Penalty, l1_ratio: f64| {
            let mut p = params(&loss);
            p.penalty = penalty;
            p.l1_ratio = l1_ratio;
            p.alpha = 0.05;
            p.learning_rate = LearningRate::Constant;
            p.eta0 = 0.1;
            let mut dataset = ArrayDataset::new(&x, &y, &sw, 4);
            plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap()
        };

        let l2 = run(Penalty::L2, 0.15);
        let l1 = run(Penalty::L1, 0.15);
        let pure_l2 = run(Penalty::ElasticNet, 0.0);
        let pure_l1 = run(Penalty::ElasticNet, 1.0);
        let mixed = run(Penalty::ElasticNet, 0.5);

        assert_eq!(pure_l2.weights, l2.weights);
        assert_eq!(pure_l2.intercept, l2.intercept);
        assert_eq!(pure_l1.weights, l1.weights);
        assert_eq!(pure_l1.intercept, l1.intercept);
        assert_ne!(mixed.weights, l2.weights);
        assert_ne!(mixed.weights, l1.weights);
    }

    #[test]
    fn test_divergence_is_reported() {
        let x = array![[1e200, 1e200], [-1e200, 1e200]];
        let y = array![1.0, -1.0];
        let sw = Vector::ones(2);
        let mut dataset = ArrayDataset::new(&x, &y, &sw, 0);
        let loss = SquaredLoss;
        let mut p = params(&loss);
        p.learning_rate = LearningRate::Constant;
        p.eta0 = 1.0;
        p.penalty = Penalty::None;

        let err = plain_sgd(Vector::zeros(2), 0.0, &mut dataset, &p).unwrap_err();
        assert!(matches!(err, SgdError::Diverged { epoch: 1 }));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("elasticnet".parse::<Penalty>().unwrap(), Penalty::ElasticNet);
        assert_eq!("prior".parse::<Penalty>().unwrap(), Penalty::Prior);
        assert_eq!("invscaling".parse::<LearningRate>().unwrap(), LearningRate::InvScaling);
        assert!("fast".parse::<LearningRate>().is_err());
    }
}
