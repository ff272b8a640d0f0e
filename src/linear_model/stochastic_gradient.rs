use std::collections::HashMap;

use log::{info, warn};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::loss::Loss;
use super::prior::Prior;
use super::sgd_fast::{plain_sgd, LearningRate, Penalty, PriorRow, SgdParams};
use crate::config::SgdConfig;
use crate::error::{Result, SgdError};
use crate::seq_dataset::FeatureMatrix;
use crate::{Matrix, Vector};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    #[default]
    None,
    /// `n_samples / (n_classes * count(class))`
    Balanced,
    /// Explicit `(label, weight)` pairs; unlisted classes weigh 1.
    Custom(Vec<(f64, f64)>),
}

/// Linear classifier fitted by stochastic gradient descent, with optional
/// regularization toward a [`Prior`].
///
/// Binary problems train a single coefficient row whose positive class is
/// `classes[1]`; problems with more classes train one row per class,
/// one-vs-rest.
#[derive(Clone, Debug)]
pub struct SGDClassifier {
    classes: Option<Vec<f64>>,
    coef: Option<Matrix>,
    intercept: Option<Vector>,
    n_iter: usize,
    t: f64,
    loss: Loss,
    penalty: Penalty,
    alpha: f64,
    l1_ratio: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: Option<f64>,
    shuffle: bool,
    epsilon: f64,
    random_state: Option<u64>,
    learning_rate: LearningRate,
    eta0: f64,
    power_t: f64,
    n_iter_no_change: usize,
    warm_start: bool,
    class_weight: ClassWeight,
    prior: Option<Prior>,
}

impl SGDClassifier {
    pub fn new() -> Self {
        Self {
            classes: None,
            coef: None,
            intercept: None,
            n_iter: 0,
            t: 1.0,
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

    pub fn from_config(config: &SgdConfig) -> Result<Self> {
        let mut model = Self::new()
            .loss(config.loss)
            .penalty(config.penalty)
            .alpha(config.alpha)
            .l1_ratio(config.l1_ratio)
            .fit_intercept(config.fit_intercept)
            .max_iter(config.max_iter)
            .tol(config.tol)
            .shuffle(config.shuffle)
            .epsilon(config.epsilon)
            .learning_rate(config.learning_rate)
            .eta0(config.eta0)
            .power_t(config.power_t)
            .n_iter_no_change(config.n_iter_no_change)
            .warm_start(config.warm_start)
            .class_weight(config.class_weight.clone());

        if let Some(seed) = config.random_state {
            model = model.random_state(seed);
        }
        if let Some(spec) = &config.prior {
            model = model.prior(spec.to_prior()?);
        }

        model.validate_params()?;
        Ok(model)
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// `None` disables the loss-based stopping criterion.
    pub fn tol(mut self, tol: Option<f64>) -> Self {
        self.tol = tol;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    pub fn learning_rate(mut self, learning_rate: LearningRate) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn eta0(mut self, eta0: f64) -> Self {
        self.eta0 = eta0;
        self
    }

    pub fn power_t(mut self, power_t: f64) -> Self {
        self.power_t = power_t;
        self
    }

    pub fn n_iter_no_change(mut self, n_iter_no_change: usize) -> Self {
        self.n_iter_no_change = n_iter_no_change;
        self
    }

    pub fn warm_start(mut self, warm_start: bool) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Regularize toward `prior`; selects [`Penalty::Prior`].
    pub fn prior(mut self, prior: Prior) -> Self {
        self.prior = Some(prior);
        self.penalty = Penalty::Prior;
        self
    }

    pub fn classes(&self) -> Option<&[f64]> {
        self.classes.as_deref()
    }

    pub fn coef(&self) -> Option<&Matrix> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> Option<&Vector> {
        self.intercept.as_ref()
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn is_fitted(&self) -> bool {
        self.coef.is_some()
    }

    pub fn fit<X: FeatureMatrix>(&mut self, x: &X, y: &Vector) -> Result<()> {
        let sample_weight = Vector::ones(y.len());
        self.fit_weighted(x, y, &sample_weight)
    }

    pub fn fit_weighted<X: FeatureMatrix>(
        &mut self,
        x: &X,
        y: &Vector,
        sample_weight: &Vector,
    ) -> Result<()> {
        self.validate_params()?;
        check_inputs(x, y, sample_weight)?;

        let classes = unique_labels(y)?;
        if classes.len() < 2 {
            return Err(SgdError::InvalidLabels(format!(
                "The number of classes has to be greater than one; got {} class",
                classes.len()
            )));
        }

        let reuse = self.warm_start && self.classes.as_deref() == Some(&classes[..]);
        let start = match (&self.coef, &self.intercept) {
            (Some(coef), Some(intercept)) if reuse => Some((coef, intercept, self.t)),
            _ => None,
        };

        let trained = self.train(x, y, sample_weight, &classes, start, self.max_iter)?;
        self.classes = Some(classes);
        self.commit(trained);

        if self.tol.is_some() && self.n_iter == self.max_iter {
            warn!(
                "Maximum number of iteration reached before convergence. \
                 Consider increasing max_iter to improve the fit."
            );
        }
        info!(
            "SGDClassifier fitted: {} classes, {} features, {} epochs",
            self.classes.as_ref().map_or(0, Vec::len),
            x.n_features(),
            self.n_iter
        );
        Ok(())
    }

    /// Runs a single epoch over `x`, continuing from the current solution.
    ///
    /// `classes` must be given on the first call and cover every label seen
    /// later.
    pub fn partial_fit<X: FeatureMatrix>(
        &mut self,
        x: &X,
        y: &Vector,
        classes: Option<&[f64]>,
    ) -> Result<()> {
        self.validate_params()?;
        if self.class_weight == ClassWeight::Balanced {
            return Err(SgdError::invalid(
                "class_weight",
                "'balanced' is not supported for partial_fit; pass explicit weights",
            ));
        }
        let sample_weight = Vector::ones(y.len());
        check_inputs(x, y, &sample_weight)?;

        let classes = match (&self.classes, classes) {
            (None, None) => {
                return Err(SgdError::invalid(
                    "classes",
                    "classes must be passed on the first call to partial_fit",
                ));
            }
            (None, Some(given)) => {
                let classes = unique_labels(&Vector::from(given.to_vec()))?;
                if classes.len() < 2 {
                    return Err(SgdError::InvalidLabels(
                        "The number of classes has to be greater than one".to_string(),
                    ));
                }
                classes
            }
            (Some(known), Some(given)) => {
                let given = unique_labels(&Vector::from(given.to_vec()))?;
                if *known != given {
                    return Err(SgdError::invalid(
                        "classes",
                        format!("{:?} is not the same as on last call {:?}", given, known),
                    ));
                }
                given
            }
            (Some(known), None) => known.clone(),
        };

        if let Some(label) = y.iter().find(|label| !classes.contains(label)) {
            return Err(SgdError::InvalidLabels(format!(
                "label {} is not in classes {:?}",
                label, classes
            )));
        }

        let start = match (&self.coef, &self.intercept) {
            (Some(coef), Some(intercept)) => Some((coef, intercept, self.t)),
            _ => None,
        };
        let trained = self.train(x, y, &sample_weight, &classes, start, 1)?;
        self.classes = Some(classes);
        self.commit(trained);
        Ok(())
    }

    pub fn decision_function<X: FeatureMatrix>(&self, x: &X) -> Result<Matrix> {
        let coef = self.coef.as_ref().ok_or(SgdError::NotFitted)?;
        let intercept = self.intercept.as_ref().ok_or(SgdError::NotFitted)?;

        if x.n_features() != coef.ncols() {
            return Err(SgdError::FeatureMismatch {
                expected: coef.ncols(),
                found: x.n_features(),
            });
        }

        Ok(x.linear_predict(coef, intercept))
    }

    pub fn predict<X: FeatureMatrix>(&self, x: &X) -> Result<Vector> {
        let scores = self.decision_function(x)?;
        let classes = self.classes.as_ref().ok_or(SgdError::NotFitted)?;

        let predictions = if scores.ncols() == 1 {
            scores
                .column(0)
                .mapv(|score| if score > 0.0 { classes[1] } else { classes[0] })
        } else {
            scores
                .rows()
                .into_iter()
                .map(|row| classes[argmax(row.iter().copied())])
                .collect()
        };
        Ok(predictions)
    }

    /// Class membership probabilities, one column per class.
    ///
    /// Only available for `log` and `modified_huber` losses.
    pub fn predict_proba<X: FeatureMatrix>(&self, x: &X) -> Result<Matrix> {
        let scores = self.decision_function(x)?;

        let mut proba = match self.loss {
            Loss::Log => scores.mapv(sigmoid),
            Loss::ModifiedHuber => scores.mapv(|d| (d.clamp(-1.0, 1.0) + 1.0) / 2.0),
            other => return Err(SgdError::ProbabilityUnsupported(other.to_string())),
        };

        if proba.ncols() == 1 {
            let positive = proba.column(0).to_owned();
            let mut binary = Matrix::zeros((proba.nrows(), 2));
            binary.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            binary.column_mut(1).assign(&positive);
            return Ok(binary);
        }

        let n_classes = proba.ncols() as f64;
        for mut row in proba.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(1.0 / n_classes);
            }
        }
        Ok(proba)
    }

    pub fn predict_log_proba<X: FeatureMatrix>(&self, x: &X) -> Result<Matrix> {
        Ok(self.predict_proba(x)?.mapv(f64::ln))
    }

    /// Mean accuracy on `x` against `y`.
    pub fn score<X: FeatureMatrix>(&self, x: &X, y: &Vector) -> Result<f64> {
        let predictions = self.predict(x)?;
        crate::metrics::accuracy_score(y, &predictions)
    }

    fn validate_params(&self) -> Result<()> {
        if !(self.alpha >= 0.0) {
            return Err(SgdError::invalid("alpha", format!("must be >= 0, got {}", self.alpha)));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(SgdError::invalid(
                "l1_ratio",
                format!("must be in [0, 1], got {}", self.l1_ratio),
            ));
        }
        if self.max_iter == 0 {
            return Err(SgdError::invalid("max_iter", "must be > 0"));
        }
        if self.n_iter_no_change == 0 {
            return Err(SgdError::invalid("n_iter_no_change", "must be >= 1"));
        }
        if self.loss.uses_epsilon() && !(self.epsilon >= 0.0) {
            return Err(SgdError::invalid("epsilon", format!("must be >= 0, got {}", self.epsilon)));
        }
        match self.learning_rate {
            LearningRate::Optimal if self.alpha == 0.0 => {
                return Err(SgdError::invalid(
                    "alpha",
                    "alpha must be > 0 since learning_rate is 'optimal'",
                ));
            }
            LearningRate::Optimal => {}
            _ if !(self.eta0 > 0.0) => {
                return Err(SgdError::invalid(
                    "eta0",
                    format!("must be > 0 for learning_rate '{}'", self.learning_rate),
                ));
            }
            _ => {}
        }
        if self.penalty == Penalty::Prior && self.prior.is_none() {
            return Err(SgdError::invalid("prior", "penalty 'prior' requires a prior"));
        }
        Ok(())
    }

    /// Shared by `fit` and `partial_fit`. Continues from `start`
    /// (coefficients, intercepts, `t`) when given, otherwise from the initial
    /// coefficients with `t = 1`. Leaves `self` untouched, so a failed call
    /// keeps the previous model.
    fn train<X: FeatureMatrix>(
        &self,
        x: &X,
        y: &Vector,
        sample_weight: &Vector,
        classes: &[f64],
        start: Option<(&Matrix, &Vector, f64)>,
        max_iter: usize,
    ) -> Result<Trained> {
        let n_features = x.n_features();
        let n_coef = if classes.len() == 2 { 1 } else { classes.len() };

        let prior = self.prior.as_ref().filter(|_| self.penalty == Penalty::Prior);
        if let Some(prior) = prior {
            prior.check(n_coef, n_features)?;
        }

        let (mut coef, mut intercept, t) = match start {
            Some((coef, intercept, t)) => {
                if coef.ncols() != n_features {
                    return Err(SgdError::FeatureMismatch {
                        expected: coef.ncols(),
                        found: n_features,
                    });
                }
                (coef.clone(), intercept.clone(), t)
            }
            None => (self.initial_coef(n_coef, n_features), Vector::zeros(n_coef), 1.0),
        };

        let class_weights = self.expanded_class_weight(classes, y)?;
        let loss = self.loss.build(self.epsilon);
        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or_else(rand::random::<u64>));

        let mut n_iter = 0;
        for k in 0..n_coef {
            let (positive, weight_pos, weight_neg) = if n_coef == 1 {
                (classes[1], class_weights[1], class_weights[0])
            } else {
                (classes[k], class_weights[k], 1.0)
            };
            let y_binary = y.mapv(|label| if label == positive { 1.0 } else { -1.0 });
            let mut dataset = x.dataset(&y_binary, sample_weight, rng.next_u64());

            let params = SgdParams {
                loss: loss.as_ref(),
                penalty: self.penalty,
                alpha: self.alpha,
                l1_ratio: self.l1_ratio,
                prior: prior.map(|prior| PriorRow {
                    mean: prior.mean(k),
                    precision: prior.precision(k),
                }),
                max_iter,
                tol: self.tol,
                n_iter_no_change: self.n_iter_no_change,
                fit_intercept: self.fit_intercept,
                shuffle: self.shuffle,
                learning_rate: self.learning_rate,
                eta0: self.eta0,
                power_t: self.power_t,
                weight_pos,
                weight_neg,
                t,
            };

            let outcome = plain_sgd(
                coef.row(k).to_owned(),
                intercept[k],
                dataset.as_mut(),
                &params,
            )?;
            coef.row_mut(k).assign(&outcome.weights);
            intercept[k] = outcome.intercept;
            n_iter = n_iter.max(outcome.n_iter);
        }

        Ok(Trained {
            coef,
            intercept,
            n_iter,
            t: t + (n_iter * x.n_samples()) as f64,
        })
    }

    fn commit(&mut self, trained: Trained) {
        self.coef = Some(trained.coef);
        self.intercept = Some(trained.intercept);
        self.n_iter = trained.n_iter;
        self.t = trained.t;
    }

    /// Starting point for a fresh model: the prior mean, or zeros.
    fn initial_coef(&self, n_coef: usize, n_features: usize) -> Matrix {
        let mut coef = Matrix::zeros((n_coef, n_features));
        if self.penalty == Penalty::Prior {
            if let Some(prior) = &self.prior {
                for (k, mut row) in coef.axis_iter_mut(Axis(0)).enumerate() {
                    row.assign(&prior.mean(k));
                }
            }
        }
        coef
    }

    fn expanded_class_weight(&self, classes: &[f64], y: &Vector) -> Result<Vec<f64>> {
        match &self.class_weight {
            ClassWeight::None => Ok(vec![1.0; classes.len()]),
            ClassWeight::Balanced => {
                let mut counts: HashMap<u64, usize> = HashMap::new();
                for label in y.iter() {
                    *counts.entry(label.to_bits()).or_default() += 1;
                }
                let n_samples = y.len() as f64;
                let n_classes = classes.len() as f64;
                Ok(classes
                    .iter()
                    .map(|c| match counts.get(&c.to_bits()) {
                        Some(&count) => n_samples / (n_classes * count as f64),
                        None => 1.0,
                    })
                    .collect())
            }
            ClassWeight::Custom(weights) => {
                if let Some((label, _)) = weights.iter().find(|(label, _)| !classes.contains(label)) {
                    return Err(SgdError::invalid(
                        "class_weight",
                        format!("class label {} not present", label),
                    ));
                }
                Ok(classes
                    .iter()
                    .map(|c| {
                        weights
                            .iter()
                            .find(|(label, _)| label == c)
                            .map_or(1.0, |&(_, weight)| weight)
                    })
                    .collect())
            }
        }
    }
}

/// Solution produced by one call to `train`.
struct Trained {
    coef: Matrix,
    intercept: Vector,
    n_iter: usize,
    t: f64,
}

impl Default for SGDClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn check_inputs<X: FeatureMatrix>(x: &X, y: &Vector, sample_weight: &Vector) -> Result<()> {
    if x.n_samples() != y.len() {
        return Err(SgdError::SampleMismatch { x: x.n_samples(), y: y.len() });
    }
    if x.n_samples() == 0 {
        return Err(SgdError::EmptyInput("X must have at least one sample".to_string()));
    }
    if x.n_features() == 0 {
        return Err(SgdError::EmptyInput("X must have at least one feature".to_string()));
    }
    if !x.is_finite() {
        return Err(SgdError::NonFinite("X"));
    }
    if sample_weight.len() != y.len() {
        return Err(SgdError::SampleMismatch { x: sample_weight.len(), y: y.len() });
    }
    if sample_weight.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SgdError::invalid("sample_weight", "must be finite and non-negative"));
    }
    Ok(())
}

/// Sorted distinct labels.
fn unique_labels(y: &Vector) -> Result<Vec<f64>> {
    if y.iter().any(|label| !label.is_finite()) {
        return Err(SgdError::InvalidLabels("labels must be finite".to_string()));
    }
    let mut classes = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    Ok(classes)
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, value) in values.enumerate() {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }
    best
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
