use crate::error::{Result, SgdError};
use crate::{Matrix, Vector};

/// Fraction of predictions equal to the true labels.
pub fn accuracy_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(SgdError::SampleMismatch { x: y_pred.len(), y: y_true.len() });
    }
    if y_true.is_empty() {
        return Err(SgdError::EmptyInput("y_true must not be empty".to_string()));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(actual, pred)| (*actual - *pred).abs() < 1e-10)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Mean negative log-likelihood of `y_true` under `proba`.
///
/// Column `k` of `proba` holds the probability of `classes[k]`.
pub fn log_loss(y_true: &Vector, proba: &Matrix, classes: &[f64]) -> Result<f64> {
    if y_true.len() != proba.nrows() {
        return Err(SgdError::SampleMismatch { x: proba.nrows(), y: y_true.len() });
    }
    if proba.ncols() != classes.len() {
        return Err(SgdError::invalid(
            "proba",
            format!("{} columns for {} classes", proba.ncols(), classes.len()),
        ));
    }
    if y_true.is_empty() {
        return Err(SgdError::EmptyInput("y_true must not be empty".to_string()));
    }

    let epsilon = 1e-15;
    let mut total = 0.0;
    for (label, row) in y_true.iter().zip(proba.rows()) {
        let k = classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| SgdError::InvalidLabels(format!("label {} not in classes", label)))?;
        total -= row[k].clamp(epsilon, 1.0 - epsilon).ln();
    }
    Ok(total / y_true.len() as f64)
}
