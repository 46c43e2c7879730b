//! L2-regularized logistic regression backed by smartcore.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{self, LogisticRegressionParameters};
use tracing::debug;

use crate::{ModelError, Result, check_training_set, fit_error, to_dense};

const MODEL: &str = "logistic_regression";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength.
    pub c: f64,
    /// Resample the minority class up to the majority count before fitting.
    pub balanced: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { c: 1.0, balanced: true }
    }
}

/// Logistic regression with its fitted weights.
///
/// smartcore solves the problem; only the coefficients and the intercept are
/// kept, which is all the artifact needs for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn fit(params: LogisticParams, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<Self> {
        check_training_set(MODEL, x, y)?;
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ModelError::SingleClass(MODEL));
        }
        if params.c <= 0.0 {
            return Err(fit_error(MODEL, format!("C must be positive, got {}", params.c)));
        }

        let rows = if params.balanced {
            balanced_rows(y)
        } else {
            (0..y.len()).collect()
        };
        let features: Array2<f64> = x.select(Axis(0), &rows);
        let labels: Vec<i32> = rows.iter().map(|&r| i32::from(y[r])).collect();

        let parameters = LogisticRegressionParameters::default().with_alpha(1.0 / params.c);
        let model: logistic_regression::LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>> =
            logistic_regression::LogisticRegression::fit(&to_dense(MODEL, features.view())?, &labels, parameters)
                .map_err(|e| fit_error(MODEL, e))?;

        let weights = model.coefficients();
        let (weight_rows, _) = weights.shape();
        let coefficients = (0..x.ncols())
            .map(|j| {
                if weight_rows == 1 {
                    *weights.get((0, j))
                } else {
                    *weights.get((j, 0))
                }
            })
            .collect();
        let intercept = *model.intercept().get((0, 0));

        debug!(rows = rows.len(), intercept, "Logistic regression fitted");
        Ok(Self {
            params,
            coefficients,
            intercept,
        })
    }

    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, v)| w * v)
                .sum::<f64>();
        sigmoid(z)
    }

    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub fn params(&self) -> LogisticParams {
        self.params
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Every row once, then minority rows again in order until both classes
/// have the majority count.
fn balanced_rows(y: &[u8]) -> Vec<usize> {
    let (positives, negatives): (Vec<usize>, Vec<usize>) = (0..y.len()).partition(|&i| y[i] == 1);
    let (minority, majority) = if positives.len() < negatives.len() {
        (positives, negatives)
    } else {
        (negatives, positives)
    };
    let mut rows: Vec<usize> = (0..y.len()).collect();
    if !minority.is_empty() {
        rows.extend(minority.iter().cycle().take(majority.len() - minority.len()));
    }
    rows
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_balanced_rows_repeat_minority() {
        assert_eq!(balanced_rows(&[1, 0, 0, 0, 0]), vec![0, 1, 2, 3, 4, 0, 0, 0]);
        assert_eq!(balanced_rows(&[1, 1, 0, 0]), vec![0, 1, 2, 3]);
        assert_eq!(balanced_rows(&[0, 1, 1]), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_learns_direction() {
        let x = array![[-2.0], [-1.5], [-1.0], [-0.5], [0.5], [1.0], [1.5], [2.0]];
        let y = [0, 0, 0, 1, 0, 1, 1, 1];
        let model = LogisticRegression::fit(LogisticParams::default(), x.view(), &y).unwrap();
        assert!(model.coefficients()[0] > 0.0);
        assert!(model.predict_proba_row(&[-2.0]) < 0.5);
        assert!(model.predict_proba_row(&[2.0]) > 0.5);
    }

    #[test]
    fn test_balanced_weights_shift_intercept() {
        // Uninformative feature: the balanced model predicts 0.5 for both classes.
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let y = [1, 0, 0, 0];
        let model = LogisticRegression::fit(LogisticParams::default(), x.view(), &y).unwrap();
        assert!(model.intercept().abs() < 1e-3);

        let unweighted = LogisticParams {
            balanced: false,
            ..LogisticParams::default()
        };
        let model = LogisticRegression::fit(unweighted, x.view(), &y).unwrap();
        assert!(model.intercept() < 0.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        assert!(matches!(
            LogisticRegression::fit(LogisticParams::default(), x.view(), &[1, 1]),
            Err(ModelError::SingleClass(_))
        ));
    }
}
