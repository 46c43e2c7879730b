//! Held-out evaluation metrics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smartcore::metrics;

/// Probability above which a row is classified as disease present.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary confusion matrix with class 1 as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    #[must_use]
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut m = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (0, 0) => m.true_negative += 1,
                (0, _) => m.false_positive += 1,
                (_, 0) => m.false_negative += 1,
                _ => m.true_positive += 1,
            }
        }
        m
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[[{} {}]", self.true_negative, self.false_positive)?;
        write!(f, " [{} {}]]", self.false_negative, self.true_positive)
    }
}

/// Area under the ROC curve.
///
/// Returns `None` when `y_true` holds a single class.
#[must_use]
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let n = y_true.len().min(scores.len());
    let positives = y_true[..n].iter().filter(|&&y| y == 1).count();
    if positives == 0 || positives == n {
        return None;
    }
    let truth = as_f64(&y_true[..n]);
    let scores = scores[..n].to_vec();
    Some(metrics::roc_auc_score(&truth, &scores))
}

#[must_use]
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    metrics::accuracy(&y_true.to_vec(), &y_pred.to_vec())
}

/// F1 of the positive class; 0 when there are no true positives.
#[must_use]
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> f64 {
    let hits = y_true.iter().zip(y_pred).filter(|(&t, &p)| t == 1 && p == 1).count();
    if hits == 0 || y_true.len() != y_pred.len() {
        return 0.0;
    }
    metrics::f1(&as_f64(y_true), &as_f64(y_pred), 1.0)
}

fn as_f64(labels: &[u8]) -> Vec<f64> {
    labels.iter().map(|&v| f64::from(v)).collect()
}

#[must_use]
pub fn threshold(proba: &[f64]) -> Vec<u8> {
    proba.iter().map(|&p| u8::from(p > DECISION_THRESHOLD)).collect()
}

/// Scores used to compare candidate models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub auc: f64,
    pub accuracy: f64,
    pub f1: f64,
}

impl Metrics {
    /// Scores positive-class probabilities against the true labels.
    ///
    /// A test set holding one class gets an AUC of 0.5.
    #[must_use]
    pub fn evaluate(y_true: &[u8], proba: &[f64]) -> (Self, ConfusionMatrix) {
        let y_pred = threshold(proba);
        let metrics = Self {
            auc: roc_auc(y_true, proba).unwrap_or(0.5),
            accuracy: accuracy(y_true, &y_pred),
            f1: f1_score(y_true, &y_pred),
        };
        (metrics, ConfusionMatrix::from_predictions(y_true, &y_pred))
    }

    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("auc".to_string(), self.auc),
            ("accuracy".to_string(), self.accuracy),
            ("f1".to_string(), self.f1),
        ])
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AUC={:.4}  ACC={:.4}  F1={:.4}",
            self.auc, self.accuracy, self.f1
        )
    }
}
