//! Fitted scaler + classifier pipelines.

use clinical_schema::{ClinicalRecord, Diagnosis, FEATURE_COUNT};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::forest::{ForestParams, RandomForest};
use crate::logistic::{LogisticParams, LogisticRegression};
use crate::metrics::DECISION_THRESHOLD;
use crate::scaler::StandardScaler;
use crate::Result;

/// Hyperparameters of any supported classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierParams {
    RandomForest(ForestParams),
    LogisticRegression(LogisticParams),
    GradientBoosting(BoostingParams),
}

impl ClassifierParams {
    /// Flat `key -> value` view for experiment logs.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::RandomForest(p) => vec![
                ("n_estimators", p.n_estimators as f64),
                ("max_depth", p.max_depth.map_or(-1.0, |d| d as f64)),
            ],
            Self::LogisticRegression(p) => vec![
                ("C", p.c),
                ("balanced", if p.balanced { 1.0 } else { 0.0 }),
            ],
            Self::GradientBoosting(p) => vec![
                ("n_estimators", p.n_estimators as f64),
                ("max_depth", p.max_depth as f64),
                ("learning_rate", p.learning_rate),
                ("subsample", p.subsample),
                ("colsample_bytree", p.colsample_bytree),
                ("gamma", p.gamma),
                ("lambda", p.lambda),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
    GradientBoosting(GradientBoosting),
}

impl Classifier {
    pub fn fit(params: ClassifierParams, x: ArrayView2<'_, f64>, y: &[u8], seed: u64) -> Result<Self> {
        Ok(match params {
            ClassifierParams::RandomForest(p) => Self::RandomForest(RandomForest::fit(p, x, y, seed)?),
            ClassifierParams::LogisticRegression(p) => {
                Self::LogisticRegression(LogisticRegression::fit(p, x, y)?)
            }
            ClassifierParams::GradientBoosting(p) => {
                Self::GradientBoosting(GradientBoosting::fit(p, x, y, seed)?)
            }
        })
    }

    /// Probability of disease for every (already scaled) row of `x`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let rows = x.rows().into_iter().map(|row| row.to_vec());
        Ok(match self {
            Self::RandomForest(m) => m.predict_proba(x)?,
            Self::LogisticRegression(m) => rows.map(|row| m.predict_proba_row(&row)).collect(),
            Self::GradientBoosting(m) => rows.map(|row| m.predict_proba_row(&row)).collect(),
        })
    }

    #[must_use]
    pub fn params(&self) -> ClassifierParams {
        match self {
            Self::RandomForest(m) => ClassifierParams::RandomForest(m.params()),
            Self::LogisticRegression(m) => ClassifierParams::LogisticRegression(m.params()),
            Self::GradientBoosting(m) => ClassifierParams::GradientBoosting(m.params()),
        }
    }
}

/// A standard scaler fit on the training rows followed by a classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    scaler: StandardScaler,
    classifier: Classifier,
}

impl ModelPipeline {
    pub fn fit(params: ClassifierParams, x: ArrayView2<'_, f64>, y: &[u8], seed: u64) -> Result<Self> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;
        let classifier = Classifier::fit(params, scaled.view(), y, seed)?;
        Ok(Self { scaler, classifier })
    }

    /// Probability of disease for every row of `x`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        let scaled: Array2<f64> = self.scaler.transform(x)?;
        self.classifier.predict_proba(scaled.view())
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<u8>> {
        Ok(crate::metrics::threshold(&self.predict_proba(x)?))
    }

    /// Probability of disease and the resulting class for one record.
    pub fn predict_record(&self, record: &ClinicalRecord) -> Result<(Diagnosis, f64)> {
        let row: [f64; FEATURE_COUNT] = record.to_features();
        let x = Array2::from_shape_vec((1, FEATURE_COUNT), row.to_vec())
            .map_err(|e| crate::fit_error("model_pipeline", e))?;
        let probability = self.predict_proba(x.view())?.first().copied().unwrap_or(0.5);
        let diagnosis = if probability > DECISION_THRESHOLD {
            Diagnosis::Present
        } else {
            Diagnosis::Absent
        };
        Ok((diagnosis, probability))
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}
