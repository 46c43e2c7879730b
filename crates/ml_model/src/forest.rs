//! Random forest backed by smartcore.

use std::fmt;
use std::sync::Arc;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use crate::{ModelError, Result, check_training_set, fit_error, to_dense};

const MODEL: &str = "random_forest";

type Forest = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: u16,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<u16>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            max_depth: None,
        }
    }
}

/// Random forest classifier.
///
/// Trees see bootstrap samples and `sqrt(n_features)` candidate features per
/// split; the whole ensemble is seeded.
#[derive(Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    model: Arc<Forest>,
}

impl RandomForest {
    pub fn fit(params: ForestParams, x: ArrayView2<'_, f64>, y: &[u8], seed: u64) -> Result<Self> {
        check_training_set(MODEL, x, y)?;
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ModelError::SingleClass(MODEL));
        }

        let mut parameters = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_estimators)
            .with_min_samples_split(2)
            .with_seed(seed);
        if let Some(depth) = params.max_depth {
            parameters = parameters.with_max_depth(depth);
        }
        let labels: Vec<i32> = y.iter().map(|&v| i32::from(v)).collect();
        let model = Forest::fit(&to_dense(MODEL, x)?, &labels, parameters).map_err(|e| fit_error(MODEL, e))?;

        debug!(n_trees = params.n_estimators, seed, "Random forest fitted");
        Ok(Self {
            params,
            model: Arc::new(model),
        })
    }

    /// Positive-class probability for every row: the mean of the per-tree
    /// class probabilities.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        let proba = self
            .model
            .predict_proba(&to_dense(MODEL, x)?)
            .map_err(|e| fit_error(MODEL, e))?;
        let (rows, classes) = proba.shape();
        // Classes are sorted, so column 1 is "disease present".
        if classes < 2 {
            return Err(fit_error(MODEL, "forest was fitted on a single class"));
        }
        Ok((0..rows).map(|i| *proba.get((i, 1))).collect())
    }

    #[must_use]
    pub fn params(&self) -> ForestParams {
        self.params
    }
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
