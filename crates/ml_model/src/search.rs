//! Randomized hyperparameter search for the boosted ensemble.

use ndarray::{Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::metrics::roc_auc;
use crate::{ModelError, Result, check_training_set};

pub const MAX_DEPTH_GRID: [usize; 4] = [3, 4, 5, 6];
pub const LEARNING_RATE_GRID: [f64; 3] = [0.02, 0.05, 0.1];
pub const SUBSAMPLE_GRID: [f64; 3] = [0.8, 0.9, 1.0];
pub const COLSAMPLE_GRID: [f64; 3] = [0.7, 0.8, 1.0];
pub const GAMMA_GRID: [f64; 3] = [0.0, 1.0, 5.0];

pub const DEFAULT_SEARCH_ITERATIONS: usize = 20;
pub const MAX_FOLDS: usize = 5;

/// Number of configurations in the full grid.
#[must_use]
pub const fn grid_size() -> usize {
    MAX_DEPTH_GRID.len()
        * LEARNING_RATE_GRID.len()
        * SUBSAMPLE_GRID.len()
        * COLSAMPLE_GRID.len()
        * GAMMA_GRID.len()
}

/// Decodes grid position `index` on top of `base`.
///
/// The last grid dimension (gamma) varies fastest.
#[must_use]
pub fn grid_point(base: BoostingParams, mut index: usize) -> BoostingParams {
    let mut take = |len: usize| {
        let i = index % len;
        index /= len;
        i
    };
    let gamma = GAMMA_GRID[take(GAMMA_GRID.len())];
    let colsample_bytree = COLSAMPLE_GRID[take(COLSAMPLE_GRID.len())];
    let subsample = SUBSAMPLE_GRID[take(SUBSAMPLE_GRID.len())];
    let learning_rate = LEARNING_RATE_GRID[take(LEARNING_RATE_GRID.len())];
    let max_depth = MAX_DEPTH_GRID[take(MAX_DEPTH_GRID.len())];
    BoostingParams {
        max_depth,
        learning_rate,
        subsample,
        colsample_bytree,
        gamma,
        ..base
    }
}

/// Draws `n_iter` distinct grid configurations in sampling order.
#[must_use]
pub fn sample_configurations(base: BoostingParams, n_iter: usize, seed: u64) -> Vec<BoostingParams> {
    let mut rng = StdRng::seed_from_u64(seed);
    let size = grid_size();
    sample(&mut rng, size, n_iter.min(size))
        .into_iter()
        .map(|index| grid_point(base, index))
        .collect()
}

/// Fold count: the minority class size capped at [`MAX_FOLDS`], at least 2.
#[must_use]
pub fn fold_count(y: &[u8]) -> usize {
    let positives = y.iter().filter(|&&v| v == 1).count();
    let minority = positives.min(y.len() - positives);
    minority.min(MAX_FOLDS).max(2)
}

/// Splits row indices into `k` test folds, dealing each class round-robin so
/// every fold keeps the class proportions. Rows are not shuffled.
#[must_use]
pub fn stratified_folds(y: &[u8], k: usize) -> Vec<Vec<usize>> {
    let n = k.max(1);
    let mut folds = vec![Vec::new(); n];
    for class in [0, 1] {
        let rows = (0..y.len()).filter(|&i| y[i] == class);
        for (j, row) in rows.enumerate() {
            folds[j % n].push(row);
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub params: BoostingParams,
    pub mean_auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: Trial,
    pub folds: usize,
    /// All trials in sampling order.
    pub trials: Vec<Trial>,
}

/// Cross-validates sampled configurations and returns the best by mean AUC.
///
/// Trials run on the rayon pool. Ties keep the earliest-sampled
/// configuration, so the result does not depend on scheduling.
pub fn randomized_search(
    base: BoostingParams,
    x: ArrayView2<'_, f64>,
    y: &[u8],
    n_iter: usize,
    seed: u64,
) -> Result<SearchOutcome> {
    check_training_set("randomized_search", x, y)?;
    let configurations = sample_configurations(base, n_iter, seed);
    let k = fold_count(y);
    let folds = stratified_folds(y, k);
    info!(configurations = configurations.len(), folds = k, "Starting randomized search");

    let trials: Vec<Trial> = configurations
        .par_iter()
        .map(|&params| {
            let mean_auc = cross_validate(params, x, y, &folds, seed)?;
            debug!(?params, mean_auc, "Search trial finished");
            Ok(Trial { params, mean_auc })
        })
        .collect::<Result<_>>()?;

    let best = trials
        .iter()
        .copied()
        .reduce(|best, t| if t.mean_auc > best.mean_auc { t } else { best })
        .ok_or(ModelError::Fit {
            model: "randomized_search",
            reason: "no configurations sampled".to_string(),
        })?;

    info!(best_auc = best.mean_auc, best_params = ?best.params, "Randomized search finished");
    Ok(SearchOutcome {
        best,
        folds: k,
        trials,
    })
}

fn cross_validate(
    params: BoostingParams,
    x: ArrayView2<'_, f64>,
    y: &[u8],
    folds: &[Vec<usize>],
    seed: u64,
) -> Result<f64> {
    let mut total = 0.0;
    for test_rows in folds {
        let train_rows: Vec<usize> = (0..y.len())
            .filter(|i| test_rows.binary_search(i).is_err())
            .collect();
        let x_train: Array2<f64> = x.select(Axis(0), &train_rows);
        let y_train: Vec<u8> = train_rows.iter().map(|&i| y[i]).collect();

        let model = GradientBoosting::fit(params, x_train.view(), &y_train, seed)?;
        let scores: Vec<f64> = test_rows
            .iter()
            .map(|&i| model.predict_proba_row(&x.row(i).to_vec()))
            .collect();
        let y_test: Vec<u8> = test_rows.iter().map(|&i| y[i]).collect();
        total += roc_auc(&y_test, &scores).unwrap_or(0.5);
    }
    Ok(total / folds.len() as f64)
}
