//! Second-order gradient boosting on the logistic loss.

use ndarray::ArrayView2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logistic::sigmoid;
use crate::tree::{Node, Tree};
use crate::{Result, check_training_set};

/// Hyperparameters of the boosted ensemble.
///
/// `gamma` is the minimum loss reduction a split must achieve and `lambda`
/// the L2 penalty on leaf weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub gamma: f64,
    pub lambda: f64,
    pub min_child_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            max_depth: 6,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            gamma: 0.0,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    trees: Vec<Tree>,
}

impl GradientBoosting {
    /// Fits `n_estimators` trees, each on a row subsample and a column
    /// subsample drawn from one seeded generator.
    pub fn fit(params: BoostingParams, x: ArrayView2<'_, f64>, y: &[u8], seed: u64) -> Result<Self> {
        check_training_set("gradient_boosting", x, y)?;
        let (n_rows, n_features) = x.dim();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut margins = vec![0.0; n_rows];
        let mut grad = vec![0.0; n_rows];
        let mut hess = vec![0.0; n_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let rows_per_tree = fraction_of(n_rows, params.subsample);
        let features_per_tree = fraction_of(n_features, params.colsample_bytree);

        for _ in 0..params.n_estimators {
            for i in 0..n_rows {
                let p = sigmoid(margins[i]);
                grad[i] = p - f64::from(y[i]);
                hess[i] = p * (1.0 - p);
            }

            let mut rows = sample(&mut rng, n_rows, rows_per_tree).into_vec();
            rows.sort_unstable();
            let mut features = sample(&mut rng, n_features, features_per_tree).into_vec();
            features.sort_unstable();

            let mut builder = BoostedTreeBuilder {
                x: x.view(),
                grad: &grad,
                hess: &hess,
                features: &features,
                params: &params,
                nodes: Vec::new(),
            };
            builder.grow(&mut rows, 0);
            let tree = Tree::from_nodes(builder.nodes);

            for (margin, row) in margins.iter_mut().zip(x.rows()) {
                *margin += tree.predict_row(&row);
            }
            trees.push(tree);
        }

        debug!(n_trees = trees.len(), "Gradient boosting fitted");
        Ok(Self { params, trees })
    }

    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.trees.iter().map(|t| t.predict_row(row)).sum())
    }

    #[must_use]
    pub fn params(&self) -> BoostingParams {
        self.params
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn fraction_of(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round() as usize).clamp(1.min(n), n)
}

struct BoostedTreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a BoostingParams,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct BoostedSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl BoostedTreeBuilder<'_> {
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let idx = self.nodes.len();
        let (g, h) = self.sums(rows);
        let value = -g / (h + self.params.lambda) * self.params.learning_rate;
        self.nodes.push(Node::Leaf { value });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(split) = self.best_split(rows, g, h) else {
            return idx;
        };

        let x = self.x;
        rows.sort_unstable_by_key(|&r| x[[r, split.feature]] > split.threshold);
        let n_left = rows
            .iter()
            .take_while(|&&r| x[[r, split.feature]] <= split.threshold)
            .count();
        let (left_rows, right_rows) = rows.split_at_mut(n_left);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<BoostedSplit> {
        let lambda = self.params.lambda;
        let parent_score = g * g / (h + lambda);

        let per_feature: Vec<Option<BoostedSplit>> = self
            .features
            .par_iter()
            .map(|&feature| {
                let mut order = rows.to_vec();
                order.sort_unstable_by(|&a, &b| {
                    self.x[[a, feature]].total_cmp(&self.x[[b, feature]])
                });

                let mut best: Option<BoostedSplit> = None;
                let (mut gl, mut hl) = (0.0, 0.0);
                for pair in order.windows(2) {
                    let (current, next) = (pair[0], pair[1]);
                    gl += self.grad[current];
                    hl += self.hess[current];

                    let (a, b) = (self.x[[current, feature]], self.x[[next, feature]]);
                    if a >= b {
                        continue;
                    }
                    let (gr, hr) = (g - gl, h - hl);
                    if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                        continue;
                    }
                    let gain = 0.5
                        * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score)
                        - self.params.gamma;
                    if best.map_or(true, |s| gain > s.gain) {
                        best = Some(BoostedSplit {
                            feature,
                            threshold: a + (b - a) / 2.0,
                            gain,
                        });
                    }
                }
                best
            })
            .collect();

        // Features are scanned in ascending order, so ties go to the lowest index.
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<BoostedSplit>, s| match best {
                Some(b) if b.gain >= s.gain => Some(b),
                _ => Some(s),
            })
            .filter(|s| s.gain > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn params(n_estimators: usize) -> BoostingParams {
        BoostingParams {
            n_estimators,
            max_depth: 3,
            learning_rate: 0.1,
            ..BoostingParams::default()
        }
    }

    fn data() -> (Array2<f64>, Vec<u8>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = (0..40).map(|i| u8::from(i >= 20)).collect();
        (x, y)
    }

    #[test]
    fn test_separates_classes() {
        let (x, y) = data();
        let model = GradientBoosting::fit(params(30), x.view(), &y, 44).unwrap();
        assert_eq!(model.n_trees(), 30);
        assert!(model.predict_proba_row(&[3.0, 0.0]) < 0.3);
        assert!(model.predict_proba_row(&[35.0, 0.0]) > 0.7);
    }

    #[test]
    fn test_large_gamma_keeps_stumps() {
        let (x, y) = data();
        let mut p = params(5);
        p.gamma = 1e6;
        let model = GradientBoosting::fit(p, x.view(), &y, 44).unwrap();
        assert!(model.trees.iter().all(|t| t.nodes().len() == 1));
        assert!((model.predict_proba_row(&[0.0, 0.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_subsampling_is_seeded() {
        let (x, y) = data();
        let mut p = params(10);
        p.subsample = 0.8;
        p.colsample_bytree = 0.5;
        let a = GradientBoosting::fit(p, x.view(), &y, 3).unwrap();
        let b = GradientBoosting::fit(p, x.view(), &y, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fraction_of() {
        assert_eq!(fraction_of(13, 0.7), 9);
        assert_eq!(fraction_of(10, 1.0), 10);
        assert_eq!(fraction_of(2, 0.1), 1);
    }
}
