//! Classifiers, model selection and the artifact registry.
//!
//! Every model is a [`ModelPipeline`]: a [`StandardScaler`] fit on the
//! training rows followed by one of
//! - [`RandomForest`]: smartcore's random forest
//! - [`LogisticRegression`]: smartcore's L2 logistic regression, with balanced
//!   classes obtained by resampling
//! - [`GradientBoosting`]: second-order boosted trees, tuned by [`randomized_search`]
//!
//! [`ModelTrainer`] fits the candidates, scores them on the held-out split and
//! keeps the winner; [`ModelRegistry`] stores it as a JSON artifact.

pub mod boosting;
pub mod classifier;
pub mod experiment;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod registry;
pub mod scaler;
pub mod search;
pub mod trainer;
pub mod tree;

mod error;

use ndarray::{Array2, ArrayView2};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

pub use boosting::{BoostingParams, GradientBoosting};
pub use classifier::{Classifier, ClassifierParams, ModelPipeline};
pub use error::{ModelError, Result};
pub use experiment::{ExperimentRun, ExperimentSink, ParamValue, RecordingSink, SinkError, TracingSink};
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};
pub use metrics::{ConfusionMatrix, Metrics};
pub use registry::{ArtifactSink, ArtifactVersion, ModelArtifact, ModelRegistry};
pub use scaler::StandardScaler;
pub use search::{SearchOutcome, randomized_search};
pub use trainer::{Candidate, ModelTrainer, TrainerConfig, TrainingOutcome, TrainingStage, improves};

/// Rejects empty or misaligned training data before any fitting starts.
pub(crate) fn check_training_set(model: &'static str, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if x.ncols() == 0 {
        return Err(ModelError::Fit {
            model,
            reason: "feature matrix has no columns".to_string(),
        });
    }
    Ok(())
}

/// Copies an ndarray view into smartcore's row-major matrix.
pub(crate) fn to_dense(model: &'static str, x: ArrayView2<'_, f64>) -> Result<DenseMatrix<f64>> {
    let (rows, cols) = x.dim();
    DenseMatrix::new(rows, cols, x.iter().copied().collect(), false).map_err(|e| fit_error(model, e))
}

pub(crate) fn from_dense(m: &DenseMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| *m.get((i, j)))
}

pub(crate) fn fit_error(model: &'static str, err: impl std::fmt::Display) -> ModelError {
    ModelError::Fit {
        model,
        reason: err.to_string(),
    }
}
