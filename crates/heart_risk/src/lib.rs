//! Heart-disease risk retraining and prediction.
//!
//! [`pipeline::run_pipeline`] folds clinician feedback into the baseline
//! dataset, retrains the candidate models and promotes the winner;
//! [`prediction::PredictionService`] serves the promoted artifact.

pub mod commands;
pub mod pipeline;
pub mod prediction;
pub mod sources;

pub use pipeline::{FeedbackSource, PipelineError, RetrainOptions, RetrainReport, run_pipeline};
pub use prediction::{Prediction, PredictionError, PredictionService};
