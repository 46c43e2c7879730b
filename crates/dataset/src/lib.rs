//! Dataset preparation for heart-disease retraining.
//!
//! Turns the baseline CSV and accumulated feedback into a cleaned, stratified
//! train/test split:
//! - [`source`] reads the baseline table and converts feedback rows
//! - [`normalize`] maps categorical labels onto schema codes
//! - [`merge`] applies the feedback gate, label binarization and imputation
//! - [`balance`] caps the majority class and oversamples the training split
//! - [`split`] partitions rows while preserving class proportions

pub mod balance;
pub mod merge;
pub mod normalize;
pub mod source;
pub mod split;

mod error;
mod labeled;

pub use error::DatasetError;
pub use labeled::{ClassCounts, LabeledSplit, TrainingDataset};
pub use merge::{FeedbackIntegration, MergeOptions, MergeReport, build_training_dataset};
pub use source::{BaselineSource, CsvBaseline, RawRow, RawTable};

/// Fraction of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;
