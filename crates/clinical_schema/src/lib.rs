//! Canonical feature schema for heart-disease risk records.
//!
//! Both the training pipeline and the prediction service encode records through
//! this crate, so a categorical label always maps to the same integer code.

mod categorical;
mod error;
mod feature;
mod record;

pub use categorical::*;
pub use error::*;
pub use feature::*;
pub use record::*;

/// Version of the feature layout and categorical code tables.
///
/// Bump whenever a column is added, reordered, or a code table changes. Persisted
/// artifacts carry this number and are rejected by serving when it differs.
pub const SCHEMA_VERSION: u32 = 1;
