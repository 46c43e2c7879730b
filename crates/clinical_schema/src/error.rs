use thiserror::Error;

use crate::{CategoricalField, Feature};

/// Errors raised when a value does not fit the canonical schema.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{feature} value {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        feature: Feature,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{value} is not a valid {field} code")]
    UnknownCode { field: CategoricalField, value: f64 },

    #[error("unrecognised {field} value {raw:?}")]
    UnknownLabel {
        field: CategoricalField,
        raw: String,
    },

    #[error("label must be 0 or 1, got {0}")]
    InvalidDiagnosis(i64),
}
