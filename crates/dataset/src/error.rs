use std::path::PathBuf;

use clinical_schema::{Feature, SchemaError};
use thiserror::Error;

/// Errors raised while loading or preparing training data.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read baseline dataset {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("baseline dataset is missing column {0:?}")]
    MissingColumn(String),

    #[error("no labelled rows left after cleaning")]
    Empty,

    #[error("column {0} has no usable values to impute from")]
    EmptyColumn(Feature),

    #[error("cleaned row does not fit the schema")]
    Schema(#[from] SchemaError),
}
