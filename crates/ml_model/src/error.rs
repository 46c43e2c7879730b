use thiserror::Error;

/// Errors raised while fitting, scoring or storing models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("feature matrix has {rows} rows but {labels} labels were given")]
    ShapeMismatch { rows: usize, labels: usize },

    #[error("{0} requires both classes to be present")]
    SingleClass(&'static str),

    #[error("{model} failed to fit: {reason}")]
    Fit { model: &'static str, reason: String },

    #[error("no model artifact has been persisted")]
    ArtifactMissing,

    #[error("artifact was built for schema v{found}, serving expects v{expected}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("failed to (de)serialize model artifact")]
    Serialization(#[from] serde_json::Error),

    #[error("artifact store error")]
    Store(#[from] object_store::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
