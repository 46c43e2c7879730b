//! CLI command implementations.

pub mod feedback;
pub mod migrate;
pub mod predict;
pub mod retrain;

mod record;

pub use record::RecordArgs;
