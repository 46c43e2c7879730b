//! Predict command - scores one clinical record with the promoted model.

use anyhow::{Context, Result};
use config::Config;
use ml_model::ModelRegistry;
use tracing::info;

use super::RecordArgs;
use crate::prediction::PredictionService;

/// Runs the predict command.
///
/// # Errors
///
/// Returns an error if the record is invalid or no model has been trained.
pub async fn run(config: &Config, args: &RecordArgs) -> Result<()> {
    let record = args.to_record()?;
    let service = PredictionService::new(ModelRegistry::new(config.artifact_store()?));

    let prediction = service
        .predict(&record)
        .await
        .context("Prediction failed; run `heart-risk retrain` first if no model exists")?;

    info!(
        model = %prediction.model,
        probability = prediction.probability,
        "{}",
        prediction.label
    );
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}
