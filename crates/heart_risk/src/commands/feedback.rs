//! Feedback command - stores a clinician-confirmed diagnosis for later retraining.

use anyhow::{Context, Result};
use clinical_schema::Diagnosis;
use database::{count_feedback, insert_feedback};
use sqlx::PgPool;
use tracing::info;

use super::RecordArgs;

/// Runs the feedback command.
///
/// `diagnosis` is the confirmed label: `0` absent, `1` present.
///
/// # Errors
///
/// Returns an error if the record or label is invalid or the insert fails.
pub async fn run(pool: &PgPool, args: &RecordArgs, diagnosis: i64) -> Result<()> {
    let record = args.to_record()?;
    let diagnosis = Diagnosis::from_code(diagnosis)?;

    let stored = insert_feedback(pool, &record, diagnosis)
        .await
        .context("Failed to store feedback")?;
    let total = count_feedback(pool).await?;

    info!(
        id = %stored.id,
        diagnosis = diagnosis.label(),
        total_feedback = total,
        "Feedback recorded"
    );
    Ok(())
}
