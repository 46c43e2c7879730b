//! Repository functions for experiment tracking runs.

use sqlx::PgPool;
use uuid::Uuid;

use crate::ExperimentRunRow;

/// Records one experiment run with its parameters and metrics.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_experiment_run(
    pool: &PgPool,
    experiment: &str,
    run_name: &str,
    params: serde_json::Value,
    metrics: serde_json::Value,
) -> Result<ExperimentRunRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO experiment_runs (id, experiment, run_name, params, metrics)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, experiment, run_name, params, metrics, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(experiment)
    .bind(run_name)
    .bind(params)
    .bind(metrics)
    .fetch_one(pool)
    .await
}
