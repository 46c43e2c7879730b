//! Repository functions for registered model versions.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{CreateModelVersion, ModelVersion};

/// Creates a new model version record.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_model_version(
    pool: &PgPool,
    input: CreateModelVersion,
) -> Result<ModelVersion, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO model_versions (id, name, version, artifact_path, metrics)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, version, artifact_path, metrics, trained_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.name)
    .bind(input.version)
    .bind(input.artifact_path)
    .bind(input.metrics)
    .fetch_one(pool)
    .await
}

/// Gets the latest version of a model by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_latest_model_version(
    pool: &PgPool,
    name: &str,
) -> Result<Option<ModelVersion>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, name, version, artifact_path, metrics, trained_at
        FROM model_versions
        WHERE name = $1
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Gets the next version number for a model name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn get_next_model_version(pool: &PgPool, name: &str) -> Result<i32, sqlx::Error> {
    let max_version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM model_versions WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;

    Ok(max_version.unwrap_or(0) + 1)
}
