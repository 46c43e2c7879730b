//! Repository functions for the append-only feedback store.

use clinical_schema::{CategoricalCode, ClinicalRecord, Diagnosis, FeedbackRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::FeedbackRow;

const FEEDBACK_COLUMNS: &str = "id, age, sex, cp, trestbps, chol, fbs, restecg, thalch, exang, \
     oldpeak, slope, ca, thal, prediction, created_at";

/// Appends a clinician-labelled record.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn insert_feedback(
    pool: &PgPool,
    record: &ClinicalRecord,
    prediction: Diagnosis,
) -> Result<FeedbackRecord, sqlx::Error> {
    let id = Uuid::new_v4();

    let row: FeedbackRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO feedback (id, age, sex, cp, trestbps, chol, fbs, restecg, thalch, exang,
                              oldpeak, slope, ca, thal, prediction)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {FEEDBACK_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(record.age)
    .bind(i32::from(record.sex.code()))
    .bind(i32::from(record.cp.code()))
    .bind(record.trestbps)
    .bind(record.chol)
    .bind(i32::from(record.fbs))
    .bind(i32::from(record.restecg.code()))
    .bind(record.thalch)
    .bind(i32::from(record.exang))
    .bind(record.oldpeak)
    .bind(i32::from(record.slope.code()))
    .bind(i32::from(record.ca))
    .bind(i32::from(record.thal.code()))
    .bind(i32::from(prediction.code()))
    .fetch_one(pool)
    .await?;

    decode(row)
}

/// Reads every feedback row, oldest first.
///
/// Rows are not decoded: one bad code must not hide the rest of the table.
/// Convert with [`dataset::RawRow::from`] or `FeedbackRecord::try_from`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_feedback(pool: &PgPool) -> Result<Vec<FeedbackRow>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY created_at, id"
    ))
    .fetch_all(pool)
    .await
}

/// Counts stored feedback records.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn count_feedback(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
        .fetch_one(pool)
        .await
}

fn decode(row: FeedbackRow) -> Result<FeedbackRecord, sqlx::Error> {
    FeedbackRecord::try_from(row).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
