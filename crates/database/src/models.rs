//! Database model types.

use clinical_schema::{
    CategoricalCode, ChestPain, ClinicalRecord, Diagnosis, Feature, FeedbackRecord, RestEcg,
    SchemaError, Sex, Slope, Thal,
};
use dataset::RawRow;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Row of the `feedback` table. Categorical fields are stored as codes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub age: i32,
    pub sex: i32,
    pub cp: i32,
    pub trestbps: i32,
    pub chol: i32,
    pub fbs: i32,
    pub restecg: i32,
    pub thalch: i32,
    pub exang: i32,
    pub oldpeak: f64,
    pub slope: i32,
    pub ca: i32,
    pub thal: i32,
    pub prediction: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = SchemaError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let flag = |feature: Feature, value: i32| match value {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SchemaError::OutOfRange {
                feature,
                value: f64::from(other),
                min: 0.0,
                max: 1.0,
            }),
        };
        let ca = u8::try_from(row.ca)
            .ok()
            .filter(|ca| *ca <= 3)
            .ok_or(SchemaError::OutOfRange {
                feature: Feature::Ca,
                value: f64::from(row.ca),
                min: 0.0,
                max: 3.0,
            })?;

        let record = ClinicalRecord {
            age: row.age,
            sex: Sex::from_value(f64::from(row.sex))?,
            cp: ChestPain::from_value(f64::from(row.cp))?,
            trestbps: row.trestbps,
            chol: row.chol,
            fbs: flag(Feature::Fbs, row.fbs)?,
            restecg: RestEcg::from_value(f64::from(row.restecg))?,
            thalch: row.thalch,
            exang: flag(Feature::Exang, row.exang)?,
            oldpeak: row.oldpeak,
            slope: Slope::from_value(f64::from(row.slope))?,
            ca,
            thal: Thal::from_value(f64::from(row.thal))?,
        };

        Ok(Self {
            id: row.id,
            record,
            prediction: Diagnosis::from_code(i64::from(row.prediction))?,
            created_at: row.created_at,
        })
    }
}

/// Stored codes as text, unchecked. Codes outside a table are left for the
/// merge to repair.
impl From<&FeedbackRow> for RawRow {
    fn from(row: &FeedbackRow) -> Self {
        let values = [
            row.age.to_string(),
            row.sex.to_string(),
            row.cp.to_string(),
            row.trestbps.to_string(),
            row.chol.to_string(),
            row.fbs.to_string(),
            row.restecg.to_string(),
            row.thalch.to_string(),
            row.exang.to_string(),
            row.oldpeak.to_string(),
            row.slope.to_string(),
            row.ca.to_string(),
            row.thal.to_string(),
        ];
        Self {
            values: values.map(Some),
            target: Some(row.prediction.to_string()),
        }
    }
}

/// Row of the `experiment_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExperimentRunRow {
    pub id: Uuid,
    pub experiment: String,
    pub run_name: String,
    pub params: serde_json::Value,
    pub metrics: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// ML model metadata stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModelVersion {
    pub id: Uuid,
    pub name: String,
    pub version: i32,
    pub artifact_path: String,
    pub metrics: Option<serde_json::Value>,
    pub trained_at: DateTime<Utc>,
}

/// Input for creating a new model version record.
#[derive(Debug, Clone)]
pub struct CreateModelVersion {
    pub name: String,
    pub version: i32,
    pub artifact_path: String,
    pub metrics: Option<serde_json::Value>,
}
