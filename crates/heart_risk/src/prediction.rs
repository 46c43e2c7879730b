//! Serving-side predictions from the persisted artifact.

use std::sync::Arc;

use clinical_schema::{ClinicalRecord, Diagnosis, SchemaError};
use ml_model::{ArtifactVersion, ModelArtifact, ModelError, ModelRegistry};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid clinical record")]
    InvalidRecord(#[from] SchemaError),

    #[error("model is unavailable")]
    Unavailable(#[source] ModelError),

    #[error("model failed to score the record")]
    Scoring(#[source] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub diagnosis: Diagnosis,
    /// Probability of heart disease.
    pub probability: f64,
    pub label: &'static str,
    /// Name of the model that produced the prediction.
    pub model: String,
}

struct CachedArtifact {
    version: ArtifactVersion,
    artifact: Arc<ModelArtifact>,
}

/// Answers predictions with the latest persisted model.
///
/// The artifact is reloaded only when its stored version changes.
pub struct PredictionService {
    registry: ModelRegistry,
    cache: RwLock<Option<CachedArtifact>>,
}

impl PredictionService {
    #[must_use]
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            cache: RwLock::new(None),
        }
    }

    /// Scores one record.
    ///
    /// # Errors
    ///
    /// [`PredictionError::InvalidRecord`] for out-of-range fields and
    /// [`PredictionError::Unavailable`] when no usable artifact exists.
    pub async fn predict(&self, record: &ClinicalRecord) -> Result<Prediction, PredictionError> {
        record.validate()?;
        let artifact = self.current().await.map_err(PredictionError::Unavailable)?;
        let (diagnosis, probability) = artifact
            .pipeline
            .predict_record(record)
            .map_err(PredictionError::Scoring)?;
        debug!(model = %artifact.name, probability, "Prediction");
        Ok(Prediction {
            diagnosis,
            probability,
            label: diagnosis.label(),
            model: artifact.name.clone(),
        })
    }

    async fn current(&self) -> Result<Arc<ModelArtifact>, ModelError> {
        let version = self.registry.version().await?.ok_or(ModelError::ArtifactMissing)?;
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.version == version {
                return Ok(Arc::clone(&cached.artifact));
            }
        }

        let mut cache = self.cache.write().await;
        let artifact = Arc::new(self.registry.load().await?);
        info!(model = %artifact.name, trained_at = %artifact.trained_at, "Loaded serving model");
        *cache = Some(CachedArtifact {
            version,
            artifact: Arc::clone(&artifact),
        });
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use clinical_schema::{ChestPain, RestEcg, Sex, Slope, Thal};
    use dataset::LabeledSplit;
    use ml_model::{
        ArtifactSink, ClassifierParams, ConfusionMatrix, LogisticParams, Metrics, ModelPipeline,
    };
    use object_store::memory::InMemory;

    use super::*;

    fn record(sick: bool, age: i32) -> ClinicalRecord {
        ClinicalRecord {
            age,
            sex: Sex::Male,
            cp: if sick { ChestPain::Asymptomatic } else { ChestPain::AtypicalAngina },
            trestbps: 130,
            chol: 240,
            fbs: false,
            restecg: RestEcg::Normal,
            thalch: if sick { 120 } else { 170 },
            exang: sick,
            oldpeak: if sick { 2.5 } else { 0.0 },
            slope: if sick { Slope::Flat } else { Slope::Upsloping },
            ca: u8::from(sick),
            thal: if sick { Thal::ReversibleDefect } else { Thal::Normal },
        }
    }

    fn artifact(name: &str) -> ModelArtifact {
        let mut split = LabeledSplit::default();
        for i in 0..20 {
            let sick = i % 2 == 1;
            let label = if sick { Diagnosis::Present } else { Diagnosis::Absent };
            split.push(record(sick, 40 + i), label);
        }
        let pipeline = ModelPipeline::fit(
            ClassifierParams::LogisticRegression(LogisticParams::default()),
            split.feature_matrix().view(),
            &split.label_codes(),
            44,
        )
        .unwrap();
        let metrics = Metrics {
            auc: 1.0,
            accuracy: 1.0,
            f1: 1.0,
        };
        ModelArtifact::new(name, metrics, ConfusionMatrix::default(), pipeline)
    }

    #[tokio::test]
    async fn test_missing_artifact_is_unavailable() {
        let service = PredictionService::new(ModelRegistry::new(Arc::new(InMemory::new())));
        let result = service.predict(&record(true, 60)).await;
        assert!(matches!(
            result,
            Err(PredictionError::Unavailable(ModelError::ArtifactMissing))
        ));
    }

    #[tokio::test]
    async fn test_predicts_with_label_text() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        registry.persist(&artifact("LogisticRegression")).await.unwrap();
        let service = PredictionService::new(registry);

        let sick = service.predict(&record(true, 61)).await.unwrap();
        assert_eq!(sick.diagnosis, Diagnosis::Present);
        assert_eq!(sick.label, "Heart Disease");
        assert!(sick.probability > 0.5);

        let healthy = service.predict(&record(false, 45)).await.unwrap();
        assert_eq!(healthy.label, "No Heart Disease");
        assert!(healthy.probability <= 0.5);
    }

    #[tokio::test]
    async fn test_reloads_after_retrain() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        registry.persist(&artifact("RandomForest")).await.unwrap();
        let service = PredictionService::new(registry.clone());
        assert_eq!(service.predict(&record(true, 50)).await.unwrap().model, "RandomForest");

        registry.persist(&artifact("GradientBoosting_Tuned")).await.unwrap();
        assert_eq!(
            service.predict(&record(true, 50)).await.unwrap().model,
            "GradientBoosting_Tuned"
        );
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_record() {
        let service = PredictionService::new(ModelRegistry::new(Arc::new(InMemory::new())));
        let mut bad = record(false, 40);
        bad.age = 400;
        assert!(matches!(
            service.predict(&bad).await,
            Err(PredictionError::InvalidRecord(_))
        ));
    }
}
