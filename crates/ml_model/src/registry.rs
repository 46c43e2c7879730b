//! Persistence of the selected model artifact.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clinical_schema::SCHEMA_VERSION;
use object_store::path::Path as ObjectStorePath;
use object_store::{GetOptions, ObjectStore, ObjectStoreExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{ClassifierParams, ModelPipeline};
use crate::metrics::{ConfusionMatrix, Metrics};
use crate::{ModelError, Result};

/// Fixed key the artifact is written under.
pub const ARTIFACT_KEY: &str = "model.json";

/// The selected model together with how it scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    /// Feature schema the pipeline was trained on.
    pub schema_version: u32,
    pub trained_at: DateTime<Utc>,
    pub metrics: Metrics,
    pub confusion_matrix: ConfusionMatrix,
    pub pipeline: ModelPipeline,
}

impl ModelArtifact {
    #[must_use]
    pub fn new(name: &str, metrics: Metrics, confusion_matrix: ConfusionMatrix, pipeline: ModelPipeline) -> Self {
        Self {
            name: name.to_string(),
            schema_version: SCHEMA_VERSION,
            trained_at: Utc::now(),
            metrics,
            confusion_matrix,
            pipeline,
        }
    }

    #[must_use]
    pub fn params(&self) -> ClassifierParams {
        self.pipeline.classifier().params()
    }
}

/// Changes whenever the stored artifact is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub last_modified: DateTime<Utc>,
    pub e_tag: Option<String>,
}

/// Anything the pipeline can hand the selected artifact to.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Stores `artifact`, replacing the previous one, and returns its location.
    async fn persist(&self, artifact: &ModelArtifact) -> Result<String>;
}

/// Single-slot artifact registry on top of an object store.
///
/// Writes go through `put`, which the local store stages in a temporary
/// file and renames into place, so readers never observe a partial artifact.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    store: Arc<dyn ObjectStore>,
    key: ObjectStorePath,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key: ObjectStorePath::from(ARTIFACT_KEY),
        }
    }

    /// Loads the current artifact.
    ///
    /// # Errors
    ///
    /// [`ModelError::ArtifactMissing`] if nothing was persisted yet and
    /// [`ModelError::SchemaMismatch`] if it was trained on another schema.
    pub async fn load(&self) -> Result<ModelArtifact> {
        let bytes = match self.store.get(&self.key).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => return Err(ModelError::ArtifactMissing),
            Err(e) => return Err(e.into()),
        };
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;
        if artifact.schema_version != SCHEMA_VERSION {
            return Err(ModelError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: artifact.schema_version,
            });
        }
        debug!(model = %artifact.name, bytes = bytes.len(), "Loaded model artifact");
        Ok(artifact)
    }

    /// Identity of the stored artifact, if there is one.
    pub async fn version(&self) -> Result<Option<ArtifactVersion>> {
        let options = GetOptions {
            head: true,
            ..GetOptions::default()
        };
        match self.store.get_opts(&self.key, options).await {
            Ok(result) => Ok(Some(ArtifactVersion {
                last_modified: result.meta.last_modified,
                e_tag: result.meta.e_tag,
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Modification time of the stored artifact, if there is one.
    pub async fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.version().await?.map(|v| v.last_modified))
    }

    #[must_use]
    pub fn location(&self) -> String {
        self.key.to_string()
    }
}

#[async_trait]
impl ArtifactSink for ModelRegistry {
    async fn persist(&self, artifact: &ModelArtifact) -> Result<String> {
        let payload = Bytes::from(serde_json::to_vec(artifact)?);
        let size = payload.len();
        self.store.put(&self.key, payload.into()).await?;
        info!(model = %artifact.name, location = %self.key, bytes = size, "Persisted model artifact");
        Ok(self.location())
    }
}

#[cfg(test)]
mod tests {
    use clinical_schema::{ChestPain, ClinicalRecord, Diagnosis, RestEcg, Sex, Slope, Thal};
    use ndarray::Array2;
    use object_store::memory::InMemory;

    use super::*;
    use crate::forest::ForestParams;
    use crate::logistic::LogisticParams;

    fn sample_record() -> ClinicalRecord {
        ClinicalRecord {
            age: 54,
            sex: Sex::Male,
            cp: ChestPain::Asymptomatic,
            trestbps: 130,
            chol: 246,
            fbs: false,
            restecg: RestEcg::Normal,
            thalch: 150,
            exang: true,
            oldpeak: 1.2,
            slope: Slope::Flat,
            ca: 1,
            thal: Thal::ReversibleDefect,
        }
    }

    fn training_rows() -> (Array2<f64>, Vec<u8>) {
        let x = Array2::from_shape_fn((20, 13), |(i, j)| {
            let offset = if i >= 10 { 5.0 } else { 0.0 };
            ((i * (j + 1)) % 7) as f64 + offset
        });
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 10)).collect();
        (x, y)
    }

    fn artifact() -> ModelArtifact {
        let (x, y) = training_rows();
        let params = ClassifierParams::LogisticRegression(LogisticParams::default());
        let pipeline = ModelPipeline::fit(params, x.view(), &y, 44).unwrap();
        let metrics = Metrics {
            auc: 0.9,
            accuracy: 0.8,
            f1: 0.8,
        };
        ModelArtifact::new("LogisticRegression", metrics, ConfusionMatrix::default(), pipeline)
    }

    #[tokio::test]
    async fn test_load_before_persist_is_missing() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        assert!(matches!(registry.load().await, Err(ModelError::ArtifactMissing)));
        assert_eq!(registry.last_modified().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_then_load_predicts_identically() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let artifact = artifact();
        let location = registry.persist(&artifact).await.unwrap();
        assert_eq!(location, ARTIFACT_KEY);

        let loaded = registry.load().await.unwrap();
        assert_eq!(loaded.name, "LogisticRegression");
        assert!(registry.last_modified().await.unwrap().is_some());

        let row = Array2::from_shape_fn((1, 13), |(_, j)| j as f64);
        let before = artifact.pipeline.predict_proba(row.view()).unwrap()[0];
        let after = loaded.pipeline.predict_proba(row.view()).unwrap()[0];
        assert!((before - after).abs() < 1e-9);
        let (diagnosis, _) = loaded.pipeline.predict_record(&sample_record()).unwrap();
        assert!(matches!(diagnosis, Diagnosis::Absent | Diagnosis::Present));
    }

    #[tokio::test]
    async fn test_forest_artifact_survives_the_store() {
        let (x, y) = training_rows();
        let params = ClassifierParams::RandomForest(ForestParams {
            n_estimators: 10,
            max_depth: None,
        });
        let pipeline = ModelPipeline::fit(params, x.view(), &y, 44).unwrap();
        let metrics = Metrics {
            auc: 0.9,
            accuracy: 0.8,
            f1: 0.8,
        };
        let artifact = ModelArtifact::new("RandomForest", metrics, ConfusionMatrix::default(), pipeline);

        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        registry.persist(&artifact).await.unwrap();
        let loaded = registry.load().await.unwrap();

        let before = artifact.pipeline.predict_proba(x.view()).unwrap();
        let after = loaded.pipeline.predict_proba(x.view()).unwrap();
        assert!(before.iter().zip(&after).all(|(a, b)| (a - b).abs() < 1e-9));
        assert_eq!(loaded.pipeline.classifier().params(), params);
    }

    #[tokio::test]
    async fn test_persist_overwrites_previous_artifact() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let mut first = artifact();
        registry.persist(&first).await.unwrap();
        let before = registry.version().await.unwrap();
        first.name = "RandomForest".to_string();
        registry.persist(&first).await.unwrap();
        assert_eq!(registry.load().await.unwrap().name, "RandomForest");
        assert_ne!(registry.version().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_rejects_other_schema_version() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let mut stale = artifact();
        stale.schema_version = SCHEMA_VERSION + 1;
        registry.persist(&stale).await.unwrap();
        assert!(matches!(
            registry.load().await,
            Err(ModelError::SchemaMismatch { .. })
        ));
    }
}
