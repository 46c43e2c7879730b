//! The retraining run: load, merge, balance, train, select and persist.

use async_trait::async_trait;
use clinical_schema::FeedbackRecord;
use dataset::balance::oversample;
use dataset::{
    BaselineSource, DatasetError, MergeOptions, MergeReport, RawRow, build_training_dataset,
};
use ml_model::{
    ArtifactSink, ExperimentRun, ExperimentSink, ModelArtifact, ModelError, ModelTrainer,
    TrainerConfig, TrainingOutcome,
};
use thiserror::Error;
use tracing::{info, warn};

/// Read-once access to accumulated clinician feedback.
///
/// Rows are returned undecoded; categorical codes are checked, and repaired,
/// during the merge.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn fetch_all(&self) -> anyhow::Result<Vec<RawRow>>;
}

#[async_trait]
impl FeedbackSource for Vec<FeedbackRecord> {
    async fn fetch_all(&self) -> anyhow::Result<Vec<RawRow>> {
        Ok(self.iter().map(RawRow::from).collect())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to prepare the training data")]
    DataSource(#[from] DatasetError),

    #[error("failed to read feedback: {0:#}")]
    Feedback(anyhow::Error),

    #[error("training failed")]
    Training(#[source] ModelError),

    #[error("failed to persist the selected model")]
    Artifact(#[source] ModelError),

    #[error("training task was interrupted")]
    Interrupted(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Default)]
pub struct RetrainOptions {
    pub merge: MergeOptions,
    pub trainer: TrainerConfig,
}

impl RetrainOptions {
    /// Uses one seed for the data steps and for model fitting.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.merge.seed = seed;
        self.trainer.seed = seed;
        self
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RetrainReport {
    pub merge: MergeReport,
    /// Training rows after oversampling.
    pub balanced_rows: usize,
    pub training: TrainingOutcome,
    pub artifact: ModelArtifact,
    pub location: String,
}

/// Runs one retraining pass end to end.
///
/// Experiment sink failures are logged and ignored. Any data or training
/// failure aborts before the artifact is touched.
///
/// # Errors
///
/// See [`PipelineError`].
pub async fn run_pipeline<B, F, A, E>(
    baseline: &B,
    feedback: &F,
    artifacts: &A,
    experiments: &E,
    options: &RetrainOptions,
) -> Result<RetrainReport, PipelineError>
where
    B: BaselineSource + ?Sized,
    F: FeedbackSource + ?Sized,
    A: ArtifactSink + ?Sized,
    E: ExperimentSink + ?Sized,
{
    let table = baseline.load()?;
    info!(rows = table.len(), "Loaded baseline dataset");

    let feedback_rows = feedback.fetch_all().await.map_err(PipelineError::Feedback)?;
    info!(rows = feedback_rows.len(), "Loaded feedback");

    let merge = build_training_dataset(table, &feedback_rows, &options.merge)?;
    let counts = merge.dataset.train.class_counts();
    info!(
        absent = counts.absent,
        present = counts.present,
        test_rows = merge.dataset.test.len(),
        "Training class distribution"
    );

    let balanced = oversample(&merge.dataset.train, options.merge.seed);
    let balanced_rows = balanced.len();
    info!(rows = balanced_rows, "Oversampled training split");

    let test = merge.dataset.test.clone();
    let trainer_config = options.trainer.clone();
    let training = tokio::task::spawn_blocking(move || {
        ModelTrainer::new(trainer_config).run(&balanced, &test)
    })
    .await?
    .map_err(PipelineError::Training)?;

    for run in &training.runs {
        log_run(experiments, run).await;
    }

    let selected = &training.selected;
    let artifact = ModelArtifact::new(
        &selected.name,
        selected.metrics,
        selected.confusion_matrix,
        selected.pipeline.clone(),
    );
    let location = artifacts
        .persist(&artifact)
        .await
        .map_err(PipelineError::Artifact)?;

    let registration = ExperimentRun::new(format!("Register_{}", artifact.name))
        .param("artifact", location.as_str())
        .metric("auc", artifact.metrics.auc);
    log_run(experiments, &registration).await;

    info!(model = %artifact.name, location, "Retraining finished");
    Ok(RetrainReport {
        merge,
        balanced_rows,
        training,
        artifact,
        location,
    })
}

async fn log_run<E: ExperimentSink + ?Sized>(sink: &E, run: &ExperimentRun) {
    if let Err(e) = sink.log_run(run).await {
        warn!(run = %run.name, error = %e, "Failed to log experiment run");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use clinical_schema::{
        ChestPain, ClinicalRecord, Diagnosis, Feature, RestEcg, Sex, Slope, Thal,
    };
    use dataset::{FeedbackIntegration, RawRow, RawTable};
    use ml_model::{ModelRegistry, RecordingSink, SinkError};
    use object_store::memory::InMemory;
    use uuid::Uuid;

    use super::*;

    /// Deterministic baseline rows: `present` sick and `absent` healthy.
    fn baseline(absent: usize, present: usize) -> RawTable {
        let mut rows = Vec::new();
        for i in 0..absent + present {
            let sick = i >= absent;
            let v = |healthy: String, ill: String| Some(if sick { ill } else { healthy });
            let mut values: [Option<String>; 13] = Default::default();
            values[Feature::Age.index()] = v(format!("{}", 40 + i % 15), format!("{}", 58 + i % 15));
            values[Feature::Sex.index()] = Some(if i % 3 == 0 { "Female" } else { "Male" }.to_string());
            values[Feature::Cp.index()] = v("non-anginal".into(), "asymptomatic".into());
            values[Feature::Trestbps.index()] = Some(format!("{}", 120 + i % 30));
            values[Feature::Chol.index()] = Some(format!("{}", 190 + i % 60));
            values[Feature::Fbs.index()] = Some(if i % 7 == 0 { "TRUE" } else { "FALSE" }.to_string());
            values[Feature::Restecg.index()] = Some("normal".to_string());
            values[Feature::Thalch.index()] = v(format!("{}", 165 - i % 20), format!("{}", 130 - i % 20));
            values[Feature::Exang.index()] = v("FALSE".into(), "TRUE".into());
            values[Feature::Oldpeak.index()] = v("0.4".into(), "1.8".into());
            values[Feature::Slope.index()] = v("upsloping".into(), "flat".into());
            values[Feature::Ca.index()] = v("0".into(), format!("{}", 1 + i % 3));
            values[Feature::Thal.index()] = v("normal".into(), "reversable defect".into());
            let target = Some(if sick { format!("{}", 1 + i % 4) } else { "0".to_string() });
            rows.push(RawRow { values, target });
        }
        RawTable { rows }
    }

    fn no_feedback() -> Vec<FeedbackRecord> {
        Vec::new()
    }

    fn options() -> RetrainOptions {
        RetrainOptions {
            merge: MergeOptions::default(),
            trainer: TrainerConfig::quick(44),
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ExperimentSink for FailingSink {
        async fn log_run(&self, _run: &ExperimentRun) -> Result<(), SinkError> {
            Err(SinkError::new(std::io::Error::other("tracking server down")))
        }
    }

    #[tokio::test]
    async fn test_imbalanced_baseline_without_feedback() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let experiments = RecordingSink::default();
        let report = run_pipeline(&baseline(250, 50), &no_feedback(), &registry, &experiments, &options())
            .await
            .unwrap();

        let cap = report.merge.cap.unwrap();
        assert_eq!(cap.majority, Diagnosis::Absent);
        assert_eq!(cap.after, 100);
        assert_eq!(report.merge.merged_rows, 300);
        assert_eq!(report.merge.dataset.test.len(), 30);
        assert_eq!(report.balanced_rows, 160);

        let runs = experiments.runs();
        assert!(runs.iter().filter(|r| !r.metrics.is_empty()).count() >= 3);
        assert_eq!(runs.last().unwrap().name, format!("Register_{}", report.artifact.name));

        let stored = registry.load().await.unwrap();
        assert_eq!(stored.name, report.artifact.name);
        assert!((stored.metrics.auc - report.training.selected.metrics.auc).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_abort() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let report = run_pipeline(&baseline(60, 40), &no_feedback(), &registry, &FailingSink, &options()).await;
        assert!(report.is_ok());
        assert!(registry.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_run_leaves_no_artifact() {
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let experiments = RecordingSink::default();
        let result = run_pipeline(&RawTable::default(), &no_feedback(), &registry, &experiments, &options()).await;
        assert!(matches!(result, Err(PipelineError::DataSource(_))));
        assert!(experiments.runs().is_empty());
        assert!(matches!(registry.load().await, Err(ModelError::ArtifactMissing)));
    }

    #[tokio::test]
    async fn test_feedback_joins_training_at_gate() {
        let feedback: Vec<FeedbackRecord> = (0..50)
            .map(|i| FeedbackRecord {
                id: Uuid::new_v4(),
                record: ClinicalRecord {
                    age: 55 + i % 20,
                    sex: Sex::Male,
                    cp: ChestPain::Asymptomatic,
                    trestbps: 140,
                    chol: 220 + i,
                    fbs: false,
                    restecg: RestEcg::Normal,
                    thalch: 125,
                    exang: true,
                    oldpeak: 2.0,
                    slope: Slope::Flat,
                    ca: 2,
                    thal: Thal::ReversibleDefect,
                },
                prediction: Diagnosis::Present,
                created_at: Utc::now(),
            })
            .collect();
        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let report = run_pipeline(&baseline(80, 40), &feedback, &registry, &RecordingSink::default(), &options())
            .await
            .unwrap();
        assert!(matches!(
            report.merge.feedback,
            FeedbackIntegration::Integrated {
                available: 50,
                unique: 50
            }
        ));
        assert_eq!(report.merge.merged_rows, 170);
    }

    #[tokio::test]
    async fn test_reads_baseline_csv() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let header: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        writeln!(file, "id,dataset,{},num", header.join(",")).unwrap();
        for (i, row) in baseline(70, 30).rows.iter().enumerate() {
            let values: Vec<&str> = row.values.iter().map(|v| v.as_deref().unwrap_or("")).collect();
            let target = row.target.as_deref().unwrap_or("");
            writeln!(file, "{i},Cleveland,{},{target}", values.join(",")).unwrap();
        }

        let registry = ModelRegistry::new(Arc::new(InMemory::new()));
        let source = dataset::CsvBaseline::new(file.path());
        let report = run_pipeline(&source, &no_feedback(), &registry, &RecordingSink::default(), &options())
            .await
            .unwrap();
        assert_eq!(report.merge.baseline_rows, 100);
        assert!(report.merge.repaired.iter().all(|(_, n)| *n == 0));
        assert!(registry.load().await.is_ok());
    }
}
