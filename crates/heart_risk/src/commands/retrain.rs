//! Retrain command - merges feedback into the baseline, retrains and promotes a model.

use anyhow::{Context, Result};
use clinical_schema::FeedbackRecord;
use config::Config;
use database::{
    CreateModelVersion, find_latest_model_version, get_next_model_version, insert_model_version,
};
use dataset::{CsvBaseline, FeedbackIntegration, MergeOptions};
use ml_model::{ExperimentSink, ModelRegistry, TracingSink, TrainerConfig};
use sqlx::PgPool;
use tracing::info;

use crate::pipeline::{FeedbackSource, RetrainOptions, RetrainReport, run_pipeline};
use crate::sources::{FanoutSink, PgExperimentSink, PgFeedbackStore};

/// Runs the retrain command.
///
/// Without a pool the run uses the baseline alone and logs experiments
/// only to the tracing output.
///
/// # Errors
///
/// Returns an error if the pipeline fails or the model version cannot be recorded.
pub async fn run(config: &Config, pool: Option<&PgPool>, quick: bool) -> Result<()> {
    let options = retrain_options(config, quick);
    let baseline = CsvBaseline::new(&config.data_path);
    let registry = ModelRegistry::new(config.artifact_store()?);

    info!(
        data = %config.data_path.display(),
        store = %config.model_store_path.display(),
        seed = config.seed,
        quick,
        "Starting retraining"
    );

    let (feedback, experiments): (Box<dyn FeedbackSource>, Box<dyn ExperimentSink>) = match pool {
        Some(pool) => (
            Box::new(PgFeedbackStore::new(pool.clone())),
            Box::new(FanoutSink::new(vec![
                Box::new(TracingSink),
                Box::new(PgExperimentSink::new(pool.clone())),
            ])),
        ),
        None => (Box::new(Vec::<FeedbackRecord>::new()), Box::new(TracingSink)),
    };

    let report = run_pipeline(&baseline, &*feedback, &registry, &*experiments, &options)
        .await
        .context("Retraining failed")?;

    if let Some(pool) = pool {
        record_model_version(pool, config, &report).await?;
    }
    summarize(&report);
    Ok(())
}

fn retrain_options(config: &Config, quick: bool) -> RetrainOptions {
    let trainer = if quick {
        TrainerConfig::quick(config.seed)
    } else {
        TrainerConfig::default()
    };
    RetrainOptions {
        merge: MergeOptions {
            feedback_min_rows: config.feedback_min_rows,
            ..MergeOptions::default()
        },
        trainer,
    }
    .with_seed(config.seed)
}

async fn record_model_version(pool: &PgPool, config: &Config, report: &RetrainReport) -> Result<()> {
    let name = &report.artifact.name;
    if let Some(previous) = find_latest_model_version(pool, name).await? {
        info!(
            model = %name,
            previous_version = previous.version,
            previous_trained_at = %previous.trained_at,
            "Superseding model version"
        );
    }
    let version = get_next_model_version(pool, name).await?;
    let artifact_path = config.model_store_path.join(&report.location);
    insert_model_version(
        pool,
        CreateModelVersion {
            name: name.clone(),
            version,
            artifact_path: artifact_path.to_string_lossy().into_owned(),
            metrics: Some(serde_json::to_value(report.artifact.metrics)?),
        },
    )
    .await
    .context("Failed to record model version")?;

    info!(model = %name, version, "Recorded model version");
    Ok(())
}

fn summarize(report: &RetrainReport) {
    let merge = &report.merge;
    match merge.feedback {
        FeedbackIntegration::Skipped { available } => {
            info!(available, "Feedback below the merge gate");
        }
        FeedbackIntegration::Integrated { available, unique } => {
            info!(available, unique, "Feedback merged");
        }
    }
    for (feature, count) in &merge.repaired {
        info!(%feature, count, "Repaired categorical values");
    }
    for (feature, count) in &merge.out_of_range {
        info!(%feature, count, "Imputed out-of-range measurements");
    }
    if let Some(cap) = merge.cap {
        info!(majority = ?cap.majority, before = cap.before, after = cap.after, "Capped majority class");
    }

    info!("=== Candidates ===");
    for (name, metrics) in &report.training.evaluated {
        info!("  {name:<24} {metrics}");
    }
    info!(
        model = %report.artifact.name,
        location = %report.location,
        "Selected model:\n{}",
        report.artifact.confusion_matrix
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config() -> Config {
        Config {
            database_url: None,
            data_path: PathBuf::from("data/heart.csv"),
            model_store_path: PathBuf::from("models"),
            seed: 7,
            feedback_min_rows: 10,
        }
    }

    #[test]
    fn test_options_follow_config() {
        let options = retrain_options(&config(), true);
        assert_eq!(options.merge.seed, 7);
        assert_eq!(options.merge.feedback_min_rows, 10);
        assert_eq!(options.trainer.seed, 7);
        assert_eq!(options.trainer, TrainerConfig::quick(7));

        let full = retrain_options(&config(), false);
        assert_eq!(full.trainer.forest.n_estimators, 400);
        assert_eq!(full.trainer.search_iterations, 20);
    }
}
