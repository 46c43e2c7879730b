//! PostgreSQL-backed collaborators for the retraining pipeline.

use anyhow::Context;
use async_trait::async_trait;
use dataset::RawRow;
use ml_model::experiment::EXPERIMENT_NAME;
use ml_model::{ExperimentRun, ExperimentSink, SinkError};
use sqlx::PgPool;

use crate::pipeline::FeedbackSource;

/// Reads the append-only `feedback` table.
#[derive(Debug, Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackSource for PgFeedbackStore {
    async fn fetch_all(&self) -> anyhow::Result<Vec<RawRow>> {
        let rows = database::list_feedback(&self.pool)
            .await
            .context("Failed to read feedback table")?;
        Ok(rows.iter().map(RawRow::from).collect())
    }
}

/// Stores experiment runs in the `experiment_runs` table.
#[derive(Debug, Clone)]
pub struct PgExperimentSink {
    pool: PgPool,
}

impl PgExperimentSink {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExperimentSink for PgExperimentSink {
    async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError> {
        let params = serde_json::to_value(&run.params).map_err(SinkError::new)?;
        let metrics = serde_json::to_value(&run.metrics).map_err(SinkError::new)?;
        database::insert_experiment_run(&self.pool, EXPERIMENT_NAME, &run.name, params, metrics)
            .await
            .map_err(SinkError::new)?;
        Ok(())
    }
}

/// Sends each run to every wrapped sink; the first failure is reported after
/// all sinks have been tried.
pub struct FanoutSink {
    sinks: Vec<Box<dyn ExperimentSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn ExperimentSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ExperimentSink for FanoutSink {
    async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.log_run(run).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ml_model::RecordingSink;

    use super::*;

    struct Shared(Arc<RecordingSink>);

    #[async_trait]
    impl ExperimentSink for Shared {
        async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError> {
            self.0.log_run(run).await
        }
    }

    struct Broken;

    #[async_trait]
    impl ExperimentSink for Broken {
        async fn log_run(&self, _run: &ExperimentRun) -> Result<(), SinkError> {
            Err(SinkError::new(std::io::Error::other("offline")))
        }
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let recorder = Arc::new(RecordingSink::default());
        let fanout = FanoutSink::new(vec![Box::new(Broken), Box::new(Shared(Arc::clone(&recorder)))]);

        let result = fanout.log_run(&ExperimentRun::new("RandomForest")).await;
        assert!(result.is_err());
        assert_eq!(recorder.runs().len(), 1);
    }
}
