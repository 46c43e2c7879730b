//! Experiment tracking: named runs with parameters and metrics.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::classifier::ClassifierParams;
use crate::metrics::Metrics;

pub const EXPERIMENT_NAME: &str = "heart_disease_retraining";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One logged run of the experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    pub name: String,
    pub params: BTreeMap<String, ParamValue>,
    pub metrics: BTreeMap<String, f64>,
}

impl ExperimentRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A run describing a fitted candidate.
    pub fn for_candidate(name: &str, params: &ClassifierParams, metrics: &Metrics) -> Self {
        let mut run = Self::new(name);
        for (key, value) in params.entries() {
            run = run.param(key, value);
        }
        run.metrics = metrics.to_map();
        run
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn metric(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Error)]
#[error("experiment sink failed")]
pub struct SinkError(#[source] pub Box<dyn StdError + Send + Sync>);

impl SinkError {
    pub fn new(err: impl StdError + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }
}

/// Destination for experiment runs. Used for observability only.
#[async_trait]
pub trait ExperimentSink: Send + Sync {
    async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError>;
}

/// Writes every run to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl ExperimentSink for TracingSink {
    async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError> {
        info!(
            experiment = EXPERIMENT_NAME,
            run = %run.name,
            params = ?run.params,
            metrics = ?run.metrics,
            "Experiment run"
        );
        Ok(())
    }
}

/// Keeps runs in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    runs: Mutex<Vec<ExperimentRun>>,
}

impl RecordingSink {
    #[must_use]
    pub fn runs(&self) -> Vec<ExperimentRun> {
        self.runs.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExperimentSink for RecordingSink {
    async fn log_run(&self, run: &ExperimentRun) -> Result<(), SinkError> {
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(run.clone());
        }
        Ok(())
    }
}
