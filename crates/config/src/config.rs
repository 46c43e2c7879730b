use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;

/// Default location of the baseline dataset.
pub const DEFAULT_DATA_PATH: &str = "data/heart.csv";

/// Default directory holding the serving artifact.
pub const DEFAULT_MODEL_STORE_PATH: &str = "models";

/// Default seed for every randomized pipeline step.
pub const DEFAULT_SEED: u64 = 44;

/// Minimum number of feedback rows before feedback joins training.
pub const DEFAULT_FEEDBACK_MIN_ROWS: usize = 50;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database connection URL
    pub database_url: Option<String>,

    /// Baseline CSV dataset
    pub data_path: PathBuf,

    /// Directory backing the artifact object store
    pub model_store_path: PathBuf,

    /// Seed threaded through splitting, sampling and model fitting
    pub seed: u64,

    /// Feedback merge gate
    pub feedback_min_rows: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `DATABASE_URL`: `PostgreSQL` connection string (required by commands that touch the feedback store)
    /// - `HEART_DATA_PATH`: baseline CSV (default: `data/heart.csv`)
    /// - `MODEL_STORE_PATH`: artifact directory (default: `models`)
    /// - `TRAINING_SEED`: random seed (default: `44`)
    /// - `FEEDBACK_MIN_ROWS`: feedback merge gate (default: `50`)
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let seed = lookup("TRAINING_SEED")
            .map(|raw| raw.trim().parse::<u64>())
            .transpose()
            .context("TRAINING_SEED must be an unsigned integer")?
            .unwrap_or(DEFAULT_SEED);

        let feedback_min_rows = lookup("FEEDBACK_MIN_ROWS")
            .map(|raw| raw.trim().parse::<usize>())
            .transpose()
            .context("FEEDBACK_MIN_ROWS must be an unsigned integer")?
            .unwrap_or(DEFAULT_FEEDBACK_MIN_ROWS);

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            data_path: lookup("HEART_DATA_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_PATH), PathBuf::from),
            model_store_path: lookup("MODEL_STORE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_MODEL_STORE_PATH), PathBuf::from),
            seed,
            feedback_min_rows,
        })
    }

    /// Returns the database URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` was not set.
    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable not set")
    }

    /// Opens the local object store that holds model artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or opened.
    pub fn artifact_store(&self) -> anyhow::Result<Arc<dyn ObjectStore>> {
        std::fs::create_dir_all(&self.model_store_path).with_context(|| {
            format!(
                "Failed to create model store directory {}",
                self.model_store_path.display()
            )
        })?;

        let store = LocalFileSystem::new_with_prefix(&self.model_store_path)
            .context("Failed to create object store")?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/heart.csv"));
        assert_eq!(config.model_store_path, PathBuf::from("models"));
        assert_eq!(config.seed, 44);
        assert_eq!(config.feedback_min_rows, 50);
        assert!(config.database_url().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/heart"),
            ("HEART_DATA_PATH", "/tmp/heart.csv"),
            ("TRAINING_SEED", "7"),
            ("FEEDBACK_MIN_ROWS", " 10 "),
        ]))
        .unwrap();
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/heart");
        assert_eq!(config.data_path, PathBuf::from("/tmp/heart.csv"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.feedback_min_rows, 10);
    }

    #[test]
    fn test_invalid_seed() {
        assert!(Config::from_lookup(lookup_from(&[("TRAINING_SEED", "abc")])).is_err());
    }
}
