//! Raw, pre-normalization tables and the baseline CSV reader.

use std::path::{Path, PathBuf};

use clinical_schema::{CategoricalCode, FEATURE_COUNT, Feature, FeedbackRecord};
use tracing::debug;

use crate::DatasetError;

/// Preferred label column.
pub const TARGET_COLUMN: &str = "target";

/// Legacy label column, used when `target` is absent.
pub const LEGACY_TARGET_COLUMN: &str = "num";

/// One row as read from a source: values are untrimmed text, `None` when blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawRow {
    pub values: [Option<String>; FEATURE_COUNT],
    pub target: Option<String>,
}

impl RawRow {
    #[must_use]
    pub fn value(&self, feature: Feature) -> Option<&str> {
        self.values[feature.index()].as_deref()
    }
}

impl From<&FeedbackRecord> for RawRow {
    fn from(feedback: &FeedbackRecord) -> Self {
        let record = &feedback.record;
        let values = [
            record.age.to_string(),
            record.sex.code().to_string(),
            record.cp.code().to_string(),
            record.trestbps.to_string(),
            record.chol.to_string(),
            u8::from(record.fbs).to_string(),
            record.restecg.code().to_string(),
            record.thalch.to_string(),
            u8::from(record.exang).to_string(),
            record.oldpeak.to_string(),
            record.slope.code().to_string(),
            record.ca.to_string(),
            record.thal.code().to_string(),
        ];

        Self {
            values: values.map(Some),
            target: Some(feedback.prediction.code().to_string()),
        }
    }
}

/// An ordered collection of raw rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Supplies the baseline dataset for a training run.
pub trait BaselineSource {
    /// Loads the full baseline table.
    ///
    /// # Errors
    ///
    /// Returns a [`DatasetError`] if the source is missing or malformed.
    fn load(&self) -> Result<RawTable, DatasetError>;
}

impl BaselineSource for RawTable {
    fn load(&self) -> Result<RawTable, DatasetError> {
        Ok(self.clone())
    }
}

/// Baseline dataset stored as a CSV file with a header row.
///
/// Columns are matched to features by name. `id`, `dataset` and any other
/// unknown columns are ignored; the label is read from `target`, or from the
/// legacy `num` column when `target` is absent.
#[derive(Debug, Clone)]
pub struct CsvBaseline {
    path: PathBuf,
}

impl CsvBaseline {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, source: csv::Error) -> DatasetError {
        DatasetError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

impl BaselineSource for CsvBaseline {
    fn load(&self) -> Result<RawTable, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.read_error(e))?;

        let headers = reader.headers().map_err(|e| self.read_error(e))?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(name))
        };

        let mut found: [Option<usize>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (idx, header) in headers.iter().enumerate() {
            if let Some(feature) = Feature::from_column(header) {
                found[feature.index()].get_or_insert(idx);
            }
        }
        let mut feature_columns = [0usize; FEATURE_COUNT];
        for feature in Feature::ALL {
            feature_columns[feature.index()] = found[feature.index()]
                .ok_or_else(|| DatasetError::MissingColumn(feature.name().to_string()))?;
        }
        let target_column = column(TARGET_COLUMN)
            .or_else(|| column(LEGACY_TARGET_COLUMN))
            .ok_or_else(|| DatasetError::MissingColumn(TARGET_COLUMN.to_string()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.read_error(e))?;
            let cell = |idx: usize| {
                record
                    .get(idx)
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_string)
            };
            rows.push(RawRow {
                values: feature_columns.map(cell),
                target: cell(target_column),
            });
        }

        debug!(path = %self.path.display(), rows = rows.len(), "Loaded baseline dataset");
        Ok(RawTable { rows })
    }
}
