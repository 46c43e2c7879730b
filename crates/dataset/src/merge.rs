//! Dataset Merger: baseline + feedback → cleaned, capped, stratified split.

use std::collections::HashSet;

use clinical_schema::{
    ClinicalRecord, Diagnosis, FEATURE_COUNT, Feature, FeatureKind,
};
use tracing::{debug, info};

use crate::balance::{CapOutcome, cap_majority};
use crate::normalize::{median, normalize_column};
use crate::split::stratified_split;
use crate::{DatasetError, RawRow, RawTable, TEST_FRACTION, TrainingDataset};

/// Minimum feedback volume before feedback joins training.
pub const DEFAULT_FEEDBACK_MIN_ROWS: usize = 50;

/// Knobs for a merge run.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOptions {
    /// Feedback is ignored entirely below this many records.
    pub feedback_min_rows: usize,
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the majority cap and the split.
    pub seed: u64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            feedback_min_rows: DEFAULT_FEEDBACK_MIN_ROWS,
            test_fraction: TEST_FRACTION,
            seed: 44,
        }
    }
}

/// What happened to the feedback records in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackIntegration {
    /// Below the gate; nothing was merged.
    Skipped { available: usize },
    /// Merged after removing exact duplicates.
    Integrated { available: usize, unique: usize },
}

/// Summary of a merge run alongside the resulting dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub baseline_rows: usize,
    pub feedback: FeedbackIntegration,
    /// Rows after feedback integration, before cleaning.
    pub merged_rows: usize,
    /// Unmapped categorical values replaced by the column median, per feature.
    pub repaired: Vec<(Feature, usize)>,
    /// Measurements outside their feature's domain, imputed like missing
    /// values, per feature.
    pub out_of_range: Vec<(Feature, usize)>,
    /// Rows dropped for a missing or non-numeric label.
    pub unlabelled_rows: usize,
    pub cap: Option<CapOutcome>,
    pub dataset: TrainingDataset,
}

/// Appends deduplicated feedback to `table` if there is enough of it.
///
/// Feedback arrives as raw rows so that stored codes outside their table are
/// repaired with the rest of the column instead of failing the read.
pub fn integrate_feedback(
    table: &mut RawTable,
    feedback: &[RawRow],
    min_rows: usize,
) -> FeedbackIntegration {
    let available = feedback.len();
    if available == 0 || available < min_rows {
        info!(available, min_rows, "Skipping feedback integration");
        return FeedbackIntegration::Skipped { available };
    }

    let mut seen = HashSet::with_capacity(available);
    let unique: Vec<RawRow> = feedback
        .iter()
        .filter(|row| seen.insert(*row))
        .cloned()
        .collect();
    let unique_count = unique.len();
    table.rows.extend(unique);

    info!(available, unique = unique_count, "Integrated feedback rows");
    FeedbackIntegration::Integrated {
        available,
        unique: unique_count,
    }
}

/// Builds the training dataset from the baseline table and feedback records.
///
/// # Errors
///
/// Returns [`DatasetError::Empty`] if no labelled rows survive cleaning, or
/// [`DatasetError::EmptyColumn`] if a numeric column has no value to impute from.
pub fn build_training_dataset(
    baseline: RawTable,
    feedback: &[RawRow],
    options: &MergeOptions,
) -> Result<MergeReport, DatasetError> {
    let baseline_rows = baseline.len();
    let mut table = baseline;
    let integration = integrate_feedback(&mut table, feedback, options.feedback_min_rows);
    let merged_rows = table.len();

    let EncodedColumns {
        columns,
        repaired,
        out_of_range,
    } = encode_columns(&table.rows);

    let mut labelled = Vec::with_capacity(merged_rows);
    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(severity) = row.target.as_deref().and_then(parse_number) else {
            continue;
        };
        let values: [Option<f64>; FEATURE_COUNT] =
            core::array::from_fn(|feature| columns[feature][row_idx]);
        labelled.push((values, Diagnosis::from_severity(severity)));
    }
    let unlabelled_rows = merged_rows - labelled.len();
    if unlabelled_rows > 0 {
        debug!(unlabelled_rows, "Dropped rows without a label");
    }
    if labelled.is_empty() {
        return Err(DatasetError::Empty);
    }

    let (capped, cap) = cap_majority(labelled, options.seed);
    let rows = impute_numeric(&capped)?;

    let dataset = stratified_split(&rows, options.test_fraction, options.seed);
    let train_counts = dataset.train.class_counts();
    info!(
        rows = rows.len(),
        train = dataset.train.len(),
        test = dataset.test.len(),
        train_absent = train_counts.absent,
        train_present = train_counts.present,
        "Prepared training dataset"
    );

    Ok(MergeReport {
        baseline_rows,
        feedback: integration,
        merged_rows,
        repaired,
        out_of_range,
        unlabelled_rows,
        cap,
        dataset,
    })
}

struct EncodedColumns {
    columns: Vec<Vec<Option<f64>>>,
    repaired: Vec<(Feature, usize)>,
    out_of_range: Vec<(Feature, usize)>,
}

/// Encodes every column: categorical columns through the normalizer (fully
/// populated), measurements parsed with out-of-domain values left missing.
fn encode_columns(rows: &[RawRow]) -> EncodedColumns {
    let mut repaired = Vec::new();
    let mut out_of_range = Vec::new();
    let columns = Feature::ALL
        .iter()
        .map(|&feature| {
            let raw: Vec<Option<&str>> = rows.iter().map(|row| row.value(feature)).collect();
            match feature.categorical() {
                Some(field) => {
                    let column = normalize_column(field, &raw);
                    if column.repaired > 0 {
                        debug!(
                            %feature,
                            repaired = column.repaired,
                            code = column.repair_code,
                            "Repaired unmapped categorical values"
                        );
                        repaired.push((feature, column.repaired));
                    }
                    column.codes.into_iter().map(|code| Some(f64::from(code))).collect()
                }
                None => {
                    let mut rejected = 0;
                    let column: Vec<Option<f64>> = raw
                        .into_iter()
                        .map(|value| {
                            let value = value.and_then(parse_number)?;
                            let parsed = parse_measurement(feature, value);
                            if parsed.is_none() {
                                rejected += 1;
                            }
                            parsed
                        })
                        .collect();
                    if rejected > 0 {
                        debug!(%feature, rejected, "Dropped out-of-range measurements");
                        out_of_range.push((feature, rejected));
                    }
                    column
                }
            }
        })
        .collect();
    EncodedColumns {
        columns,
        repaired,
        out_of_range,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rounds integer measurements; `None` when the value is outside the domain.
fn parse_measurement(feature: Feature, value: f64) -> Option<f64> {
    let value = match feature.kind() {
        FeatureKind::Integer { .. } => value.round(),
        _ => value,
    };
    feature.accepts(value).then_some(value)
}

/// Fills missing measurements with the column median and decodes typed records.
fn impute_numeric(
    rows: &[([Option<f64>; FEATURE_COUNT], Diagnosis)],
) -> Result<Vec<(ClinicalRecord, Diagnosis)>, DatasetError> {
    let mut medians = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        let idx = feature.index();
        if rows.iter().all(|(values, _)| values[idx].is_some()) {
            continue;
        }
        let mut present: Vec<f64> = rows.iter().filter_map(|(values, _)| values[idx]).collect();
        medians[idx] = median(&mut present).ok_or(DatasetError::EmptyColumn(feature))?;
    }

    rows.iter()
        .map(|(values, label)| {
            let filled: [f64; FEATURE_COUNT] =
                core::array::from_fn(|idx| values[idx].unwrap_or(medians[idx]));
            Ok((ClinicalRecord::from_features(&filled)?, *label))
        })
        .collect()
}
