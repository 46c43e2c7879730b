//! Stratified train/test partitioning.

use clinical_schema::{ClinicalRecord, Diagnosis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{LabeledSplit, TrainingDataset};

/// Splits rows into disjoint train and test partitions, preserving class
/// proportions.
///
/// The test partition holds `ceil(len × test_fraction)` rows, allocated to
/// classes by largest remainder. Assignment and row order depend only on `seed`.
#[must_use]
pub fn stratified_split(
    rows: &[(ClinicalRecord, Diagnosis)],
    test_fraction: f64,
    seed: u64,
) -> TrainingDataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let classes = [Diagnosis::Absent, Diagnosis::Present];
    let mut members: Vec<Vec<usize>> = classes
        .iter()
        .map(|class| {
            rows.iter()
                .enumerate()
                .filter(|(_, (_, label))| label == class)
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();

    let sizes: Vec<usize> = members.iter().map(Vec::len).collect();
    let allocation = allocate_test_rows(&sizes, test_fraction);

    let mut test_idx = Vec::new();
    let mut train_idx = Vec::new();
    for (indices, n_test) in members.iter_mut().zip(allocation) {
        indices.shuffle(&mut rng);
        let (test, train) = indices.split_at(n_test);
        test_idx.extend_from_slice(test);
        train_idx.extend_from_slice(train);
    }
    test_idx.shuffle(&mut rng);
    train_idx.shuffle(&mut rng);

    let gather = |indices: &[usize]| {
        let mut split = LabeledSplit::default();
        for &idx in indices {
            let (record, label) = rows[idx];
            split.push(record, label);
        }
        split
    };

    TrainingDataset {
        train: gather(&train_idx),
        test: gather(&test_idx),
    }
}

/// Number of test rows per class.
fn allocate_test_rows(sizes: &[usize], test_fraction: f64) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    let target = ((total as f64) * test_fraction - 1e-9).ceil() as usize;

    let exact: Vec<f64> = sizes.iter().map(|&n| n as f64 * test_fraction).collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut by_remainder: Vec<usize> = (0..sizes.len()).collect();
    let remainder = |class: usize| exact[class] - exact[class].floor();
    by_remainder.sort_by(|&a, &b| remainder(b).total_cmp(&remainder(a)));

    let mut missing = target.saturating_sub(allocation.iter().sum());
    for &class in by_remainder.iter().cycle().take(sizes.len() * 2) {
        if missing == 0 {
            break;
        }
        if allocation[class] < sizes[class] {
            allocation[class] += 1;
            missing -= 1;
        }
    }
    allocation
}
