//! Class-imbalance handling.
//!
//! Two independent steps: [`cap_majority`] runs on the whole cleaned dataset
//! before splitting, [`oversample`] runs on the training split only.

use clinical_schema::Diagnosis;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::{ClassCounts, LabeledSplit};

/// Largest allowed majority:minority ratio before downsampling.
pub const MAX_MAJORITY_RATIO: usize = 2;

/// Result of a majority-class downsample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapOutcome {
    pub majority: Diagnosis,
    pub before: usize,
    pub after: usize,
}

/// Downsamples the majority class to `MAX_MAJORITY_RATIO × minority` rows.
///
/// Applies only when both classes are present and the ratio strictly exceeds
/// the cap. The minority class is kept whole and surviving rows keep their
/// original order.
#[must_use]
pub fn cap_majority<T>(
    rows: Vec<(T, Diagnosis)>,
    seed: u64,
) -> (Vec<(T, Diagnosis)>, Option<CapOutcome>) {
    let labels: Vec<Diagnosis> = rows.iter().map(|(_, label)| *label).collect();
    let counts = ClassCounts::of(&labels);
    let minority = counts.minority_count();
    if counts.populated() != 2 || counts.get(counts.majority()) <= MAX_MAJORITY_RATIO * minority {
        return (rows, None);
    }

    let majority = counts.majority();
    let before = counts.get(majority);
    let after = MAX_MAJORITY_RATIO * minority;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions: Vec<usize> = (0..before).collect();
    positions.shuffle(&mut rng);
    let mut keep = vec![false; before];
    for &position in positions.iter().take(after) {
        keep[position] = true;
    }

    let mut majority_seen = 0;
    let capped = rows
        .into_iter()
        .filter(|(_, label)| {
            if *label != majority {
                return true;
            }
            let kept = keep[majority_seen];
            majority_seen += 1;
            kept
        })
        .collect();

    info!(?majority, before, after, "Capped majority class");
    (
        capped,
        Some(CapOutcome {
            majority,
            before,
            after,
        }),
    )
}

/// Randomly duplicates minority-class rows until both classes have equal counts.
///
/// Balanced or single-class input is returned unchanged.
#[must_use]
pub fn oversample(split: &LabeledSplit, seed: u64) -> LabeledSplit {
    let counts = split.class_counts();
    let majority = counts.majority();
    let deficit = counts.get(majority) - counts.minority_count();
    if counts.populated() != 2 || deficit == 0 {
        return split.clone();
    }

    let minority_rows: Vec<usize> = split
        .labels
        .iter()
        .enumerate()
        .filter(|(_, label)| **label != majority)
        .map(|(idx, _)| idx)
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut balanced = split.clone();
    for _ in 0..deficit {
        if let Some(&idx) = minority_rows.choose(&mut rng) {
            balanced.push(split.records[idx], split.labels[idx]);
        }
    }
    balanced
}
