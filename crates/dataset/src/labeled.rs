use clinical_schema::{ClinicalRecord, Diagnosis, FEATURE_COUNT};
use ndarray::Array2;

/// Per-class row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub absent: usize,
    pub present: usize,
}

impl ClassCounts {
    /// Counts labels by class.
    #[must_use]
    pub fn of(labels: &[Diagnosis]) -> Self {
        labels.iter().fold(Self::default(), |mut counts, label| {
            match label {
                Diagnosis::Absent => counts.absent += 1,
                Diagnosis::Present => counts.present += 1,
            }
            counts
        })
    }

    #[must_use]
    pub const fn get(&self, label: Diagnosis) -> usize {
        match label {
            Diagnosis::Absent => self.absent,
            Diagnosis::Present => self.present,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.absent + self.present
    }

    /// Number of classes with at least one row.
    #[must_use]
    pub const fn populated(&self) -> usize {
        (self.absent > 0) as usize + (self.present > 0) as usize
    }

    /// The larger class, `Absent` on ties.
    #[must_use]
    pub const fn majority(&self) -> Diagnosis {
        if self.present > self.absent {
            Diagnosis::Present
        } else {
            Diagnosis::Absent
        }
    }

    #[must_use]
    pub const fn minority_count(&self) -> usize {
        if self.present < self.absent {
            self.present
        } else {
            self.absent
        }
    }
}

/// Records paired 1:1 with their labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSplit {
    pub records: Vec<ClinicalRecord>,
    pub labels: Vec<Diagnosis>,
}

impl LabeledSplit {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: ClinicalRecord, label: Diagnosis) {
        self.records.push(record);
        self.labels.push(label);
    }

    #[must_use]
    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::of(&self.labels)
    }

    /// Feature matrix of shape `[len, FEATURE_COUNT]` in schema column order.
    #[must_use]
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.records.len(), FEATURE_COUNT));
        for (mut row, record) in matrix.rows_mut().into_iter().zip(&self.records) {
            for (cell, value) in row.iter_mut().zip(record.to_features()) {
                *cell = value;
            }
        }
        matrix
    }

    /// Labels as `0`/`1`.
    #[must_use]
    pub fn label_codes(&self) -> Vec<u8> {
        self.labels.iter().map(|label| label.code()).collect()
    }
}

/// Disjoint train and test partitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingDataset {
    pub train: LabeledSplit,
    pub test: LabeledSplit,
}
