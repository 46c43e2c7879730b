//! Typed patient records and feedback entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CategoricalCode, ChestPain, FEATURE_COUNT, Feature, RestEcg, SchemaError, Sex, Slope, Thal,
};

/// One patient observation over the 13 canonical features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub age: i32,
    pub sex: Sex,
    pub cp: ChestPain,
    pub trestbps: i32,
    pub chol: i32,
    pub fbs: bool,
    pub restecg: RestEcg,
    pub thalch: i32,
    pub exang: bool,
    pub oldpeak: f64,
    pub slope: Slope,
    pub ca: u8,
    pub thal: Thal,
}

impl ClinicalRecord {
    /// Encodes the record as a model input row in [`Feature::ALL`] order.
    #[must_use]
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.age),
            f64::from(self.sex.code()),
            f64::from(self.cp.code()),
            f64::from(self.trestbps),
            f64::from(self.chol),
            f64::from(u8::from(self.fbs)),
            f64::from(self.restecg.code()),
            f64::from(self.thalch),
            f64::from(u8::from(self.exang)),
            self.oldpeak,
            f64::from(self.slope.code()),
            f64::from(self.ca),
            f64::from(self.thal.code()),
        ]
    }

    /// Decodes a model input row.
    ///
    /// Integer measurements are rounded to the nearest whole number; categorical
    /// columns must hold valid codes.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if a categorical code is unknown or `ca` is
    /// outside `0..=3`.
    pub fn from_features(values: &[f64; FEATURE_COUNT]) -> Result<Self, SchemaError> {
        let value = |feature: Feature| values[feature.index()];
        let ca = value(Feature::Ca).round();
        if !Feature::Ca.accepts(ca) {
            return Err(out_of_range(Feature::Ca, ca));
        }

        Ok(Self {
            age: value(Feature::Age).round() as i32,
            sex: Sex::from_value(value(Feature::Sex))?,
            cp: ChestPain::from_value(value(Feature::Cp))?,
            trestbps: value(Feature::Trestbps).round() as i32,
            chol: value(Feature::Chol).round() as i32,
            fbs: decode_flag(Feature::Fbs, value(Feature::Fbs))?,
            restecg: RestEcg::from_value(value(Feature::Restecg))?,
            thalch: value(Feature::Thalch).round() as i32,
            exang: decode_flag(Feature::Exang, value(Feature::Exang))?,
            oldpeak: value(Feature::Oldpeak),
            slope: Slope::from_value(value(Feature::Slope))?,
            ca: ca as u8,
            thal: Thal::from_value(value(Feature::Thal))?,
        })
    }

    /// Checks every measurement against its clinical range.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::OutOfRange`] naming the first offending feature.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let values = self.to_features();
        for feature in Feature::ALL {
            let value = values[feature.index()];
            if !feature.accepts(value) {
                return Err(out_of_range(feature, value));
            }
        }
        Ok(())
    }
}

fn decode_flag(feature: Feature, value: f64) -> Result<bool, SchemaError> {
    match value {
        v if v == 0.0 => Ok(false),
        v if v == 1.0 => Ok(true),
        v => Err(out_of_range(feature, v)),
    }
}

fn out_of_range(feature: Feature, value: f64) -> SchemaError {
    let (min, max) = match feature.kind() {
        crate::FeatureKind::Integer { min, max } => (min as f64, max as f64),
        crate::FeatureKind::Decimal { min, max } => (min, max),
        crate::FeatureKind::Categorical(field) => (0.0, f64::from(field.code_count() - 1)),
    };
    SchemaError::OutOfRange {
        feature,
        value,
        min,
        max,
    }
}

/// Binary ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnosis {
    /// No heart disease.
    Absent,
    /// Heart disease present.
    Present,
}

impl Diagnosis {
    /// Binarises a severity score: anything above zero is disease.
    #[must_use]
    pub fn from_severity(value: f64) -> Self {
        if value > 0.0 {
            Self::Present
        } else {
            Self::Absent
        }
    }

    /// Strict decoding of a stored 0/1 label.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDiagnosis`] for any other value.
    pub fn from_code(code: i64) -> Result<Self, SchemaError> {
        match code {
            0 => Ok(Self::Absent),
            1 => Ok(Self::Present),
            other => Err(SchemaError::InvalidDiagnosis(other)),
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Text shown to clinicians.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Absent => "No Heart Disease",
            Self::Present => "Heart Disease",
        }
    }
}

/// A clinician-labelled record from the append-only feedback store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub record: ClinicalRecord,
    pub prediction: Diagnosis,
    pub created_at: DateTime<Utc>,
}
