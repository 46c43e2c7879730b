//! The 13 clinical input columns and their semantic domains.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumCount;

use crate::CategoricalField;

/// Number of model input features.
pub const FEATURE_COUNT: usize = Feature::COUNT;

/// A canonical input column, in model column order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
    strum::EnumCount,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Feature {
    /// Age in years.
    Age,
    /// Biological sex.
    Sex,
    /// Chest pain type.
    Cp,
    /// Resting blood pressure (mm Hg).
    Trestbps,
    /// Serum cholesterol (mg/dl).
    Chol,
    /// Fasting blood sugar > 120 mg/dl.
    Fbs,
    /// Resting electrocardiographic result.
    Restecg,
    /// Maximum heart rate achieved.
    Thalch,
    /// Exercise induced angina.
    Exang,
    /// ST depression induced by exercise relative to rest.
    Oldpeak,
    /// Slope of the peak exercise ST segment.
    Slope,
    /// Number of major vessels colored by fluoroscopy.
    Ca,
    /// Thalassemia result.
    Thal,
}

/// How a feature's values are represented before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureKind {
    /// Whole-number measurement.
    Integer { min: i64, max: i64 },
    /// Real-valued measurement.
    Decimal { min: f64, max: f64 },
    /// Label or code drawn from a fixed table.
    Categorical(CategoricalField),
}

impl Feature {
    /// All features in model column order.
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::Age,
        Self::Sex,
        Self::Cp,
        Self::Trestbps,
        Self::Chol,
        Self::Fbs,
        Self::Restecg,
        Self::Thalch,
        Self::Exang,
        Self::Oldpeak,
        Self::Slope,
        Self::Ca,
        Self::Thal,
    ];

    /// Column position in a feature vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Column name as it appears in datasets and the feedback table.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Parses a dataset column header, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_column(header: &str) -> Option<Self> {
        Self::from_str(&header.trim().to_lowercase()).ok()
    }

    /// Returns the representation and allowed range of this feature.
    #[must_use]
    pub const fn kind(self) -> FeatureKind {
        match self {
            Self::Age => FeatureKind::Integer { min: 0, max: 120 },
            Self::Trestbps => FeatureKind::Integer { min: 0, max: 300 },
            Self::Chol => FeatureKind::Integer { min: 0, max: 1000 },
            Self::Thalch => FeatureKind::Integer { min: 0, max: 250 },
            Self::Ca => FeatureKind::Integer { min: 0, max: 3 },
            Self::Oldpeak => FeatureKind::Decimal {
                min: -10.0,
                max: 10.0,
            },
            Self::Sex => FeatureKind::Categorical(CategoricalField::Sex),
            Self::Cp => FeatureKind::Categorical(CategoricalField::ChestPain),
            Self::Fbs => FeatureKind::Categorical(CategoricalField::FastingBloodSugar),
            Self::Restecg => FeatureKind::Categorical(CategoricalField::RestEcg),
            Self::Exang => FeatureKind::Categorical(CategoricalField::ExerciseAngina),
            Self::Slope => FeatureKind::Categorical(CategoricalField::Slope),
            Self::Thal => FeatureKind::Categorical(CategoricalField::Thal),
        }
    }

    /// The code table for categorical features, `None` for measurements.
    #[must_use]
    pub const fn categorical(self) -> Option<CategoricalField> {
        match self.kind() {
            FeatureKind::Categorical(field) => Some(field),
            _ => None,
        }
    }

    /// Returns true if `value` lies inside this feature's domain.
    ///
    /// Integer features additionally require a whole number, categorical
    /// features a known code.
    #[must_use]
    pub fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.kind() {
            FeatureKind::Integer { min, max } => {
                value.fract() == 0.0 && value >= min as f64 && value <= max as f64
            }
            FeatureKind::Decimal { min, max } => value >= min && value <= max,
            FeatureKind::Categorical(field) => field.is_code(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_column_order_matches_index() {
        for (i, feature) in Feature::iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(Feature::ALL[i], feature);
        }
    }

    #[test]
    fn test_from_column() {
        assert_eq!(Feature::from_column("thalch"), Some(Feature::Thalch));
        assert_eq!(Feature::from_column(" TrestBPS "), Some(Feature::Trestbps));
        assert_eq!(Feature::from_column("num"), None);
        assert_eq!(Feature::Oldpeak.name(), "oldpeak");
    }

    #[test]
    fn test_accepts() {
        assert!(Feature::Ca.accepts(3.0));
        assert!(!Feature::Ca.accepts(4.0));
        assert!(!Feature::Age.accepts(54.5));
        assert!(Feature::Oldpeak.accepts(-2.6));
        assert!(Feature::Thal.accepts(2.0));
        assert!(!Feature::Thal.accepts(3.0));
        assert!(!Feature::Chol.accepts(f64::NAN));
    }
}
