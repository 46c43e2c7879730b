//! Code tables for categorical clinical fields.
//!
//! Raw values are trimmed and lower-cased before lookup. Every table also
//! accepts its own integer codes, so already-encoded rows (feedback, API input)
//! pass through unchanged.

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// A categorical column and its code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CategoricalField {
    Sex,
    ChestPain,
    FastingBloodSugar,
    RestEcg,
    ExerciseAngina,
    Slope,
    Thal,
}

const SEX_TABLE: &[(&str, u8)] = &[("male", 0), ("female", 1)];

const CHEST_PAIN_TABLE: &[(&str, u8)] = &[
    ("typical angina", 0),
    ("atypical angina", 1),
    ("non-anginal", 2),
    ("non-anginal pain", 2),
    ("asymptomatic", 3),
];

const BOOLEAN_TABLE: &[(&str, u8)] = &[("false", 0), ("true", 1)];

const REST_ECG_TABLE: &[(&str, u8)] = &[
    ("normal", 0),
    ("st-t wave abnormality", 1),
    ("lv hypertrophy", 2),
    ("left ventricular hypertrophy", 2),
];

const SLOPE_TABLE: &[(&str, u8)] = &[("upsloping", 0), ("flat", 1), ("downsloping", 2)];

const THAL_TABLE: &[(&str, u8)] = &[
    ("normal", 0),
    ("fixed defect", 1),
    ("reversable defect", 2),
    ("reversible defect", 2),
];

impl CategoricalField {
    /// Label-to-code table, keyed by canonical (trimmed, lower-case) label.
    #[must_use]
    pub const fn table(self) -> &'static [(&'static str, u8)] {
        match self {
            Self::Sex => SEX_TABLE,
            Self::ChestPain => CHEST_PAIN_TABLE,
            Self::FastingBloodSugar | Self::ExerciseAngina => BOOLEAN_TABLE,
            Self::RestEcg => REST_ECG_TABLE,
            Self::Slope => SLOPE_TABLE,
            Self::Thal => THAL_TABLE,
        }
    }

    /// Number of distinct codes; valid codes are `0..code_count`.
    #[must_use]
    pub const fn code_count(self) -> u8 {
        match self {
            Self::Sex | Self::FastingBloodSugar | Self::ExerciseAngina => 2,
            Self::RestEcg | Self::Slope | Self::Thal => 3,
            Self::ChestPain => 4,
        }
    }

    /// Returns true if `value` is one of this field's integer codes.
    #[must_use]
    pub fn is_code(self, value: f64) -> bool {
        value.fract() == 0.0 && value >= 0.0 && value < f64::from(self.code_count())
    }

    /// Maps a raw value to its canonical code.
    ///
    /// Returns `None` when the value is neither a known label nor a valid code.
    /// Callers decide how to repair unmapped values.
    #[must_use]
    pub fn lookup(self, raw: &str) -> Option<u8> {
        let canonical = raw.trim().to_lowercase();
        if let Some(&(_, code)) = self.table().iter().find(|(label, _)| *label == canonical) {
            return Some(code);
        }
        let numeric: f64 = canonical.parse().ok()?;
        self.is_code(numeric).then_some(numeric as u8)
    }

    /// Like [`lookup`](Self::lookup) but reports unmapped values as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownLabel`] if the value cannot be mapped.
    pub fn encode(self, raw: &str) -> Result<u8, SchemaError> {
        self.lookup(raw).ok_or_else(|| SchemaError::UnknownLabel {
            field: self,
            raw: raw.to_string(),
        })
    }
}

/// A typed categorical value with a fixed integer code.
pub trait CategoricalCode: Sized + Copy {
    /// Table this type encodes.
    const FIELD: CategoricalField;

    /// Integer code used in feature vectors.
    fn code(self) -> u8;

    /// Inverse of [`code`](Self::code).
    fn from_code(code: u8) -> Option<Self>;

    /// Decodes a feature-vector value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownCode`] if `value` is not a code of this field.
    fn from_value(value: f64) -> Result<Self, SchemaError> {
        if Self::FIELD.is_code(value) {
            if let Some(decoded) = Self::from_code(value as u8) {
                return Ok(decoded);
            }
        }
        Err(SchemaError::UnknownCode {
            field: Self::FIELD,
            value,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl CategoricalCode for Sex {
    const FIELD: CategoricalField = CategoricalField::Sex;

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Male),
            1 => Some(Self::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestPain {
    TypicalAngina,
    AtypicalAngina,
    NonAnginal,
    Asymptomatic,
}

impl CategoricalCode for ChestPain {
    const FIELD: CategoricalField = CategoricalField::ChestPain;

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::TypicalAngina),
            1 => Some(Self::AtypicalAngina),
            2 => Some(Self::NonAnginal),
            3 => Some(Self::Asymptomatic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestEcg {
    Normal,
    StTAbnormality,
    LvHypertrophy,
}

impl CategoricalCode for RestEcg {
    const FIELD: CategoricalField = CategoricalField::RestEcg;

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::StTAbnormality),
            2 => Some(Self::LvHypertrophy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    Upsloping,
    Flat,
    Downsloping,
}

impl CategoricalCode for Slope {
    const FIELD: CategoricalField = CategoricalField::Slope;

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Upsloping),
            1 => Some(Self::Flat),
            2 => Some(Self::Downsloping),
            _ => None,
        }
    }
}

/// Thalassemia result.
///
/// Codes are `normal = 0`, `fixed defect = 1`, `reversible defect = 2` for both
/// training and serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thal {
    Normal,
    FixedDefect,
    ReversibleDefect,
}

impl Thal {
    /// Translates the 1-based codes emitted by the legacy clinician form
    /// (`normal = 1`, `fixed defect = 2`, `reversible defect = 3`).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownCode`] for anything outside `1..=3`.
    pub fn from_legacy_code(code: u8) -> Result<Self, SchemaError> {
        code.checked_sub(1)
            .and_then(Self::from_code)
            .ok_or(SchemaError::UnknownCode {
                field: CategoricalField::Thal,
                value: f64::from(code),
            })
    }
}

impl CategoricalCode for Thal {
    const FIELD: CategoricalField = CategoricalField::Thal;

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::FixedDefect),
            2 => Some(Self::ReversibleDefect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_canonicalises_labels() {
        assert_eq!(CategoricalField::Sex.lookup("  Male "), Some(0));
        assert_eq!(CategoricalField::Sex.lookup("FEMALE"), Some(1));
        assert_eq!(CategoricalField::ChestPain.lookup("non-anginal"), Some(2));
        assert_eq!(CategoricalField::ChestPain.lookup("Non-Anginal Pain"), Some(2));
        assert_eq!(CategoricalField::RestEcg.lookup("lv hypertrophy"), Some(2));
        assert_eq!(
            CategoricalField::RestEcg.lookup("left ventricular hypertrophy"),
            Some(2)
        );
        assert_eq!(CategoricalField::Thal.lookup("reversable defect"), Some(2));
        assert_eq!(CategoricalField::Thal.lookup("Reversible Defect"), Some(2));
        assert_eq!(CategoricalField::FastingBloodSugar.lookup("TRUE"), Some(1));
        assert_eq!(CategoricalField::ExerciseAngina.lookup("false"), Some(0));
    }

    #[test]
    fn test_lookup_accepts_codes() {
        assert_eq!(CategoricalField::ChestPain.lookup("3"), Some(3));
        assert_eq!(CategoricalField::Slope.lookup("1.0"), Some(1));
        assert_eq!(CategoricalField::Slope.lookup("3"), None);
        assert_eq!(CategoricalField::Sex.lookup("-1"), None);
        assert_eq!(CategoricalField::Sex.lookup("0.5"), None);
    }

    #[test]
    fn test_lookup_rejects_unknown() {
        assert_eq!(CategoricalField::Thal.lookup("nan"), None);
        assert_eq!(CategoricalField::Thal.lookup(""), None);
        assert!(CategoricalField::Slope.encode("sideways").is_err());
    }

    #[test]
    fn test_legacy_thal_codes() {
        assert_eq!(Thal::from_legacy_code(1), Ok(Thal::Normal));
        assert_eq!(Thal::from_legacy_code(3), Ok(Thal::ReversibleDefect));
        assert!(Thal::from_legacy_code(0).is_err());
        assert!(Thal::from_legacy_code(4).is_err());
    }

    #[test]
    fn test_code_round_trip() {
        for code in 0..4 {
            assert_eq!(ChestPain::from_code(code).map(ChestPain::code), Some(code));
        }
        assert_eq!(Thal::from_value(2.0), Ok(Thal::ReversibleDefect));
        assert!(Thal::from_value(1.5).is_err());
    }
}
