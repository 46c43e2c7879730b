//! Clinical record input shared by `predict` and `feedback`.

use anyhow::{Context, Result};
use clap::Args;
use clinical_schema::{CategoricalCode, ChestPain, ClinicalRecord, RestEcg, Sex, Slope, Thal};

/// The 13 clinical features. Categorical fields take a label
/// (`asymptomatic`, `reversible defect`) or its numeric code.
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Age in years
    #[arg(long)]
    pub age: i32,

    /// `male` or `female`
    #[arg(long)]
    pub sex: String,

    /// Chest pain type
    #[arg(long)]
    pub cp: String,

    /// Resting blood pressure (mm Hg)
    #[arg(long)]
    pub trestbps: i32,

    /// Serum cholesterol (mg/dl)
    #[arg(long)]
    pub chol: i32,

    /// Fasting blood sugar above 120 mg/dl
    #[arg(long)]
    pub fbs: bool,

    /// Resting ECG result
    #[arg(long)]
    pub restecg: String,

    /// Maximum heart rate achieved
    #[arg(long)]
    pub thalch: i32,

    /// Exercise-induced angina
    #[arg(long)]
    pub exang: bool,

    /// ST depression induced by exercise
    #[arg(long, allow_negative_numbers = true)]
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment
    #[arg(long)]
    pub slope: String,

    /// Major vessels colored by fluoroscopy (0-3)
    #[arg(long)]
    pub ca: u8,

    /// Thalassemia result
    #[arg(long)]
    pub thal: String,

    /// Read a numeric `--thal` as the legacy form's 1-based code
    /// (1 = normal, 2 = fixed defect, 3 = reversible defect)
    #[arg(long)]
    pub legacy_thal_codes: bool,
}

impl RecordArgs {
    /// Builds a validated record.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown labels or out-of-range values.
    pub fn to_record(&self) -> Result<ClinicalRecord> {
        let record = ClinicalRecord {
            age: self.age,
            sex: category::<Sex>(&self.sex)?,
            cp: category::<ChestPain>(&self.cp)?,
            trestbps: self.trestbps,
            chol: self.chol,
            fbs: self.fbs,
            restecg: category::<RestEcg>(&self.restecg)?,
            thalch: self.thalch,
            exang: self.exang,
            oldpeak: self.oldpeak,
            slope: category::<Slope>(&self.slope)?,
            ca: self.ca,
            thal: self.thal()?,
        };
        record.validate().context("Invalid clinical record")?;
        Ok(record)
    }

    fn thal(&self) -> Result<Thal> {
        if !self.legacy_thal_codes {
            return category::<Thal>(&self.thal);
        }
        match self.thal.trim().parse::<u8>() {
            Ok(code) => Thal::from_legacy_code(code).context("Invalid legacy thal code"),
            // Labels are unambiguous either way.
            Err(_) => category::<Thal>(&self.thal),
        }
    }
}

fn category<T: CategoricalCode>(raw: &str) -> Result<T> {
    let code = T::FIELD.encode(raw)?;
    Ok(T::from_value(f64::from(code))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RecordArgs {
        RecordArgs {
            age: 63,
            sex: "Male".to_string(),
            cp: "typical angina".to_string(),
            trestbps: 145,
            chol: 233,
            fbs: true,
            restecg: "lv hypertrophy".to_string(),
            thalch: 150,
            exang: false,
            oldpeak: 2.3,
            slope: "downsloping".to_string(),
            ca: 0,
            thal: "fixed defect".to_string(),
            legacy_thal_codes: false,
        }
    }

    #[test]
    fn test_labels_map_to_record() {
        let record = args().to_record().unwrap();
        assert_eq!(record.sex, Sex::Male);
        assert_eq!(record.cp, ChestPain::TypicalAngina);
        assert_eq!(record.restecg, RestEcg::LvHypertrophy);
        assert_eq!(record.slope, Slope::Downsloping);
        assert_eq!(record.thal, Thal::FixedDefect);
    }

    #[test]
    fn test_numeric_codes_accepted() {
        let mut a = args();
        a.cp = "3".to_string();
        a.thal = "2".to_string();
        let record = a.to_record().unwrap();
        assert_eq!(record.cp, ChestPain::Asymptomatic);
        assert_eq!(record.thal, Thal::ReversibleDefect);
    }

    #[test]
    fn test_legacy_thal_codes_are_one_based() {
        let mut a = args();
        a.legacy_thal_codes = true;
        a.thal = "1".to_string();
        assert_eq!(a.to_record().unwrap().thal, Thal::Normal);
        a.thal = "3".to_string();
        assert_eq!(a.to_record().unwrap().thal, Thal::ReversibleDefect);
        a.thal = "reversable defect".to_string();
        assert_eq!(a.to_record().unwrap().thal, Thal::ReversibleDefect);
        a.thal = "0".to_string();
        assert!(a.to_record().is_err());

        // Without the flag the same digit is a 0-based code.
        a.legacy_thal_codes = false;
        a.thal = "1".to_string();
        assert_eq!(a.to_record().unwrap().thal, Thal::FixedDefect);
    }

    #[test]
    fn test_unknown_label_and_range_rejected() {
        let mut a = args();
        a.thal = "unknown".to_string();
        assert!(a.to_record().is_err());

        let mut a = args();
        a.ca = 7;
        assert!(a.to_record().is_err());
    }
}
