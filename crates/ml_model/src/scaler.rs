//! Per-column standardization.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{self, StandardScalerParameters};

use crate::{ModelError, Result, fit_error, from_dense, to_dense};

const MODEL: &str = "standard_scaler";

/// Centers each column on its training mean and scales it to unit variance.
///
/// Columns with zero variance come out as zeros.
#[derive(Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    inner: Arc<numerical::StandardScaler<f64>>,
}

impl StandardScaler {
    /// Learns column means and standard deviations.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyTrainingSet`] for a matrix without rows.
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        let inner = numerical::StandardScaler::fit(&to_dense(MODEL, x)?, StandardScalerParameters::default())
            .map_err(|e| fit_error(MODEL, e))?;
        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let scaled: DenseMatrix<f64> = self
            .inner
            .transform(&to_dense(MODEL, x)?)
            .map_err(|e| fit_error(MODEL, e))?;
        let mut out = from_dense(&scaled);
        // 0 / 0 on constant columns.
        out.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
        Ok(out)
    }
}

impl fmt::Debug for StandardScaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardScaler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_standardizes_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let z = scaler.transform(x.view()).unwrap();

        assert!((z[[0, 0]] + z[[2, 0]]).abs() < 1e-9);
        assert!(z[[1, 0]].abs() < 1e-12);
        assert!(z[[0, 0]] < -1.0);
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_fit_on_train_applies_to_other_rows() {
        let train = array![[0.0], [2.0]];
        let scaler = StandardScaler::fit(train.view()).unwrap();
        let mid = scaler.transform(array![[1.0]].view()).unwrap();
        let far = scaler.transform(array![[4.0]].view()).unwrap();
        assert!(mid[[0, 0]].abs() < 1e-12);
        assert!(far[[0, 0]] > 1.0);
    }

    #[test]
    fn test_survives_json() {
        let train = array![[0.0, 5.0], [2.0, 7.0], [4.0, 9.0]];
        let scaler = StandardScaler::fit(train.view()).unwrap();
        let back: StandardScaler = serde_json::from_str(&serde_json::to_string(&scaler).unwrap()).unwrap();
        let a = scaler.transform(train.view()).unwrap();
        let b = back.transform(train.view()).unwrap();
        assert!(a.iter().zip(b.iter()).all(|(l, r)| (l - r).abs() < 1e-9));
    }

    #[test]
    fn test_empty_matrix() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(x.view()).is_err());
    }
}
