use crate::error::{AppError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Per-feature standardizer: `(x - mean) / std`.
///
/// Uses the population standard deviation. Features with zero variance are
/// only centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
    n_samples_seen: usize,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            scale: None,
            n_samples_seen: 0,
        }
    }

    /// Compute column statistics
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(AppError::Training(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| AppError::Training("Failed to compute feature means".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        self.n_samples_seen = x.nrows();

        Ok(())
    }

    /// Standardize rows with the fitted statistics
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => {
                return Err(AppError::Internal(
                    "StandardScaler must be fitted before transform".to_string(),
                ))
            }
        };

        if x.ncols() != mean.len() {
            return Err(AppError::Validation(format!(
                "Expected {} features, got {}",
                mean.len(),
                x.ncols()
            )));
        }

        Ok((x - mean) / scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    pub fn n_features(&self) -> usize {
        self.mean.as_ref().map(|m| m.len()).unwrap_or(0)
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_centers_and_scales() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&x).unwrap();

        let mean = scaler.mean().unwrap();
        assert!((mean[0] - 3.0).abs() < 1e-12);
        assert!((mean[1] - 10.0).abs() < 1e-12);

        // Population std of [1, 3, 5] is sqrt(8/3)
        let expected = 2.0 / (8.0f64 / 3.0).sqrt();
        assert!((z[[2, 0]] - expected).abs() < 1e-12);
        assert!((z[[0, 0]] + expected).abs() < 1e-12);

        // Constant column is centered only
        assert_eq!(scaler.scale().unwrap()[1], 1.0);
        assert_eq!(z[[1, 1]], 0.0);
    }

    #[test]
    fn test_transform_requires_fit() {
        let scaler = StandardScaler::new();
        assert!(!scaler.is_fitted());
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(scaler.n_features(), 2);
        assert!(scaler.transform(&array![[1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_fit_empty_matrix_fails() {
        let mut scaler = StandardScaler::new();
        assert!(scaler.fit(&Array2::zeros((0, 3))).is_err());
    }
}
