//! Per-feature standardization (`(x - mean) / scale`).

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Scales below this are treated as zero variance and replaced by `1.0`.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Per-feature mean and standard deviation learned from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature.
    pub mean: Vec<f64>,
    /// Population standard deviation of each feature (`1.0` for constant
    /// features).
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Learns mean and scale from `rows`.
    ///
    /// # Errors
    ///
    /// * [`ModelError::InsufficientData`] if `rows` is empty
    /// * [`ModelError::DimensionMismatch`] if rows differ in width
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let Some(first) = rows.first() else {
            return Err(ModelError::InsufficientData {
                message: "cannot fit a scaler on zero rows".to_string(),
            });
        };
        let width = first.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(ModelError::DimensionMismatch {
                expected: width,
                actual: bad.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = vec![0.0; width];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s < MIN_SCALE {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    /// Number of features this scaler was fit on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Whether the scaler covers zero features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.mean.iter().chain(&self.scale).all(|v| v.is_finite())
    }

    /// Standardizes one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if `row` has the wrong
    /// width.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.len() || self.scale.len() != self.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.len(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect())
    }
}
