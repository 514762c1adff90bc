//! Feature standardization shared by every model in a bundle.
//!
//! Fit once per training phase on the generated corpus; the same
//! parameters then scale the training matrix and every inference reading.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::warn;

use crate::types::{FEATURE_NAMES, NUM_FEATURES};

use super::error::{EngineError, EngineResult};

/// Per-feature mean and population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    mean: [f64; NUM_FEATURES],
    std: [f64; NUM_FEATURES],
}

impl ScalingParameters {
    /// Fit on raw feature rows.
    ///
    /// A zero-variance feature is scaled with std = 1 so transforms stay finite.
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> EngineResult<Self> {
        if rows.is_empty() {
            return Err(EngineError::TrainingData(
                "cannot fit scaler on an empty corpus".to_string(),
            ));
        }

        let mut mean = [0.0; NUM_FEATURES];
        let mut std = [1.0; NUM_FEATURES];

        for i in 0..NUM_FEATURES {
            let column: Vec<f64> = rows.iter().map(|r| r[i]).collect();
            if let Some(bad) = column.iter().find(|v| !v.is_finite()) {
                return Err(EngineError::TrainingData(format!(
                    "feature '{}' contains non-finite value {bad}",
                    FEATURE_NAMES[i]
                )));
            }

            mean[i] = column.iter().mean();
            let sd = column.iter().population_std_dev();
            if sd > 0.0 && sd.is_finite() {
                std[i] = sd;
            } else {
                warn!(feature = FEATURE_NAMES[i], "Zero-variance feature, scaling with std = 1");
            }
        }

        Ok(Self { mean, std })
    }

    /// Apply `(x - mean) / std` per feature.
    pub fn transform(&self, raw: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut scaled = [0.0; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            scaled[i] = (raw[i] - self.mean[i]) / self.std[i];
        }
        scaled
    }

    pub fn transform_all(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<[f64; NUM_FEATURES]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn std(&self) -> &[f64; NUM_FEATURES] {
        &self.std
    }
}
