//! Standard scaler exported from a fitted feature-normalisation object.

use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::artifact::read_json;
use crate::error::{InferenceError, Result};
use crate::traits::FeatureScaler;

fn default_true() -> bool {
    true
}

/// Per-feature centring and scaling, `(x - mean) / scale`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = StandardScaler {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        };
        scaler.check()?;
        Ok(scaler)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let scaler: StandardScaler = read_json(path)?;
        scaler.check()?;
        Ok(scaler)
    }

    fn check(&self) -> Result<()> {
        if self.mean.len() != self.scale.len() {
            return Err(InferenceError::InvalidArtifact(format!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.is_empty() {
            return Err(InferenceError::InvalidArtifact("scaler has no features".to_string()));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, x: &[f64]) -> Result<Array1<f64>> {
        if x.len() != self.mean.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.mean.len(),
                actual: x.len(),
            });
        }

        let scaled = x
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&value, (&mean, &scale))| {
                let centred = if self.with_mean { value - mean } else { value };
                // a zero variance feature is stored with scale 0; leave it unscaled
                if self.with_std && scale != 0.0 {
                    centred / scale
                } else {
                    centred
                }
            })
            .collect();

        Ok(scaled)
    }

    fn n_features(&self) -> usize {
        self.mean.len()
    }
}
