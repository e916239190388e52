use serde::{Deserialize, Serialize};

/// Number of features the abnormal usage model is trained on.
pub const FEATURE_COUNT: usize = 11;

/// Class index of abnormal usage in the classifier output.
pub const ABNORMAL_CLASS: usize = 1;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelInput {
    pub features: Vec<f64>, // 11 features, unscaled
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelOutput {
    /// Predicted class, `1` for abnormal usage.
    pub prediction: usize,
    /// Class probabilities indexed by class.
    pub probabilities: Vec<f64>,
    /// Per-feature attributions towards the abnormal class.
    pub attributions: Vec<f64>,
}

impl ModelOutput {
    pub fn is_abnormal(&self) -> bool {
        self.prediction == ABNORMAL_CLASS
    }

    pub fn probability(&self, class: usize) -> f64 {
        self.probabilities.get(class).copied().unwrap_or(0.0)
    }
}
