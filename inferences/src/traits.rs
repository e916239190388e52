//! Seams between the inference pipeline and the fitted artifacts.
//!
//! The dashboard only ever talks to these traits, so tests can swap the
//! JSON-backed implementations for small stubs.

use ndarray::{Array1, ArrayView1};

use crate::error::Result;

/// Feature normalisation fitted ahead of time.
pub trait FeatureScaler {
    /// Scale a raw feature vector.
    fn transform(&self, x: &[f64]) -> Result<Array1<f64>>;

    /// Number of features the scaler was fitted on.
    fn n_features(&self) -> usize;
}

/// Binary (or multi-class) classifier over scaled features.
pub trait Classifier {
    /// Most likely class for a single sample.
    fn predict(&self, x: ArrayView1<f64>) -> Result<usize>;

    /// Class probabilities for a single sample, summing to 1.
    fn predict_proba(&self, x: ArrayView1<f64>) -> Result<Array1<f64>>;

    fn n_features(&self) -> usize;

    fn name(&self) -> &str {
        "classifier"
    }
}

/// Per-feature contribution scores for a single prediction.
pub trait AttributionEngine {
    /// Attribution of each feature towards `class` for the sample `x`.
    fn compute_attributions(&self, x: ArrayView1<f64>, class: usize) -> Result<Array1<f64>>;
}
