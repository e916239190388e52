//! Inference side of the abnormal electricity usage dashboard.
//!
//! Loads the exported scaler and random forest artifacts, classifies a
//! household feature vector and attributes the abnormal-class probability
//! to the individual features with TreeSHAP.

pub mod artifact;
pub mod error;
pub mod explainer;
pub mod forest;
pub mod inference;
pub mod scaler;
pub mod traits;
pub mod types;

pub use error::{InferenceError, Result};
pub use explainer::TreeExplainer;
pub use forest::{RandomForest, Tree};
pub use inference::{InferenceModel, ModelInfo};
pub use scaler::StandardScaler;
pub use traits::{AttributionEngine, Classifier, FeatureScaler};
pub use types::{ModelInput, ModelOutput, ABNORMAL_CLASS, FEATURE_COUNT};
