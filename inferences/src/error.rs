//! Error types for artifact loading and inference.

use thiserror::Error;

/// Errors raised while loading artifacts or running a prediction.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// An artifact file could not be read.
    #[error("failed to read artifact {path}: {source}")]
    Io {
        /// Path of the artifact.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An artifact file is not valid JSON for the expected layout.
    #[error("failed to parse artifact {path}: {source}")]
    Json {
        /// Path of the artifact.
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// An input vector does not have the dimension the artifact was fit on.
    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch {
        /// Dimension the artifact expects.
        expected: usize,
        /// Dimension that was provided.
        actual: usize,
    },

    /// The artifact parsed but its contents are inconsistent.
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
}

/// A specialized Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
