use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{InferenceError, Result};

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let raw = fs::read_to_string(path).map_err(|source| InferenceError::Io {
        path: display.clone(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| InferenceError::Json {
        path: display,
        source,
    })
}
