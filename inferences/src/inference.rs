use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::error::{InferenceError, Result};
use crate::explainer::TreeExplainer;
use crate::forest::RandomForest;
use crate::scaler::StandardScaler;
use crate::traits::{AttributionEngine, Classifier, FeatureScaler};
use crate::types::{ModelInput, ModelOutput, ABNORMAL_CLASS, FEATURE_COUNT};

/// Scaler, classifier and explainer loaded once and shared between requests.
pub struct InferenceModel {
    scaler: Arc<dyn FeatureScaler + Send + Sync>,
    classifier: Arc<dyn Classifier + Send + Sync>,
    explainer: Arc<dyn AttributionEngine + Send + Sync>,
    info: ModelInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub classifier: String,
    pub n_features: usize,
    pub n_trees: Option<usize>,
}

impl InferenceModel {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, scaler_path: Q) -> Result<Self> {
        let scaler = StandardScaler::load(&scaler_path)?;
        let forest = Arc::new(RandomForest::load(&model_path)?);

        if scaler.n_features() != forest.n_features {
            return Err(InferenceError::InvalidArtifact(format!(
                "scaler was fitted on {} features but the model expects {}",
                scaler.n_features(),
                forest.n_features
            )));
        }

        info!(
            "Loaded model {} ({} trees) and scaler {}",
            model_path.as_ref().display(),
            forest.trees.len(),
            scaler_path.as_ref().display()
        );

        let n_trees = forest.trees.len();
        let explainer = TreeExplainer::new(Arc::clone(&forest));
        let mut model = Self::from_parts(Arc::new(scaler), forest, Arc::new(explainer));
        model.info.n_trees = Some(n_trees);
        Ok(model)
    }

    pub fn from_parts(
        scaler: Arc<dyn FeatureScaler + Send + Sync>,
        classifier: Arc<dyn Classifier + Send + Sync>,
        explainer: Arc<dyn AttributionEngine + Send + Sync>,
    ) -> Self {
        let info = ModelInfo {
            classifier: classifier.name().to_string(),
            n_features: classifier.n_features(),
            n_trees: None,
        };
        InferenceModel {
            scaler,
            classifier,
            explainer,
            info,
        }
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn predict(&self, input: &ModelInput) -> Result<ModelOutput> {
        if input.features.len() != FEATURE_COUNT {
            return Err(InferenceError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: input.features.len(),
            });
        }

        let scaled = self.scaler.transform(&input.features)?;
        let prediction = self.classifier.predict(scaled.view())?;
        let probabilities = self.classifier.predict_proba(scaled.view())?;
        let attributions = self
            .explainer
            .compute_attributions(scaled.view(), ABNORMAL_CLASS)?;

        debug!(
            "prediction={} probabilities={:?}",
            prediction,
            probabilities.as_slice()
        );

        Ok(ModelOutput {
            prediction,
            probabilities: probabilities.to_vec(),
            attributions: attributions.to_vec(),
        })
    }
}
