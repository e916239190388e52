use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;
use usage_inference::InferenceModel;

use crate::config::Config;
use crate::models::AnalysisReport;

static MODEL: OnceCell<Arc<InferenceModel>> = OnceCell::new();

static ANALYSES: AtomicU64 = AtomicU64::new(0);
static ABNORMAL: AtomicU64 = AtomicU64::new(0);

/// Load the artifacts on first use and hand out the shared model afterwards.
pub fn get_model(config: &Config) -> Result<Arc<InferenceModel>> {
    MODEL
        .get_or_try_init(|| {
            InferenceModel::load(&config.model_path, &config.scaler_path)
                .map(Arc::new)
                .with_context(|| {
                    format!(
                        "Impossible to load model {} / scaler {}",
                        config.model_path.display(),
                        config.scaler_path.display()
                    )
                })
        })
        .map(Arc::clone)
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisStats {
    pub analyses: u64,
    pub abnormal: u64,
}

pub fn record(report: &AnalysisReport) {
    ANALYSES.fetch_add(1, Ordering::Relaxed);
    if report.abnormal {
        ABNORMAL.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn get_stats() -> AnalysisStats {
    AnalysisStats {
        analyses: ANALYSES.load(Ordering::Relaxed),
        abnormal: ABNORMAL.load(Ordering::Relaxed),
    }
}
