//! Engine Configuration

use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the persisted model artifact
pub const DEFAULT_MODEL_PATH: &str = "ml_models/multi_output_model.json";

/// Prediction engine configuration, resolved once at start-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the model artifact; a missing file means rule-based scoring only
    pub model_path: PathBuf,
    /// Whether the statistical path may be used at all
    pub model_enabled: bool,
    /// Hashing feature scheme settings
    pub features: FeatureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            model_enabled: true,
            features: FeatureConfig::default(),
        }
    }
}
