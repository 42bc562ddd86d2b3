//! Anomaly Risk Inference Engine
//!
//! Loads a persisted estimator once at start-up and scores anomaly records
//! with it, falling back to rule-based scoring whenever the model path cannot
//! produce a well-formed result.

mod config;
mod engine;
pub mod estimator;
mod loader;
mod model;

pub use config::EngineConfig;
pub use engine::{EngineStatus, FallbackReason, PredictionEngine, PredictionOutcome};
pub use loader::{ExtractionStrategy, LoadOutcome, ModelLoader, MODEL_KEYS};
pub use model::{ModelOutput, PredictiveModel};

use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid model artifact: {0}")]
    Artifact(String),
    #[error("Model not ready: {0}")]
    NotReady(String),
}
