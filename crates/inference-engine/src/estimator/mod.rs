//! Estimator Adapters
//!
//! Concrete [`PredictiveModel`] implementations and the artifact entries
//! that describe them.

mod forest;
mod linear;
mod onnx;

pub use forest::{ForestRegressor, RegressionTree};
pub use linear::LinearRegressor;
pub use onnx::{OnnxModel, OnnxReference};

use crate::model::PredictiveModel;
use crate::InferenceError;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Field naming an estimator's kind inside an artifact mapping
pub const KIND_TAG: &str = "type";

/// Artifact entry describing an estimator
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Linear(LinearRegressor),
    Forest(ForestRegressor),
    Onnx(OnnxReference),
}

impl EstimatorSpec {
    /// Build the estimator; relative ONNX paths resolve against `base_dir`
    pub fn instantiate(self, base_dir: &Path) -> Result<Arc<dyn PredictiveModel>, InferenceError> {
        Ok(match self {
            EstimatorSpec::Linear(model) => Arc::new(model),
            EstimatorSpec::Forest(model) => Arc::new(model),
            EstimatorSpec::Onnx(reference) => {
                let path = base_dir.join(&reference.path);
                Arc::new(OnnxModel::load(&path, reference.input_width)?)
            }
        })
    }
}
