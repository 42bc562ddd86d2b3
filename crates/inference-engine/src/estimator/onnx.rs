//! ONNX Estimator executed with tract

use crate::model::{check_width, ModelOutput, PredictiveModel};
use crate::InferenceError;
use ndarray::ArrayView2;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::Factoid;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Artifact entry pointing at an ONNX file
#[derive(Debug, Clone, Deserialize)]
pub struct OnnxReference {
    /// Model file, relative to the artifact's directory
    pub path: PathBuf,
    /// Feature width; read from the model when absent
    #[serde(default)]
    pub input_width: Option<usize>,
}

/// ONNX estimator taking a `[1, width]` f32 input per row
pub struct OnnxModel {
    path: PathBuf,
    input_width: usize,
    plan: OnnxPlan,
}

impl OnnxModel {
    /// Load and optimize an ONNX model
    pub fn load(path: &Path, input_width: Option<usize>) -> Result<Self, InferenceError> {
        info!("Loading ONNX model from {}", path.display());

        let (plan, input_width) = Self::compile(path, input_width)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;

        info!("ONNX model loaded: input width {}", input_width);
        Ok(Self {
            path: path.to_path_buf(),
            input_width,
            plan,
        })
    }

    fn compile(path: &Path, input_width: Option<usize>) -> TractResult<(OnnxPlan, usize)> {
        let model = tract_onnx::onnx().model_for_path(path)?;
        let width = match input_width {
            Some(width) => width,
            None => Self::declared_width(&model)?,
        };

        // Batch dimension is usually symbolic; rows are run one at a time
        let model = model
            .with_input_fact(0, f32::fact([1, width]).into())?
            .into_optimized()?;
        let shape = model.input_fact(0)?.shape.as_concrete().map(<[usize]>::to_vec);
        let width = match shape.as_deref() {
            Some([1, width]) => *width,
            other => {
                return Err(TractError::msg(format!(
                    "expected a [1, width] input, found {:?}",
                    other
                )))
            }
        };

        Ok((model.into_runnable()?, width))
    }

    /// Feature width from the second dimension of the declared input
    fn declared_width(model: &InferenceModel) -> TractResult<usize> {
        let dim = model
            .input_fact(0)?
            .shape
            .dim(1)
            .and_then(|dim| dim.concretize())
            .and_then(|dim| dim.to_i64().ok())
            .and_then(|dim| usize::try_from(dim).ok());

        dim.ok_or_else(|| TractError::msg("input declares no concrete feature width"))
    }

    fn run_row(&self, row: &[f32]) -> TractResult<Vec<f64>> {
        let input = Tensor::from_shape(&[1, self.input_width], row)?;
        let outputs = self.plan.run(tvec!(input.into()))?;
        let Some(output) = outputs.first() else {
            return Err(TractError::msg("model produced no outputs"));
        };

        let output = output.cast_to::<f32>()?;
        Ok(output.as_slice::<f32>()?.iter().map(|v| *v as f64).collect())
    }
}

impl PredictiveModel for OnnxModel {
    fn kind(&self) -> &str {
        "onnx"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.input_width)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ModelOutput, InferenceError> {
        check_width(self.input_width, &features)?;

        let mut rows = Vec::with_capacity(features.nrows());
        for row in features.rows() {
            let values: Vec<f32> = row.iter().map(|v| *v as f32).collect();
            let output = self
                .run_row(&values)
                .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
            rows.push(output);
        }

        debug!("ONNX inference on {} rows ({})", rows.len(), self.path.display());
        Ok(ModelOutput::Rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// `Y = X·W + B` over a `[N, 3]` input with a symbolic batch dimension
    fn fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/linear_risk.onnx")
    }

    #[test]
    fn test_width_read_from_symbolic_input() {
        let model = OnnxModel::load(&fixture(), None).unwrap();
        assert_eq!(model.input_width(), Some(3));
        assert_eq!(model.kind(), "onnx");
    }

    #[test]
    fn test_predict_one_row_per_input() {
        let model = OnnxModel::load(&fixture(), Some(3)).unwrap();
        let features = array![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];

        let output = model.predict(features.view()).unwrap();
        assert_eq!(
            output,
            ModelOutput::Rows(vec![
                vec![3.0, 3.0, 4.0, 10.0],
                vec![2.0, 3.0, 4.0, 9.0],
                vec![3.0, 4.0, 5.0, 12.0],
            ])
        );
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = OnnxModel::load(&fixture(), None).unwrap();
        let features = array![[1.0, 2.0]];
        assert!(matches!(
            model.predict(features.view()),
            Err(InferenceError::InvalidInputShape { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = OnnxModel::load(Path::new("/nonexistent/model.onnx"), Some(102));
        assert!(matches!(result, Err(InferenceError::ModelLoadError(_))));
    }

    #[test]
    fn test_reference_deserialize() {
        let reference: OnnxReference =
            serde_json::from_str(r#"{"path": "risk.onnx", "input_width": 102}"#).unwrap();
        assert_eq!(reference.path, PathBuf::from("risk.onnx"));
        assert_eq!(reference.input_width, Some(102));
    }
}
