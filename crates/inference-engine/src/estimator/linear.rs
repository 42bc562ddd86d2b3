//! Multi-output Linear Regressor

use crate::model::{check_width, ModelOutput, PredictiveModel};
use crate::InferenceError;
use ndarray::{Array1, Array2, ArrayView2};
use serde::Deserialize;

/// Linear model with one coefficient row per output
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LinearRepr")]
pub struct LinearRegressor {
    /// `(outputs, input_width)`
    weights: Array2<f64>,
    /// One intercept per output
    intercepts: Array1<f64>,
}

#[derive(Deserialize)]
struct LinearRepr {
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl TryFrom<LinearRepr> for LinearRegressor {
    type Error = InferenceError;

    fn try_from(repr: LinearRepr) -> Result<Self, Self::Error> {
        Self::new(repr.coefficients, repr.intercepts)
    }
}

impl LinearRegressor {
    /// Create a regressor from coefficient rows and intercepts
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Result<Self, InferenceError> {
        let outputs = coefficients.len();
        let width = coefficients.first().map_or(0, Vec::len);

        if outputs == 0 || width == 0 {
            return Err(InferenceError::Artifact("linear model has no coefficients".to_string()));
        }
        if intercepts.len() != outputs {
            return Err(InferenceError::Artifact(format!(
                "linear model has {} coefficient rows but {} intercepts",
                outputs,
                intercepts.len()
            )));
        }
        if coefficients.iter().any(|row| row.len() != width) {
            return Err(InferenceError::Artifact(
                "linear model coefficient rows differ in width".to_string(),
            ));
        }

        let flat: Vec<f64> = coefficients.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((outputs, width), flat)
            .map_err(|e| InferenceError::Artifact(e.to_string()))?;

        Ok(Self {
            weights,
            intercepts: Array1::from(intercepts),
        })
    }
}

impl PredictiveModel for LinearRegressor {
    fn kind(&self) -> &str {
        "linear"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.weights.ncols())
    }

    fn check_ready(&self) -> Result<(), InferenceError> {
        let finite = self.weights.iter().chain(self.intercepts.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(InferenceError::NotReady(
                "linear model has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ModelOutput, InferenceError> {
        check_width(self.weights.ncols(), &features)?;
        let mut output = features.dot(&self.weights.t());
        output += &self.intercepts;
        Ok(ModelOutput::from_matrix(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_predict() {
        let model = LinearRegressor::new(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        let features = array![[2.0, 4.0], [0.0, 0.0]];
        let output = model.predict(features.view()).unwrap();
        assert_eq!(
            output,
            ModelOutput::Rows(vec![vec![3.0, 6.0, 6.0], vec![1.0, 2.0, 3.0]])
        );
    }

    #[test]
    fn test_width_mismatch() {
        let model = LinearRegressor::new(vec![vec![1.0, 1.0, 1.0]], vec![0.0]).unwrap();
        let features = array![[1.0, 2.0]];
        assert!(matches!(
            model.predict(features.view()),
            Err(InferenceError::InvalidInputShape { .. })
        ));
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        assert!(LinearRegressor::new(vec![], vec![]).is_err());
        assert!(LinearRegressor::new(vec![vec![1.0], vec![1.0, 2.0]], vec![0.0, 0.0]).is_err());
        assert!(LinearRegressor::new(vec![vec![1.0]], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{"coefficients": [[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]], "intercepts": [1, 2, 3]}"#;
        let model: LinearRegressor = serde_json::from_str(json).unwrap();
        assert_eq!(model.input_width(), Some(2));
        assert!(model.check_ready().is_ok());
    }
}
