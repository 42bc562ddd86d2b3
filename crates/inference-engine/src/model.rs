//! Predictive Model Capability

use crate::InferenceError;
use ndarray::{Array2, ArrayView2};

/// Raw estimator output
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// One vector per input row
    Rows(Vec<Vec<f64>>),
    /// A single flat vector
    Flat(Vec<f64>),
}

impl ModelOutput {
    /// Wrap a dense `(rows, outputs)` matrix
    pub fn from_matrix(matrix: Array2<f64>) -> Self {
        ModelOutput::Rows(matrix.rows().into_iter().map(|row| row.to_vec()).collect())
    }
}

/// An estimator that scores a feature matrix
///
/// Implementations are shared read-only across threads for the process
/// lifetime, so `predict` takes `&self`.
pub trait PredictiveModel: Send + Sync {
    /// Short estimator kind used in diagnostics
    fn kind(&self) -> &str;

    /// Feature width the estimator expects, when it declares one
    fn input_width(&self) -> Option<usize>;

    /// Checked when the artifact is loaded and again before every call
    fn check_ready(&self) -> Result<(), InferenceError> {
        Ok(())
    }

    /// Predict one output vector per feature row
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<ModelOutput, InferenceError>;
}

/// Reject a matrix whose width differs from the estimator's
pub(crate) fn check_width(expected: usize, features: &ArrayView2<'_, f64>) -> Result<(), InferenceError> {
    if features.ncols() != expected {
        return Err(InferenceError::InvalidInputShape {
            expected: format!("(_, {})", expected),
            actual: format!("{:?}", features.dim()),
        });
    }
    Ok(())
}
