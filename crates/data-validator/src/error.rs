//! Validation Error Types

use thiserror::Error;

/// Errors during anomaly report validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field absent or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
