//! Anomaly Scoring Core Types
//!
//! Provides the anomaly record, the four-part risk score and the score normalizer.

mod record;
mod score;

pub use record::{AnomalyRecord, UNKNOWN_VALUE};
pub use score::{ScoreNormalizer, ScoreResult, CRITICALITY_RANGE, SCORE_RANGE};

use thiserror::Error;

/// Errors while turning raw model output into scores
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("Raw score {0} is not a finite number")]
    NonFinite(f64),
}
