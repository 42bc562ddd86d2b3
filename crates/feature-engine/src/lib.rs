//! Feature Engineering Engine
//!
//! Turns anomaly records into fixed-width numeric matrices, either through
//! the encoders fitted alongside a trained model or through a hashing scheme
//! that needs no fitting.

mod bundle;
mod encoder;
mod features;
mod hashing;
mod vectorizer;

pub use bundle::EncoderBundle;
pub use encoder::LabelEncoder;
pub use features::{FeatureBuilder, FeatureMatrix};
pub use hashing::{stable_hash, HASHED_CATEGORICAL_COLUMNS, TEXT_HASH_RANGE};
pub use vectorizer::TextVectorizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors during feature preparation
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid encoder bundle: {0}")]
    InvalidBundle(String),
    #[error("Feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Settings for the hashing feature scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Modulus applied to hashed identifier and system values
    pub hash_range: u32,
    /// Number of positional text slots
    pub text_slots: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            hash_range: 1000,
            text_slots: 100,
        }
    }
}

impl FeatureConfig {
    /// Width of a matrix produced by the hashing scheme
    pub fn hashed_width(&self) -> usize {
        HASHED_CATEGORICAL_COLUMNS + self.text_slots
    }
}
