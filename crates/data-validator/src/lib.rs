//! Anomaly Report Validation
//!
//! Checks required fields and cleans raw anomaly reports before they reach
//! the scoring engine.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{RawAnomaly, RawField, Validator};
