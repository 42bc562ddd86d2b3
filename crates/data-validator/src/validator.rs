//! Anomaly Report Validator

use crate::error::ValidationError;
use anomaly_core::AnomalyRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single cell of an uploaded report
///
/// Spreadsheet exports often carry identifiers as numbers, so cells are
/// accepted in any scalar form and rendered to text during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl RawField {
    /// Render the cell as trimmed text; blank cells and NaN yield `None`
    fn to_clean_text(&self) -> Option<String> {
        let text = match self {
            RawField::Text(s) => s.trim().to_string(),
            RawField::Integer(v) => v.to_string(),
            RawField::Float(v) if v.is_nan() => return None,
            RawField::Float(v) => v.to_string(),
            RawField::Bool(v) => v.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

/// Unvalidated anomaly report as received from an upload or request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnomaly {
    #[serde(default)]
    pub num_equipement: Option<RawField>,
    #[serde(default)]
    pub systeme: Option<RawField>,
    #[serde(default)]
    pub description: Option<RawField>,
    #[serde(default)]
    pub date_detection: Option<RawField>,
    #[serde(default)]
    pub description_equipement: Option<RawField>,
    #[serde(default)]
    pub section_proprietaire: Option<RawField>,
}

/// Validator for raw anomaly reports
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate one report, trimming every field
    ///
    /// `num_equipement`, `systeme` and `description` must be present and
    /// non-blank. Blank optional fields become `None`.
    pub fn validate(&self, raw: &RawAnomaly) -> Result<AnomalyRecord, ValidationError> {
        let equipment_id = required("num_equipement", &raw.num_equipement)?;
        let system = required("systeme", &raw.systeme)?;
        let description = required("description", &raw.description)?;

        Ok(AnomalyRecord {
            equipment_id,
            system,
            description,
            detection_date: optional(&raw.date_detection),
            equipment_description: optional(&raw.description_equipement),
            owner_section: optional(&raw.section_proprietaire),
        })
    }

    /// Validate reports in order, one result per input
    pub fn validate_batch(&self, raws: &[RawAnomaly]) -> Vec<Result<AnomalyRecord, ValidationError>> {
        raws.iter()
            .enumerate()
            .map(|(i, raw)| {
                let result = self.validate(raw);
                if let Err(e) = &result {
                    debug!("Row {} rejected: {}", i, e);
                }
                result
            })
            .collect()
    }
}

fn required(field: &'static str, value: &Option<RawField>) -> Result<String, ValidationError> {
    value
        .as_ref()
        .and_then(RawField::to_clean_text)
        .ok_or(ValidationError::MissingField(field))
}

fn optional(value: &Option<RawField>) -> Option<String> {
    value.as_ref().and_then(RawField::to_clean_text)
}
