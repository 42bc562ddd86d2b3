//! Anomaly Record

use serde::{Deserialize, Serialize};

/// Placeholder substituted for absent field values before encoding
pub const UNKNOWN_VALUE: &str = "unknown";

/// A validated equipment anomaly report
///
/// Field names on the wire follow the maintenance application's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Equipment identifier (e.g. `EQ001`)
    #[serde(rename = "num_equipement")]
    pub equipment_id: String,
    /// System or category name (e.g. `Hydraulic`)
    #[serde(rename = "systeme")]
    pub system: String,
    /// Free-text description of the anomaly
    pub description: String,
    /// Detection date as reported (`YYYY-MM-DD`)
    #[serde(rename = "date_detection", default, skip_serializing_if = "Option::is_none")]
    pub detection_date: Option<String>,
    /// Description of the equipment itself
    #[serde(rename = "description_equipement", default, skip_serializing_if = "Option::is_none")]
    pub equipment_description: Option<String>,
    /// Owning section
    #[serde(rename = "section_proprietaire", default, skip_serializing_if = "Option::is_none")]
    pub owner_section: Option<String>,
}

impl AnomalyRecord {
    /// Create a record from the three required fields
    pub fn new(
        equipment_id: impl Into<String>,
        system: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            system: system.into(),
            description: description.into(),
            detection_date: None,
            equipment_description: None,
            owner_section: None,
        }
    }

    pub fn with_detection_date(mut self, date: impl Into<String>) -> Self {
        self.detection_date = Some(date.into());
        self
    }

    pub fn with_equipment_description(mut self, description: impl Into<String>) -> Self {
        self.equipment_description = Some(description.into());
        self
    }

    pub fn with_owner_section(mut self, section: impl Into<String>) -> Self {
        self.owner_section = Some(section.into());
        self
    }

    /// Named fields in column order, keyed by wire name
    ///
    /// Empty optional values are reported as absent.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("num_equipement", Some(self.equipment_id.as_str())),
            ("systeme", Some(self.system.as_str())),
            ("description", Some(self.description.as_str())),
            ("date_detection", non_empty(&self.detection_date)),
            ("description_equipement", non_empty(&self.equipment_description)),
            ("section_proprietaire", non_empty(&self.owner_section)),
        ]
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
