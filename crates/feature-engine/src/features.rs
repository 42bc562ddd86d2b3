//! Feature Matrix Assembly

use crate::bundle::EncoderBundle;
use crate::hashing::{hash_words, stable_hash};
use crate::{FeatureConfig, FeatureError};
use anomaly_core::{AnomalyRecord, UNKNOWN_VALUE};
use ndarray::Array2;
use std::sync::Arc;
use tracing::{debug, warn};

/// Numeric feature matrix, one row per record
pub type FeatureMatrix = Array2<f64>;

/// Record fields known under a training-time column name
const COLUMN_ALIASES: [(&str, &str); 4] = [
    ("num_equipement", "Num_equipement"),
    ("systeme", "Systeme"),
    ("description", "Description de l'équipement"),
    ("section_proprietaire", "Section propriétaire"),
];

/// Builds feature matrices for anomaly records
///
/// With a complete [`EncoderBundle`] the matrix reproduces the training-time
/// layout (one column per encoder, then the vectorizer's slots). Otherwise
/// the hashing layout is used: hashed identifier, hashed system, then
/// positional word hashes of the description.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    /// Hashing scheme settings
    config: FeatureConfig,
    /// Fitted encoders, shared read-only
    bundle: Option<Arc<EncoderBundle>>,
}

impl FeatureBuilder {
    /// Create a new feature builder
    pub fn new(config: FeatureConfig, bundle: Option<Arc<EncoderBundle>>) -> Self {
        if let Some(bundle) = &bundle {
            if !bundle.is_complete() {
                debug!("Encoder bundle incomplete, hashing features will be used");
            }
        }
        Self { config, bundle }
    }

    /// Whether matrices come from the fitted encoders
    pub fn uses_bundle(&self) -> bool {
        self.complete_bundle().is_some()
    }

    /// Column count of the matrices this builder produces
    pub fn width(&self) -> usize {
        match self.complete_bundle() {
            Some(bundle) => bundle.output_width(),
            None => self.config.hashed_width(),
        }
    }

    /// Build a feature matrix for the records
    ///
    /// Never fails: an encoding error falls back to hashing, and a hashing
    /// error to an all-zero matrix.
    pub fn build(&self, records: &[AnomalyRecord]) -> FeatureMatrix {
        debug!("Preparing features for {} records", records.len());

        if let Some(bundle) = self.complete_bundle() {
            match self.build_encoded(bundle, records) {
                Ok(matrix) => return matrix,
                Err(e) => warn!("Encoded feature preparation failed ({}), using hashing", e),
            }
        }

        match self.build_hashed(records) {
            Ok(matrix) => matrix,
            Err(e) => {
                warn!("Hashed feature preparation failed ({}), using zeros", e);
                Array2::zeros((records.len(), self.config.hashed_width()))
            }
        }
    }

    /// Build a single-row matrix
    pub fn build_one(&self, record: &AnomalyRecord) -> FeatureMatrix {
        self.build(std::slice::from_ref(record))
    }

    fn complete_bundle(&self) -> Option<&EncoderBundle> {
        self.bundle.as_deref().filter(|b| b.is_complete())
    }

    fn build_encoded(
        &self,
        bundle: &EncoderBundle,
        records: &[AnomalyRecord],
    ) -> Result<FeatureMatrix, FeatureError> {
        let width = bundle.output_width();
        let Some(vectorizer) = bundle.vectorizer() else {
            return Err(FeatureError::InvalidBundle("no vectorizer".to_string()));
        };

        // Field positions are the same for every record
        let field_names = field_names();
        let columns: Vec<Option<usize>> = bundle
            .encoders()
            .iter()
            .map(|(column, _)| {
                let position = locate_column(column, &field_names);
                if position.is_none() {
                    debug!("Column {} not found in records, using zeros", column);
                }
                position
            })
            .collect();

        let mut data = Vec::with_capacity(records.len() * width);
        let mut unseen = 0usize;

        for record in records {
            let fields = record.fields();

            for ((column, encoder), position) in bundle.encoders().iter().zip(&columns) {
                let Some(position) = position else {
                    data.push(0.0);
                    continue;
                };
                let value = fields[*position].1.unwrap_or(UNKNOWN_VALUE);
                let code = match encoder.encode(value) {
                    Some(code) => code,
                    None => {
                        debug!("Unseen category '{}' for column {}, using default", value, column);
                        unseen += 1;
                        encoder.encode_or_default(value)
                    }
                };
                data.push(code as f64);
            }

            match description_text(&fields) {
                Some(text) => data.extend(vectorizer.transform(text)),
                None => {
                    debug!("No description field, using zeros for text features");
                    data.extend(std::iter::repeat(0.0).take(vectorizer.width()));
                }
            }
        }

        if unseen > 0 {
            debug!("{} unseen categories encoded with the default code", unseen);
        }

        let matrix = Array2::from_shape_vec((records.len(), width), data)?;
        debug!("Encoded features shape: {:?}", matrix.dim());
        Ok(matrix)
    }

    fn build_hashed(&self, records: &[AnomalyRecord]) -> Result<FeatureMatrix, FeatureError> {
        let width = self.config.hashed_width();
        let mut data = Vec::with_capacity(records.len() * width);

        for record in records {
            data.push(stable_hash(&record.equipment_id, self.config.hash_range) as f64);
            data.push(stable_hash(&record.system, self.config.hash_range) as f64);
            data.extend(hash_words(&record.description, self.config.text_slots));
        }

        let matrix = Array2::from_shape_vec((records.len(), width), data)?;
        debug!("Hashed features shape: {:?}", matrix.dim());
        Ok(matrix)
    }
}

fn field_names() -> Vec<&'static str> {
    // Names do not depend on the record contents
    AnomalyRecord::new("", "", "")
        .fields()
        .iter()
        .map(|(name, _)| *name)
        .collect()
}

/// Position of the record field feeding a training-time column
fn locate_column(column: &str, field_names: &[&str]) -> Option<usize> {
    let wanted = column.to_lowercase();
    field_names.iter().position(|name| {
        name.to_lowercase() == wanted
            || COLUMN_ALIASES
                .iter()
                .any(|(field, alias)| field == name && *alias == column)
    })
}

/// First description-like field carrying a value
fn description_text<'a>(fields: &[(&'static str, Option<&'a str>)]) -> Option<&'a str> {
    fields
        .iter()
        .filter(|(name, _)| name.contains("desc"))
        .find_map(|(_, value)| (*value).filter(|v| !v.is_empty()))
}
