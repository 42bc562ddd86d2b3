//! Encoder Bundle persisted alongside a trained model

use crate::encoder::LabelEncoder;
use crate::vectorizer::TextVectorizer;
use crate::FeatureError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Label encoders and text vectorizer that reproduce a model's training-time
/// feature layout
///
/// Encoders keep their artifact order; that order is the column order of the
/// encoded matrix.
#[derive(Debug, Clone, Default)]
pub struct EncoderBundle {
    encoders: Vec<(String, LabelEncoder)>,
    vectorizer: Option<TextVectorizer>,
    target_columns: Vec<String>,
    categorical_columns: Vec<String>,
}

impl EncoderBundle {
    /// Create a bundle from already-fitted parts
    pub fn new(encoders: Vec<(String, LabelEncoder)>, vectorizer: Option<TextVectorizer>) -> Self {
        Self {
            encoders,
            vectorizer,
            ..Default::default()
        }
    }

    /// Read the bundle members of an artifact mapping
    ///
    /// Returns `Ok(None)` when the mapping carries neither `label_encoders`
    /// nor `vectorizer`.
    pub fn from_artifact(artifact: &Map<String, Value>) -> Result<Option<Self>, FeatureError> {
        let raw_encoders = artifact.get("label_encoders").filter(|v| !v.is_null());
        let raw_vectorizer = artifact.get("vectorizer").filter(|v| !v.is_null());
        if raw_encoders.is_none() && raw_vectorizer.is_none() {
            return Ok(None);
        }

        let mut encoders = match raw_encoders {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(column, value)| {
                    let encoder = serde_json::from_value::<LabelEncoder>(value.clone()).map_err(|e| {
                        FeatureError::InvalidBundle(format!("label encoder '{}': {}", column, e))
                    })?;
                    Ok((column.clone(), encoder))
                })
                .collect::<Result<Vec<_>, FeatureError>>()?,
            Some(other) => {
                return Err(FeatureError::InvalidBundle(format!(
                    "label_encoders must be a mapping, found {}",
                    json_kind(other)
                )))
            }
            None => Vec::new(),
        };

        let vectorizer = raw_vectorizer
            .map(|value| {
                serde_json::from_value::<TextVectorizer>(value.clone())
                    .map_err(|e| FeatureError::InvalidBundle(format!("vectorizer: {}", e)))
            })
            .transpose()?;

        let target_columns = string_list(artifact, "target_columns")?;
        let categorical_columns = string_list(artifact, "categorical_columns")?;
        if !categorical_columns.is_empty() {
            order_by_columns(&mut encoders, &categorical_columns);
        }

        debug!(
            "Read encoder bundle: encoders={}, vectorizer={}, targets={:?}",
            encoders.len(),
            vectorizer.is_some(),
            target_columns
        );

        Ok(Some(Self {
            encoders,
            vectorizer,
            target_columns,
            categorical_columns,
        }))
    }

    /// Whether the bundle can drive feature preparation on its own
    ///
    /// Both at least one encoder and a vectorizer are required.
    pub fn is_complete(&self) -> bool {
        !self.encoders.is_empty() && self.vectorizer.is_some()
    }

    /// Width of a matrix encoded with this bundle
    pub fn output_width(&self) -> usize {
        self.encoders.len() + self.vectorizer.as_ref().map_or(0, TextVectorizer::width)
    }

    pub fn encoders(&self) -> &[(String, LabelEncoder)] {
        &self.encoders
    }

    pub fn vectorizer(&self) -> Option<&TextVectorizer> {
        self.vectorizer.as_ref()
    }

    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }
}

fn string_list(artifact: &Map<String, Value>, key: &str) -> Result<Vec<String>, FeatureError> {
    match artifact.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| FeatureError::InvalidBundle(format!("{}: {}", key, e))),
    }
}

/// Move encoders named in `columns` to the front, in that order
fn order_by_columns(encoders: &mut Vec<(String, LabelEncoder)>, columns: &[String]) {
    let mut ordered = Vec::with_capacity(encoders.len());
    for column in columns {
        match encoders.iter().position(|(name, _)| name == column) {
            Some(idx) => ordered.push(encoders.remove(idx)),
            None => warn!("Categorical column '{}' has no fitted encoder", column),
        }
    }
    ordered.append(encoders);
    *encoders = ordered;
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test artifact must be a mapping"),
        }
    }

    #[test]
    fn test_no_bundle_members() {
        let map = artifact(json!({ "model": { "type": "linear" } }));
        assert!(EncoderBundle::from_artifact(&map).unwrap().is_none());
    }

    #[test]
    fn test_reads_encoders_in_document_order() {
        let map = artifact(json!({
            "label_encoders": {
                "Systeme": { "classes": ["Electrical", "Hydraulic"] },
                "Num_equipement": { "classes": ["EQ001"] }
            },
            "vectorizer": { "vocabulary": { "leak": 0, "valve": 1 } },
            "target_columns": ["Fiabilité Intégrité", "Disponibilté", "Process Safety", "Criticité"]
        }));

        let bundle = EncoderBundle::from_artifact(&map).unwrap().unwrap();
        let names: Vec<_> = bundle.encoders().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Systeme", "Num_equipement"]);
        assert!(bundle.is_complete());
        assert_eq!(bundle.output_width(), 4);
        assert_eq!(bundle.target_columns().len(), 4);
    }

    #[test]
    fn test_categorical_columns_set_order() {
        let map = artifact(json!({
            "label_encoders": {
                "Systeme": { "classes": ["Hydraulic"] },
                "Num_equipement": { "classes": ["EQ001"] }
            },
            "categorical_columns": ["Num_equipement", "Systeme"]
        }));

        let bundle = EncoderBundle::from_artifact(&map).unwrap().unwrap();
        assert_eq!(bundle.encoders()[0].0, "Num_equipement");
        assert_eq!(bundle.encoders()[1].0, "Systeme");
        // No vectorizer
        assert!(!bundle.is_complete());
    }

    #[test]
    fn test_malformed_members_rejected() {
        let map = artifact(json!({ "label_encoders": ["Systeme"] }));
        assert!(EncoderBundle::from_artifact(&map).is_err());

        let map = artifact(json!({ "vectorizer": { "vocabulary": { "leak": 5 }, "width": 2 } }));
        assert!(EncoderBundle::from_artifact(&map).is_err());
    }
}
