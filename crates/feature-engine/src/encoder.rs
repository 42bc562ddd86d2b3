//! Fitted Label Encoder

use crate::FeatureError;
use serde::Deserialize;
use std::collections::HashMap;

/// Code assigned to categories the encoder never saw during fitting
pub const UNSEEN_CATEGORY_CODE: usize = 0;

/// Maps category strings to the integer codes used at training time
///
/// A category's code is its position in `classes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LabelEncoderRepr")]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct LabelEncoderRepr {
    classes: Vec<String>,
}

impl TryFrom<LabelEncoderRepr> for LabelEncoder {
    type Error = FeatureError;

    fn try_from(repr: LabelEncoderRepr) -> Result<Self, Self::Error> {
        Self::from_classes(repr.classes)
    }
}

impl LabelEncoder {
    /// Build an encoder from its fitted classes
    pub fn from_classes<I, S>(classes: I) -> Result<Self, FeatureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code).is_some() {
                return Err(FeatureError::InvalidBundle(format!(
                    "duplicate encoder class '{}'",
                    class
                )));
            }
        }
        Ok(Self { classes, codes })
    }

    /// Code of a known category
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    /// Code of a category, or [`UNSEEN_CATEGORY_CODE`] when unknown
    pub fn encode_or_default(&self, value: &str) -> usize {
        self.encode(value).unwrap_or(UNSEEN_CATEGORY_CODE)
    }

    pub fn is_known(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
