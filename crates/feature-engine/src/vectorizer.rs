//! Fitted Term-Frequency Vectorizer

use crate::FeatureError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Tokens are runs of two or more word characters
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w\w+\b").expect("token pattern is valid")
});

/// Counts vocabulary terms into fixed feature slots
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "VectorizerRepr")]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    width: usize,
    lowercase: bool,
}

#[derive(Deserialize)]
struct VectorizerRepr {
    vocabulary: HashMap<String, usize>,
    #[serde(default)]
    width: Option<usize>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
}

fn default_lowercase() -> bool {
    true
}

impl TryFrom<VectorizerRepr> for TextVectorizer {
    type Error = FeatureError;

    fn try_from(repr: VectorizerRepr) -> Result<Self, Self::Error> {
        let mut vectorizer = Self::new(repr.vocabulary, repr.width)?;
        vectorizer.lowercase = repr.lowercase;
        Ok(vectorizer)
    }
}

impl TextVectorizer {
    /// Create a vectorizer from a fitted vocabulary
    ///
    /// Without an explicit `width`, the output is one slot past the highest
    /// vocabulary slot.
    pub fn new(vocabulary: HashMap<String, usize>, width: Option<usize>) -> Result<Self, FeatureError> {
        let needed = vocabulary.values().max().map_or(0, |max| max + 1);
        let width = width.unwrap_or(needed);
        if needed > width {
            return Err(FeatureError::InvalidBundle(format!(
                "vocabulary slot {} exceeds vectorizer width {}",
                needed - 1,
                width
            )));
        }

        Ok(Self {
            vocabulary,
            width,
            lowercase: true,
        })
    }

    /// Number of output slots
    pub fn width(&self) -> usize {
        self.width
    }

    /// Term counts for one document
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.width];
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        for token in TOKEN_PATTERN.find_iter(&text) {
            if let Some(&slot) = self.vocabulary.get(token.as_str()) {
                row[slot] += 1.0;
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> HashMap<String, usize> {
        [("pressure", 0), ("drop", 1), ("valve", 2), ("main", 3)]
            .into_iter()
            .map(|(term, slot)| (term.to_string(), slot))
            .collect()
    }

    #[test]
    fn test_transform_counts_terms() {
        let vectorizer = TextVectorizer::new(vocabulary(), Some(6)).unwrap();
        let row = vectorizer.transform("Pressure drop, pressure DROP in main valve!");

        assert_eq!(row.len(), 6);
        assert_eq!(row, vec![2.0, 2.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_character_tokens_ignored() {
        let vocab = [("a".to_string(), 0), ("leak".to_string(), 1)].into_iter().collect();
        let vectorizer = TextVectorizer::new(vocab, None).unwrap();
        assert_eq!(vectorizer.transform("a leak"), vec![0.0, 1.0]);
    }

    #[test]
    fn test_width_inferred_and_checked() {
        let vectorizer = TextVectorizer::new(vocabulary(), None).unwrap();
        assert_eq!(vectorizer.width(), 4);
        assert!(TextVectorizer::new(vocabulary(), Some(3)).is_err());
    }

    #[test]
    fn test_deserialize_with_width() {
        let json = r#"{"vocabulary": {"leak": 0, "fire": 1}, "width": 100}"#;
        let vectorizer: TextVectorizer = serde_json::from_str(json).unwrap();
        assert_eq!(vectorizer.width(), 100);
        assert_eq!(vectorizer.transform("Fire")[1], 1.0);
    }
}
