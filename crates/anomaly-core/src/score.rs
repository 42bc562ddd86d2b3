//! Risk Scores and Score Normalization

use crate::ScoreError;
use serde::{Deserialize, Serialize};

/// Valid range of each component score
pub const SCORE_RANGE: (u8, u8) = (1, 5);

/// Valid range of the criticality level
pub const CRITICALITY_RANGE: (u8, u8) = (3, 15);

/// Four-part risk score of an anomaly
///
/// `criticality` is always the sum of the three component scores. The only
/// way to build a value is through [`ScoreResult::new`] (or deserialization,
/// which checks the same invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ScoreRepr")]
pub struct ScoreResult {
    #[serde(rename = "ai_fiabilite_integrite_score")]
    reliability: u8,
    #[serde(rename = "ai_disponibilite_score")]
    availability: u8,
    #[serde(rename = "ai_process_safety_score")]
    process_safety: u8,
    #[serde(rename = "ai_criticality_level")]
    criticality: u8,
}

impl ScoreResult {
    /// Build a score from its three components
    ///
    /// Components are clamped into [`SCORE_RANGE`] and the criticality level
    /// is computed as their sum.
    pub fn new(reliability: u8, availability: u8, process_safety: u8) -> Self {
        let reliability = ScoreNormalizer::clamp(reliability);
        let availability = ScoreNormalizer::clamp(availability);
        let process_safety = ScoreNormalizer::clamp(process_safety);

        Self {
            reliability,
            availability,
            process_safety,
            criticality: reliability + availability + process_safety,
        }
    }

    /// Reliability-integrity score (1-5)
    pub fn reliability(&self) -> u8 {
        self.reliability
    }

    /// Availability score (1-5)
    pub fn availability(&self) -> u8 {
        self.availability
    }

    /// Process-safety score (1-5)
    pub fn process_safety(&self) -> u8 {
        self.process_safety
    }

    /// Criticality level (3-15), the sum of the three scores
    pub fn criticality(&self) -> u8 {
        self.criticality
    }

    /// Components as `(reliability, availability, process_safety)`
    pub fn components(&self) -> (u8, u8, u8) {
        (self.reliability, self.availability, self.process_safety)
    }
}

#[derive(Deserialize)]
struct ScoreRepr {
    #[serde(rename = "ai_fiabilite_integrite_score")]
    reliability: u8,
    #[serde(rename = "ai_disponibilite_score")]
    availability: u8,
    #[serde(rename = "ai_process_safety_score")]
    process_safety: u8,
    #[serde(rename = "ai_criticality_level")]
    criticality: u8,
}

impl TryFrom<ScoreRepr> for ScoreResult {
    type Error = String;

    fn try_from(repr: ScoreRepr) -> Result<Self, Self::Error> {
        let in_range = |v: u8| (SCORE_RANGE.0..=SCORE_RANGE.1).contains(&v);
        if !(in_range(repr.reliability) && in_range(repr.availability) && in_range(repr.process_safety)) {
            return Err(format!(
                "component scores must be within [{}, {}]",
                SCORE_RANGE.0, SCORE_RANGE.1
            ));
        }

        let score = Self::new(repr.reliability, repr.availability, repr.process_safety);
        if score.criticality != repr.criticality {
            return Err(format!(
                "criticality {} does not match component sum {}",
                repr.criticality, score.criticality
            ));
        }
        Ok(score)
    }
}

/// Rounds and clamps raw numeric outputs into score ranges
pub struct ScoreNormalizer;

impl ScoreNormalizer {
    /// Round a raw model output to the nearest integer (ties to even) and
    /// clamp it into [`SCORE_RANGE`]
    pub fn normalize(raw: f64) -> Result<u8, ScoreError> {
        Self::round_into(raw, SCORE_RANGE)
    }

    /// Same as [`normalize`](Self::normalize) for a model-predicted
    /// criticality level, clamped into [`CRITICALITY_RANGE`]
    pub fn normalize_criticality(raw: f64) -> Result<u8, ScoreError> {
        Self::round_into(raw, CRITICALITY_RANGE)
    }

    /// Clamp an integer score into [`SCORE_RANGE`]
    pub fn clamp(score: u8) -> u8 {
        score.clamp(SCORE_RANGE.0, SCORE_RANGE.1)
    }

    fn round_into(raw: f64, (min, max): (u8, u8)) -> Result<u8, ScoreError> {
        if !raw.is_finite() {
            return Err(ScoreError::NonFinite(raw));
        }
        Ok(raw.round_ties_even().clamp(min as f64, max as f64) as u8)
    }
}
