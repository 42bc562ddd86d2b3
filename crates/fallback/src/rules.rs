//! Keyword and System Rules

use anomaly_core::{AnomalyRecord, ScoreResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Description keywords that escalate to the critical tier
pub const CRITICAL_KEYWORDS: [&str; 7] = [
    "failure",
    "broken",
    "leak",
    "fire",
    "explosion",
    "pressure",
    "overheat",
];

/// Description keywords that keep the medium tier
pub const MEDIUM_KEYWORDS: [&str; 5] = ["wear", "drift", "irregularities", "drop", "issue"];

/// Description keywords that lower to the low tier
pub const LOW_KEYWORDS: [&str; 3] = ["calibration", "maintenance", "check"];

/// Severity tier selected from the description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordTier {
    Critical,
    Medium,
    Low,
}

impl KeywordTier {
    /// Classify a description; the first matching tier wins
    ///
    /// Tiers are checked critical, medium, low. Matching is by substring on
    /// the lower-cased text.
    pub fn classify(description: &str) -> Option<Self> {
        let text = description.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if contains_any(&CRITICAL_KEYWORDS[..]) {
            Some(KeywordTier::Critical)
        } else if contains_any(&MEDIUM_KEYWORDS[..]) {
            Some(KeywordTier::Medium)
        } else if contains_any(&LOW_KEYWORDS[..]) {
            Some(KeywordTier::Low)
        } else {
            None
        }
    }

    /// Base `(reliability, availability, process_safety)` for the tier
    pub fn base_scores(&self) -> (u8, u8, u8) {
        match self {
            KeywordTier::Critical => (4, 4, 5),
            KeywordTier::Medium => (3, 3, 3),
            KeywordTier::Low => (2, 2, 2),
        }
    }
}

/// Score bump selected from the system category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemAdjustment {
    /// Electrical systems raise process safety
    ProcessSafety,
    /// Hydraulic and pneumatic systems raise availability
    Availability,
}

impl SystemAdjustment {
    pub fn classify(system: &str) -> Option<Self> {
        let system = system.to_lowercase();
        if system.contains("electrical") {
            Some(SystemAdjustment::ProcessSafety)
        } else if system.contains("hydraulic") || system.contains("pneumatic") {
            Some(SystemAdjustment::Availability)
        } else {
            None
        }
    }
}

/// Deterministic heuristic scorer, always available
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl RuleScorer {
    /// Score used when no keyword matches
    const DEFAULT_SCORES: (u8, u8, u8) = (3, 3, 3);

    pub fn new() -> Self {
        Self
    }

    /// Score an anomaly record
    pub fn score(&self, record: &AnomalyRecord) -> ScoreResult {
        let tier = KeywordTier::classify(&record.description);
        let (reliability, mut availability, mut process_safety) =
            tier.map_or(Self::DEFAULT_SCORES, |t| t.base_scores());

        let adjustment = SystemAdjustment::classify(&record.system);
        match adjustment {
            Some(SystemAdjustment::ProcessSafety) => process_safety = (process_safety + 1).min(5),
            Some(SystemAdjustment::Availability) => availability = (availability + 1).min(5),
            None => {}
        }

        let score = ScoreResult::new(reliability, availability, process_safety);
        debug!(
            "Rule score for {}: tier={:?}, adjustment={:?}, scores={:?}, criticality={}",
            record.equipment_id,
            tier,
            adjustment,
            score.components(),
            score.criticality()
        );
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn score(system: &str, description: &str) -> ScoreResult {
        RuleScorer::new().score(&AnomalyRecord::new("EQ001", system, description))
    }

    #[test]
    fn test_hydraulic_pressure_drop() {
        let result = score("Hydraulic", "Pressure drop detected in main valve");
        assert_eq!(result.components(), (4, 5, 5));
        assert_eq!(result.criticality(), 14);
    }

    #[test]
    fn test_critical_beats_low() {
        assert_eq!(
            KeywordTier::classify("Leak found during routine calibration"),
            Some(KeywordTier::Critical)
        );
        assert_eq!(score("Steam", "Leak found during calibration").components(), (4, 4, 5));
    }

    #[test]
    fn test_medium_beats_low() {
        assert_eq!(
            KeywordTier::classify("Bearing wear noted at maintenance"),
            Some(KeywordTier::Medium)
        );
    }

    #[test]
    fn test_low_tier() {
        assert_eq!(score("Steam", "Scheduled calibration").components(), (2, 2, 2));
    }

    #[test]
    fn test_no_keyword_defaults_to_medium() {
        let result = score("Steam", "Unusual noise");
        assert_eq!(result.components(), (3, 3, 3));
        assert_eq!(result.criticality(), 9);
    }

    #[test]
    fn test_electrical_cap() {
        // Process safety starts at 5 for critical descriptions
        let result = score("Electrical", "Cable FIRE");
        assert_eq!(result.components(), (4, 4, 5));
        assert_eq!(result.criticality(), 13);

        assert_eq!(score("Electrical", "Unusual noise").components(), (3, 3, 4));
    }

    #[test]
    fn test_electrical_wins_over_hydraulic() {
        assert_eq!(
            SystemAdjustment::classify("Electrical/Hydraulic"),
            Some(SystemAdjustment::ProcessSafety)
        );
        assert_eq!(
            SystemAdjustment::classify("PNEUMATIC lines"),
            Some(SystemAdjustment::Availability)
        );
        assert_eq!(SystemAdjustment::classify("Steam"), None);
    }

    #[test]
    fn test_substring_matching() {
        // "overpressure" contains "pressure"
        assert_eq!(KeywordTier::classify("Overpressure alarm"), Some(KeywordTier::Critical));
    }

    proptest! {
        #[test]
        fn prop_scores_bounded(system in ".{0,24}", description in ".{0,80}") {
            let result = score(&system, &description);
            let (r, a, p) = result.components();
            prop_assert!((1..=5).contains(&r));
            prop_assert!((1..=5).contains(&a));
            prop_assert!((1..=5).contains(&p));
            prop_assert_eq!(result.criticality(), r + a + p);
            prop_assert!((6..=14).contains(&result.criticality()));
        }

        #[test]
        fn prop_deterministic(system in ".{0,24}", description in ".{0,80}") {
            prop_assert_eq!(score(&system, &description), score(&system, &description));
        }
    }
}
