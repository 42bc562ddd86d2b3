//! Rule-Based Fallback Scorer
//!
//! Provides keyword and system-category heuristics when ML inference is
//! unavailable.

mod rules;

pub use rules::{
    KeywordTier, RuleScorer, SystemAdjustment, CRITICAL_KEYWORDS, LOW_KEYWORDS, MEDIUM_KEYWORDS,
};
