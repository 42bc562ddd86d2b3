//! Prediction Engine Implementation

use crate::config::EngineConfig;
use crate::loader::{LoadOutcome, ModelLoader};
use crate::model::{ModelOutput, PredictiveModel};
use anomaly_core::{AnomalyRecord, ScoreNormalizer, ScoreResult};
use fallback::RuleScorer;
use feature_engine::FeatureBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Why a record was scored by the rules instead of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No model was loaded at start-up
    ModelUnavailable,
    /// The model path is switched off in configuration
    ModelDisabled,
    /// The model failed its readiness check at call time
    ModelNotReady,
    /// The estimator returned an error for the batch
    PredictionFailed,
    /// The output for this record had an unusable shape
    UnexpectedShape,
    /// The output for this record held NaN or infinite scores
    NonFiniteOutput,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::ModelUnavailable => "model_unavailable",
            FallbackReason::ModelDisabled => "model_disabled",
            FallbackReason::ModelNotReady => "model_not_ready",
            FallbackReason::PredictionFailed => "prediction_failed",
            FallbackReason::UnexpectedShape => "unexpected_shape",
            FallbackReason::NonFiniteOutput => "non_finite_output",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score of one record together with the path that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// Scored by the model
    ModelScored {
        score: ScoreResult,
        /// Criticality the model predicted itself; reported but never used
        model_criticality: Option<u8>,
    },
    /// Scored by the keyword rules
    RuleScored {
        score: ScoreResult,
        reason: FallbackReason,
    },
}

impl PredictionOutcome {
    pub fn score(&self) -> ScoreResult {
        match self {
            PredictionOutcome::ModelScored { score, .. } | PredictionOutcome::RuleScored { score, .. } => *score,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, PredictionOutcome::RuleScored { .. })
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            PredictionOutcome::RuleScored { reason, .. } => Some(*reason),
            PredictionOutcome::ModelScored { .. } => None,
        }
    }
}

/// Snapshot of the engine's model state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_kind: Option<String>,
    pub input_width: Option<usize>,
    /// Width of the matrices the feature builder produces
    pub feature_width: usize,
    /// Whether features come from the fitted encoder bundle
    pub encoder_bundle: bool,
    pub model_enabled: bool,
}

/// Risk prediction engine
///
/// Immutable after construction and safe to share across threads. Every
/// call returns exactly one score per input record, in input order, whatever
/// happens on the model path.
pub struct PredictionEngine {
    /// Loaded estimator, shared read-only
    model: Option<Arc<dyn PredictiveModel>>,
    features: FeatureBuilder,
    rules: RuleScorer,
    model_enabled: bool,
}

impl fmt::Debug for PredictionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionEngine")
            .field("model", &self.model.as_ref().map(|m| m.kind().to_string()))
            .field("features", &self.features)
            .field("model_enabled", &self.model_enabled)
            .finish()
    }
}

impl PredictionEngine {
    /// Load the configured model artifact and build the engine
    ///
    /// Never fails: without a usable artifact the engine scores with rules.
    pub fn from_config(config: &EngineConfig) -> Self {
        info!("Creating prediction engine with model: {}", config.model_path.display());
        let outcome = ModelLoader::default().load(&config.model_path);
        Self::new(config, outcome)
    }

    /// Build the engine from an already-loaded artifact
    pub fn new(config: &EngineConfig, outcome: LoadOutcome) -> Self {
        let (model, bundle) = outcome.into_parts();
        let features = FeatureBuilder::new(config.features.clone(), bundle.map(Arc::new));

        if let Some(model) = &model {
            if let Some(width) = model.input_width().filter(|w| *w != features.width()) {
                warn!(
                    "Model expects {} features but the feature builder produces {}; predictions will fall back",
                    width,
                    features.width()
                );
            }
        }
        if model.is_some() && !config.model_enabled {
            info!("Model loaded but disabled by configuration");
        }

        Self {
            model,
            features,
            rules: RuleScorer::new(),
            model_enabled: config.model_enabled,
        }
    }

    /// Engine that only ever scores with rules
    pub fn rules_only(config: &EngineConfig) -> Self {
        Self::new(config, LoadOutcome::Missing)
    }

    /// Score a single record
    pub fn predict_one(&self, record: &AnomalyRecord) -> ScoreResult {
        self.predict_one_detailed(record).score()
    }

    /// Score a batch of records, one result per record in input order
    pub fn predict_batch(&self, records: &[AnomalyRecord]) -> Vec<ScoreResult> {
        self.predict_batch_detailed(records)
            .iter()
            .map(PredictionOutcome::score)
            .collect()
    }

    /// Score a single record, reporting which path produced the score
    pub fn predict_one_detailed(&self, record: &AnomalyRecord) -> PredictionOutcome {
        self.predict_batch_detailed(std::slice::from_ref(record))
            .into_iter()
            .next()
            .unwrap_or_else(|| self.fallback(record, FallbackReason::PredictionFailed))
    }

    /// Score a batch of records, reporting which path produced each score
    pub fn predict_batch_detailed(&self, records: &[AnomalyRecord]) -> Vec<PredictionOutcome> {
        if records.is_empty() {
            return Vec::new();
        }

        let model = match self.active_model() {
            Ok(model) => model,
            Err(reason) => return self.fallback_all(records, reason),
        };

        let output = match self.run_model(model, records) {
            Some(output) => output,
            None => return self.fallback_all(records, FallbackReason::PredictionFailed),
        };

        let outcomes = match output {
            ModelOutput::Rows(rows) => {
                if rows.len() > records.len() {
                    warn!(
                        "Model returned {} rows for {} records, extra rows ignored",
                        rows.len(),
                        records.len()
                    );
                }
                records
                    .iter()
                    .enumerate()
                    .map(|(i, record)| match rows.get(i) {
                        Some(row) => self.model_outcome(record, row),
                        None => self.fallback(record, FallbackReason::UnexpectedShape),
                    })
                    .collect()
            }
            ModelOutput::Flat(values) if records.len() == 1 => {
                vec![self.model_outcome(&records[0], &values)]
            }
            ModelOutput::Flat(values) => {
                warn!(
                    "Model returned a flat output of {} values for {} records",
                    values.len(),
                    records.len()
                );
                self.fallback_all(records, FallbackReason::UnexpectedShape)
            }
        };

        let fallbacks = outcomes.iter().filter(|o| o.used_fallback()).count();
        if fallbacks > 0 {
            warn!("{} of {} records scored by rules", fallbacks, records.len());
        }
        outcomes
    }

    /// Current model state
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            model_loaded: self.model.is_some(),
            model_kind: self.model.as_ref().map(|m| m.kind().to_string()),
            input_width: self.model.as_ref().and_then(|m| m.input_width()),
            feature_width: self.features.width(),
            encoder_bundle: self.features.uses_bundle(),
            model_enabled: self.model_enabled,
        }
    }

    fn active_model(&self) -> Result<&Arc<dyn PredictiveModel>, FallbackReason> {
        let Some(model) = &self.model else {
            return Err(FallbackReason::ModelUnavailable);
        };
        if !self.model_enabled {
            return Err(FallbackReason::ModelDisabled);
        }
        if let Err(e) = model.check_ready() {
            warn!("Model failed readiness check: {}", e);
            return Err(FallbackReason::ModelNotReady);
        }
        Ok(model)
    }

    fn run_model(&self, model: &Arc<dyn PredictiveModel>, records: &[AnomalyRecord]) -> Option<ModelOutput> {
        let start = Instant::now();
        let features = self.features.build(records);

        if let Some(width) = model.input_width() {
            if width != features.ncols() {
                warn!(
                    "Feature width {} does not match model input width {}",
                    features.ncols(),
                    width
                );
                return None;
            }
        }

        match model.predict(features.view()) {
            Ok(output) => {
                debug!(
                    "Inference on {} records completed in {}ms",
                    records.len(),
                    start.elapsed().as_millis()
                );
                Some(output)
            }
            Err(e) => {
                warn!("Model prediction failed for {} records: {}", records.len(), e);
                None
            }
        }
    }

    fn model_outcome(&self, record: &AnomalyRecord, values: &[f64]) -> PredictionOutcome {
        let [reliability, availability, process_safety, ..] = values else {
            debug!("Output for {} has {} values, need 3", record.equipment_id, values.len());
            return self.fallback(record, FallbackReason::UnexpectedShape);
        };

        let normalized = [*reliability, *availability, *process_safety]
            .map(ScoreNormalizer::normalize);
        let [Ok(reliability), Ok(availability), Ok(process_safety)] = normalized else {
            debug!("Non-finite output for {}: {:?}", record.equipment_id, &values[..3]);
            return self.fallback(record, FallbackReason::NonFiniteOutput);
        };

        // Criticality is always recomputed from the components
        let model_criticality = values
            .get(3)
            .and_then(|raw| ScoreNormalizer::normalize_criticality(*raw).ok());
        let score = ScoreResult::new(reliability, availability, process_safety);
        debug!(
            "Model score for {}: scores={:?}, criticality={}, model criticality {:?} discarded",
            record.equipment_id,
            score.components(),
            score.criticality(),
            model_criticality
        );

        PredictionOutcome::ModelScored {
            score,
            model_criticality,
        }
    }

    fn fallback(&self, record: &AnomalyRecord, reason: FallbackReason) -> PredictionOutcome {
        PredictionOutcome::RuleScored {
            score: self.rules.score(record),
            reason,
        }
    }

    fn fallback_all(&self, records: &[AnomalyRecord], reason: FallbackReason) -> Vec<PredictionOutcome> {
        debug!("Scoring {} records by rules: {}", records.len(), reason);
        records.iter().map(|record| self.fallback(record, reason)).collect()
    }
}
