//! Batch Scoring Front End
//!
//! Settings, logging setup and the validate-then-score pipeline behind the
//! `tams-predict` binary.

use anomaly_core::{AnomalyRecord, ScoreResult};
use config::{Config, Environment, File};
use data_validator::{RawAnomaly, ValidationError, Validator};
use inference_engine::{EngineConfig, PredictionEngine, PredictionOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_NAME: &str = "tams";

/// Prefix of environment overrides, e.g. `TAMS_ENGINE__MODEL_PATH`
pub const ENV_PREFIX: &str = "TAMS";

/// Errors raised by the front end
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid input document: {0}")]
    Input(#[from] serde_json::Error),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file layered under `TAMS_*` environment variables
    ///
    /// An explicit `path` must exist; otherwise `tams.{toml,json,yaml}` in
    /// the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

/// Initialize logging to stderr
pub fn init_logging(level: &str) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(|e| CliError::Logging(e.to_string()))
}

/// Parse a JSON array of raw anomaly reports
pub fn parse_input(text: &str) -> Result<Vec<RawAnomaly>, CliError> {
    Ok(serde_json::from_str(text)?)
}

/// One scored report
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    pub record: AnomalyRecord,
    pub scores: ScoreResult,
    /// Scoring path, only in detailed mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PredictionOutcome>,
}

/// A report that failed validation, by input position
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub error: ValidationError,
}

/// Result of scoring an input document
#[derive(Debug, Clone, Default)]
pub struct ScoringReport {
    pub scored: Vec<ScoredRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// Validate every report and score the valid ones in a single batch
pub fn score_reports(engine: &PredictionEngine, raws: &[RawAnomaly], detailed: bool) -> ScoringReport {
    let mut records = Vec::with_capacity(raws.len());
    let mut rejected = Vec::new();

    for (row, result) in Validator::new().validate_batch(raws).into_iter().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!("Skipping row {}: {}", row, error);
                rejected.push(RejectedRow { row, error });
            }
        }
    }

    let outcomes = engine.predict_batch_detailed(&records);
    let by_rules = outcomes.iter().filter(|o| o.used_fallback()).count();
    let scored: Vec<ScoredRecord> = records
        .into_iter()
        .zip(outcomes)
        .map(|(record, outcome)| ScoredRecord {
            record,
            scores: outcome.score(),
            outcome: detailed.then_some(outcome),
        })
        .collect();

    info!(
        "Scored {} reports ({} rejected, {} by rules)",
        scored.len(),
        rejected.len(),
        by_rules
    );

    ScoringReport { scored, rejected }
}
