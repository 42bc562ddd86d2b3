//! Model Artifact Loader & Validator

use crate::estimator::{EstimatorSpec, OnnxModel, KIND_TAG};
use crate::model::PredictiveModel;
use crate::InferenceError;
use feature_engine::EncoderBundle;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mapping keys searched, in order, for a bundled estimator
pub const MODEL_KEYS: [&str; 5] = ["model", "estimator", "classifier", "regressor", "predictor"];

/// Result of loading a model artifact
pub enum LoadOutcome {
    /// No artifact at the configured path
    Missing,
    /// Artifact present but nothing in it is a usable estimator
    Unusable(String),
    /// Usable estimator, with the encoders stored next to it when present
    Loaded {
        model: Arc<dyn PredictiveModel>,
        bundle: Option<EncoderBundle>,
    },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// Split into the model handle and encoder bundle, either possibly absent
    pub fn into_parts(self) -> (Option<Arc<dyn PredictiveModel>>, Option<EncoderBundle>) {
        match self {
            LoadOutcome::Loaded { model, bundle } => (Some(model), bundle),
            LoadOutcome::Missing | LoadOutcome::Unusable(_) => (None, None),
        }
    }
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Missing => write!(f, "Missing"),
            LoadOutcome::Unusable(reason) => f.debug_tuple("Unusable").field(reason).finish(),
            LoadOutcome::Loaded { model, bundle } => f
                .debug_struct("Loaded")
                .field("model", &model.kind())
                .field("bundle", &bundle.is_some())
                .finish(),
        }
    }
}

/// One way of finding an estimator inside a deserialized artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The artifact itself is the estimator
    Bare,
    /// A mapping value under one of [`MODEL_KEYS`]
    KnownKeys,
    /// Any other mapping value, in document order
    AnyValue,
    /// Any sequence element, by index
    SequenceElement,
}

impl ExtractionStrategy {
    /// Default search order
    pub const ORDER: [ExtractionStrategy; 4] = [
        ExtractionStrategy::Bare,
        ExtractionStrategy::KnownKeys,
        ExtractionStrategy::AnyValue,
        ExtractionStrategy::SequenceElement,
    ];

    /// First admissible estimator this strategy finds, with its location
    fn extract(
        &self,
        artifact: &Value,
        base_dir: &Path,
    ) -> Option<(String, Arc<dyn PredictiveModel>)> {
        let candidates: Vec<(String, &Value)> = match (self, artifact) {
            (ExtractionStrategy::Bare, _) => vec![("<root>".to_string(), artifact)],
            (ExtractionStrategy::KnownKeys, Value::Object(map)) => MODEL_KEYS
                .iter()
                .filter_map(|key| map.get(*key).map(|value| (format!("key '{}'", key), value)))
                .collect(),
            // Known keys were already tried
            (ExtractionStrategy::AnyValue, Value::Object(map)) => map
                .iter()
                .filter(|(key, _)| !MODEL_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (format!("key '{}'", key), value))
                .collect(),
            (ExtractionStrategy::SequenceElement, Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, value)| (format!("index {}", i), value))
                .collect(),
            _ => Vec::new(),
        };

        candidates.into_iter().find_map(|(location, candidate)| {
            match admit(candidate, base_dir) {
                Ok(model) => Some((location, model)),
                Err(e) => {
                    debug!("Candidate at {} rejected: {}", location, e);
                    None
                }
            }
        })
    }
}

/// Validity predicate: a tagged estimator entry that builds and reports ready
///
/// Untagged mappings are plain data, never estimators.
fn admit(candidate: &Value, base_dir: &Path) -> Result<Arc<dyn PredictiveModel>, InferenceError> {
    let Value::Object(map) = candidate else {
        return Err(InferenceError::Artifact("not a mapping".to_string()));
    };
    let Some(kind) = map.get(KIND_TAG).and_then(Value::as_str) else {
        return Err(InferenceError::Artifact("raw mapping without estimator type".to_string()));
    };
    debug!("Candidate estimator kind: {}", kind);

    let spec: EstimatorSpec = serde_json::from_value(candidate.clone())
        .map_err(|e| InferenceError::Artifact(format!("{} estimator: {}", kind, e)))?;
    let model = spec.instantiate(base_dir)?;
    model.check_ready()?;
    Ok(model)
}

/// Loads the model artifact once at start-up
///
/// Never fails: every problem is logged and reported as
/// [`LoadOutcome::Missing`] or [`LoadOutcome::Unusable`].
#[derive(Debug, Clone)]
pub struct ModelLoader {
    strategies: Vec<ExtractionStrategy>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self {
            strategies: ExtractionStrategy::ORDER.to_vec(),
        }
    }
}

impl ModelLoader {
    /// Create a loader with a custom strategy order
    pub fn with_strategies(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    /// Load the artifact at `path`
    pub fn load(&self, path: &Path) -> LoadOutcome {
        if !path.is_file() {
            warn!(
                "Model file not found at {}, using rule-based prediction logic",
                path.display()
            );
            return LoadOutcome::Missing;
        }

        let outcome = match self.try_load(path) {
            Ok(outcome) => outcome,
            Err(e) => LoadOutcome::Unusable(e.to_string()),
        };

        match &outcome {
            LoadOutcome::Loaded { model, bundle } => info!(
                "Model loaded and validated from {}: kind={}, input_width={:?}, encoder_bundle={}",
                path.display(),
                model.kind(),
                model.input_width(),
                bundle.is_some()
            ),
            LoadOutcome::Unusable(reason) => warn!(
                "Could not load a usable model from {} ({}), using rule-based prediction logic",
                path.display(),
                reason
            ),
            LoadOutcome::Missing => {}
        }
        outcome
    }

    fn try_load(&self, path: &Path) -> Result<LoadOutcome, InferenceError> {
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let is_onnx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));
        if is_onnx {
            let model: Arc<dyn PredictiveModel> = Arc::new(OnnxModel::load(path, None)?);
            model.check_ready()?;
            return Ok(LoadOutcome::Loaded { model, bundle: None });
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;
        let artifact: Value = serde_json::from_str(&text)
            .map_err(|e| InferenceError::Artifact(format!("not a JSON artifact: {}", e)))?;

        Ok(self.extract(&artifact, base_dir))
    }

    /// Find an estimator in a deserialized artifact
    pub fn extract(&self, artifact: &Value, base_dir: &Path) -> LoadOutcome {
        let found = self
            .strategies
            .iter()
            .find_map(|strategy| strategy.extract(artifact, base_dir).map(|hit| (*strategy, hit)));

        let Some((strategy, (location, model))) = found else {
            return LoadOutcome::Unusable(format!(
                "no usable estimator in {}",
                describe(artifact)
            ));
        };
        debug!("Estimator found at {} ({:?})", location, strategy);

        let bundle = match artifact {
            Value::Object(map) => match EncoderBundle::from_artifact(map) {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!("Ignoring encoder bundle: {}", e);
                    None
                }
            },
            _ => None,
        };

        LoadOutcome::Loaded { model, bundle }
    }
}

fn describe(artifact: &Value) -> &'static str {
    match artifact {
        Value::Object(_) => "mapping",
        Value::Array(_) => "sequence",
        _ => "scalar",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn linear(width: usize) -> Value {
        json!({
            "type": "linear",
            "coefficients": vec![vec![0.0; width]; 4],
            "intercepts": [4.0, 3.0, 5.0, 12.0]
        })
    }

    fn write_artifact(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn extract(artifact: Value) -> LoadOutcome {
        ModelLoader::default().extract(&artifact, Path::new("."))
    }

    #[test]
    fn test_missing_file() {
        let outcome = ModelLoader::default().load(Path::new("/nonexistent/multi_output_model.json"));
        assert!(matches!(outcome, LoadOutcome::Missing));
        let (model, bundle) = outcome.into_parts();
        assert!(model.is_none() && bundle.is_none());
    }

    #[test]
    fn test_bare_estimator() {
        let outcome = extract(linear(102));
        assert!(outcome.is_loaded());
        let (model, bundle) = outcome.into_parts();
        assert_eq!(model.unwrap().input_width(), Some(102));
        assert!(bundle.is_none());
    }

    #[test]
    fn test_known_key_with_bundle() {
        let outcome = extract(json!({
            "regressor": linear(4),
            "label_encoders": {
                "Num_equipement": { "classes": ["EQ001"] },
                "Systeme": { "classes": ["Hydraulic"] }
            },
            "vectorizer": { "vocabulary": { "leak": 0, "fire": 1 } },
            "target_columns": ["Fiabilité Intégrité", "Disponibilté", "Process Safety", "Criticité"]
        }));

        let (model, bundle) = outcome.into_parts();
        assert_eq!(model.unwrap().kind(), "linear");
        let bundle = bundle.unwrap();
        assert!(bundle.is_complete());
        assert_eq!(bundle.output_width(), 4);
    }

    #[test]
    fn test_known_keys_searched_in_order() {
        let outcome = extract(json!({
            "predictor": linear(3),
            "model": linear(7)
        }));
        let (model, _) = outcome.into_parts();
        assert_eq!(model.unwrap().input_width(), Some(7));
    }

    #[test]
    fn test_any_value_fallback() {
        let outcome = extract(json!({
            "metadata": { "trained_on": "2025-07-01" },
            "pipeline": linear(5)
        }));
        let (model, _) = outcome.into_parts();
        assert_eq!(model.unwrap().input_width(), Some(5));
    }

    #[test]
    fn test_sequence_elements() {
        let outcome = extract(json!([
            { "note": "not a model" },
            linear(6),
            linear(8)
        ]));
        let (model, _) = outcome.into_parts();
        assert_eq!(model.unwrap().input_width(), Some(6));
    }

    #[test]
    fn test_raw_mapping_not_admitted() {
        let outcome = extract(json!({
            "model": { "coefficients": [[1.0]], "intercepts": [0.0] }
        }));
        assert!(matches!(outcome, LoadOutcome::Unusable(_)));
    }

    #[test]
    fn test_broken_estimator_skipped() {
        let outcome = extract(json!({
            "model": { "type": "linear", "coefficients": [], "intercepts": [] },
            "backup": linear(2)
        }));
        let (model, _) = outcome.into_parts();
        assert_eq!(model.unwrap().input_width(), Some(2));
    }

    #[test]
    fn test_unknown_kind_not_admitted() {
        let outcome = extract(json!({ "type": "svm", "support_vectors": [] }));
        assert!(matches!(outcome, LoadOutcome::Unusable(_)));
    }

    #[test]
    fn test_malformed_bundle_keeps_model() {
        let outcome = extract(json!({
            "model": linear(102),
            "label_encoders": "not a mapping"
        }));
        let (model, bundle) = outcome.into_parts();
        assert!(model.is_some());
        assert!(bundle.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(&dir, "model.json", &json!({ "model": linear(102) }).to_string());
        assert!(ModelLoader::default().load(&path).is_loaded());
    }

    #[test]
    fn test_undeserializable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(&dir, "model.json", "\u{80}\u{3}pickle bytes");
        assert!(matches!(ModelLoader::default().load(&path), LoadOutcome::Unusable(_)));
    }

    #[test]
    fn test_corrupt_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(&dir, "model.onnx", "definitely not protobuf");
        assert!(matches!(ModelLoader::default().load(&path), LoadOutcome::Unusable(_)));
    }

    #[test]
    fn test_onnx_reference_to_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = json!({ "model": { "type": "onnx", "path": "absent.onnx", "input_width": 102 } });
        let path = write_artifact(&dir, "bundle.json", &artifact.to_string());
        assert!(matches!(ModelLoader::default().load(&path), LoadOutcome::Unusable(_)));
    }

    fn onnx_fixture() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/linear_risk.onnx")
    }

    #[test]
    fn test_bare_onnx_file() {
        let outcome = ModelLoader::default().load(&onnx_fixture());
        let (model, bundle) = outcome.into_parts();
        let model = model.unwrap();
        assert_eq!(model.kind(), "onnx");
        assert_eq!(model.input_width(), Some(3));
        assert!(bundle.is_none());
    }

    #[test]
    fn test_onnx_reference_resolves_next_to_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("models")).unwrap();
        std::fs::copy(onnx_fixture(), dir.path().join("models/risk.onnx")).unwrap();

        let artifact = json!({ "model": { "type": "onnx", "path": "models/risk.onnx" } });
        let path = write_artifact(&dir, "bundle.json", &artifact.to_string());

        let (model, _) = ModelLoader::default().load(&path).into_parts();
        assert_eq!(model.unwrap().input_width(), Some(3));
    }

    #[test]
    fn test_any_value_skips_known_keys() {
        let artifact = json!({ "model": { "type": "linear", "coefficients": [], "intercepts": [] } });
        assert!(ExtractionStrategy::AnyValue
            .extract(&artifact, Path::new("."))
            .is_none());

        let artifact = json!({ "model": linear(3), "fallback": linear(4) });
        let (location, model) = ExtractionStrategy::AnyValue
            .extract(&artifact, Path::new("."))
            .unwrap();
        assert_eq!(location, "key 'fallback'");
        assert_eq!(model.input_width(), Some(4));
    }

    #[test]
    fn test_custom_strategy_order() {
        let loader = ModelLoader::with_strategies(vec![ExtractionStrategy::SequenceElement]);
        let outcome = loader.extract(&linear(3), Path::new("."));
        assert!(matches!(outcome, LoadOutcome::Unusable(_)));
    }
}
