//! Evaluation config model and JSON loader

use crate::models::LayerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default minimum weighted score for CI mode
pub const DEFAULT_THRESHOLD: f64 = 60.0;

/// Default weight per layer. Execution carries the most weight, validation the least.
const DEFAULT_LAYER_WEIGHTS: [(LayerId, f64); 6] = [
    (LayerId::L1, 0.20),
    (LayerId::L2, 0.15),
    (LayerId::L3, 0.15),
    (LayerId::L4, 0.15),
    (LayerId::L5, 0.25),
    (LayerId::L6, 0.10),
];

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config must be a JSON object: {0}")]
    NotAnObject(PathBuf),

    #[error("Config field '{0}' has the wrong type")]
    InvalidField(&'static str),

    #[error("Unknown layer weight keys: {0}")]
    UnknownWeightKeys(String),

    #[error("Layer weight for {0} must be numeric")]
    NonNumericWeight(String),

    #[error("Layer weight for {0} must be non-negative")]
    NegativeWeight(String),

    #[error("Unknown layer: {layer}. Available: {available}")]
    UnknownLayer { layer: String, available: String },

    #[error("Missing layer weights for selected layers: {0}")]
    MissingWeights(String),

    #[error("--workers must be >= 1 (got {0})")]
    InvalidWorkers(usize),
}

/// Per-layer weights used by the weighted aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerWeights(BTreeMap<LayerId, f64>);

impl Default for LayerWeights {
    fn default() -> Self {
        Self(DEFAULT_LAYER_WEIGHTS.into_iter().collect())
    }
}

impl LayerWeights {
    /// Weights containing only the given entries (no defaults)
    pub fn from_pairs(pairs: impl IntoIterator<Item = (LayerId, f64)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    pub fn get(&self, layer: LayerId) -> Option<f64> {
        self.0.get(&layer).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Layers from `layers` that have no weight, sorted
    pub fn missing_for(&self, layers: &[LayerId]) -> Vec<LayerId> {
        let mut missing: Vec<LayerId> = layers
            .iter()
            .copied()
            .filter(|l| !self.0.contains_key(l))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Fail with [`ConfigError::MissingWeights`] unless every layer has a weight.
    pub fn ensure_covers(&self, layers: &[LayerId]) -> Result<(), ConfigError> {
        let missing = self.missing_for(layers);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ConfigError::MissingWeights(join_layers(&missing)))
    }
}

pub(crate) fn join_layers(layers: &[LayerId]) -> String {
    layers
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Settings for one evaluation run
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    pub skills_root: Option<PathBuf>,
    pub threshold: f64,
    pub layer_weights: LayerWeights,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            skills_root: None,
            threshold: DEFAULT_THRESHOLD,
            layer_weights: LayerWeights::default(),
        }
    }
}

impl EvalConfig {
    /// Resolve the layer selection from a comma-separated list.
    ///
    /// `None` selects every layer. Ids are trimmed and uppercased.
    pub fn select_layers(spec: Option<&str>) -> Result<Vec<LayerId>, ConfigError> {
        let Some(spec) = spec else {
            return Ok(LayerId::ALL.to_vec());
        };
        let mut layers = Vec::new();
        for raw in spec.split(',') {
            let id = raw.trim().to_uppercase();
            let layer = id.parse::<LayerId>().map_err(|_| ConfigError::UnknownLayer {
                layer: id.clone(),
                available: join_layers(&LayerId::ALL),
            })?;
            if !layers.contains(&layer) {
                layers.push(layer);
            }
        }
        Ok(layers)
    }
}

/// Config keys must spell the layer id exactly ("L1", not "l1").
fn exact_layer(key: &str) -> Option<LayerId> {
    LayerId::ALL.into_iter().find(|l| l.as_str() == key)
}

/// Validate a raw `layer_weights` object and return its parsed entries.
fn parse_layer_weights(raw: &serde_json::Map<String, Value>) -> Result<Vec<(LayerId, f64)>, ConfigError> {
    let mut unknown: Vec<&str> = raw
        .keys()
        .map(String::as_str)
        .filter(|k| exact_layer(k).is_none())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(ConfigError::UnknownWeightKeys(unknown.join(", ")));
    }

    let mut parsed = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let weight = value
            .as_f64()
            .ok_or_else(|| ConfigError::NonNumericWeight(key.clone()))?;
        if weight < 0.0 {
            return Err(ConfigError::NegativeWeight(key.clone()));
        }
        if let Some(layer) = exact_layer(key) {
            parsed.push((layer, weight));
        }
    }
    Ok(parsed)
}

/// Load the evaluation config from `path`.
///
/// A missing file yields [`EvalConfig::default`]. Configured layer weights are
/// validated, then merged over the defaults.
pub fn load_eval_config(path: &Path) -> Result<EvalConfig, ConfigError> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(EvalConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(raw) = raw else {
        return Err(ConfigError::NotAnObject(path.to_path_buf()));
    };

    let mut config = EvalConfig::default();

    match raw.get("layer_weights") {
        None | Some(Value::Null) => {}
        Some(Value::Object(weights)) => {
            for (layer, weight) in parse_layer_weights(weights)? {
                config.layer_weights.0.insert(layer, weight);
            }
        }
        Some(_) => return Err(ConfigError::InvalidField("layer_weights")),
    }

    match raw.get("threshold") {
        None | Some(Value::Null) => {}
        Some(v) => {
            config.threshold = v.as_f64().ok_or(ConfigError::InvalidField("threshold"))?;
        }
    }

    match raw.get("skills_root") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.is_empty() => {}
        Some(Value::String(s)) => config.skills_root = Some(PathBuf::from(s)),
        Some(_) => return Err(ConfigError::InvalidField("skills_root")),
    }

    debug!("Loaded config from {}", path.display());
    Ok(config)
}
