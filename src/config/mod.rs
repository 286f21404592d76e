//! Evaluation configuration for skillgrade
//!
//! This module handles:
//! - Layer weights (defaults merged with `layer_weights` from the config file)
//! - Pass threshold for CI mode
//! - Default skills root
//!
//! Config is a JSON file (default `skillgrade.json`). A missing file means
//! defaults; a present but invalid file is an error.

mod eval_config;

pub use eval_config::{
    load_eval_config, ConfigError, EvalConfig, LayerWeights, DEFAULT_THRESHOLD,
};
pub(crate) use eval_config::join_layers;
