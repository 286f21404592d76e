//! Optional benchmark data for L2 and L5
//!
//! Layout under the benchmarks directory:
//!
//! ```text
//! L2_activation/trigger_queries.json  { "<skill>": { "positive": [{"query"}], "negative": [{"query"}] } }
//! L5_execution/script_tests.json      { "<skill>": { "required_patterns": [{"file", "pattern"}],
//!                                                    "forbidden_patterns": [{"file", "pattern"}] } }
//! ```
//!
//! A missing file or a missing entry means "no benchmark" (not an error).
//! Malformed JSON is an error.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TRIGGER_QUERIES: &str = "L2_activation/trigger_queries.json";
pub const SCRIPT_TESTS: &str = "L5_execution/script_tests.json";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkQuery {
    pub query: String,
}

/// Labeled queries for one package
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TriggerBenchmark {
    #[serde(default)]
    pub positive: Vec<BenchmarkQuery>,
    #[serde(default)]
    pub negative: Vec<BenchmarkQuery>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PatternExpectation {
    /// Path relative to the package's `scripts/`
    pub file: String,
    pub pattern: String,
}

/// Code patterns expected (or forbidden) in one package's scripts
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ScriptBenchmark {
    #[serde(default)]
    pub required_patterns: Vec<PatternExpectation>,
    #[serde(default)]
    pub forbidden_patterns: Vec<PatternExpectation>,
}

/// Location of benchmark files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSource {
    dir: PathBuf,
}

impl BenchmarkSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Labeled trigger queries for `skill_name`, if any
    pub fn trigger_queries(&self, skill_name: &str) -> Result<Option<TriggerBenchmark>> {
        self.entry(TRIGGER_QUERIES, skill_name)
    }

    /// Script pattern tests for `skill_name`, if any
    pub fn script_tests(&self, skill_name: &str) -> Result<Option<ScriptBenchmark>> {
        self.entry(SCRIPT_TESTS, skill_name)
    }

    fn entry<T: DeserializeOwned>(&self, rel: &str, skill_name: &str) -> Result<Option<T>> {
        let path = self.dir.join(rel);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read benchmark {}", path.display()))?;
        let mut data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("invalid benchmark JSON in {}", path.display()))?;

        let Some(value) = data.remove(skill_name) else {
            debug!("No entry for '{}' in {}", skill_name, path.display());
            return Ok(None);
        };
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }
        let parsed = serde_json::from_value(value).with_context(|| {
            format!("invalid benchmark entry '{}' in {}", skill_name, path.display())
        })?;
        Ok(Some(parsed))
    }
}
