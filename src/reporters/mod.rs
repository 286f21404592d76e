//! Output reporters for skillgrade results
//!
//! Supports multiple output formats:
//! - `text` - Plain terminal report
//! - `json` - Machine-readable JSON
//! - `markdown` - GitHub-flavored Markdown
//!
//! History diffs and the snapshot table are rendered as text only (see
//! [`history`]).

pub mod history;
mod json;
mod markdown;
mod text;

use crate::config::LayerWeights;
use crate::models::{EcosystemResult, EvaluationResults, LayerId, SkillResults};
use crate::scoring::{weighted_score, ScoringError};
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: text, json, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Everything a reporter renders for one run
#[derive(Debug, Clone, Copy)]
pub struct EvaluationReport<'a> {
    pub results: &'a EvaluationResults,
    pub ecosystem: Option<&'a EcosystemResult>,
    pub weights: &'a LayerWeights,
}

impl<'a> EvaluationReport<'a> {
    pub fn new(results: &'a EvaluationResults, weights: &'a LayerWeights) -> Self {
        Self {
            results,
            ecosystem: None,
            weights,
        }
    }

    pub fn with_ecosystem(mut self, ecosystem: Option<&'a EcosystemResult>) -> Self {
        self.ecosystem = ecosystem;
        self
    }

    /// Every layer present in any package's results, sorted
    fn layers_used(&self) -> Vec<LayerId> {
        self.results
            .values()
            .flat_map(|layers| layers.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn weighted(&self, layers: &SkillResults) -> Result<f64, ScoringError> {
        weighted_score(layers, self.weights)
    }
}

/// Render a report in the specified format
pub fn render(report: &EvaluationReport<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
        OutputFormat::Markdown => markdown::render(report),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{EcosystemMetric, LayerResult, MetricResult};

    /// Results for one package with an L1 layer at 75
    pub(crate) fn test_results() -> EvaluationResults {
        let mut lr = LayerResult::new(LayerId::L1, "test-skill");
        lr.metrics = vec![
            MetricResult::new("yaml_validity", 30.0, 30.0, "name present", true),
            MetricResult::new("directory_structure", 20.0, 40.0, "scripts/ missing", false),
            MetricResult::new("path_portability", 10.0, 10.0, "no hard-coded paths", true),
        ];
        lr.compute_score();
        lr.recommendations = vec!["directory_structure: scripts/ missing".into()];

        let mut layers = SkillResults::new();
        layers.insert(LayerId::L1, lr);
        let mut results = EvaluationResults::new();
        results.insert("test-skill".into(), layers);
        results
    }

    pub(crate) fn test_ecosystem() -> EcosystemResult {
        let mut eco = EcosystemResult {
            metrics: vec![
                EcosystemMetric::new("bridge_connectivity", 25.0, 25.0, "all bridges linked", vec![]),
                EcosystemMetric::new("cli_consistency", 15.0, 25.0, "no shared flags", vec![]),
            ],
            ..Default::default()
        };
        eco.compute_score();
        eco.recommendations = vec!["cli_consistency: no shared flags".into()];
        eco
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_layers_used_is_sorted_union() {
        let mut results = test_results();
        results.insert(
            "other".into(),
            [(LayerId::L4, LayerResult::new(LayerId::L4, "other"))]
                .into_iter()
                .collect(),
        );
        let weights = LayerWeights::default();
        let report = EvaluationReport::new(&results, &weights);
        assert_eq!(report.layers_used(), vec![LayerId::L1, LayerId::L4]);
    }
}
