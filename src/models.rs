//! Core data models for skillgrade
//!
//! These models are shared by discovery, the layer evaluators, scoring,
//! history and the reporters. Package metadata is produced once by
//! [`crate::discovery`] and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Round to one decimal place, ties to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// The six scoring layers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LayerId {
    L1,
    L2,
    L3,
    L4,
    L5,
    L6,
}

impl LayerId {
    pub const ALL: [LayerId; 6] = [
        LayerId::L1,
        LayerId::L2,
        LayerId::L3,
        LayerId::L4,
        LayerId::L5,
        LayerId::L6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerId::L1 => "L1",
            LayerId::L2 => "L2",
            LayerId::L3 => "L3",
            LayerId::L4 => "L4",
            LayerId::L5 => "L5",
            LayerId::L6 => "L6",
        }
    }

    /// Human-readable layer title
    pub fn title(&self) -> &'static str {
        match self {
            LayerId::L1 => "Structural Integrity",
            LayerId::L2 => "Activation Reliability",
            LayerId::L3 => "Retrieval Quality",
            LayerId::L4 => "Workflow Fidelity",
            LayerId::L5 => "Execution Precision",
            LayerId::L6 => "Validation Coverage",
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a layer id outside L1..L6
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown layer: {0}")]
pub struct UnknownLayer(pub String);

impl FromStr for LayerId {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L1" => Ok(LayerId::L1),
            "L2" => Ok(LayerId::L2),
            "L3" => Ok(LayerId::L3),
            "L4" => Ok(LayerId::L4),
            "L5" => Ok(LayerId::L5),
            "L6" => Ok(LayerId::L6),
            other => Err(UnknownLayer(other.to_string())),
        }
    }
}

/// Where a package's trigger keywords came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    #[default]
    YamlDescription,
    MarkdownSection,
    Both,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::YamlDescription => write!(f, "yaml_description"),
            TriggerSource::MarkdownSection => write!(f, "markdown_section"),
            TriggerSource::Both => write!(f, "both"),
        }
    }
}

/// Trigger keywords extracted from a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub keywords: Vec<String>,
    pub source: TriggerSource,
}

/// Everything discovery learned about one skill package
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
    pub skill_path: PathBuf,
    /// Full SKILL.md text, including front-matter
    pub manifest_text: String,
    pub triggers: TriggerInfo,
    pub has_scripts_dir: bool,
    pub has_references_dir: bool,
    pub has_bridges_dir: bool,
    pub has_tests_dir: bool,
    pub has_design_decision: bool,
    pub has_when_to_use: bool,
    pub has_dont_use: bool,
    pub has_pipeline_integration: bool,
    pub has_llm_judgment_guide: bool,
    pub has_quick_start: bool,
    pub has_cli_options: bool,
    pub has_prerequisites: bool,
    pub script_files: Vec<String>,
    pub reference_files: Vec<String>,
    pub skill_md_lines: usize,
    pub code_block_count: usize,
    pub code_block_languages: Vec<String>,
    pub section_headers: Vec<String>,
    /// Directory names of sibling packages mentioned in the manifest
    pub pipeline_targets: Vec<String>,
}

impl SkillMetadata {
    /// Name of the package directory (may differ from `name`)
    pub fn dir_name(&self) -> String {
        self.skill_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.skill_path.join("scripts")
    }

    pub fn references_dir(&self) -> PathBuf {
        self.skill_path.join("references")
    }

    pub fn bridges_dir(&self) -> PathBuf {
        self.skill_path.join("bridges")
    }

    pub fn path(&self) -> &Path {
        &self.skill_path
    }
}

/// Result of a single metric check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub details: String,
    pub passed: bool,
}

impl MetricResult {
    /// Build a metric, clamping `score` into `[0, max_score]`.
    pub fn new(
        name: impl Into<String>,
        score: f64,
        max_score: f64,
        details: impl Into<String>,
        passed: bool,
    ) -> Self {
        let max_score = max_score.max(0.0);
        Self {
            name: name.into(),
            score: score.clamp(0.0, max_score),
            max_score,
            details: details.into(),
            passed,
        }
    }

    /// A metric that does not apply (max 0), excluded from every denominator.
    pub fn not_applicable(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, 0.0, 0.0, details, true)
    }

    pub fn is_applicable(&self) -> bool {
        self.max_score > 0.0
    }
}

/// Score percentage over applicable metrics, 0 when there are none.
fn percent_of_max(pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
    let (total, max_total) = pairs
        .filter(|(_, max)| *max > 0.0)
        .fold((0.0, 0.0), |(t, m), (s, max)| (t + s, m + max));
    if max_total > 0.0 {
        total / max_total * 100.0
    } else {
        0.0
    }
}

/// Result of evaluating one layer for one package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    pub layer: LayerId,
    pub skill_name: String,
    pub metrics: Vec<MetricResult>,
    pub overall_score: f64,
    pub recommendations: Vec<String>,
}

impl LayerResult {
    pub fn new(layer: LayerId, skill_name: impl Into<String>) -> Self {
        Self {
            layer,
            skill_name: skill_name.into(),
            metrics: Vec::new(),
            overall_score: 0.0,
            recommendations: Vec::new(),
        }
    }

    /// `100 * sum(score) / sum(max)` over applicable metrics.
    pub fn compute_score(&mut self) {
        self.overall_score = percent_of_max(self.metrics.iter().map(|m| (m.score, m.max_score)));
    }

    /// Synthetic result standing in for a layer evaluation that failed.
    pub fn runtime_error(layer: LayerId, skill_name: impl Into<String>, detail: &str) -> Self {
        let mut result = Self::new(layer, skill_name);
        result.metrics = vec![MetricResult::new(
            RUNTIME_ERROR_METRIC,
            0.0,
            1.0,
            detail,
            false,
        )];
        result.compute_score();
        result
            .recommendations
            .push(format!("{RUNTIME_ERROR_METRIC}: {detail}"));
        result
    }

    pub fn is_runtime_error(&self) -> bool {
        self.metrics.iter().any(|m| m.name == RUNTIME_ERROR_METRIC)
    }
}

/// Per-layer results for one package
pub type SkillResults = BTreeMap<LayerId, LayerResult>;

/// Package name to its per-layer results, ordered by name
pub type EvaluationResults = BTreeMap<String, SkillResults>;

/// Name of the metric carried by isolated evaluation failures
pub const RUNTIME_ERROR_METRIC: &str = "runtime_error";

/// Cross-package metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemMetric {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub details: String,
    pub affected_skills: Vec<String>,
}

impl EcosystemMetric {
    pub fn new(
        name: impl Into<String>,
        score: f64,
        max_score: f64,
        details: impl Into<String>,
        affected_skills: Vec<String>,
    ) -> Self {
        let max_score = max_score.max(0.0);
        Self {
            name: name.into(),
            score: score.clamp(0.0, max_score),
            max_score,
            details: details.into(),
            affected_skills,
        }
    }
}

/// Result of the ecosystem evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcosystemResult {
    pub metrics: Vec<EcosystemMetric>,
    pub overall_score: f64,
    pub recommendations: Vec<String>,
}

impl EcosystemResult {
    pub fn compute_score(&mut self) {
        self.overall_score = percent_of_max(self.metrics.iter().map(|m| (m.score, m.max_score)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(score: f64, max: f64) -> MetricResult {
        MetricResult::new("m", score, max, "", true)
    }

    #[test]
    fn test_metric_score_is_clamped() {
        assert_eq!(metric(12.0, 10.0).score, 10.0);
        assert_eq!(metric(-3.0, 10.0).score, 0.0);
        assert_eq!(metric(5.0, 0.0).score, 0.0);
    }

    #[test]
    fn test_compute_score_empty_is_zero() {
        let mut lr = LayerResult::new(LayerId::L1, "s");
        lr.compute_score();
        assert_eq!(lr.overall_score, 0.0);
    }

    #[test]
    fn test_compute_score_excludes_not_applicable() {
        let mut lr = LayerResult::new(LayerId::L2, "s");
        lr.metrics = vec![
            metric(5.0, 10.0),
            MetricResult::not_applicable("bench", "no data"),
        ];
        lr.compute_score();
        assert_eq!(lr.overall_score, 50.0);
    }

    #[test]
    fn test_compute_score_all_not_applicable() {
        let mut lr = LayerResult::new(LayerId::L2, "s");
        lr.metrics = vec![MetricResult::not_applicable("bench", "no data")];
        lr.compute_score();
        assert_eq!(lr.overall_score, 0.0);
    }

    #[test]
    fn test_compute_score_is_idempotent() {
        let mut lr = LayerResult::new(LayerId::L3, "s");
        lr.metrics = vec![metric(7.0, 20.0), metric(10.0, 10.0)];
        lr.compute_score();
        let first = lr.overall_score;
        lr.compute_score();
        assert_eq!(first, lr.overall_score);
        assert!((first - 56.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_runtime_error_result() {
        let lr = LayerResult::runtime_error(LayerId::L4, "broken", "Error: boom");
        assert_eq!(lr.overall_score, 0.0);
        assert!(lr.is_runtime_error());
        assert_eq!(lr.metrics[0].max_score, 1.0);
        assert!(!lr.metrics[0].passed);
        assert_eq!(lr.recommendations, vec!["runtime_error: Error: boom"]);
    }

    #[test]
    fn test_layer_id_parse() {
        assert_eq!(" l3 ".parse::<LayerId>(), Ok(LayerId::L3));
        assert_eq!(
            "L9".parse::<LayerId>(),
            Err(UnknownLayer("L9".to_string()))
        );
        assert_eq!(LayerId::L5.to_string(), "L5");
    }

    #[test]
    fn test_layer_id_serializes_as_plain_id() {
        let json = serde_json::to_string(&LayerId::L6).unwrap();
        assert_eq!(json, "\"L6\"");
    }

    #[test]
    fn test_round1_ties_to_even() {
        assert_eq!(round1(0.25), 0.2);
        assert_eq!(round1(72.349), 72.3);
    }

    #[test]
    fn test_ecosystem_compute_score() {
        let mut eco = EcosystemResult::default();
        eco.metrics = vec![
            EcosystemMetric::new("a", 25.0, 25.0, "", vec![]),
            EcosystemMetric::new("b", 0.0, 25.0, "", vec![]),
        ];
        eco.compute_score();
        assert_eq!(eco.overall_score, 50.0);
    }
}
