//! Snapshot model and evaluator fingerprint

use crate::config::LayerWeights;
use crate::models::{round1, EcosystemResult, EvaluationResults, LayerId};
use crate::scoring::{weighted_score, ScoringError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Sources whose logic determines scores, as (relative path, contents).
/// Kept sorted by path.
const EVALUATOR_SOURCES: [(&str, &str); 16] = [
    ("src/config/eval_config.rs", include_str!("../config/eval_config.rs")),
    ("src/discovery/manifest.rs", include_str!("../discovery/manifest.rs")),
    ("src/discovery/mod.rs", include_str!("../discovery/mod.rs")),
    ("src/evaluators/activation.rs", include_str!("../evaluators/activation.rs")),
    ("src/evaluators/benchmarks.rs", include_str!("../evaluators/benchmarks.rs")),
    ("src/evaluators/complexity.rs", include_str!("../evaluators/complexity.rs")),
    ("src/evaluators/ecosystem.rs", include_str!("../evaluators/ecosystem.rs")),
    ("src/evaluators/execution.rs", include_str!("../evaluators/execution.rs")),
    ("src/evaluators/mod.rs", include_str!("../evaluators/mod.rs")),
    ("src/evaluators/retrieval.rs", include_str!("../evaluators/retrieval.rs")),
    ("src/evaluators/structural.rs", include_str!("../evaluators/structural.rs")),
    ("src/evaluators/validation.rs", include_str!("../evaluators/validation.rs")),
    ("src/evaluators/workflow.rs", include_str!("../evaluators/workflow.rs")),
    ("src/models.rs", include_str!("../models.rs")),
    ("src/scoring/aggregate.rs", include_str!("../scoring/aggregate.rs")),
    ("src/scoring/mod.rs", include_str!("../scoring/mod.rs")),
];

static EVALUATOR_VERSION: OnceLock<String> = OnceLock::new();

/// First 12 hex chars of SHA-256 over `path \0 bytes \0` for each source,
/// in path order.
pub fn fingerprint<'a>(sources: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> String {
    let mut sources: Vec<(&str, &[u8])> = sources.into_iter().collect();
    sources.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    for (path, bytes) in sources {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(bytes);
        hasher.update([0u8]);
    }
    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    hex[..12].to_string()
}

/// Fingerprint of the scoring logic compiled into this binary
pub fn evaluator_version() -> &'static str {
    EVALUATOR_VERSION.get_or_init(|| {
        fingerprint(
            EVALUATOR_SOURCES
                .iter()
                .map(|(path, src)| (*path, src.as_bytes())),
        )
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    pub weighted: f64,
    #[serde(default)]
    pub layers: BTreeMap<LayerId, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    #[serde(default)]
    pub weighted_average: f64,
    #[serde(default)]
    pub skill_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemSnapshot {
    pub overall_score: f64,
}

/// One persisted evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Local time, ISO 8601
    pub timestamp: String,
    #[serde(default)]
    pub evaluator_version: String,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillSnapshot>,
    #[serde(default)]
    pub summary: SnapshotSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<EcosystemSnapshot>,
}

/// Capture `results` as a snapshot. Scores are rounded to one decimal.
///
/// `evaluator_version` defaults to [`evaluator_version()`].
pub fn build_snapshot(
    results: &EvaluationResults,
    ecosystem: Option<&EcosystemResult>,
    evaluator_version: Option<&str>,
    weights: &LayerWeights,
) -> Result<Snapshot, ScoringError> {
    let mut skills = BTreeMap::new();
    let mut total = 0.0;
    for (name, layer_results) in results {
        let weighted = weighted_score(layer_results, weights)?;
        total += weighted;
        skills.insert(
            name.clone(),
            SkillSnapshot {
                weighted: round1(weighted),
                layers: layer_results
                    .iter()
                    .map(|(layer, lr)| (*layer, round1(lr.overall_score)))
                    .collect(),
            },
        );
    }

    let weighted_average = if results.is_empty() {
        0.0
    } else {
        round1(total / results.len() as f64)
    };

    Ok(Snapshot {
        timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        evaluator_version: evaluator_version
            .map(str::to_string)
            .unwrap_or_else(|| self::evaluator_version().to_string()),
        skills,
        summary: SnapshotSummary {
            weighted_average,
            skill_count: results.len(),
        },
        ecosystem: ecosystem.map(|eco| EcosystemSnapshot {
            overall_score: round1(eco.overall_score),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LayerResult, MetricResult, SkillResults};

    fn results_with(scores: &[(&str, LayerId, f64)]) -> EvaluationResults {
        let mut results = EvaluationResults::new();
        for (name, layer, pct) in scores {
            let mut lr = LayerResult::new(*layer, *name);
            lr.metrics = vec![MetricResult::new("m", *pct, 100.0, "", true)];
            lr.compute_score();
            results
                .entry(name.to_string())
                .or_insert_with(SkillResults::new)
                .insert(*layer, lr);
        }
        results
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = fingerprint([("b.rs", &b"two"[..]), ("a.rs", &b"one"[..])]);
        let b = fingerprint([("a.rs", &b"one"[..]), ("b.rs", &b"two"[..])]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_separates_path_and_content() {
        let a = fingerprint([("ab", &b"c"[..])]);
        let b = fingerprint([("a", &b"bc"[..])]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_covers_every_score_input() {
        let paths: Vec<&str> = EVALUATOR_SOURCES.iter().map(|(path, _)| *path).collect();
        for expected in [
            "src/config/eval_config.rs",
            "src/discovery/manifest.rs",
            "src/discovery/mod.rs",
            "src/evaluators/mod.rs",
            "src/models.rs",
            "src/scoring/aggregate.rs",
        ] {
            assert!(paths.contains(&expected), "{expected} not hashed");
        }
        let mut sorted = paths.clone();
        sorted.sort_unstable();
        assert_eq!(paths, sorted);
        assert!(EVALUATOR_SOURCES.iter().all(|(_, src)| !src.is_empty()));
    }

    #[test]
    fn test_evaluator_version_is_stable() {
        assert_eq!(evaluator_version(), evaluator_version());
        assert_eq!(evaluator_version().len(), 12);
    }

    #[test]
    fn test_build_snapshot() {
        let results = results_with(&[
            ("alpha", LayerId::L1, 80.0),
            ("alpha", LayerId::L2, 60.0),
            ("beta", LayerId::L1, 50.0),
        ]);
        let eco = EcosystemResult {
            overall_score: 72.25,
            ..Default::default()
        };
        let snap = build_snapshot(&results, Some(&eco), Some("abc123def456"), &LayerWeights::default())
            .unwrap();

        assert_eq!(snap.evaluator_version, "abc123def456");
        assert_eq!(snap.summary.skill_count, 2);
        // alpha: (80*0.20 + 60*0.15) / 0.35 = 71.43
        assert_eq!(snap.skills["alpha"].weighted, 71.4);
        assert_eq!(snap.skills["alpha"].layers[&LayerId::L2], 60.0);
        assert_eq!(snap.skills["beta"].weighted, 50.0);
        assert_eq!(snap.summary.weighted_average, 60.7);
        assert_eq!(snap.ecosystem, Some(EcosystemSnapshot { overall_score: 72.2 }));
        assert!(chrono::NaiveDateTime::parse_from_str(&snap.timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[test]
    fn test_build_snapshot_empty() {
        let snap = build_snapshot(&EvaluationResults::new(), None, None, &LayerWeights::default())
            .unwrap();
        assert_eq!(snap.summary.weighted_average, 0.0);
        assert_eq!(snap.evaluator_version, evaluator_version());
        assert!(snap.ecosystem.is_none());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let results = results_with(&[("alpha", LayerId::L1, 80.0)]);
        let snap = build_snapshot(&results, None, Some("v"), &LayerWeights::default()).unwrap();
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["skills"]["alpha"]["layers"]["L1"], 80.0);
        assert_eq!(value["summary"]["skill_count"], 1);
        assert!(value.get("ecosystem").is_none());
    }
}
