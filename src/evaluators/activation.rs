//! L2: activation reliability
//!
//! Scores trigger keywords: how many, how specific, how much they collide
//! with sibling packages, and (optionally) how well they classify a labeled
//! query set.

use super::{pct, round_score, EvalContext, EvaluatorNeeds, LayerEvaluator};
use crate::evaluators::benchmarks::{BenchmarkSource, TriggerBenchmark};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::Result;
use std::collections::BTreeSet;

/// Keywords too generic to route a request to any one package
pub const GENERIC_KEYWORDS: [&str; 11] = [
    "분석", "analysis", "도와줘", "help", "확인", "check", "보여줘", "알려줘", "실행", "run", "해줘",
];

pub fn is_generic(keyword: &str) -> bool {
    let lower = keyword.to_lowercase();
    GENERIC_KEYWORDS.contains(&lower.as_str())
}

pub struct ActivationEvaluator;

impl LayerEvaluator for ActivationEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L2
    }

    fn needs(&self) -> EvaluatorNeeds {
        EvaluatorNeeds {
            peers: true,
            benchmarks: true,
        }
    }

    fn metrics(&self, skill: &SkillMetadata, ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        let mut metrics = vec![
            check_trigger_count(skill),
            check_trigger_specificity(skill),
            check_trigger_overlap(skill, ctx.peers),
        ];
        if let Some(source) = ctx.benchmarks {
            let bench = check_trigger_benchmark(skill, source)?;
            if bench.is_applicable() {
                metrics.push(bench);
            }
        }
        Ok(metrics)
    }
}

/// Trigger keyword count (15 points). 8-15 keywords is the optimal band.
pub fn check_trigger_count(skill: &SkillMetadata) -> MetricResult {
    let n = skill.triggers.keywords.len();
    let (score, label) = match n {
        0 => (0.0, "none".to_string()),
        1..=2 => (5.0, format!("{n} (too few)")),
        3..=7 => (10.0, format!("{n}")),
        8..=15 => (15.0, format!("{n} (optimal range)")),
        _ => (10.0, format!("{n} (too many, focus diluted)")),
    };
    MetricResult::new(
        "trigger_count",
        score,
        15.0,
        format!("keywords {label}; source={}", skill.triggers.source),
        n > 0,
    )
}

/// Share of domain-specific keywords (15 points)
pub fn check_trigger_specificity(skill: &SkillMetadata) -> MetricResult {
    let keywords = &skill.triggers.keywords;
    if keywords.is_empty() {
        return MetricResult::new("trigger_specificity", 0.0, 15.0, "no keywords", false);
    }

    let generic = keywords.iter().filter(|kw| is_generic(kw)).count();
    let specific = keywords.len() - generic;
    let ratio = specific as f64 / keywords.len() as f64;

    let score = if ratio >= 0.8 {
        15.0
    } else if ratio >= 0.6 {
        10.0
    } else if ratio >= 0.4 {
        7.0
    } else {
        3.0
    };

    MetricResult::new(
        "trigger_specificity",
        score,
        15.0,
        format!("domain-specific: {specific}/{} ({})", keywords.len(), pct(ratio)),
        ratio >= 0.4,
    )
}

fn lowered_keywords(skill: &SkillMetadata) -> BTreeSet<String> {
    skill
        .triggers
        .keywords
        .iter()
        .map(|kw| kw.to_lowercase())
        .collect()
}

/// Keyword collisions with sibling packages (10 points)
pub fn check_trigger_overlap(skill: &SkillMetadata, peers: &[SkillMetadata]) -> MetricResult {
    let mine = lowered_keywords(skill);
    if mine.is_empty() {
        return MetricResult::new("trigger_overlap", 0.0, 10.0, "no keywords", false);
    }

    let mut shared_total: BTreeSet<String> = BTreeSet::new();
    let mut overlap_names = Vec::new();
    for other in peers.iter().filter(|o| o.name != skill.name) {
        let shared: Vec<String> = lowered_keywords(other).intersection(&mine).cloned().collect();
        if !shared.is_empty() {
            overlap_names.push(format!("{}({})", other.name, shared.len()));
            shared_total.extend(shared);
        }
    }

    if overlap_names.is_empty() {
        return MetricResult::new("trigger_overlap", 10.0, 10.0, "no overlap with other skills", true);
    }

    let ratio = shared_total.len() as f64 / mine.len() as f64;
    let score = if ratio <= 0.1 {
        8.0
    } else if ratio <= 0.3 {
        5.0
    } else {
        2.0
    };

    MetricResult::new(
        "trigger_overlap",
        score,
        10.0,
        format!(
            "{} shared ({}): {}",
            shared_total.len(),
            pct(ratio),
            overlap_names.join(", ")
        ),
        ratio <= 0.3,
    )
}

/// Predicted match: the query contains any keyword (case-insensitive).
fn query_matches(query: &str, keywords: &BTreeSet<String>) -> bool {
    let query = query.to_lowercase();
    keywords.iter().any(|kw| query.contains(kw.as_str()))
}

fn score_trigger_benchmark(skill: &SkillMetadata, bench: &TriggerBenchmark) -> MetricResult {
    let keywords = lowered_keywords(skill);
    let true_positives = bench
        .positive
        .iter()
        .filter(|q| query_matches(&q.query, &keywords))
        .count();
    let true_negatives = bench
        .negative
        .iter()
        .filter(|q| !query_matches(&q.query, &keywords))
        .count();
    let total = bench.positive.len() + bench.negative.len();

    if total == 0 {
        return MetricResult::not_applicable("trigger_benchmark", "benchmark entry is empty");
    }

    let correct = true_positives + true_negatives;
    let ratio = correct as f64 / total as f64;
    MetricResult::new(
        "trigger_benchmark",
        round_score(ratio * 60.0),
        60.0,
        format!("correct {correct}/{total} ({})", pct(ratio)),
        ratio >= 0.6,
    )
}

/// Keyword classification accuracy on labeled queries (60 points, or not applicable)
pub fn check_trigger_benchmark(
    skill: &SkillMetadata,
    source: &BenchmarkSource,
) -> Result<MetricResult> {
    Ok(match source.trigger_queries(&skill.name)? {
        Some(bench) => score_trigger_benchmark(skill, &bench),
        None => MetricResult::not_applicable(
            "trigger_benchmark",
            format!(
                "no benchmark ({}/{})",
                source.dir().display(),
                super::benchmarks::TRIGGER_QUERIES
            ),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriggerInfo;

    fn skill_with(name: &str, keywords: &[&str]) -> SkillMetadata {
        SkillMetadata {
            name: name.to_string(),
            triggers: TriggerInfo {
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn keywords(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("kw{i}")).collect()
    }

    #[test]
    fn test_trigger_count_bands() {
        let cases = [(0, 0.0, false), (1, 5.0, true), (2, 5.0, true), (3, 10.0, true),
            (7, 10.0, true), (8, 15.0, true), (15, 15.0, true), (16, 10.0, true), (40, 10.0, true)];
        for (n, expected, passed) in cases {
            let mut skill = SkillMetadata::default();
            skill.triggers.keywords = keywords(n);
            let m = check_trigger_count(&skill);
            assert_eq!(m.score, expected, "n={n}");
            assert_eq!(m.passed, passed, "n={n}");
        }
    }

    #[test]
    fn test_trigger_count_reports_source() {
        let skill = skill_with("s", &["pdf"]);
        assert!(check_trigger_count(&skill).details.ends_with("source=yaml_description"));
    }

    #[test]
    fn test_specificity_generic_heavy() {
        let skill = skill_with("s", &["help", "Run", "check", "pdf"]);
        let m = check_trigger_specificity(&skill);
        assert_eq!(m.score, 3.0);
        assert!(!m.passed);
        assert!(m.details.contains("1/4 (25%)"));
    }

    #[test]
    fn test_specificity_all_specific() {
        let skill = skill_with("s", &["pdf", "merge"]);
        assert_eq!(check_trigger_specificity(&skill).score, 15.0);
    }

    #[test]
    fn test_overlap_none() {
        let me = skill_with("a", &["pdf"]);
        let peers = vec![me.clone(), skill_with("b", &["csv"])];
        let m = check_trigger_overlap(&me, &peers);
        assert_eq!(m.score, 10.0);
        assert!(m.passed);
    }

    #[test]
    fn test_overlap_heavy() {
        let me = skill_with("a", &["pdf", "merge"]);
        let peers = vec![me.clone(), skill_with("b", &["PDF"]), skill_with("c", &["merge", "pdf"])];
        let m = check_trigger_overlap(&me, &peers);
        assert_eq!(m.score, 2.0);
        assert!(!m.passed);
        assert!(m.details.contains("b(1), c(2)"));
    }

    #[test]
    fn test_overlap_light() {
        let mut kws: Vec<String> = keywords(10);
        kws.push("shared".into());
        let mut me = SkillMetadata {
            name: "a".into(),
            ..Default::default()
        };
        me.triggers.keywords = kws;
        let peers = vec![skill_with("b", &["shared"])];
        // 1 of 11 shared: ratio 0.09
        assert_eq!(check_trigger_overlap(&me, &peers).score, 8.0);
    }

    #[test]
    fn test_benchmark_absent_is_not_applicable() {
        let dir = tempfile::tempdir().unwrap();
        let source = BenchmarkSource::new(dir.path());
        let skill = skill_with("s", &["pdf"]);
        let m = check_trigger_benchmark(&skill, &source).unwrap();
        assert_eq!(m.max_score, 0.0);
        assert!(m.passed);

        let ctx = EvalContext::new(&[], Some(&source));
        let metrics = ActivationEvaluator.metrics(&skill, &ctx).unwrap();
        assert_eq!(metrics.len(), 3);
    }

    #[test]
    fn test_benchmark_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(super::super::benchmarks::TRIGGER_QUERIES);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"s": {
                "positive": [{"query": "Merge my PDF"}, {"query": "combine files"}],
                "negative": [{"query": "weather today"}, {"query": "pdf weather"}]
            }}"#,
        )
        .unwrap();
        let source = BenchmarkSource::new(dir.path());
        let skill = skill_with("s", &["pdf"]);

        let m = check_trigger_benchmark(&skill, &source).unwrap();
        // 1 TP + 1 TN out of 4
        assert_eq!(m.score, 30.0);
        assert_eq!(m.max_score, 60.0);
        assert!(!m.passed);

        let ctx = EvalContext::new(&[], Some(&source));
        let result = ActivationEvaluator.evaluate(&skill, &ctx).unwrap();
        assert_eq!(result.metrics.len(), 4);
    }
}
