//! L3: retrieval quality
//!
//! Static checks over `references/`: how many documents, which kinds, whether
//! they exist and parse, and how much detail stays out of the manifest.

use super::{pct, EvalContext, LayerEvaluator};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::Result;

/// Reference kinds inferred from file names, in report order
const REFERENCE_TYPES: [(&str, &[&str]); 5] = [
    ("api", &["api"]),
    ("example", &["example", "sample"]),
    ("integration", &["integrat", "bridge"]),
    ("output", &["output", "format", "schema"]),
    ("testing", &["test"]),
];

pub struct RetrievalEvaluator;

impl LayerEvaluator for RetrievalEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L3
    }

    fn metrics(&self, skill: &SkillMetadata, _ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        Ok(vec![
            check_reference_count(skill),
            check_reference_type_coverage(skill),
            check_progressive_disclosure(skill),
            check_reference_freshness(skill),
            check_reference_content_validity(skill),
        ])
    }
}

/// Number of reference documents (20 points)
pub fn check_reference_count(skill: &SkillMetadata) -> MetricResult {
    let n = skill.reference_files.len();
    let score = match n {
        0 => 0.0,
        1 => 10.0,
        2 => 15.0,
        _ => 20.0,
    };
    MetricResult::new(
        "reference_count",
        score,
        20.0,
        format!("{n} files in references/"),
        n > 0,
    )
}

/// Distinct reference kinds, 5 points each (20 points)
pub fn check_reference_type_coverage(skill: &SkillMetadata) -> MetricResult {
    let lowered: Vec<String> = skill
        .reference_files
        .iter()
        .map(|f| f.to_lowercase())
        .collect();
    let found: Vec<&str> = REFERENCE_TYPES
        .iter()
        .filter(|(_, needles)| {
            lowered
                .iter()
                .any(|name| needles.iter().any(|n| name.contains(n)))
        })
        .map(|(kind, _)| *kind)
        .collect();

    let listing = if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    };
    MetricResult::new(
        "reference_type_coverage",
        (found.len() as f64 * 5.0).min(20.0),
        20.0,
        format!("{} types: {listing}", found.len()),
        !found.is_empty(),
    )
}

/// Manifest brevity (10 points)
pub fn check_progressive_disclosure(skill: &SkillMetadata) -> MetricResult {
    let lines = skill.skill_md_lines;
    let (score, label) = if lines < 200 {
        (10.0, "concise")
    } else if lines < 300 {
        (8.0, "adequate")
    } else if lines < 500 {
        (5.0, "somewhat long")
    } else {
        (2.0, "too long, move detail to references/")
    };
    MetricResult::new(
        "progressive_disclosure",
        score,
        10.0,
        format!("{lines} lines ({label})"),
        lines < 500,
    )
}

/// Declared reference files that exist on disk (20 points)
pub fn check_reference_freshness(skill: &SkillMetadata) -> MetricResult {
    let refs_dir = skill.references_dir();
    if !refs_dir.is_dir() || skill.reference_files.is_empty() {
        return MetricResult::new("reference_freshness", 0.0, 20.0, "no references/", false);
    }

    let total = skill.reference_files.len();
    let existing = skill
        .reference_files
        .iter()
        .filter(|f| refs_dir.join(f).exists())
        .count();
    let ratio = existing as f64 / total as f64;

    let score = if existing == total {
        20.0
    } else if ratio >= 0.8 {
        15.0
    } else {
        (ratio * 20.0).floor()
    };

    MetricResult::new(
        "reference_freshness",
        score,
        20.0,
        format!("{existing}/{total} exist ({})", pct(ratio)),
        ratio >= 0.8,
    )
}

/// Reference content sanity (10 points)
///
/// JSON files must parse (3 each, capped at 6). Markdown files earn 2 with a
/// heading and at least 10 lines, or 1 with at least 5 lines (capped at 6).
/// Every non-blank file earns 1 (capped at 4).
pub fn check_reference_content_validity(skill: &SkillMetadata) -> MetricResult {
    let refs_dir = skill.references_dir();
    if !refs_dir.is_dir() || skill.reference_files.is_empty() {
        return MetricResult::new(
            "reference_content_validity",
            0.0,
            10.0,
            "no references/",
            false,
        );
    }

    let mut json_score = 0u32;
    let mut md_score = 0u32;
    let mut nonempty_score = 0u32;
    let mut problems = Vec::new();

    for name in &skill.reference_files {
        let Ok(content) = std::fs::read_to_string(refs_dir.join(name)) else {
            continue;
        };

        if !content.trim().is_empty() {
            nonempty_score += 1;
        }

        if name.ends_with(".json") {
            if serde_json::from_str::<serde_json::Value>(&content).is_ok() {
                json_score += 3;
            } else {
                problems.push(format!("{name}: invalid JSON"));
            }
        }

        if name.ends_with(".md") {
            let line_count = content.split('\n').count();
            let has_heading = content.split('\n').any(|l| l.starts_with('#'));
            if line_count >= 10 && has_heading {
                md_score += 2;
            } else if line_count >= 5 {
                md_score += 1;
            }
        }
    }

    let json_score = json_score.min(6);
    let md_score = md_score.min(6);
    let nonempty_score = nonempty_score.min(4);
    let score = (json_score + md_score + nonempty_score).min(10);

    let mut details = vec![format!(
        "json:{json_score} md:{md_score} nonempty:{nonempty_score}"
    )];
    details.extend(problems);

    MetricResult::new(
        "reference_content_validity",
        f64::from(score),
        10.0,
        details.join("; "),
        score >= 4,
    )
}
