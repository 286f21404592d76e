//! Cross-package ecosystem analysis
//!
//! Four checks over the whole package set: one-way bridge references,
//! command-line flag naming, pipeline isolation, and keyword health across
//! every package's triggers.

use super::activation::is_generic;
use super::{pct, python_files, round_score};
use crate::models::{EcosystemMetric, EcosystemResult, SkillMetadata};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

static ADD_ARGUMENT: OnceLock<Regex> = OnceLock::new();

fn add_argument() -> &'static Regex {
    ADD_ARGUMENT.get_or_init(|| {
        Regex::new(r#"add_argument\(\s*['"](-{1,2}[\w-]+)['"]"#).expect("valid regex")
    })
}

/// Long/short flag pairs that should travel together
const FLAG_PAIRS: [(&str, &str); 3] = [("--format", "-f"), ("--verbose", "-v"), ("--output", "-o")];

/// Evaluate the whole package set.
///
/// Metrics scoring below 60% of their maximum become recommendations.
pub fn evaluate_ecosystem(skills: &[SkillMetadata]) -> EcosystemResult {
    let mut result = EcosystemResult {
        metrics: vec![
            check_bridge_connectivity(skills),
            check_cli_consistency(skills),
            check_pipeline_coverage(skills),
            check_trigger_ecosystem_health(skills),
        ],
        ..Default::default()
    };
    result.compute_score();
    result.recommendations = result
        .metrics
        .iter()
        .filter(|m| m.score < m.max_score * 0.6)
        .map(|m| format!("{}: {}", m.name, m.details))
        .collect();
    result
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == ext))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// `bridges/**/*.py`, `bridges/**/*.md`, then top-level `scripts/bridge*.py`
fn bridge_files(skill: &SkillMetadata) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let bridges_dir = skill.bridges_dir();
    if bridges_dir.is_dir() {
        files.extend(files_with_extension(&bridges_dir, "py"));
        files.extend(files_with_extension(&bridges_dir, "md"));
    }
    if let Ok(entries) = std::fs::read_dir(skill.scripts_dir()) {
        let mut scripts: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy())
                    .is_some_and(|n| n.starts_with("bridge") && n.ends_with(".py"))
            })
            .collect();
        scripts.sort();
        files.extend(scripts);
    }
    files
}

/// Bridges whose target does not link back (25 points, -3 per one-way link)
pub fn check_bridge_connectivity(skills: &[SkillMetadata]) -> EcosystemMetric {
    let by_dir: BTreeMap<String, &SkillMetadata> =
        skills.iter().map(|s| (s.dir_name(), s)).collect();
    let mut affected = Vec::new();

    for skill in skills {
        let own_dir = skill.dir_name();
        for path in bridge_files(skill) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let content = content.to_lowercase();
            for (other_dir, other) in &by_dir {
                if *other_dir == own_dir || !content.contains(&other_dir.to_lowercase()) {
                    continue;
                }
                if !other.pipeline_targets.contains(&own_dir) {
                    affected.push(format!("{}→{}", skill.name, other_dir));
                }
            }
        }
    }

    let score = 25.0 - 3.0 * affected.len() as f64;
    let details = if affected.is_empty() {
        "all bridge links are bidirectional".to_string()
    } else {
        let shown: Vec<&str> = affected.iter().take(5).map(String::as_str).collect();
        format!("{} one-way links: {}", affected.len(), shown.join(", "))
    };
    EcosystemMetric::new("bridge_connectivity", score, 25.0, details, affected)
}

/// Long/short flag naming consistency (25 points)
pub fn check_cli_consistency(skills: &[SkillMetadata]) -> EcosystemMetric {
    let mut flag_usage: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for skill in skills {
        let scripts_dir = skill.scripts_dir();
        if !scripts_dir.is_dir() {
            continue;
        }
        for path in python_files(&scripts_dir) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for cap in add_argument().captures_iter(&content) {
                flag_usage
                    .entry(cap[1].to_string())
                    .or_default()
                    .insert(skill.name.clone());
            }
        }
    }

    let shared = flag_usage.values().filter(|users| users.len() >= 2).count();
    if shared == 0 {
        return EcosystemMetric::new(
            "cli_consistency",
            15.0,
            25.0,
            "no shared flags (nothing to compare)",
            Vec::new(),
        );
    }

    let inconsistencies: Vec<String> = FLAG_PAIRS
        .iter()
        .filter(|(long, short)| match (flag_usage.get(*long), flag_usage.get(*short)) {
            (Some(l), Some(s)) => l != s,
            _ => false,
        })
        .map(|(long, short)| format!("{long}/{short}"))
        .collect();

    let mut details = vec![format!("{shared} shared flags")];
    if inconsistencies.is_empty() {
        details.push("naming consistent".to_string());
    } else {
        details.push(format!("inconsistent: {}", inconsistencies.join(", ")));
    }

    EcosystemMetric::new(
        "cli_consistency",
        25.0 - 5.0 * inconsistencies.len() as f64,
        25.0,
        details.join("; "),
        inconsistencies,
    )
}

/// Share of packages that take part in at least one pipeline (25 points)
pub fn check_pipeline_coverage(skills: &[SkillMetadata]) -> EcosystemMetric {
    let by_dir: HashMap<String, &SkillMetadata> =
        skills.iter().map(|s| (s.dir_name(), s)).collect();

    let mut connected: BTreeSet<&str> = BTreeSet::new();
    for skill in skills.iter().filter(|s| !s.pipeline_targets.is_empty()) {
        connected.insert(&skill.name);
        for target in &skill.pipeline_targets {
            if let Some(target_skill) = by_dir.get(target) {
                connected.insert(&target_skill.name);
            }
        }
    }

    let isolated: Vec<String> = skills
        .iter()
        .filter(|s| !connected.contains(s.name.as_str()))
        .map(|s| s.name.clone())
        .collect();
    let coverage = if skills.is_empty() {
        0.0
    } else {
        connected.len() as f64 / skills.len() as f64
    };

    let mut details = vec![format!(
        "connected {}/{} ({})",
        connected.len(),
        skills.len(),
        pct(coverage)
    )];
    if !isolated.is_empty() {
        details.push(format!("isolated: {}", isolated.join(", ")));
    }

    EcosystemMetric::new(
        "pipeline_coverage",
        round_score(coverage * 25.0),
        25.0,
        details.join("; "),
        isolated,
    )
}

/// Keyword collisions and generic keywords across all packages (25 points)
pub fn check_trigger_ecosystem_health(skills: &[SkillMetadata]) -> EcosystemMetric {
    // First-seen order, with the number of uses
    let mut order: Vec<String> = Vec::new();
    let mut uses: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    let mut generic = 0usize;

    for kw in skills.iter().flat_map(|s| &s.triggers.keywords) {
        let lower = kw.to_lowercase();
        total += 1;
        if is_generic(&lower) {
            generic += 1;
        }
        let count = uses.entry(lower.clone()).or_insert(0);
        if *count == 0 {
            order.push(lower);
        }
        *count += 1;
    }

    let overlapping: Vec<String> = order.into_iter().filter(|k| uses[k] >= 2).collect();
    let overlap_ratio = if uses.is_empty() {
        0.0
    } else {
        overlapping.len() as f64 / uses.len() as f64
    };
    let generic_ratio = if total == 0 {
        0.0
    } else {
        generic as f64 / total as f64
    };

    let mut score: f64 = 25.0;
    let mut details = Vec::new();
    if overlap_ratio > 0.2 {
        score -= 10.0;
        details.push(format!("{} overlapping keywords ({})", overlapping.len(), pct(overlap_ratio)));
    } else if overlap_ratio > 0.1 {
        score -= 5.0;
        details.push(format!("{} overlapping keywords ({})", overlapping.len(), pct(overlap_ratio)));
    } else {
        details.push(format!("low keyword overlap ({})", pct(overlap_ratio)));
    }

    if generic_ratio > 0.3 {
        score -= 5.0;
        details.push(format!("high generic keyword share ({})", pct(generic_ratio)));
    } else {
        details.push(format!("generic keyword share ok ({})", pct(generic_ratio)));
    }

    EcosystemMetric::new(
        "trigger_ecosystem_health",
        score,
        25.0,
        details.join("; "),
        overlapping.into_iter().take(5).collect(),
    )
}
