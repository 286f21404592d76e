//! L1: structural integrity
//!
//! Manifest field completeness, directory inventory, and portability of
//! script paths.

use super::{read_scripts, EvalContext, LayerEvaluator};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static HARDCODED_PATH: OnceLock<Regex> = OnceLock::new();

fn hardcoded_path() -> &'static Regex {
    HARDCODED_PATH.get_or_init(|| Regex::new(r#"["'/](Users|home|mnt)/\w+/"#).expect("valid regex"))
}

/// Markers of paths built relative to the package instead of hard-coded
const PORTABLE_PATH_MARKERS: [&str; 3] = ["Path(__file__)", "SKILLS_ROOT", "skill_paths"];

pub struct StructuralEvaluator;

impl LayerEvaluator for StructuralEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L1
    }

    fn metrics(&self, skill: &SkillMetadata, _ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        Ok(vec![
            check_yaml_validity(skill),
            check_directory_structure(skill),
            check_resource_independence(skill),
        ])
    }
}

/// Front-matter completeness (30 points)
pub fn check_yaml_validity(skill: &SkillMetadata) -> MetricResult {
    let mut score = 0.0;
    let mut details = Vec::new();

    if !skill.name.is_empty() && skill.name != skill.dir_name() {
        score += 10.0;
        details.push("name field present".to_string());
    } else if !skill.name.is_empty() {
        score += 5.0;
        details.push("name field present (same as directory)".to_string());
    } else {
        details.push("name field missing".to_string());
    }

    if skill.description.is_empty() {
        details.push("description field missing".to_string());
    } else {
        score += 10.0;
        details.push("description field present".to_string());
    }

    let n = skill.triggers.keywords.len();
    if n > 0 {
        score += 10.0;
        details.push(format!("{n} triggers extracted"));
    } else {
        details.push("no trigger keywords".to_string());
    }

    MetricResult::new("yaml_validity", score, 30.0, details.join("; "), score >= 20.0)
}

/// Directory inventory (40 points, capped)
pub fn check_directory_structure(skill: &SkillMetadata) -> MetricResult {
    let mut score: f64 = 10.0;
    let mut details = vec!["SKILL.md present".to_string()];

    if skill.has_scripts_dir {
        score += 15.0;
        details.push(format!("scripts/ ({} files)", skill.script_files.len()));
    } else {
        details.push("scripts/ missing".to_string());
    }

    if skill.has_references_dir {
        score += 10.0;
        details.push(format!("references/ ({} files)", skill.reference_files.len()));
    } else {
        details.push("references/ missing".to_string());
    }

    if skill.has_tests_dir {
        score += 5.0;
        details.push("tests/ present".to_string());
    }

    if skill.has_design_decision {
        score += 3.0;
        details.push("DESIGN_DECISION.md present".to_string());
    }

    MetricResult::new(
        "directory_structure",
        score.min(40.0),
        40.0,
        details.join("; "),
        score >= 20.0,
    )
}

/// Hard-coded absolute paths in scripts (30 points)
pub fn check_resource_independence(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return MetricResult::new(
            "resource_independence",
            15.0,
            30.0,
            "no scripts/, partial credit",
            true,
        );
    }

    let mut score: f64 = 30.0;
    let mut violations = Vec::new();
    let mut uses_portable_paths = false;

    for script in read_scripts(skill, false) {
        if hardcoded_path().is_match(&script.content) {
            score -= 10.0;
            violations.push(script.file_name());
        }
        if PORTABLE_PATH_MARKERS.iter().any(|m| script.content.contains(m)) {
            uses_portable_paths = true;
        }
    }

    let mut details = Vec::new();
    if uses_portable_paths {
        details.push("relative paths / SKILLS_ROOT in use".to_string());
    } else {
        score -= 5.0;
        details.push("no relative paths / SKILLS_ROOT found".to_string());
    }
    if violations.is_empty() {
        details.push("no hard-coded absolute paths".to_string());
    } else {
        details.push(format!("hard-coded paths in: {}", violations.join(", ")));
    }

    let score = score.max(0.0);
    MetricResult::new(
        "resource_independence",
        score,
        30.0,
        details.join("; "),
        score >= 15.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::tests::SkillFixture;

    #[test]
    fn test_yaml_validity_full_marks() {
        let skill = SkillFixture::new("pdf-tools")
            .manifest("---\nname: PDF Tools\ndescription: PDFs. Triggers on \"pdf\".\n---\n")
            .load();
        let m = check_yaml_validity(&skill);
        assert_eq!(m.score, 30.0);
        assert!(m.passed);
    }

    #[test]
    fn test_yaml_validity_name_equals_dir() {
        let skill = SkillFixture::new("tool")
            .manifest("---\nname: tool\n---\n")
            .load();
        let m = check_yaml_validity(&skill);
        assert_eq!(m.score, 5.0);
        assert!(!m.passed);
    }

    #[test]
    fn test_directory_structure_capped() {
        let skill = SkillFixture::new("full")
            .manifest("---\nname: full\n---\n")
            .file("scripts/a.py", "")
            .file("references/r.md", "")
            .subdir("tests")
            .file("DESIGN_DECISION.md", "")
            .load();
        let m = check_directory_structure(&skill);
        assert_eq!(m.score, 40.0);
        assert!(m.passed);
    }

    #[test]
    fn test_directory_structure_manifest_only() {
        let skill = SkillFixture::new("bare").manifest("# bare").load();
        let m = check_directory_structure(&skill);
        assert_eq!(m.score, 10.0);
        assert!(!m.passed);
    }

    #[test]
    fn test_resource_independence_no_scripts() {
        let skill = SkillFixture::new("bare").manifest("# bare").load();
        let m = check_resource_independence(&skill);
        assert_eq!(m.score, 15.0);
        assert!(m.passed);
    }

    #[test]
    fn test_resource_independence_penalizes_hardcoded_paths() {
        let skill = SkillFixture::new("paths")
            .manifest("# x")
            .file("scripts/a.py", "DATA = \"/Users/alice/data.csv\"\n")
            .file("scripts/b.py", "ROOT = '/home/bob/x'\n")
            .file("scripts/__init__.py", "from pathlib import Path\nHERE = Path(__file__)\n")
            .load();
        let m = check_resource_independence(&skill);
        assert_eq!(m.score, 10.0);
        assert!(!m.passed);
        assert!(m.details.contains("a.py, b.py"));
    }

    #[test]
    fn test_resource_independence_floor_at_zero() {
        let skill = SkillFixture::new("paths")
            .manifest("# x")
            .file("scripts/a.py", "'/mnt/x/y'")
            .file("scripts/b.py", "'/mnt/x/y'")
            .file("scripts/c.py", "'/mnt/x/y'")
            .load();
        let m = check_resource_independence(&skill);
        assert_eq!(m.score, 0.0);
    }
}
