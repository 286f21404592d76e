//! L6: validation coverage

use super::{python_files, read_scripts, EvalContext, LayerEvaluator};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static VERIFY_FLAG: OnceLock<Regex> = OnceLock::new();
static VERIFY_STEM: OnceLock<Regex> = OnceLock::new();
static SPECIFIC_EXCEPT: OnceLock<Regex> = OnceLock::new();
static OUTPUT_REF: OnceLock<Regex> = OnceLock::new();
static EXAMPLE_REF: OnceLock<Regex> = OnceLock::new();
static OUTPUT_FORMAT_DOC: OnceLock<Regex> = OnceLock::new();

fn verify_flag() -> &'static Regex {
    VERIFY_FLAG.get_or_init(|| Regex::new(r"--verify|--check|--validate").expect("valid regex"))
}

fn verify_stem() -> &'static Regex {
    VERIFY_STEM.get_or_init(|| Regex::new(r"(?i)check|valid|verif").expect("valid regex"))
}

fn specific_except() -> &'static Regex {
    SPECIFIC_EXCEPT.get_or_init(|| Regex::new(r"except\s+\w+").expect("valid regex"))
}

fn output_ref() -> &'static Regex {
    OUTPUT_REF.get_or_init(|| Regex::new(r"(?i)output|format|schema").expect("valid regex"))
}

fn example_ref() -> &'static Regex {
    EXAMPLE_REF.get_or_init(|| Regex::new(r"(?i)example|sample").expect("valid regex"))
}

fn output_format_doc() -> &'static Regex {
    OUTPUT_FORMAT_DOC
        .get_or_init(|| Regex::new(r"(?i)```json|출력\s*형식|output\s*format").expect("valid regex"))
}

pub struct ValidationEvaluator;

impl LayerEvaluator for ValidationEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L6
    }

    fn metrics(&self, skill: &SkillMetadata, _ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        Ok(vec![
            check_verification_infra(skill),
            check_error_handling(skill),
            check_faithfulness(skill),
        ])
    }
}

/// Tests, verification flags and checker scripts (50 points)
pub fn check_verification_infra(skill: &SkillMetadata) -> MetricResult {
    let mut score: f64 = 0.0;
    let mut details = Vec::new();

    if skill.has_tests_dir {
        score += 20.0;
        details.push("tests/ present".to_string());
    }

    let scripts_dir = skill.scripts_dir();
    if scripts_dir.is_dir() {
        if let Some(script) = read_scripts(skill, false)
            .into_iter()
            .find(|s| verify_flag().is_match(&s.content))
        {
            score += 15.0;
            details.push(format!("verification flag ({})", script.file_name()));
        }

        let checker = python_files(&scripts_dir).into_iter().find(|p| {
            p.file_stem()
                .is_some_and(|stem| verify_stem().is_match(&stem.to_string_lossy()))
        });
        if let Some(path) = checker {
            score += 15.0;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            details.push(format!("verification script ({name})"));
        }
    }

    if details.is_empty() {
        details.push("no verification infrastructure".to_string());
    }

    MetricResult::new(
        "verification_infra",
        score.min(50.0),
        50.0,
        details.join("; "),
        score >= 15.0,
    )
}

/// Error-handling idioms across all scripts (30 points)
pub fn check_error_handling(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return MetricResult::new("error_handling", 0.0, 30.0, "no scripts/", false);
    }

    let scripts = read_scripts(skill, false);
    let has_try = scripts.iter().any(|s| s.content.contains("try:"));
    let has_specific = scripts.iter().any(|s| specific_except().is_match(&s.content));
    let has_exit = scripts.iter().any(|s| s.content.contains("sys.exit"));

    let mut score = 0.0;
    let mut details = Vec::new();
    if has_try {
        score += 10.0;
        details.push("uses try/except");
    }
    if has_specific {
        score += 10.0;
        details.push("specific exception types");
    }
    if has_exit {
        score += 10.0;
        details.push("uses sys.exit");
    }
    if details.is_empty() {
        details.push("no error handling");
    }

    MetricResult::new("error_handling", score, 30.0, details.join("; "), score >= 10.0)
}

/// Output-format documentation and examples (20 points)
pub fn check_faithfulness(skill: &SkillMetadata) -> MetricResult {
    let mut score: f64 = 0.0;
    let mut details = Vec::new();

    if let Some(reference) = skill.reference_files.iter().find(|r| output_ref().is_match(r)) {
        score += 10.0;
        details.push(format!("output format doc ({reference})"));
    }
    if let Some(reference) = skill.reference_files.iter().find(|r| example_ref().is_match(r)) {
        score += 5.0;
        details.push(format!("example file ({reference})"));
    }
    if output_format_doc().is_match(&skill.manifest_text) {
        score += 5.0;
        details.push("output format described in SKILL.md".to_string());
    }

    if details.is_empty() {
        details.push("no faithfulness markers".to_string());
    }

    MetricResult::new(
        "faithfulness",
        score.min(20.0),
        20.0,
        details.join("; "),
        score >= 5.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::tests::SkillFixture;

    #[test]
    fn test_verification_infra_full() {
        let skill = SkillFixture::new("s")
            .manifest("# s")
            .subdir("tests")
            .file("scripts/__init__.py", "FLAGS = ['--verify']\n")
            .file("scripts/validate_output.py", "")
            .load();
        let m = check_verification_infra(&skill);
        assert_eq!(m.score, 50.0);
        assert!(m.passed);
        assert!(m.details.contains("verification flag (__init__.py)"));
        assert!(m.details.contains("verification script (validate_output.py)"));
    }

    #[test]
    fn test_verification_infra_none() {
        let skill = SkillFixture::new("s").manifest("# s").load();
        let m = check_verification_infra(&skill);
        assert_eq!(m.score, 0.0);
        assert_eq!(m.details, "no verification infrastructure");
        assert!(!m.passed);
    }

    #[test]
    fn test_error_handling() {
        let skill = SkillFixture::new("s")
            .manifest("# s")
            .file("scripts/a.py", "try:\n    run()\nexcept ValueError:\n    pass\n")
            .file("scripts/b.py", "import sys\nsys.exit(1)\n")
            .load();
        let m = check_error_handling(&skill);
        assert_eq!(m.score, 30.0);
        assert!(m.passed);
    }

    #[test]
    fn test_error_handling_bare_except_only() {
        let skill = SkillFixture::new("s")
            .manifest("# s")
            .file("scripts/a.py", "try:\n    run()\nexcept:\n    pass\n")
            .load();
        let m = check_error_handling(&skill);
        assert_eq!(m.score, 10.0);
        assert_eq!(m.details, "uses try/except");
    }

    #[test]
    fn test_error_handling_without_scripts() {
        let skill = SkillFixture::new("s").manifest("# s").load();
        let m = check_error_handling(&skill);
        assert_eq!(m.score, 0.0);
        assert!(!m.passed);
    }

    #[test]
    fn test_faithfulness() {
        let skill = SkillMetadata {
            reference_files: vec!["Output_Schema.json".into(), "samples.md".into()],
            manifest_text: "## Output Format\n".into(),
            ..Default::default()
        };
        let m = check_faithfulness(&skill);
        assert_eq!(m.score, 20.0);
        assert!(m.passed);

        let m = check_faithfulness(&SkillMetadata::default());
        assert_eq!(m.score, 0.0);
        assert_eq!(m.details, "no faithfulness markers");
    }
}
