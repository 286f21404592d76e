//! L4: workflow fidelity
//!
//! Pattern checks over the full manifest text for staged workflows and for
//! the markers that keep an agent on plan.

use super::{EvalContext, LayerEvaluator};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static PHASE: OnceLock<Regex> = OnceLock::new();
static STEP: OnceLock<Regex> = OnceLock::new();
static PIPELINE: OnceLock<Regex> = OnceLock::new();
static CONDITIONAL: OnceLock<Regex> = OnceLock::new();
static DIAGRAM: OnceLock<Regex> = OnceLock::new();
static ROUTING_TABLE: OnceLock<Regex> = OnceLock::new();
static CHECKLIST: OnceLock<Regex> = OnceLock::new();
static SELF_CHECK: OnceLock<Regex> = OnceLock::new();
static TRANSITION: OnceLock<Regex> = OnceLock::new();

fn phase_re() -> &'static Regex {
    PHASE.get_or_init(|| Regex::new(r"[Pp]hase\s+\d").expect("valid regex"))
}

fn step_re() -> &'static Regex {
    STEP.get_or_init(|| Regex::new(r"[Ss]tep\s+\d").expect("valid regex"))
}

fn pipeline_re() -> &'static Regex {
    PIPELINE.get_or_init(|| Regex::new(r"[Pp]ipeline|파이프라인").expect("valid regex"))
}

fn conditional_re() -> &'static Regex {
    CONDITIONAL.get_or_init(|| Regex::new(r"(?i)건너뛰기|skip|optional|선택|조건").expect("valid regex"))
}

fn diagram_re() -> &'static Regex {
    DIAGRAM.get_or_init(|| Regex::new(r"──►|──>|───▶|→.*→").expect("valid regex"))
}

fn routing_table_re() -> &'static Regex {
    ROUTING_TABLE.get_or_init(|| Regex::new(r"\|.*커맨드.*\||\|.*[Cc]ommand.*\||\|.*모드.*\|").expect("valid regex"))
}

fn checklist_re() -> &'static Regex {
    CHECKLIST.get_or_init(|| Regex::new(r"- \[[ x]\]").expect("valid regex"))
}

fn self_check_re() -> &'static Regex {
    SELF_CHECK.get_or_init(|| Regex::new(r"(?i)자가\s*점검|self[- ]?check").expect("valid regex"))
}

fn transition_re() -> &'static Regex {
    TRANSITION.get_or_init(|| Regex::new(r"(?i)전환|transition|다음\s*단계|next\s*phase").expect("valid regex"))
}

pub struct WorkflowEvaluator;

impl LayerEvaluator for WorkflowEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L4
    }

    fn metrics(&self, skill: &SkillMetadata, _ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        Ok(vec![
            check_workflow_structure(skill),
            check_plan_adherence(skill),
        ])
    }
}

fn distinct_matches<'t>(re: &Regex, text: &'t str) -> BTreeSet<&'t str> {
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Staged workflow structure (60 points)
pub fn check_workflow_structure(skill: &SkillMetadata) -> MetricResult {
    let text = skill.manifest_text.as_str();
    let mut score: f64 = 0.0;
    let mut details = Vec::new();

    let phases = distinct_matches(phase_re(), text);
    let steps = distinct_matches(step_re(), text);
    let has_pipeline = pipeline_re().is_match(text);
    let items: BTreeSet<&str> = phases.union(&steps).copied().collect();

    if !items.is_empty() || has_pipeline {
        score += 20.0;
        details.push(format!(
            "workflow detected (Phase:{}, Step:{}, Pipeline:{})",
            phases.len(),
            steps.len(),
            if has_pipeline { "Y" } else { "N" }
        ));
    } else {
        details.push("no workflow structure".to_string());
    }

    if items.len() >= 3 {
        score += 15.0;
        details.push(format!("3+ stages ({})", items.len()));
    }
    if items.len() >= 5 {
        score += 10.0;
        details.push("5+ stages".to_string());
    }

    if conditional_re().is_match(text) {
        score += 15.0;
        details.push("conditional execution".to_string());
    }
    if diagram_re().is_match(text) {
        score += 10.0;
        details.push("pipeline diagram".to_string());
    }
    if text.contains("```mermaid") {
        score += 5.0;
        details.push("mermaid diagram".to_string());
    }
    if routing_table_re().is_match(text) {
        score += 5.0;
        details.push("table routing".to_string());
    }

    MetricResult::new(
        "workflow_structure",
        score.min(60.0),
        60.0,
        details.join("; "),
        score >= 20.0,
    )
}

/// Plan-adherence markers (40 points)
pub fn check_plan_adherence(skill: &SkillMetadata) -> MetricResult {
    let text = skill.manifest_text.as_str();
    let mut score: f64 = 0.0;
    let mut details = Vec::new();

    let checklists = checklist_re().find_iter(text).count();
    if checklists > 0 {
        score += 8.0;
        details.push(format!("{checklists} checklist items"));
    }
    if self_check_re().is_match(text) {
        score += 10.0;
        details.push("self-check section".to_string());
    }
    if skill.has_when_to_use {
        score += 5.0;
        details.push("When to Use section".to_string());
    }
    if skill.has_dont_use {
        score += 5.0;
        details.push("Don't Use section".to_string());
    }
    if transition_re().is_match(text) {
        score += 3.0;
        details.push("stage transition criteria".to_string());
    }
    if skill.has_quick_start {
        score += 3.0;
        details.push("Quick Start section".to_string());
    }
    if skill.has_llm_judgment_guide {
        score += 4.0;
        details.push("LLM judgment guide".to_string());
    }
    if skill.has_prerequisites {
        score += 2.0;
        details.push("Prerequisites section".to_string());
    }

    if details.is_empty() {
        details.push("no plan-adherence markers".to_string());
    }

    MetricResult::new(
        "plan_adherence",
        score.min(40.0),
        40.0,
        details.join("; "),
        score >= 10.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(text: &str) -> SkillMetadata {
        SkillMetadata {
            manifest_text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_workflow_structure_empty() {
        let m = check_workflow_structure(&manifest("# Tool\nJust a tool.\n"));
        assert_eq!(m.score, 0.0);
        assert!(!m.passed);
        assert_eq!(m.details, "no workflow structure");
    }

    #[test]
    fn test_workflow_structure_rich() {
        let text = "\
## Phase 1\n## Phase 2\n## Step 1\nStep 2 and Step 3\n\
Phase 2 can be skipped.\n\
A ──► B ──► C\n\
```mermaid\ngraph TD\n```\n\
| Command | Mode |\n";
        let m = check_workflow_structure(&manifest(text));
        // 20 + 15 + 10 + 15 + 10 + 5 + 5 = 80, capped
        assert_eq!(m.score, 60.0);
        assert!(m.passed);
        assert!(m.details.contains("Phase:2, Step:3, Pipeline:N"));
    }

    #[test]
    fn test_workflow_structure_pipeline_only() {
        let m = check_workflow_structure(&manifest("Part of the 파이프라인."));
        assert_eq!(m.score, 20.0);
        assert!(m.passed);
    }

    #[test]
    fn test_plan_adherence_markers() {
        let mut skill = manifest("- [ ] one\n- [x] two\n## Self-check\nMove to next phase when done.\n");
        skill.has_when_to_use = true;
        skill.has_prerequisites = true;
        let m = check_plan_adherence(&skill);
        // 8 + 10 + 5 + 3 + 2
        assert_eq!(m.score, 28.0);
        assert!(m.passed);
        assert!(m.details.starts_with("2 checklist items"));
    }

    #[test]
    fn test_plan_adherence_none() {
        let m = check_plan_adherence(&manifest("plain"));
        assert_eq!(m.score, 0.0);
        assert_eq!(m.details, "no plan-adherence markers");
        assert!(!m.passed);
    }
}
