//! L5: execution precision
//!
//! Static analysis of the package's Python scripts. `__init__.py` files are
//! skipped throughout this layer.

use super::benchmarks::{BenchmarkSource, ScriptBenchmark, SCRIPT_TESTS};
use super::complexity::{profile_source, FunctionProfile};
use super::{pct, read_scripts, round_score, EvalContext, EvaluatorNeeds, LayerEvaluator};
use crate::models::{LayerId, MetricResult, SkillMetadata};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::debug;

pub struct ExecutionEvaluator;

impl LayerEvaluator for ExecutionEvaluator {
    fn layer(&self) -> LayerId {
        LayerId::L5
    }

    fn needs(&self) -> EvaluatorNeeds {
        EvaluatorNeeds {
            peers: false,
            benchmarks: true,
        }
    }

    fn metrics(&self, skill: &SkillMetadata, ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
        let mut metrics = vec![
            check_script_count(skill),
            check_shebang(skill),
            check_cli_interface(skill),
            check_docstrings(skill),
            check_bridge_availability(skill),
            check_function_quality(skill),
            check_code_complexity(skill),
        ];
        if let Some(source) = ctx.benchmarks {
            let bench = check_script_benchmark(skill, source)?;
            if bench.is_applicable() {
                metrics.push(bench);
            }
        }
        Ok(metrics)
    }
}

fn no_scripts_dir(name: &str, max: f64) -> MetricResult {
    MetricResult::new(name, 0.0, max, "no scripts/", false)
}

/// Number of scripts (10 points)
pub fn check_script_count(skill: &SkillMetadata) -> MetricResult {
    let n = skill.script_files.len();
    MetricResult::new(
        "script_count",
        (n as f64 * 3.0).min(10.0),
        10.0,
        format!("{n} .py files in scripts/"),
        n > 0,
    )
}

/// Scripts starting with a shebang line (10 points)
pub fn check_shebang(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return no_scripts_dir("shebang", 10.0);
    }
    let scripts = read_scripts(skill, true);
    if scripts.is_empty() {
        return MetricResult::new("shebang", 5.0, 10.0, "no executable scripts", true);
    }

    let with_shebang = scripts
        .iter()
        .filter(|s| s.content.lines().next().is_some_and(|l| l.starts_with("#!")))
        .count();
    let ratio = with_shebang as f64 / scripts.len() as f64;
    MetricResult::new(
        "shebang",
        round_score(ratio * 10.0),
        10.0,
        format!("shebang {with_shebang}/{} ({})", scripts.len(), pct(ratio)),
        ratio >= 0.5,
    )
}

/// argparse-based command line (10 points)
pub fn check_cli_interface(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return no_scripts_dir("cli_interface", 10.0);
    }

    let scripts = read_scripts(skill, true);
    let has_argparse = scripts
        .iter()
        .any(|s| s.content.contains("argparse") || s.content.contains("ArgumentParser"));
    let has_arguments = scripts
        .iter()
        .any(|s| s.content.contains("--help") || s.content.contains("add_argument"));

    let mut score = 0.0;
    let mut details = Vec::new();
    if has_argparse {
        score += 7.0;
        details.push("uses argparse");
    }
    if has_arguments {
        score += 3.0;
        details.push("defines arguments");
    }
    if details.is_empty() {
        details.push("no CLI interface");
    }

    MetricResult::new("cli_interface", score, 10.0, details.join("; "), has_argparse)
}

/// Opens with a module docstring, after an optional shebang line
fn has_module_docstring(content: &str) -> bool {
    let mut text = content.trim_start();
    if text.starts_with("#!") {
        text = text.split_once('\n').map_or("", |(_, rest)| rest).trim_start();
    }
    text.starts_with("\"\"\"") || text.starts_with("'''")
}

/// Module docstring coverage (10 points)
pub fn check_docstrings(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return no_scripts_dir("docstrings", 10.0);
    }
    let scripts = read_scripts(skill, true);
    if scripts.is_empty() {
        return MetricResult::new("docstrings", 5.0, 10.0, "no scripts", true);
    }

    let with_doc = scripts
        .iter()
        .filter(|s| has_module_docstring(&s.content))
        .count();
    let ratio = with_doc as f64 / scripts.len() as f64;
    MetricResult::new(
        "docstrings",
        round_score(ratio * 10.0),
        10.0,
        format!("docstring {with_doc}/{} ({})", scripts.len(), pct(ratio)),
        ratio >= 0.3,
    )
}

/// Bridge script or `bridges/` directory (10 points, optional)
pub fn check_bridge_availability(skill: &SkillMetadata) -> MetricResult {
    let has_bridge_script = skill
        .script_files
        .iter()
        .any(|f| f.to_lowercase().contains("bridge"));
    let has_bridge_dir = skill.has_bridges_dir;

    let (score, details) = if has_bridge_script || has_bridge_dir {
        let mut details = "bridge present".to_string();
        if has_bridge_dir {
            details.push_str(" (bridges/ directory)");
        }
        if has_bridge_script {
            details.push_str(" (bridge script)");
        }
        (10.0, details)
    } else {
        (0.0, "no bridge".to_string())
    };

    MetricResult::new("bridge_availability", score, 10.0, details, true)
}

/// Functions from every parsable script; files with syntax errors are
/// dropped when `skip_broken` is set.
fn script_functions(skill: &SkillMetadata, skip_broken: bool) -> Vec<FunctionProfile> {
    let mut functions = Vec::new();
    for script in read_scripts(skill, true) {
        match profile_source(&script.content) {
            Ok(profile) if skip_broken && profile.has_errors => {
                debug!("skipping {} (syntax errors)", script.path.display());
            }
            Ok(profile) => functions.extend(profile.functions),
            Err(e) => debug!("skipping {}: {e:#}", script.path.display()),
        }
    }
    functions
}

/// Function docstring and type-hint coverage (15 points)
pub fn check_function_quality(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return no_scripts_dir("function_quality", 15.0);
    }

    let functions = script_functions(skill, false);
    if functions.is_empty() {
        return MetricResult::new("function_quality", 5.0, 15.0, "no functions", true);
    }

    let total = functions.len() as f64;
    let with_doc = functions.iter().filter(|f| f.has_docstring).count();
    let with_hints = functions.iter().filter(|f| f.has_type_hints).count();
    let doc_ratio = with_doc as f64 / total;
    let hint_ratio = with_hints as f64 / total;

    let doc_score = if doc_ratio >= 0.8 {
        10.0
    } else if doc_ratio >= 0.5 {
        8.0
    } else if doc_ratio >= 0.3 {
        5.0
    } else {
        2.0
    };
    let hint_score = if hint_ratio >= 0.6 {
        5.0
    } else if hint_ratio >= 0.3 {
        3.0
    } else {
        1.0
    };

    MetricResult::new(
        "function_quality",
        doc_score + hint_score,
        15.0,
        format!(
            "{} functions, docstring {with_doc} ({}), type hints {with_hints} ({})",
            functions.len(),
            pct(doc_ratio),
            pct(hint_ratio)
        ),
        doc_ratio >= 0.3,
    )
}

/// Average cyclomatic complexity per function (15 points)
pub fn check_code_complexity(skill: &SkillMetadata) -> MetricResult {
    if !skill.scripts_dir().is_dir() {
        return no_scripts_dir("code_complexity", 15.0);
    }

    let functions = script_functions(skill, true);
    let Some(worst) = functions.iter().reduce(|best, f| {
        if f.complexity > best.complexity {
            f
        } else {
            best
        }
    }) else {
        return MetricResult::new("code_complexity", 5.0, 15.0, "no analyzable functions", true);
    };

    let avg = functions.iter().map(|f| f64::from(f.complexity)).sum::<f64>() / functions.len() as f64;
    let score = if avg <= 5.0 {
        15.0
    } else if avg <= 10.0 {
        10.0
    } else if avg <= 15.0 {
        5.0
    } else {
        2.0
    };

    MetricResult::new(
        "code_complexity",
        score,
        15.0,
        format!(
            "{} functions, avg CC={avg:.1}, max CC={} ({})",
            functions.len(),
            worst.complexity,
            worst.name
        ),
        avg <= 10.0,
    )
}

fn pattern_matches(scripts_dir: &Path, file: &str, pattern: &str) -> Result<Option<bool>> {
    let path = scripts_dir.join(file);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let re = Regex::new(pattern).with_context(|| format!("invalid benchmark pattern '{pattern}'"))?;
    Ok(Some(re.is_match(&content)))
}

fn score_script_benchmark(skill: &SkillMetadata, bench: &ScriptBenchmark) -> Result<MetricResult> {
    let scripts_dir = skill.scripts_dir();
    if !scripts_dir.is_dir() {
        return Ok(no_scripts_dir("script_benchmark", 50.0));
    }

    let mut correct = 0;
    for item in &bench.required_patterns {
        if pattern_matches(&scripts_dir, &item.file, &item.pattern)? == Some(true) {
            correct += 1;
        }
    }
    // A forbidden pattern in a missing file is satisfied
    for item in &bench.forbidden_patterns {
        if pattern_matches(&scripts_dir, &item.file, &item.pattern)? != Some(true) {
            correct += 1;
        }
    }

    let total = bench.required_patterns.len() + bench.forbidden_patterns.len();
    if total == 0 {
        return Ok(MetricResult::not_applicable(
            "script_benchmark",
            "benchmark entry is empty",
        ));
    }

    let ratio = correct as f64 / total as f64;
    Ok(MetricResult::new(
        "script_benchmark",
        round_score(ratio * 50.0),
        50.0,
        format!("correct {correct}/{total} ({})", pct(ratio)),
        ratio >= 0.6,
    ))
}

/// Pattern expectations over named scripts (50 points, or not applicable)
pub fn check_script_benchmark(skill: &SkillMetadata, source: &BenchmarkSource) -> Result<MetricResult> {
    match source.script_tests(&skill.name)? {
        Some(bench) => score_script_benchmark(skill, &bench),
        None => Ok(MetricResult::not_applicable(
            "script_benchmark",
            format!("no benchmark ({}/{SCRIPT_TESTS})", source.dir().display()),
        )),
    }
}
