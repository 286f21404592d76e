//! CLI definition and the evaluation run

use crate::config::{load_eval_config, ConfigError, EvalConfig};
use crate::discovery::discover_skills;
use crate::evaluators::{evaluate_ecosystem, BenchmarkSource};
use crate::history::{
    build_snapshot, compute_diff, load_history, save_snapshot, Baseline, DEFAULT_HISTORY_FILE,
};
use crate::models::{LayerId, SkillMetadata};
use crate::pipeline::{evaluate_skills, EvaluationOptions};
use crate::reporters::history::{format_diff_text, format_history_text};
use crate::reporters::{self, EvaluationReport, OutputFormat};
use crate::scoring::weighted_score;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing::info;

/// skillgrade - Six-layer quality scoring for skill packages
#[derive(Parser, Debug)]
#[command(name = "skillgrade")]
#[command(
    version,
    about = "Score skill packages across six quality layers, analyze the ecosystem, and track scores over time",
    after_help = "\
Examples:
  skillgrade --skills-root ./skills                      Evaluate every package
  skillgrade --skills-root ./skills --skill pdf-tools    Evaluate one package
  skillgrade --layer L1,L5 --format json                 Selected layers as JSON
  skillgrade --ecosystem --format markdown -o report.md  Markdown report with ecosystem analysis
  skillgrade --ci-mode --threshold 70                    Exit 1 if any package scores below 70
  skillgrade --save-history                              Append this run to the history log
  skillgrade --diff latest                               Compare against the last saved run
  skillgrade --show-history                              List saved runs"
)]
pub struct Cli {
    /// Directory whose immediate children are skill packages
    #[arg(long, env = "SKILLS_ROOT")]
    pub skills_root: Option<PathBuf>,

    /// Evaluate only the package with this name
    #[arg(long)]
    pub skill: Option<String>,

    /// Comma-separated layer ids to evaluate (default: all six)
    #[arg(long, value_name = "L1,L2,...")]
    pub layer: Option<String>,

    /// Output format: text, json, markdown (or md)
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json", "markdown", "md"])]
    pub format: String,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Exit with code 1 if any package scores below the threshold
    #[arg(long)]
    pub ci_mode: bool,

    /// Minimum weighted score for CI mode (default: from config, else 60)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Path to the JSON config file
    #[arg(long, default_value = "skillgrade.json")]
    pub config: PathBuf,

    /// Directory holding benchmark data
    #[arg(long, default_value = "benchmarks")]
    pub benchmarks: PathBuf,

    /// Also run the cross-package ecosystem analysis
    #[arg(long)]
    pub ecosystem: bool,

    /// Append this run's snapshot to the history log
    #[arg(long)]
    pub save_history: bool,

    /// Compare against a saved run: 'latest' or a 1-based index
    #[arg(long, value_name = "latest|N")]
    pub diff: Option<String>,

    /// Print the saved history and exit
    #[arg(long)]
    pub show_history: bool,

    /// Path to the history log
    #[arg(long, default_value = DEFAULT_HISTORY_FILE)]
    pub history_file: PathBuf,

    /// Number of parallel workers
    #[arg(long, default_value = "1")]
    pub workers: usize,

    /// Abort on the first layer evaluation failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

/// Run settings after merging flags, environment and config
#[derive(Debug)]
struct RunPlan {
    skills_root: PathBuf,
    threshold: f64,
    layers: Vec<LayerId>,
    format: OutputFormat,
    baseline: Option<Baseline>,
}

/// Resolve and validate everything that must hold before evaluation starts.
fn plan(cli: &Cli, config: &EvalConfig) -> Result<RunPlan> {
    let skills_root = cli
        .skills_root
        .clone()
        .or_else(|| config.skills_root.clone())
        .ok_or_else(|| anyhow!("--skills-root required (or set in config / SKILLS_ROOT env)"))?;

    let layers = EvalConfig::select_layers(cli.layer.as_deref())?;
    config.layer_weights.ensure_covers(&layers)?;

    if cli.workers < 1 {
        return Err(ConfigError::InvalidWorkers(cli.workers).into());
    }

    let baseline = cli.diff.as_deref().map(str::parse::<Baseline>).transpose()?;

    Ok(RunPlan {
        skills_root,
        threshold: cli.threshold.unwrap_or(config.threshold),
        layers,
        format: cli.format.parse()?,
        baseline,
    })
}

/// Packages to evaluate: all of them, or the one named by `--skill`
fn select_targets(skills: &[SkillMetadata], name: Option<&str>) -> Result<Vec<SkillMetadata>> {
    match name {
        None => Ok(skills.to_vec()),
        Some(name) => {
            let targets: Vec<SkillMetadata> =
                skills.iter().filter(|s| s.name == name).cloned().collect();
            if targets.is_empty() {
                bail!("Skill '{}' not found", name);
            }
            Ok(targets)
        }
    }
}

/// Run the CLI. Returns the process exit code for non-error outcomes.
pub fn run(cli: Cli) -> Result<i32> {
    let config = load_eval_config(&cli.config)?;

    if cli.show_history {
        let history = load_history(&cli.history_file)?;
        println!("{}", format_history_text(&history));
        return Ok(0);
    }

    let plan = plan(&cli, &config)?;

    let skills = discover_skills(&plan.skills_root)?;
    if skills.is_empty() {
        bail!("No skills found in {}", plan.skills_root.display());
    }
    let targets = select_targets(&skills, cli.skill.as_deref())?;
    info!(
        "Evaluating {} of {} skills in {}",
        targets.len(),
        skills.len(),
        plan.skills_root.display()
    );

    let benchmarks = BenchmarkSource::new(cli.benchmarks.clone());
    let options = EvaluationOptions {
        workers: cli.workers,
        fail_fast: cli.fail_fast,
    };
    let results = evaluate_skills(&targets, &skills, &plan.layers, Some(&benchmarks), options)?;

    let ecosystem = cli.ecosystem.then(|| evaluate_ecosystem(&skills));
    let weights = &config.layer_weights;

    if let Some(baseline) = plan.baseline {
        let history = load_history(&cli.history_file)?;
        let base = baseline.select(&history)?;
        let current = build_snapshot(&results, ecosystem.as_ref(), None, weights)?;
        println!("{}", format_diff_text(&compute_diff(&current, base)));
    }

    if cli.save_history {
        let snapshot = build_snapshot(&results, ecosystem.as_ref(), None, weights)?;
        save_snapshot(&cli.history_file, &snapshot)?;
        eprintln!("History saved to {}", cli.history_file.display());
    }

    if plan.baseline.is_none() {
        let report = EvaluationReport::new(&results, weights).with_ecosystem(ecosystem.as_ref());
        let output = reporters::render(&report, plan.format)?;
        match &cli.output {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                std::fs::write(path, &output)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved to {}", path.display());
            }
            None => println!("{output}"),
        }
    }

    if cli.ci_mode {
        let mut failed = Vec::new();
        for (name, layer_results) in &results {
            let score = weighted_score(layer_results, weights)?;
            if score < plan.threshold {
                failed.push((name, score));
            }
        }
        if !failed.is_empty() {
            eprintln!(
                "\n{}",
                style(format!(
                    "CI FAILED: {} skill(s) below {}:",
                    failed.len(),
                    plan.threshold
                ))
                .for_stderr()
                .red()
                .bold()
            );
            for (name, score) in failed {
                eprintln!("  {name}: {score:.1}");
            }
            return Ok(1);
        }
        eprintln!(
            "\n{}",
            style(format!("CI PASSED: All skills above {}", plan.threshold))
                .for_stderr()
                .green()
        );
    }

    Ok(0)
}
