//! Evaluation scheduling
//!
//! Runs every selected layer for every package:
//! 1. Pick a strategy (sequential for one worker or at most one package)
//! 2. Build a rayon pool, falling back to sequential if that is refused
//! 3. Evaluate one package per task, its layers in order
//! 4. Isolate each layer evaluation: an error or panic becomes a
//!    `runtime_error` layer result, or aborts the run in fail-fast mode
//!
//! Results land in a `BTreeMap`, so the output is identical for any worker
//! count.

use crate::evaluators::{evaluators_for, BenchmarkSource, EvalContext, LayerEvaluator};
use crate::models::{EvaluationResults, LayerId, LayerResult, SkillMetadata, SkillResults};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A layer evaluation failed and fail-fast mode is on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("skill={skill} layer={layer} error={message}")]
pub struct LayerEvaluationError {
    pub skill: String,
    pub layer: LayerId,
    pub message: String,
}

/// The worker pool could not be created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("worker pool unavailable: {0}")]
pub struct PoolUnavailable(pub String);

impl From<rayon::ThreadPoolBuildError> for PoolUnavailable {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        PoolUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn choose(workers: usize, skill_count: usize) -> Self {
        if workers <= 1 || skill_count <= 1 {
            ExecutionStrategy::Sequential
        } else {
            ExecutionStrategy::Parallel { workers }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub workers: usize,
    pub fail_fast: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            fail_fast: false,
        }
    }
}

pub fn build_pool(workers: usize) -> Result<ThreadPool, PoolUnavailable> {
    Ok(ThreadPoolBuilder::new().num_threads(workers).build()?)
}

/// Run `task` over `items`, returning results in input order.
///
/// `pool` is `None` for sequential execution. An unavailable pool degrades to
/// sequential execution. The first error stops the run.
pub fn try_run_tasks<T, R, E, F>(
    items: &[T],
    pool: Option<Result<ThreadPool, PoolUnavailable>>,
    task: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    match pool {
        Some(Ok(pool)) => pool.install(|| items.par_iter().map(&task).collect()),
        Some(Err(e)) => {
            warn!("{e}; running sequentially");
            items.iter().map(task).collect()
        }
        None => items.iter().map(task).collect(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Evaluate one layer for one package, isolating failures.
fn evaluate_unit(
    evaluator: &dyn LayerEvaluator,
    skill: &SkillMetadata,
    ctx: &EvalContext<'_>,
    fail_fast: bool,
) -> Result<LayerResult, LayerEvaluationError> {
    let layer = evaluator.layer();
    let outcome = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(skill, ctx)));

    // Recorded detail is "<kind>: <message>"
    let (kind, message) = match outcome {
        Ok(Ok(result)) => return Ok(result),
        Ok(Err(e)) => ("error", format!("{e:#}")),
        Err(payload) => ("panic", panic_message(payload.as_ref())),
    };
    let detail = format!("{kind}: {message}");

    if fail_fast {
        return Err(LayerEvaluationError {
            skill: skill.name.clone(),
            layer,
            message: if kind == "panic" { detail } else { message },
        });
    }

    eprintln!(
        "[WARN] layer evaluation failed: skill={} layer={} error={}",
        skill.name, layer, detail
    );
    Ok(LayerResult::runtime_error(layer, &skill.name, &detail))
}

fn evaluate_skill(
    skill: &SkillMetadata,
    evaluators: &[&dyn LayerEvaluator],
    ctx: &EvalContext<'_>,
    fail_fast: bool,
) -> Result<(String, SkillResults), LayerEvaluationError> {
    let mut layers = SkillResults::new();
    for evaluator in evaluators {
        let result = evaluate_unit(*evaluator, skill, ctx, fail_fast)?;
        debug!(
            "{} {}: {:.1}",
            skill.name,
            evaluator.layer(),
            result.overall_score
        );
        layers.insert(evaluator.layer(), result);
    }
    Ok((skill.name.clone(), layers))
}

/// Evaluate `skills` with an explicit evaluator list.
///
/// `peers` is the full package set under the root; `skills` may be a subset.
pub fn evaluate_with(
    skills: &[SkillMetadata],
    peers: &[SkillMetadata],
    evaluators: &[&dyn LayerEvaluator],
    benchmarks: Option<&BenchmarkSource>,
    options: EvaluationOptions,
) -> Result<EvaluationResults, LayerEvaluationError> {
    let ctx = EvalContext::new(peers, benchmarks);
    let strategy = ExecutionStrategy::choose(options.workers, skills.len());
    info!(
        "Evaluating {} skills across {} layers ({:?})",
        skills.len(),
        evaluators.len(),
        strategy
    );

    let pool = match strategy {
        ExecutionStrategy::Sequential => None,
        ExecutionStrategy::Parallel { workers } => Some(build_pool(workers)),
    };

    let per_skill = try_run_tasks(skills, pool, |skill| {
        evaluate_skill(skill, evaluators, &ctx, options.fail_fast)
    })?;
    Ok(per_skill.into_iter().collect())
}

/// Evaluate the selected `layers` for every package.
pub fn evaluate_skills(
    skills: &[SkillMetadata],
    peers: &[SkillMetadata],
    layers: &[LayerId],
    benchmarks: Option<&BenchmarkSource>,
    options: EvaluationOptions,
) -> Result<EvaluationResults, LayerEvaluationError> {
    evaluate_with(skills, peers, &evaluators_for(layers), benchmarks, options)
}
