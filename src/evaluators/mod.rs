//! Layer evaluators
//!
//! This module defines the core abstractions for skill scoring:
//! - `LayerEvaluator` trait that all six layers implement
//! - `EvalContext` carrying the optional collaborators (peer set, benchmarks)
//! - A static registry keyed by [`LayerId`]
//! - The shared fold from metric list to [`LayerResult`]
//!
//! Every metric check is a plain function of the metadata record (plus peers
//! or benchmark data where noted). Checks never fail on missing optional
//! inputs; an absent directory yields a defined partial or zero score.

pub mod activation;
pub mod benchmarks;
pub mod complexity;
pub mod ecosystem;
pub mod execution;
pub mod retrieval;
pub mod structural;
pub mod validation;
pub mod workflow;

pub use benchmarks::BenchmarkSource;
pub use ecosystem::evaluate_ecosystem;

use crate::models::{LayerId, LayerResult, MetricResult, SkillMetadata};
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collaborators an evaluator needs beyond the package's own metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorNeeds {
    /// Reads the other packages under the same root
    pub peers: bool,
    /// Reads benchmark data when a benchmark source is configured
    pub benchmarks: bool,
}

/// Read-only inputs shared by every evaluation unit in a run
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub peers: &'a [SkillMetadata],
    pub benchmarks: Option<&'a BenchmarkSource>,
}

impl<'a> EvalContext<'a> {
    pub fn new(peers: &'a [SkillMetadata], benchmarks: Option<&'a BenchmarkSource>) -> Self {
        Self { peers, benchmarks }
    }

    /// Context with no peers and no benchmarks
    pub fn standalone() -> Self {
        Self {
            peers: &[],
            benchmarks: None,
        }
    }
}

/// Trait for the six layer evaluators
///
/// An implementation runs a fixed list of metric checks in a fixed order.
/// The default `evaluate` folds them with [`run_layer_evaluation`].
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyEvaluator;
///
/// impl LayerEvaluator for MyEvaluator {
///     fn layer(&self) -> LayerId {
///         LayerId::L1
///     }
///
///     fn metrics(&self, skill: &SkillMetadata, _ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>> {
///         Ok(vec![check_something(skill)])
///     }
/// }
/// ```
pub trait LayerEvaluator: Send + Sync {
    /// Layer this evaluator scores
    fn layer(&self) -> LayerId;

    /// Which optional collaborators this evaluator reads
    ///
    /// Default: none
    fn needs(&self) -> EvaluatorNeeds {
        EvaluatorNeeds::default()
    }

    /// Run every metric check, in order
    ///
    /// Errors are reserved for genuinely exceptional input such as a
    /// malformed benchmark file.
    fn metrics(&self, skill: &SkillMetadata, ctx: &EvalContext<'_>) -> Result<Vec<MetricResult>>;

    /// Evaluate one package for this layer
    fn evaluate(&self, skill: &SkillMetadata, ctx: &EvalContext<'_>) -> Result<LayerResult> {
        let metrics = self.metrics(skill, ctx)?;
        Ok(run_layer_evaluation(self.layer(), skill, metrics))
    }
}

static REGISTRY: [&dyn LayerEvaluator; 6] = [
    &structural::StructuralEvaluator,
    &activation::ActivationEvaluator,
    &retrieval::RetrievalEvaluator,
    &workflow::WorkflowEvaluator,
    &execution::ExecutionEvaluator,
    &validation::ValidationEvaluator,
];

/// All layer evaluators, in layer order
pub fn registry() -> &'static [&'static dyn LayerEvaluator] {
    &REGISTRY
}

/// The evaluator for `layer`
pub fn evaluator_for(layer: LayerId) -> &'static dyn LayerEvaluator {
    match layer {
        LayerId::L1 => REGISTRY[0],
        LayerId::L2 => REGISTRY[1],
        LayerId::L3 => REGISTRY[2],
        LayerId::L4 => REGISTRY[3],
        LayerId::L5 => REGISTRY[4],
        LayerId::L6 => REGISTRY[5],
    }
}

/// Evaluators for the selected layers, in selection order
pub fn evaluators_for(layers: &[LayerId]) -> Vec<&'static dyn LayerEvaluator> {
    layers.iter().map(|l| evaluator_for(*l)).collect()
}

/// Fold metrics into a layer result.
///
/// Computes the layer score once, then records `name: details` for every
/// failed metric, in metric order.
pub fn run_layer_evaluation(
    layer: LayerId,
    skill: &SkillMetadata,
    metrics: Vec<MetricResult>,
) -> LayerResult {
    let mut result = LayerResult::new(layer, &skill.name);
    result.metrics = metrics;
    result.compute_score();
    result.recommendations = result
        .metrics
        .iter()
        .filter(|m| !m.passed)
        .map(|m| format!("{}: {}", m.name, m.details))
        .collect();
    result
}

/// A readable Python script of a package
#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub path: PathBuf,
    pub content: String,
}

impl ScriptSource {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Paths of every `*.py` under `dir`, sorted
pub(crate) fn python_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Scripts under `scripts/`, skipping `__init__.py` when `skip_init` is set.
///
/// Unreadable or non-UTF-8 files are skipped.
pub fn read_scripts(skill: &SkillMetadata, skip_init: bool) -> Vec<ScriptSource> {
    let dir = skill.scripts_dir();
    if !dir.is_dir() {
        return Vec::new();
    }
    python_files(&dir)
        .into_iter()
        .filter(|p| !(skip_init && p.file_name().is_some_and(|n| n == "__init__.py")))
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some(ScriptSource { path, content })
        })
        .collect()
}

/// Whole-number percentage, as in `80%`
pub(crate) fn pct(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Round half to even, for ratio-scaled scores
pub(crate) fn round_score(value: f64) -> f64 {
    value.round_ties_even()
}
