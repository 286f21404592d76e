//! Weighted aggregation across layers and packages

use crate::config::LayerWeights;
use crate::models::{round1, EvaluationResults, LayerId, SkillResults};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// Layers present in the results without a configured weight, sorted
    #[error("Missing layer weights for: {}", crate::config::join_layers(.0))]
    MissingWeights(Vec<LayerId>),
}

/// Weighted average of layer scores for one package.
///
/// Every layer in `layer_results` needs a weight. Returns 0 when the total
/// weight is 0, including when there are no layers at all.
pub fn weighted_score(
    layer_results: &SkillResults,
    weights: &LayerWeights,
) -> Result<f64, ScoringError> {
    let layers: Vec<LayerId> = layer_results.keys().copied().collect();
    let missing = weights.missing_for(&layers);
    if !missing.is_empty() {
        return Err(ScoringError::MissingWeights(missing));
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (layer, result) in layer_results {
        let w = weights.get(*layer).unwrap_or(0.0);
        weighted_sum += result.overall_score * w;
        total_weight += w;
    }

    Ok(if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    })
}

/// Aggregate statistics for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_skills: usize,
    pub weighted_average: f64,
    pub min: f64,
    pub max: f64,
    pub layer_weights: LayerWeights,
    /// Layer results that are isolated runtime failures
    pub error_count: usize,
}

/// Count, weighted average, min and max across packages (rounded to 0.1).
pub fn summarize_results(
    results: &EvaluationResults,
    weights: &LayerWeights,
) -> Result<RunSummary, ScoringError> {
    let scores = results
        .values()
        .map(|layers| weighted_score(layers, weights))
        .collect::<Result<Vec<f64>, _>>()?;

    let error_count = results
        .values()
        .flat_map(|layers| layers.values())
        .filter(|lr| lr.is_runtime_error())
        .count();

    let (weighted_average, min, max) = if scores.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = scores.iter().sum();
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (round1(sum / scores.len() as f64), round1(min), round1(max))
    };

    debug!(
        "Summarized {} skills: avg={:.1} errors={}",
        results.len(),
        weighted_average,
        error_count
    );

    Ok(RunSummary {
        total_skills: results.len(),
        weighted_average,
        min,
        max,
        layer_weights: weights.clone(),
        error_count,
    })
}
