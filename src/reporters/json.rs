//! JSON reporter
//!
//! One object with a timestamp, every package's layers and metrics, the run
//! summary and, when ecosystem analysis ran, the ecosystem block.

use super::EvaluationReport;
use crate::models::{round1, EcosystemResult, LayerId, MetricResult};
use crate::scoring::{summarize_results, RunSummary};
use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct JsonLayer<'a> {
    score: f64,
    metrics: &'a [MetricResult],
    recommendations: &'a [String],
}

#[derive(Serialize)]
struct JsonSkill<'a> {
    name: &'a str,
    layers: BTreeMap<LayerId, JsonLayer<'a>>,
    weighted_score: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    skills: Vec<JsonSkill<'a>>,
    summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    ecosystem: Option<&'a EcosystemResult>,
}

/// Render results as pretty-printed JSON
pub fn render(report: &EvaluationReport<'_>) -> Result<String> {
    let mut skills = Vec::with_capacity(report.results.len());
    for (name, layer_results) in report.results {
        let layers = layer_results
            .iter()
            .map(|(id, lr)| {
                (
                    *id,
                    JsonLayer {
                        score: round1(lr.overall_score),
                        metrics: &lr.metrics,
                        recommendations: &lr.recommendations,
                    },
                )
            })
            .collect();
        skills.push(JsonSkill {
            name,
            layers,
            weighted_score: round1(report.weighted(layer_results)?),
        });
    }

    let output = JsonReport {
        timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        skills,
        summary: summarize_results(report.results, report.weights)?,
        ecosystem: report.ecosystem,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}
