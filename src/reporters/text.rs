//! Text reporter
//!
//! Plain output with no color codes, so the same string can be printed or
//! written to a file.

use super::EvaluationReport;
use crate::models::{EcosystemResult, LayerId};
use anyhow::Result;

const RULE_WIDTH: usize = 60;

fn join_ids(layers: &[LayerId]) -> String {
    layers.iter().map(LayerId::as_str).collect::<Vec<_>>().join(", ")
}

/// Render results as a plain text report
pub fn render(report: &EvaluationReport<'_>) -> Result<String> {
    let layers = report.layers_used();
    let heavy = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        heavy.clone(),
        format!("Skill Evaluator - {}", join_ids(&layers)),
        heavy,
        String::new(),
    ];

    let mut weighted_scores = Vec::with_capacity(report.results.len());
    for (name, layer_results) in report.results {
        let weighted = report.weighted(layer_results)?;
        weighted_scores.push(weighted);
        lines.push(format!("[{name}] Weighted: {weighted:.1}/100"));

        for layer in &layers {
            let Some(lr) = layer_results.get(layer) else {
                continue;
            };
            lines.push(format!("  {layer}: {:.1}/100", lr.overall_score));
            for m in &lr.metrics {
                let status = if m.passed { "PASS" } else { "FAIL" };
                lines.push(format!(
                    "    {}: {:.0}/{:.0} [{status}] - {}",
                    m.name, m.score, m.max_score, m.details
                ));
            }
        }

        let recs: Vec<&String> = layer_results
            .values()
            .flat_map(|lr| lr.recommendations.iter())
            .collect();
        if !recs.is_empty() {
            lines.push("  Recommendations:".to_string());
            lines.extend(recs.iter().map(|r| format!("    - {r}")));
        }
        lines.push(String::new());
    }

    if let Some(eco) = report.ecosystem {
        render_ecosystem(eco, &mut lines);
    }

    let avg = if weighted_scores.is_empty() {
        0.0
    } else {
        weighted_scores.iter().sum::<f64>() / weighted_scores.len() as f64
    };
    lines.push("-".repeat(RULE_WIDTH));
    lines.push(format!(
        "Total: {} skills | Layers: {} | Weighted Avg: {avg:.1}/100",
        report.results.len(),
        join_ids(&layers)
    ));
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn render_ecosystem(eco: &EcosystemResult, lines: &mut Vec<String>) {
    lines.push(format!("Ecosystem Health: {:.1}/100", eco.overall_score));
    for m in &eco.metrics {
        lines.push(format!(
            "  {}: {:.0}/{:.0} - {}",
            m.name, m.score, m.max_score, m.details
        ));
        if !m.affected_skills.is_empty() {
            lines.push(format!("    affected: {}", m.affected_skills.join(", ")));
        }
    }
    if !eco.recommendations.is_empty() {
        lines.push("  Recommendations:".to_string());
        lines.extend(eco.recommendations.iter().map(|r| format!("    - {r}")));
    }
    lines.push(String::new());
}
