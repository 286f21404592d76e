//! Markdown reporter for GitHub-flavored Markdown output
//!
//! Suitable for pull request comments and checked-in reports: a summary table
//! with one column per layer, then per-package detail.

use super::EvaluationReport;
use crate::models::{EcosystemResult, LayerId};
use anyhow::Result;
use chrono::Local;

/// Render results as GitHub-flavored Markdown
pub fn render(report: &EvaluationReport<'_>) -> Result<String> {
    let layers = report.layers_used();
    let mut md = String::new();

    md.push_str(&render_header(report, &layers));
    md.push('\n');
    md.push_str(&render_summary(report, &layers)?);
    md.push('\n');
    md.push_str(&render_details(report, &layers)?);
    if let Some(eco) = report.ecosystem {
        md.push('\n');
        md.push_str(&render_ecosystem(eco));
    }

    Ok(md)
}

fn render_header(report: &EvaluationReport<'_>, layers: &[LayerId]) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M");
    let ids: Vec<&str> = layers.iter().map(LayerId::as_str).collect();
    let weights: Vec<String> = report
        .weights
        .iter()
        .filter(|(layer, _)| layers.contains(layer))
        .map(|(layer, w)| format!("{layer}={:.0}%", w * 100.0))
        .collect();

    format!(
        "# Skill Evaluation Report\n\n> Generated: {timestamp}\n> Layers: {}\n> Weights: {}\n",
        ids.join(", "),
        weights.join(", ")
    )
}

fn render_summary(report: &EvaluationReport<'_>, layers: &[LayerId]) -> Result<String> {
    let mut md = String::from("## Summary\n\n");

    let ids: Vec<&str> = layers.iter().map(LayerId::as_str).collect();
    md.push_str(&format!("| Skill | {} | **Weighted** |\n", ids.join(" | ")));
    md.push_str(&format!(
        "|-------|{}|----------:|\n",
        vec!["-----:"; layers.len()].join("|")
    ));

    let mut weighted_scores = Vec::with_capacity(report.results.len());
    for (name, layer_results) in report.results {
        let weighted = report.weighted(layer_results)?;
        weighted_scores.push(weighted);
        let cells: Vec<String> = layers
            .iter()
            .map(|layer| {
                layer_results
                    .get(layer)
                    .map(|lr| format!("{:.0}", lr.overall_score))
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect();
        md.push_str(&format!(
            "| {name} | {} | **{weighted:.1}** |\n",
            cells.join(" | ")
        ));
    }

    let avg = if weighted_scores.is_empty() {
        0.0
    } else {
        weighted_scores.iter().sum::<f64>() / weighted_scores.len() as f64
    };
    md.push_str(&format!(
        "| **Average** | {} | **{avg:.1}** |\n",
        vec![""; layers.len()].join(" | ")
    ));
    Ok(md)
}

fn render_details(report: &EvaluationReport<'_>, layers: &[LayerId]) -> Result<String> {
    let mut md = String::from("## Details\n\n");

    for (name, layer_results) in report.results {
        let weighted = report.weighted(layer_results)?;
        md.push_str(&format!("### {name} ({weighted:.1})\n\n"));

        for layer in layers {
            let Some(lr) = layer_results.get(layer) else {
                continue;
            };
            md.push_str(&format!("**{layer}**: {:.1}/100\n\n", lr.overall_score));
            for m in &lr.metrics {
                let icon = if m.passed { "+" } else { "-" };
                md.push_str(&format!(
                    "  - [{icon}] `{}`: {:.0}/{:.0} - {}\n",
                    m.name, m.score, m.max_score, m.details
                ));
            }
            md.push('\n');
        }

        let recs: Vec<&String> = layer_results
            .values()
            .flat_map(|lr| lr.recommendations.iter())
            .collect();
        if !recs.is_empty() {
            md.push_str("**Recommendations:**\n");
            for r in recs {
                md.push_str(&format!("- {r}\n"));
            }
            md.push('\n');
        }
    }
    Ok(md)
}

fn render_ecosystem(eco: &EcosystemResult) -> String {
    let mut md = format!("## Ecosystem Health ({:.1})\n\n", eco.overall_score);
    md.push_str("| Metric | Score | Details |\n|--------|------:|---------|\n");
    for m in &eco.metrics {
        md.push_str(&format!(
            "| {} | {:.0}/{:.0} | {} |\n",
            m.name, m.score, m.max_score, m.details
        ));
    }
    if !eco.recommendations.is_empty() {
        md.push_str("\n**Recommendations:**\n");
        for r in &eco.recommendations {
            md.push_str(&format!("- {r}\n"));
        }
    }
    md
}
