//! Text renderings of history diffs and the snapshot log

use crate::history::{Snapshot, SnapshotDiff};

fn signed(delta: f64) -> String {
    if delta > 0.0 {
        format!("+{delta:.1}")
    } else {
        format!("{delta:.1}")
    }
}

/// Render a diff between a baseline and the current run
pub fn format_diff_text(diff: &SnapshotDiff) -> String {
    let heavy = "=".repeat(60);
    let mut lines = vec![heavy.clone(), "Score Diff Report".to_string(), heavy, String::new()];

    let avg = &diff.summary.weighted_average;
    lines.push(format!(
        "Weighted Avg: {:.1} → {:.1} ({})",
        avg.before,
        avg.after,
        signed(avg.delta)
    ));
    if diff.evaluator_version.changed {
        lines.push(format!(
            "Evaluator Version: {} → {}",
            diff.evaluator_version.before, diff.evaluator_version.after
        ));
    }
    lines.push(String::new());

    for (name, skill) in &diff.skills {
        let w = &skill.weighted;
        let marker = if w.delta > 0.0 {
            " ↑"
        } else if w.delta < 0.0 {
            " ↓"
        } else {
            ""
        };
        lines.push(format!(
            "  {name}: {:.1} → {:.1} ({}){marker}",
            w.before,
            w.after,
            signed(w.delta)
        ));
    }

    if !diff.new_skills.is_empty() {
        lines.push(format!("\n  New: {}", diff.new_skills.join(", ")));
    }
    if !diff.removed_skills.is_empty() {
        lines.push(format!("\n  Removed: {}", diff.removed_skills.join(", ")));
    }

    lines.push(String::new());
    lines.push(format!(
        "Improved: {} | Regressed: {}",
        diff.improved.len(),
        diff.regressed.len()
    ));
    lines.push(String::new());
    lines.join("\n")
}

/// Render every snapshot as one table row, oldest first
pub fn format_history_text(history: &[Snapshot]) -> String {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return "No history entries found.".to_string();
    };

    let mut lines = vec![
        format!("Score History ({} entries)", history.len()),
        "=".repeat(50),
        format!(
            "{:<20} {:>6} {:>13} {:>7} {:>8}",
            "Date", "Skills", "Weighted Avg", "Delta", "EvalVer"
        ),
        "-".repeat(50),
    ];

    let mut prev_avg: Option<f64> = None;
    for snap in history {
        let ts: String = snap
            .timestamp
            .chars()
            .take(16)
            .map(|c| if c == 'T' { ' ' } else { c })
            .collect();
        let avg = snap.summary.weighted_average;
        let delta = prev_avg.map_or_else(|| "--".to_string(), |prev| signed(avg - prev));
        let version: String = if snap.evaluator_version.is_empty() {
            "n/a".to_string()
        } else {
            snap.evaluator_version.chars().take(8).collect()
        };
        lines.push(format!(
            "{ts:<20} {:>6} {avg:>13.1} {delta:>7} {version:>8}",
            snap.summary.skill_count
        ));
        prev_avg = Some(avg);
    }
    lines.push("=".repeat(50));

    if history.len() >= 2 {
        let trend = last.summary.weighted_average - first.summary.weighted_average;
        lines.push(format!(
            "Trend: {} over {} evaluations",
            signed(trend),
            history.len()
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{compute_diff, SkillSnapshot, SnapshotSummary};
    use std::collections::BTreeMap;

    fn snapshot(timestamp: &str, version: &str, skills: &[(&str, f64)]) -> Snapshot {
        let skills: BTreeMap<String, SkillSnapshot> = skills
            .iter()
            .map(|(n, w)| {
                (
                    n.to_string(),
                    SkillSnapshot {
                        weighted: *w,
                        layers: BTreeMap::new(),
                    },
                )
            })
            .collect();
        let avg = skills.values().map(|s| s.weighted).sum::<f64>() / skills.len().max(1) as f64;
        Snapshot {
            timestamp: timestamp.into(),
            evaluator_version: version.into(),
            summary: SnapshotSummary {
                weighted_average: avg,
                skill_count: skills.len(),
            },
            skills,
            ecosystem: None,
        }
    }

    #[test]
    fn test_diff_text() {
        let before = snapshot("2026-01-01T10:00:00", "aaaaaaaaaaaa", &[("a", 50.0), ("b", 70.0), ("gone", 1.0)]);
        let after = snapshot("2026-01-02T10:00:00", "bbbbbbbbbbbb", &[("a", 60.0), ("b", 65.0), ("fresh", 2.0)]);
        let text = format_diff_text(&compute_diff(&after, &before));

        assert!(text.contains("Score Diff Report"));
        assert!(text.contains("Evaluator Version: aaaaaaaaaaaa → bbbbbbbbbbbb"));
        assert!(text.contains("  a: 50.0 → 60.0 (+10.0) ↑"));
        assert!(text.contains("  b: 70.0 → 65.0 (-5.0) ↓"));
        assert!(text.contains("New: fresh"));
        assert!(text.contains("Removed: gone"));
        assert!(text.contains("Improved: 1 | Regressed: 1"));
    }

    #[test]
    fn test_diff_text_unchanged_version() {
        let snap = snapshot("2026-01-01T10:00:00", "v", &[("a", 50.0)]);
        let text = format_diff_text(&compute_diff(&snap, &snap));
        assert!(!text.contains("Evaluator Version"));
        assert!(text.contains("  a: 50.0 → 50.0 (0.0)\n"));
    }

    #[test]
    fn test_history_text() {
        let history = vec![
            snapshot("2026-01-01T10:00:00.123456", "0123456789ab", &[("a", 50.0)]),
            snapshot("2026-01-02T11:30:00.000000", "0123456789ab", &[("a", 62.5)]),
        ];
        let text = format_history_text(&history);
        assert!(text.starts_with("Score History (2 entries)"));
        assert!(text.contains("2026-01-01 10:00"));
        assert!(text.contains("--"));
        assert!(text.contains("+12.5"));
        assert!(text.contains("01234567"));
        assert!(!text.contains("0123456789ab"));
        assert!(text.contains("Trend: +12.5 over 2 evaluations"));
    }

    #[test]
    fn test_history_text_empty() {
        assert_eq!(format_history_text(&[]), "No history entries found.");
    }
}
