//! Snapshot comparison
//!
//! A pure function of two snapshot values; live package state is never read.

use super::snapshot::Snapshot;
use crate::models::{round1, LayerId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreDelta {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

impl ScoreDelta {
    fn new(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            delta: round1(after - before),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountDelta {
    pub before: usize,
    pub after: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryDiff {
    pub weighted_average: ScoreDelta,
    pub skill_count: CountDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub before: String,
    pub after: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDiff {
    pub weighted: ScoreDelta,
    pub layers: BTreeMap<LayerId, ScoreDelta>,
}

/// Differences between a baseline and a current snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub summary: SummaryDiff,
    pub evaluator_version: VersionChange,
    /// Packages present in both snapshots, by name
    pub skills: BTreeMap<String, SkillDiff>,
    pub improved: Vec<String>,
    pub regressed: Vec<String>,
    pub new_skills: Vec<String>,
    pub removed_skills: Vec<String>,
}

/// Compare `current` against `baseline`.
///
/// Packages only in `current` are new, only in `baseline` removed. For the
/// rest, a layer missing from one side counts as 0.
pub fn compute_diff(current: &Snapshot, baseline: &Snapshot) -> SnapshotDiff {
    let mut diff = SnapshotDiff {
        summary: SummaryDiff {
            weighted_average: ScoreDelta::new(
                baseline.summary.weighted_average,
                current.summary.weighted_average,
            ),
            skill_count: CountDelta {
                before: baseline.summary.skill_count,
                after: current.summary.skill_count,
                delta: current.summary.skill_count as i64 - baseline.summary.skill_count as i64,
            },
        },
        evaluator_version: VersionChange {
            before: baseline.evaluator_version.clone(),
            after: current.evaluator_version.clone(),
            changed: baseline.evaluator_version != current.evaluator_version,
        },
        skills: BTreeMap::new(),
        improved: Vec::new(),
        regressed: Vec::new(),
        new_skills: Vec::new(),
        removed_skills: Vec::new(),
    };

    let names: BTreeSet<&String> = current.skills.keys().chain(baseline.skills.keys()).collect();
    for name in names {
        let (now, before) = match (current.skills.get(name), baseline.skills.get(name)) {
            (Some(now), Some(before)) => (now, before),
            (Some(_), None) => {
                diff.new_skills.push(name.clone());
                continue;
            }
            (None, _) => {
                diff.removed_skills.push(name.clone());
                continue;
            }
        };

        let weighted = ScoreDelta::new(before.weighted, now.weighted);
        let layer_ids: BTreeSet<LayerId> = now.layers.keys().chain(before.layers.keys()).copied().collect();
        let layers = layer_ids
            .into_iter()
            .map(|layer| {
                let b = before.layers.get(&layer).copied().unwrap_or(0.0);
                let a = now.layers.get(&layer).copied().unwrap_or(0.0);
                (layer, ScoreDelta::new(b, a))
            })
            .collect();

        if weighted.delta > 0.0 {
            diff.improved.push(name.clone());
        } else if weighted.delta < 0.0 {
            diff.regressed.push(name.clone());
        }
        diff.skills.insert(name.clone(), SkillDiff { weighted, layers });
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::snapshot::{SkillSnapshot, SnapshotSummary};

    fn snapshot(version: &str, skills: &[(&str, f64, &[(LayerId, f64)])]) -> Snapshot {
        let skills: BTreeMap<String, SkillSnapshot> = skills
            .iter()
            .map(|(name, weighted, layers)| {
                (
                    name.to_string(),
                    SkillSnapshot {
                        weighted: *weighted,
                        layers: layers.iter().copied().collect(),
                    },
                )
            })
            .collect();
        let avg = if skills.is_empty() {
            0.0
        } else {
            round1(skills.values().map(|s| s.weighted).sum::<f64>() / skills.len() as f64)
        };
        Snapshot {
            timestamp: "2026-01-01T00:00:00".into(),
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
    fn test_self_diff_is_zero() {
        let snap = snapshot("v1", &[("a", 70.0, &[(LayerId::L1, 70.0)]), ("b", 40.0, &[])]);
        let diff = compute_diff(&snap, &snap);
        assert_eq!(diff.summary.weighted_average.delta, 0.0);
        assert_eq!(diff.summary.skill_count.delta, 0);
        assert!(!diff.evaluator_version.changed);
        assert!(diff.improved.is_empty() && diff.regressed.is_empty());
        assert!(diff.new_skills.is_empty() && diff.removed_skills.is_empty());
        assert!(diff.skills.values().all(|s| s.weighted.delta == 0.0));
    }

    #[test]
    fn test_diff_classifies_packages() {
        let baseline = snapshot(
            "v1",
            &[
                ("keep-up", 50.0, &[(LayerId::L1, 50.0), (LayerId::L2, 40.0)]),
                ("keep-down", 80.0, &[]),
                ("gone", 10.0, &[]),
            ],
        );
        let current = snapshot(
            "v2",
            &[
                ("keep-up", 62.5, &[(LayerId::L1, 75.0), (LayerId::L3, 30.0)]),
                ("keep-down", 79.9, &[]),
                ("fresh", 90.0, &[]),
            ],
        );
        let diff = compute_diff(&current, &baseline);

        assert!(diff.evaluator_version.changed);
        assert_eq!(diff.evaluator_version.before, "v1");
        assert_eq!(diff.new_skills, vec!["fresh"]);
        assert_eq!(diff.removed_skills, vec!["gone"]);
        assert_eq!(diff.improved, vec!["keep-up"]);
        assert_eq!(diff.regressed, vec!["keep-down"]);

        let up = &diff.skills["keep-up"];
        assert_eq!(up.weighted.delta, 12.5);
        assert_eq!(up.layers[&LayerId::L1].delta, 25.0);
        assert_eq!(up.layers[&LayerId::L2], ScoreDelta { before: 40.0, after: 0.0, delta: -40.0 });
        assert_eq!(up.layers[&LayerId::L3].before, 0.0);
        assert_eq!(diff.skills["keep-down"].weighted.delta, -0.1);
        assert!(!diff.skills.contains_key("fresh"));
    }
}
