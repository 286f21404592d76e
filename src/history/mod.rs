//! Score history
//!
//! An append-only JSON Lines log with one [`Snapshot`] per line. Every
//! snapshot records the fingerprint of the scoring logic that produced it,
//! so a change in evaluators can be told apart from a change in packages.

mod diff;
mod snapshot;

pub use diff::{compute_diff, CountDelta, ScoreDelta, SkillDiff, SnapshotDiff, SummaryDiff, VersionChange};
pub use snapshot::{
    build_snapshot, evaluator_version, fingerprint, EcosystemSnapshot, SkillSnapshot, Snapshot,
    SnapshotSummary,
};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_HISTORY_FILE: &str = "reports/history.jsonl";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("No history found. Run with --save-history first.")]
    NoHistory,

    #[error("Invalid history index: {index} (1-{len})")]
    InvalidIndex { index: usize, len: usize },

    #[error("Invalid --diff value: {0} (expected 'latest' or a 1-based index)")]
    InvalidBaseline(String),

    #[error("Cannot access history file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed history entry at {path}:{line}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot encode snapshot")]
    Encode(#[source] serde_json::Error),
}

/// Append `snapshot` as one line, creating parent directories as needed.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), HistoryError> {
    let io_err = |source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let line = serde_json::to_string(snapshot).map_err(HistoryError::Encode)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    writeln!(file, "{line}").map_err(io_err)?;
    debug!("Appended snapshot to {}", path.display());
    Ok(())
}

/// Every snapshot in the log, oldest first. A missing file is an empty history.
pub fn load_history(path: &Path) -> Result<Vec<Snapshot>, HistoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| HistoryError::Malformed {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Which snapshot to diff against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    Latest,
    /// 1-based position in the log
    Index(usize),
}

impl FromStr for Baseline {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Baseline::Latest);
        }
        s.trim()
            .parse::<usize>()
            .map(Baseline::Index)
            .map_err(|_| HistoryError::InvalidBaseline(s.to_string()))
    }
}

impl Baseline {
    /// Pick the baseline out of `history`.
    pub fn select(self, history: &[Snapshot]) -> Result<&Snapshot, HistoryError> {
        let Some(last) = history.last() else {
            return Err(HistoryError::NoHistory);
        };
        match self {
            Baseline::Latest => Ok(last),
            Baseline::Index(n) if (1..=history.len()).contains(&n) => Ok(&history[n - 1]),
            Baseline::Index(n) => Err(HistoryError::InvalidIndex {
                index: n,
                len: history.len(),
            }),
        }
    }
}
