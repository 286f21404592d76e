//! Weighted Layer Scoring
//!
//! Folds per-layer scores into one composite per package, and summarizes a
//! whole run.
//!
//! # Scoring Formula
//!
//! ```text
//! Layer Score    = 100 × Σ score / Σ max_score   (metrics with max_score > 0)
//! Weighted Score = Σ (layer_score × w_layer) / Σ w_layer
//!
//! Where:
//!   every evaluated layer must have a weight (else a configuration error)
//!   Σ w_layer == 0  →  weighted score 0
//! ```
//!
//! # Default Weights
//!
//! - L1 Structural: 0.20
//! - L2 Activation: 0.15
//! - L3 Retrieval: 0.15
//! - L4 Workflow: 0.15
//! - L5 Execution: 0.25
//! - L6 Validation: 0.10

mod aggregate;

pub use aggregate::{summarize_results, weighted_score, RunSummary, ScoringError};
