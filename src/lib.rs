//! skillgrade - static quality scoring for skill packages
//!
//! Scores each package against six layers (structure, activation, retrieval,
//! workflow, execution, validation), folds them into a weighted composite,
//! and optionally analyzes the package set as a whole. Runs can be persisted
//! as snapshots and diffed against earlier ones.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod evaluators;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
