//! Output handler traits and types
//!
//! This module defines the trait interface for per-run output writers and
//! the summary data structure shared by the markdown and statistics reports.

use crate::crawler::{ExplorationOutcome, FailureRecord};
use crate::graph::ReachabilityGraph;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary of one exploration run of one engine
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub run_id: Option<i64>,
    pub engine: String,
    pub root_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub stop_reason: String,
    pub config_hash: String,
    pub output_dir: String,

    // Overall statistics
    pub states: u64,
    pub transitions: u64,
    pub failures: u64,

    // Depth breakdown (depth -> states)
    pub depth_breakdown: BTreeMap<u32, u64>,

    // Failure kind -> count
    pub failure_summary: BTreeMap<String, u64>,
}

impl RunSummary {
    /// Creates a new empty run summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the statistics from an exploration outcome
    pub fn with_outcome(mut self, outcome: &ExplorationOutcome) -> Self {
        self.stop_reason = outcome.stop_reason.to_string();
        self.states = outcome.graph.len() as u64;
        self.transitions = outcome.graph.edge_count() as u64;
        self.failures = outcome.failures.len() as u64;

        self.depth_breakdown.clear();
        for state in outcome.graph.states() {
            *self.depth_breakdown.entry(state.depth).or_insert(0) += 1;
        }

        self.failure_summary.clear();
        for failure in &outcome.failures {
            *self
                .failure_summary
                .entry(failure.kind.to_string())
                .or_insert(0) += 1;
        }

        self
    }

    /// Share of attempted actions that failed, as a percentage
    pub fn failure_rate(&self) -> f64 {
        let attempts = self.transitions + self.failures;
        if attempts == 0 {
            return 0.0;
        }
        (self.failures as f64 / attempts as f64) * 100.0
    }
}

/// Trait for per-run output writers
///
/// Each writer owns one run directory; concurrent engines never share one.
pub trait OutputHandler {
    /// Writes the graph description (`graph.json`)
    fn write_graph(&self, graph: &ReachabilityGraph) -> OutputResult<PathBuf>;

    /// Writes the failed-attempt log (`failures.json`)
    fn write_failures(&self, failures: &[FailureRecord]) -> OutputResult<PathBuf>;

    /// Writes the human-readable summary (`summary.md`)
    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf>;
}
