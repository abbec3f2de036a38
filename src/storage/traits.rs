//! Storage traits and error types
//!
//! This module defines the trait interface for the run ledger and
//! associated error types.

use crate::crawler::FailureRecord;
use crate::graph::ReachabilityGraph;
use crate::storage::{LedgerState, NewRun, RunCounts, RunRecord, RunStatus};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger backends
///
/// Each engine task owns its own ledger handle; nothing here is shared
/// between concurrent runs.
pub trait Storage {
    // ===== Run Management =====

    /// Records the start of a run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, run: &NewRun) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// All runs, most recent first
    fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;

    /// Marks a run finished with its final status and stop reason
    fn finish_run(&mut self, run_id: i64, status: RunStatus, stop_reason: &str)
        -> StorageResult<()>;

    // ===== Results =====

    /// Stores a run's states, transitions and failures in one transaction
    fn record_results(
        &mut self,
        run_id: i64,
        graph: &ReachabilityGraph,
        failures: &[FailureRecord],
    ) -> StorageResult<()>;

    /// States of a run in discovery order
    fn get_states(&self, run_id: i64) -> StorageResult<Vec<LedgerState>>;

    // ===== Statistics =====

    /// State, transition and failure counts of a run
    fn count_results(&self, run_id: i64) -> StorageResult<RunCounts>;

    /// Failure kind -> count
    fn get_failure_summary(&self, run_id: i64) -> StorageResult<BTreeMap<String, u64>>;

    /// Depth -> number of states at that depth
    fn get_depth_breakdown(&self, run_id: i64) -> StorageResult<BTreeMap<u32, u64>>;
}
