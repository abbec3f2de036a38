//! Storage module for the run ledger
//!
//! This module keeps a SQLite history of exploration runs:
//! - One row per run and engine, with status, stop reason and output directory
//! - The states, transitions and failures each run recorded
//! - Aggregates for `--stats` and state sets for `--diff`

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::StopReason;

/// A run about to start
#[derive(Debug, Clone)]
pub struct NewRun {
    pub engine: String,
    pub root_url: String,
    pub config_hash: String,
    pub output_dir: String,
}

/// Represents an exploration run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub engine: String,
    pub root_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub stop_reason: Option<String>,
    pub output_dir: String,
}

/// Represents a state stored for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    pub identity: String,
    pub sequence_number: u64,
    pub depth: u32,
    pub url: String,
}

/// Result counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub states: u64,
    pub transitions: u64,
    pub failures: u64,
}

/// Status of an exploration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Aborted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "aborted" => Some(Self::Aborted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<&StopReason> for RunStatus {
    fn from(reason: &StopReason) -> Self {
        match reason {
            StopReason::Exhausted | StopReason::StateCeiling => Self::Completed,
            StopReason::Cancelled => Self::Cancelled,
            StopReason::Aborted { .. } => Self::Aborted,
            StopReason::RootUnavailable => Self::Failed,
        }
    }
}
