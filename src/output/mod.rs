//! Output module for exploration artifacts and reports
//!
//! This module handles:
//! - Per-run, per-engine output directories (`graph.json`, `failures.json`, `summary.md`)
//! - Markdown summaries of a run
//! - Statistics over the run ledger (`--stats`)
//! - State diffs between two recorded runs (`--diff`)

mod diff;
mod markdown;
mod run_dir;
pub mod stats;
mod traits;

pub use diff::{diff_runs, print_diff, RunDiff};
pub use markdown::format_markdown_summary;
pub use run_dir::{run_timestamp, RunDirectory};
pub use stats::{load_statistics, print_statistics, summarize_run};
pub use traits::{OutputError, OutputHandler, OutputResult, RunSummary};
