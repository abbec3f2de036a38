//! Statistics generation from the run ledger
//!
//! This module provides functionality for extracting and displaying
//! per-run statistics from the storage layer.

use crate::output::traits::RunSummary;
use crate::storage::{RunRecord, Storage};
use crate::AtlasError;
use chrono::{DateTime, Utc};

/// Builds the summary of a recorded run from the ledger
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `run` - The run to summarize
///
/// # Returns
///
/// * `Ok(RunSummary)` - Successfully loaded statistics
/// * `Err(AtlasError)` - Failed to query statistics
pub fn summarize_run(storage: &dyn Storage, run: &RunRecord) -> Result<RunSummary, AtlasError> {
    let counts = storage.count_results(run.id)?;

    Ok(RunSummary {
        run_id: Some(run.id),
        engine: run.engine.clone(),
        root_url: run.root_url.clone(),
        started_at: run.started_at.clone(),
        finished_at: run.finished_at.clone(),
        duration_seconds: duration_seconds(&run.started_at, run.finished_at.as_deref()),
        stop_reason: run
            .stop_reason
            .clone()
            .unwrap_or_else(|| run.status.to_db_string().to_string()),
        config_hash: run.config_hash.clone(),
        output_dir: run.output_dir.clone(),
        states: counts.states,
        transitions: counts.transitions,
        failures: counts.failures,
        depth_breakdown: storage.get_depth_breakdown(run.id)?,
        failure_summary: storage.get_failure_summary(run.id)?,
    })
}

/// Loads the summaries of every recorded run, most recent first
pub fn load_statistics(storage: &dyn Storage) -> Result<Vec<RunSummary>, AtlasError> {
    storage
        .list_runs()?
        .iter()
        .map(|run| summarize_run(storage, run))
        .collect()
}

/// Seconds between two RFC 3339 timestamps, when both parse
pub fn duration_seconds(started_at: &str, finished_at: Option<&str>) -> Option<u64> {
    let started = started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = finished_at?.parse::<DateTime<Utc>>().ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `runs` - The run summaries to display
pub fn print_statistics(runs: &[RunSummary]) {
    println!("=== Exploration Statistics ===\n");

    if runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    println!(
        "{:>5}  {:<9} {:<26} {:>7} {:>11} {:>9}  {}",
        "Run", "Engine", "Started", "States", "Transitions", "Failures", "Stopped"
    );

    for run in runs {
        println!(
            "{:>5}  {:<9} {:<26} {:>7} {:>11} {:>9}  {}",
            run.run_id.map(|id| id.to_string()).unwrap_or_default(),
            run.engine,
            run.started_at,
            run.states,
            run.transitions,
            run.failures,
            run.stop_reason
        );
    }
    println!();

    let total_states: u64 = runs.iter().map(|run| run.states).sum();
    let total_failures: u64 = runs.iter().map(|run| run.failures).sum();
    println!(
        "Totals: {} runs, {} states, {} failed attempts",
        runs.len(),
        total_states,
        total_failures
    );

    if let Some(latest) = runs.first() {
        if !latest.failure_summary.is_empty() {
            println!("\nFailures in run {}:", latest.run_id.unwrap_or_default());
            for (kind, count) in &latest.failure_summary {
                println!("  {}: {}", kind, count);
            }
        }
    }
}
