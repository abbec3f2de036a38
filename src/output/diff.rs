//! Offline comparison of two recorded runs
//!
//! States are matched by identity, which is stable across runs, so the diff
//! shows which UI states appeared or disappeared between two explorations.

use crate::storage::{LedgerState, Storage};
use crate::AtlasError;
use std::collections::HashSet;

/// States added and removed between two runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDiff {
    pub base_run: i64,
    pub compared_run: i64,

    /// In the compared run only, in its discovery order
    pub added: Vec<LedgerState>,

    /// In the base run only, in its discovery order
    pub removed: Vec<LedgerState>,

    /// Number of identities present in both runs
    pub unchanged: usize,
}

impl RunDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compares the states recorded for two runs
///
/// # Arguments
///
/// * `storage` - The run ledger
/// * `base_run` - Earlier (reference) run
/// * `compared_run` - Later run
///
/// # Returns
///
/// * `Ok(RunDiff)` - The comparison
/// * `Err(AtlasError)` - A run does not exist or the ledger failed
pub fn diff_runs(
    storage: &dyn Storage,
    base_run: i64,
    compared_run: i64,
) -> Result<RunDiff, AtlasError> {
    storage.get_run(base_run)?;
    storage.get_run(compared_run)?;

    let base = storage.get_states(base_run)?;
    let compared = storage.get_states(compared_run)?;

    let base_ids: HashSet<&str> = base.iter().map(|s| s.identity.as_str()).collect();
    let compared_ids: HashSet<&str> = compared.iter().map(|s| s.identity.as_str()).collect();

    let added = compared
        .iter()
        .filter(|state| !base_ids.contains(state.identity.as_str()))
        .cloned()
        .collect();
    let removed = base
        .iter()
        .filter(|state| !compared_ids.contains(state.identity.as_str()))
        .cloned()
        .collect();

    Ok(RunDiff {
        base_run,
        compared_run,
        added,
        removed,
        unchanged: base_ids.intersection(&compared_ids).count(),
    })
}

/// Prints a diff to stdout
pub fn print_diff(diff: &RunDiff) {
    println!(
        "=== States: run {} -> run {} ===\n",
        diff.base_run, diff.compared_run
    );
    println!(
        "{} unchanged, {} added, {} removed\n",
        diff.unchanged,
        diff.added.len(),
        diff.removed.len()
    );

    for state in &diff.added {
        println!("+ {} depth {} {}", short(&state.identity), state.depth, state.url);
    }
    for state in &diff.removed {
        println!("- {} depth {} {}", short(&state.identity), state.depth, state.url);
    }
}

fn short(identity: &str) -> &str {
    &identity[..identity.len().min(12)]
}
