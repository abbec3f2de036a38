//! Crawler module for bounded state-space exploration
//!
//! This module contains the core exploration logic, including:
//! - Affordance enumeration (links and fillable forms on a rendered page)
//! - The exploration frontier (work stack, visited set, replay routes)
//! - The depth-bounded explorer driving one browser session
//! - Per-engine run coordination

mod affordance;
mod coordinator;
mod explorer;
mod frontier;

pub use affordance::{extract_affordances, AffordanceFilter};
pub use coordinator::{
    explore_session, run_all, run_engine, sign_in, write_artifacts, EngineReport,
};
pub use explorer::{
    ExplorationOutcome, Explorer, FailureKind, FailureRecord, StopReason,
};
pub use frontier::{Frontier, Route, WorkItem};

use crate::config::Config;
use crate::AtlasError;
use tokio_util::sync::CancellationToken;

/// Runs a complete exploration of every configured engine
///
/// This is the main entry point for starting a run. For each engine it will:
/// 1. Create `<results-dir>/<timestamp>/<engine>/` and a ledger row
/// 2. Open a browser session and sign in if configured
/// 3. Explore the target to the configured depth
/// 4. Write the graph, failures and summary
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file
/// * `cancel` - Cancels every engine between steps
///
/// # Returns
///
/// * `Ok(Vec<EngineReport>)` - One report per engine that produced output
/// * `Err(AtlasError)` - The run could not start
pub async fn crawl(
    config: Config,
    config_hash: String,
    cancel: CancellationToken,
) -> Result<Vec<EngineReport>, AtlasError> {
    run_all(config, config_hash, cancel).await
}
