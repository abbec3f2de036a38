//! Per-engine run coordination
//!
//! One run of one engine goes through these steps:
//! - Create the output directory and record the run in the ledger
//! - Open the browser session and the snapshot archive
//! - Sign in when a login prelude is configured
//! - Explore from the root URL
//! - Close the session, write the artifacts and finish the ledger row
//!
//! Engines run as independent tokio tasks sharing nothing but the
//! configuration and the cancellation token.

use crate::archive::FsArchive;
use crate::browser::{Affordance, BrowserSession, Engine, FieldInput, WebDriverSession};
use crate::config::{Config, LoginConfig};
use crate::crawler::explorer::{ExplorationOutcome, Explorer, FailureRecord, StopReason};
use crate::fingerprint::Fingerprinter;
use crate::graph::ReachabilityGraph;
use crate::output::{OutputHandler, RunDirectory, RunSummary};
use crate::storage::{NewRun, RunStatus, SqliteStorage, Storage};
use crate::AtlasError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Final report of one engine's run
#[derive(Debug, Clone)]
pub struct EngineReport {
    pub engine: Engine,

    /// `<results-dir>/<timestamp>/<engine>/`
    pub output_dir: PathBuf,

    pub status: RunStatus,
    pub summary: RunSummary,
}

/// Runs every configured engine concurrently
///
/// All engines share one timestamped results directory. A failing engine
/// does not stop the others; its error is logged and it is missing from
/// the returned reports.
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, recorded per run
/// * `cancel` - Stops every engine between steps when triggered
///
/// # Returns
///
/// * `Ok(Vec<EngineReport>)` - Reports of the engines that produced output
/// * `Err(AtlasError)` - The engine list is invalid
pub async fn run_all(
    config: Config,
    config_hash: String,
    cancel: CancellationToken,
) -> Result<Vec<EngineReport>, AtlasError> {
    let engines = config.target.engines()?;
    let config = Arc::new(config);
    let started = Utc::now();

    tracing::info!(
        "Exploring {} with {} engine(s), depth {}",
        config.target.url,
        engines.len(),
        config.exploration.depth_levels
    );

    let mut tasks = JoinSet::new();
    for engine in engines {
        let config = Arc::clone(&config);
        let config_hash = config_hash.clone();
        let cancel = cancel.clone();
        let span = tracing::info_span!("engine", name = engine.name());

        tasks.spawn(
            async move {
                let result = run_engine(&config, engine, started, &config_hash, cancel).await;
                (engine, result)
            }
            .instrument(span),
        );
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(report))) => reports.push(report),
            Ok((engine, Err(e))) => tracing::error!("Run on {} failed: {}", engine, e),
            Err(e) => tracing::error!("Engine task panicked: {}", e),
        }
    }

    reports.sort_by_key(|report| report.engine.name());
    Ok(reports)
}

/// Runs one engine end to end
///
/// Artifacts are written for every run that got as far as creating its
/// output directory, including runs whose driver was unreachable.
pub async fn run_engine(
    config: &Config,
    engine: Engine,
    started: DateTime<Utc>,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<EngineReport, AtlasError> {
    let results_dir = Path::new(&config.output.results_dir);
    let run_dir = RunDirectory::create(results_dir, started, engine.name())?;
    let output_dir = run_dir.path().to_path_buf();

    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(&NewRun {
        engine: engine.name().to_string(),
        root_url: config.target.url.clone(),
        config_hash: config_hash.to_string(),
        output_dir: output_dir.display().to_string(),
    })?;

    tracing::info!("Run {} writing to {}", run_id, output_dir.display());

    let (outcome, status) = match WebDriverSession::connect(engine, &config.browser).await {
        Ok(mut session) => {
            let result = explore_session(&mut session, config, &run_dir, cancel).await;

            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close {} session: {}", engine, e);
            }

            match result {
                Ok(outcome) => {
                    let status = RunStatus::from(&outcome.stop_reason);
                    (outcome, status)
                }
                Err(e) => {
                    tracing::error!("Run setup failed: {}", e);
                    (aborted(&e), RunStatus::Aborted)
                }
            }
        }
        Err(e) => {
            tracing::error!("Could not open {} session: {}", engine, e);
            (aborted(&e.into()), RunStatus::Failed)
        }
    };

    let finished = Utc::now();
    let mut summary = RunSummary::new().with_outcome(&outcome);
    summary.run_id = Some(run_id);
    summary.engine = engine.name().to_string();
    summary.root_url = config.target.url.clone();
    summary.started_at = started.to_rfc3339_opts(SecondsFormat::Secs, true);
    summary.finished_at = Some(finished.to_rfc3339_opts(SecondsFormat::Secs, true));
    summary.duration_seconds = u64::try_from((finished - started).num_seconds()).ok();
    summary.config_hash = config_hash.to_string();
    summary.output_dir = output_dir.display().to_string();

    // The ledger is finished even when the artifacts cannot be written
    let written = write_artifacts(&run_dir, &outcome, &summary);
    if let Err(e) = &written {
        tracing::error!("Failed to write artifacts of run {}: {}", run_id, e);
    }

    storage.record_results(run_id, &outcome.graph, &outcome.failures)?;
    storage.finish_run(run_id, status, &outcome.stop_reason.to_string())?;
    written?;

    tracing::info!(
        "Run {} {}: {} states, {} transitions, {} failures",
        run_id,
        status.to_db_string(),
        summary.states,
        summary.transitions,
        summary.failures
    );

    Ok(EngineReport {
        engine,
        output_dir,
        status,
        summary,
    })
}

/// Explores the configured target on an already open session
///
/// Opens the snapshot archive inside `run_dir`, runs the login prelude
/// and then the explorer. The session is left open for the caller.
///
/// A failed sign-in is not an error: it ends the run as aborted with the
/// attempt in the failure log.
pub async fn explore_session<S>(
    session: &mut S,
    config: &Config,
    run_dir: &RunDirectory,
    cancel: CancellationToken,
) -> Result<ExplorationOutcome, AtlasError>
where
    S: BrowserSession + ?Sized,
{
    let archive = FsArchive::open(
        run_dir.snapshots_dir(),
        config.archive.overwrite,
        Duration::from_millis(config.archive.retry_backoff_ms),
    )
    .await?;

    let fingerprinter = Fingerprinter::new(&config.exploration)?;

    if let Some(login) = &config.login {
        if let Err(e) = sign_in(session, login).await {
            tracing::error!("Sign-in at {} failed: {}", login.url, e);
            let mut outcome = aborted(&e);
            outcome.failures.push(FailureRecord::new(
                &login.url,
                &format!("sign in {}", login.url),
                0,
                &e,
            ));
            return Ok(outcome);
        }
    }

    let mut explorer = Explorer::new(
        session,
        &archive,
        config.exploration.clone(),
        fingerprinter,
        cancel,
    );
    Ok(explorer.explore(&config.target.url).await)
}

/// Performs the login prelude as a form affordance
pub async fn sign_in<S>(session: &mut S, login: &LoginConfig) -> Result<(), AtlasError>
where
    S: BrowserSession + ?Sized,
{
    tracing::info!("Signing in at {} as {}", login.url, login.username);

    session.navigate(&login.url).await?;
    session.perform(&login_form(login)).await?;

    let page = session.render().await?;
    tracing::debug!("Signed in, now at {}", page.url);
    Ok(())
}

fn login_form(login: &LoginConfig) -> Affordance {
    Affordance::Form {
        selector: "form".to_string(),
        fields: vec![
            FieldInput {
                selector: login.username_selector.clone(),
                name: "username".to_string(),
                value: login.username.clone(),
            },
            FieldInput {
                selector: login.password_selector.clone(),
                name: "password".to_string(),
                value: login.password.clone(),
            },
        ],
        submit: Some(login.submit_selector.clone()),
    }
}

/// Writes `graph.json`, `failures.json` and `summary.md`
pub fn write_artifacts(
    output: &dyn OutputHandler,
    outcome: &ExplorationOutcome,
    summary: &RunSummary,
) -> Result<(), AtlasError> {
    output.write_graph(&outcome.graph)?;
    output.write_failures(&outcome.failures)?;
    output.write_summary(summary)?;
    Ok(())
}

fn aborted(error: &AtlasError) -> ExplorationOutcome {
    ExplorationOutcome {
        graph: ReachabilityGraph::new(),
        failures: Vec::<FailureRecord>::new(),
        stop_reason: StopReason::Aborted {
            reason: error.to_string(),
        },
    }
}
