//! Sumi-Atlas main entry point
//!
//! This is the command-line interface for the Sumi-Atlas state-space mapper.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_atlas::config::{load_config_with_hash, Config};
use sumi_atlas::crawler::crawl;
use sumi_atlas::storage::RunStatus;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Atlas: a depth-bounded state-space mapper for web UIs
///
/// Sumi-Atlas drives real browsers through a web application, recognises
/// UI states by a content fingerprint, and writes a reachability graph plus
/// one DOM snapshot per distinct state for every configured engine.
#[derive(Parser, Debug)]
#[command(name = "sumi-atlas")]
#[command(version)]
#[command(about = "A depth-bounded state-space mapper for web UIs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be explored without opening a browser
    #[arg(long, conflicts_with_all = ["stats", "diff"])]
    dry_run: bool,

    /// Show statistics from the run ledger and exit
    #[arg(long, conflicts_with_all = ["dry_run", "diff"])]
    stats: bool,

    /// Compare the states of two recorded runs and exit
    #[arg(long, num_args = 2, value_names = ["RUN_A", "RUN_B"], conflicts_with_all = ["dry_run", "stats"])]
    diff: Option<Vec<i64>>,

    /// Cancel the exploration after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(runs) = &cli.diff {
        handle_diff(&config, runs[0], runs[1])
    } else {
        handle_crawl(config, config_hash, cli.timeout).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_atlas=info,warn"),
            1 => EnvFilter::new("sumi_atlas=debug,info"),
            2 => EnvFilter::new("sumi_atlas=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be explored
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let policy = &config.exploration;

    println!("=== Sumi-Atlas Dry Run ===\n");

    println!("Target:");
    println!("  Root URL: {}", config.target.url);
    for engine in config.target.engines()? {
        let endpoint = config
            .browser
            .endpoints
            .get(engine.name())
            .map(String::as_str)
            .unwrap_or_else(|| engine.default_endpoint());
        println!("  Engine: {} (WebDriver at {})", engine, endpoint);
    }

    if let Some(login) = &config.login {
        println!("\nLogin:");
        println!("  URL: {}", login.url);
        println!("  Username: {}", login.username);
    }

    println!("\nExploration Policy:");
    println!("  Depth levels: {}", policy.depth_levels);
    println!("  Input values: {}", policy.input_values);
    match policy.state_ceiling {
        Some(ceiling) => println!("  State ceiling: {}", ceiling),
        None => println!("  State ceiling: none"),
    }
    println!("  Same origin only: {}", policy.same_origin_only);
    println!("  Strip fragment: {}", policy.strip_fragment);
    println!(
        "  Fingerprint exclusions: {}",
        policy.fingerprint_exclusions.len()
    );
    println!("  Link exclusions: {}", policy.link_exclusions.len());

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!("  Command timeout: {}ms", config.browser.command_timeout_ms);
    println!("  Settle time: {}ms", config.browser.settle_ms);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_dir);
    println!("  Ledger: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the run ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use sumi_atlas::output::{load_statistics, print_statistics};
    use sumi_atlas::storage::SqliteStorage;

    println!("Ledger: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --diff mode: states added and removed between two runs
fn handle_diff(config: &Config, base_run: i64, compared_run: i64) -> anyhow::Result<()> {
    use sumi_atlas::output::{diff_runs, print_diff};
    use sumi_atlas::storage::SqliteStorage;

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let diff = diff_runs(&storage, base_run, compared_run)?;
    print_diff(&diff);

    Ok(())
}

/// Handles the main exploration
async fn handle_crawl(
    config: Config,
    config_hash: String,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current step");
            on_interrupt.cancel();
        }
    });

    if let Some(secs) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Timeout of {}s reached, cancelling", secs);
            on_timeout.cancel();
        });
    }

    let engine_count = config.target.browsers.len();
    let reports = crawl(config, config_hash, cancel).await?;

    for report in &reports {
        println!(
            "{}: {} states, {} transitions, {} failures ({}) -> {}",
            report.engine,
            report.summary.states,
            report.summary.transitions,
            report.summary.failures,
            report.summary.stop_reason,
            report.output_dir.display()
        );
    }

    if reports.len() < engine_count {
        bail!(
            "{} of {} engine runs produced no output",
            engine_count - reports.len(),
            engine_count
        );
    }
    if reports
        .iter()
        .all(|report| matches!(report.status, RunStatus::Failed | RunStatus::Aborted))
    {
        bail!("no engine completed its exploration");
    }

    tracing::info!("Exploration completed");
    Ok(())
}
