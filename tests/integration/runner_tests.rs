//! Per-engine runner: artifacts on disk and rows in the run ledger

use crate::support::{link, url, ScriptedSession, ROOT};
use chrono::Utc;
use std::path::Path;
use sumi_atlas::browser::Engine;
use sumi_atlas::config::{parse_config, Config};
use sumi_atlas::crawler::{explore_session, run_engine, write_artifacts, FailureKind, StopReason};
use sumi_atlas::graph::GraphExport;
use sumi_atlas::output::{run_timestamp, RunDirectory, RunSummary};
use sumi_atlas::storage::{RunStatus, SqliteStorage, Storage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_in(dir: &Path, extra: &str) -> Config {
    parse_config(&format!(
        r#"
[target]
url = "{root}"

[exploration]
depth-levels = 1

[output]
results-dir = '{results}'
database-path = '{db}'

{extra}
"#,
        root = ROOT,
        results = dir.join("results").display(),
        db = dir.join("atlas.db").display(),
        extra = extra,
    ))
    .unwrap()
}

#[tokio::test]
async fn test_session_run_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), "");
    let run_dir = RunDirectory::create(&dir.path().join("results"), Utc::now(), "chromium").unwrap();

    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}", link("about", "About")))
        .page("about", "<h1>About</h1>");

    let outcome = explore_session(&mut session, &config, &run_dir, CancellationToken::new())
        .await
        .unwrap();
    let summary = RunSummary::new().with_outcome(&outcome);
    write_artifacts(&run_dir, &outcome, &summary).unwrap();

    let graph: GraphExport =
        serde_json::from_str(&std::fs::read_to_string(run_dir.path().join("graph.json")).unwrap())
            .unwrap();
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.links.len(), 1);
    assert_eq!(graph.nodes[0].url, url(""));

    for node in &graph.nodes {
        let snapshot = run_dir.snapshots_dir().join(format!("{}.html", node.id));
        assert!(snapshot.exists(), "missing {}", snapshot.display());
    }

    let failures = std::fs::read_to_string(run_dir.path().join("failures.json")).unwrap();
    assert_eq!(failures, "[]");

    let markdown = std::fs::read_to_string(run_dir.path().join("summary.md")).unwrap();
    assert!(markdown.contains("- **States**: 2"));
}

#[tokio::test]
async fn test_login_prelude_runs_first() {
    let dir = TempDir::new().unwrap();
    let config = config_in(
        dir.path(),
        r##"
[login]
url = "http://app.test/signin"
username = "admin@example.com"
password = "hunter2"
username-selector = "#identification"
password-selector = "#password"
submit-selector = "button[type=submit]"
"##,
    );
    let run_dir = RunDirectory::create(&dir.path().join("results"), Utc::now(), "firefox").unwrap();

    let mut session = ScriptedSession::new()
        .page("signin", "<form><input id=\"identification\"><input id=\"password\"></form>")
        .page("", "<h1>Dashboard</h1>")
        .form_target("");

    let outcome = explore_session(&mut session, &config, &run_dir, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.navigations[0], url("signin"));
    assert_eq!(session.submissions, 1);
    assert_eq!(outcome.graph.len(), 1);
    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
}

#[tokio::test]
async fn test_failed_login_is_recorded() {
    let dir = TempDir::new().unwrap();
    let config = config_in(
        dir.path(),
        r##"
[login]
url = "http://app.test/signin"
username = "admin@example.com"
password = "hunter2"
username-selector = "#identification"
password-selector = "#password"
submit-selector = "button[type=submit]"
"##,
    );
    let run_dir = RunDirectory::create(&dir.path().join("results"), Utc::now(), "firefox").unwrap();

    let mut session = ScriptedSession::new().page("", "<h1>Dashboard</h1>");

    let outcome = explore_session(&mut session, &config, &run_dir, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason.as_str(), "aborted");
    assert!(outcome.graph.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].trigger, "sign in http://app.test/signin");
    assert_eq!(outcome.failures[0].kind, FailureKind::Navigation);
}

async fn unavailable_driver() -> MockServer {
    let driver = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&driver)
        .await;
    driver
}

#[tokio::test]
async fn test_unavailable_driver_still_records_run() {
    let driver = unavailable_driver().await;

    let dir = TempDir::new().unwrap();
    let config = config_in(
        dir.path(),
        &format!("[browser.endpoints]\nchromium = \"{}\"\n", driver.uri()),
    );

    let report = run_engine(
        &config,
        Engine::Chromium,
        Utc::now(),
        "hash",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert!(report.output_dir.ends_with("chromium"));
    assert!(report.output_dir.join("graph.json").exists());
    assert!(report.output_dir.join("failures.json").exists());
    assert!(report.output_dir.join("summary.md").exists());

    let storage = SqliteStorage::new(&dir.path().join("atlas.db")).unwrap();
    let runs = storage.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].engine, "chromium");
    assert!(runs[0].finished_at.is_some());
    assert_eq!(runs[0].config_hash, "hash");
}

#[tokio::test]
async fn test_unwritable_artifacts_still_finish_ledger_row() {
    let driver = unavailable_driver().await;

    let dir = TempDir::new().unwrap();
    let config = config_in(
        dir.path(),
        &format!("[browser.endpoints]\nchromium = \"{}\"\n", driver.uri()),
    );

    // A directory where graph.json should go makes the artifact write fail
    let started = Utc::now();
    let run_dir = dir
        .path()
        .join("results")
        .join(run_timestamp(started))
        .join("chromium");
    std::fs::create_dir_all(run_dir.join("graph.json")).unwrap();

    let result = run_engine(
        &config,
        Engine::Chromium,
        started,
        "hash",
        CancellationToken::new(),
    )
    .await;
    assert!(result.is_err());

    let storage = SqliteStorage::new(&dir.path().join("atlas.db")).unwrap();
    let runs = storage.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].finished_at.is_some());
}
