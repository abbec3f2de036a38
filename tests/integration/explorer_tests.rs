//! Explorer scenarios against a scripted browser session

use crate::support::{config_with, link, url, ScriptedSession, ROOT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sumi_atlas::archive::{ArchiveError, ArchiveResult, FsArchive, SnapshotArchive};
use sumi_atlas::config::{Config, OverwritePolicy};
use sumi_atlas::crawler::{ExplorationOutcome, Explorer, FailureKind, StopReason};
use sumi_atlas::fingerprint::{Fingerprint, Fingerprinter};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn open_archive(dir: &Path) -> FsArchive {
    FsArchive::open(
        dir.join("snapshots"),
        OverwritePolicy::FirstWriteWins,
        Duration::ZERO,
    )
    .await
    .unwrap()
}

async fn explore_into<A: SnapshotArchive>(
    session: &mut ScriptedSession,
    config: &Config,
    archive: &A,
    cancel: CancellationToken,
) -> ExplorationOutcome {
    let fingerprinter = Fingerprinter::new(&config.exploration).unwrap();
    Explorer::new(
        session,
        archive,
        config.exploration.clone(),
        fingerprinter,
        cancel,
    )
    .explore(ROOT)
    .await
}

async fn explore(
    session: &mut ScriptedSession,
    config: &Config,
    cancel: CancellationToken,
) -> (ExplorationOutcome, FsArchive, TempDir) {
    let dir = TempDir::new().unwrap();
    let archive = open_archive(dir.path()).await;
    let outcome = explore_into(session, config, &archive, cancel).await;
    (outcome, archive, dir)
}

/// Every transition joins two admitted states
fn assert_edges_consistent(outcome: &ExplorationOutcome) {
    for edge in outcome.graph.transitions() {
        assert!(outcome.graph.contains(&edge.from), "dangling source {}", edge.from);
        assert!(outcome.graph.contains(&edge.to), "dangling target {}", edge.to);
    }
}

/// Archive that stops accepting snapshots after `limit` writes
struct FullDisk {
    inner: FsArchive,
    limit: usize,
    writes: AtomicUsize,
}

#[async_trait]
impl SnapshotArchive for FullDisk {
    async fn put(&self, identity: &Fingerprint, snapshot: &str) -> ArchiveResult<PathBuf> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return Err(ArchiveError::Write {
                identity: identity.to_string(),
                path: PathBuf::from(format!("snapshots/{}.html", identity)),
                source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            });
        }
        self.inner.put(identity, snapshot).await
    }

    async fn exists(&self, identity: &Fingerprint) -> bool {
        self.inner.exists(identity).await
    }

    async fn get(&self, identity: &Fingerprint) -> ArchiveResult<String> {
        self.inner.get(identity).await
    }
}

fn state_urls(outcome: &ExplorationOutcome) -> Vec<String> {
    outcome.graph.states().iter().map(|s| s.url.clone()).collect()
}

#[tokio::test]
async fn test_home_about_two_states_two_transitions() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}", link("about", "About")))
        .page("about", &format!("<h1>About</h1>{}", link("", "Home")));
    let config = config_with("depth-levels = 2");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(state_urls(&outcome), vec![url(""), url("about")]);
    assert_eq!(outcome.graph.edge_count(), 2);

    let home = &outcome.graph.states()[0];
    let about = &outcome.graph.states()[1];
    let edges = outcome.graph.transitions();
    assert_eq!((&edges[0].from, &edges[0].to), (&home.identity, &about.identity));
    assert_eq!((&edges[1].from, &edges[1].to), (&about.identity, &home.identity));
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_depth_one_leaves_unexpanded() {
    let back = link("", "Home");
    let mut session = ScriptedSession::new()
        .page(
            "",
            &format!(
                "<h1>Home</h1>{}{}{}",
                link("a", "A"),
                link("b", "B"),
                link("c", "C")
            ),
        )
        .page("a", &format!("<h1>A</h1>{}", back))
        .page("b", &format!("<h1>B</h1>{}", back))
        .page("c", &format!("<h1>C</h1>{}", back));
    let config = config_with("depth-levels = 1");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.graph.len(), 4);
    assert_eq!(outcome.graph.edge_count(), 3);

    let root = outcome.graph.states()[0].identity.clone();
    assert!(outcome.graph.transitions().iter().all(|t| t.from == root));
    assert!(outcome.graph.states()[1..].iter().all(|s| s.depth == 1));
}

#[tokio::test]
async fn test_cycle_terminates() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>A</h1>{}", link("b", "B")))
        .page("b", &format!("<h1>B</h1>{}", link("", "A")));
    let config = config_with("depth-levels = 50");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(outcome.graph.len(), 2);
    assert_eq!(outcome.graph.edge_count(), 2);
}

#[tokio::test]
async fn test_failed_render_recorded_without_node_or_edge() {
    let mut session = ScriptedSession::new()
        .page(
            "",
            &format!("<h1>Home</h1>{}{}", link("broken", "Broken"), link("about", "About")),
        )
        .page("about", "<h1>About</h1>")
        .failing("broken");
    let config = config_with("depth-levels = 1");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(state_urls(&outcome), vec![url(""), url("about")]);
    assert_eq!(outcome.graph.edge_count(), 1);

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.kind, FailureKind::Navigation);
    assert_eq!(failure.url, url(""));
    assert_eq!(failure.depth, 0);
    assert!(failure.trigger.contains("broken"));
}

#[tokio::test]
async fn test_root_unavailable() {
    let mut session = ScriptedSession::new().failing("");
    let config = config_with("depth-levels = 1");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::RootUnavailable);
    assert!(outcome.graph.is_empty());
    assert_eq!(outcome.failures.len(), 1);
}

#[tokio::test]
async fn test_state_ceiling_stops_run() {
    let mut session = ScriptedSession::new()
        .page(
            "",
            &format!("<h1>Home</h1>{}{}{}", link("a", "A"), link("b", "B"), link("c", "C")),
        )
        .page("a", "<h1>A</h1>")
        .page("b", "<h1>B</h1>")
        .page("c", "<h1>C</h1>");
    let config = config_with("depth-levels = 3\nstate-ceiling = 2");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::StateCeiling);
    assert_eq!(outcome.graph.len(), 2);
    assert!(!session.navigations.contains(&url("c")));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut session = ScriptedSession::new().page("", "<h1>Home</h1>");
    let config = config_with("depth-levels = 1");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (outcome, _archive, _dir) = explore(&mut session, &config, cancel).await;

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert!(outcome.graph.is_empty());
    assert!(session.navigations.is_empty());
}

#[tokio::test]
async fn test_depth_monotonic_and_bounded() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Root</h1>{}", link("one", "Next")))
        .page("one", &format!("<h1>One</h1>{}", link("two", "Next")))
        .page("two", &format!("<h1>Two</h1>{}", link("three", "Next")))
        .page("three", "<h1>Three</h1>");
    let config = config_with("depth-levels = 2");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(state_urls(&outcome), vec![url(""), url("one"), url("two")]);
    for transition in outcome.graph.transitions() {
        let from = outcome.graph.state(&transition.from).unwrap();
        let to = outcome.graph.state(&transition.to).unwrap();
        assert!(to.depth <= from.depth + 1);
    }
    assert!(outcome.graph.states().iter().all(|s| s.depth <= 2));
}

#[tokio::test]
async fn test_self_loop_recorded() {
    let mut session = ScriptedSession::new().page("", &format!("<h1>Home</h1>{}", link("", "Home")));
    let config = config_with("depth-levels = 2");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.graph.len(), 1);
    assert_eq!(outcome.graph.edge_count(), 1);
    let edge = &outcome.graph.transitions()[0];
    assert_eq!(edge.from, edge.to);
}

#[tokio::test]
async fn test_snapshots_archived_per_state() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}", link("about", "About")))
        .page("about", "<h1>About</h1>");
    let config = config_with("depth-levels = 1");

    let (outcome, archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    for state in outcome.graph.states() {
        assert!(archive.exists(&state.identity).await);
        assert!(state.snapshot.exists());
        let snapshot = archive.get(&state.identity).await.unwrap();
        assert!(snapshot.contains("<h1>"));
    }
}

#[tokio::test]
async fn test_form_submission_after_restoring_origin() {
    let mut session = ScriptedSession::new()
        .page(
            "",
            &format!(
                "<h1>Home</h1>{}<form id=\"search\"><input name=\"q\"><button>Go</button></form>",
                link("about", "About")
            ),
        )
        .page("about", "<h1>About</h1>")
        .page("results", "<h1>Results</h1>")
        .form_target("results");
    let config = config_with("depth-levels = 1\ninput-values = true\nseed = 7");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(
        state_urls(&outcome),
        vec![url(""), url("about"), url("results")]
    );
    assert_eq!(session.submissions, 1);

    // The link moved the session away, so the root was reloaded before submitting
    let root_loads = session.navigations.iter().filter(|u| **u == url("")).count();
    assert_eq!(root_loads, 2);
    assert!(outcome.graph.transitions()[1].trigger.starts_with("submit"));
}

#[tokio::test]
async fn test_forms_ignored_without_input_values() {
    let mut session = ScriptedSession::new()
        .page(
            "",
            "<h1>Home</h1><form id=\"search\"><input name=\"q\"><button>Go</button></form>",
        )
        .page("results", "<h1>Results</h1>")
        .form_target("results");
    let config = config_with("depth-levels = 1");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.graph.len(), 1);
    assert_eq!(session.submissions, 0);
}

#[tokio::test]
async fn test_cancelled_mid_expansion_keeps_consistent_graph() {
    let cancel = CancellationToken::new();
    let mut session = ScriptedSession::new()
        .page(
            "",
            &format!("<h1>Home</h1>{}{}{}", link("a", "A"), link("b", "B"), link("c", "C")),
        )
        .page("a", &format!("<h1>A</h1>{}", link("d", "D")))
        .page("b", "<h1>B</h1>")
        .page("c", "<h1>C</h1>")
        .page("d", "<h1>D</h1>")
        .cancel_on_perform(2, cancel.clone());
    let config = config_with("depth-levels = 3");

    let (outcome, archive, _dir) = explore(&mut session, &config, cancel).await;

    // The action in flight completes; nothing starts after it
    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(state_urls(&outcome), vec![url(""), url("a"), url("b")]);
    assert_eq!(outcome.graph.edge_count(), 2);
    assert!(outcome.failures.is_empty());
    assert_edges_consistent(&outcome);

    for state in outcome.graph.states() {
        assert!(archive.exists(&state.identity).await);
    }
}

#[tokio::test]
async fn test_archive_failure_aborts_without_dangling_edge() {
    let dir = TempDir::new().unwrap();
    let archive = FullDisk {
        inner: open_archive(dir.path()).await,
        limit: 2,
        writes: AtomicUsize::new(0),
    };
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}{}", link("a", "A"), link("b", "B")))
        .page("a", "<h1>A</h1>")
        .page("b", "<h1>B</h1>");
    let config = config_with("depth-levels = 2");

    let outcome = explore_into(&mut session, &config, &archive, CancellationToken::new()).await;

    match &outcome.stop_reason {
        StopReason::Aborted { reason } => assert!(reason.contains("no space left")),
        other => panic!("expected an aborted run, got {:?}", other),
    }
    assert_eq!(state_urls(&outcome), vec![url(""), url("a")]);
    assert_eq!(outcome.graph.edge_count(), 1);
    assert_edges_consistent(&outcome);

    for state in outcome.graph.states() {
        assert!(archive.exists(&state.identity).await);
    }
}

const SEARCH_FORM: &str = "<form id=\"search\"><input name=\"q\"><button>Go</button></form>";

#[tokio::test]
async fn test_same_url_state_restored_by_replaying_route() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}{}", link("a", "A"), SEARCH_FORM))
        .page("a", "<h1>A</h1>")
        .page("x", "<h1>X</h1>")
        .form_view("", &format!("<h1>Results</h1>{}", link("x", "X")));
    let config = config_with("depth-levels = 2\ninput-values = true\nseed = 7");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert!(outcome.failures.is_empty());
    assert_eq!(
        state_urls(&outcome),
        vec![url(""), url("a"), url(""), url("x")]
    );

    let results = &outcome.graph.states()[2];
    assert_eq!(results.depth, 1);
    assert_eq!(outcome.graph.states()[3].depth, 2);
    assert_ne!(results.identity, outcome.graph.states()[0].identity);

    // Once on discovery and once replayed to reach the results again
    assert_eq!(session.submissions, 2);
    assert_edges_consistent(&outcome);
}

#[tokio::test]
async fn test_unreproducible_state_recorded_as_drift() {
    let mut session = ScriptedSession::new()
        .page("", &format!("<h1>Home</h1>{}{}", link("a", "A"), SEARCH_FORM))
        .page("a", "<h1>A</h1>")
        .page("x", "<h1>X</h1>")
        .form_view("", &format!("<h1>Results</h1>{}", link("x", "X")))
        .form_view("", "<h1>No results</h1>");
    let config = config_with("depth-levels = 2\ninput-values = true\nseed = 7");

    let (outcome, _archive, _dir) = explore(&mut session, &config, CancellationToken::new()).await;

    assert_eq!(outcome.stop_reason, StopReason::Exhausted);
    assert_eq!(state_urls(&outcome), vec![url(""), url("a"), url("")]);
    assert!(!state_urls(&outcome).contains(&url("x")));

    assert_eq!(outcome.failures.len(), 1);
    let drift = &outcome.failures[0];
    assert_eq!(drift.kind, FailureKind::StateDrift);
    assert_eq!(drift.url, url(""));
    assert_eq!(drift.depth, 1);
    assert!(drift.trigger.starts_with("restore "));
    assert_edges_consistent(&outcome);
}
