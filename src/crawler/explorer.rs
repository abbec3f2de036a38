//! Bounded explorer - depth-first traversal of a rendered application
//!
//! This module contains the exploration loop, which:
//! - Renders and fingerprints the root state
//! - Expands states depth-first from an explicit work stack
//! - Performs every affordance of an expanded state and fingerprints the result
//! - Archives and records each new state, records every transition
//! - Logs per-affordance failures without stopping the run
//! - Stops on exhaustion, state ceiling, cancellation or a fatal error

use crate::archive::SnapshotArchive;
use crate::browser::{Affordance, BrowserError, BrowserSession, RenderedPage};
use crate::config::ExplorationPolicy;
use crate::crawler::affordance::{extract_affordances, AffordanceFilter};
use crate::crawler::frontier::{Frontier, Route, WorkItem};
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::graph::{NewState, ReachabilityGraph, Transition};
use crate::synth::SyntheticContent;
use crate::AtlasError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    RenderUnavailable,
    Navigation,
    Timeout,
    ElementNotFound,
    StateDrift,
    Browser,
}

impl FailureKind {
    fn of(error: &AtlasError) -> Self {
        match error {
            AtlasError::RenderUnavailable { .. } => Self::RenderUnavailable,
            AtlasError::StateDrift { .. } => Self::StateDrift,
            AtlasError::Browser(BrowserError::Navigation { .. }) => Self::Navigation,
            AtlasError::Browser(BrowserError::Timeout { .. }) => Self::Timeout,
            AtlasError::Browser(BrowserError::ElementNotFound { .. }) => Self::ElementNotFound,
            _ => Self::Browser,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RenderUnavailable => "render-unavailable",
            Self::Navigation => "navigation",
            Self::Timeout => "timeout",
            Self::ElementNotFound => "element-not-found",
            Self::StateDrift => "state-drift",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed render or action attempt, with enough context to reproduce it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// URL of the state the attempt started from
    pub url: String,

    /// Description of the affordance (or `navigate <url>` for the root)
    pub trigger: String,

    /// Depth of the state the attempt started from
    pub depth: u32,

    pub kind: FailureKind,
    pub message: String,
}

impl FailureRecord {
    pub(crate) fn new(url: &str, trigger: &str, depth: u32, error: &AtlasError) -> Self {
        Self {
            url: url.to_string(),
            trigger: trigger.to_string(),
            depth,
            kind: FailureKind::of(error),
            message: error.to_string(),
        }
    }
}

/// Why an exploration run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every reachable state within the depth limit was expanded
    Exhausted,

    /// The configured state ceiling was reached
    StateCeiling,

    /// Cancellation was requested (operator abort or timeout)
    Cancelled,

    /// The root state could not be rendered; the graph is empty
    RootUnavailable,

    /// A structural failure ended the run early
    Aborted { reason: String },
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::StateCeiling => "state-ceiling",
            Self::Cancelled => "cancelled",
            Self::RootUnavailable => "root-unavailable",
            Self::Aborted { .. } => "aborted",
        }
    }

    /// True when the run covered everything it was allowed to
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Exhausted | Self::StateCeiling)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result of one exploration run
#[derive(Debug)]
pub struct ExplorationOutcome {
    pub graph: ReachabilityGraph,
    pub failures: Vec<FailureRecord>,
    pub stop_reason: StopReason,
}

/// The state the session currently shows, as last rendered
struct Current {
    identity: Fingerprint,
    page: RenderedPage,
}

/// Accumulated results of one run
#[derive(Default)]
struct Progress {
    graph: ReachabilityGraph,
    failures: Vec<FailureRecord>,
    frontier: Frontier,
}

/// Depth-bounded explorer driving one browser session
///
/// The explorer borrows its session and archive, so the caller keeps
/// ownership and can close the session on every exit path.
pub struct Explorer<'a, S: ?Sized, A: ?Sized> {
    session: &'a mut S,
    archive: &'a A,
    policy: ExplorationPolicy,
    fingerprinter: Fingerprinter,
    synth: SyntheticContent,
    cancel: CancellationToken,
    current: Option<Current>,
}

impl<'a, S, A> Explorer<'a, S, A>
where
    S: BrowserSession + ?Sized,
    A: SnapshotArchive + ?Sized,
{
    pub fn new(
        session: &'a mut S,
        archive: &'a A,
        policy: ExplorationPolicy,
        fingerprinter: Fingerprinter,
        cancel: CancellationToken,
    ) -> Self {
        let synth = SyntheticContent::new(policy.seed, policy.input_overrides.clone());

        Self {
            session,
            archive,
            policy,
            fingerprinter,
            synth,
            cancel,
            current: None,
        }
    }

    /// Explores the application reachable from `root_url`
    ///
    /// Never fails as a whole: per-affordance failures end up in
    /// `failures`, fatal ones in `stop_reason`, and the graph returned is
    /// consistent as of the last completed step in every case.
    pub async fn explore(&mut self, root_url: &str) -> ExplorationOutcome {
        let mut progress = Progress::default();

        let stop_reason = match self.traverse(root_url, &mut progress).await {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!("Exploration aborted: {}", e);
                StopReason::Aborted {
                    reason: e.to_string(),
                }
            }
        };

        tracing::info!(
            "Exploration finished ({}): {} states, {} transitions, {} failures",
            stop_reason,
            progress.graph.len(),
            progress.graph.edge_count(),
            progress.failures.len()
        );

        ExplorationOutcome {
            graph: progress.graph,
            failures: progress.failures,
            stop_reason,
        }
    }

    async fn traverse(
        &mut self,
        root_url: &str,
        progress: &mut Progress,
    ) -> Result<StopReason, AtlasError> {
        let root = Url::parse(root_url)?;
        let filter = AffordanceFilter::new(&self.policy, &root)?;

        if self.cancel.is_cancelled() {
            return Ok(StopReason::Cancelled);
        }

        let root_trigger = format!("navigate {}", root_url);
        let rendered = self.render_at(root_url).await;
        let (page, identity) = match rendered {
            Ok(found) => found,
            Err(e) if e.is_recoverable() => {
                tracing::error!("Root state unavailable: {}", e);
                progress
                    .failures
                    .push(FailureRecord::new(root_url, &root_trigger, 0, &e));
                return Ok(StopReason::RootUnavailable);
            }
            Err(e) => return Err(e),
        };

        self.admit(&mut progress.graph, &identity, &page, 0).await?;
        progress
            .frontier
            .visit(&identity, Route::root(page.url.clone()));
        progress.frontier.push(WorkItem {
            identity: identity.clone(),
            depth: 0,
        });
        self.current = Some(Current { identity, page });

        if self.ceiling_reached(&progress.graph) {
            return Ok(StopReason::StateCeiling);
        }

        while let Some(item) = progress.frontier.pop() {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping expansion");
                return Ok(StopReason::Cancelled);
            }

            if item.depth >= self.policy.depth_levels {
                tracing::trace!("State {} at depth limit, not expanded", item.identity.short());
                continue;
            }

            let page = match self.restore(root_url, &item.identity, &progress.frontier).await {
                Ok(page) => page,
                Err(e) if e.is_recoverable() => {
                    let url = state_url(progress, &item.identity);
                    tracing::warn!("Skipping state {}: {}", item.identity.short(), e);
                    progress.failures.push(FailureRecord::new(
                        &url,
                        &format!("restore {}", item.identity.short()),
                        item.depth,
                        &e,
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(reason) = self.expand(&item, &page, root_url, &filter, progress).await? {
                return Ok(reason);
            }
        }

        Ok(StopReason::Exhausted)
    }

    /// Exercises every affordance of one state
    ///
    /// Returns `Some(reason)` when the run must stop early.
    async fn expand(
        &mut self,
        item: &WorkItem,
        page: &RenderedPage,
        root_url: &str,
        filter: &AffordanceFilter,
        progress: &mut Progress,
    ) -> Result<Option<StopReason>, AtlasError> {
        let page_url = Url::parse(&page.url)?;
        let affordances = extract_affordances(&page.dom, &page_url, filter, &mut self.synth);

        tracing::info!(
            "Expanding state {} at depth {} ({} affordances, {} pending)",
            item.identity.short(),
            item.depth,
            affordances.len(),
            progress.frontier.pending()
        );

        let mut children = Vec::new();

        for affordance in affordances {
            if self.cancel.is_cancelled() {
                progress.frontier.push_children(children);
                return Ok(Some(StopReason::Cancelled));
            }

            let trigger = affordance.describe();
            tracing::debug!("Trying {} from {}", trigger, item.identity.short());

            let (target_page, target) = match self
                .attempt(&item.identity, &affordance, root_url, &progress.frontier)
                .await
            {
                Ok(found) => found,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{} failed: {}", trigger, e);
                    progress
                        .failures
                        .push(FailureRecord::new(&page.url, &trigger, item.depth, &e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let depth = item.depth + 1;
            if !progress.frontier.is_visited(&target) {
                self.admit(&mut progress.graph, &target, &target_page, depth)
                    .await?;

                let route = progress
                    .frontier
                    .route(&item.identity)
                    .cloned()
                    .unwrap_or_else(|| Route::root(page.url.clone()))
                    .extend(affordance.clone(), target_page.url.clone());
                progress.frontier.visit(&target, route);
                children.push(WorkItem {
                    identity: target.clone(),
                    depth,
                });
            }

            progress.graph.add_edge(Transition {
                from: item.identity.clone(),
                to: target.clone(),
                trigger,
            })?;

            self.current = Some(Current {
                identity: target,
                page: target_page,
            });

            if self.ceiling_reached(&progress.graph) {
                tracing::info!("State ceiling reached");
                progress.frontier.push_children(children);
                return Ok(Some(StopReason::StateCeiling));
            }
        }

        progress.frontier.push_children(children);
        Ok(None)
    }

    /// Performs one affordance from `from` and fingerprints the result
    ///
    /// Links navigate to an absolute target and work from anywhere; forms
    /// act on the current DOM, so the session is first returned to `from`.
    async fn attempt(
        &mut self,
        from: &Fingerprint,
        affordance: &Affordance,
        root_url: &str,
        frontier: &Frontier,
    ) -> Result<(RenderedPage, Fingerprint), AtlasError> {
        let at_origin = matches!(&self.current, Some(current) if &current.identity == from);
        if matches!(affordance, Affordance::Form { .. }) && !at_origin {
            self.restore(root_url, from, frontier).await?;
        }

        self.current = None;
        self.session.perform(affordance).await?;
        let page = self.session.render().await?;
        let identity = self.fingerprinter.fingerprint(&page)?;

        Ok((page, identity))
    }

    /// Brings the session back to a visited state
    ///
    /// Navigates to the state's URL first; if that renders something else
    /// (client-side state, form results), replays the state's route from the
    /// root. Fails with `StateDrift` when neither reproduces the identity.
    async fn restore(
        &mut self,
        root_url: &str,
        identity: &Fingerprint,
        frontier: &Frontier,
    ) -> Result<RenderedPage, AtlasError> {
        if let Some(current) = &self.current {
            if &current.identity == identity {
                return Ok(current.page.clone());
            }
        }

        let route = frontier
            .route(identity)
            .cloned()
            .ok_or_else(|| AtlasError::UnknownState {
                identity: identity.to_string(),
            })?;
        self.current = None;

        match self.render_at(&route.url).await {
            Ok((page, found)) if &found == identity => return Ok(self.settle_at(found, page)),
            Ok((_, found)) => tracing::debug!(
                "{} renders {} instead of {}, replaying route",
                route.url,
                found.short(),
                identity.short()
            ),
            Err(e) if e.is_recoverable() => {
                tracing::debug!("Direct navigation to {} failed: {}", route.url, e)
            }
            Err(e) => return Err(e),
        }

        if !route.steps.is_empty() {
            self.session.navigate(root_url).await?;
            for step in &route.steps {
                self.session.perform(step).await?;
            }

            let page = self.session.render().await?;
            let found = self.fingerprinter.fingerprint(&page)?;
            if &found == identity {
                return Ok(self.settle_at(found, page));
            }
        }

        Err(AtlasError::StateDrift {
            identity: identity.to_string(),
            url: route.url,
        })
    }

    fn settle_at(&mut self, identity: Fingerprint, page: RenderedPage) -> RenderedPage {
        self.current = Some(Current {
            identity,
            page: page.clone(),
        });
        page
    }

    async fn render_at(&mut self, url: &str) -> Result<(RenderedPage, Fingerprint), AtlasError> {
        let page = self.session.navigate(url).await?;
        let identity = self.fingerprinter.fingerprint(&page)?;
        Ok((page, identity))
    }

    /// Archives a new state's snapshot, then adds it to the graph
    ///
    /// The node is only added once its snapshot is durable.
    async fn admit(
        &self,
        graph: &mut ReachabilityGraph,
        identity: &Fingerprint,
        page: &RenderedPage,
        depth: u32,
    ) -> Result<(), AtlasError> {
        let snapshot = self.archive.put(identity, &page.dom).await?;

        let insert = graph.add_node(NewState {
            identity: identity.clone(),
            depth,
            url: page.url.clone(),
            snapshot,
        });

        tracing::info!(
            "Discovered state #{} {} at depth {}: {}",
            insert.sequence_number,
            identity.short(),
            depth,
            page.url
        );

        Ok(())
    }

    fn ceiling_reached(&self, graph: &ReachabilityGraph) -> bool {
        self.policy
            .state_ceiling
            .is_some_and(|ceiling| graph.len() as u64 >= ceiling)
    }
}

fn state_url(progress: &Progress, identity: &Fingerprint) -> String {
    progress
        .graph
        .state(identity)
        .map(|state| state.url.clone())
        .unwrap_or_default()
}
