//! Exploration frontier
//!
//! This module tracks, for one exploration run:
//! - The set of identities already visited (never shrinks)
//! - The stack of states waiting to be expanded
//! - For each visited state, the route that reaches it from the root, used
//!   to bring the browser session back to that state

use crate::browser::Affordance;
use crate::fingerprint::Fingerprint;
use std::collections::{HashMap, HashSet};

/// A visited state waiting for expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub identity: Fingerprint,
    pub depth: u32,
}

/// How to reach a state again
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// URL the state was rendered at; navigating here is tried first
    pub url: String,

    /// Affordances performed from the root to reach the state
    pub steps: Vec<Affordance>,
}

impl Route {
    /// Route to the root state
    pub fn root(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            steps: Vec::new(),
        }
    }

    /// Route to a state reached from this one by `step`, rendered at `url`
    pub fn extend(&self, step: Affordance, url: impl Into<String>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);

        Self {
            url: url.into(),
            steps,
        }
    }
}

/// Visited set plus pending work for a depth-first traversal
#[derive(Debug, Default)]
pub struct Frontier {
    visited: HashSet<Fingerprint>,
    routes: HashMap<Fingerprint, Route>,
    stack: Vec<WorkItem>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an identity visited and remembers its route
    ///
    /// # Returns
    ///
    /// `true` on first visit; `false` (route unchanged) otherwise
    pub fn visit(&mut self, identity: &Fingerprint, route: Route) -> bool {
        if !self.visited.insert(identity.clone()) {
            return false;
        }

        self.routes.insert(identity.clone(), route);
        true
    }

    pub fn is_visited(&self, identity: &Fingerprint) -> bool {
        self.visited.contains(identity)
    }

    pub fn route(&self, identity: &Fingerprint) -> Option<&Route> {
        self.routes.get(identity)
    }

    /// Queues a single item for expansion
    pub fn push(&mut self, item: WorkItem) {
        self.stack.push(item);
    }

    /// Queues the children discovered from one state
    ///
    /// Children are pushed in reverse so the first discovered child is
    /// expanded first (document order).
    pub fn push_children(&mut self, children: Vec<WorkItem>) {
        self.stack.extend(children.into_iter().rev());
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.stack.pop()
    }

    /// Number of items waiting for expansion
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
