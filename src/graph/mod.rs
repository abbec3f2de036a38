//! Reachability graph of discovered states
//!
//! The graph owns every distinct state found during one exploration run and
//! every transition exercised between them. It only ever grows: states are
//! unique by identity and immutable once inserted, transitions are appended
//! without deduplication (distinct user actions are distinct edges).

mod export;

pub use export::{GraphExport, LinkExport, NodeExport};

use crate::fingerprint::Fingerprint;
use crate::AtlasError;
use std::collections::HashMap;
use std::path::PathBuf;

/// A discovered, distinct point in the application's UI space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub identity: Fingerprint,

    /// 0-based discovery order
    pub sequence_number: u64,

    /// Minimum depth from the root at first discovery
    pub depth: u32,

    /// URL the state was first rendered at
    pub url: String,

    /// Archived DOM snapshot
    pub snapshot: PathBuf,
}

/// A state about to be inserted; the graph assigns its sequence number
#[derive(Debug, Clone)]
pub struct NewState {
    pub identity: Fingerprint,
    pub depth: u32,
    pub url: String,
    pub snapshot: PathBuf,
}

/// A recorded user action from one state to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Fingerprint,
    pub to: Fingerprint,

    /// Description of the affordance that was exercised
    pub trigger: String,
}

/// Outcome of [`ReachabilityGraph::add_node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInsert {
    /// False when the identity was already present (nothing changed)
    pub inserted: bool,

    /// Sequence number of the state with this identity
    pub sequence_number: u64,
}

/// Directed graph of states and transitions for one run
#[derive(Debug, Default)]
pub struct ReachabilityGraph {
    states: Vec<State>,
    index: HashMap<Fingerprint, usize>,
    transitions: Vec<Transition>,
}

impl ReachabilityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state unless its identity is already present
    ///
    /// Re-adding an identity never mutates the existing state: its depth,
    /// URL and snapshot stay as first recorded.
    pub fn add_node(&mut self, state: NewState) -> NodeInsert {
        if let Some(&position) = self.index.get(&state.identity) {
            return NodeInsert {
                inserted: false,
                sequence_number: self.states[position].sequence_number,
            };
        }

        let sequence_number = self.states.len() as u64;
        self.index.insert(state.identity.clone(), self.states.len());
        self.states.push(State {
            identity: state.identity,
            sequence_number,
            depth: state.depth,
            url: state.url,
            snapshot: state.snapshot,
        });

        NodeInsert {
            inserted: true,
            sequence_number,
        }
    }

    /// Appends a transition between two known states
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was recorded
    /// * `Err(AtlasError::UnknownState)` - An endpoint is not in the graph
    pub fn add_edge(&mut self, transition: Transition) -> Result<(), AtlasError> {
        for endpoint in [&transition.from, &transition.to] {
            if !self.index.contains_key(endpoint) {
                return Err(AtlasError::UnknownState {
                    identity: endpoint.to_string(),
                });
            }
        }

        self.transitions.push(transition);
        Ok(())
    }

    pub fn contains(&self, identity: &Fingerprint) -> bool {
        self.index.contains_key(identity)
    }

    pub fn state(&self, identity: &Fingerprint) -> Option<&State> {
        self.index.get(identity).map(|&position| &self.states[position])
    }

    /// States in discovery order
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Transitions in the order they were exercised
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.transitions.len()
    }

    /// Nodes ordered by sequence number plus all links, ready to serialize
    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self
                .states
                .iter()
                .map(|state| NodeExport {
                    id: state.identity.clone(),
                    sequence_number: state.sequence_number,
                    depth: state.depth,
                    url: state.url.clone(),
                })
                .collect(),
            links: self
                .transitions
                .iter()
                .map(|transition| LinkExport {
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                    trigger: transition.trigger.clone(),
                })
                .collect(),
        }
    }
}
