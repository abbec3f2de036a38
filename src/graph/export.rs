//! Serializable graph description (`graph.json`)
//!
//! Shape: `{ "nodes": [{id, sequenceNumber, depth, url}], "links": [{from, to, trigger}] }`

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExport {
    pub id: Fingerprint,
    pub sequence_number: u64,
    pub depth: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkExport {
    pub from: Fingerprint,
    pub to: Fingerprint,
    pub trigger: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub links: Vec<LinkExport>,
}
