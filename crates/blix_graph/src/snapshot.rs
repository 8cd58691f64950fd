// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot transfer format.
//!
//! A snapshot is the JSON-shaped projection of a graph handed to the
//! rendering layer and to project persistence:
//!
//! ```json
//! {
//!   "nodes": [{ "id": "…", "signature": "plugin/type", "styling": null, "anchors": ["…"] }],
//!   "edges": [{ "id": "…", "from": { "nodeId": "…", "anchorId": "…" },
//!                          "to":   { "nodeId": "…", "anchorId": "…" } }]
//! }
//! ```
//!
//! Edge `id` always equals `to.anchorId`. Reloading re-resolves every node
//! through a [`Toolbox`] and re-validates every edge; bad entries are skipped
//! and reported one by one.

use crate::graph::{Graph, GraphError};
use crate::id::{AnchorId, EdgeId, NodeId};
use crate::node::{parse_signature, NodeStyling};
use crate::toolbox::Toolbox;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Serialized projection of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes in graph insertion order
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
    /// Edges in graph insertion order
    #[serde(default)]
    pub edges: Vec<EdgeSnapshot>,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    /// Node ID
    pub id: NodeId,
    /// `<plugin>/<typeName>`
    pub signature: String,
    /// Editor layout
    #[serde(default)]
    pub styling: Option<NodeStyling>,
    /// Anchor IDs, inputs first, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<AnchorId>,
}

/// Serialized edge endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSnapshot {
    /// Owning node
    pub node_id: NodeId,
    /// Anchor
    pub anchor_id: AnchorId,
}

/// Serialized edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Edge ID, equal to the destination anchor ID
    pub id: EdgeId,
    /// Output side
    pub from: EndpointSnapshot,
    /// Input side
    pub to: EndpointSnapshot,
}

impl GraphSnapshot {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What to do with a snapshot that contains invalid entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadPolicy {
    /// Load everything valid and report the rest
    #[default]
    SkipInvalid,
    /// Fail the whole load if any entry is invalid
    Abort,
}

/// Why a snapshot entry was not loaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// Signature is not `<plugin>/<typeName>`
    #[error("malformed signature")]
    MalformedSignature,
    /// No toolbox entry for the signature
    #[error("signature not found in toolbox")]
    UnknownSignature,
    /// Toolbox answered with a node type under a different signature
    #[error("toolbox resolved it as {0}")]
    SignatureMismatch(String),
    /// Stored anchor list does not match the toolbox definition
    #[error("expected {expected} anchors, found {found}")]
    AnchorCountMismatch {
        /// Anchors declared by the toolbox
        expected: usize,
        /// Anchors stored in the snapshot
        found: usize,
    },
    /// Node or anchor ID already in use
    #[error("duplicate id")]
    DuplicateId,
    /// Edge endpoint references an anchor that was not loaded
    #[error("unknown anchor {0}")]
    UnknownAnchor(AnchorId),
    /// Edge endpoint names a node that does not own the anchor
    #[error("anchor {0} does not belong to the named node")]
    EndpointMismatch(AnchorId),
    /// Edge ID differs from its destination anchor ID
    #[error("edge id does not match destination anchor")]
    EdgeIdMismatch,
    /// Edge failed graph validation
    #[error("{0}")]
    Rejected(GraphError),
}

/// A snapshot entry that was not loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedItem {
    /// Skipped node
    Node {
        /// Node ID from the snapshot
        id: NodeId,
        /// Signature from the snapshot
        signature: String,
        /// Why it was skipped
        reason: SkipReason,
    },
    /// Skipped edge
    Edge {
        /// Edge ID from the snapshot
        id: EdgeId,
        /// Why it was skipped
        reason: SkipReason,
    },
}

impl SkippedItem {
    /// Why the item was skipped
    pub fn reason(&self) -> &SkipReason {
        match self {
            Self::Node { reason, .. } | Self::Edge { reason, .. } => reason,
        }
    }
}

impl fmt::Display for SkippedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { id, signature, reason } => write!(f, "node {id} ({signature}): {reason}"),
            Self::Edge { id, reason } => write!(f, "edge {id}: {reason}"),
        }
    }
}

/// Outcome of rebuilding a graph from a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nodes restored
    pub nodes_loaded: usize,
    /// Edges restored
    pub edges_loaded: usize,
    /// Entries left out
    pub skipped: Vec<SkippedItem>,
}

impl LoadReport {
    /// Whether every entry was loaded
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Snapshot errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON encoding or decoding failed
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The load was aborted because of invalid entries
    #[error("Malformed snapshot: {} invalid entries", .0.skipped.len())]
    Malformed(LoadReport),
}

impl Graph {
    /// Project the current state into a snapshot
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|node| NodeSnapshot {
                id: node.id(),
                signature: node.signature(),
                styling: node.styling,
                anchors: node.anchors().collect(),
            })
            .collect();

        let endpoint = |anchor_id: AnchorId| {
            self.anchor(anchor_id).map(|anchor| EndpointSnapshot {
                node_id: anchor.parent(),
                anchor_id,
            })
        };
        let edges = self
            .edges()
            .filter_map(|edge| {
                Some(EdgeSnapshot {
                    id: edge.id(),
                    from: endpoint(edge.source)?,
                    to: endpoint(edge.dest)?,
                })
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }

    /// Build a new graph from a snapshot
    pub fn from_snapshot(
        snapshot: &GraphSnapshot,
        toolbox: &impl Toolbox,
        policy: LoadPolicy,
    ) -> Result<(Graph, LoadReport), SnapshotError> {
        let mut graph = Graph::new();
        let report = graph.restore(snapshot, toolbox);
        if policy == LoadPolicy::Abort && !report.is_clean() {
            return Err(SnapshotError::Malformed(report));
        }
        Ok((graph, report))
    }

    /// Add the snapshot's nodes and edges to this graph
    pub(crate) fn restore(&mut self, snapshot: &GraphSnapshot, toolbox: &impl Toolbox) -> LoadReport {
        let mut report = LoadReport::default();

        for entry in &snapshot.nodes {
            match self.restore_node(entry, toolbox) {
                Ok(()) => report.nodes_loaded += 1,
                Err(reason) => {
                    let item = SkippedItem::Node {
                        id: entry.id,
                        signature: entry.signature.clone(),
                        reason,
                    };
                    tracing::warn!("Skipping {}", item);
                    report.skipped.push(item);
                }
            }
        }

        for entry in &snapshot.edges {
            match self.restore_edge(entry) {
                Ok(()) => report.edges_loaded += 1,
                Err(reason) => {
                    let item = SkippedItem::Edge { id: entry.id, reason };
                    tracing::warn!("Skipping {}", item);
                    report.skipped.push(item);
                }
            }
        }

        tracing::info!(
            "Restored graph {}: {} nodes, {} edges, {} skipped",
            self.id(),
            report.nodes_loaded,
            report.edges_loaded,
            report.skipped.len()
        );
        report
    }

    fn restore_node(&mut self, entry: &NodeSnapshot, toolbox: &impl Toolbox) -> Result<(), SkipReason> {
        if self.node(entry.id).is_some() {
            return Err(SkipReason::DuplicateId);
        }
        if parse_signature(&entry.signature).is_none() {
            return Err(SkipReason::MalformedSignature);
        }
        let spec = toolbox.resolve(&entry.signature).ok_or(SkipReason::UnknownSignature)?;
        if spec.signature() != entry.signature {
            return Err(SkipReason::SignatureMismatch(spec.signature()));
        }
        if entry.styling.is_some_and(|s| !s.is_finite()) {
            return Err(SkipReason::Rejected(GraphError::InvalidStyling(entry.id)));
        }

        let anchor_ids = if entry.anchors.is_empty() {
            (0..spec.anchor_count()).map(|_| AnchorId::new()).collect()
        } else {
            if entry.anchors.len() != spec.anchor_count() {
                return Err(SkipReason::AnchorCountMismatch {
                    expected: spec.anchor_count(),
                    found: entry.anchors.len(),
                });
            }
            let mut seen = HashSet::with_capacity(entry.anchors.len());
            let clash = entry
                .anchors
                .iter()
                .any(|id| !seen.insert(*id) || self.anchor(*id).is_some());
            if clash {
                return Err(SkipReason::DuplicateId);
            }
            entry.anchors.clone()
        };

        self.insert_node(entry.id, &spec, anchor_ids, entry.styling);
        Ok(())
    }

    fn restore_edge(&mut self, entry: &EdgeSnapshot) -> Result<(), SkipReason> {
        if entry.id != entry.to.anchor_id {
            return Err(SkipReason::EdgeIdMismatch);
        }
        for endpoint in [entry.from, entry.to] {
            let anchor = self
                .anchor(endpoint.anchor_id)
                .ok_or(SkipReason::UnknownAnchor(endpoint.anchor_id))?;
            if anchor.parent() != endpoint.node_id {
                return Err(SkipReason::EndpointMismatch(endpoint.anchor_id));
            }
        }
        self.connect(entry.from.anchor_id, entry.to.anchor_id)
            .map_err(SkipReason::Rejected)?;
        Ok(())
    }
}
