// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collection of open graphs, one per workspace.

use crate::config::GraphConfig;
use crate::graph::Graph;
use crate::id::GraphId;
use crate::snapshot::{GraphSnapshot, LoadPolicy, LoadReport, SnapshotError};
use crate::toolbox::Toolbox;
use indexmap::IndexMap;

/// Owns every open graph, keyed by ID
#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: IndexMap<GraphId, Graph>,
    config: GraphConfig,
}

impl GraphStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given configuration
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            graphs: IndexMap::new(),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Create and register a new empty graph
    pub fn create_graph(&mut self) -> GraphId {
        let graph = Graph::new();
        let id = graph.id();
        self.graphs.insert(id, graph);
        tracing::info!("Created graph {}", id);
        id
    }

    /// Rebuild a graph from a snapshot and register it
    ///
    /// Invalid entries are handled according to the configured
    /// [`LoadPolicy`]. With [`LoadPolicy::Abort`] nothing is registered.
    pub fn load_graph(
        &mut self,
        snapshot: &GraphSnapshot,
        toolbox: &impl Toolbox,
    ) -> Result<(GraphId, LoadReport), SnapshotError> {
        let mut graph = Graph::new();
        let report = graph.restore(snapshot, toolbox);
        if self.config.load_policy == LoadPolicy::Abort && !report.is_clean() {
            tracing::warn!(
                "Aborted snapshot load with {} invalid entries",
                report.skipped.len()
            );
            return Err(SnapshotError::Malformed(report));
        }

        let id = graph.id();
        self.graphs.insert(id, graph);
        Ok((id, report))
    }

    /// Serialize a graph's snapshot as JSON, honouring `pretty_snapshots`
    pub fn snapshot_json(&self, id: GraphId) -> Option<Result<String, SnapshotError>> {
        let snapshot = self.graphs.get(&id)?.to_snapshot();
        Some(if self.config.pretty_snapshots {
            snapshot.to_json_pretty()
        } else {
            snapshot.to_json()
        })
    }

    /// Get a graph by ID
    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(&id)
    }

    /// Get a mutable graph by ID
    pub fn graph_mut(&mut self, id: GraphId) -> Option<&mut Graph> {
        self.graphs.get_mut(&id)
    }

    /// Drop a graph and everything in it
    pub fn remove_graph(&mut self, id: GraphId) -> Option<Graph> {
        let graph = self.graphs.shift_remove(&id)?;
        tracing::info!("Closed graph {} ({} nodes)", id, graph.node_count());
        Some(graph)
    }

    /// IDs of all open graphs, in creation order
    pub fn graph_ids(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.graphs.keys().copied()
    }

    /// Number of open graphs
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Whether no graphs are open
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
