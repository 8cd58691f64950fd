// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, anchors and edges.
//!
//! All entities live in flat maps keyed by id. References between entities
//! (anchor parent, edge endpoints) are ids resolved through these maps.
//! Every mutation validates fully before touching any map, so a rejected
//! call leaves the graph exactly as it was.

use crate::anchor::{Anchor, AnchorDirection};
use crate::edge::Edge;
use crate::event::{GraphEvent, SubscriberHandle, Subscribers};
use crate::id::{AnchorId, EdgeId, GraphId, NodeId, SubscriberId};
use crate::node::{Node, NodeSpec, NodeStyling};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet, VecDeque};

/// A dataflow graph for one workspace
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Flattened index over every node's anchors
    anchors: IndexMap<AnchorId, Anchor>,
    /// At most one incoming edge per input anchor
    edge_by_dest: IndexMap<AnchorId, Edge>,
    /// Outgoing edges per output anchor; mirrors `edge_by_dest`
    edge_src_fanout: HashMap<AnchorId, IndexSet<AnchorId>>,
    subscribers: Subscribers,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::with_id(GraphId::new())
    }

    fn with_id(id: GraphId) -> Self {
        Self {
            id,
            nodes: IndexMap::new(),
            anchors: IndexMap::new(),
            edge_by_dest: IndexMap::new(),
            edge_src_fanout: HashMap::new(),
            subscribers: Subscribers::default(),
        }
    }

    /// Graph ID
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node built from `spec`, creating its anchors
    pub fn add_node(&mut self, spec: &NodeSpec) -> NodeId {
        let anchor_ids = (0..spec.anchor_count()).map(|_| AnchorId::new()).collect();
        self.insert_node(NodeId::new(), spec, anchor_ids, None)
    }

    /// Insert a node with caller-chosen ids
    ///
    /// `anchor_ids` must hold exactly one fresh id per anchor definition,
    /// inputs first, and `styling` must be finite. Callers check this before
    /// calling.
    pub(crate) fn insert_node(
        &mut self,
        id: NodeId,
        spec: &NodeSpec,
        anchor_ids: Vec<AnchorId>,
        styling: Option<NodeStyling>,
    ) -> NodeId {
        debug_assert_eq!(anchor_ids.len(), spec.anchor_count());

        let (inputs, outputs) = anchor_ids.split_at(spec.inputs.len().min(anchor_ids.len()));
        for (anchor_id, def) in inputs.iter().zip(&spec.inputs) {
            self.anchors
                .insert(*anchor_id, Anchor::new(*anchor_id, id, AnchorDirection::Input, def));
        }
        for (anchor_id, def) in outputs.iter().zip(&spec.outputs) {
            self.anchors
                .insert(*anchor_id, Anchor::new(*anchor_id, id, AnchorDirection::Output, def));
        }

        let mut node = Node::new(id, spec, inputs.to_vec(), outputs.to_vec());
        node.styling = styling;
        tracing::debug!("Added node {} ({})", node.signature(), id);
        self.nodes.insert(id, node);

        self.emit(&GraphEvent::NodeAdded {
            node: id,
            anchors: anchor_ids,
        });
        id
    }

    /// Remove a node, its anchors, and every edge touching those anchors
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;

        // Collect first so the removal below cannot stop half way
        let mut doomed: Vec<EdgeId> = node
            .inputs()
            .iter()
            .filter(|input| self.edge_by_dest.contains_key(*input))
            .copied()
            .collect();
        for output in node.outputs() {
            if let Some(dests) = self.edge_src_fanout.get(output) {
                doomed.extend(dests.iter().copied());
            }
        }
        let anchors: Vec<AnchorId> = node.anchors().collect();

        for dest in &doomed {
            self.detach_edge(*dest);
        }
        // Order-preserving removal is O(n) per call; snapshots rely on the order
        for anchor in &anchors {
            self.anchors.shift_remove(anchor);
        }
        self.nodes.shift_remove(&node_id);

        tracing::debug!(
            "Removed node {} with {} anchors and {} edges",
            node_id,
            anchors.len(),
            doomed.len()
        );
        self.emit(&GraphEvent::NodeRemoved {
            node: node_id,
            anchors,
            edges: doomed,
        });
        Ok(())
    }

    /// Replace a node's styling
    ///
    /// Styling with a non-finite coordinate is rejected.
    pub fn set_styling(&mut self, node_id: NodeId, styling: Option<NodeStyling>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        if styling.is_some_and(|s| !s.is_finite()) {
            return Err(GraphError::InvalidStyling(node_id));
        }
        node.styling = styling;
        self.emit(&GraphEvent::NodeStyled { node: node_id });
        Ok(())
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Rebuild the spec a node was created from
    pub fn node_spec(&self, node_id: NodeId) -> Option<NodeSpec> {
        let node = self.nodes.get(&node_id)?;
        let defs = |ids: &[AnchorId]| -> Vec<_> {
            ids.iter()
                .filter_map(|id| self.anchors.get(id))
                .map(Anchor::def)
                .collect()
        };
        Some(NodeSpec {
            type_name: node.type_name().to_string(),
            plugin: node.plugin().to_string(),
            inputs: defs(node.inputs()),
            outputs: defs(node.outputs()),
        })
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    /// Get an anchor by ID
    pub fn anchor(&self, anchor_id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(&anchor_id)
    }

    /// Get all anchors
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    /// Get the number of anchors
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Anchors owned by a node, inputs first
    pub fn anchors_of(&self, node_id: NodeId) -> impl Iterator<Item = &Anchor> {
        self.nodes
            .get(&node_id)
            .into_iter()
            .flat_map(Node::anchors)
            .filter_map(move |id| self.anchors.get(&id))
    }

    /// Input anchors of a node
    pub fn inputs_of(&self, node_id: NodeId) -> impl Iterator<Item = &Anchor> {
        self.anchors_of(node_id).filter(|a| a.is_input())
    }

    /// Output anchors of a node
    pub fn outputs_of(&self, node_id: NodeId) -> impl Iterator<Item = &Anchor> {
        self.anchors_of(node_id).filter(|a| a.is_output())
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Connect two anchors
    ///
    /// Arguments may be given in either order: the output anchor becomes the
    /// source and the input anchor the destination. Returns the new edge's ID,
    /// which is the destination anchor's ID.
    pub fn add_edge(&mut self, anchor_a: AnchorId, anchor_b: AnchorId) -> Result<EdgeId, GraphError> {
        let a = self.anchors.get(&anchor_a).ok_or(GraphError::AnchorNotFound(anchor_a))?;
        let b = self.anchors.get(&anchor_b).ok_or(GraphError::AnchorNotFound(anchor_b))?;

        let (source, dest) = match (a.direction(), b.direction()) {
            (AnchorDirection::Output, AnchorDirection::Input) => (anchor_a, anchor_b),
            (AnchorDirection::Input, AnchorDirection::Output) => (anchor_b, anchor_a),
            _ => {
                return Err(GraphError::DirectionMismatch {
                    first: anchor_a,
                    second: anchor_b,
                })
            }
        };
        self.connect(source, dest)
    }

    /// Connect `source` (must be an output) to `dest` (must be an input)
    pub(crate) fn connect(&mut self, source: AnchorId, dest: AnchorId) -> Result<EdgeId, GraphError> {
        self.validate_edge(source, dest)?;
        self.insert_edge(Edge::new(source, dest));

        tracing::debug!("Added edge {} -> {}", source, dest);
        self.emit(&GraphEvent::EdgeAdded { edge: dest, source });
        Ok(dest)
    }

    fn validate_edge(&self, source_id: AnchorId, dest_id: AnchorId) -> Result<(), GraphError> {
        let source = self.anchors.get(&source_id).ok_or(GraphError::AnchorNotFound(source_id))?;
        let dest = self.anchors.get(&dest_id).ok_or(GraphError::AnchorNotFound(dest_id))?;

        if !source.is_output() || !dest.is_input() {
            return Err(GraphError::DirectionMismatch {
                first: source_id,
                second: dest_id,
            });
        }

        if source.data_type() != dest.data_type() {
            return Err(GraphError::TypeMismatch {
                source_type: source.data_type().to_string(),
                dest_type: dest.data_type().to_string(),
            });
        }

        // The new edge closes a cycle iff the destination node already feeds
        // the source node (or they are the same node).
        if self.depends_on(source.parent(), dest.parent()) {
            return Err(GraphError::CycleDetected {
                from: source_id,
                to: dest_id,
            });
        }

        if self.edge_by_dest.contains_key(&dest_id) {
            return Err(GraphError::DestinationOccupied(dest_id));
        }

        Ok(())
    }

    /// Insert into both edge indexes without validation
    fn insert_edge(&mut self, edge: Edge) {
        self.edge_by_dest.insert(edge.dest, edge);
        self.edge_src_fanout
            .entry(edge.source)
            .or_default()
            .insert(edge.dest);
    }

    /// Remove the edge entering `dest` from both indexes
    fn detach_edge(&mut self, dest: AnchorId) -> Option<Edge> {
        let edge = self.edge_by_dest.shift_remove(&dest)?;
        if let Some(fanout) = self.edge_src_fanout.get_mut(&edge.source) {
            fanout.shift_remove(&dest);
            if fanout.is_empty() {
                self.edge_src_fanout.remove(&edge.source);
            }
        }
        Some(edge)
    }

    /// Remove the edge entering input anchor `dest`
    pub fn remove_edge(&mut self, dest: EdgeId) -> Result<Edge, GraphError> {
        let edge = self.detach_edge(dest).ok_or(GraphError::EdgeNotFound(dest))?;

        tracing::debug!("Removed edge {} -> {}", edge.source, edge.dest);
        self.emit(&GraphEvent::EdgeRemoved {
            edge: edge.dest,
            source: edge.source,
        });
        Ok(edge)
    }

    /// Get the edge entering an input anchor
    pub fn edge(&self, dest: EdgeId) -> Option<&Edge> {
        self.edge_by_dest.get(&dest)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_by_dest.values()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edge_by_dest.len()
    }

    /// Get edges leaving an output anchor
    pub fn edges_from(&self, source: AnchorId) -> impl Iterator<Item = &Edge> {
        self.edge_src_fanout
            .get(&source)
            .into_iter()
            .flatten()
            .filter_map(move |dest| self.edge_by_dest.get(dest))
    }

    // ------------------------------------------------------------------
    // Structure queries
    // ------------------------------------------------------------------

    /// Whether `upstream` feeds `node` through existing edges
    ///
    /// A node counts as depending on itself. Walks backwards from `node`
    /// through incoming edges with an explicit stack.
    pub fn depends_on(&self, node: NodeId, upstream: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            if current == upstream {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let Some(current) = self.nodes.get(&current) else {
                continue;
            };
            for input in current.inputs() {
                let Some(edge) = self.edge_by_dest.get(input) else {
                    continue;
                };
                if let Some(source) = self.anchors.get(&edge.source) {
                    if !visited.contains(&source.parent()) {
                        stack.push(source.parent());
                    }
                }
            }
        }
        false
    }

    /// Get nodes ordered so every edge's source node precedes its destination
    ///
    /// Ties keep insertion order.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: IndexMap<NodeId, usize> = self.nodes.keys().map(|id| (*id, 0)).collect();
        for edge in self.edge_by_dest.values() {
            if let Some(dest) = self.anchors.get(&edge.dest) {
                if let Some(count) = in_degree.get_mut(&dest.parent()) {
                    *count += 1;
                }
            }
        }

        let mut ready: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node_id) = ready.pop_front() {
            order.push(node_id);
            for output in self.outputs_of(node_id) {
                for edge in self.edges_from(output.id()) {
                    let Some(dest) = self.anchors.get(&edge.dest) else {
                        continue;
                    };
                    if let Some(count) = in_degree.get_mut(&dest.parent()) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push_back(dest.parent());
                        }
                    }
                }
            }
        }
        order
    }

    /// Check every structural invariant, reporting the first violation
    pub fn verify_integrity(&self) -> Result<(), IntegrityError> {
        for (id, anchor) in &self.anchors {
            let owned = self.nodes.get(&anchor.parent()).is_some_and(|n| n.owns(*id));
            if !owned {
                return Err(IntegrityError::OrphanAnchor(*id));
            }
        }
        for node in self.nodes.values() {
            for anchor_id in node.anchors() {
                if !self.anchors.contains_key(&anchor_id) {
                    return Err(IntegrityError::MissingAnchor {
                        node: node.id(),
                        anchor: anchor_id,
                    });
                }
            }
        }

        for (dest_id, edge) in &self.edge_by_dest {
            if *dest_id != edge.dest {
                return Err(IntegrityError::EdgeKeyMismatch(*dest_id));
            }
            let (Some(source), Some(dest)) = (self.anchors.get(&edge.source), self.anchors.get(&edge.dest)) else {
                return Err(IntegrityError::DanglingEdge(edge.dest));
            };
            if !source.can_connect(dest) || !source.is_output() {
                return Err(IntegrityError::InvalidEdge(edge.dest));
            }
            let mirrored = self
                .edge_src_fanout
                .get(&edge.source)
                .is_some_and(|fanout| fanout.contains(&edge.dest));
            if !mirrored {
                return Err(IntegrityError::IndexMismatch {
                    from: edge.source,
                    to: edge.dest,
                });
            }
        }
        for (source, fanout) in &self.edge_src_fanout {
            if fanout.is_empty() {
                return Err(IntegrityError::EmptyFanout(*source));
            }
            for dest in fanout {
                let mirrored = self.edge_by_dest.get(dest).is_some_and(|e| e.source == *source);
                if !mirrored {
                    return Err(IntegrityError::IndexMismatch {
                        from: *source,
                        to: *dest,
                    });
                }
            }
        }

        if self.topological_order().len() != self.nodes.len() {
            return Err(IntegrityError::Cycle);
        }
        Ok(())
    }

    /// Deep copy with fresh graph, node and anchor IDs
    ///
    /// Topology and styling are preserved; subscribers are not carried over.
    pub fn duplicate(&self) -> Graph {
        let mut copy = Graph::new();
        let mut renamed: HashMap<AnchorId, AnchorId> = HashMap::with_capacity(self.anchors.len());

        for node in self.nodes.values() {
            let Some(spec) = self.node_spec(node.id()) else {
                continue;
            };
            let anchor_ids = node
                .anchors()
                .map(|old| *renamed.entry(old).or_insert_with(AnchorId::new))
                .collect();
            copy.insert_node(NodeId::new(), &spec, anchor_ids, node.styling);
        }
        for edge in self.edge_by_dest.values() {
            if let (Some(source), Some(dest)) = (renamed.get(&edge.source), renamed.get(&edge.dest)) {
                copy.insert_edge(Edge::new(*source, *dest));
            }
        }

        tracing::debug!("Duplicated graph {} as {}", self.id, copy.id);
        copy
    }

    // ------------------------------------------------------------------
    // Subscribers
    // ------------------------------------------------------------------

    /// Register a subscriber; returns `false` if it was already registered
    pub fn subscribe(&mut self, handle: &SubscriberHandle) -> bool {
        self.subscribers.insert(handle.clone())
    }

    /// Unregister a subscriber; returns `false` if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(id)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn emit(&self, event: &GraphEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.notify(self, event);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned by graph operations
///
/// Every error leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Anchor not found
    #[error("Anchor not found: {0}")]
    AnchorNotFound(AnchorId),

    /// No edge enters the given input anchor
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// The anchors do not form an output/input pair
    #[error("Anchors {first} and {second} are not an output/input pair")]
    DirectionMismatch {
        /// First anchor as given
        first: AnchorId,
        /// Second anchor as given
        second: AnchorId,
    },

    /// The anchors carry different data types
    #[error("Type mismatch: {source_type} cannot feed {dest_type}")]
    TypeMismatch {
        /// Data type of the output anchor
        source_type: String,
        /// Data type of the input anchor
        dest_type: String,
    },

    /// The edge would close a directed cycle
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Output anchor
        from: AnchorId,
        /// Input anchor
        to: AnchorId,
    },

    /// The input anchor already has an incoming edge
    #[error("Input anchor already connected: {0}")]
    DestinationOccupied(AnchorId),

    /// Styling has a NaN or infinite coordinate
    #[error("Styling for node {0} is not finite")]
    InvalidStyling(NodeId),
}

impl GraphError {
    /// Whether this error is a missing-entity error rather than a rejection
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::AnchorNotFound(_) | Self::EdgeNotFound(_)
        )
    }
}

/// Structural invariant violation found by [`Graph::verify_integrity`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Anchor whose parent node is missing or does not list it
    #[error("Anchor {0} has no owning node")]
    OrphanAnchor(AnchorId),

    /// Node listing an anchor absent from the anchor index
    #[error("Node {node} lists missing anchor {anchor}")]
    MissingAnchor {
        /// Node
        node: NodeId,
        /// Missing anchor
        anchor: AnchorId,
    },

    /// Edge stored under a key other than its destination
    #[error("Edge stored under wrong key {0}")]
    EdgeKeyMismatch(AnchorId),

    /// Edge endpoint missing from the anchor index
    #[error("Edge {0} references a missing anchor")]
    DanglingEdge(EdgeId),

    /// Edge that is not output -> input of one data type
    #[error("Edge {0} does not join an output to an input of the same type")]
    InvalidEdge(EdgeId),

    /// Edge indexes disagree
    #[error("Edge indexes disagree on {from} -> {to}")]
    IndexMismatch {
        /// Source anchor
        from: AnchorId,
        /// Destination anchor
        to: AnchorId,
    },

    /// Empty fan-out list left behind
    #[error("Empty fan-out list for anchor {0}")]
    EmptyFanout(AnchorId),

    /// Edge set contains a directed cycle
    #[error("Graph contains a cycle")]
    Cycle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GraphEventKind;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn source_spec(data_type: &str) -> NodeSpec {
        NodeSpec::new("test", "source").with_output("out", data_type)
    }

    fn sink_spec(data_type: &str) -> NodeSpec {
        NodeSpec::new("test", "sink").with_input("in", data_type)
    }

    fn pass_spec(data_type: &str) -> NodeSpec {
        NodeSpec::new("test", "pass")
            .with_input("in", data_type)
            .with_output("out", data_type)
    }

    fn input(graph: &Graph, node: NodeId) -> AnchorId {
        graph.node(node).and_then(|n| n.input(0)).unwrap()
    }

    fn output(graph: &Graph, node: NodeId) -> AnchorId {
        graph.node(node).and_then(|n| n.output(0)).unwrap()
    }

    fn snapshot_maps(graph: &Graph) -> (usize, usize, usize, usize) {
        (
            graph.nodes.len(),
            graph.anchors.len(),
            graph.edge_by_dest.len(),
            graph.edge_src_fanout.len(),
        )
    }

    #[test]
    fn test_add_node_creates_anchors() {
        let mut graph = Graph::new();
        let spec = NodeSpec::new("math", "add")
            .with_input("a", "int")
            .with_input("b", "int")
            .with_output("sum", "int");
        let id = graph.add_node(&spec);

        let node = graph.node(id).unwrap();
        assert_eq!(node.signature(), "math/add");
        assert_eq!(node.inputs().len(), 2);
        assert_eq!(node.outputs().len(), 1);
        assert_eq!(graph.anchor_count(), 3);
        assert!(graph.anchors_of(id).all(|a| a.parent() == id));
        assert_eq!(graph.inputs_of(id).count(), 2);
        assert_eq!(graph.node_spec(id).unwrap(), spec);
        graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_connect_either_order() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let (x_out, y_in) = (output(&graph, x), input(&graph, y));

        let edge = graph.add_edge(x_out, y_in).unwrap();
        assert_eq!(edge, y_in);
        assert_eq!(graph.edge(y_in), Some(&Edge::new(x_out, y_in)));

        graph.remove_edge(edge).unwrap();
        let reversed = graph.add_edge(y_in, x_out).unwrap();
        assert_eq!(reversed, y_in);
        assert_eq!(graph.edge(y_in), Some(&Edge::new(x_out, y_in)));
        graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_node(&pass_spec("int"));
        let y = graph.add_node(&pass_spec("int"));
        graph.add_edge(output(&graph, x), input(&graph, y)).unwrap();

        let before = snapshot_maps(&graph);
        let err = graph.add_edge(output(&graph, y), input(&graph, x)).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
        assert_eq!(snapshot_maps(&graph), before);
    }

    #[test]
    fn test_long_cycle_rejected() {
        let mut graph = Graph::new();
        let chain: Vec<_> = (0..5).map(|_| graph.add_node(&pass_spec("int"))).collect();
        for pair in chain.windows(2) {
            graph.add_edge(output(&graph, pair[0]), input(&graph, pair[1])).unwrap();
        }

        let err = graph
            .add_edge(output(&graph, chain[4]), input(&graph, chain[0]))
            .unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
        assert!(graph.depends_on(chain[4], chain[0]));
        assert!(!graph.depends_on(chain[0], chain[4]));
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_node(&pass_spec("int"));
        let err = graph.add_edge(output(&graph, x), input(&graph, x)).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn test_diamond_allowed() {
        let mut graph = Graph::new();
        let top = graph.add_node(&source_spec("int"));
        let left = graph.add_node(&pass_spec("int"));
        let right = graph.add_node(&pass_spec("int"));
        let bottom = graph.add_node(
            &NodeSpec::new("test", "join")
                .with_input("a", "int")
                .with_input("b", "int"),
        );
        let top_out = output(&graph, top);
        graph.add_edge(top_out, input(&graph, left)).unwrap();
        graph.add_edge(top_out, input(&graph, right)).unwrap();
        let bottom_node = graph.node(bottom).unwrap().clone();
        graph.add_edge(output(&graph, left), bottom_node.inputs()[0]).unwrap();
        graph.add_edge(output(&graph, right), bottom_node.inputs()[1]).unwrap();

        assert_eq!(graph.edges_from(top_out).count(), 2);
        let order = graph.topological_order();
        assert_eq!(order.first(), Some(&top));
        assert_eq!(order.last(), Some(&bottom));
        graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("text"));

        let before = snapshot_maps(&graph);
        let err = graph.add_edge(output(&graph, x), input(&graph, y)).unwrap_err();
        assert_eq!(
            err,
            GraphError::TypeMismatch {
                source_type: "int".into(),
                dest_type: "text".into(),
            }
        );
        assert_eq!(snapshot_maps(&graph), before);
    }

    #[test]
    fn test_direction_mismatch_rejected() {
        let mut graph = Graph::new();
        let a = graph.add_node(&source_spec("int"));
        let b = graph.add_node(&source_spec("int"));
        let c = graph.add_node(&sink_spec("int"));
        let d = graph.add_node(&sink_spec("int"));

        let err = graph.add_edge(output(&graph, a), output(&graph, b)).unwrap_err();
        assert!(matches!(err, GraphError::DirectionMismatch { .. }));
        let err = graph.add_edge(input(&graph, c), input(&graph, d)).unwrap_err();
        assert!(matches!(err, GraphError::DirectionMismatch { .. }));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_destination_occupied_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let z = graph.add_node(&source_spec("int"));
        let y_in = input(&graph, y);
        graph.add_edge(output(&graph, x), y_in).unwrap();

        let err = graph.add_edge(output(&graph, z), y_in).unwrap_err();
        assert_eq!(err, GraphError::DestinationOccupied(y_in));
        assert_eq!(graph.edge(y_in).unwrap().source, output(&graph, x));

        // Same pair again is also occupied, not duplicated
        let err = graph.add_edge(output(&graph, x), y_in).unwrap_err();
        assert_eq!(err, GraphError::DestinationOccupied(y_in));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unknown_anchor() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let missing = AnchorId::new();
        let err = graph.add_edge(output(&graph, x), missing).unwrap_err();
        assert_eq!(err, GraphError::AnchorNotFound(missing));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_node_cleans_up() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let w = graph.add_node(&sink_spec("int"));
        let x_out = output(&graph, x);
        graph.add_edge(x_out, input(&graph, y)).unwrap();
        graph.add_edge(x_out, input(&graph, w)).unwrap();

        graph.remove_node(x).unwrap();

        assert!(graph.node(x).is_none());
        assert!(graph.edge(input(&graph, y)).is_none());
        assert!(graph.edge(input(&graph, w)).is_none());
        assert!(!graph.edge_src_fanout.contains_key(&x_out));
        assert!(graph.anchors().all(|a| a.parent() != x));
        assert_eq!(graph.edge_count(), 0);
        graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_remove_middle_node() {
        let mut graph = Graph::new();
        let a = graph.add_node(&source_spec("int"));
        let b = graph.add_node(&pass_spec("int"));
        let c = graph.add_node(&sink_spec("int"));
        graph.add_edge(output(&graph, a), input(&graph, b)).unwrap();
        graph.add_edge(output(&graph, b), input(&graph, c)).unwrap();

        graph.remove_node(b).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edge_src_fanout.is_empty());
        assert_eq!(graph.anchor_count(), 2);
        graph.verify_integrity().unwrap();

        assert_eq!(graph.remove_node(b), Err(GraphError::NodeNotFound(b)));
    }

    #[test]
    fn test_remove_edge_prunes_fanout() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let w = graph.add_node(&sink_spec("int"));
        let x_out = output(&graph, x);
        graph.add_edge(x_out, input(&graph, y)).unwrap();
        graph.add_edge(x_out, input(&graph, w)).unwrap();

        graph.remove_edge(input(&graph, y)).unwrap();
        assert_eq!(graph.edges_from(x_out).count(), 1);
        graph.remove_edge(input(&graph, w)).unwrap();
        assert!(!graph.edge_src_fanout.contains_key(&x_out));

        let err = graph.remove_edge(input(&graph, w)).unwrap_err();
        assert_eq!(err, GraphError::EdgeNotFound(input(&graph, w)));
        graph.verify_integrity().unwrap();
    }

    #[test]
    fn test_styling() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        assert!(graph.node(x).unwrap().styling.is_none());

        let styled = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let styled = styled.clone();
            SubscriberHandle::new(move |_: &Graph, event: &GraphEvent| {
                if let GraphEvent::NodeStyled { node } = event {
                    styled.lock().push(*node);
                }
            })
        };
        graph.subscribe(&handle);

        let styling = NodeStyling::new(10.0, 20.0, 120.0, 80.0);
        graph.set_styling(x, Some(styling)).unwrap();
        assert_eq!(graph.node(x).unwrap().styling, Some(styling));
        assert_eq!(*styled.lock(), [x]);
        assert!(graph.set_styling(NodeId::new(), None).is_err());
    }

    #[test]
    fn test_non_finite_styling_rejected() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let placed = NodeStyling::new(10.0, 20.0, 120.0, 80.0);
        graph.set_styling(x, Some(placed)).unwrap();

        for bad in [
            NodeStyling::new(f32::NAN, 0.0, 1.0, 1.0),
            NodeStyling::new(0.0, f32::NEG_INFINITY, 1.0, 1.0),
            NodeStyling::new(0.0, 0.0, f32::INFINITY, 1.0),
        ] {
            assert_eq!(graph.set_styling(x, Some(bad)), Err(GraphError::InvalidStyling(x)));
        }
        assert_eq!(graph.node(x).unwrap().styling, Some(placed));
    }

    #[test]
    fn test_duplicate_preserves_topology() {
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        graph.add_edge(output(&graph, x), input(&graph, y)).unwrap();
        graph.set_styling(y, Some(NodeStyling::new(1.0, 2.0, 3.0, 4.0))).unwrap();

        let copy = graph.duplicate();
        assert_ne!(copy.id(), graph.id());
        assert_eq!(copy.node_count(), 2);
        assert_eq!(copy.edge_count(), 1);
        assert!(copy.node(x).is_none());
        assert!(copy.nodes().any(|n| n.styling == Some(NodeStyling::new(1.0, 2.0, 3.0, 4.0))));
        copy.verify_integrity().unwrap();
    }

    #[test]
    fn test_subscribers_notified_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();

        let first = {
            let log = log.clone();
            SubscriberHandle::new(move |_: &Graph, event: &GraphEvent| log.lock().push(("first", event.kind())))
        };
        let second = {
            let log = log.clone();
            SubscriberHandle::new(move |_: &Graph, event: &GraphEvent| log.lock().push(("second", event.kind())))
        };
        assert!(graph.subscribe(&first));
        assert!(graph.subscribe(&second));
        assert!(!graph.subscribe(&first.clone()));
        assert_eq!(graph.subscriber_count(), 2);

        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let edge = graph.add_edge(output(&graph, x), input(&graph, y)).unwrap();
        graph.remove_edge(edge).unwrap();
        let _ = graph.add_edge(output(&graph, x), output(&graph, x));
        graph.remove_node(x).unwrap();

        let kinds: Vec<_> = log.lock().iter().filter(|(who, _)| *who == "first").map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            [
                GraphEventKind::NodeAdded,
                GraphEventKind::NodeAdded,
                GraphEventKind::EdgeAdded,
                GraphEventKind::EdgeRemoved,
                GraphEventKind::NodeRemoved,
            ]
        );
        let order: Vec<_> = log.lock().iter().take(2).map(|(who, _)| *who).collect();
        assert_eq!(order, ["first", "second"]);

        assert!(graph.unsubscribe(first.id()));
        assert!(!graph.unsubscribe(first.id()));
        assert!(!graph.unsubscribe(SubscriberId::new()));
    }

    #[test]
    fn test_subscriber_reads_graph() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let handle = {
            let seen = seen.clone();
            SubscriberHandle::new(move |graph: &Graph, event: &GraphEvent| {
                if let GraphEvent::EdgeAdded { edge, .. } = event {
                    seen.lock().push(graph.edge(*edge).is_some());
                }
            })
        };
        graph.subscribe(&handle);

        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        graph.add_edge(output(&graph, x), input(&graph, y)).unwrap();
        assert_eq!(*seen.lock(), [true]);
    }

    #[test]
    fn test_node_removed_event_lists_edges() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::new();
        let x = graph.add_node(&source_spec("int"));
        let y = graph.add_node(&sink_spec("int"));
        let y_in = input(&graph, y);
        graph.add_edge(output(&graph, x), y_in).unwrap();

        let handle = {
            let events = events.clone();
            SubscriberHandle::new(move |_: &Graph, event: &GraphEvent| events.lock().push(event.clone()))
        };
        graph.subscribe(&handle);
        graph.remove_node(x).unwrap();

        let events = events.lock();
        let [GraphEvent::NodeRemoved { node, anchors, edges }] = events.as_slice() else {
            panic!("unexpected events: {events:?}");
        };
        assert_eq!(*node, x);
        assert_eq!(anchors.len(), 1);
        assert_eq!(edges, &[y_in]);
    }

    /// Small deterministic generator so edit sequences are reproducible
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) as usize) % bound.max(1)
        }
    }

    #[test]
    fn test_random_edits_keep_invariants() {
        let specs = [
            pass_spec("int"),
            pass_spec("text"),
            source_spec("int"),
            sink_spec("int"),
            NodeSpec::new("test", "mixed")
                .with_input("a", "int")
                .with_input("b", "text")
                .with_output("x", "int")
                .with_output("y", "text"),
        ];

        for seed in 0..8 {
            let mut rng = Lcg(seed);
            let mut graph = Graph::new();

            for _ in 0..400 {
                match rng.next(10) {
                    0..=2 => {
                        graph.add_node(&specs[rng.next(specs.len())]);
                    }
                    3..=7 if graph.anchor_count() > 1 => {
                        let a = graph.anchors[rng.next(graph.anchor_count())].id();
                        let b = graph.anchors[rng.next(graph.anchor_count())].id();
                        let before = snapshot_maps(&graph);
                        if graph.add_edge(a, b).is_err() {
                            assert_eq!(snapshot_maps(&graph), before);
                        }
                    }
                    8 if graph.edge_count() > 0 => {
                        let dest = graph.edge_by_dest[rng.next(graph.edge_count())].dest;
                        graph.remove_edge(dest).unwrap();
                    }
                    9 if graph.node_count() > 0 => {
                        let node = graph.nodes[rng.next(graph.node_count())].id();
                        graph.remove_node(node).unwrap();
                        assert!(graph.anchors().all(|a| a.parent() != node));
                    }
                    _ => {}
                }
                graph.verify_integrity().unwrap();
            }
        }
    }
}
