// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notification.
//!
//! A graph keeps an ordered list of subscribers and, after every successful
//! mutation, calls each of them synchronously in registration order. The
//! callback receives a shared borrow of the graph, so subscribers can read
//! from it but cannot mutate it from inside a notification.

use crate::graph::Graph;
use crate::id::{AnchorId, EdgeId, NodeId, SubscriberId};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Kind of change carried by a [`GraphEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GraphEventKind {
    /// A node and its anchors were added
    NodeAdded,
    /// A node, its anchors and every edge touching them were removed
    NodeRemoved,
    /// An edge was added
    EdgeAdded,
    /// An edge was removed
    EdgeRemoved,
    /// A node's styling changed
    NodeStyled,
}

/// Description of one successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum GraphEvent {
    /// A node was added
    NodeAdded {
        /// The new node
        node: NodeId,
        /// Anchors created with it, inputs first
        anchors: Vec<AnchorId>,
    },
    /// A node was removed
    NodeRemoved {
        /// The removed node
        node: NodeId,
        /// Anchors destroyed with it
        anchors: Vec<AnchorId>,
        /// Edges detached because they touched those anchors
        edges: Vec<EdgeId>,
    },
    /// An edge was added
    EdgeAdded {
        /// The edge (its destination anchor)
        edge: EdgeId,
        /// Source anchor
        source: AnchorId,
    },
    /// An edge was removed
    EdgeRemoved {
        /// The edge (its destination anchor)
        edge: EdgeId,
        /// Source anchor
        source: AnchorId,
    },
    /// A node's styling was replaced
    NodeStyled {
        /// The restyled node
        node: NodeId,
    },
}

impl GraphEvent {
    /// Kind of this event
    pub fn kind(&self) -> GraphEventKind {
        match self {
            Self::NodeAdded { .. } => GraphEventKind::NodeAdded,
            Self::NodeRemoved { .. } => GraphEventKind::NodeRemoved,
            Self::EdgeAdded { .. } => GraphEventKind::EdgeAdded,
            Self::EdgeRemoved { .. } => GraphEventKind::EdgeRemoved,
            Self::NodeStyled { .. } => GraphEventKind::NodeStyled,
        }
    }
}

/// Receiver of graph change notifications
pub trait GraphSubscriber: Send + Sync {
    /// Called after a mutation has been fully applied
    fn on_graph_changed(&self, graph: &Graph, event: &GraphEvent);
}

impl<F> GraphSubscriber for F
where
    F: Fn(&Graph, &GraphEvent) + Send + Sync,
{
    fn on_graph_changed(&self, graph: &Graph, event: &GraphEvent) {
        self(graph, event);
    }
}

/// Registration handle for a subscriber
///
/// Clones share the same [`SubscriberId`], so subscribing a clone of an
/// already registered handle is a no-op.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    subscriber: Arc<dyn GraphSubscriber>,
}

impl SubscriberHandle {
    /// Wrap a subscriber in a new handle
    pub fn new(subscriber: impl GraphSubscriber + 'static) -> Self {
        Self {
            id: SubscriberId::new(),
            subscriber: Arc::new(subscriber),
        }
    }

    /// Handle ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self, graph: &Graph, event: &GraphEvent) {
        self.subscriber.on_graph_changed(graph, event);
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Ordered set of subscribers
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    handles: IndexMap<SubscriberId, SubscriberHandle>,
}

impl Subscribers {
    /// Returns `false` if the handle was already registered
    pub(crate) fn insert(&mut self, handle: SubscriberHandle) -> bool {
        if self.handles.contains_key(&handle.id) {
            return false;
        }
        self.handles.insert(handle.id, handle);
        true
    }

    /// Returns `false` if the handle was not registered
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.handles.shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn notify(&self, graph: &Graph, event: &GraphEvent) {
        for handle in self.handles.values() {
            handle.notify(graph, event);
        }
    }
}
