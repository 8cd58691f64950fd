// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph engine for the Blix node editor.
//!
//! This crate is the authoritative model behind the editor canvas:
//! - Nodes built from plugin-declared signatures
//! - Typed, directional anchors owned by nodes
//! - Edges validated for direction, type, fan-in and acyclicity
//! - Change notification to subscribers
//! - Snapshot serialization and validating reload
//!
//! ## Architecture
//!
//! A [`GraphStore`] owns one [`Graph`] per open workspace. A graph keeps
//! flat maps of nodes, anchors and edges keyed by generated ids; nothing
//! holds a pointer to anything else. Node evaluation is not part of this
//! crate, only the structure is.

pub mod id;
pub mod anchor;
pub mod node;
pub mod edge;
pub mod event;
pub mod graph;
pub mod snapshot;
pub mod toolbox;
pub mod config;
pub mod store;
pub mod shared;

pub use id::{AnchorId, EdgeId, GraphId, NodeId, SubscriberId};
pub use anchor::{Anchor, AnchorDef, AnchorDirection};
pub use node::{Node, NodeSpec, NodeStyling, Position, Size};
pub use edge::Edge;
pub use event::{GraphEvent, GraphEventKind, GraphSubscriber, SubscriberHandle};
pub use graph::{Graph, GraphError, IntegrityError};
pub use snapshot::{GraphSnapshot, LoadPolicy, LoadReport, SkipReason, SkippedItem, SnapshotError};
pub use toolbox::{Toolbox, ToolboxError, ToolboxRegistry};
pub use config::{ConfigError, GraphConfig};
pub use store::GraphStore;
pub use shared::SharedGraph;
