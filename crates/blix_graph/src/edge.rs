// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge definitions for the graph.

use crate::id::{AnchorId, EdgeId};
use serde::{Deserialize, Serialize};

/// A directed link from an output anchor to an input anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source (output) anchor
    pub source: AnchorId,
    /// Destination (input) anchor
    pub dest: AnchorId,
}

impl Edge {
    /// Create a new edge
    pub fn new(source: AnchorId, dest: AnchorId) -> Self {
        Self { source, dest }
    }

    /// Edge ID, which is the destination anchor's ID
    pub fn id(&self) -> EdgeId {
        self.dest
    }
}
