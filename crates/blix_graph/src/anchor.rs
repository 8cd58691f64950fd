// SPDX-License-Identifier: MIT OR Apache-2.0
//! Anchor definitions for node inputs/outputs.

use crate::id::{AnchorId, NodeId};
use serde::{Deserialize, Serialize};

/// Anchor direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorDirection {
    /// Input anchor, accepts at most one incoming edge
    Input,
    /// Output anchor, may feed any number of edges
    Output,
}

impl AnchorDirection {
    /// The opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Anchor signature as declared by a plugin
///
/// `data_type` is a nominal tag such as `"int"`, `"image"` or `"text/json"`.
/// Two anchors connect only when their tags are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDef {
    /// Direction of the anchor
    pub direction: AnchorDirection,
    /// Data type tag
    pub data_type: String,
    /// Name shown in the editor
    pub display_name: String,
}

impl AnchorDef {
    /// Declare an input anchor
    pub fn input(display_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            direction: AnchorDirection::Input,
            data_type: data_type.into(),
            display_name: display_name.into(),
        }
    }

    /// Declare an output anchor
    pub fn output(display_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            direction: AnchorDirection::Output,
            data_type: data_type.into(),
            display_name: display_name.into(),
        }
    }
}

/// A typed connection point owned by exactly one node
///
/// Anchors are immutable once created and live exactly as long as their
/// parent node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    id: AnchorId,
    parent: NodeId,
    direction: AnchorDirection,
    data_type: String,
    display_name: String,
}

impl Anchor {
    /// The direction comes from the node spec list the definition sits in,
    /// not from `def.direction`.
    pub(crate) fn new(id: AnchorId, parent: NodeId, direction: AnchorDirection, def: &AnchorDef) -> Self {
        Self {
            id,
            parent,
            direction,
            data_type: def.data_type.clone(),
            display_name: def.display_name.clone(),
        }
    }

    /// Anchor ID
    pub fn id(&self) -> AnchorId {
        self.id
    }

    /// Owning node
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Direction
    pub fn direction(&self) -> AnchorDirection {
        self.direction
    }

    /// Data type tag
    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether this is an input anchor
    pub fn is_input(&self) -> bool {
        self.direction == AnchorDirection::Input
    }

    /// Whether this is an output anchor
    pub fn is_output(&self) -> bool {
        self.direction == AnchorDirection::Output
    }

    /// Check if an edge between this anchor and `other` is structurally valid
    ///
    /// Requires opposite directions and identical data types. Acyclicity and
    /// fan-in are graph-level properties and are checked by the graph.
    pub fn can_connect(&self, other: &Anchor) -> bool {
        self.direction == other.direction.opposite() && self.data_type == other.data_type
    }

    /// The definition this anchor was built from
    pub fn def(&self) -> AnchorDef {
        AnchorDef {
            direction: self.direction,
            data_type: self.data_type.clone(),
            display_name: self.display_name.clone(),
        }
    }
}
