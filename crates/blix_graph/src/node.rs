// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.

use crate::anchor::AnchorDef;
use crate::id::{AnchorId, NodeId};
use serde::{Deserialize, Serialize};

/// Separator between plugin namespace and type name in a signature
pub const SIGNATURE_SEPARATOR: char = '/';

/// Build the `<plugin>/<typeName>` signature of a node type
pub fn format_signature(plugin: &str, type_name: &str) -> String {
    format!("{plugin}{SIGNATURE_SEPARATOR}{type_name}")
}

/// Split a signature into `(plugin, type_name)`
///
/// Splits at the first separator. Returns `None` if either half is empty.
pub fn parse_signature(signature: &str) -> Option<(&str, &str)> {
    let (plugin, type_name) = signature.split_once(SIGNATURE_SEPARATOR)?;
    if plugin.is_empty() || type_name.is_empty() {
        return None;
    }
    Some((plugin, type_name))
}

/// Node type as declared by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Type name within the plugin
    pub type_name: String,
    /// Namespace of the plugin that defines the type
    pub plugin: String,
    /// Input anchor signatures, in order
    #[serde(default)]
    pub inputs: Vec<AnchorDef>,
    /// Output anchor signatures, in order
    #[serde(default)]
    pub outputs: Vec<AnchorDef>,
}

impl NodeSpec {
    /// Create a spec with no anchors
    pub fn new(plugin: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            plugin: plugin.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input anchor
    pub fn with_input(mut self, display_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.inputs.push(AnchorDef::input(display_name, data_type));
        self
    }

    /// Add an output anchor
    pub fn with_output(mut self, display_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.outputs.push(AnchorDef::output(display_name, data_type));
        self
    }

    /// Plugin-qualified signature
    pub fn signature(&self) -> String {
        format_signature(&self.plugin, &self.type_name)
    }

    /// Total number of anchors a node of this type owns
    pub fn anchor_count(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }
}

/// Node position in editor space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

/// Node size in editor space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

/// Cosmetic node layout, owned by the node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeStyling {
    /// Position
    pub position: Position,
    /// Size
    pub size: Size,
}

impl NodeStyling {
    /// Create styling from position and size
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            position: Position { x, y },
            size: Size { w, h },
        }
    }

    /// Whether every coordinate is a finite number
    ///
    /// JSON has no encoding for NaN or infinity.
    pub fn is_finite(&self) -> bool {
        [self.position.x, self.position.y, self.size.w, self.size.h]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A node instance in the graph
///
/// The anchor set is fixed at construction; anchors themselves live in the
/// graph's anchor index and are referenced here by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    type_name: String,
    plugin: String,
    inputs: Vec<AnchorId>,
    outputs: Vec<AnchorId>,
    /// Editor layout, if the node has been placed
    pub styling: Option<NodeStyling>,
}

impl Node {
    pub(crate) fn new(id: NodeId, spec: &NodeSpec, inputs: Vec<AnchorId>, outputs: Vec<AnchorId>) -> Self {
        Self {
            id,
            type_name: spec.type_name.clone(),
            plugin: spec.plugin.clone(),
            inputs,
            outputs,
            styling: None,
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Type name within the plugin
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Plugin namespace
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Plugin-qualified signature
    pub fn signature(&self) -> String {
        format_signature(&self.plugin, &self.type_name)
    }

    /// Input anchor IDs in declaration order
    pub fn inputs(&self) -> &[AnchorId] {
        &self.inputs
    }

    /// Output anchor IDs in declaration order
    pub fn outputs(&self) -> &[AnchorId] {
        &self.outputs
    }

    /// All anchor IDs, inputs first
    pub fn anchors(&self) -> impl Iterator<Item = AnchorId> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }

    /// Get an input anchor by index
    pub fn input(&self, index: usize) -> Option<AnchorId> {
        self.inputs.get(index).copied()
    }

    /// Get an output anchor by index
    pub fn output(&self, index: usize) -> Option<AnchorId> {
        self.outputs.get(index).copied()
    }

    /// Whether this node owns the anchor
    pub fn owns(&self, anchor: AnchorId) -> bool {
        self.inputs.contains(&anchor) || self.outputs.contains(&anchor)
    }
}
