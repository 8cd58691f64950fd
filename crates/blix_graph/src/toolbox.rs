// SPDX-License-Identifier: MIT OR Apache-2.0
//! Toolbox registry: resolves node signatures to anchor layouts.
//!
//! The graph never invents anchor definitions. Whenever a node is rebuilt from
//! a signature (snapshot loads), its anchors come from a [`Toolbox`].

use crate::node::NodeSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Source of node type definitions
pub trait Toolbox {
    /// Resolve a `<plugin>/<typeName>` signature to its node spec
    fn resolve(&self, signature: &str) -> Option<NodeSpec>;
}

impl<T: Toolbox + ?Sized> Toolbox for &T {
    fn resolve(&self, signature: &str) -> Option<NodeSpec> {
        (**self).resolve(signature)
    }
}

/// Toolbox registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolboxError {
    /// A registry entry is keyed by something other than its own signature
    #[error("Toolbox key {key} holds node type {signature}")]
    KeyMismatch {
        /// Key in the registry file
        key: String,
        /// `<plugin>/<typeName>` of the entry
        signature: String,
    },
}

/// Registry of available node types, keyed by signature
///
/// Serialized as a map from signature to spec. Loading checks that every key
/// is its entry's own signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, NodeSpec>",
    into = "IndexMap<String, NodeSpec>"
)]
pub struct ToolboxRegistry {
    types: IndexMap<String, NodeSpec>,
}

impl ToolboxRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any previous type with the same signature
    pub fn register(&mut self, spec: NodeSpec) -> Option<NodeSpec> {
        self.types.insert(spec.signature(), spec)
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, spec: NodeSpec) -> Self {
        self.register(spec);
        self
    }

    /// Get a node type by signature
    pub fn get(&self, signature: &str) -> Option<&NodeSpec> {
        self.types.get(signature)
    }

    /// All registered signatures, in registration order
    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// All registered specs, in registration order
    pub fn specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.types.values()
    }

    /// Types declared by one plugin
    pub fn specs_in_plugin<'a>(&'a self, plugin: &'a str) -> impl Iterator<Item = &'a NodeSpec> {
        self.types.values().filter(move |s| s.plugin == plugin)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TryFrom<IndexMap<String, NodeSpec>> for ToolboxRegistry {
    type Error = ToolboxError;

    fn try_from(types: IndexMap<String, NodeSpec>) -> Result<Self, Self::Error> {
        for (key, spec) in &types {
            if spec.signature() != *key {
                return Err(ToolboxError::KeyMismatch {
                    key: key.clone(),
                    signature: spec.signature(),
                });
            }
        }
        Ok(Self { types })
    }
}

impl From<ToolboxRegistry> for IndexMap<String, NodeSpec> {
    fn from(registry: ToolboxRegistry) -> Self {
        registry.types
    }
}

impl Toolbox for ToolboxRegistry {
    fn resolve(&self, signature: &str) -> Option<NodeSpec> {
        self.get(signature).cloned()
    }
}
