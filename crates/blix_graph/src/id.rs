// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identity service.
//!
//! Every entity in a graph is keyed by a random v4 UUID minted at creation.
//! Identifiers are never reused: removing an entity retires its id for good.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a graph held by a [`GraphStore`](crate::GraphStore)
    GraphId
);

entity_id!(
    /// Unique identifier for a node
    NodeId
);

entity_id!(
    /// Unique identifier for an anchor
    AnchorId
);

entity_id!(
    /// Unique identifier for a registered subscriber handle
    SubscriberId
);

/// Edges are 1:1 with occupied input anchors, so an edge is named by its
/// destination anchor.
pub type EdgeId = AnchorId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let ids: std::collections::HashSet<NodeId> = (0..1000).map(|_| NodeId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_display_parses_back() {
        let id = AnchorId::new();
        let parsed: AnchorId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<AnchorId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = NodeId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
