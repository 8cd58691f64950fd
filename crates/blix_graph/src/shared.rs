// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serialized access to a graph from multiple threads.
//!
//! Readers share the graph concurrently. A mutation holds the write lock for
//! its whole duration, subscriber notifications included, so one mutation
//! always completes before the next begins.

use crate::graph::Graph;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

/// Thread-safe handle to a graph
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<Graph>>,
}

impl SharedGraph {
    /// Wrap a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Borrow the graph for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.inner.read()
    }

    /// Run one mutation with exclusive access
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let mut graph = self.inner.write();
        f(&mut graph)
    }

    /// Unwrap the graph if this is the last handle
    pub fn try_into_inner(self) -> Result<Graph, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<Graph> for SharedGraph {
    fn from(graph: Graph) -> Self {
        Self::new(graph)
    }
}
