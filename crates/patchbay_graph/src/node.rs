// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.

use egui::Pos2;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A node instance in the graph.
///
/// Ports are not stored here: they are owned by the embedding application and
/// registered with the [`PortRegistry`](crate::registry::PortRegistry) when mounted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Position in graph space
    pub position: Pos2,
}

impl Node {
    /// Create a node at the origin
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            position: Pos2::ZERO,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Pos2::new(x, y);
        self
    }
}
