// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph state snapshots.

use crate::connection::{Connection, DetachedDraggedConnection, DraggedConnection};
use crate::node::{Node, NodeId};
use crate::port::PortKey;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Root aggregate owned by the [`GraphStore`](crate::store::GraphStore).
///
/// Snapshots handed to subscribers are never mutated again; the reducer
/// clones before it writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// Nodes in the graph
    pub nodes: IndexMap<NodeId, Node>,
    /// Established connections
    pub connections: IndexSet<Connection>,
    /// Plain drags keyed by origin port
    pub dragged_connections: IndexMap<PortKey, DraggedConnection>,
    /// Detached drags keyed by their dangling end
    pub detached_dragged_connections: IndexMap<PortKey, DetachedDraggedConnection>,
}

impl GraphState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// The connection touching a port, if any
    pub fn connection_of(&self, key: &PortKey) -> Option<&Connection> {
        self.connections.iter().find(|c| c.involves_port(key))
    }

    /// Check if a port takes part in an established connection
    pub fn is_connected(&self, key: &PortKey) -> bool {
        self.connection_of(key).is_some()
    }

    /// Key of the detached drag a port belongs to, as dangling end or remaining origin
    pub fn detached_key_for(&self, key: &PortKey) -> Option<&PortKey> {
        if let Some((k, _)) = self.detached_dragged_connections.get_key_value(key) {
            return Some(k);
        }
        self.detached_dragged_connections
            .iter()
            .find(|(_, d)| d.remaining_origin == *key)
            .map(|(k, _)| k)
    }

    /// Check if any drag (plain or detached) involves a port
    pub fn is_dragging(&self, key: &PortKey) -> bool {
        self.dragged_connections.contains_key(key) || self.detached_key_for(key).is_some()
    }
}
