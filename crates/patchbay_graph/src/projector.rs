// SPDX-License-Identifier: MIT OR Apache-2.0
//! Turns state snapshots and live port positions into drawable connections.

use crate::port::{PortKey, Role};
use crate::registry::{PortLookup, PortRegistry};
use crate::state::GraphState;
use egui::Pos2;
use std::sync::Arc;

/// Horizontal orientation of the curve handles at the anchored end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Anchored end is an input: handle points left
    Left,
    /// Anchored end is an output: handle points right
    Right,
}

impl From<Role> for Direction {
    fn from(role: Role) -> Self {
        match role {
            Role::Output => Self::Right,
            Role::Input => Self::Left,
        }
    }
}

/// Identity of a rendered connection; match frames by this, not by position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RenderKey {
    /// Established connection
    Established {
        /// Output side
        output: PortKey,
        /// Input side
        input: PortKey,
    },
    /// Plain drag
    Dragged {
        /// Drag origin
        origin: PortKey,
    },
    /// Detached drag
    Detached {
        /// Anchored endpoint
        remaining_origin: PortKey,
        /// Endpoint following the cursor
        dangling_end: PortKey,
    },
}

/// A line to draw
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConnection {
    /// What this line represents
    pub key: RenderKey,
    /// Anchored port center
    pub from: Pos2,
    /// Partner port center or cursor
    pub to: Pos2,
    /// Handle orientation at `from`
    pub direction: Direction,
}

/// Project a snapshot onto current port positions.
///
/// Anything with an endpoint the registry cannot resolve right now is left
/// out of this frame. Plain drags without a cursor yet are left out as well.
pub fn project(state: &GraphState, registry: &PortRegistry) -> Vec<RenderConnection> {
    let mut out = Vec::with_capacity(
        state.connections.len()
            + state.dragged_connections.len()
            + state.detached_dragged_connections.len(),
    );

    for connection in &state.connections {
        let (Some(from), Some(to)) = (
            registry.resolve_center(&connection.output),
            registry.resolve_center(&connection.input),
        ) else {
            continue;
        };
        out.push(RenderConnection {
            key: RenderKey::Established {
                output: connection.output.clone(),
                input: connection.input.clone(),
            },
            from,
            to,
            direction: Direction::Right,
        });
    }

    for dragged in state.dragged_connections.values() {
        let Some(cursor) = dragged.cursor else {
            continue;
        };
        if let Some((from, direction)) = anchor(registry, &dragged.origin) {
            out.push(RenderConnection {
                key: RenderKey::Dragged {
                    origin: dragged.origin.clone(),
                },
                from,
                to: cursor,
                direction,
            });
        }
    }

    for detached in state.detached_dragged_connections.values() {
        if detached.released {
            continue;
        }
        let Some(cursor) = detached.cursor else {
            continue;
        };
        if let Some((from, direction)) = anchor(registry, &detached.remaining_origin) {
            out.push(RenderConnection {
                key: RenderKey::Detached {
                    remaining_origin: detached.remaining_origin.clone(),
                    dangling_end: detached.dangling_end.clone(),
                },
                from,
                to: cursor,
                direction,
            });
        }
    }

    out
}

fn anchor(registry: &PortRegistry, key: &PortKey) -> Option<(Pos2, Direction)> {
    let role = registry.role(key)?;
    let center = registry.resolve_center(key)?;
    Some((center, role.into()))
}

/// Cached projection that is recomputed only when its inputs change
#[derive(Debug, Default)]
pub struct VisibleConnections {
    state: Option<Arc<GraphState>>,
    revision: Option<u64>,
    connections: Vec<RenderConnection>,
}

impl VisibleConnections {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-project if the snapshot or the registry changed.
    ///
    /// Returns the new list only when it differs from the previous frame.
    /// Port providers are polled on every call with new inputs; call
    /// [`PortRegistry::invalidate`] when positions move without a snapshot change.
    pub fn update(&mut self, state: &Arc<GraphState>, registry: &PortRegistry) -> Option<&[RenderConnection]> {
        let revision = registry.revision();
        let same_state = self.state.as_ref().is_some_and(|s| Arc::ptr_eq(s, state));
        if same_state && self.revision == Some(revision) {
            return None;
        }
        self.state = Some(Arc::clone(state));
        self.revision = Some(revision);

        let connections = project(state, registry);
        if connections == self.connections {
            return None;
        }
        self.connections = connections;
        Some(&self.connections)
    }

    /// Last projected list
    pub fn connections(&self) -> &[RenderConnection] {
        &self.connections
    }
}
