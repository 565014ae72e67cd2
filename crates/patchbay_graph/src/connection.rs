// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions, established and in flight.

use crate::port::PortKey;
use egui::Pos2;
use serde::{Deserialize, Serialize};

/// An established connection between an output and an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Output side
    pub output: PortKey,
    /// Input side
    pub input: PortKey,
}

impl Connection {
    /// Create a new connection
    pub fn new(output: impl Into<PortKey>, input: impl Into<PortKey>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
        }
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, key: &PortKey) -> bool {
        self.output == *key || self.input == *key
    }

    /// The endpoint opposite to `key`, if `key` is one of the endpoints
    pub fn other_end(&self, key: &PortKey) -> Option<&PortKey> {
        if self.output == *key {
            Some(&self.input)
        } else if self.input == *key {
            Some(&self.output)
        } else {
            None
        }
    }
}

/// A connection being dragged from a fixed origin port towards the cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraggedConnection {
    /// Port the drag started at
    pub origin: PortKey,
    /// Last reported cursor position, `None` until the first move
    pub cursor: Option<Pos2>,
}

/// A connection pulled loose from a connected port.
///
/// The former connection is out of the connection set; `remaining_origin`
/// stays anchored while `dangling_end` follows the cursor until dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedDraggedConnection {
    /// Endpoint that was pulled off and follows the cursor
    pub dangling_end: PortKey,
    /// Endpoint that stays fixed
    pub remaining_origin: PortKey,
    /// Last reported cursor position
    pub cursor: Option<Pos2>,
    /// Pointer released, waiting for a connect or disconnect to resolve it
    pub released: bool,
}

impl DetachedDraggedConnection {
    /// Check if this record involves a specific port
    pub fn involves_port(&self, key: &PortKey) -> bool {
        self.dangling_end == *key || self.remaining_origin == *key
    }
}
