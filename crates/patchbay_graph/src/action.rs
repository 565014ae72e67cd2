// SPDX-License-Identifier: MIT OR Apache-2.0
//! Actions accepted by the store and events it reports.

use crate::connection::Connection;
use crate::node::{Node, NodeId};
use crate::port::PortKey;
use egui::Pos2;
use serde::{Deserialize, Serialize};

/// A mutation request, applied by the reducer in dispatch order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphAction {
    /// Add a node; adding an existing node is a no-op
    AddNode(Node),
    /// Remove a node with every connection and drag touching its ports
    RemoveNode(NodeId),
    /// Move a node
    MoveNode {
        /// Node to move
        node: NodeId,
        /// New position
        position: Pos2,
    },
    /// Pointer went down on a port
    StartDrag {
        /// Grabbed port
        origin: PortKey,
    },
    /// Pointer moved while dragging from `origin`
    Drag {
        /// Grabbed port
        origin: PortKey,
        /// Cursor position
        cursor: Pos2,
    },
    /// Pointer released after dragging from `origin`
    Release {
        /// Grabbed port
        origin: PortKey,
    },
    /// A drag from `from` was dropped on `to`
    Connect {
        /// Port the drag is anchored at
        from: PortKey,
        /// Port dropped on
        to: PortKey,
    },
    /// Remove an established connection
    Disconnect {
        /// Output side
        output: PortKey,
        /// Input side
        input: PortKey,
    },
    /// A port was unmounted; drop everything that touches it
    RemovePort(PortKey),
}

impl GraphAction {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "add node",
            Self::RemoveNode(_) => "remove node",
            Self::MoveNode { .. } => "move node",
            Self::StartDrag { .. } => "start drag",
            Self::Drag { .. } => "drag",
            Self::Release { .. } => "release",
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::RemovePort(_) => "remove port",
        }
    }

    /// Connect action
    pub fn connect(from: impl Into<PortKey>, to: impl Into<PortKey>) -> Self {
        Self::Connect {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Disconnect action
    pub fn disconnect(output: impl Into<PortKey>, input: impl Into<PortKey>) -> Self {
        Self::Disconnect {
            output: output.into(),
            input: input.into(),
        }
    }

    /// Start drag action
    pub fn start_drag(origin: impl Into<PortKey>) -> Self {
        Self::StartDrag {
            origin: origin.into(),
        }
    }

    /// Drag action
    pub fn drag(origin: impl Into<PortKey>, cursor: Pos2) -> Self {
        Self::Drag {
            origin: origin.into(),
            cursor,
        }
    }

    /// Release action
    pub fn release(origin: impl Into<PortKey>) -> Self {
        Self::Release {
            origin: origin.into(),
        }
    }
}

/// Notification for the embedding application to mirror its own model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// A connection entered the connection set
    Established(Connection),
    /// A connection left the connection set
    Removed(Connection),
}
