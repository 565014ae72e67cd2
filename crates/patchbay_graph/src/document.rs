// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved graph documents.
//!
//! A document only records nodes and established connections. Loading never
//! writes state directly: it replays `AddNode` and `Connect` actions, so a
//! loaded graph obeys the same rules as one built by hand.

use crate::action::GraphAction;
use crate::connection::Connection;
use crate::error::Result;
use crate::node::Node;
use crate::state::GraphState;
use serde::{Deserialize, Serialize};

/// Persistent form of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Nodes in insertion order
    pub nodes: Vec<Node>,
    /// Established connections
    pub connections: Vec<Connection>,
}

impl GraphDocument {
    /// Capture the persistent part of a snapshot
    pub fn from_state(state: &GraphState) -> Self {
        Self {
            nodes: state.nodes.values().cloned().collect(),
            connections: state.connections.iter().cloned().collect(),
        }
    }

    /// Actions that rebuild this document in an empty store.
    ///
    /// Ports must be registered before the `Connect` actions are dispatched.
    pub fn into_actions(self) -> Vec<GraphAction> {
        let nodes = self.nodes.into_iter().map(GraphAction::AddNode);
        let connections = self
            .connections
            .into_iter()
            .map(|c| GraphAction::Connect {
                from: c.output,
                to: c.input,
            });
        nodes.chain(connections).collect()
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse from RON
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }
}
