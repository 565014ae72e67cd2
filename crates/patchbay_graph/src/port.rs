// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port identity: keys, roles and port metadata.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-supplied identifier of a port.
///
/// Keys must be stable and unique within one graph; they are compared by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortKey(String);

impl PortKey {
    /// Create a port key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PortKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for PortKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a port accepts or supplies a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl Role {
    /// The role a port must have to be connected to this one
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port key
    pub key: PortKey,
    /// Port role, fixed at registration
    pub role: Role,
    /// Node owning this port
    pub parent: NodeId,
}

impl Port {
    /// Check if a connection to another port is structurally valid.
    ///
    /// Ports must have opposite roles and live on different nodes.
    pub fn can_connect(&self, other: &Port) -> bool {
        self.role == other.role.opposite() && self.parent != other.parent
    }
}
