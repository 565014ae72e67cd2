// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable connection restrictions.
//!
//! Structural rules (opposite roles, different nodes, one connection per port)
//! are enforced by the reducer. Everything domain specific, such as type
//! compatibility or cycle prevention, is a [`ConnectPolicy`] supplied by the
//! embedding application.

use crate::node::NodeId;
use crate::port::PortKey;
use crate::registry::PortLookup;
use crate::state::GraphState;
use std::collections::HashSet;

/// A connection the reducer is about to establish
pub struct Candidate<'a> {
    /// Output side
    pub output: &'a PortKey,
    /// Input side
    pub input: &'a PortKey,
    /// State before the connection is added
    pub state: &'a GraphState,
    /// Port metadata
    pub ports: &'a dyn PortLookup,
}

/// Decides whether a structurally valid connection may be established
pub trait ConnectPolicy: Send + Sync {
    /// Return `false` to veto the candidate
    fn allows(&self, candidate: &Candidate<'_>) -> bool;
}

impl<F> ConnectPolicy for F
where
    F: Fn(&PortKey, &PortKey) -> bool + Send + Sync,
{
    fn allows(&self, candidate: &Candidate<'_>) -> bool {
        self(candidate.output, candidate.input)
    }
}

/// Accepts every structurally valid connection
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ConnectPolicy for AllowAll {
    fn allows(&self, _candidate: &Candidate<'_>) -> bool {
        true
    }
}

/// Rejects connections that would close a cycle between nodes.
///
/// Edges run from the node owning the output to the node owning the input.
/// Connections whose ports are not registered are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCycles;

impl ConnectPolicy for NoCycles {
    fn allows(&self, candidate: &Candidate<'_>) -> bool {
        let (Some(source), Some(target)) = (
            candidate.ports.parent(candidate.output),
            candidate.ports.parent(candidate.input),
        ) else {
            return true;
        };
        !reaches(target, source, candidate.state, candidate.ports)
    }
}

/// Depth-first search along existing connections
fn reaches(from: NodeId, to: NodeId, state: &GraphState, ports: &dyn PortLookup) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![from];

    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !visited.insert(node) {
            continue;
        }
        for connection in &state.connections {
            if ports.parent(&connection.output) == Some(node) {
                if let Some(next) = ports.parent(&connection.input) {
                    stack.push(next);
                }
            }
        }
    }

    false
}

/// Requires both policies to allow the candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct Both<A, B>(pub A, pub B);

impl<A: ConnectPolicy, B: ConnectPolicy> ConnectPolicy for Both<A, B> {
    fn allows(&self, candidate: &Candidate<'_>) -> bool {
        self.0.allows(candidate) && self.1.allows(candidate)
    }
}
