// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transition rules for every [`GraphAction`].
//!
//! [`reduce`] is pure: it never touches the input state and returns either a
//! new state with the connection events it caused, or a no-op. Invalid
//! gestures are [`Rejection`]s, which callers log and otherwise ignore. Only
//! structural misuse is returned as a [`GraphError`].
//!
//! ## Detached drags
//!
//! Grabbing a port that is already connected pulls the connection loose: it
//! leaves the connection set, the grabbed port stays anchored as the
//! `remaining_origin`, and the former partner becomes the dangling end that
//! follows the cursor. The record is keyed by the dangling end. Gesture
//! actions find it through either endpoint, since the pointer stream reports
//! the grabbed port.

use crate::action::{ConnectionEvent, GraphAction};
use crate::connection::{Connection, DetachedDraggedConnection, DraggedConnection};
use crate::error::{GraphError, Result};
use crate::node::{Node, NodeId};
use crate::policy::{Candidate, ConnectPolicy};
use crate::port::{PortKey, Role};
use crate::registry::PortLookup;
use crate::state::GraphState;
use egui::Pos2;
use thiserror::Error;

/// Result of applying one action
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The action produced a new state
    Applied {
        /// State after the action
        state: GraphState,
        /// Connections that entered or left the connection set
        events: Vec<ConnectionEvent>,
    },
    /// The action had nothing to do
    Unchanged,
    /// The action was an invalid gesture; state is unchanged
    Rejected(Rejection),
}

impl Outcome {
    fn applied(state: GraphState) -> Self {
        Self::Applied {
            state,
            events: Vec::new(),
        }
    }
}

/// Why an action was ignored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Node is not in the graph
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// No drag is active for the port
    #[error("no active drag from {0}")]
    NoActiveDrag(PortKey),

    /// Port is not (or no longer) registered
    #[error("port not registered: {0}")]
    UnknownPort(PortKey),

    /// Both ports have the same role
    #[error("cannot connect {0} to {1}: both are {2} ports")]
    SameRole(PortKey, PortKey, Role),

    /// Both ports belong to the same node
    #[error("cannot connect {0} to {1}: same node")]
    SameNode(PortKey, PortKey),

    /// One of the ports already has a connection
    #[error("port already connected: {0}")]
    PortAlreadyConnected(PortKey),

    /// The connection policy refused the connection
    #[error("connection {output} -> {input} refused by policy")]
    Vetoed {
        /// Output side
        output: PortKey,
        /// Input side
        input: PortKey,
    },

    /// No such connection
    #[error("connection {output} -> {input} not found")]
    ConnectionNotFound {
        /// Output side
        output: PortKey,
        /// Input side
        input: PortKey,
    },
}

/// Apply an action to a state
pub fn reduce(
    state: &GraphState,
    action: &GraphAction,
    ports: &dyn PortLookup,
    policy: &dyn ConnectPolicy,
) -> Result<Outcome> {
    let outcome = match action {
        GraphAction::AddNode(node) => add_node(state, node),
        GraphAction::RemoveNode(node_id) => remove_node(state, *node_id, ports),
        GraphAction::MoveNode { node, position } => move_node(state, *node, *position),
        GraphAction::StartDrag { origin } => return start_drag(state, origin, ports),
        GraphAction::Drag { origin, cursor } => drag(state, origin, *cursor),
        GraphAction::Release { origin } => release(state, origin),
        GraphAction::Connect { from, to } => connect(state, from, to, ports, policy),
        GraphAction::Disconnect { output, input } => disconnect(state, output, input),
        GraphAction::RemovePort(key) => remove_port(state, key),
    };
    Ok(outcome)
}

fn add_node(state: &GraphState, node: &Node) -> Outcome {
    if state.nodes.contains_key(&node.id) {
        return Outcome::Unchanged;
    }
    let mut next = state.clone();
    next.nodes.insert(node.id, node.clone());
    Outcome::applied(next)
}

fn remove_node(state: &GraphState, node_id: NodeId, ports: &dyn PortLookup) -> Outcome {
    let owned = |key: &PortKey| ports.parent(key) == Some(node_id);

    let touches_node = state.nodes.contains_key(&node_id)
        || state
            .connections
            .iter()
            .any(|c| owned(&c.output) || owned(&c.input))
        || state.dragged_connections.keys().any(|k| owned(k))
        || state
            .detached_dragged_connections
            .values()
            .any(|d| owned(&d.dangling_end) || owned(&d.remaining_origin));
    if !touches_node {
        return Outcome::Unchanged;
    }

    let mut next = state.clone();
    next.nodes.shift_remove(&node_id);

    let mut events = Vec::new();
    next.connections.retain(|c| {
        let keep = !owned(&c.output) && !owned(&c.input);
        if !keep {
            events.push(ConnectionEvent::Removed(c.clone()));
        }
        keep
    });
    next.dragged_connections.retain(|k, _| !owned(k));
    next.detached_dragged_connections
        .retain(|_, d| !owned(&d.dangling_end) && !owned(&d.remaining_origin));

    Outcome::Applied {
        state: next,
        events,
    }
}

fn move_node(state: &GraphState, node_id: NodeId, position: Pos2) -> Outcome {
    match state.nodes.get(&node_id) {
        None => Outcome::Rejected(Rejection::NodeNotFound(node_id)),
        Some(node) if node.position == position => Outcome::Unchanged,
        Some(_) => {
            let mut next = state.clone();
            if let Some(node) = next.nodes.get_mut(&node_id) {
                node.position = position;
            }
            Outcome::applied(next)
        }
    }
}

fn start_drag(state: &GraphState, origin: &PortKey, ports: &dyn PortLookup) -> Result<Outcome> {
    if ports.role(origin).is_none() {
        return Err(GraphError::UnregisteredPort(origin.clone()));
    }

    let mut next = state.clone();

    // A released record that was never resolved is stale once its port is grabbed again
    let before = next.detached_dragged_connections.len();
    next.detached_dragged_connections
        .retain(|_, d| !(d.released && d.involves_port(origin)));
    let discarded_stale = next.detached_dragged_connections.len() != before;

    if next.is_dragging(origin) {
        return Ok(if discarded_stale {
            Outcome::applied(next)
        } else {
            Outcome::Unchanged
        });
    }

    let mut events = Vec::new();
    match next.connection_of(origin).cloned() {
        Some(connection) => {
            next.connections.shift_remove(&connection);
            let dangling_end = connection.other_end(origin).cloned().unwrap_or_else(|| origin.clone());
            next.detached_dragged_connections.insert(
                dangling_end.clone(),
                DetachedDraggedConnection {
                    dangling_end,
                    remaining_origin: origin.clone(),
                    cursor: None,
                    released: false,
                },
            );
            events.push(ConnectionEvent::Removed(connection));
        }
        None => {
            next.dragged_connections.insert(
                origin.clone(),
                DraggedConnection {
                    origin: origin.clone(),
                    cursor: None,
                },
            );
        }
    }

    Ok(Outcome::Applied {
        state: next,
        events,
    })
}

fn drag(state: &GraphState, origin: &PortKey, cursor: Pos2) -> Outcome {
    if state.dragged_connections.contains_key(origin) {
        let mut next = state.clone();
        if let Some(dragged) = next.dragged_connections.get_mut(origin) {
            dragged.cursor = Some(cursor);
        }
        return Outcome::applied(next);
    }

    let active_detached = state
        .detached_key_for(origin)
        .filter(|key| !state.detached_dragged_connections[*key].released)
        .cloned();
    match active_detached {
        Some(key) => {
            let mut next = state.clone();
            if let Some(detached) = next.detached_dragged_connections.get_mut(&key) {
                detached.cursor = Some(cursor);
            }
            Outcome::applied(next)
        }
        None => Outcome::Rejected(Rejection::NoActiveDrag(origin.clone())),
    }
}

fn release(state: &GraphState, origin: &PortKey) -> Outcome {
    let mut next = state.clone();
    let mut changed = next.dragged_connections.shift_remove(origin).is_some();

    if let Some(key) = state.detached_key_for(origin) {
        if let Some(detached) = next.detached_dragged_connections.get_mut(key) {
            if !detached.released {
                detached.released = true;
                changed = true;
            }
        }
    }

    if changed {
        Outcome::applied(next)
    } else {
        Outcome::Rejected(Rejection::NoActiveDrag(origin.clone()))
    }
}

fn connect(
    state: &GraphState,
    from: &PortKey,
    to: &PortKey,
    ports: &dyn PortLookup,
    policy: &dyn ConnectPolicy,
) -> Outcome {
    let detached_key = state
        .detached_key_for(from)
        .or_else(|| state.detached_key_for(to))
        .cloned();

    if let Some(key) = detached_key {
        return reconnect(state, &key, from, to, ports, policy);
    }

    match validate(state, from, to, ports, policy) {
        Ok(connection) => {
            let mut next = state.clone();
            next.connections.insert(connection.clone());
            Outcome::Applied {
                state: next,
                events: vec![ConnectionEvent::Established(connection)],
            }
        }
        Err(rejection) => Outcome::Rejected(rejection),
    }
}

/// Complete a detached drag by splicing its remaining origin to the dropped port
fn reconnect(
    state: &GraphState,
    key: &PortKey,
    from: &PortKey,
    to: &PortKey,
    ports: &dyn PortLookup,
    policy: &dyn ConnectPolicy,
) -> Outcome {
    let detached = &state.detached_dragged_connections[key];
    let remaining = &detached.remaining_origin;
    // The dropped port is the argument foreign to the record; naming only the
    // record's own endpoints drops the dangling end back where it was
    let foreign = |k: &PortKey| k != key && k != remaining;
    let dropped = [to, from].into_iter().find(|k| foreign(*k)).unwrap_or(key);

    match validate(state, remaining, dropped, ports, policy) {
        Ok(connection) => {
            let mut next = state.clone();
            next.detached_dragged_connections.shift_remove(key);
            next.connections.insert(connection.clone());
            Outcome::Applied {
                state: next,
                events: vec![ConnectionEvent::Established(connection)],
            }
        }
        Err(rejection) if detached.released => {
            tracing::debug!(%rejection, dangling = %key, "discarding released detached connection");
            let mut next = state.clone();
            next.detached_dragged_connections.shift_remove(key);
            Outcome::applied(next)
        }
        Err(rejection) => Outcome::Rejected(rejection),
    }
}

/// Structural checks plus the connection policy, orienting the pair by role
fn validate(
    state: &GraphState,
    a: &PortKey,
    b: &PortKey,
    ports: &dyn PortLookup,
    policy: &dyn ConnectPolicy,
) -> std::result::Result<Connection, Rejection> {
    let port_a = ports.port(a).ok_or_else(|| Rejection::UnknownPort(a.clone()))?;
    let port_b = ports.port(b).ok_or_else(|| Rejection::UnknownPort(b.clone()))?;

    if !port_a.can_connect(&port_b) {
        return Err(if port_a.role != port_b.role.opposite() {
            Rejection::SameRole(a.clone(), b.clone(), port_a.role)
        } else {
            Rejection::SameNode(a.clone(), b.clone())
        });
    }

    let (output, input) = match port_a.role {
        Role::Output => (a, b),
        Role::Input => (b, a),
    };

    if let Some(busy) = [output, input].into_iter().find(|k| state.is_connected(k)) {
        return Err(Rejection::PortAlreadyConnected(busy.clone()));
    }

    let candidate = Candidate {
        output,
        input,
        state,
        ports,
    };
    if !policy.allows(&candidate) {
        return Err(Rejection::Vetoed {
            output: output.clone(),
            input: input.clone(),
        });
    }

    Ok(Connection::new(output.clone(), input.clone()))
}

fn disconnect(state: &GraphState, output: &PortKey, input: &PortKey) -> Outcome {
    let connection = Connection::new(output.clone(), input.clone());
    if state.connections.contains(&connection) {
        let mut next = state.clone();
        next.connections.shift_remove(&connection);
        return Outcome::Applied {
            state: next,
            events: vec![ConnectionEvent::Removed(connection)],
        };
    }

    // The connection may be pulled loose already; disconnecting resolves that drag
    let detached_key = state
        .detached_dragged_connections
        .iter()
        .find(|(_, d)| d.involves_port(output) && d.involves_port(input))
        .map(|(key, _)| key.clone());
    if let Some(key) = detached_key {
        let mut next = state.clone();
        next.detached_dragged_connections.shift_remove(&key);
        return Outcome::applied(next);
    }

    Outcome::Rejected(Rejection::ConnectionNotFound {
        output: output.clone(),
        input: input.clone(),
    })
}

fn remove_port(state: &GraphState, key: &PortKey) -> Outcome {
    let touches_port = state.is_connected(key)
        || state.is_dragging(key)
        || state
            .detached_dragged_connections
            .values()
            .any(|d| d.involves_port(key));
    if !touches_port {
        return Outcome::Unchanged;
    }

    let mut next = state.clone();
    let mut events = Vec::new();
    next.connections.retain(|c| {
        let keep = !c.involves_port(key);
        if !keep {
            events.push(ConnectionEvent::Removed(c.clone()));
        }
        keep
    });
    next.dragged_connections.shift_remove(key);
    next.detached_dragged_connections
        .retain(|_, d| !d.involves_port(key));

    Outcome::Applied {
        state: next,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowAll;
    use crate::registry::PortRegistry;
    use egui::Rect;

    struct Fixture {
        registry: PortRegistry,
        node_a: NodeId,
        node_b: NodeId,
        node_c: NodeId,
        state: GraphState,
    }

    impl Fixture {
        /// Three nodes `a`, `b`, `c`, each with ports `<node>.in` and `<node>.out`
        fn new() -> Self {
            let registry = PortRegistry::new();
            let mut state = GraphState::new();
            let ids: Vec<NodeId> = ["a", "b", "c"]
                .into_iter()
                .map(|name| {
                    let id = NodeId::new();
                    registry
                        .register(format!("{name}.in"), Role::Input, id, Rect::NOTHING)
                        .unwrap();
                    registry
                        .register(format!("{name}.out"), Role::Output, id, Rect::NOTHING)
                        .unwrap();
                    state.nodes.insert(id, Node::new(id));
                    id
                })
                .collect();
            Self {
                registry,
                node_a: ids[0],
                node_b: ids[1],
                node_c: ids[2],
                state,
            }
        }

        fn run(&mut self, action: GraphAction) -> Outcome {
            self.run_with(action, &AllowAll)
        }

        fn run_with(&mut self, action: GraphAction, policy: &dyn ConnectPolicy) -> Outcome {
            let outcome = reduce(&self.state, &action, &self.registry, policy).unwrap();
            if let Outcome::Applied { state, .. } = &outcome {
                self.state = state.clone();
            }
            outcome
        }

        fn connections(&self) -> Vec<Connection> {
            self.state.connections.iter().cloned().collect()
        }
    }

    fn events(outcome: &Outcome) -> &[ConnectionEvent] {
        match outcome {
            Outcome::Applied { events, .. } => events,
            _ => &[],
        }
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut f = Fixture::new();
        let node = Node::new(NodeId::new()).with_position(4.0, 2.0);

        assert!(matches!(f.run(GraphAction::AddNode(node.clone())), Outcome::Applied { .. }));
        assert_eq!(f.run(GraphAction::AddNode(node.clone())), Outcome::Unchanged);
        assert_eq!(f.state.node(node.id), Some(&node));
    }

    #[test]
    fn test_move_node() {
        let mut f = Fixture::new();
        let node_a = f.node_a;
        f.run(GraphAction::MoveNode {
            node: node_a,
            position: Pos2::new(13.0, 37.0),
        });
        assert_eq!(f.state.node(node_a).unwrap().position, Pos2::new(13.0, 37.0));

        let missing = NodeId::new();
        assert_eq!(
            f.run(GraphAction::MoveNode {
                node: missing,
                position: Pos2::ZERO,
            }),
            Outcome::Rejected(Rejection::NodeNotFound(missing))
        );
    }

    #[test]
    fn test_connect_ports() {
        let mut f = Fixture::new();
        let outcome = f.run(GraphAction::connect("a.out", "b.in"));

        assert_eq!(f.connections(), vec![Connection::new("a.out", "b.in")]);
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Established(Connection::new("a.out", "b.in"))]
        );
    }

    #[test]
    fn test_connect_orients_by_role() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("b.in", "a.out"));
        assert_eq!(f.connections(), vec![Connection::new("a.out", "b.in")]);
    }

    #[test]
    fn test_duplicate_connect_is_rejected() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        let outcome = f.run(GraphAction::connect("a.out", "b.in"));

        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::PortAlreadyConnected("a.out".into()))
        );
        assert_eq!(f.connections().len(), 1);
    }

    #[test]
    fn test_port_already_connected_to_third_party() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));

        let outcome = f.run(GraphAction::connect("c.out", "b.in"));
        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::PortAlreadyConnected("b.in".into()))
        );
        assert_eq!(f.connections(), vec![Connection::new("a.out", "b.in")]);
    }

    #[test]
    fn test_same_node_is_rejected() {
        let mut f = Fixture::new();
        let outcome = f.run(GraphAction::connect("a.out", "a.in"));

        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::SameNode("a.out".into(), "a.in".into()))
        );
        assert!(f.state.connections.is_empty());
    }

    #[test]
    fn test_same_role_is_rejected() {
        let mut f = Fixture::new();
        assert!(matches!(
            f.run(GraphAction::connect("a.out", "b.out")),
            Outcome::Rejected(Rejection::SameRole(_, _, Role::Output))
        ));
        assert!(matches!(
            f.run(GraphAction::connect("a.in", "b.in")),
            Outcome::Rejected(Rejection::SameRole(_, _, Role::Input))
        ));
    }

    #[test]
    fn test_unknown_port_is_rejected() {
        let mut f = Fixture::new();
        assert_eq!(
            f.run(GraphAction::connect("a.out", "ghost.in")),
            Outcome::Rejected(Rejection::UnknownPort("ghost.in".into()))
        );
    }

    #[test]
    fn test_policy_veto() {
        let mut f = Fixture::new();
        let never = |_: &PortKey, _: &PortKey| false;
        let outcome = f.run_with(GraphAction::connect("a.out", "b.in"), &never);

        assert!(matches!(outcome, Outcome::Rejected(Rejection::Vetoed { .. })));
        assert!(f.state.connections.is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::connect("b.out", "c.in"));

        let first = f.run(GraphAction::disconnect("a.out", "b.in"));
        assert_eq!(
            events(&first),
            [ConnectionEvent::Removed(Connection::new("a.out", "b.in"))]
        );
        let once = f.state.clone();

        let second = f.run(GraphAction::disconnect("a.out", "b.in"));
        assert!(matches!(second, Outcome::Rejected(Rejection::ConnectionNotFound { .. })));
        assert_eq!(f.state, once);
    }

    #[test]
    fn test_connect_then_disconnect_restores_connections() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("b.out", "c.in"));
        f.run(GraphAction::start_drag("a.out"));
        let before = f.state.clone();

        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::disconnect("a.out", "b.in"));

        assert_eq!(f.state.connections, before.connections);
        assert_eq!(f.state.dragged_connections, before.dragged_connections);
    }

    #[test]
    fn test_plain_drag_lifecycle() {
        let mut f = Fixture::new();
        f.run(GraphAction::start_drag("a.out"));
        assert_eq!(
            f.state.dragged_connections.get(&PortKey::from("a.out")),
            Some(&DraggedConnection {
                origin: "a.out".into(),
                cursor: None,
            })
        );

        f.run(GraphAction::drag("a.out", Pos2::new(13.0, 37.0)));
        assert_eq!(
            f.state.dragged_connections[&PortKey::from("a.out")].cursor,
            Some(Pos2::new(13.0, 37.0))
        );

        f.run(GraphAction::release("a.out"));
        assert!(f.state.dragged_connections.is_empty());
    }

    #[test]
    fn test_drag_without_start_is_ignored() {
        let mut f = Fixture::new();
        let before = f.state.clone();

        assert_eq!(
            f.run(GraphAction::drag("a.out", Pos2::new(1.0, 1.0))),
            Outcome::Rejected(Rejection::NoActiveDrag("a.out".into()))
        );
        assert_eq!(
            f.run(GraphAction::release("a.out")),
            Outcome::Rejected(Rejection::NoActiveDrag("a.out".into()))
        );
        assert_eq!(f.state, before);
    }

    #[test]
    fn test_start_drag_on_unregistered_port_is_an_error() {
        let f = Fixture::new();
        let result = reduce(
            &f.state,
            &GraphAction::start_drag("ghost.out"),
            &f.registry,
            &AllowAll,
        );
        assert!(matches!(result, Err(GraphError::UnregisteredPort(_))));
    }

    #[test]
    fn test_start_drag_detaches_connection() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));

        let outcome = f.run(GraphAction::start_drag("a.out"));

        assert!(f.state.connections.is_empty());
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Removed(Connection::new("a.out", "b.in"))]
        );
        let detached = &f.state.detached_dragged_connections[&PortKey::from("b.in")];
        assert_eq!(detached.remaining_origin, PortKey::from("a.out"));
        assert_eq!(detached.dangling_end, PortKey::from("b.in"));
        assert!(!detached.released);
        assert!(f.state.dragged_connections.is_empty());
    }

    #[test]
    fn test_detached_drag_reconnects_to_new_port() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));
        f.run(GraphAction::drag("a.out", Pos2::new(50.0, 50.0)));
        assert_eq!(
            f.state.detached_dragged_connections[&PortKey::from("b.in")].cursor,
            Some(Pos2::new(50.0, 50.0))
        );

        let outcome = f.run(GraphAction::connect("b.in", "c.in"));

        assert_eq!(f.connections(), vec![Connection::new("a.out", "c.in")]);
        assert!(f.state.detached_dragged_connections.is_empty());
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Established(Connection::new("a.out", "c.in"))]
        );
    }

    #[test]
    fn test_detached_drag_reconnects_with_dangling_end_second() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));

        let outcome = f.run(GraphAction::connect("c.in", "b.in"));

        assert_eq!(f.connections(), vec![Connection::new("a.out", "c.in")]);
        assert!(f.state.detached_dragged_connections.is_empty());
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Established(Connection::new("a.out", "c.in"))]
        );
    }

    #[test]
    fn test_detached_drag_resolves_after_release() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("b.in"));
        f.run(GraphAction::release("b.in"));
        assert!(f.state.detached_dragged_connections[&PortKey::from("a.out")].released);

        // Released record no longer follows the cursor
        assert!(matches!(
            f.run(GraphAction::drag("b.in", Pos2::new(1.0, 1.0))),
            Outcome::Rejected(Rejection::NoActiveDrag(_))
        ));

        f.run(GraphAction::connect("a.out", "c.out"));
        assert_eq!(f.connections(), vec![Connection::new("c.out", "b.in")]);
        assert!(f.state.detached_dragged_connections.is_empty());
    }

    #[test]
    fn test_detached_drag_dropped_back_restores_connection() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));

        f.run(GraphAction::connect("b.in", "a.out"));
        assert_eq!(f.connections(), vec![Connection::new("a.out", "b.in")]);
        assert!(f.state.detached_dragged_connections.is_empty());
    }

    #[test]
    fn test_invalid_reconnect_keeps_active_record() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));

        // a.out -> a.in would be a self loop
        let outcome = f.run(GraphAction::connect("b.in", "a.in"));
        assert!(matches!(outcome, Outcome::Rejected(Rejection::SameNode(_, _))));
        assert!(f.state.detached_dragged_connections.contains_key(&PortKey::from("b.in")));
    }

    #[test]
    fn test_invalid_reconnect_discards_released_record() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));
        f.run(GraphAction::release("a.out"));

        let outcome = f.run(GraphAction::connect("b.in", "a.in"));
        assert!(matches!(outcome, Outcome::Applied { .. }));
        assert!(f.state.detached_dragged_connections.is_empty());
        assert!(f.state.connections.is_empty());
    }

    #[test]
    fn test_start_drag_discards_stale_detached_record() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));
        f.run(GraphAction::release("a.out"));

        f.run(GraphAction::start_drag("a.out"));
        assert!(f.state.detached_dragged_connections.is_empty());
        assert!(f.state.dragged_connections.contains_key(&PortKey::from("a.out")));
    }

    #[test]
    fn test_disconnect_resolves_detached_record() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::start_drag("a.out"));
        f.run(GraphAction::release("a.out"));

        let outcome = f.run(GraphAction::disconnect("a.out", "b.in"));
        assert!(events(&outcome).is_empty());
        assert!(f.state.detached_dragged_connections.is_empty());
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut f = Fixture::new();
        let node_a = f.node_a;
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::connect("c.out", "a.in"));
        f.run(GraphAction::connect("b.out", "c.in"));
        f.run(GraphAction::start_drag("a.out"));

        let outcome = f.run(GraphAction::RemoveNode(node_a));

        assert_eq!(f.connections(), vec![Connection::new("b.out", "c.in")]);
        assert!(f.state.detached_dragged_connections.is_empty());
        assert!(f.state.node(node_a).is_none());
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Removed(Connection::new("c.out", "a.in"))]
        );
    }

    #[test]
    fn test_remove_node_drops_plain_drags() {
        let mut f = Fixture::new();
        let node_b = f.node_b;
        f.run(GraphAction::start_drag("b.out"));
        f.run(GraphAction::start_drag("c.out"));

        f.run(GraphAction::RemoveNode(node_b));
        assert_eq!(
            f.state.dragged_connections.keys().cloned().collect::<Vec<_>>(),
            vec![PortKey::from("c.out")]
        );
        assert_eq!(f.run(GraphAction::RemoveNode(node_b)), Outcome::Unchanged);
    }

    #[test]
    fn test_remove_port() {
        let mut f = Fixture::new();
        f.run(GraphAction::connect("a.out", "b.in"));
        f.run(GraphAction::connect("b.out", "c.in"));

        let outcome = f.run(GraphAction::RemovePort("b.in".into()));
        assert_eq!(f.connections(), vec![Connection::new("b.out", "c.in")]);
        assert_eq!(
            events(&outcome),
            [ConnectionEvent::Removed(Connection::new("a.out", "b.in"))]
        );
        assert_eq!(f.run(GraphAction::RemovePort("b.in".into())), Outcome::Unchanged);
    }

    #[test]
    fn test_ports_hold_at_most_one_connection() {
        let mut f = Fixture::new();
        let node_c = f.node_c;
        let script = [
            // Re-route with the dangling end passed second, then first
            GraphAction::connect("a.out", "b.in"),
            GraphAction::start_drag("a.out"),
            GraphAction::connect("c.in", "b.in"),
            GraphAction::start_drag("c.in"),
            GraphAction::connect("a.out", "b.out"),
            // Released record resolved by an invalid drop
            GraphAction::connect("c.out", "a.in"),
            GraphAction::start_drag("a.in"),
            GraphAction::release("a.in"),
            GraphAction::drag("a.in", Pos2::new(5.0, 5.0)),
            GraphAction::connect("b.out", "a.in"),
            GraphAction::connect("c.out", "a.in"),
            // Port removal under an active detach and under a connection
            GraphAction::start_drag("c.in"),
            GraphAction::RemovePort("b.out".into()),
            GraphAction::connect("b.out", "c.in"),
            GraphAction::connect("a.out", "c.in"),
            GraphAction::RemovePort("c.in".into()),
            // Stale released record discarded by a new grab
            GraphAction::start_drag("a.in"),
            GraphAction::release("a.in"),
            GraphAction::start_drag("a.in"),
            GraphAction::connect("a.in", "b.out"),
            GraphAction::release("a.in"),
            GraphAction::connect("a.out", "b.in"),
            GraphAction::connect("a.out", "c.in"),
            GraphAction::connect("c.out", "b.in"),
            GraphAction::start_drag("b.in"),
            GraphAction::connect("a.out", "c.in"),
            GraphAction::connect("c.out", "a.in"),
            GraphAction::connect("b.out", "a.in"),
            GraphAction::RemoveNode(node_c),
            GraphAction::connect("b.out", "a.in"),
        ];

        for action in script {
            f.run(action);
            let mut outputs = std::collections::HashSet::new();
            let mut inputs = std::collections::HashSet::new();
            for c in &f.state.connections {
                assert!(outputs.insert(c.output.clone()), "output used twice: {}", c.output);
                assert!(inputs.insert(c.input.clone()), "input used twice: {}", c.input);
                assert_ne!(f.registry.parent(&c.output), f.registry.parent(&c.input));
                assert_eq!(f.registry.role(&c.output), Some(Role::Output));
                assert_eq!(f.registry.role(&c.input), Some(Role::Input));
            }
            // A pulled-loose pair is never also established
            for d in f.state.detached_dragged_connections.values() {
                assert!(!f.state.is_connected(&d.dangling_end), "dangling end connected: {}", d.dangling_end);
                assert!(!f.state.is_connected(&d.remaining_origin), "origin connected: {}", d.remaining_origin);
            }
        }
    }
}
