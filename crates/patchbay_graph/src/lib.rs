// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection state machine for embeddable node-graph editors.
//!
//! Nodes expose typed input and output ports; users connect, disconnect and
//! re-route connections by dragging between ports. This crate owns the rules
//! and the state, leaving measurement and drawing to the host UI.
//!
//! ## Architecture
//!
//! pointer gestures -> [`GraphAction`] -> [`reduce`](reducer::reduce) ->
//! [`GraphState`] snapshot -> [`project`](projector::project) ->
//! [`RenderConnection`]s -> painter
//!
//! - [`PortRegistry`]: live port metadata and screen rectangles
//! - [`GraphStore`]: serialized action channel and snapshot subscriptions
//! - [`reducer`]: transition rules, including re-routing of connected ports
//! - [`projector`]: resolves snapshots into drawable line endpoints
//!
//! Each graph instance owns its own registry and store.

pub mod action;
pub mod connection;
pub mod document;
pub mod error;
pub mod node;
pub mod paint;
pub mod policy;
pub mod port;
pub mod projector;
pub mod reducer;
pub mod registry;
pub mod state;
pub mod store;

pub use action::{ConnectionEvent, GraphAction};
pub use connection::{Connection, DetachedDraggedConnection, DraggedConnection};
pub use document::GraphDocument;
pub use error::{GraphError, Result};
pub use node::{Node, NodeId};
pub use policy::{AllowAll, Both, Candidate, ConnectPolicy, NoCycles};
pub use port::{Port, PortKey, Role};
pub use projector::{project, Direction, RenderConnection, RenderKey, VisibleConnections};
pub use reducer::{Outcome, Rejection};
pub use registry::{PortLookup, PortRegistry, RectProvider};
pub use state::GraphState;
pub use store::{GraphStore, SubscriptionId};
