// SPDX-License-Identifier: MIT OR Apache-2.0
//! Patchbay playground
//!
//! A headless test graph: builds a small calculator-shaped graph, replays a
//! scripted pointer gesture stream through the store and logs every snapshot,
//! connection event and projected frame. Frames are painted into an offscreen
//! egui context. Set `RUST_LOG` to adjust verbosity.

use egui::{pos2, vec2, Color32, Pos2, Rect, Stroke};
use parking_lot::RwLock;
use patchbay_graph::paint::paint_connections;
use patchbay_graph::{
    Both, ConnectionEvent, GraphAction, GraphDocument, GraphStore, NoCycles, Node, NodeId, PortKey, PortRegistry,
    Role, VisibleConnections,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const NODE_WIDTH: f32 = 120.0;
const PORT_SIZE: f32 = 10.0;
const PORT_SPACING: f32 = 20.0;

/// Node positions mirrored from store snapshots, read by port rect providers
type Layout = Arc<RwLock<HashMap<NodeId, Pos2>>>;

struct Demo {
    store: Arc<GraphStore>,
    layout: Layout,
}

impl Demo {
    fn new() -> Self {
        let registry = Arc::new(PortRegistry::new());
        // Displays only show computed results
        let display_rule =
            |output: &PortKey, input: &PortKey| !input.as_str().starts_with("display.") || output.as_str().ends_with(".result");
        let store = Arc::new(GraphStore::with_policy(registry, Both(NoCycles, display_rule)));
        let layout: Layout = Arc::default();

        let mirror = Arc::clone(&layout);
        store.subscribe(move |state| {
            let mut layout = mirror.write();
            layout.clear();
            layout.extend(state.nodes.values().map(|n| (n.id, n.position)));
        });
        store.observe(|event| match event {
            ConnectionEvent::Established(c) => tracing::info!("connected {} -> {}", c.output, c.input),
            ConnectionEvent::Removed(c) => tracing::info!("disconnected {} -> {}", c.output, c.input),
        });

        Self { store, layout }
    }

    /// Add a node and mount its ports, inputs on the left edge and outputs on the right
    fn add_node(&self, name: &str, position: Pos2, inputs: &[&str], outputs: &[&str]) -> patchbay_graph::Result<NodeId> {
        let id = NodeId::new();
        self.store.dispatch(GraphAction::AddNode(Node::new(id).with_position(position.x, position.y)))?;

        let sides = inputs
            .iter()
            .enumerate()
            .map(|(i, port)| (*port, Role::Input, i))
            .chain(outputs.iter().enumerate().map(|(i, port)| (*port, Role::Output, i)));
        for (port, role, index) in sides {
            let layout = Arc::clone(&self.layout);
            let dx = match role {
                Role::Input => 0.0,
                Role::Output => NODE_WIDTH,
            };
            let dy = PORT_SPACING * (index as f32 + 1.0);
            self.store.register_port(format!("{name}.{port}"), role, id, move || {
                let origin = *layout.read().get(&id)?;
                Some(Rect::from_center_size(origin + vec2(dx, dy), vec2(PORT_SIZE, PORT_SIZE)))
            })?;
        }
        Ok(id)
    }

    /// One pointer gesture: press on `origin`, move through `path`, drop on `target`
    fn gesture(&self, origin: &str, path: &[Pos2], target: Option<&str>) -> patchbay_graph::Result<()> {
        self.store.dispatch(GraphAction::start_drag(origin))?;
        for cursor in path {
            self.store.dispatch(GraphAction::drag(origin, *cursor))?;
        }
        if let Some(target) = target {
            self.store.dispatch(GraphAction::connect(origin, target))?;
        }
        self.store.dispatch(GraphAction::release(origin))
    }
}

fn run() -> patchbay_graph::Result<()> {
    let demo = Demo::new();
    let mut visible = VisibleConnections::new();
    let ctx = egui::Context::default();
    let mut frame = |label: &str, demo: &Demo| {
        if let Some(connections) = visible.update(&demo.store.state(), demo.store.registry()) {
            let output = ctx.run(egui::RawInput::default(), |ctx| {
                let painter = ctx.layer_painter(egui::LayerId::background());
                paint_connections(&painter, connections, Stroke::new(2.0, Color32::LIGHT_GRAY));
            });
            tracing::info!(
                "frame after {label}: {} connection(s), {} shape(s)",
                connections.len(),
                output.shapes.len()
            );
            for c in connections {
                tracing::debug!(key = ?c.key, "({:.0}, {:.0}) -> ({:.0}, {:.0})", c.from.x, c.from.y, c.to.x, c.to.y);
            }
        }
    };

    let lhs = demo.add_node("lhs", pos2(0.0, 0.0), &[], &["value"])?;
    demo.add_node("rhs", pos2(0.0, 120.0), &[], &["value"])?;
    demo.add_node("bias", pos2(0.0, 240.0), &[], &["value"])?;
    let sum = demo.add_node("sum", pos2(240.0, 60.0), &["a", "b"], &["result"])?;
    demo.add_node("display", pos2(480.0, 60.0), &["value"], &[])?;
    frame("setup", &demo);

    demo.gesture("lhs.value", &[pos2(150.0, 40.0), pos2(235.0, 80.0)], Some("sum.a"))?;
    demo.gesture("sum.b", &[pos2(200.0, 120.0), pos2(125.0, 140.0)], Some("rhs.value"))?;
    demo.gesture("sum.result", &[pos2(470.0, 80.0)], Some("display.value"))?;
    frame("wiring", &demo);

    // Rejected: output to output, then a raw value into the display
    demo.gesture("lhs.value", &[pos2(100.0, 150.0)], Some("rhs.value"))?;
    demo.store.dispatch(GraphAction::disconnect("sum.result", "display.value"))?;
    demo.gesture("bias.value", &[pos2(300.0, 80.0)], Some("display.value"))?;
    demo.gesture("sum.result", &[pos2(470.0, 80.0)], Some("display.value"))?;

    // Re-route: pull the sum's second input off rhs and drop it on bias instead
    demo.store.dispatch(GraphAction::start_drag("sum.b"))?;
    demo.store.dispatch(GraphAction::drag("sum.b", pos2(150.0, 60.0)))?;
    frame("detach", &demo);
    demo.store.dispatch(GraphAction::release("sum.b"))?;
    demo.store.dispatch(GraphAction::connect("rhs.value", "bias.value"))?;
    frame("re-route", &demo);

    demo.store.dispatch(GraphAction::MoveNode {
        node: sum,
        position: pos2(260.0, 200.0),
    })?;
    frame("move", &demo);

    demo.store.dispatch(GraphAction::RemoveNode(lhs))?;
    for port in demo.store.registry().ports_of(lhs) {
        demo.store.unregister_port(&port)?;
    }
    frame("remove lhs", &demo);

    let document = GraphDocument::from_state(&demo.store.state());
    println!("{}", document.to_ron()?);
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("patchbay_graph=debug,patchbay_playground=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting patchbay playground v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Playground failed: {e}");
        std::process::exit(1);
    }
}
