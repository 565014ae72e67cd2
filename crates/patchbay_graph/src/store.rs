// SPDX-License-Identifier: MIT OR Apache-2.0
//! Single source of truth for one graph instance.
//!
//! All mutation goes through [`GraphStore::dispatch`]. Actions are applied one
//! at a time in arrival order. Dispatching from inside a listener does not
//! nest: the action is queued and applied by the outer dispatch once the
//! current action and all of its notifications are done.

use crate::action::{ConnectionEvent, GraphAction};
use crate::error::Result;
use crate::node::NodeId;
use crate::policy::{AllowAll, ConnectPolicy};
use crate::port::{PortKey, Role};
use crate::reducer::{reduce, Outcome};
use crate::registry::{PortRegistry, RectProvider};
use crate::state::GraphState;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`GraphStore::subscribe`] and [`GraphStore::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StateListener = Arc<dyn Fn(&Arc<GraphState>) + Send + Sync>;
type EventListener = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[derive(Default)]
struct Pending {
    actions: VecDeque<GraphAction>,
    draining: bool,
}

/// Ends a drain that is unwinding out of a panicking listener.
///
/// Actions queued by the failed drain are dropped along with it, so the next
/// dispatch starts from an empty queue.
struct DrainGuard<'a> {
    pending: &'a Mutex<Pending>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let mut pending = self.pending.lock();
        pending.draining = false;
        if !pending.actions.is_empty() {
            tracing::warn!(dropped = pending.actions.len(), "listener panicked, discarding deferred actions");
            pending.actions.clear();
        }
    }
}

/// Action-driven store of a [`GraphState`]
pub struct GraphStore {
    registry: Arc<PortRegistry>,
    policy: Box<dyn ConnectPolicy>,
    state: RwLock<Arc<GraphState>>,
    pending: Mutex<Pending>,
    state_listeners: Mutex<Vec<(SubscriptionId, StateListener)>>,
    event_listeners: Mutex<Vec<(SubscriptionId, EventListener)>>,
    next_subscription: AtomicU64,
}

impl GraphStore {
    /// Create a store that accepts every structurally valid connection
    pub fn new(registry: Arc<PortRegistry>) -> Self {
        Self::with_policy(registry, AllowAll)
    }

    /// Create a store with an application-specific connection policy
    pub fn with_policy(registry: Arc<PortRegistry>, policy: impl ConnectPolicy + 'static) -> Self {
        Self {
            registry,
            policy: Box::new(policy),
            state: RwLock::new(Arc::new(GraphState::new())),
            pending: Mutex::new(Pending::default()),
            state_listeners: Mutex::new(Vec::new()),
            event_listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Port registry shared with mount/unmount code
    pub fn registry(&self) -> &Arc<PortRegistry> {
        &self.registry
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<GraphState> {
        Arc::clone(&self.state.read())
    }

    /// Apply an action.
    ///
    /// Usage errors are returned to the caller. When called from a listener
    /// the action is deferred and this returns `Ok(())` immediately; a usage
    /// error raised by it later is logged.
    pub fn dispatch(&self, action: GraphAction) -> Result<()> {
        {
            let mut pending = self.pending.lock();
            if pending.draining {
                tracing::trace!(action = action.name(), "deferring re-entrant dispatch");
                pending.actions.push_back(action);
                return Ok(());
            }
            pending.draining = true;
        }
        let _guard = DrainGuard {
            pending: &self.pending,
        };

        let result = self.apply(&action);

        loop {
            let next = {
                let mut pending = self.pending.lock();
                match pending.actions.pop_front() {
                    Some(action) => action,
                    None => {
                        pending.draining = false;
                        break;
                    }
                }
            };
            if let Err(e) = self.apply(&next) {
                tracing::error!(action = next.name(), "deferred action failed: {e}");
            }
        }

        result
    }

    fn apply(&self, action: &GraphAction) -> Result<()> {
        let current = self.state();
        let outcome = reduce(&current, action, self.registry.as_ref(), self.policy.as_ref())?;

        match outcome {
            Outcome::Applied { state, events } => {
                tracing::trace!(action = action.name(), events = events.len(), "applied");
                let snapshot = Arc::new(state);
                *self.state.write() = Arc::clone(&snapshot);
                if matches!(action, GraphAction::MoveNode { .. }) {
                    self.registry.invalidate();
                }
                self.notify_events(&events);
                self.notify_state(&snapshot);
            }
            Outcome::Unchanged => {
                tracing::trace!(action = action.name(), "no-op");
            }
            Outcome::Rejected(rejection) => {
                tracing::debug!(action = action.name(), "rejected: {rejection}");
            }
        }
        Ok(())
    }

    fn notify_events(&self, events: &[ConnectionEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<EventListener> = self
            .event_listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for event in events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    fn notify_state(&self, snapshot: &Arc<GraphState>) {
        let listeners: Vec<StateListener> = self
            .state_listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in &listeners {
            listener(snapshot);
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed))
    }

    /// Receive every new snapshot, starting with the current one
    pub fn subscribe(&self, listener: impl Fn(&Arc<GraphState>) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        let listener: StateListener = Arc::new(listener);
        self.state_listeners.lock().push((id, Arc::clone(&listener)));
        listener(&self.state());
        id
    }

    /// Receive connection established/removed notifications
    pub fn observe(&self, listener: impl Fn(&ConnectionEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.event_listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.state_listeners.lock().retain(|(sid, _)| {
            let keep = *sid != id;
            removed |= !keep;
            keep
        });
        self.event_listeners.lock().retain(|(sid, _)| {
            let keep = *sid != id;
            removed |= !keep;
            keep
        });
        removed
    }

    /// Register a mounted port
    pub fn register_port(
        &self,
        key: impl Into<PortKey>,
        role: Role,
        parent: NodeId,
        rect: impl RectProvider + 'static,
    ) -> Result<()> {
        self.registry.register(key, role, parent, rect)
    }

    /// Unregister an unmounted port and drop every connection and drag touching it
    pub fn unregister_port(&self, key: &PortKey) -> Result<()> {
        self.registry.unregister(key);
        self.dispatch(GraphAction::RemovePort(key.clone()))
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("state", &self.state.read())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
