// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of mounted ports.
//!
//! Maps port keys to their role, owning node and a live rectangle provider.
//! The registry is mutated by mount/unmount code independently of the action
//! stream, so every lookup treats a missing key as a transient miss.
//!
//! Rectangle providers run with no registry lock held and may call back into
//! the registry.

use crate::error::{GraphError, Result};
use crate::node::NodeId;
use crate::port::{Port, PortKey, Role};
use egui::{Pos2, Rect};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Supplies the current screen rectangle of a port
pub trait RectProvider: Send + Sync {
    /// Current rectangle, `None` while the port cannot be measured
    fn rect(&self) -> Option<Rect>;
}

impl RectProvider for Rect {
    fn rect(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl<F> RectProvider for F
where
    F: Fn() -> Option<Rect> + Send + Sync,
{
    fn rect(&self) -> Option<Rect> {
        self()
    }
}

/// Read access to port metadata, used by the reducer and connection policies
pub trait PortLookup {
    /// Role of a registered port
    fn role(&self, key: &PortKey) -> Option<Role>;

    /// Node owning a registered port
    fn parent(&self, key: &PortKey) -> Option<NodeId>;

    /// Full port metadata
    fn port(&self, key: &PortKey) -> Option<Port> {
        Some(Port {
            key: key.clone(),
            role: self.role(key)?,
            parent: self.parent(key)?,
        })
    }
}

struct PortEntry {
    role: Role,
    parent: NodeId,
    rect: Arc<dyn RectProvider>,
}

impl fmt::Debug for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortEntry")
            .field("role", &self.role)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// Ports currently mounted in one graph instance
#[derive(Debug, Default)]
pub struct PortRegistry {
    ports: RwLock<HashMap<PortKey, PortEntry>>,
    /// Bumped whenever rendered port positions may have changed
    revision: AtomicU64,
}

impl PortRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port, replacing an existing entry with the same role.
    ///
    /// Registering a key that is live with a different role is a usage error.
    pub fn register(
        &self,
        key: impl Into<PortKey>,
        role: Role,
        parent: NodeId,
        rect: impl RectProvider + 'static,
    ) -> Result<()> {
        let key = key.into();
        let mut ports = self.ports.write();
        if let Some(existing) = ports.get(&key) {
            if existing.role != role {
                tracing::warn!(%key, existing = %existing.role, requested = %role, "conflicting port registration");
                return Err(GraphError::DuplicatePortKey {
                    key,
                    existing: existing.role,
                    requested: role,
                });
            }
        }
        ports.insert(
            key,
            PortEntry {
                role,
                parent,
                rect: Arc::new(rect),
            },
        );
        drop(ports);
        self.invalidate();
        Ok(())
    }

    /// Remove a port. Unknown keys are ignored.
    pub fn unregister(&self, key: &PortKey) -> bool {
        let removed = self.ports.write().remove(key).is_some();
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Replace the rectangle provider of a registered port
    pub fn set_rect(&self, key: &PortKey, rect: impl RectProvider + 'static) -> bool {
        let updated = match self.ports.write().get_mut(key) {
            Some(entry) => {
                entry.rect = Arc::new(rect);
                true
            }
            None => false,
        };
        if updated {
            self.invalidate();
        }
        updated
    }

    /// Current rectangle of a port, `None` if unknown or unmeasurable
    pub fn resolve_rect(&self, key: &PortKey) -> Option<Rect> {
        let provider = self.ports.read().get(key).map(|entry| Arc::clone(&entry.rect))?;
        provider.rect()
    }

    /// Center of the port's current rectangle
    pub fn resolve_center(&self, key: &PortKey) -> Option<Pos2> {
        self.resolve_rect(key).map(|rect| rect.center())
    }

    /// Check if a port is registered
    pub fn contains(&self, key: &PortKey) -> bool {
        self.ports.read().contains_key(key)
    }

    /// Keys of all ports owned by a node
    pub fn ports_of(&self, node: NodeId) -> Vec<PortKey> {
        self.ports
            .read()
            .iter()
            .filter(|(_, entry)| entry.parent == node)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of registered ports
    pub fn len(&self) -> usize {
        self.ports.read().len()
    }

    /// Check if no port is registered
    pub fn is_empty(&self) -> bool {
        self.ports.read().is_empty()
    }

    /// Signal that port positions may have changed (e.g. a node moved)
    pub fn invalidate(&self) {
        self.revision.fetch_add(1, Ordering::Relaxed);
    }

    /// Current revision, changes on every registration change or invalidation
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }
}

impl PortLookup for PortRegistry {
    fn role(&self, key: &PortKey) -> Option<Role> {
        self.ports.read().get(key).map(|entry| entry.role)
    }

    fn parent(&self, key: &PortKey) -> Option<NodeId> {
        self.ports.read().get(key).map(|entry| entry.parent)
    }
}
