//! Registry of live connections.
//!
//! Guarded by a reader/writer lock: enumeration and counting share the lock,
//! registration and removal take it exclusively. The lock is never held
//! across an `.await`; fan-out works on a [`ConnectionRegistry::snapshot_excluding`]
//! copy taken under the read lock and released before any write.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_core::{ConnectionId, RegistryError};
use parking_lot::RwLock;

use super::connection::ClientConnection;

/// Live connections indexed by connection ID.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Fails if its ID is already present.
    pub fn register(&self, connection: Arc<ClientConnection>) -> Result<(), RegistryError> {
        let mut conns = self.connections.write();
        if conns.contains_key(&connection.id) {
            return Err(RegistryError::AlreadyRegistered(connection.id));
        }
        let _ = conns.insert(connection.id, connection);
        Ok(())
    }

    /// Remove a connection. Removing an absent ID is a no-op returning `None`.
    pub fn unregister(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.write().remove(id)
    }

    /// Point-in-time copy of every connection except `excluded`.
    pub fn snapshot_excluding(&self, excluded: &ConnectionId) -> Vec<Arc<ClientConnection>> {
        self.connections
            .read()
            .iter()
            .filter(|(id, _)| *id != excluded)
            .map(|(_, conn)| Arc::clone(conn))
            .collect()
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Number of live hub connections.
    pub fn hub_count(&self) -> usize {
        self.connections.read().keys().filter(|id| id.role().is_hub()).count()
    }
}
