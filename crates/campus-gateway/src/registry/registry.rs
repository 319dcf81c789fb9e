//! Connection registry
//!
//! Two disjoint identity spaces mapped with DashMap for concurrent access.
//! An identifier may exist in both spaces at once; a counselor typically also
//! holds a user channel elsewhere in the platform and the registry does not
//! reconcile the two.

use super::{Connection, Role};
use crate::protocol::Envelope;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Read-only snapshot of current connection counts
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub counselor_connections: usize,
    pub active_users: usize,
    /// Configured ceiling; reported but not enforced here
    pub total_capacity: usize,
}

/// Registry of all live connections
///
/// The maps are the only shared mutable state in the gateway core. Map
/// operations are the sole critical sections; send I/O always happens on a
/// cloned handle outside of them.
pub struct ConnectionRegistry {
    users: DashMap<String, Arc<Connection>>,
    counselors: DashMap<String, Arc<Connection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            counselors: DashMap::new(),
        }
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn space(&self, role: Role) -> &DashMap<String, Arc<Connection>> {
        match role {
            Role::User => &self.users,
            Role::Counselor => &self.counselors,
        }
    }

    /// Install a connection for `(role, identifier)`; last writer wins
    ///
    /// A superseded channel for the same identifier is explicitly closed so
    /// its writer task does not linger.
    pub fn register(
        &self,
        role: Role,
        identifier: impl Into<String>,
        sender: mpsc::Sender<Envelope>,
    ) -> Arc<Connection> {
        let identifier = identifier.into();
        let connection = Connection::new(identifier.clone(), role, sender);

        if let Some(previous) = self.space(role).insert(identifier.clone(), connection.clone()) {
            previous.close();
            tracing::debug!(
                role = %role,
                identifier = %identifier,
                "Replaced existing registration"
            );
        } else {
            tracing::debug!(role = %role, identifier = %identifier, "Connection registered");
        }

        connection
    }

    /// Remove and close the entry for `(role, identifier)`
    ///
    /// No-op when absent, so duplicate disconnect notifications are safe.
    pub fn unregister(&self, role: Role, identifier: &str) {
        if let Some((_, connection)) = self.space(role).remove(identifier) {
            connection.close();
            tracing::debug!(role = %role, identifier = %identifier, "Connection unregistered");
        }
    }

    /// Remove the entry only if it still holds the given connection
    ///
    /// A handler cleaning up after its socket must not evict a replacement
    /// registration that raced in for the same identifier.
    pub fn unregister_exact(&self, role: Role, identifier: &str, connection: &Arc<Connection>) {
        let removed = self
            .space(role)
            .remove_if(identifier, |_, current| Arc::ptr_eq(current, connection));

        if let Some((_, current)) = removed {
            current.close();
            tracing::debug!(role = %role, identifier = %identifier, "Connection unregistered");
        }
    }

    /// Look up a connection; never blocks on channel I/O
    pub fn lookup(&self, role: Role, identifier: &str) -> Option<Arc<Connection>> {
        self.space(role).get(identifier).map(|entry| entry.clone())
    }

    /// Number of live connections in an identity space
    pub fn count(&self, role: Role) -> usize {
        self.space(role).len()
    }

    /// Snapshot of all identifiers in an identity space
    ///
    /// Broadcasts iterate this snapshot rather than the live map, so eviction
    /// during the walk can neither skip nor double-visit entries.
    pub fn identifiers(&self, role: Role) -> Vec<String> {
        self.space(role)
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Read-only snapshot of connection counts for reporting
    pub fn stats(&self, total_capacity: usize) -> ConnectionStats {
        ConnectionStats {
            total_connections: self.users.len(),
            counselor_connections: self.counselors.len(),
            active_users: self.users.len(),
            total_capacity,
        }
    }

    /// Close every held channel and clear both identity spaces
    pub fn shutdown(&self) {
        let mut closed = 0usize;

        for entry in self.users.iter() {
            entry.close();
            closed += 1;
        }
        for entry in self.counselors.iter() {
            entry.close();
            closed += 1;
        }

        self.users.clear();
        self.counselors.clear();

        tracing::info!(closed = closed, "Connection registry shut down");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("users", &self.users.len())
            .field("counselors", &self.counselors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<Envelope>, mpsc::Receiver<Envelope>) {
        mpsc::channel(10)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();

        registry.register(Role::User, "alice", tx);
        assert_eq!(registry.count(Role::User), 1);
        assert_eq!(registry.count(Role::Counselor), 0);

        let conn = registry.lookup(Role::User, "alice").unwrap();
        assert_eq!(conn.identifier(), "alice");
        assert_eq!(conn.role(), Role::User);
    }

    #[test]
    fn test_reregistration_replaces_and_closes_previous() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let first = registry.register(Role::User, "alice", tx1);
        let second = registry.register(Role::User, "alice", tx2);

        // Count unchanged, lookup returns the most recent registration
        assert_eq!(registry.count(Role::User), 1);
        let current = registry.lookup(Role::User, "alice").unwrap();
        assert!(Arc::ptr_eq(&current, &second));

        // The superseded channel is closed, not leaked
        assert!(first.is_closed());
        assert!(!second.is_closed());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.unregister(Role::User, "nobody");
        assert_eq!(registry.count(Role::User), 0);
    }

    #[test]
    fn test_duplicate_unregister_is_safe() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        registry.register(Role::Counselor, "dr-lee", tx);

        registry.unregister(Role::Counselor, "dr-lee");
        registry.unregister(Role::Counselor, "dr-lee");
        assert!(registry.lookup(Role::Counselor, "dr-lee").is_none());
    }

    #[test]
    fn test_identity_spaces_are_disjoint() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        registry.register(Role::User, "jordan", tx1);
        registry.register(Role::Counselor, "jordan", tx2);

        assert_eq!(registry.count(Role::User), 1);
        assert_eq!(registry.count(Role::Counselor), 1);

        registry.unregister(Role::User, "jordan");
        assert!(registry.lookup(Role::User, "jordan").is_none());
        assert!(registry.lookup(Role::Counselor, "jordan").is_some());
    }

    #[test]
    fn test_unregister_exact_spares_replacement() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let stale = registry.register(Role::User, "alice", tx1);
        let replacement = registry.register(Role::User, "alice", tx2);

        // The stale handler's cleanup must not evict the new registration
        registry.unregister_exact(Role::User, "alice", &stale);
        let current = registry.lookup(Role::User, "alice").unwrap();
        assert!(Arc::ptr_eq(&current, &replacement));

        registry.unregister_exact(Role::User, "alice", &replacement);
        assert!(registry.lookup(Role::User, "alice").is_none());
    }

    #[test]
    fn test_stats_snapshot() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        registry.register(Role::User, "a", tx1);
        registry.register(Role::User, "b", tx2);
        registry.register(Role::Counselor, "c", tx3);

        let stats = registry.stats(1000);
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.counselor_connections, 1);
        assert_eq!(stats.total_capacity, 1000);
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let user = registry.register(Role::User, "a", tx1);
        let counselor = registry.register(Role::Counselor, "b", tx2);

        registry.shutdown();

        assert!(user.is_closed());
        assert!(counselor.is_closed());
        assert_eq!(registry.count(Role::User), 0);
        assert_eq!(registry.count(Role::Counselor), 0);
    }
}
