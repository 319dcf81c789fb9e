//! Message dispatcher
//!
//! Routes envelopes to live connections. A failed or timed-out send evicts
//! the recipient and counts as not-delivered; it never surfaces as an error
//! and never aborts a broadcast. Callers cannot distinguish "offline" from
//! "channel just died" — both are "could not deliver now".

use crate::protocol::Envelope;
use crate::registry::{ConnectionRegistry, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Target population for a bulk notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetGroup {
    #[default]
    All,
    Counselors,
    AtRisk,
}

/// Routes delivery intents to zero or more registered connections
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Attempt one send to `(role, identifier)`
    ///
    /// Absent recipients are a normal offline outcome. A channel failure
    /// evicts the entry before reporting not-delivered.
    pub(crate) async fn dispatch_to(
        &self,
        role: Role,
        identifier: &str,
        envelope: &Envelope,
    ) -> bool {
        let Some(connection) = self.registry.lookup(role, identifier) else {
            return false;
        };

        match connection.send(envelope.clone(), self.send_timeout).await {
            Ok(()) => {
                tracing::trace!(
                    role = %role,
                    identifier = %identifier,
                    kind = %envelope.kind,
                    "Envelope delivered"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    role = %role,
                    identifier = %identifier,
                    kind = %envelope.kind,
                    error = %e,
                    "Send failed, evicting connection"
                );
                self.registry.unregister_exact(role, identifier, &connection);
                false
            }
        }
    }

    /// Send an envelope to one user
    ///
    /// Returns whether the envelope was delivered. An offline recipient is
    /// not an error; the caller decides whether that matters.
    pub async fn send_to_user(&self, identifier: &str, envelope: &Envelope) -> bool {
        self.dispatch_to(Role::User, identifier, envelope).await
    }

    /// Broadcast an envelope over an identity space
    ///
    /// Iterates a snapshot of identifiers taken before the first send, so
    /// evictions mid-broadcast cannot skip or double-visit entries.
    async fn broadcast(&self, role: Role, envelope: &Envelope) -> usize {
        let identifiers = self.registry.identifiers(role);
        let mut delivered = 0;

        for identifier in &identifiers {
            if self.dispatch_to(role, identifier, envelope).await {
                delivered += 1;
            }
        }

        tracing::debug!(
            role = %role,
            kind = %envelope.kind,
            targets = identifiers.len(),
            delivered = delivered,
            "Broadcast complete"
        );

        delivered
    }

    /// Send an envelope to every connected counselor
    pub async fn broadcast_to_counselors(&self, envelope: &Envelope) -> usize {
        self.broadcast(Role::Counselor, envelope).await
    }

    /// Send an envelope to every connected user
    pub async fn broadcast_to_all_users(&self, envelope: &Envelope) -> usize {
        self.broadcast(Role::User, envelope).await
    }

    /// Send an envelope to an explicit list of users
    ///
    /// Unknown or offline identifiers are silently skipped.
    pub async fn broadcast_to_group(&self, identifiers: &[String], envelope: &Envelope) -> usize {
        let mut delivered = 0;

        for identifier in identifiers {
            if self.dispatch_to(Role::User, identifier, envelope).await {
                delivered += 1;
            }
        }

        delivered
    }

    /// Send a bulk notification to the selected population
    ///
    /// Returns the number of successful deliveries.
    pub async fn send_bulk_notification(&self, message: &str, target: TargetGroup) -> usize {
        let envelope = Envelope::bulk_notification(message);

        match target {
            TargetGroup::All => self.broadcast_to_all_users(&envelope).await,
            TargetGroup::Counselors => self.broadcast_to_counselors(&envelope).await,
            TargetGroup::AtRisk => {
                // No at-risk selection exists yet; falls back to everyone.
                tracing::warn!("at_risk targeting not implemented, broadcasting to all users");
                self.broadcast_to_all_users(&envelope).await
            }
        }
    }

    /// Notify a user that an intervention was triggered for them
    pub async fn notify_intervention(&self, user_id: &str, intervention: Value) -> bool {
        self.send_to_user(user_id, &Envelope::intervention_triggered(intervention))
            .await
    }

    /// Notify a user about a new peer message
    pub async fn notify_peer_message(
        &self,
        recipient_id: &str,
        sender_name: &str,
        preview: &str,
    ) -> bool {
        self.send_to_user(recipient_id, &Envelope::new_peer_message(sender_name, preview))
            .await
    }

    /// Notify the members of a support group about activity
    pub async fn notify_group_activity(&self, members: &[String], activity: Value) -> usize {
        self.broadcast_to_group(members, &Envelope::group_activity(activity))
            .await
    }

    /// Send a wellness reminder to one user
    pub async fn send_wellness_reminder(
        &self,
        user_id: &str,
        reminder_type: &str,
        content: &str,
    ) -> bool {
        self.send_to_user(user_id, &Envelope::wellness_reminder(reminder_type, content))
            .await
    }

    /// Broadcast a crisis alert to every connected counselor
    pub async fn broadcast_crisis_alert(&self, alert: Value) -> usize {
        self.broadcast_to_counselors(&Envelope::crisis_alert(alert)).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventType;
    use tokio::sync::mpsc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ConnectionRegistry::new_shared(), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_send_to_user_delivers() {
        let dispatcher = dispatcher();
        let (tx, mut rx) = mpsc::channel(10);
        dispatcher.registry().register(Role::User, "alice", tx);

        let delivered = dispatcher
            .send_to_user("alice", &Envelope::wellness_reminder("sleep", "wind down"))
            .await;

        assert!(delivered);
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.kind, EventType::WellnessReminder);
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_not_an_error() {
        let dispatcher = dispatcher();
        let delivered = dispatcher
            .send_to_user("nonexistent", &Envelope::pong())
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_send_failure_evicts() {
        let dispatcher = dispatcher();
        let (tx, rx) = mpsc::channel(10);
        dispatcher.registry().register(Role::User, "alice", tx);
        drop(rx);

        let delivered = dispatcher.send_to_user("alice", &Envelope::pong()).await;

        assert!(!delivered);
        assert!(dispatcher.registry().lookup(Role::User, "alice").is_none());
        assert_eq!(dispatcher.registry().count(Role::User), 0);
    }

    #[tokio::test]
    async fn test_stalled_peer_times_out_and_evicts() {
        let registry = ConnectionRegistry::new_shared();
        let dispatcher = Dispatcher::new(registry.clone(), Duration::from_millis(20));

        // Buffer of one, never drained: the second send has nowhere to go
        let (tx, _rx) = mpsc::channel(1);
        registry.register(Role::User, "alice", tx);

        assert!(dispatcher.send_to_user("alice", &Envelope::pong()).await);
        assert!(!dispatcher.send_to_user("alice", &Envelope::pong()).await);
        assert_eq!(registry.count(Role::User), 0);
    }

    #[tokio::test]
    async fn test_broadcast_containment() {
        let dispatcher = dispatcher();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, rx2) = mpsc::channel(10);
        let (tx3, mut rx3) = mpsc::channel(10);

        dispatcher.registry().register(Role::Counselor, "c1", tx1);
        dispatcher.registry().register(Role::Counselor, "c2", tx2);
        dispatcher.registry().register(Role::Counselor, "c3", tx3);
        drop(rx2);

        let delivered = dispatcher
            .broadcast_to_counselors(&Envelope::crisis_alert(serde_json::json!({
                "severity": "high"
            })))
            .await;

        assert_eq!(delivered, 2);
        assert!(dispatcher.registry().lookup(Role::Counselor, "c2").is_none());
        assert_eq!(dispatcher.registry().count(Role::Counselor), 2);

        // Healthy channels each received the alert exactly once
        assert_eq!(rx1.recv().await.unwrap().kind, EventType::CrisisAlert);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx3.recv().await.unwrap().kind, EventType::CrisisAlert);
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_broadcast_skips_unknown_members() {
        let dispatcher = dispatcher();
        let (tx, mut rx) = mpsc::channel(10);
        dispatcher.registry().register(Role::User, "member", tx);

        let members = vec!["member".to_string(), "offline".to_string()];
        let delivered = dispatcher
            .notify_group_activity(&members, serde_json::json!({"event": "new_post"}))
            .await;

        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap().kind, EventType::GroupActivity);
    }

    #[tokio::test]
    async fn test_bulk_notification_to_counselors() {
        let dispatcher = dispatcher();
        let (tx1, mut rx1) = mpsc::channel(10);
        let (tx2, _rx2) = mpsc::channel(10);
        let (tx3, _rx3) = mpsc::channel(10);
        dispatcher.registry().register(Role::Counselor, "c1", tx1);
        dispatcher.registry().register(Role::Counselor, "c2", tx2);
        dispatcher.registry().register(Role::Counselor, "c3", tx3);

        let count = dispatcher
            .send_bulk_notification("take a break", TargetGroup::Counselors)
            .await;

        assert_eq!(count, 3);
        let envelope = rx1.recv().await.unwrap();
        assert_eq!(envelope.kind, EventType::BulkNotification);
        assert_eq!(envelope.data["message"], "take a break");
    }

    #[tokio::test]
    async fn test_at_risk_falls_back_to_all_users() {
        let dispatcher = dispatcher();
        let (tx_user, mut rx_user) = mpsc::channel(10);
        let (tx_counselor, mut rx_counselor) = mpsc::channel(10);
        dispatcher.registry().register(Role::User, "u1", tx_user);
        dispatcher
            .registry()
            .register(Role::Counselor, "c1", tx_counselor);

        let count = dispatcher
            .send_bulk_notification("check in with yourself", TargetGroup::AtRisk)
            .await;

        assert_eq!(count, 1);
        assert!(rx_user.try_recv().is_ok());
        assert!(rx_counselor.try_recv().is_err());
    }
}
