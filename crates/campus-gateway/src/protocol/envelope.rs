//! Outbound message envelope
//!
//! Every message the gateway delivers to a client follows this format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Maximum number of characters kept from a peer-message preview
const PREVIEW_MAX_CHARS: usize = 50;

/// Event types produced by the gateway
///
/// These are the values sent in the `type` field of an [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Self-guided intervention triggered for a user
    InterventionTriggered,
    /// High-severity alert routed to counselors
    CrisisAlert,
    /// New direct message from a peer
    NewPeerMessage,
    /// Activity within a support group
    GroupActivity,
    /// Scheduled wellness nudge
    WellnessReminder,
    /// Administrative broadcast
    BulkNotification,
    /// Liveness probe sent by the sweeper
    Ping,
    /// Reply to a client-initiated ping
    Pong,
}

impl EventType {
    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InterventionTriggered => "intervention_triggered",
            Self::CrisisAlert => "crisis_alert",
            Self::NewPeerMessage => "new_peer_message",
            Self::GroupActivity => "group_activity",
            Self::WellnessReminder => "wellness_reminder",
            Self::BulkNotification => "bulk_notification",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed, timestamped message unit delivered to a channel
///
/// Immutable once constructed; the dispatcher never mutates an envelope after
/// it has been handed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope with the current timestamp
    #[must_use]
    pub fn new(kind: EventType, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Intervention notification for a single user
    #[must_use]
    pub fn intervention_triggered(intervention: Value) -> Self {
        Self::new(EventType::InterventionTriggered, intervention)
    }

    /// Crisis alert for the counselor broadcast
    #[must_use]
    pub fn crisis_alert(alert: Value) -> Self {
        Self::new(EventType::CrisisAlert, alert)
    }

    /// Notification about a new peer message
    ///
    /// The preview is truncated to keep message content out of the
    /// notification channel.
    #[must_use]
    pub fn new_peer_message(sender_name: &str, preview: &str) -> Self {
        Self::new(
            EventType::NewPeerMessage,
            json!({
                "sender_name": sender_name,
                "preview": truncate_preview(preview),
            }),
        )
    }

    /// Support-group activity notification
    #[must_use]
    pub fn group_activity(activity: Value) -> Self {
        Self::new(EventType::GroupActivity, activity)
    }

    /// Wellness reminder for a single user
    #[must_use]
    pub fn wellness_reminder(reminder_type: &str, content: &str) -> Self {
        Self::new(
            EventType::WellnessReminder,
            json!({
                "reminder_type": reminder_type,
                "content": content,
            }),
        )
    }

    /// Administrative bulk notification
    #[must_use]
    pub fn bulk_notification(message: &str) -> Self {
        Self::new(EventType::BulkNotification, json!({ "message": message }))
    }

    /// Liveness probe
    #[must_use]
    pub fn ping() -> Self {
        Self::new(EventType::Ping, json!({}))
    }

    /// Reply to a client ping
    #[must_use]
    pub fn pong() -> Self {
        Self::new(EventType::Pong, json!({}))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn truncate_preview(preview: &str) -> String {
    if preview.chars().count() > PREVIEW_MAX_CHARS {
        let cut: String = preview.chars().take(PREVIEW_MAX_CHARS).collect();
        format!("{cut}...")
    } else {
        preview.to_string()
    }
}
