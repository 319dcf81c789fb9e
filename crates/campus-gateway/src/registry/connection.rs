//! Individual client connection
//!
//! A live, bidirectional channel to one remote peer. The registry entry
//! exclusively owns the connection; other components only borrow it for the
//! duration of a single send.

use crate::protocol::Envelope;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Identity space a connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Counselor,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Counselor => "counselor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel-level delivery failure
///
/// Never propagated past the dispatcher; converted there into eviction plus a
/// not-delivered outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("channel closed")]
    Closed,
    #[error("send timed out")]
    Timeout,
}

/// A single live client connection
pub struct Connection {
    /// Identifier within the connection's identity space
    identifier: String,

    /// Identity space this connection belongs to
    role: Role,

    /// Outbound channel to the socket writer task.
    ///
    /// Taken (dropped) on close so the writer task observes end-of-stream.
    /// The mutex guards only the clone of the sender; the send itself happens
    /// outside the lock.
    sender: Mutex<Option<mpsc::Sender<Envelope>>>,

    /// Registration time
    registered_at: Instant,
}

impl Connection {
    /// Create a new connection wrapped in Arc
    pub fn new(identifier: String, role: Role, sender: mpsc::Sender<Envelope>) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            role,
            sender: Mutex::new(Some(sender)),
            registered_at: Instant::now(),
        })
    }

    /// Get the identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the connection age
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }

    /// Send an envelope to this connection, bounded by `timeout`
    ///
    /// A stalled peer must not block the caller indefinitely; a timeout is
    /// reported as a failure just like a closed channel.
    pub async fn send(&self, envelope: Envelope, timeout: Duration) -> Result<(), SendError> {
        let sender = {
            let guard = self.sender.lock();
            match guard.as_ref() {
                Some(sender) => sender.clone(),
                None => return Err(SendError::Closed),
            }
        };

        match tokio::time::timeout(timeout, sender.send(envelope)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendError::Closed),
            Err(_) => Err(SendError::Timeout),
        }
    }

    /// Close the outbound channel
    ///
    /// Dropping the sender ends the socket writer task's receive loop.
    /// Idempotent; closing an already-closed connection is a no-op.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Check whether the channel can still accept messages
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .is_none_or(mpsc::Sender::is_closed)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("identifier", &self.identifier)
            .field("role", &self.role)
            .field("closed", &self.is_closed())
            .finish()
    }
}
