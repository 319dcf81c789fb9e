//! Liveness sweeper
//!
//! Proactively probes every registered channel so half-open connections are
//! evicted before an application-level send has to discover them.

use super::Dispatcher;
use crate::protocol::Envelope;
use crate::registry::Role;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Probes all registered connections and evicts the dead ones
pub struct LivenessSweeper {
    dispatcher: Arc<Dispatcher>,
}

impl LivenessSweeper {
    /// Create a sweeper over the given dispatcher
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Probe every connection in both identity spaces
    ///
    /// Uses the dispatcher's eviction rule, so a failed probe removes the
    /// entry exactly like a failed application send. Idempotent; sweeping an
    /// empty registry does nothing.
    pub async fn sweep(&self) {
        let probe = Envelope::ping();
        let mut probed = 0usize;
        let mut evicted = 0usize;

        for role in [Role::User, Role::Counselor] {
            for identifier in self.dispatcher.registry().identifiers(role) {
                probed += 1;
                if !self.dispatcher.dispatch_to(role, &identifier, &probe).await {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            tracing::info!(probed = probed, evicted = evicted, "Liveness sweep evicted dead connections");
        } else {
            tracing::debug!(probed = probed, "Liveness sweep complete");
        }
    }

    /// Spawn a background task sweeping on a fixed interval
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick fires immediately; skip it so startup isn't
            // followed by an instant sweep of an empty registry.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}

impl std::fmt::Debug for LivenessSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessSweeper").finish()
    }
}
