//! Gateway state
//!
//! Shared dependencies for the gateway server. The registry and dispatcher
//! are constructed once at startup and passed by reference; there are no
//! process-wide globals.

use crate::dispatch::Dispatcher;
use crate::registry::ConnectionRegistry;
use campus_common::AppConfig;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<Dispatcher>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .finish()
    }
}
