//! Campus Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p campus-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use campus_common::{try_init_tracing, AppConfig};
use std::process::exit;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            exit(1);
        }
    };

    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        capacity = config.connections.capacity,
        sweep_interval_secs = config.connections.sweep_interval_secs,
        "Campus gateway configured"
    );

    if let Err(e) = campus_gateway::run(config).await {
        error!(error = %e, "Gateway terminated with an error");
        exit(1);
    }
}
