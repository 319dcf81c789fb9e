//! Telemetry and tracing

mod tracing_setup;

pub use tracing_setup::{init_tracing, try_init_tracing, TracingConfig, TracingError};
