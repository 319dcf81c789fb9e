//! Connection registry
//!
//! Single source of truth for which users and counselors are currently
//! reachable, and over which channel.

mod connection;
mod registry;

pub use connection::{Connection, Role, SendError};
pub use registry::{ConnectionRegistry, ConnectionStats};
