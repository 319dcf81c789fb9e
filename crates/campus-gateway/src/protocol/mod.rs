//! Gateway protocol definitions
//!
//! Defines the outbound envelope format, event types, and inbound control
//! messages.

mod control;
mod envelope;

pub use control::ClientMessage;
pub use envelope::{Envelope, EventType};
