//! Message routing
//!
//! Turns logical delivery intents into attempted sends with per-recipient
//! failure isolation, plus the liveness sweeper that probes idle channels.

mod dispatcher;
mod sweeper;

pub use dispatcher::{Dispatcher, TargetGroup};
pub use sweeper::LivenessSweeper;
