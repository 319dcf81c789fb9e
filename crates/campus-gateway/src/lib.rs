//! # campus-gateway
//!
//! Real-time notification and session-broadcast gateway for the
//! MindfulCampus wellness platform.

pub mod dispatch;
pub mod protocol;
pub mod registry;
pub mod server;

pub use server::run;
