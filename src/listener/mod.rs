//! TCP listener for sensor telemetry
//!
//! This module handles:
//! - Binding the server socket
//! - Accepting clients one at a time (or in parallel when configured)
//! - Reading each client's bytes and decoding them into records
//! - Handing every decoded record to a sink

mod error;
mod server;
mod session;

pub use error::ListenerError;
pub use server::Listener;
pub use session::{Session, SessionEnd, SessionSummary};
