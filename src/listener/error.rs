//! Listener error types

use std::io;
use thiserror::Error;

/// Errors that stop the listener.
///
/// Read failures are not listed here: they only end the affected session.
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
