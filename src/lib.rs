//! Sensor telemetry listener
//!
//! Accepts TCP clients, decodes the fixed-width sensor records they send and
//! hands each record to a [`sink::RecordSink`].

pub mod config;
pub mod listener;
pub mod shutdown;
pub mod sink;

pub use config::{Cli, ListenerConfig, ReadPolicy};
pub use listener::{Listener, ListenerError};
pub use sink::{ChannelSink, ConsoleSink, RecordSink};
