//! Listener configuration
//!
//! Built once at startup from command-line flags, with environment variables
//! as fallback, and immutable afterwards.

use clap::{Parser, ValueEnum};
use sensor_shared::{defaults, ByteOrder};
use std::fmt;

use crate::listener::ListenerError;

/// How many reads a session performs before closing the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReadPolicy {
    /// Read until the peer closes, carrying partial records between reads
    #[default]
    Stream,
    /// Read once, decode what arrived and close
    Single,
}

impl fmt::Display for ReadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPolicy::Stream => write!(f, "stream"),
            ReadPolicy::Single => write!(f, "single"),
        }
    }
}

/// Configuration for the listener
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Host or IP address to bind
    pub address: String,
    /// TCP port to bind (0 picks a free port)
    pub port: u16,
    /// Maximum bytes taken from the socket per read
    pub chunk_size: usize,
    pub read_policy: ReadPolicy,
    /// Byte order of incoming records
    pub byte_order: ByteOrder,
    /// Serve clients in parallel instead of one after another
    pub concurrent: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: defaults::LISTEN_ADDRESS.into(),
            port: defaults::LISTEN_PORT,
            chunk_size: defaults::READ_CHUNK_SIZE,
            read_policy: ReadPolicy::Stream,
            byte_order: ByteOrder::Native,
            concurrent: false,
        }
    }
}

impl ListenerConfig {
    /// Local listener on an ephemeral port
    pub fn loopback() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        }
    }

    /// `address:port` as shown in logs and errors
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.chunk_size == 0 {
            return Err(ListenerError::InvalidConfig(
                "chunk size must be at least 1 byte".into(),
            ));
        }
        if self.address.trim().is_empty() {
            return Err(ListenerError::InvalidConfig("bind address is empty".into()));
        }
        Ok(())
    }
}

/// Sensor telemetry listener
#[derive(Parser, Debug)]
#[command(name = "sensor-listener")]
#[command(version)]
#[command(about = "Receives fixed-width sensor records over TCP and prints them.", long_about = None)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "SENSOR_LISTEN_ADDR", default_value = defaults::LISTEN_ADDRESS)]
    address: String,

    /// Port to bind
    #[arg(short, long, env = "SENSOR_LISTEN_PORT", default_value_t = defaults::LISTEN_PORT)]
    port: u16,

    /// Maximum bytes read from a client at once
    #[arg(long, env = "SENSOR_CHUNK_SIZE", default_value_t = defaults::READ_CHUNK_SIZE)]
    chunk_size: usize,

    /// Keep reading until the client closes, or read a single chunk
    #[arg(long, env = "SENSOR_READ_POLICY", value_enum, default_value_t = ReadPolicy::Stream)]
    read_policy: ReadPolicy,

    /// Byte order of incoming records: native, little or big
    #[arg(long, env = "SENSOR_BYTE_ORDER", default_value_t = ByteOrder::Native)]
    byte_order: ByteOrder,

    /// Serve several clients at the same time
    #[arg(long, env = "SENSOR_CONCURRENT")]
    concurrent: bool,
}

impl Cli {
    pub fn into_config(self) -> ListenerConfig {
        ListenerConfig {
            address: self.address,
            port: self.port,
            chunk_size: self.chunk_size,
            read_policy: self.read_policy,
            byte_order: self.byte_order,
            concurrent: self.concurrent,
        }
    }
}
