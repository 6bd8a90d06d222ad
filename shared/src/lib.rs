//! Sensor telemetry wire types
//!
//! This crate provides the record type and codec shared by the listener
//! that receives sensor telemetry and the emitter that sends it.

pub mod codec;
pub mod record;

// Re-export commonly used types at crate root
pub use codec::{decode, decode_all, CodecError, RecordDecoder, RecordEncoder, Records};
pub use record::{ByteOrder, SensorRecord, RECORD_SIZE};

/// Reference network parameters of the deployed system
pub mod defaults {
    /// Address the listener binds to
    pub const LISTEN_ADDRESS: &str = "192.168.1.112";

    /// TCP port the listener binds to
    pub const LISTEN_PORT: u16 = 1010;

    /// Maximum bytes taken from the socket per read
    pub const READ_CHUNK_SIZE: usize = 1024;
}
