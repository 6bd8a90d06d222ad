//! Destinations for decoded records

use async_trait::async_trait;
use sensor_shared::SensorRecord;
use std::io::Write;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Consumer of decoded records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Report one record received from `peer`
    async fn report(&self, peer: SocketAddr, record: &SensorRecord);
}

/// Render a record the way the console shows it
pub fn render(record: &SensorRecord) -> String {
    format!(
        "deviceId: {}\nmeasurementType: {}\nvalue: {}\n---\n",
        record.device_id,
        record.measurement_type,
        record.formatted_value()
    )
}

/// Prints every record to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordSink for ConsoleSink {
    async fn report(&self, _peer: SocketAddr, record: &SensorRecord) {
        // One write per record so parallel sessions do not interleave lines
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(render(record).as_bytes()) {
            warn!("Failed to print record: {}", e);
        }
    }
}

/// Forwards records to a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(SocketAddr, SensorRecord)>,
}

impl ChannelSink {
    /// Create a sink and the receiver that gets its records
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SocketAddr, SensorRecord)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl RecordSink for ChannelSink {
    async fn report(&self, peer: SocketAddr, record: &SensorRecord) {
        if self.tx.send((peer, *record)).is_err() {
            debug!("Record from {} dropped: receiver closed", peer);
        }
    }
}
