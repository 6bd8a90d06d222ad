//! Sends batches of records to a listener

use anyhow::{Context, Result};
use sensor_shared::{codec::TRANSMISSION_BUFFER_SIZE, ByteOrder, RecordEncoder, SensorRecord};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::queue::{Offer, TransmissionQueue};

/// Connect, write `records` as a single payload and close the write side.
///
/// Returns the number of bytes sent.
pub async fn transmit(server: &str, records: &[SensorRecord], order: ByteOrder) -> Result<usize> {
    let mut encoder = RecordEncoder::with_limit(order, TRANSMISSION_BUFFER_SIZE);
    for record in records {
        encoder.encode(record)?;
    }
    debug!("Encoded {} records into {} bytes", records.len(), encoder.len());
    let payload = encoder.take();

    let mut stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("Failed to connect to {}", server))?;
    stream.write_all(&payload).await?;
    stream.shutdown().await?;

    debug!("Sent payload to {}", server);
    Ok(payload.len())
}

/// Queue plus destination: readings go in, batches go out
#[derive(Debug)]
pub struct Emitter {
    server: String,
    order: ByteOrder,
    queue: TransmissionQueue,
}

impl Emitter {
    pub fn new(server: impl Into<String>, order: ByteOrder, queue: TransmissionQueue) -> Self {
        Self {
            server: server.into(),
            order,
            queue,
        }
    }

    /// Offer a reading and transmit right away when the queue asks for it
    pub async fn submit(&mut self, record: SensorRecord) -> Result<Offer> {
        let offer = self.queue.offer(record);
        match offer {
            Offer::Flush(reason) => {
                info!("Transmitting queue ({:?})", reason);
                self.flush().await?;
            }
            Offer::Dropped => warn!("Queue full, reading dropped: {}", record),
            Offer::Filtered | Offer::Queued => {}
        }
        Ok(offer)
    }

    /// Send whatever is queued. The queue is emptied even if sending fails.
    pub async fn flush(&mut self) -> Result<usize> {
        if self.queue.is_empty() {
            return Ok(0);
        }
        let batch = self.queue.drain();
        transmit(&self.server, &batch, self.order).await
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
