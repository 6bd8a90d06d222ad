//! Individual client session handling

use sensor_shared::RecordDecoder;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::{ListenerConfig, ReadPolicy};
use crate::shutdown::Shutdown;
use crate::sink::RecordSink;

/// Why a session stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its write side
    PeerClosed,
    /// Single-read policy: the one allowed read was done
    ReadOnce,
    /// Reading from the socket failed
    ReadFailed(io::ErrorKind),
    /// Shutdown was requested while waiting for data
    Shutdown,
}

/// What happened during one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub peer: SocketAddr,
    pub records: usize,
    pub bytes_read: usize,
    /// Trailing bytes that never completed a record
    pub dropped_bytes: usize,
    pub end: SessionEnd,
}

/// Active client session
pub struct Session<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    decoder: RecordDecoder,
    read_buf: Vec<u8>,
    policy: ReadPolicy,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a new session from an accepted stream
    pub fn new(stream: S, peer: SocketAddr, config: &ListenerConfig) -> Self {
        Self {
            stream,
            peer,
            decoder: RecordDecoder::new(config.byte_order),
            read_buf: vec![0u8; config.chunk_size],
            policy: config.read_policy,
        }
    }

    /// Read, decode and report until the session ends, then close the stream
    pub async fn run(mut self, sink: &dyn RecordSink, shutdown: &mut Shutdown) -> SessionSummary {
        let mut records = 0;
        let mut bytes_read = 0;

        let end = loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.requested() => None,
                read = self.stream.read(&mut self.read_buf) => Some(read),
            };

            let Some(read) = read else {
                break SessionEnd::Shutdown;
            };

            match read {
                Ok(0) => break SessionEnd::PeerClosed,
                Ok(n) => {
                    bytes_read += n;
                    self.decoder.extend(&self.read_buf[..n]);

                    // Process all complete records
                    while let Some(record) = self.decoder.decode_next() {
                        sink.report(self.peer, &record).await;
                        records += 1;
                    }

                    if self.policy == ReadPolicy::Single {
                        break SessionEnd::ReadOnce;
                    }
                }
                Err(e) => {
                    warn!("Read error from {}: {}", self.peer, e);
                    break SessionEnd::ReadFailed(e.kind());
                }
            }
        };

        let dropped_bytes = self.decoder.clear();
        if dropped_bytes > 0 {
            debug!(
                "Dropping {} trailing bytes from {} (incomplete record)",
                dropped_bytes, self.peer
            );
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!("Socket shutdown for {} failed: {}", self.peer, e);
        }

        SessionSummary {
            peer: self.peer,
            records,
            bytes_read,
            dropped_bytes,
            end,
        }
    }
}
