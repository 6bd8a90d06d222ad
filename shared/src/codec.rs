//! Fixed-width record codec for TCP streams
//!
//! Records are concatenated back to back with no framing:
//! ```text
//! [ 12 bytes: record ][ 12 bytes: record ] ... [ < 12 bytes: tail ]
//! ```
//!
//! A buffer of `n` bytes holds `n / 12` whole records. The tail is never an
//! error: the stateless [`decode`] ignores it, the streaming [`RecordDecoder`]
//! keeps it until more bytes arrive.

use std::iter::FusedIterator;
use std::slice::ChunksExact;

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

use crate::record::{ByteOrder, SensorRecord, RECORD_SIZE};

/// Size of the sender's transmission buffer on the original firmware
pub const TRANSMISSION_BUFFER_SIZE: usize = 1500;

/// Errors that can occur while building or configuring the codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder buffer full: {len} bytes used, limit is {limit}")]
    BufferFull { len: usize, limit: usize },

    #[error("Unknown byte order: {0:?} (expected native, little or big)")]
    UnknownByteOrder(String),
}

/// Lazy iterator over the whole records of a buffer
#[derive(Debug, Clone)]
pub struct Records<'a> {
    chunks: ChunksExact<'a, u8>,
    order: ByteOrder,
}

impl<'a> Records<'a> {
    /// Trailing bytes that do not form a whole record
    pub fn remainder(&self) -> &'a [u8] {
        self.chunks.remainder()
    }
}

impl Iterator for Records<'_> {
    type Item = SensorRecord;

    fn next(&mut self) -> Option<SensorRecord> {
        let chunk = self.chunks.next()?;
        SensorRecord::read(chunk, self.order)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Records<'_> {}

impl FusedIterator for Records<'_> {}

/// Decode every whole record of `buf`, in order, starting at offset 0
pub fn decode(buf: &[u8], order: ByteOrder) -> Records<'_> {
    Records {
        chunks: buf.chunks_exact(RECORD_SIZE),
        order,
    }
}

/// Eager form of [`decode`]
pub fn decode_all(buf: &[u8], order: ByteOrder) -> Vec<SensorRecord> {
    decode(buf, order).collect()
}

/// Streaming decoder that keeps a partial record between reads
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buffer: BytesMut,
    order: ByteOrder,
}

impl RecordDecoder {
    /// Create a new record decoder
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            order,
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decode the next whole record, consuming its bytes.
    ///
    /// Call this repeatedly until it returns `None` to drain all complete records
    pub fn decode_next(&mut self) -> Option<SensorRecord> {
        let record = SensorRecord::read(&self.buffer, self.order)?;
        self.buffer.advance(RECORD_SIZE);
        Some(record)
    }

    /// Bytes waiting for the rest of their record
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop the pending partial record, returning how many bytes were discarded
    pub fn clear(&mut self) -> usize {
        let pending = self.buffer.len();
        self.buffer.clear();
        pending
    }
}

/// Encoder for building a batch of records into one payload
#[derive(Debug, Default)]
pub struct RecordEncoder {
    buffer: BytesMut,
    order: ByteOrder,
    limit: Option<usize>,
}

impl RecordEncoder {
    /// Create an unbounded encoder
    pub fn new(order: ByteOrder) -> Self {
        Self {
            buffer: BytesMut::with_capacity(TRANSMISSION_BUFFER_SIZE),
            order,
            limit: None,
        }
    }

    /// Create an encoder that refuses to grow past `limit` bytes
    pub fn with_limit(order: ByteOrder, limit: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(limit),
            order,
            limit: Some(limit),
        }
    }

    /// Append a record to the output buffer
    pub fn encode(&mut self, record: &SensorRecord) -> Result<(), CodecError> {
        if let Some(limit) = self.limit {
            if self.buffer.len() + RECORD_SIZE > limit {
                return Err(CodecError::BufferFull {
                    len: self.buffer.len(),
                    limit,
                });
            }
        }
        record.encode_into(&mut self.buffer, self.order);
        Ok(())
    }

    /// Number of encoded bytes pending
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Take the encoded bytes, leaving an empty buffer
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Check if the encoder has any pending data
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
