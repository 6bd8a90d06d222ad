//! Bounded queue of readings waiting for transmission

use sensor_shared::SensorRecord;
use std::mem;

use crate::tolerance::{Change, Tolerance};

/// Number of readings held before a transmission is forced
pub const QUEUE_CAPACITY: usize = 5;

/// Why the queue wants to be sent now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Full,
    Critical,
}

/// Outcome of offering a reading to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Too close to the reference, not queued
    Filtered,
    /// Queued, nothing to send yet
    Queued,
    /// Queued, and the queue should be sent now
    Flush(FlushReason),
    /// Queue already full, reading discarded
    Dropped,
}

/// Readings accepted for the next transmission
#[derive(Debug)]
pub struct TransmissionQueue {
    records: Vec<SensorRecord>,
    capacity: usize,
    /// `None` queues every reading
    tolerance: Option<Tolerance>,
    reference: f32,
}

impl Default for TransmissionQueue {
    fn default() -> Self {
        Self::new(QUEUE_CAPACITY, Some(Tolerance::default()))
    }
}

impl TransmissionQueue {
    pub fn new(capacity: usize, tolerance: Option<Tolerance>) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            tolerance,
            reference: f32::INFINITY,
        }
    }

    /// Offer a reading; the answer tells the caller whether to transmit
    pub fn offer(&mut self, record: SensorRecord) -> Offer {
        let change = match self.tolerance {
            Some(tolerance) => tolerance.classify(record.value, self.reference),
            None => Change::Significant,
        };

        if change == Change::Stable {
            return Offer::Filtered;
        }
        self.reference = record.value;

        if self.records.len() >= self.capacity {
            return Offer::Dropped;
        }
        self.records.push(record);

        if change == Change::Critical {
            Offer::Flush(FlushReason::Critical)
        } else if self.records.len() == self.capacity {
            Offer::Flush(FlushReason::Full)
        } else {
            Offer::Queued
        }
    }

    /// Take every queued reading, oldest first
    pub fn drain(&mut self) -> Vec<SensorRecord> {
        mem::replace(&mut self.records, Vec::with_capacity(self.capacity))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value the next reading is compared against
    pub fn reference(&self) -> f32 {
        self.reference
    }
}
