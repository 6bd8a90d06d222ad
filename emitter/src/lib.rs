//! Sending side of the sensor telemetry link
//!
//! Readings pass a change filter, wait in a small bounded queue and leave as
//! one TCP payload of concatenated records.

pub mod idle;
pub mod queue;
pub mod tolerance;
pub mod transmit;

pub use idle::IdleTimer;
pub use queue::{FlushReason, Offer, TransmissionQueue, QUEUE_CAPACITY};
pub use tolerance::{Change, Tolerance};
pub use transmit::{transmit, Emitter};

use sensor_shared::SensorRecord;

/// Parse a record written as `DEVICE:TYPE:VALUE`, e.g. `7:2:23.5`
pub fn parse_record(s: &str) -> Result<SensorRecord, String> {
    let mut parts = s.split(':');
    let (Some(device), Some(kind), Some(value), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected DEVICE:TYPE:VALUE, got {:?}", s));
    };

    let device_id = device
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid device id {:?}: {}", device, e))?;
    let measurement_type = kind
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid measurement type {:?}: {}", kind, e))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid value {:?}: {}", value, e))?;

    Ok(SensorRecord::new(device_id, measurement_type, value))
}
