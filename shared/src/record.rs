//! Sensor record and its fixed wire layout
//!
//! Every record travels as 12 packed bytes:
//! ```text
//! [ 4 bytes: device_id (i32) ][ 4 bytes: measurement_type (i32) ][ 4 bytes: value (f32) ]
//! ```
//!
//! There is no padding, no header and no length prefix. The byte order is
//! whatever the sender's CPU uses unless both ends agree on an explicit one.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::CodecError;

/// Width of one encoded record in bytes
pub const RECORD_SIZE: usize = 12;

/// Byte order of the three record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Order of the machine running this code
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Resolve `Native` to the concrete order of this platform
    pub fn resolve(self) -> ByteOrder {
        match self {
            ByteOrder::Native if cfg!(target_endian = "little") => ByteOrder::Little,
            ByteOrder::Native => ByteOrder::Big,
            other => other,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Native => write!(f, "native"),
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "ne" => Ok(ByteOrder::Native),
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(CodecError::UnknownByteOrder(other.to_string())),
        }
    }
}

/// One measurement reported by a device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    pub device_id: i32,
    pub measurement_type: i32,
    pub value: f32,
}

impl SensorRecord {
    pub fn new(device_id: i32, measurement_type: i32, value: f32) -> Self {
        Self {
            device_id,
            measurement_type,
            value,
        }
    }

    /// Decode a record from exactly one record width of bytes.
    ///
    /// Any bit pattern is accepted, including NaN and infinities.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE], order: ByteOrder) -> Self {
        let mut buf = &bytes[..];
        match order.resolve() {
            ByteOrder::Big => Self {
                device_id: buf.get_i32(),
                measurement_type: buf.get_i32(),
                value: buf.get_f32(),
            },
            _ => Self {
                device_id: buf.get_i32_le(),
                measurement_type: buf.get_i32_le(),
                value: buf.get_f32_le(),
            },
        }
    }

    /// Decode the first record of `buf`, or `None` if it is shorter than one record
    pub fn read(buf: &[u8], order: ByteOrder) -> Option<Self> {
        let bytes: &[u8; RECORD_SIZE] = buf.get(..RECORD_SIZE)?.try_into().ok()?;
        Some(Self::from_bytes(bytes, order))
    }

    /// Encode into a fixed 12-byte array
    pub fn to_bytes(&self, order: ByteOrder) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut buf = &mut out[..];
        self.put(&mut buf, order);
        out
    }

    /// Append the encoded record to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut, order: ByteOrder) {
        buf.reserve(RECORD_SIZE);
        self.put(buf, order);
    }

    fn put<B: BufMut>(&self, buf: &mut B, order: ByteOrder) {
        match order.resolve() {
            ByteOrder::Big => {
                buf.put_i32(self.device_id);
                buf.put_i32(self.measurement_type);
                buf.put_f32(self.value);
            }
            _ => {
                buf.put_i32_le(self.device_id);
                buf.put_i32_le(self.measurement_type);
                buf.put_f32_le(self.value);
            }
        }
    }

    /// Value rendered with two decimal digits, as shown on the console
    pub fn formatted_value(&self) -> String {
        // NaN prints lowercase and unsigned whatever its bit pattern
        if self.value.is_nan() {
            return "nan".to_string();
        }
        format!("{:.2}", self.value)
    }

    /// Field-wise equality that compares the float by bit pattern, so NaN equals itself
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        self.device_id == other.device_id
            && self.measurement_type == other.measurement_type
            && self.value.to_bits() == other.value.to_bits()
    }
}

impl fmt::Display for SensorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device={} type={} value={}",
            self.device_id,
            self.measurement_type,
            self.formatted_value()
        )
    }
}
