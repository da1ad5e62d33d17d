//! Measurement record
//!
//! The disk-resident form of a single measurement.

use bytes::{Buf, BufMut, BytesMut};

use super::RECORD_SIZE;

/// One fixed-width entry of an index file
///
/// How `value` is read depends on the series' type:
/// - Numerical: the metric itself
/// - Categorical: the interned id of the string
/// - Raw: byte offset into the generation's value log, `payload_size` bytes long
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    /// Catalog id of the series (never 0)
    pub series_id: i64,
    pub timestamp: i64,
    pub value: f64,
    /// Length of the raw payload in the value log (0 for other types)
    pub payload_size: i64,
}

impl MeasurementRecord {
    pub fn new(series_id: i64, timestamp: i64, value: f64) -> Self {
        Self {
            series_id,
            timestamp,
            value,
            payload_size: 0,
        }
    }

    /// Append the encoded record to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.reserve(RECORD_SIZE);
        buf.put_i64_le(self.series_id);
        buf.put_i64_le(self.timestamp);
        buf.put_f64_le(self.value);
        buf.put_i64_le(self.payload_size);
    }

    /// Read one record from the front of `buf`
    ///
    /// Returns `None` if fewer than `RECORD_SIZE` bytes remain.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < RECORD_SIZE {
            return None;
        }
        Some(Self {
            series_id: buf.get_i64_le(),
            timestamp: buf.get_i64_le(),
            value: buf.get_f64_le(),
            payload_size: buf.get_i64_le(),
        })
    }
}
