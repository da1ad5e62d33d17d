//! Block of records
//!
//! An append-only run of records and its byte-buffer form.

use bytes::{Bytes, BytesMut};

use super::{MeasurementRecord, RECORD_SIZE};

/// Ordered sequence of records, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    records: Vec<MeasurementRecord>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: MeasurementRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        self.records.len() * RECORD_SIZE
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeasurementRecord> {
        self.records.iter()
    }

    /// Timestamp of the first record
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.records.first().map(|r| r.timestamp)
    }

    /// Timestamp of the last record
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.records.last().map(|r| r.timestamp)
    }

    /// Encode all records back to back
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        for record in &self.records {
            record.encode_into(&mut buf);
        }
        buf.freeze()
    }

    /// Decode every whole record in `bytes`
    ///
    /// A trailing partial record is ignored; see [`Block::trailing_bytes`].
    pub fn decode(bytes: &[u8]) -> Self {
        let mut buf = bytes;
        let mut block = Self::with_capacity(bytes.len() / RECORD_SIZE);
        while let Some(record) = MeasurementRecord::decode(&mut buf) {
            block.push(record);
        }
        block
    }

    /// Number of bytes past the last whole record in a buffer of `len` bytes
    pub fn trailing_bytes(len: usize) -> usize {
        len % RECORD_SIZE
    }
}

impl From<Vec<MeasurementRecord>> for Block {
    fn from(records: Vec<MeasurementRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = &'a MeasurementRecord;
    type IntoIter = std::slice::Iter<'a, MeasurementRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
