//! Record Codec Module
//!
//! Fixed-width binary encoding of measurement records.
//!
//! ## Record Format (32 bytes, little-endian)
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────────┐
//! │ SeriesID (8) │Timestamp (8) │  Value (8)   │PayloadSize(8)│
//! │     i64      │     i64      │     f64      │     i64      │
//! └──────────────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! An index file is nothing but records back to back. There is no header,
//! version tag or compression; the layout is fixed for the lifetime of a
//! data directory.

mod block;
mod record;

pub use block::Block;
pub use record::MeasurementRecord;

/// Size of one encoded record in bytes
pub const RECORD_SIZE: usize = 32;
