//! # seriesdb
//!
//! An embedded time-series measurement store with:
//! - Numerical, categorical and raw-bytes measurements, addressed by name
//! - Append-only generations bounded in size, oldest evicted first
//! - Time-range queries with name and granularity filtering
//! - A single worker serializing every add and read
//! - In-process fan-out of new measurements to subscribers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DiskStore (handle)                       │
//! │        add / measurements_in_range / commit / shutdown       │
//! └─────────────────────┬───────────────────────┬───────────────┘
//!                       │ requests              │ notify
//! ┌─────────────────────▼──────────────┐  ┌─────▼──────────────┐
//! │            Worker thread            │  │    Subscribers     │
//! │   (sole owner of the DiskWriter)    │  │ (FilterCollection) │
//! └──────┬──────────────┬───────────────┘  └────────────────────┘
//!        │              │
//!        ▼              ▼
//! ┌─────────────┐ ┌─────────────────────────────────┐
//! │   Catalog   │ │            Storage              │
//! │ (RwLock,    │ │ writer → current / _values      │
//! │  catalog.bin│ │ sealed <oldest>-<newest> pairs  │
//! └─────────────┘ │ reader ← codec (32 byte records)│
//!                 └─────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod measurement;
pub mod codec;
pub mod catalog;
pub mod storage;
pub mod filter;
pub mod subscriber;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{Config, TypeMismatchPolicy};
pub use filter::FilterDefinition;
pub use measurement::{Measurement, MeasurementType, SeriesInfo};
pub use store::{DiskStore, ReadResult};
pub use subscriber::Subscriber;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seriesdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
