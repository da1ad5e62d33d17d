//! Series Catalog Module
//!
//! Durable metadata that turns on-disk records back into named, typed
//! measurements.
//!
//! ## Responsibilities
//! - Assign stable numeric ids to series names (first id is 1, 0 means unknown)
//! - Remember each series' measurement type and reject mismatches
//! - Intern categorical strings to small numbers (first value is 2)
//! - Persist everything as one file, rewritten on every new mapping
//!
//! ## File Format
//! ```text
//! ┌──────────┬───────────┬─────────┬─────────────┬──────────────────┐
//! │Magic (4) │Version (2)│ CRC (4) │ Length (8)  │ Payload (bincode)│
//! │  "SDBC"  │  u16 LE   │ u32 LE  │   u64 LE    │                  │
//! └──────────┴───────────┴─────────┴─────────────┴──────────────────┘
//! ```

mod file;
mod registry;

pub use file::{read_catalog_file, write_catalog_file};
pub use registry::SeriesCatalog;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::measurement::MeasurementType;

/// File name of the catalog inside the data directory
pub const CATALOG_FILENAME: &str = "catalog.bin";

/// Highest categorical value before the first allocation; 1 stays reserved
/// so an interned value is never confused with a default
const CATEGORICAL_RESERVED: u64 = 1;

// =============================================================================
// Persisted State
// =============================================================================

/// Everything the catalog persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    pub name_to_id: HashMap<String, i64>,
    pub id_to_name: HashMap<i64, String>,
    pub id_to_type: HashMap<i64, MeasurementType>,
    pub highest_id: i64,

    /// Per series id: string ↔ interned value
    pub categorical: HashMap<i64, CategoricalTable>,
    pub highest_categorical: u64,
}

impl CatalogState {
    pub fn new() -> Self {
        Self {
            name_to_id: HashMap::new(),
            id_to_name: HashMap::new(),
            id_to_type: HashMap::new(),
            highest_id: 0,
            categorical: HashMap::new(),
            highest_categorical: CATEGORICAL_RESERVED,
        }
    }
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bidirectional interning table of one categorical series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalTable {
    pub value_to_id: HashMap<String, u64>,
    pub id_to_value: HashMap<u64, String>,
}
