//! Storage Module
//!
//! Append-only, size-bounded persistence of measurement records.
//!
//! ## Responsibilities
//! - Append records (and raw payloads) to the open generation
//! - Commit periodically; seal the generation once it is large enough
//! - Evict the oldest generation when the directory exceeds its bound
//! - Find and read the generations that cover a time range
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── current                  open index (records, 32 bytes each)
//!   ├── current_values           open value log (raw payloads)
//!   ├── 1000-1080                sealed index: <oldest ts>-<newest ts>
//!   ├── 1000-1080_values         its value log
//!   └── ...
//! ```
//!
//! A generation is one index + value log pair. Sealed generations never
//! overlap each other; the open one may overlap the newest sealed one.

mod generation;
mod reader;
mod writer;

pub use generation::{
    generation_name, parse_generation_name, remove_generation, value_log_path, GenerationInfo,
    GenerationList,
};
pub use reader::GenerationReader;
pub use writer::{CommitOutcome, DiskWriter};

/// Index file of the open generation
pub const CURRENT_INDEX_FILENAME: &str = "current";

/// Value log of the open generation
pub const CURRENT_VALUES_FILENAME: &str = "current_values";

/// Suffix that turns an index file name into its value log's name
pub const VALUE_LOG_SUFFIX: &str = "_values";
