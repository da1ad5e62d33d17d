//! Configuration for seriesdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Main configuration for a seriesdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── catalog.bin            (series catalog)
    ///     ├── current                (open generation index)
    ///     ├── current_values         (open generation value log)
    ///     ├── <oldest>-<newest>      (sealed generation index)
    ///     └── <oldest>-<newest>_values
    pub data_dir: PathBuf,

    /// Index size at which the open generation is sealed on the next commit
    pub max_generation_bytes: u64,

    /// Total size of all generations above which the oldest one is evicted
    pub max_total_disk_bytes: u64,

    // -------------------------------------------------------------------------
    // Commit Configuration
    // -------------------------------------------------------------------------
    /// Bytes written since the last commit that force an early commit
    pub commit_threshold_bytes: u64,

    /// Interval of the background commit timer
    pub commit_interval: Duration,

    // -------------------------------------------------------------------------
    // Ingestion Configuration
    // -------------------------------------------------------------------------
    /// What `add` does with a measurement whose type differs from the series' type
    pub type_mismatch_policy: TypeMismatchPolicy,
}

/// Handling of measurements that disagree with their series' registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMismatchPolicy {
    /// Discard the measurement and report success (logged at debug level)
    Drop,

    /// Discard the measurement and return `StoreError::TypeMismatch`
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./seriesdb_data"),
            max_generation_bytes: 10 * 1024 * 1024,   // 10 MB
            max_total_disk_bytes: 1024 * 1024 * 1024, // 1 GB
            commit_threshold_bytes: 12 * 1024,        // 12 KB
            commit_interval: Duration::from_secs(20),
            type_mismatch_policy: TypeMismatchPolicy::Drop,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the sizes and intervals describe a usable store
    pub fn validate(&self) -> Result<()> {
        if self.max_generation_bytes == 0 {
            return Err(StoreError::Config(
                "max_generation_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_total_disk_bytes < self.max_generation_bytes {
            return Err(StoreError::Config(format!(
                "max_total_disk_bytes ({}) is smaller than max_generation_bytes ({})",
                self.max_total_disk_bytes, self.max_generation_bytes
            )));
        }
        if self.commit_threshold_bytes == 0 {
            return Err(StoreError::Config(
                "commit_threshold_bytes must be greater than zero".to_string(),
            ));
        }
        if self.commit_interval.is_zero() {
            return Err(StoreError::Config(
                "commit_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the generation size bound (in bytes)
    pub fn max_generation_bytes(mut self, size: u64) -> Self {
        self.config.max_generation_bytes = size;
        self
    }

    /// Set the total disk bound (in bytes)
    pub fn max_total_disk_bytes(mut self, size: u64) -> Self {
        self.config.max_total_disk_bytes = size;
        self
    }

    /// Set the buffered-bytes threshold that forces a commit
    pub fn commit_threshold_bytes(mut self, size: u64) -> Self {
        self.config.commit_threshold_bytes = size;
        self
    }

    /// Set the background commit interval
    pub fn commit_interval(mut self, interval: Duration) -> Self {
        self.config.commit_interval = interval;
        self
    }

    /// Set the type mismatch policy
    pub fn type_mismatch_policy(mut self, policy: TypeMismatchPolicy) -> Self {
        self.config.type_mismatch_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
