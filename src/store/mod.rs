//! Disk Store Module
//!
//! The public entry point: one serialized timeline of adds and reads over
//! the on-disk generations.
//!
//! ## Concurrency Model: Single Worker / Message Passing
//!
//! ```text
//!   caller ──┐                      ┌──────────────────────────┐
//!   caller ──┼── Request + reply ──▶│ worker thread            │
//!   caller ──┘   (crossbeam)        │  owns DiskWriter         │
//!        ▲                          │  add / read / commit     │
//!        └──────── reply ───────────│  tick → commit           │
//!                                   └────────────┬─────────────┘
//!                                                │
//!                               Arc<SeriesCatalog> (RwLock)
//! ```
//!
//! - The worker is the only code that touches file handles, offsets and
//!   timestamp trackers; no locks guard them
//! - Callers block until their request has been handled
//! - The catalog is shared and synchronizes itself

mod request;
mod worker;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::catalog::{SeriesCatalog, CATALOG_FILENAME};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::filter::FilterDefinition;
use crate::measurement::{Measurement, SeriesInfo};
use crate::storage::{CommitOutcome, DiskWriter};
use crate::subscriber::{Subscriber, SubscriberSet};

use request::{AddOutcome, Request};
use worker::Worker;

/// Measurements of a range query, grouped by series name
pub type ReadResult = HashMap<String, Vec<Measurement>>;

/// Persistent, size-bounded measurement store
pub struct DiskStore {
    config: Config,

    /// Queue into the worker
    requests: Sender<Request>,

    catalog: Arc<SeriesCatalog>,

    /// Notified after every stored add
    subscribers: SubscriberSet,

    /// Taken on shutdown
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DiskStore {
    const WORKER_NAME: &'static str = "seriesdb-disk-store";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Load (or create) the catalog
    /// 3. Resume the open generation
    /// 4. Start the worker
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let catalog = Arc::new(SeriesCatalog::open(
            &config.data_dir.join(CATALOG_FILENAME),
        )?);
        let writer = DiskWriter::open(&config)?;

        let (requests, receiver) = channel::unbounded();
        let worker = Worker::new(writer, Arc::clone(&catalog), &config);
        let handle = thread::Builder::new()
            .name(Self::WORKER_NAME.to_string())
            .spawn(move || worker.run(receiver))?;

        tracing::info!(
            "Disk store open at {} ({} series known)",
            config.data_dir.display(),
            catalog.len()
        );

        Ok(Self {
            config,
            requests,
            catalog,
            subscribers: SubscriberSet::new(),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Send a request and wait for the worker's answer
    fn call<T>(&self, make: impl FnOnce(Sender<Result<T>>) -> Request) -> Result<T> {
        let (reply, response) = channel::bounded(1);
        self.requests
            .send(make(reply))
            .map_err(|_| StoreError::WorkerStopped)?;
        response.recv().map_err(|_| StoreError::WorkerStopped)?
    }

    /// Store a measurement under `name`
    ///
    /// A measurement whose type differs from the series' registered type is
    /// dropped (`Ok`) or rejected (`TypeMismatch`) according to
    /// `Config::type_mismatch_policy`. Stored measurements are then handed to
    /// every subscriber.
    pub fn add(&self, name: &str, measurement: Measurement) -> Result<()> {
        let outcome = self.call(|reply| Request::Add {
            name: name.to_string(),
            measurement: measurement.clone(),
            reply,
        })?;

        if outcome == AddOutcome::Stored {
            self.subscribers.notify_all(name, &measurement);
        }
        Ok(())
    }

    /// All measurements with `start <= ts <= end` that pass `filter`
    ///
    /// Generations are read oldest to newest; within one generation the
    /// measurements keep their append order.
    ///
    /// A generation is only read when its newest timestamp is strictly after
    /// `start`. A point query `[t, t]` therefore misses a generation whose
    /// newest record is at `t`; widen `start` by one to include it.
    pub fn measurements_in_range(
        &self,
        start: i64,
        end: i64,
        filter: &FilterDefinition,
    ) -> Result<ReadResult> {
        self.call(|reply| Request::Read {
            start,
            end,
            filter: filter.clone(),
            reply,
        })
    }

    /// Commit now instead of waiting for the timer
    pub fn commit(&self) -> Result<CommitOutcome> {
        self.call(|reply| Request::Commit { reply })
    }

    /// Register a subscriber for newly stored measurements
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.add(subscriber);
    }

    /// Every stored series with its type, sorted by name
    pub fn all_series_info(&self) -> Vec<SeriesInfo> {
        self.catalog.all_series_info()
    }

    pub fn all_series_names(&self) -> Vec<String> {
        self.catalog.all_series_names()
    }

    /// Commit, stop the worker and wait for it
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };

        let result = self.call(|reply| Request::Shutdown { reply });

        if handle.join().is_err() {
            return Err(StoreError::Fatal("disk store worker panicked".to_string()));
        }

        result.map(|outcome| {
            tracing::info!("Disk store shut down ({:?})", outcome);
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Subscriber for DiskStore {
    fn notify(&self, name: &str, measurement: &Measurement) {
        if let Err(e) = self.add(name, measurement.clone()) {
            tracing::warn!("Failed to store measurement for '{}': {}", name, e);
        }
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Disk store shutdown on drop failed: {}", e);
        }
    }
}
