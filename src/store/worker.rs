//! Disk store worker
//!
//! The single thread that owns the `DiskWriter`. Adds, reads, commits and
//! shutdown are handled strictly one after another, in arrival order.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use crossbeam::select;

use crate::catalog::SeriesCatalog;
use crate::codec::MeasurementRecord;
use crate::config::{Config, TypeMismatchPolicy};
use crate::error::{Result, StoreError};
use crate::filter::{FilterCollection, FilterDefinition};
use crate::measurement::{Measurement, MeasurementType};
use crate::storage::{CommitOutcome, DiskWriter, GenerationInfo, GenerationList, GenerationReader};

use super::request::{AddOutcome, Request};
use super::ReadResult;

pub(crate) struct Worker {
    writer: DiskWriter,
    catalog: Arc<SeriesCatalog>,
    commit_interval: Duration,
    type_mismatch_policy: TypeMismatchPolicy,
}

impl Worker {
    pub(crate) fn new(writer: DiskWriter, catalog: Arc<SeriesCatalog>, config: &Config) -> Self {
        Self {
            writer,
            catalog,
            commit_interval: config.commit_interval,
            type_mismatch_policy: config.type_mismatch_policy,
        }
    }

    /// Serve requests until shutdown, disconnection or a fatal error
    pub(crate) fn run(mut self, requests: Receiver<Request>) {
        let ticker = channel::tick(self.commit_interval);

        loop {
            let flow = select! {
                recv(requests) -> request => match request {
                    Ok(request) => self.handle(request),
                    Err(_) => {
                        // Every handle is gone; nobody will ask for a shutdown
                        if let Err(e) = self.writer.commit() {
                            tracing::error!("Final commit failed: {}", e);
                        }
                        ControlFlow::Break(())
                    }
                },
                recv(ticker) -> _ => match self.writer.commit() {
                    Ok(outcome) => {
                        if outcome != CommitOutcome::Skipped {
                            tracing::trace!("Timed commit: {:?}", outcome);
                        }
                        ControlFlow::Continue(())
                    }
                    Err(e) => {
                        fatal(e);
                        ControlFlow::Break(())
                    }
                },
            };

            if flow.is_break() {
                break;
            }
        }

        tracing::debug!("Disk store worker stopped");
    }

    fn handle(&mut self, request: Request) -> ControlFlow<()> {
        match request {
            Request::Add {
                name,
                measurement,
                reply,
            } => {
                let result = self.handle_add(&name, &measurement);
                let flow = flow_after(&result);
                let _ = reply.send(result);
                flow
            }
            Request::Read {
                start,
                end,
                filter,
                reply,
            } => {
                let result = self.handle_read(start, end, filter);
                let flow = flow_after(&result);
                let _ = reply.send(result);
                flow
            }
            Request::Commit { reply } => {
                let result = self.writer.commit().map_err(fatal);
                let flow = flow_after(&result);
                let _ = reply.send(result);
                flow
            }
            Request::Shutdown { reply } => {
                let result = self
                    .writer
                    .commit()
                    .and_then(|outcome| self.writer.flush().map(|_| outcome))
                    .map_err(fatal);
                let _ = reply.send(result);
                ControlFlow::Break(())
            }
        }
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    fn handle_add(&mut self, name: &str, measurement: &Measurement) -> Result<AddOutcome> {
        let id = match self
            .catalog
            .get_or_create_id(name, measurement.measurement_type())
        {
            Ok(id) => id,
            Err(e @ StoreError::TypeMismatch { .. }) => {
                return match self.type_mismatch_policy {
                    TypeMismatchPolicy::Drop => {
                        tracing::debug!("Dropping measurement: {}", e);
                        Ok(AddOutcome::Dropped)
                    }
                    TypeMismatchPolicy::Reject => Err(e),
                };
            }
            Err(e) => return Err(fatal(e)),
        };

        let ts = measurement.timestamp();
        let (record, payload) = match measurement {
            Measurement::Numerical { value, .. } => (MeasurementRecord::new(id, ts, *value), None),
            Measurement::Categorical { value, .. } => {
                let interned = self.catalog.intern_categorical(id, value).map_err(fatal)?;
                (MeasurementRecord::new(id, ts, interned), None)
            }
            // Value and size are filled in by the writer
            Measurement::Raw { value, .. } => {
                (MeasurementRecord::new(id, ts, 0.0), Some(&value[..]))
            }
        };

        self.writer.append(record, payload).map_err(fatal)?;
        Ok(AddOutcome::Stored)
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    fn handle_read(&mut self, start: i64, end: i64, filter: FilterDefinition) -> Result<ReadResult> {
        // Buffered records must be visible to the file reads below
        self.writer.flush().map_err(fatal)?;

        let mut generations: Vec<GenerationInfo> = match GenerationList::scan(self.writer.data_dir())
        {
            Ok(list) => list
                .into_iter()
                .filter(|g| g.overlaps(start, end))
                .collect(),
            Err(e) => {
                tracing::warn!("Could not list generations, reading open generation only: {}", e);
                Vec::new()
            }
        };
        if let Some(open) = self.writer.open_generation() {
            if open.overlaps(start, end) {
                generations.push(open);
            }
        }

        let mut filter = FilterCollection::new(filter);
        let mut series = HashMap::new();
        let mut result = ReadResult::new();

        for generation in &generations {
            if let Err(e) =
                self.read_generation(generation, start, end, &mut filter, &mut series, &mut result)
            {
                tracing::warn!(
                    "Skipping unreadable generation {}: {}",
                    generation.index_path.display(),
                    e
                );
            }
        }

        tracing::debug!(
            "Range [{}, {}] read {} generations, {} series matched",
            start,
            end,
            generations.len(),
            result.len()
        );
        Ok(result)
    }

    fn read_generation(
        &self,
        generation: &GenerationInfo,
        start: i64,
        end: i64,
        filter: &mut FilterCollection,
        series: &mut HashMap<i64, Option<(String, MeasurementType)>>,
        result: &mut ReadResult,
    ) -> Result<()> {
        let mut reader = GenerationReader::open(generation)?;
        if reader.trailing_bytes() > 0 {
            tracing::warn!(
                "Generation {} ends in {} bytes of a partial record",
                generation.index_path.display(),
                reader.trailing_bytes()
            );
        }

        for i in 0..reader.block().len() {
            let record = reader.block().records()[i];
            if record.timestamp < start || record.timestamp > end {
                continue;
            }

            let resolved = series.entry(record.series_id).or_insert_with(|| {
                let name = self.catalog.name_for(record.series_id)?;
                let measurement_type = self.catalog.type_for(record.series_id)?;
                Some((name, measurement_type))
            });
            let Some((name, measurement_type)) = resolved.clone() else {
                tracing::trace!("Skipping record of unknown series {}", record.series_id);
                continue;
            };

            let measurement = match measurement_type {
                MeasurementType::Numerical => Measurement::numerical(record.timestamp, record.value),
                MeasurementType::Categorical => {
                    match self.catalog.categorical_value(record.series_id, record.value) {
                        Some(value) => Measurement::categorical(record.timestamp, value),
                        None => {
                            tracing::debug!(
                                "Skipping '{}' at {}: unknown categorical value {}",
                                name,
                                record.timestamp,
                                record.value
                            );
                            continue;
                        }
                    }
                }
                MeasurementType::Raw => match read_raw(&mut reader, &record) {
                    Ok(payload) => Measurement::raw(record.timestamp, payload),
                    Err(e) => {
                        tracing::warn!(
                            "Skipping '{}' at {}: value log read failed: {}",
                            name,
                            record.timestamp,
                            e
                        );
                        continue;
                    }
                },
            };

            if filter.passes(&name, &measurement) {
                result.entry(name).or_default().push(measurement);
            }
        }

        Ok(())
    }
}

fn read_raw(reader: &mut GenerationReader, record: &MeasurementRecord) -> Result<Vec<u8>> {
    if record.value < 0.0 || record.payload_size < 0 {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "invalid payload location: offset {}, size {}",
                record.value, record.payload_size
            ),
        )));
    }
    reader.read_payload(record.value as u64, record.payload_size as u64)
}

/// Log a writer or catalog failure and mark it fatal
fn fatal(err: StoreError) -> StoreError {
    tracing::error!("Unrecoverable storage failure, stopping disk store: {}", err);
    match err {
        StoreError::Fatal(_) => err,
        other => StoreError::Fatal(other.to_string()),
    }
}

fn flow_after<T>(result: &Result<T>) -> ControlFlow<()> {
    match result {
        Err(StoreError::Fatal(_)) => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    }
}
