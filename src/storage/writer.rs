//! Disk Writer
//!
//! Appends records to the open generation and seals, rotates and evicts
//! generations at commit time.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::codec::{Block, MeasurementRecord, RECORD_SIZE};
use crate::config::Config;
use crate::error::{Result, StoreError};

use super::generation::{
    generation_name, remove_generation, value_log_path, GenerationInfo, GenerationList,
};
use super::{CURRENT_INDEX_FILENAME, CURRENT_VALUES_FILENAME};

/// What a commit ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was written since the last commit
    Skipped,

    /// Both files were synced; the generation stays open
    Flushed,

    /// The generation was sealed, possibly evicting the oldest one
    Rotated {
        sealed: GenerationInfo,
        evicted: Option<GenerationInfo>,
    },
}

/// Buffered handles of the open generation
struct GenerationFiles {
    index: BufWriter<File>,
    values: BufWriter<File>,
}

impl GenerationFiles {
    fn open(dir: &Path) -> Result<Self> {
        let index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(CURRENT_INDEX_FILENAME))?;
        let values = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(CURRENT_VALUES_FILENAME))?;

        Ok(Self {
            index: BufWriter::new(index),
            values: BufWriter::new(values),
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.values.flush()?;
        self.index.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.values.get_ref().sync_data()?;
        self.index.get_ref().sync_data()?;
        Ok(())
    }
}

/// Owner of the open generation
///
/// Not thread-safe on purpose: exactly one worker owns it, which is what
/// keeps offsets, timestamps and file contents consistent.
pub struct DiskWriter {
    data_dir: PathBuf,

    /// `None` only after a failed rotation left the directory in an unknown state
    files: Option<GenerationFiles>,

    /// Next write position in the value log
    value_offset: u64,

    /// Size of the open index file, buffered bytes included
    index_len: u64,

    first_ts: Option<i64>,
    last_ts: Option<i64>,

    /// Bytes written since the last commit
    buffered_bytes: u64,

    max_generation_bytes: u64,
    max_total_disk_bytes: u64,
    commit_threshold_bytes: u64,

    /// Reused encode buffer
    scratch: BytesMut,
}

impl DiskWriter {
    /// Open the writer on `config.data_dir`
    ///
    /// An existing open generation is resumed: a torn trailing record is cut
    /// off and the timestamp range is restored from the surviving records.
    pub fn open(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let index_path = config.data_dir.join(CURRENT_INDEX_FILENAME);
        let (index_len, first_ts, last_ts) = Self::recover_open_generation(&index_path)?;

        let files = GenerationFiles::open(&config.data_dir)?;
        let value_offset = files.values.get_ref().metadata()?.len();

        if index_len > 0 {
            tracing::info!(
                "Resuming open generation: {} records, value log at {} bytes",
                index_len / RECORD_SIZE as u64,
                value_offset
            );
        }

        Ok(Self {
            data_dir: config.data_dir.clone(),
            files: Some(files),
            value_offset,
            index_len,
            first_ts,
            last_ts,
            buffered_bytes: 0,
            max_generation_bytes: config.max_generation_bytes,
            max_total_disk_bytes: config.max_total_disk_bytes,
            commit_threshold_bytes: config.commit_threshold_bytes,
            scratch: BytesMut::with_capacity(RECORD_SIZE),
        })
    }

    fn recover_open_generation(path: &Path) -> Result<(u64, Option<i64>, Option<i64>)> {
        if !path.exists() {
            return Ok((0, None, None));
        }

        let bytes = fs::read(path)?;
        let trailing = Block::trailing_bytes(bytes.len());
        let whole_len = (bytes.len() - trailing) as u64;

        if trailing > 0 {
            tracing::warn!(
                "Discarding {} bytes of a partially written record in {}",
                trailing,
                path.display()
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(whole_len)?;
            file.sync_all()?;
        }

        let block = Block::decode(&bytes);
        Ok((whole_len, block.oldest_timestamp(), block.newest_timestamp()))
    }

    /// Append a record, storing `payload` in the value log first
    ///
    /// With a payload, the record's `value` becomes the payload offset and
    /// `payload_size` its length. Returns the outcome of the commit that the
    /// append triggered, if any.
    pub fn append(
        &mut self,
        mut record: MeasurementRecord,
        payload: Option<&[u8]>,
    ) -> Result<Option<CommitOutcome>> {
        let files = self.files.as_mut().ok_or_else(closed_error)?;

        if let Some(payload) = payload {
            files.values.write_all(payload)?;
            record.value = self.value_offset as f64;
            record.payload_size = payload.len() as i64;
            self.value_offset += payload.len() as u64;
            self.buffered_bytes += payload.len() as u64;
        }

        self.scratch.clear();
        record.encode_into(&mut self.scratch);
        files.index.write_all(&self.scratch)?;

        self.first_ts.get_or_insert(record.timestamp);
        self.last_ts = Some(record.timestamp);
        self.index_len += RECORD_SIZE as u64;
        self.buffered_bytes += RECORD_SIZE as u64;

        if self.buffered_bytes > self.commit_threshold_bytes {
            return self.commit().map(Some);
        }
        Ok(None)
    }

    /// Make everything written so far durable; rotate and evict if due
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        if self.buffered_bytes == 0 {
            return Ok(CommitOutcome::Skipped);
        }

        self.files.as_mut().ok_or_else(closed_error)?.sync()?;
        let committed = self.buffered_bytes;
        self.buffered_bytes = 0;

        if self.index_len < self.max_generation_bytes {
            tracing::debug!(
                "Committed {} bytes, open generation at {} bytes",
                committed,
                self.index_len
            );
            return Ok(CommitOutcome::Flushed);
        }

        let sealed = self.rotate()?;
        let evicted = self.enforce_retention()?;
        Ok(CommitOutcome::Rotated { sealed, evicted })
    }

    /// Push buffered bytes to the OS so readers of the files see them
    pub fn flush(&mut self) -> Result<()> {
        self.files.as_mut().ok_or_else(closed_error)?.flush()
    }

    /// Seal the open generation under its timestamp range and open a new one
    fn rotate(&mut self) -> Result<GenerationInfo> {
        let (Some(oldest_ts), Some(newest_ts)) = (self.first_ts, self.last_ts) else {
            return Err(StoreError::Fatal(
                "open generation has data but no timestamp range".to_string(),
            ));
        };

        // Handles must be closed before the files move
        drop(self.files.take());

        let index_path = self.unused_generation_path(oldest_ts, newest_ts);
        let values_path = value_log_path(&index_path);
        fs::rename(self.data_dir.join(CURRENT_INDEX_FILENAME), &index_path)?;
        fs::rename(self.data_dir.join(CURRENT_VALUES_FILENAME), &values_path)?;

        let sealed = GenerationInfo {
            index_size: fs::metadata(&index_path)?.len(),
            values_size: fs::metadata(&values_path)?.len(),
            index_path,
            values_path,
            oldest_ts,
            newest_ts,
        };

        self.files = Some(GenerationFiles::open(&self.data_dir)?);
        self.value_offset = 0;
        self.index_len = 0;
        self.first_ts = None;
        self.last_ts = None;

        tracing::info!(
            "Sealed generation {} ({} bytes)",
            sealed.index_path.display(),
            sealed.size()
        );
        Ok(sealed)
    }

    /// Sealed name for the range, disambiguated if a generation already has it
    fn unused_generation_path(&self, oldest_ts: i64, newest_ts: i64) -> PathBuf {
        let name = generation_name(oldest_ts, newest_ts);
        let mut path = self.data_dir.join(&name);
        let mut n = 1u32;
        while path.exists() {
            path = self.data_dir.join(format!("{}-{}", name, n));
            n += 1;
        }
        path
    }

    /// Delete the oldest generation if the directory is over its bound
    ///
    /// At most one generation goes per commit, and the newest sealed one is
    /// always kept.
    fn enforce_retention(&self) -> Result<Option<GenerationInfo>> {
        let generations = GenerationList::scan(&self.data_dir)?;
        let total = generations.total_size();

        if total <= self.max_total_disk_bytes || generations.len() < 2 {
            return Ok(None);
        }

        let Some(oldest) = generations.oldest().cloned() else {
            return Ok(None);
        };
        remove_generation(&oldest)?;

        tracing::info!(
            "Evicted generation {} ({} bytes), {} of {} bytes in use before eviction",
            oldest.index_path.display(),
            oldest.size(),
            total,
            self.max_total_disk_bytes
        );
        Ok(Some(oldest))
    }

    /// The open generation, if it holds any records
    pub fn open_generation(&self) -> Option<GenerationInfo> {
        let (oldest_ts, newest_ts) = (self.first_ts?, self.last_ts?);
        Some(GenerationInfo {
            index_path: self.data_dir.join(CURRENT_INDEX_FILENAME),
            values_path: self.data_dir.join(CURRENT_VALUES_FILENAME),
            oldest_ts,
            newest_ts,
            index_size: self.index_len,
            values_size: self.value_offset,
        })
    }

    /// Final commit before the writer goes away
    pub fn close(mut self) -> Result<CommitOutcome> {
        let outcome = self.commit()?;
        if let Some(files) = self.files.as_mut() {
            files.flush()?;
        }
        Ok(outcome)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn index_len(&self) -> u64 {
        self.index_len
    }

    pub fn value_offset(&self) -> u64 {
        self.value_offset
    }

    pub fn buffered_bytes(&self) -> u64 {
        self.buffered_bytes
    }
}

fn closed_error() -> StoreError {
    StoreError::Fatal("generation files are closed after a failed rotation".to_string())
}
