//! Generation Reader
//!
//! Loads one generation's index and fetches raw payloads from its value log.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use crate::codec::Block;
use crate::error::Result;

use super::GenerationInfo;

/// Reader over a single generation
pub struct GenerationReader {
    /// All whole records of the index file
    block: Block,

    /// Bytes past the last whole record (a torn write)
    trailing_bytes: usize,

    /// Value log, opened on the first payload read
    values: Option<BufReader<File>>,

    generation: GenerationInfo,
}

impl GenerationReader {
    /// Read and decode the generation's index file
    pub fn open(generation: &GenerationInfo) -> Result<Self> {
        let bytes = fs::read(&generation.index_path)?;
        let trailing_bytes = Block::trailing_bytes(bytes.len());
        let block = Block::decode(&bytes);

        Ok(Self {
            block,
            trailing_bytes,
            values: None,
            generation: generation.clone(),
        })
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    pub fn generation(&self) -> &GenerationInfo {
        &self.generation
    }

    /// Read `size` bytes at `offset` from the value log
    ///
    /// A short read fails with `UnexpectedEof`.
    pub fn read_payload(&mut self, offset: u64, size: u64) -> Result<Vec<u8>> {
        // Checked before allocating so a corrupt size cannot ask for gigabytes
        let in_bounds = offset
            .checked_add(size)
            .is_some_and(|end| end <= self.generation.values_size);
        if !in_bounds {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "payload at {}+{} exceeds value log of {} bytes",
                    offset, size, self.generation.values_size
                ),
            )
            .into());
        }

        let len = usize::try_from(size).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("payload size {} does not fit in memory", size),
            )
        })?;

        let mut values = match self.values.take() {
            Some(values) => values,
            None => BufReader::new(File::open(&self.generation.values_path)?),
        };
        let result = Self::read_at(&mut values, offset, len);
        self.values = Some(values);
        result
    }

    fn read_at(values: &mut BufReader<File>, offset: u64, len: usize) -> Result<Vec<u8>> {
        values.seek(SeekFrom::Start(offset))?;
        let mut payload = vec![0u8; len];
        values.read_exact(&mut payload)?;
        Ok(payload)
    }
}
