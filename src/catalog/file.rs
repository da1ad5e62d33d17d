//! Catalog file
//!
//! Checksummed, whole-file persistence of the catalog state.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::{Result, StoreError};

use super::CatalogState;

/// Magic bytes identifying a seriesdb catalog file
const MAGIC: &[u8; 4] = b"SDBC";

/// Current catalog format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + CRC (4) + Length (8) = 18 bytes
const HEADER_SIZE: usize = 18;

/// Write the catalog, replacing any previous file
///
/// The bytes go to a sibling temp file which is synced and then renamed over
/// `path`, so a crash leaves either the old or the new catalog.
pub fn write_catalog_file(path: &Path, state: &CatalogState) -> Result<()> {
    let payload = bincode::serialize(state)?;
    let crc = crc32fast::hash(&payload);

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&payload);

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    // Make the rename itself durable where the platform allows it
    if let Some(dir) = path.parent() {
        if let Err(e) = File::open(dir).and_then(|dir| dir.sync_all()) {
            tracing::debug!("Could not sync directory {}: {}", dir.display(), e);
        }
    }

    Ok(())
}

/// Read a catalog file
///
/// Returns:
/// - `Ok(Some(state))`: valid catalog
/// - `Ok(None)`: no file at `path`
/// - `Err(CatalogCorruption)`: the file exists but cannot be trusted
pub fn read_catalog_file(path: &Path) -> Result<Option<CatalogState>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::CatalogCorruption(format!(
            "file too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(StoreError::CatalogCorruption(format!(
            "invalid magic: expected SDBC, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(StoreError::CatalogCorruption(format!(
            "unsupported version: {}",
            version
        )));
    }

    let expected_crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[10..18]);
    let payload_len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != payload_len {
        return Err(StoreError::CatalogCorruption(format!(
            "payload length mismatch: header says {}, file holds {}",
            payload_len,
            payload.len()
        )));
    }

    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(StoreError::CatalogCorruption(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(payload)
        .map(Some)
        .map_err(|e| StoreError::CatalogCorruption(format!("undecodable payload: {}", e)))
}
