//! Generation index
//!
//! Discovers sealed generations on disk and answers time-range and size
//! questions about them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{CURRENT_INDEX_FILENAME, VALUE_LOG_SUFFIX};

/// One index file + value log pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInfo {
    pub index_path: PathBuf,
    pub values_path: PathBuf,
    /// Timestamp of the first record
    pub oldest_ts: i64,
    /// Timestamp of the last record
    pub newest_ts: i64,
    pub index_size: u64,
    pub values_size: u64,
}

impl GenerationInfo {
    /// Combined size of both files
    pub fn size(&self) -> u64 {
        self.index_size + self.values_size
    }

    /// Check if the generation may hold records in `[start, end]`
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.newest_ts > start && self.oldest_ts <= end
    }
}

/// Sealed generations, ordered oldest → newest by newest timestamp
#[derive(Debug, Clone, Default)]
pub struct GenerationList {
    generations: Vec<GenerationInfo>,
}

impl GenerationList {
    /// Walk `dir` and collect every sealed generation
    ///
    /// Value logs, the open generation, the catalog and anything else whose
    /// name is not `<oldest>-<newest>[-n]` are skipped.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut generations = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.ends_with(VALUE_LOG_SUFFIX) || name == CURRENT_INDEX_FILENAME {
                continue;
            }

            let Some((oldest_ts, newest_ts)) = parse_generation_name(&name) else {
                continue;
            };

            let values_path = value_log_path(&path);
            let values_size = match fs::metadata(&values_path) {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };

            generations.push(GenerationInfo {
                index_size: entry.metadata()?.len(),
                index_path: path,
                values_path,
                oldest_ts,
                newest_ts,
                values_size,
            });
        }

        generations.sort_by_key(|g| (g.newest_ts, g.oldest_ts));
        Ok(Self { generations })
    }

    /// Sum of index and value-log sizes
    pub fn total_size(&self) -> u64 {
        self.generations.iter().map(GenerationInfo::size).sum()
    }

    /// Generations overlapping `[start, end]`, oldest first
    pub fn in_range(&self, start: i64, end: i64) -> Vec<&GenerationInfo> {
        self.generations
            .iter()
            .filter(|g| g.overlaps(start, end))
            .collect()
    }

    pub fn oldest(&self) -> Option<&GenerationInfo> {
        self.generations.first()
    }

    pub fn newest(&self) -> Option<&GenerationInfo> {
        self.generations.last()
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GenerationInfo> {
        self.generations.iter()
    }
}

impl IntoIterator for GenerationList {
    type Item = GenerationInfo;
    type IntoIter = std::vec::IntoIter<GenerationInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.generations.into_iter()
    }
}

// =============================================================================
// File Naming
// =============================================================================

/// Sealed index file name for a timestamp range
pub fn generation_name(oldest_ts: i64, newest_ts: i64) -> String {
    format!("{}-{}", oldest_ts, newest_ts)
}

/// Parse "<oldest>-<newest>" or "<oldest>-<newest>-<n>"
/// "1000-1080" → Some((1000, 1080))
/// "-300--200" → Some((-300, -200))
///
/// Each timestamp may carry a leading `-`; the disambiguation suffix is
/// digits only.
pub fn parse_generation_name(name: &str) -> Option<(i64, i64)> {
    let (oldest, rest) = split_timestamp(name)?;
    let (newest, rest) = split_timestamp(rest.strip_prefix('-')?)?;
    if !rest.is_empty() {
        let suffix = rest.strip_prefix('-')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    Some((oldest, newest))
}

/// Leading signed timestamp of `s` and whatever follows it
fn split_timestamp(s: &str) -> Option<(i64, &str)> {
    let sign = usize::from(s.starts_with('-'));
    let digits = s[sign..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let end = sign + digits;
    Some((s[..end].parse().ok()?, &s[end..]))
}

/// Value log path belonging to an index path
pub fn value_log_path(index_path: &Path) -> PathBuf {
    let mut name = index_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(VALUE_LOG_SUFFIX);
    index_path.with_file_name(name)
}

/// Delete both files of a generation
///
/// A missing value log is not an error; older generations may never have
/// held raw payloads.
pub fn remove_generation(generation: &GenerationInfo) -> Result<()> {
    fs::remove_file(&generation.index_path)?;
    match fs::remove_file(&generation.values_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
