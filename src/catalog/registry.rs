//! Series registry
//!
//! Thread-safe access to the catalog state with write-through persistence.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::measurement::{MeasurementType, SeriesInfo};

use super::{read_catalog_file, write_catalog_file, CatalogState};

/// Name/type/categorical catalog shared by the write and read paths
///
/// ## Concurrency:
/// - Lookups take the read lock only
/// - New mappings take the write lock, re-check, mutate and persist while
///   holding it, so two racing callers never allocate twice
/// - All methods use `&self`; share it through `Arc`
pub struct SeriesCatalog {
    /// Location of the catalog file
    path: PathBuf,

    state: RwLock<CatalogState>,
}

impl SeriesCatalog {
    /// Open the catalog at `path`
    ///
    /// A missing file starts a fresh catalog. A corrupt file is logged,
    /// replaced by a fresh catalog and overwritten.
    pub fn open(path: &Path) -> Result<Self> {
        let state = match read_catalog_file(path) {
            Ok(Some(state)) => {
                tracing::debug!(
                    "Loaded catalog from {} ({} series)",
                    path.display(),
                    state.name_to_id.len()
                );
                state
            }
            Ok(None) => {
                let state = CatalogState::new();
                write_catalog_file(path, &state)?;
                state
            }
            Err(StoreError::CatalogCorruption(reason)) => {
                tracing::warn!(
                    "Catalog at {} is corrupt ({}), starting with an empty catalog",
                    path.display(),
                    reason
                );
                let state = CatalogState::new();
                write_catalog_file(path, &state)?;
                state
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    /// Id of `name`, registering it with `measurement_type` if it is new
    ///
    /// Fails with `TypeMismatch` (and changes nothing) when the series exists
    /// with a different type.
    pub fn get_or_create_id(&self, name: &str, measurement_type: MeasurementType) -> Result<i64> {
        {
            let state = self.state.read();
            if let Some(&id) = state.name_to_id.get(name) {
                return Self::check_type(&state, name, id, measurement_type);
            }
        }

        let mut state = self.state.write();

        // Someone may have registered it between the two locks
        if let Some(&id) = state.name_to_id.get(name) {
            return Self::check_type(&state, name, id, measurement_type);
        }

        let id = state.highest_id + 1;
        state.highest_id = id;
        state.name_to_id.insert(name.to_string(), id);
        state.id_to_name.insert(id, name.to_string());
        state.id_to_type.insert(id, measurement_type);

        if let Err(e) = write_catalog_file(&self.path, &state) {
            state.name_to_id.remove(name);
            state.id_to_name.remove(&id);
            state.id_to_type.remove(&id);
            state.highest_id = id - 1;
            return Err(e);
        }

        tracing::debug!("Registered series '{}' as id {} ({})", name, id, measurement_type);
        Ok(id)
    }

    fn check_type(
        state: &CatalogState,
        name: &str,
        id: i64,
        provided: MeasurementType,
    ) -> Result<i64> {
        match state.id_to_type.get(&id) {
            Some(&stored) if stored != provided => Err(StoreError::TypeMismatch {
                name: name.to_string(),
                stored,
                provided,
            }),
            _ => Ok(id),
        }
    }

    pub fn name_for(&self, id: i64) -> Option<String> {
        self.state.read().id_to_name.get(&id).cloned()
    }

    pub fn type_for(&self, id: i64) -> Option<MeasurementType> {
        self.state.read().id_to_type.get(&id).copied()
    }

    /// Numeric stand-in for `value` within series `id`
    ///
    /// Only persists when a new mapping was created.
    pub fn intern_categorical(&self, id: i64, value: &str) -> Result<f64> {
        {
            let state = self.state.read();
            if let Some(&interned) = state
                .categorical
                .get(&id)
                .and_then(|table| table.value_to_id.get(value))
            {
                return Ok(interned as f64);
            }
        }

        let mut state = self.state.write();

        if let Some(&interned) = state
            .categorical
            .get(&id)
            .and_then(|table| table.value_to_id.get(value))
        {
            return Ok(interned as f64);
        }

        let interned = state.highest_categorical + 1;
        state.highest_categorical = interned;
        let table = state.categorical.entry(id).or_default();
        table.value_to_id.insert(value.to_string(), interned);
        table.id_to_value.insert(interned, value.to_string());

        if let Err(e) = write_catalog_file(&self.path, &state) {
            if let Some(table) = state.categorical.get_mut(&id) {
                table.value_to_id.remove(value);
                table.id_to_value.remove(&interned);
            }
            state.highest_categorical = interned - 1;
            return Err(e);
        }

        tracing::trace!("Interned '{}' for series {} as {}", value, id, interned);
        Ok(interned as f64)
    }

    /// String behind an interned categorical value
    pub fn categorical_value(&self, id: i64, interned: f64) -> Option<String> {
        if interned < 0.0 || interned.fract() != 0.0 {
            return None;
        }
        self.state
            .read()
            .categorical
            .get(&id)
            .and_then(|table| table.id_to_value.get(&(interned as u64)))
            .cloned()
    }

    /// Every registered series, sorted by name
    pub fn all_series_info(&self) -> Vec<SeriesInfo> {
        let state = self.state.read();
        let mut infos: Vec<SeriesInfo> = state
            .name_to_id
            .iter()
            .filter_map(|(name, id)| {
                state.id_to_type.get(id).map(|&measurement_type| SeriesInfo {
                    name: name.clone(),
                    measurement_type,
                })
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn all_series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().name_to_id.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered series
    pub fn len(&self) -> usize {
        self.state.read().name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the catalog file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
