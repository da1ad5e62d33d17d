//! Tests for DiskStore
//!
//! These tests verify:
//! - Range queries over the open and sealed generations
//! - Numerical, categorical and raw round trips
//! - Type mismatch handling under both policies
//! - Filtering during a range query
//! - Damaged generations skipped without failing the query
//! - Negative timestamps across rotation
//! - Persistence across reopen
//! - Timed commits and shutdown behavior

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use seriesdb::codec::{Block, MeasurementRecord, RECORD_SIZE};
use seriesdb::storage::{CommitOutcome, GenerationInfo, GenerationList, CURRENT_INDEX_FILENAME};
use seriesdb::{
    Config, DiskStore, FilterDefinition, Measurement, MeasurementType, SeriesInfo, StoreError,
    TypeMismatchPolicy,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, DiskStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = DiskStore::open_path(temp_dir.path()).unwrap();
    (temp_dir, store)
}

/// "temp" at 1000, 1020, ..., 1080 with values 10..14
fn add_temperatures(store: &DiskStore) {
    for i in 0..5 {
        store
            .add("temp", Measurement::numerical(1000 + i * 20, 10.0 + i as f64))
            .unwrap();
    }
}

/// Store whose generations seal after two records
fn setup_small_generation_store() -> (TempDir, DiskStore) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_generation_bytes(2 * RECORD_SIZE as u64)
        .build();
    let store = DiskStore::open(config).unwrap();
    (temp_dir, store)
}

fn commit_sealed(store: &DiskStore) -> GenerationInfo {
    match store.commit().unwrap() {
        CommitOutcome::Rotated { sealed, .. } => sealed,
        other => panic!("expected rotation, got {:?}", other),
    }
}

fn append_to_file(path: &std::path::Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

fn count(store: &DiskStore, start: i64, end: i64, name: &str) -> usize {
    store
        .measurements_in_range(start, end, &FilterDefinition::all())
        .unwrap()
        .get(name)
        .map_or(0, Vec::len)
}

// =============================================================================
// Range Query Tests
// =============================================================================

#[test]
fn test_range_query_bounds() {
    let (_temp, store) = setup_temp_store();
    add_temperatures(&store);

    assert_eq!(count(&store, 1020, 1060, "temp"), 3);
    assert_eq!(count(&store, 500, 4000, "temp"), 5);
    assert_eq!(count(&store, 3000, 4000, "temp"), 0);
}

#[test]
fn test_range_query_values_in_order() {
    let (_temp, store) = setup_temp_store();
    add_temperatures(&store);

    let result = store
        .measurements_in_range(1020, 1060, &FilterDefinition::all())
        .unwrap();

    assert_eq!(
        result["temp"],
        vec![
            Measurement::numerical(1020, 11.0),
            Measurement::numerical(1040, 12.0),
            Measurement::numerical(1060, 13.0),
        ]
    );
}

#[test]
fn test_empty_store_returns_empty_result() {
    let (_temp, store) = setup_temp_store();

    let result = store
        .measurements_in_range(0, i64::MAX, &FilterDefinition::all())
        .unwrap();

    assert!(result.is_empty());
}

#[test]
fn test_range_query_spans_sealed_and_open_generations() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .max_generation_bytes(2 * RECORD_SIZE as u64)
        .build();
    let store = DiskStore::open(config).unwrap();

    add_temperatures(&store);
    let outcome = store.commit().unwrap();
    assert!(matches!(outcome, CommitOutcome::Rotated { .. }));

    store.add("temp", Measurement::numerical(1100, 15.0)).unwrap();
    store.add("temp", Measurement::numerical(1120, 16.0)).unwrap();

    assert_eq!(GenerationList::scan(temp.path()).unwrap().len(), 1);

    let result = store
        .measurements_in_range(500, 4000, &FilterDefinition::all())
        .unwrap();
    let timestamps: Vec<i64> = result["temp"].iter().map(Measurement::timestamp).collect();
    assert_eq!(timestamps, vec![1000, 1020, 1040, 1060, 1080, 1100, 1120]);
}

#[test]
fn test_point_query_needs_start_before_newest() {
    let (_temp, store) = setup_temp_store();
    store.add("temp", Measurement::numerical(1000, 1.0)).unwrap();

    // The open generation's newest timestamp equals the range start
    assert_eq!(count(&store, 1000, 1000, "temp"), 0);
    assert_eq!(count(&store, 999, 1000, "temp"), 1);
}

#[test]
fn test_negative_timestamps_survive_rotation() {
    let (temp, store) = setup_small_generation_store();

    store.add("t", Measurement::numerical(-300, 1.0)).unwrap();
    store.add("t", Measurement::numerical(-200, 2.0)).unwrap();
    assert_eq!(count(&store, -1000, 0, "t"), 2);

    let sealed = commit_sealed(&store);
    assert_eq!((sealed.oldest_ts, sealed.newest_ts), (-300, -200));
    assert_eq!(GenerationList::scan(temp.path()).unwrap().len(), 1);

    let result = store
        .measurements_in_range(-1000, 0, &FilterDefinition::all())
        .unwrap();
    assert_eq!(
        result["t"],
        vec![Measurement::numerical(-300, 1.0), Measurement::numerical(-200, 2.0)]
    );
}

// =============================================================================
// Damaged Generation Tests
// =============================================================================

#[test]
fn test_short_value_log_skips_only_unreadable_payloads() {
    let (_temp, store) = setup_small_generation_store();
    store.add("blob", Measurement::raw(10, &b"first"[..])).unwrap();
    store.add("blob", Measurement::raw(20, &b"second!"[..])).unwrap();
    let damaged = commit_sealed(&store);
    store.add("blob", Measurement::raw(30, &b"third"[..])).unwrap();
    store.add("blob", Measurement::raw(40, &b"fourth"[..])).unwrap();
    commit_sealed(&store);

    // Keeps "first" whole, cuts "second!" short
    OpenOptions::new()
        .write(true)
        .open(&damaged.values_path)
        .unwrap()
        .set_len(7)
        .unwrap();

    let result = store
        .measurements_in_range(0, 100, &FilterDefinition::all())
        .unwrap();

    assert_eq!(
        result["blob"],
        vec![
            Measurement::raw(10, &b"first"[..]),
            Measurement::raw(30, &b"third"[..]),
            Measurement::raw(40, &b"fourth"[..]),
        ]
    );
}

#[test]
fn test_missing_value_log_keeps_other_series() {
    let (_temp, store) = setup_small_generation_store();
    store.add("temp", Measurement::numerical(10, 1.0)).unwrap();
    store.add("blob", Measurement::raw(20, &b"lost"[..])).unwrap();
    let damaged = commit_sealed(&store);
    store.add("temp", Measurement::numerical(30, 3.0)).unwrap();
    store.add("blob", Measurement::raw(40, &b"kept"[..])).unwrap();
    commit_sealed(&store);

    fs::remove_file(&damaged.values_path).unwrap();

    let result = store
        .measurements_in_range(0, 100, &FilterDefinition::all())
        .unwrap();

    assert_eq!(
        result["temp"],
        vec![Measurement::numerical(10, 1.0), Measurement::numerical(30, 3.0)]
    );
    assert_eq!(result["blob"], vec![Measurement::raw(40, &b"kept"[..])]);
}

#[cfg(unix)]
#[test]
fn test_unreadable_generation_does_not_fail_query() {
    use std::os::unix::fs::PermissionsExt;

    let (_temp, store) = setup_small_generation_store();
    store.add("temp", Measurement::numerical(10, 1.0)).unwrap();
    store.add("temp", Measurement::numerical(20, 2.0)).unwrap();
    let locked = commit_sealed(&store);
    store.add("temp", Measurement::numerical(30, 3.0)).unwrap();
    store.add("temp", Measurement::numerical(40, 4.0)).unwrap();
    commit_sealed(&store);

    fs::set_permissions(&locked.index_path, fs::Permissions::from_mode(0o000)).unwrap();
    let result = store.measurements_in_range(0, 100, &FilterDefinition::all());
    fs::set_permissions(&locked.index_path, fs::Permissions::from_mode(0o644)).unwrap();

    // Privileged users can still read the locked file; either way the
    // readable generation comes back
    let timestamps: Vec<i64> = result.unwrap()["temp"]
        .iter()
        .map(Measurement::timestamp)
        .collect();
    assert!(timestamps == vec![30, 40] || timestamps == vec![10, 20, 30, 40]);
}

#[test]
fn test_unknown_series_id_is_ignored() {
    let (_temp, store) = setup_small_generation_store();
    store.add("temp", Measurement::numerical(1000, 1.0)).unwrap();
    store.add("temp", Measurement::numerical(1020, 2.0)).unwrap();
    let sealed = commit_sealed(&store);

    let stray = Block::from(vec![MeasurementRecord::new(999, 1010, 5.0)]).encode();
    append_to_file(&sealed.index_path, &stray);

    let result = store
        .measurements_in_range(0, 4000, &FilterDefinition::all())
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(
        result["temp"],
        vec![Measurement::numerical(1000, 1.0), Measurement::numerical(1020, 2.0)]
    );
}

#[test]
fn test_partial_record_in_sealed_generation() {
    let (_temp, store) = setup_small_generation_store();
    store.add("temp", Measurement::numerical(1000, 1.0)).unwrap();
    store.add("temp", Measurement::numerical(1020, 2.0)).unwrap();
    let sealed = commit_sealed(&store);

    append_to_file(&sealed.index_path, &[0xAB; 10]);

    assert_eq!(count(&store, 0, 4000, "temp"), 2);
}

// =============================================================================
// Measurement Type Tests
// =============================================================================

#[test]
fn test_raw_round_trip() {
    let (_temp, store) = setup_temp_store();
    let first: Vec<u8> = (0..=255u8).collect();
    let second = b"second payload".to_vec();

    store.add("blob", Measurement::raw(10, first.clone())).unwrap();
    store.add("blob", Measurement::raw(20, second.clone())).unwrap();
    store.add("blob", Measurement::raw(30, Vec::<u8>::new())).unwrap();

    let result = store
        .measurements_in_range(0, 100, &FilterDefinition::all())
        .unwrap();

    assert_eq!(
        result["blob"],
        vec![
            Measurement::raw(10, first),
            Measurement::raw(20, second),
            Measurement::raw(30, Vec::<u8>::new()),
        ]
    );
}

#[test]
fn test_categorical_round_trip() {
    let (_temp, store) = setup_temp_store();

    store.add("state", Measurement::categorical(1, "idle")).unwrap();
    store.add("state", Measurement::categorical(2, "busy")).unwrap();
    store.add("state", Measurement::categorical(3, "idle")).unwrap();

    let result = store
        .measurements_in_range(0, 10, &FilterDefinition::all())
        .unwrap();

    assert_eq!(
        result["state"],
        vec![
            Measurement::categorical(1, "idle"),
            Measurement::categorical(2, "busy"),
            Measurement::categorical(3, "idle"),
        ]
    );
}

#[test]
fn test_mixed_series() {
    let (_temp, store) = setup_temp_store();

    store.add("temp", Measurement::numerical(1, 20.5)).unwrap();
    store.add("state", Measurement::categorical(2, "on")).unwrap();
    store.add("blob", Measurement::raw(3, &b"xyz"[..])).unwrap();

    let result = store
        .measurements_in_range(0, 10, &FilterDefinition::all())
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result["temp"], vec![Measurement::numerical(1, 20.5)]);
    assert_eq!(result["state"], vec![Measurement::categorical(2, "on")]);
    assert_eq!(result["blob"], vec![Measurement::raw(3, &b"xyz"[..])]);
}

// =============================================================================
// Type Mismatch Tests
// =============================================================================

#[test]
fn test_type_mismatch_dropped_by_default() {
    let (_temp, store) = setup_temp_store();

    store.add("temp", Measurement::numerical(1, 1.0)).unwrap();
    store.add("temp", Measurement::categorical(2, "hot")).unwrap();

    let result = store
        .measurements_in_range(0, 10, &FilterDefinition::all())
        .unwrap();

    assert_eq!(result["temp"], vec![Measurement::numerical(1, 1.0)]);
}

#[test]
fn test_type_mismatch_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .type_mismatch_policy(TypeMismatchPolicy::Reject)
        .build();
    let store = DiskStore::open(config).unwrap();

    store.add("temp", Measurement::numerical(1, 1.0)).unwrap();
    let err = store
        .add("temp", Measurement::raw(2, &b"oops"[..]))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::TypeMismatch {
            stored: MeasurementType::Numerical,
            provided: MeasurementType::Raw,
            ..
        }
    ));

    // The store keeps working
    store.add("temp", Measurement::numerical(3, 3.0)).unwrap();
    assert_eq!(count(&store, 0, 10, "temp"), 2);
}

// =============================================================================
// Filter Tests
// =============================================================================

#[test]
fn test_query_with_name_filter() {
    let (_temp, store) = setup_temp_store();
    add_temperatures(&store);
    store.add("humidity", Measurement::numerical(1000, 40.0)).unwrap();

    let filter = FilterDefinition::all().with_names(["humidity"]);
    let result = store.measurements_in_range(0, 4000, &filter).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result["humidity"].len(), 1);
}

#[test]
fn test_query_with_granularity() {
    let (_temp, store) = setup_temp_store();
    for ms in 1..=4 {
        store
            .add("temp", Measurement::numerical(ms * 1_000_000, ms as f64))
            .unwrap();
    }

    let filter = FilterDefinition::all().with_granularity(Duration::from_millis(2));
    let result = store.measurements_in_range(0, i64::MAX, &filter).unwrap();

    let timestamps: Vec<i64> = result["temp"].iter().map(Measurement::timestamp).collect();
    assert_eq!(timestamps, vec![1_000_000, 3_000_000]);

    // Decimation state does not leak into the next query
    let again = store.measurements_in_range(0, i64::MAX, &filter).unwrap();
    assert_eq!(again["temp"].len(), 2);
}

// =============================================================================
// Catalog Access Tests
// =============================================================================

#[test]
fn test_all_series_info() {
    let (_temp, store) = setup_temp_store();
    store.add("b", Measurement::categorical(1, "x")).unwrap();
    store.add("a", Measurement::numerical(1, 1.0)).unwrap();

    assert_eq!(
        store.all_series_info(),
        vec![
            SeriesInfo {
                name: "a".to_string(),
                measurement_type: MeasurementType::Numerical,
            },
            SeriesInfo {
                name: "b".to_string(),
                measurement_type: MeasurementType::Categorical,
            },
        ]
    );
    assert_eq!(store.all_series_names(), vec!["a", "b"]);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_persistence_across_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = DiskStore::open_path(temp.path()).unwrap();
        add_temperatures(&store);
        store.add("state", Measurement::categorical(1000, "idle")).unwrap();
        store.add("blob", Measurement::raw(1000, &b"payload"[..])).unwrap();
        store.shutdown().unwrap();
    }

    let store = DiskStore::open_path(temp.path()).unwrap();
    let result = store
        .measurements_in_range(0, 4000, &FilterDefinition::all())
        .unwrap();

    assert_eq!(result["temp"].len(), 5);
    assert_eq!(result["state"], vec![Measurement::categorical(1000, "idle")]);
    assert_eq!(result["blob"], vec![Measurement::raw(1000, &b"payload"[..])]);

    // Reopened series keep their type
    store.add("temp", Measurement::numerical(2000, 1.0)).unwrap();
    assert_eq!(count(&store, 0, 4000, "temp"), 6);
}

#[test]
fn test_drop_commits() {
    let temp = TempDir::new().unwrap();
    {
        let store = DiskStore::open_path(temp.path()).unwrap();
        add_temperatures(&store);
    }

    let store = DiskStore::open_path(temp.path()).unwrap();
    assert_eq!(count(&store, 0, 4000, "temp"), 5);
}

#[test]
fn test_timed_commit() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .commit_interval(Duration::from_millis(20))
        .build();
    let store = DiskStore::open(config).unwrap();

    store.add("temp", Measurement::numerical(1, 1.0)).unwrap();
    thread::sleep(Duration::from_millis(300));

    let on_disk = fs::metadata(temp.path().join(CURRENT_INDEX_FILENAME))
        .unwrap()
        .len();
    assert_eq!(on_disk, RECORD_SIZE as u64);
    assert_eq!(store.commit().unwrap(), CommitOutcome::Skipped);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_invalid_config_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .max_generation_bytes(1024)
        .max_total_disk_bytes(512)
        .build();

    assert!(matches!(DiskStore::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_zero_commit_threshold_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .commit_threshold_bytes(0)
        .build();

    assert!(matches!(DiskStore::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_shutdown_is_idempotent() {
    let (_temp, store) = setup_temp_store();
    add_temperatures(&store);

    store.shutdown().unwrap();
    store.shutdown().unwrap();
}

#[test]
fn test_requests_after_shutdown_fail() {
    let (_temp, store) = setup_temp_store();
    store.shutdown().unwrap();

    assert!(matches!(
        store.add("temp", Measurement::numerical(1, 1.0)),
        Err(StoreError::WorkerStopped)
    ));
    assert!(matches!(
        store.measurements_in_range(0, 10, &FilterDefinition::all()),
        Err(StoreError::WorkerStopped)
    ));
}

#[test]
fn test_concurrent_adds() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let name = format!("series-{}", t);
                for i in 0..50 {
                    store.add(&name, Measurement::numerical(i, i as f64)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let result = store
        .measurements_in_range(0, 100, &FilterDefinition::all())
        .unwrap();
    assert_eq!(result.len(), 4);
    for measurements in result.values() {
        let timestamps: Vec<i64> = measurements.iter().map(Measurement::timestamp).collect();
        assert_eq!(timestamps, (0..50).collect::<Vec<_>>());
    }
}
