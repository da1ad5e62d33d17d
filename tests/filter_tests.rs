//! Tests for the filter engine
//!
//! These tests verify:
//! - Name allow-list
//! - Granularity-based decimation per series
//! - Independent state per series name

use std::time::Duration;

use seriesdb::filter::{FilterCollection, FilterDefinition, TimestampFilter};
use seriesdb::Measurement;

const MS: i64 = 1_000_000;

// =============================================================================
// Name Tests
// =============================================================================

#[test]
fn test_empty_names_allow_everything() {
    let definition = FilterDefinition::all();

    assert!(definition.allows_name("anything"));
    assert!(definition.allows_name(""));
}

#[test]
fn test_names_restrict_series() {
    let definition = FilterDefinition::all().with_names(["bla", "blup"]);

    assert!(definition.allows_name("bla"));
    assert!(definition.allows_name("blup"));
    assert!(!definition.allows_name("foo"));
}

#[test]
fn test_zero_granularity_passes_every_allowed_measurement() {
    let mut filter = FilterCollection::new(FilterDefinition::all().with_names(["a"]));

    for ts in [1, 1, 2, 3] {
        assert!(filter.passes("a", &Measurement::numerical(ts, 0.0)));
    }
    assert!(!filter.passes("b", &Measurement::numerical(4, 0.0)));
}

// =============================================================================
// Decimation Tests
// =============================================================================

#[test]
fn test_timestamp_filter_decimates() {
    let mut filter = TimestampFilter::new(Duration::from_millis(2));

    assert!(filter.passes(MS));
    assert!(!filter.passes(2 * MS));
    assert!(filter.passes(3 * MS));
    assert!(!filter.passes(4 * MS));
}

#[test]
fn test_collection_decimates_allowed_names_only() {
    let definition = FilterDefinition::all()
        .with_names(["bla", "blup"])
        .with_granularity(Duration::from_millis(2));
    let mut filter = FilterCollection::new(definition);

    assert!(!filter.passes("foo", &Measurement::numerical(MS, 1.0)));
    assert!(filter.passes("bla", &Measurement::numerical(MS, 1.0)));
    assert!(!filter.passes("bla", &Measurement::numerical(2 * MS, 1.0)));
    assert!(filter.passes("bla", &Measurement::numerical(3 * MS, 1.0)));
    assert!(!filter.passes("bla", &Measurement::numerical(4 * MS, 1.0)));
}

#[test]
fn test_first_measurement_passes_even_at_zero() {
    let mut filter = TimestampFilter::new(Duration::from_secs(1));

    assert!(filter.passes(0));
    assert!(!filter.passes(1));
}

#[test]
fn test_series_are_decimated_independently() {
    let definition = FilterDefinition::all().with_granularity(Duration::from_millis(2));
    let mut filter = FilterCollection::new(definition);

    assert!(filter.passes("a", &Measurement::numerical(MS, 1.0)));
    assert!(filter.passes("b", &Measurement::categorical(MS, "x")));
    assert!(!filter.passes("a", &Measurement::numerical(2 * MS, 1.0)));
    assert!(!filter.passes("b", &Measurement::categorical(2 * MS, "y")));
    assert!(filter.passes("b", &Measurement::raw(3 * MS, vec![1u8])));
}
