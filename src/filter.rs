//! Filter Module
//!
//! Name allow-list and per-series timestamp decimation.
//!
//! The read path builds a fresh [`FilterCollection`] for every query; a live
//! subscriber keeps one collection for as long as it is subscribed.

use std::collections::HashMap;
use std::time::Duration;

use crate::measurement::Measurement;

/// Which measurements to forward, and how densely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDefinition {
    /// Allowed series names; empty allows every series
    pub names: Vec<String>,

    /// Minimum timestamp distance between two passing measurements of one series
    pub granularity: Duration,
}

impl FilterDefinition {
    /// A filter that lets everything through
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_granularity(mut self, granularity: Duration) -> Self {
        self.granularity = granularity;
        self
    }

    /// Check if `name` is on the allow-list
    pub fn allows_name(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.iter().any(|n| n == name)
    }
}

/// Stateful decimation of one series' timestamps
#[derive(Debug, Clone)]
pub struct TimestampFilter {
    granularity: i64,
    latest_passed: Option<i64>,
}

impl TimestampFilter {
    pub fn new(granularity: Duration) -> Self {
        Self {
            granularity: i64::try_from(granularity.as_nanos()).unwrap_or(i64::MAX),
            latest_passed: None,
        }
    }

    /// Does a measurement at `ts` pass? Passing moves the filter forward.
    pub fn passes(&mut self, ts: i64) -> bool {
        let passes = match self.latest_passed {
            None => true,
            Some(latest) => ts.saturating_sub(latest) >= self.granularity,
        };
        if passes {
            self.latest_passed = Some(ts);
        }
        passes
    }
}

/// Running filter state across all series
#[derive(Debug, Clone)]
pub struct FilterCollection {
    definition: FilterDefinition,
    per_name: HashMap<String, TimestampFilter>,
}

impl FilterCollection {
    pub fn new(definition: FilterDefinition) -> Self {
        Self {
            definition,
            per_name: HashMap::new(),
        }
    }

    pub fn definition(&self) -> &FilterDefinition {
        &self.definition
    }

    /// Check if the measurement passes, updating the series' state if it does
    pub fn passes(&mut self, name: &str, measurement: &Measurement) -> bool {
        if !self.definition.allows_name(name) {
            return false;
        }
        if self.definition.granularity.is_zero() {
            return true;
        }

        let granularity = self.definition.granularity;
        self.per_name
            .entry(name.to_string())
            .or_insert_with(|| TimestampFilter::new(granularity))
            .passes(measurement.timestamp())
    }
}
