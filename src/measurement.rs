//! Measurement model
//!
//! Typed samples as callers see them. On disk every measurement becomes a
//! fixed-width `MeasurementRecord`; the series' type lives in the catalog.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of values a series holds
///
/// Discriminants start at 1 so that 0 never names a valid type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementType {
    /// Numbers that can be interpolated
    Numerical = 1,

    /// Strings from a small, repeating set (interned on disk)
    Categorical = 2,

    /// Arbitrary bytes, stored in the value log
    Raw = 3,
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeasurementType::Numerical => "numerical",
            MeasurementType::Categorical => "categorical",
            MeasurementType::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// A single measured value at a point in time
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Numerical { ts: i64, value: f64 },
    Categorical { ts: i64, value: String },
    Raw { ts: i64, value: Bytes },
}

impl Measurement {
    pub fn numerical(ts: i64, value: f64) -> Self {
        Measurement::Numerical { ts, value }
    }

    pub fn categorical(ts: i64, value: impl Into<String>) -> Self {
        Measurement::Categorical {
            ts,
            value: value.into(),
        }
    }

    pub fn raw(ts: i64, value: impl Into<Bytes>) -> Self {
        Measurement::Raw {
            ts,
            value: value.into(),
        }
    }

    /// Timestamp of the measurement
    pub fn timestamp(&self) -> i64 {
        match self {
            Measurement::Numerical { ts, .. }
            | Measurement::Categorical { ts, .. }
            | Measurement::Raw { ts, .. } => *ts,
        }
    }

    pub fn measurement_type(&self) -> MeasurementType {
        match self {
            Measurement::Numerical { .. } => MeasurementType::Numerical,
            Measurement::Categorical { .. } => MeasurementType::Categorical,
            Measurement::Raw { .. } => MeasurementType::Raw,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Numerical { ts, value } => write!(f, "{} {}", ts, value),
            Measurement::Categorical { ts, value } => write!(f, "{} {:?}", ts, value),
            Measurement::Raw { ts, value } => write!(f, "{} <{} bytes>", ts, value.len()),
        }
    }
}

/// Name and type of a stored series, for metadata listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub name: String,
    pub measurement_type: MeasurementType,
}
