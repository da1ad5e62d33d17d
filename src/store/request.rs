//! Worker requests
//!
//! Every request carries the channel its answer goes back on.

use crossbeam::channel::Sender;

use crate::error::Result;
use crate::filter::FilterDefinition;
use crate::measurement::Measurement;
use crate::storage::CommitOutcome;

use super::ReadResult;

pub(crate) enum Request {
    Add {
        name: String,
        measurement: Measurement,
        reply: Sender<Result<AddOutcome>>,
    },
    Read {
        start: i64,
        end: i64,
        filter: FilterDefinition,
        reply: Sender<Result<ReadResult>>,
    },
    Commit {
        reply: Sender<Result<CommitOutcome>>,
    },
    Shutdown {
        reply: Sender<Result<CommitOutcome>>,
    },
}

/// Whether an add reached the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    Stored,
    /// Type mismatch under the drop policy
    Dropped,
}
