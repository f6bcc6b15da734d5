//! Errors raised by the clustering engine.
//!
//! All of them abort the current run; there is no partial-result fallback.

use crate::model::{ClusterId, RecordId};
use thiserror::Error;

/// Broad category of a [`ClusterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input cannot be clustered at all.
    InvalidInput,
    /// The declared distinct-record bound was too small.
    Capacity,
    /// The union-find forest would lose its upward-only ordering.
    InternalConsistency,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("input has no data: the bigram index is empty")]
    EmptyIndex,

    #[error(
        "capacity exceeded: more than {capacity} distinct record ids referenced (first overflow at {record_id})"
    )]
    CapacityExceeded { capacity: usize, record_id: RecordId },

    #[error("capacity {capacity} is larger than the {max} records a run can address")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("cannot attach cluster {child} under older cluster {parent}")]
    InvertedUnion { child: ClusterId, parent: ClusterId },

    #[error("record {0} was compressed but never assigned a cluster")]
    UnassignedRecord(RecordId),
}

impl ClusterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::EmptyIndex => ErrorKind::InvalidInput,
            ClusterError::CapacityExceeded { .. } | ClusterError::CapacityTooLarge { .. } => {
                ErrorKind::Capacity
            }
            ClusterError::InvertedUnion { .. } | ClusterError::UnassignedRecord(_) => {
                ErrorKind::InternalConsistency
            }
        }
    }
}
