//! # Dense ID Compression
//!
//! Maps sparse 64-bit record ids onto `0..capacity` in first-seen order so the
//! clustering engine can keep its per-record state in flat arrays.

use crate::error::ClusterError;
use crate::model::{DenseIndex, RecordId};
use rustc_hash::FxHashMap;

/// Fixed-capacity interner from [`RecordId`] to [`DenseIndex`].
///
/// Assignments are permanent for the lifetime of the map; nothing is ever
/// renumbered or removed.
#[derive(Debug, Clone)]
pub struct DenseIdMap {
    /// Record id to dense index
    forward: FxHashMap<RecordId, DenseIndex>,
    /// Dense index to record id
    reverse: Vec<RecordId>,
    capacity: usize,
}

impl DenseIdMap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            forward: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            reverse: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Return the dense index of `record_id`, allocating the next one on first sight.
    ///
    /// Fails with [`ClusterError::CapacityExceeded`] once more than `capacity`
    /// distinct records have been seen.
    #[inline]
    pub fn intern(&mut self, record_id: RecordId) -> Result<DenseIndex, ClusterError> {
        // Fast path: already compressed
        if let Some(&dense) = self.forward.get(&record_id) {
            return Ok(dense);
        }

        let overflow = ClusterError::CapacityExceeded {
            capacity: self.capacity,
            record_id,
        };
        if self.reverse.len() >= self.capacity {
            return Err(overflow);
        }
        let next = u32::try_from(self.reverse.len()).map_err(|_| overflow)?;

        let dense = DenseIndex(next);
        self.forward.insert(record_id, dense);
        self.reverse.push(record_id);
        tracing::trace!(record_id = %record_id, dense = dense.0, "compressed record id");
        Ok(dense)
    }

    pub fn get(&self, record_id: RecordId) -> Option<DenseIndex> {
        self.forward.get(&record_id).copied()
    }

    pub fn record_id(&self, dense: DenseIndex) -> Option<RecordId> {
        self.reverse.get(dense.index()).copied()
    }

    /// Original record ids in dense order.
    pub fn record_ids(&self) -> &[RecordId] {
        &self.reverse
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
