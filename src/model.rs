//! # Data Model
//!
//! Core identifiers shared by the tokenizer, index, and clustering engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally assigned record identity, unique per input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value)
    }
}

/// Cluster identifier allocated by the engine, monotonically increasing per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl ClusterId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Zero-based compact substitute for a [`RecordId`], assigned in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DenseIndex(pub u32);

impl DenseIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One row handed over by a row source: the record identity plus its raw
/// description column values, already split on the column delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub record_id: RecordId,
    pub values: Vec<String>,
}

impl SourceRow {
    pub fn new<I, S>(record_id: impl Into<RecordId>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            record_id: record_id.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}
