//! # Clustering Result
//!
//! Read-only views over the final assignment: cluster to members and record
//! to cluster. Records that never reached the index appear in neither.

use crate::model::{ClusterId, RecordId};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusteringResult {
    clusters: FxHashMap<ClusterId, FxHashSet<RecordId>>,
    assignments: FxHashMap<RecordId, ClusterId>,
}

/// Summary figures for a [`ClusteringResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    pub records: usize,
    pub clusters: usize,
    pub singletons: usize,
    pub largest: usize,
}

impl ClusteringResult {
    /// Assemble both views from resolved `(record, root cluster)` pairs.
    pub fn from_assignments<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (RecordId, ClusterId)>,
    {
        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut clusters: FxHashMap<ClusterId, FxHashSet<RecordId>> = FxHashMap::default();
        let mut assignments: FxHashMap<RecordId, ClusterId> =
            FxHashMap::with_capacity_and_hasher(lower, Default::default());

        for (record_id, cluster_id) in pairs {
            if let Some(previous) = assignments.insert(record_id, cluster_id) {
                // A record belongs to exactly one cluster; drop the stale membership
                if previous != cluster_id {
                    if let Some(members) = clusters.get_mut(&previous) {
                        members.remove(&record_id);
                        if members.is_empty() {
                            clusters.remove(&previous);
                        }
                    }
                }
            }
            clusters.entry(cluster_id).or_default().insert(record_id);
        }

        Self {
            clusters,
            assignments,
        }
    }

    /// Cluster id to member records.
    pub fn clusters(&self) -> &FxHashMap<ClusterId, FxHashSet<RecordId>> {
        &self.clusters
    }

    /// Record id to cluster id.
    pub fn assignments(&self) -> &FxHashMap<RecordId, ClusterId> {
        &self.assignments
    }

    pub fn cluster_of(&self, record_id: RecordId) -> Option<ClusterId> {
        self.assignments.get(&record_id).copied()
    }

    pub fn members(&self, cluster_id: ClusterId) -> Option<&FxHashSet<RecordId>> {
        self.clusters.get(&cluster_id)
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn record_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Record to cluster pairs in ascending record order.
    pub fn sorted_assignments(&self) -> Vec<(RecordId, ClusterId)> {
        let mut pairs: Vec<(RecordId, ClusterId)> = self
            .assignments
            .iter()
            .map(|(&record_id, &cluster_id)| (record_id, cluster_id))
            .collect();
        pairs.sort_unstable_by_key(|&(record_id, _)| record_id);
        pairs
    }

    /// Canonical grouping with cluster numbering erased: each cluster's
    /// members sorted, clusters ordered by their smallest member.
    pub fn partition(&self) -> Vec<Vec<RecordId>> {
        let mut groups: Vec<Vec<RecordId>> = self
            .clusters
            .values()
            .map(|members| {
                let mut members: Vec<RecordId> = members.iter().copied().collect();
                members.sort_unstable();
                members
            })
            .collect();
        groups.sort_unstable();
        groups
    }

    pub fn stats(&self) -> ClusterStats {
        let mut stats = ClusterStats {
            records: self.assignments.len(),
            clusters: self.clusters.len(),
            ..ClusterStats::default()
        };
        for members in self.clusters.values() {
            if members.len() == 1 {
                stats.singletons += 1;
            }
            stats.largest = stats.largest.max(members.len());
        }
        stats
    }
}
