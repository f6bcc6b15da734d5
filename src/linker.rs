//! # Bigram Linker
//!
//! Online union-find clustering over a [`BigramIndex`]. Every bigram bucket is
//! a clique of records; walking a bucket once and chaining each record to the
//! one before it is enough to connect the whole clique, so edges are never
//! materialized.
//!
//! Per bucket step:
//! - an unassigned record joins a fresh cluster, allocated at most once per
//!   step and only when some record actually needs it;
//! - the previous record's root is attached under that fresh cluster, which is
//!   always the newest id in the forest;
//! - an assigned record whose cluster differs from the previous record's is
//!   unioned with it, the smaller root going under the larger.
//!
//! The resulting partition does not depend on bucket order. Cluster numbering does.

use crate::dense::DenseIdMap;
use crate::dsu::ClusterForest;
use crate::error::ClusterError;
use crate::index::{BigramIndex, RecordSet};
use crate::model::{ClusterId, RecordId};
use crate::profile::profile_scope;
use crate::result::ClusteringResult;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Cluster every bucket of `index`.
///
/// `distinct_count` is the upper bound on distinct records referenced by the
/// index; exceeding it fails with [`ClusterError::CapacityExceeded`].
#[instrument(skip(index), fields(bigrams = index.len()), level = "debug")]
pub fn cluster_index(
    index: &BigramIndex,
    distinct_count: usize,
) -> Result<ClusteringResult, ClusterError> {
    if index.is_empty() {
        return Err(ClusterError::EmptyIndex);
    }
    cluster_entries(index.iter(), distinct_count)
}

/// Cluster `(bigram, records)` pairs in the order given.
pub fn cluster_entries<'a, I>(
    entries: I,
    distinct_count: usize,
) -> Result<ClusteringResult, ClusterError>
where
    I: IntoIterator<Item = (&'a str, &'a RecordSet)>,
{
    BigramLinker::new(distinct_count)?.run(entries)
}

/// Counters gathered while linking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkerStats {
    pub buckets_seen: u64,
    pub empty_buckets: u64,
    pub singleton_buckets: u64,
    pub clusters_allocated: u64,
    pub merges: u64,
}

/// Largest capacity a run accepts: dense indexes and cluster ids are `u32`.
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// Incremental clustering state for one run.
#[derive(Debug, Clone)]
pub struct BigramLinker {
    dense: DenseIdMap,
    /// Cluster last assigned to each dense index; not root-resolved until finish
    cluster_of: Vec<Option<ClusterId>>,
    forest: ClusterForest,
    stats: LinkerStats,
    progress_interval: u64,
}

impl BigramLinker {
    /// Size the per-record arrays for `distinct_count` records.
    ///
    /// Fails with [`ClusterError::CapacityTooLarge`] above [`MAX_CAPACITY`].
    pub fn new(distinct_count: usize) -> Result<Self, ClusterError> {
        if distinct_count > MAX_CAPACITY {
            return Err(ClusterError::CapacityTooLarge {
                capacity: distinct_count,
                max: MAX_CAPACITY,
            });
        }
        debug!(
            capacity = distinct_count,
            "Allocating per-record arrays for clustering"
        );
        Ok(Self {
            dense: DenseIdMap::with_capacity(distinct_count),
            cluster_of: vec![None; distinct_count],
            forest: ClusterForest::with_capacity(distinct_count),
            stats: LinkerStats::default(),
            progress_interval: crate::config::DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Log progress every `interval` buckets (0 disables progress logging).
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn stats(&self) -> &LinkerStats {
        &self.stats
    }

    /// The cluster forest as built so far.
    pub fn forest(&self) -> &ClusterForest {
        &self.forest
    }

    /// Number of cluster ids allocated so far.
    pub fn clusters_allocated(&self) -> usize {
        self.forest.len()
    }

    /// Process every entry, then resolve and assemble the result.
    ///
    /// Fails with [`ClusterError::EmptyIndex`] if no entry holds a record.
    pub fn run<'a, I>(mut self, entries: I) -> Result<ClusteringResult, ClusterError>
    where
        I: IntoIterator<Item = (&'a str, &'a RecordSet)>,
    {
        let started = Instant::now();
        info!(capacity = self.dense.capacity(), "Starting bigram clustering");

        {
            let _scope = profile_scope("linker.process_buckets");
            for (bigram, records) in entries {
                tracing::trace!(bigram, size = records.len(), "processing bucket");
                self.process_bucket(records.iter().copied())?;
            }
        }

        if self.dense.is_empty() {
            debug!(
                buckets = self.stats.buckets_seen,
                empty = self.stats.empty_buckets,
                "No bucket held a record"
            );
            return Err(ClusterError::EmptyIndex);
        }
        info!(
            buckets = self.stats.buckets_seen,
            merges = self.stats.merges,
            "Bigram buckets processed"
        );

        let result = self.finish()?;
        info!(
            records = result.record_count(),
            clusters = result.cluster_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bigram clustering complete"
        );
        Ok(result)
    }

    /// Process the record set of one bigram.
    pub fn process_bucket<I>(&mut self, records: I) -> Result<(), ClusterError>
    where
        I: IntoIterator<Item = RecordId>,
        I::IntoIter: ExactSizeIterator,
    {
        let mut records = records.into_iter();
        self.stats.buckets_seen += 1;

        match records.len() {
            0 => self.stats.empty_buckets += 1,
            1 => {
                self.stats.singleton_buckets += 1;
                if let Some(record_id) = records.next() {
                    self.assign_singleton(record_id)?;
                }
            }
            _ => self.link_group(records)?,
        }

        if self.progress_interval > 0 && self.stats.buckets_seen % self.progress_interval == 0 {
            info!(
                buckets = self.stats.buckets_seen,
                records = self.dense.len(),
                clusters = self.forest.len(),
                "Bigrams processed"
            );
        }
        Ok(())
    }

    fn assign_singleton(&mut self, record_id: RecordId) -> Result<(), ClusterError> {
        let slot = self.dense.intern(record_id)?.index();
        if self.cluster_of[slot].is_none() {
            let cluster = self.allocate_cluster();
            self.cluster_of[slot] = Some(cluster);
        }
        Ok(())
    }

    fn link_group<I>(&mut self, records: I) -> Result<(), ClusterError>
    where
        I: Iterator<Item = RecordId>,
    {
        let mut fresh: Option<ClusterId> = None;
        // Cluster of the previous record in this walk
        let mut previous: Option<ClusterId> = None;

        for record_id in records {
            let slot = self.dense.intern(record_id)?.index();

            match self.cluster_of[slot] {
                None => {
                    let cluster = match fresh {
                        Some(cluster) => cluster,
                        None => {
                            let cluster = self.allocate_cluster();
                            fresh = Some(cluster);
                            cluster
                        }
                    };
                    if let Some(prev) = previous {
                        if prev != cluster {
                            let prev_root = self.forest.find(prev);
                            if prev_root != cluster {
                                self.forest.attach(prev_root, cluster)?;
                                self.stats.merges += 1;
                            }
                        }
                    }
                    self.cluster_of[slot] = Some(cluster);
                    previous = Some(cluster);
                }
                Some(assigned) => {
                    if let Some(prev) = previous {
                        if prev != assigned {
                            let prev_root = self.forest.find(prev);
                            let assigned_root = self.forest.find(assigned);
                            if prev_root != assigned_root {
                                self.forest.link_roots(prev_root, assigned_root);
                                self.stats.merges += 1;
                            }
                        }
                    }
                    previous = Some(assigned);
                }
            }
        }
        Ok(())
    }

    fn allocate_cluster(&mut self) -> ClusterId {
        self.stats.clusters_allocated += 1;
        self.forest.make_set()
    }

    /// Resolve every record to its final root and assemble the result.
    pub fn finish(mut self) -> Result<ClusteringResult, ClusterError> {
        let _scope = profile_scope("linker.finish");
        debug!(
            clusters_allocated = self.forest.len(),
            roots = self.forest.num_roots(),
            "Compressing cluster forest"
        );
        self.forest.compress_all();

        let mut assignments = Vec::with_capacity(self.dense.len());
        for (slot, &record_id) in self.dense.record_ids().iter().enumerate() {
            let cluster = self.cluster_of[slot].ok_or(ClusterError::UnassignedRecord(record_id))?;
            assignments.push((record_id, self.forest.resolved(cluster)));
        }

        Ok(ClusteringResult::from_assignments(assignments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> Vec<RecordId> {
        values.iter().copied().map(RecordId).collect()
    }

    #[test]
    fn test_chain_and_singleton() {
        let index: BigramIndex = vec![
            ("a|b", vec![1i64, 2]),
            ("b|c", vec![2i64, 3]),
            ("x|y", vec![9i64]),
        ]
        .into_iter()
        .collect();

        let result = cluster_index(&index, 4).unwrap();
        assert_eq!(
            result.partition(),
            vec![ids(&[1, 2, 3]), ids(&[9])]
        );
        assert_eq!(result.cluster_count(), 2);
    }

    #[test]
    fn test_repeated_bigram_unions_sets() {
        let index: BigramIndex = vec![("p|q", vec![10i64, 20]), ("p|q", vec![20i64, 30])]
            .into_iter()
            .collect();
        let result = cluster_index(&index, 3).unwrap();
        assert_eq!(result.partition(), vec![ids(&[10, 20, 30])]);
    }

    #[test]
    fn test_empty_index_is_rejected() {
        let index = BigramIndex::new();
        assert_eq!(cluster_index(&index, 10), Err(ClusterError::EmptyIndex));
        let none: Vec<(&str, &RecordSet)> = Vec::new();
        assert_eq!(cluster_entries(none, 10), Err(ClusterError::EmptyIndex));
    }

    #[test]
    fn test_index_of_empty_buckets_is_rejected() {
        let index: BigramIndex = vec![("a|b", Vec::<i64>::new()), ("c|d", Vec::new())]
            .into_iter()
            .collect();
        assert!(!index.is_empty());
        assert_eq!(cluster_index(&index, 0), Err(ClusterError::EmptyIndex));
        assert_eq!(cluster_index(&index, 5), Err(ClusterError::EmptyIndex));
    }

    #[test]
    fn test_oversized_capacity_is_rejected() {
        let err = BigramLinker::new(MAX_CAPACITY + 1).unwrap_err();
        assert_eq!(
            err,
            ClusterError::CapacityTooLarge {
                capacity: MAX_CAPACITY + 1,
                max: MAX_CAPACITY
            }
        );
        assert!(BigramLinker::new(0).is_ok());
    }

    #[test]
    fn test_negative_record_ids() {
        let index: BigramIndex = vec![
            ("a|b", vec![-5i64, 7]),
            ("b|c", vec![7i64, i64::MIN]),
            ("x|y", vec![-1i64]),
        ]
        .into_iter()
        .collect();
        let result = cluster_index(&index, 4).unwrap();
        assert_eq!(
            result.partition(),
            vec![ids(&[i64::MIN, -5, 7]), ids(&[-1])]
        );
    }

    #[test]
    fn test_forest_pointers_point_upward_after_linking() {
        let mut linker = BigramLinker::new(10).unwrap();
        let buckets: [&[i64]; 7] = [
            &[1, 2],
            &[3, 4],
            &[5],
            &[4, 6, 1],
            &[7, 5, 2],
            &[8, 9, 10],
            &[10, 3],
        ];
        for bucket in buckets {
            linker.process_bucket(ids(bucket)).unwrap();
        }
        for (child, &parent) in linker.forest().parents().iter().enumerate() {
            assert!(parent as usize >= child, "cluster {child} points down to {parent}");
        }
        assert_eq!(linker.finish().unwrap().cluster_count(), 1);
    }

    #[test]
    fn test_capacity_violation() {
        let index: BigramIndex = vec![("a|b", vec![1i64, 2, 3])].into_iter().collect();
        let err = cluster_index(&index, 2).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::CapacityExceeded { capacity: 2, .. }
        ));
    }

    #[test]
    fn test_empty_buckets_are_skipped() {
        let mut linker = BigramLinker::new(2).unwrap();
        linker.process_bucket(Vec::<RecordId>::new()).unwrap();
        linker.process_bucket(ids(&[5])).unwrap();
        linker.process_bucket(ids(&[5])).unwrap();
        assert_eq!(linker.stats().empty_buckets, 1);
        assert_eq!(linker.clusters_allocated(), 1);

        let result = linker.finish().unwrap();
        assert_eq!(result.partition(), vec![ids(&[5])]);
    }

    #[test]
    fn test_fresh_cluster_allocated_once_per_bucket() {
        let mut linker = BigramLinker::new(8).unwrap();
        linker.process_bucket(ids(&[1, 2, 3, 4])).unwrap();
        assert_eq!(linker.clusters_allocated(), 1);

        // Only the unassigned record needs a new cluster
        linker.process_bucket(ids(&[4, 5])).unwrap();
        assert_eq!(linker.clusters_allocated(), 2);

        // Nothing new: no allocation
        linker.process_bucket(ids(&[1, 5])).unwrap();
        assert_eq!(linker.clusters_allocated(), 2);

        let result = linker.finish().unwrap();
        assert_eq!(result.partition(), vec![ids(&[1, 2, 3, 4, 5])]);
    }

    #[test]
    fn test_bridging_bucket_merges_existing_clusters() {
        let mut linker = BigramLinker::new(6).unwrap();
        linker.process_bucket(ids(&[1, 2])).unwrap();
        linker.process_bucket(ids(&[3, 4])).unwrap();
        linker.process_bucket(ids(&[5])).unwrap();
        assert_eq!(linker.clusters_allocated(), 3);

        linker.process_bucket(ids(&[2, 6, 3])).unwrap();
        assert_eq!(linker.stats().merges, 2);
        // Re-walking an already joined bucket merges nothing
        linker.process_bucket(ids(&[3, 1, 6])).unwrap();
        assert_eq!(linker.stats().merges, 2);
        let result = linker.finish().unwrap();
        assert_eq!(
            result.partition(),
            vec![ids(&[1, 2, 3, 4, 6]), ids(&[5])]
        );
    }

    #[test]
    fn test_cluster_ids_are_roots() {
        let mut linker = BigramLinker::new(4).unwrap();
        linker.process_bucket(ids(&[1, 2])).unwrap();
        linker.process_bucket(ids(&[3])).unwrap();
        linker.process_bucket(ids(&[2, 4])).unwrap();
        let result = linker.finish().unwrap();

        // Merged cluster resolves to the newest id involved
        assert_eq!(result.cluster_of(RecordId(1)), Some(ClusterId(2)));
        assert_eq!(result.cluster_of(RecordId(4)), Some(ClusterId(2)));
        assert_eq!(result.cluster_of(RecordId(3)), Some(ClusterId(1)));
        assert_eq!(result.cluster_of(RecordId(99)), None);
    }

    #[test]
    fn test_order_invariance_small() {
        let buckets: Vec<Vec<i64>> = vec![
            vec![1, 2],
            vec![3],
            vec![4, 5],
            vec![2, 4],
            vec![6, 7, 8],
            vec![9],
            vec![8, 9],
        ];
        let forward: Vec<(String, RecordSet)> = buckets
            .iter()
            .enumerate()
            .map(|(i, ids)| (format!("b{i}"), ids.iter().copied().map(RecordId).collect()))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let left = cluster_entries(forward.iter().map(|(b, r)| (b.as_str(), r)), 9).unwrap();
        let right = cluster_entries(backward.iter().map(|(b, r)| (b.as_str(), r)), 9).unwrap();
        assert_eq!(left.partition(), right.partition());
        assert_eq!(
            left.partition(),
            vec![ids(&[1, 2, 4, 5]), ids(&[3]), ids(&[6, 7, 8, 9])]
        );
    }
}
