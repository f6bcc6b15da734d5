//! # Bigram Index
//!
//! Inverted index from bigram to the set of records that produced it, plus the
//! builder that feeds source rows through the tokenizer into the index.
//!
//! The index is built once and then only read by the clustering engine. Rows
//! may be tokenized in parallel with [`IndexBuilder::build_parallel`]; the
//! per-worker partial indexes are merged before the index is handed over.

use crate::model::{RecordId, SourceRow};
use crate::tokenizer::BigramTokenizer;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Records sharing one bigram. Set semantics: a record appears at most once.
pub type RecordSet = FxHashSet<RecordId>;

type BucketMap = HashMap<String, RecordSet>;

#[derive(Debug, Clone, Default)]
pub struct BigramIndex {
    buckets: BucketMap,
    /// Upper bound on distinct records referenced, as counted while building
    capacity_hint: usize,
}

impl BigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct bigrams.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Add `record_id` to the bucket of `bigram`.
    ///
    /// Returns true if the record was not already present for that bigram.
    #[inline]
    pub fn insert(&mut self, bigram: &str, record_id: RecordId) -> bool {
        // entry_ref only allocates the owned key the first time a bigram is seen
        self.buckets
            .entry_ref(bigram)
            .or_default()
            .insert(record_id)
    }

    pub fn get(&self, bigram: &str) -> Option<&RecordSet> {
        self.buckets.get(bigram)
    }

    /// Iterate over `(bigram, records)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordSet)> + '_ {
        self.buckets
            .iter()
            .map(|(bigram, records)| (bigram.as_str(), records))
    }

    /// Row-based upper bound on the number of distinct records in the index.
    ///
    /// Exact when every source row carries a unique record id.
    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    /// Exact number of distinct records referenced by any bucket.
    pub fn distinct_record_count(&self) -> usize {
        let mut seen: FxHashSet<RecordId> = FxHashSet::default();
        for records in self.buckets.values() {
            seen.extend(records.iter().copied());
        }
        seen.len()
    }

    /// Union `other` into this index, bucket by bucket.
    pub fn merge(&mut self, mut other: BigramIndex) {
        if other.buckets.len() > self.buckets.len() {
            std::mem::swap(&mut self.buckets, &mut other.buckets);
        }
        for (bigram, records) in other.buckets {
            match self.buckets.entry(bigram) {
                Entry::Occupied(entry) => {
                    let existing = entry.into_mut();
                    if records.len() > existing.len() {
                        let smaller = std::mem::replace(existing, records);
                        existing.extend(smaller);
                    } else {
                        existing.extend(records);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(records);
                }
            }
        }
        self.capacity_hint += other.capacity_hint;
    }
}

/// Builds an index from explicit `(bigram, record ids)` pairs. Repeated
/// bigrams have their record sets unioned.
impl<S, I> FromIterator<(S, I)> for BigramIndex
where
    S: AsRef<str>,
    I: IntoIterator<Item = i64>,
{
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        let mut index = BigramIndex::new();
        for (bigram, ids) in iter {
            let bigram = bigram.as_ref();
            let bucket = index.buckets.entry_ref(bigram).or_default();
            bucket.extend(ids.into_iter().map(RecordId));
        }
        index.capacity_hint = index.distinct_record_count();
        index
    }
}

/// Counters gathered while building an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub rows_read: u64,
    /// Rows that produced at least one bigram
    pub rows_contributing: u64,
    /// Rows whose values were all null or blank; excluded from clustering
    pub rows_without_bigrams: u64,
    pub null_values: u64,
    pub bigrams_emitted: u64,
}

impl IndexStats {
    fn merge(&mut self, other: &IndexStats) {
        self.rows_read += other.rows_read;
        self.rows_contributing += other.rows_contributing;
        self.rows_without_bigrams += other.rows_without_bigrams;
        self.null_values += other.null_values;
        self.bigrams_emitted += other.bigrams_emitted;
    }
}

/// Feeds source rows through a [`BigramTokenizer`] into a [`BigramIndex`].
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    tokenizer: BigramTokenizer,
    index: BigramIndex,
    stats: IndexStats,
    progress_interval: u64,
}

impl IndexBuilder {
    pub fn new(tokenizer: BigramTokenizer) -> Self {
        Self {
            tokenizer,
            index: BigramIndex::new(),
            stats: IndexStats::default(),
            progress_interval: crate::config::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Log progress every `interval` rows (0 disables progress logging).
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Tokenize every non-null value of `row` and file the record under each bigram.
    ///
    /// Values are tokenized independently; their bigrams share one index.
    /// Returns the number of bigrams the row produced.
    pub fn add_row(&mut self, row: &SourceRow) -> usize {
        let IndexBuilder {
            tokenizer,
            index,
            stats,
            ..
        } = self;

        let record_id = row.record_id;
        let mut produced = 0usize;
        for value in &row.values {
            if tokenizer.is_null(value) {
                stats.null_values += 1;
                continue;
            }
            produced += tokenizer.for_each_bigram(value, |bigram| {
                index.insert(bigram, record_id);
            });
        }

        stats.rows_read += 1;
        stats.bigrams_emitted += produced as u64;
        if produced > 0 {
            stats.rows_contributing += 1;
        } else {
            stats.rows_without_bigrams += 1;
            tracing::trace!(record_id = %record_id, "row produced no bigrams");
        }

        self.log_progress();
        produced
    }

    pub fn add_rows<'a, I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = &'a SourceRow>,
    {
        for row in rows {
            self.add_row(row);
        }
    }

    fn log_progress(&self) {
        if self.progress_interval > 0 && self.stats.rows_read % self.progress_interval == 0 {
            info!(
                rows = self.stats.rows_read,
                bigrams = self.index.len(),
                "Reading rows"
            );
        }
    }

    /// Merge another builder's partial index and counters into this one.
    pub fn merge(&mut self, other: IndexBuilder) {
        self.stats.merge(&other.stats);
        self.index.merge(other.index);
    }

    /// Finish building; the index capacity hint is the number of contributing rows.
    pub fn finish(self) -> (BigramIndex, IndexStats) {
        let IndexBuilder {
            mut index, stats, ..
        } = self;
        index.capacity_hint = stats.rows_contributing as usize;
        debug!(
            bigrams = index.len(),
            rows = stats.rows_read,
            contributing = stats.rows_contributing,
            "Bigram index complete"
        );
        (index, stats)
    }

    /// Tokenize `rows` on the rayon pool and merge the partial indexes.
    #[instrument(skip(tokenizer, rows), fields(rows = rows.len()), level = "debug")]
    pub fn build_parallel(tokenizer: &BigramTokenizer, rows: &[SourceRow]) -> (BigramIndex, IndexStats) {
        let merged = rows
            .par_iter()
            .fold(
                || IndexBuilder::new(tokenizer.clone()).with_progress_interval(0),
                |mut builder, row| {
                    builder.add_row(row);
                    builder
                },
            )
            .reduce(
                || IndexBuilder::new(tokenizer.clone()).with_progress_interval(0),
                |mut left, right| {
                    left.merge(right);
                    left
                },
            );
        merged.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerSettings;

    fn pipe_builder() -> IndexBuilder {
        IndexBuilder::new(BigramTokenizer::new(TokenizerSettings {
            data_delim: "|".to_string(),
            end_marker: "END".to_string(),
            null_marker: "null".to_string(),
        }))
    }

    fn ids(index: &BigramIndex, bigram: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = index
            .get(bigram)
            .map(|set| set.iter().map(|id| id.0).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_insert_has_set_semantics() {
        let mut index = BigramIndex::new();
        assert!(index.insert("a|b", RecordId(1)));
        assert!(!index.insert("a|b", RecordId(1)));
        assert!(index.insert("a|b", RecordId(2)));
        assert_eq!(index.len(), 1);
        assert_eq!(ids(&index, "a|b"), vec![1, 2]);
    }

    #[test]
    fn test_columns_pool_into_one_index() {
        let mut builder = pipe_builder();
        builder.add_row(&SourceRow::new(1i64, ["a|b", "c|d"]));
        builder.add_row(&SourceRow::new(2i64, ["x|y", "a|b"]));
        let (index, stats) = builder.finish();

        assert_eq!(ids(&index, "a|b"), vec![1, 2]);
        assert_eq!(ids(&index, "c|d"), vec![1]);
        assert_eq!(ids(&index, "x|y"), vec![2]);
        assert_eq!(stats.rows_contributing, 2);
        assert_eq!(index.capacity_hint(), 2);
    }

    #[test]
    fn test_null_and_blank_rows_are_excluded() {
        let mut builder = pipe_builder();
        builder.add_row(&SourceRow::new(1i64, ["NULL", "  "]));
        builder.add_row(&SourceRow::new(2i64, ["null", "solo"]));
        let (index, stats) = builder.finish();

        assert_eq!(stats.rows_read, 2);
        assert_eq!(stats.rows_contributing, 1);
        assert_eq!(stats.rows_without_bigrams, 1);
        assert_eq!(stats.null_values, 2);
        assert_eq!(ids(&index, "solo|END"), vec![2]);
        assert_eq!(index.distinct_record_count(), 1);
    }

    #[test]
    fn test_from_iter_unions_repeated_keys() {
        let index: BigramIndex = vec![("p|q", vec![10i64, 20]), ("p|q", vec![20i64, 30])]
            .into_iter()
            .collect();
        assert_eq!(index.len(), 1);
        assert_eq!(ids(&index, "p|q"), vec![10i64, 20, 30]);
        assert_eq!(index.capacity_hint(), 3);
    }

    #[test]
    fn test_merge_unions_buckets() {
        let mut left: BigramIndex = vec![("a|b", vec![1i64]), ("b|c", vec![2i64])].into_iter().collect();
        let right: BigramIndex = vec![("a|b", vec![3i64, 4]), ("z|z2", vec![5i64])].into_iter().collect();
        left.merge(right);
        assert_eq!(left.len(), 3);
        assert_eq!(ids(&left, "a|b"), vec![1, 3, 4]);
        assert_eq!(ids(&left, "z|z2"), vec![5]);
        assert_eq!(left.distinct_record_count(), 5);
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let rows: Vec<SourceRow> = (0..500i64)
            .map(|i| SourceRow::new(i, [format!("t{}|t{}|t{}", i % 7, i % 11, i % 13)]))
            .collect();
        let tokenizer = pipe_builder().tokenizer.clone();

        let mut sequential = IndexBuilder::new(tokenizer.clone());
        sequential.add_rows(&rows);
        let (sequential, seq_stats) = sequential.finish();
        let (parallel, par_stats) = IndexBuilder::build_parallel(&tokenizer, &rows);

        assert_eq!(seq_stats, par_stats);
        assert_eq!(sequential.len(), parallel.len());
        for (bigram, records) in sequential.iter() {
            assert_eq!(parallel.get(bigram), Some(records));
        }
    }
}
