//! # rapidcluster
//!
//! Groups large record collections into clusters by shared description
//! bigrams. Two records end up together when their descriptions share an
//! adjacent-token pair, directly or through a chain of such pairs.
//!
//! The pipeline is source → [`IndexBuilder`] → [`BigramIndex`] →
//! [`BigramLinker`] → [`ClusteringResult`] → sink, run as one offline batch
//! pass with the whole working set in memory.

pub mod config;
pub mod dense;
pub mod dsu;
pub mod error;
pub mod index;
pub mod linker;
pub mod model;
pub mod profile;
pub mod result;
pub mod sink;
pub mod source;
pub mod tokenizer;

#[doc(hidden)]
pub mod test_support;

// Re-export main types for convenience
pub use config::ClusterConfig;
pub use error::{ClusterError, ErrorKind};
pub use index::{BigramIndex, IndexBuilder, IndexStats, RecordSet};
pub use linker::{cluster_entries, cluster_index, BigramLinker};
pub use model::{ClusterId, DenseIndex, RecordId, SourceRow};
pub use result::{ClusterStats, ClusteringResult};
pub use sink::{persist, AssignmentSink, DelimitedFileSink, MemorySink};
pub use source::{DelimitedFileSource, MemorySource, RowSource};
pub use tokenizer::{BigramTokenizer, TokenizerSettings};

use anyhow::Context;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub index: IndexStats,
    pub bigrams: usize,
    pub capacity: usize,
    pub clusters: ClusterStats,
    pub written: u64,
    pub elapsed_ms: u64,
    /// Per-phase timings; empty unless built with `profiling`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<profile::PhaseTiming>,
}

/// Main API for bigram clustering
pub struct RapidCluster {
    config: ClusterConfig,
    tokenizer: BigramTokenizer,
}

impl RapidCluster {
    pub fn new(config: ClusterConfig) -> Self {
        let tokenizer = BigramTokenizer::new(config.tokenizer.clone());
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &BigramTokenizer {
        &self.tokenizer
    }

    /// Read every row from `source` and build the bigram index.
    ///
    /// With `engine.parallel` the rows are buffered and tokenized on the rayon pool.
    #[instrument(skip(self, source), level = "debug")]
    pub fn build_index(
        &self,
        source: &mut dyn RowSource,
    ) -> anyhow::Result<(BigramIndex, IndexStats)> {
        let _scope = profile::profile_scope("pipeline.build_index");
        info!(parallel = self.config.engine.parallel, "Building bigram index");

        if self.config.engine.parallel {
            let rows = source.collect_rows()?;
            return Ok(IndexBuilder::build_parallel(&self.tokenizer, &rows));
        }

        let mut builder = IndexBuilder::new(self.tokenizer.clone())
            .with_progress_interval(self.config.engine.progress_interval);
        while let Some(row) = source.next_row()? {
            builder.add_row(&row);
        }
        Ok(builder.finish())
    }

    /// Capacity the engine is sized with: the configured bound, else the index's hint.
    pub fn capacity_for(&self, index: &BigramIndex) -> usize {
        self.config
            .engine
            .capacity
            .unwrap_or_else(|| index.capacity_hint())
    }

    /// Cluster a finished index.
    pub fn cluster(&self, index: &BigramIndex) -> Result<ClusteringResult, ClusterError> {
        if index.is_empty() {
            return Err(ClusterError::EmptyIndex);
        }
        let _scope = profile::profile_scope("pipeline.cluster");
        BigramLinker::new(self.capacity_for(index))?
            .with_progress_interval(self.config.engine.progress_interval)
            .run(index.iter())
    }

    /// Run the whole pipeline from `source` to `sink`.
    pub fn run(
        &self,
        source: &mut dyn RowSource,
        sink: &mut dyn AssignmentSink,
    ) -> anyhow::Result<RunReport> {
        let started = Instant::now();

        let (index, index_stats) = self.build_index(source)?;
        info!(
            rows = index_stats.rows_read,
            contributing = index_stats.rows_contributing,
            excluded = index_stats.rows_without_bigrams,
            bigrams = index.len(),
            "Bigram index built"
        );

        let capacity = self.capacity_for(&index);
        let result = self
            .cluster(&index)
            .with_context(|| format!("clustering failed (capacity {capacity})"))?;
        // The index is read once; release it before writing
        let bigrams = index.len();
        drop(index);

        let written = {
            let _scope = profile::profile_scope("pipeline.persist");
            persist(&result, sink, self.config.sink.batch_size)?
        };

        let report = RunReport {
            index: index_stats,
            bigrams,
            capacity,
            clusters: result.stats(),
            written,
            elapsed_ms: started.elapsed().as_millis() as u64,
            phases: profile::snapshot(),
        };
        info!(
            records = report.clusters.records,
            clusters = report.clusters.clusters,
            singletons = report.clusters.singletons,
            largest = report.clusters.largest,
            elapsed_ms = report.elapsed_ms,
            "Clustering run complete"
        );
        profile::log_report();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_config() -> ClusterConfig {
        let mut config = ClusterConfig::default();
        config.tokenizer.data_delim = "|".to_string();
        config.tokenizer.end_marker = "END".to_string();
        config
    }

    #[test]
    fn test_run_in_memory() {
        let engine = RapidCluster::new(pipe_config());
        let mut source = MemorySource::new(vec![
            SourceRow::new(1i64, ["a|b"]),
            SourceRow::new(2i64, ["a|b|c"]),
            SourceRow::new(3i64, ["c|d", "null"]),
            SourceRow::new(4i64, ["b|c"]),
            SourceRow::new(9i64, ["x"]),
            SourceRow::new(10i64, ["NULL", " "]),
        ]);
        let mut sink = MemorySink::new();

        let report = engine.run(&mut source, &mut sink).unwrap();
        assert_eq!(report.index.rows_read, 6);
        assert_eq!(report.index.rows_without_bigrams, 1);
        assert_eq!(report.capacity, 5);
        assert_eq!(report.clusters.clusters, 3);
        assert_eq!(report.written, 5);
        assert!(sink.finished);

        let cluster_of = |id: i64| {
            sink.rows
                .iter()
                .find(|(record, _)| record.0 == id)
                .map(|(_, cluster)| *cluster)
        };
        assert_eq!(cluster_of(1), cluster_of(2));
        assert_eq!(cluster_of(2), cluster_of(4));
        assert_ne!(cluster_of(1), cluster_of(3));
        assert!(cluster_of(9).is_some());
        assert!(cluster_of(10).is_none());
    }

    #[test]
    fn test_configured_capacity_overrides_hint() {
        let mut config = pipe_config();
        config.engine.capacity = Some(1);
        let engine = RapidCluster::new(config);
        let mut source = MemorySource::new(vec![
            SourceRow::new(1i64, ["a|b"]),
            SourceRow::new(2i64, ["a|b"]),
        ]);
        let (index, _) = engine.build_index(&mut source).unwrap();
        let err = engine.cluster(&index).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_all_null_input_is_empty_index() {
        let engine = RapidCluster::new(pipe_config());
        let mut source = MemorySource::new(vec![SourceRow::new(1i64, ["null"])]);
        let mut sink = MemorySink::new();
        let err = engine.run(&mut source, &mut sink).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ClusterError>(),
            Some(&ClusterError::EmptyIndex)
        );
        assert!(!sink.finished);
    }
}
