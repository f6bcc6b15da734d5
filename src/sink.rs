//! # Assignment Sinks
//!
//! Receivers of the final record to cluster assignment. Writes are batched;
//! a sink only publishes its output once [`AssignmentSink::finish`] succeeds.

use crate::config::DEFAULT_CLUSTER_COLUMN;
use crate::model::{ClusterId, RecordId};
use crate::result::ClusteringResult;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

pub trait AssignmentSink {
    fn write_batch(&mut self, batch: &[(RecordId, ClusterId)]) -> Result<()>;

    /// Make everything written so far visible. Called once, after the last batch.
    fn finish(&mut self) -> Result<()>;
}

/// Stream the record to cluster view into `sink` in ascending record order.
///
/// Returns the number of assignments written. On failure `finish` is not
/// called, so a sink that stages its output leaves nothing behind.
#[instrument(skip(result, sink), fields(records = result.record_count()), level = "debug")]
pub fn persist(
    result: &ClusteringResult,
    sink: &mut dyn AssignmentSink,
    batch_size: usize,
) -> Result<u64> {
    let pairs = result.sorted_assignments();
    let total = pairs.len();
    let mut written = 0u64;

    for batch in pairs.chunks(batch_size.max(1)) {
        if let Err(err) = sink.write_batch(batch) {
            error!(written, total, error = %err, "Batch write failed; discarding partial output");
            return Err(err);
        }
        written += batch.len() as u64;
        info!(written, total, "Executed batch");
    }

    sink.finish()?;
    Ok(written)
}

/// Collects assignments in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub rows: Vec<(RecordId, ClusterId)>,
    pub batches: usize,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentSink for MemorySink {
    fn write_batch(&mut self, batch: &[(RecordId, ClusterId)]) -> Result<()> {
        self.rows.extend_from_slice(batch);
        self.batches += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes `record_id<delim>cluster_id` lines to `<path>.tmp` and renames the
/// file into place on finish. Dropping an unfinished sink removes the temp file.
pub struct DelimitedFileSink {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
    column_delim: String,
}

impl DelimitedFileSink {
    pub fn create(path: &Path, column_delim: &str, id_column: &str) -> Result<Self> {
        let temp_path = temp_path_for(path);
        let file = File::create(&temp_path)
            .with_context(|| format!("failed to create {}", temp_path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}{}{}", id_column, column_delim, DEFAULT_CLUSTER_COLUMN)?;

        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer: Some(writer),
            column_delim: column_delim.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl AssignmentSink for DelimitedFileSink {
    fn write_batch(&mut self, batch: &[(RecordId, ClusterId)]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("sink already finished")?;
        for (record_id, cluster_id) in batch {
            writeln!(writer, "{}{}{}", record_id.0, self.column_delim, cluster_id.0)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush()?;
        drop(writer);
        fs::rename(&self.temp_path, &self.path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                self.temp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl Drop for DelimitedFileSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClusteringResult {
        ClusteringResult::from_assignments(vec![
            (RecordId(30), ClusterId(1)),
            (RecordId(10), ClusterId(1)),
            (RecordId(20), ClusterId(0)),
        ])
    }

    struct FailingSink {
        calls: usize,
    }

    impl AssignmentSink for FailingSink {
        fn write_batch(&mut self, _batch: &[(RecordId, ClusterId)]) -> Result<()> {
            self.calls += 1;
            if self.calls > 1 {
                anyhow::bail!("disk full");
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            panic!("finish must not run after a failed batch");
        }
    }

    #[test]
    fn test_persist_batches_in_record_order() {
        let mut sink = MemorySink::new();
        let written = persist(&sample(), &mut sink, 2).unwrap();
        assert_eq!(written, 3);
        assert_eq!(sink.batches, 2);
        assert!(sink.finished);
        assert_eq!(
            sink.rows,
            vec![
                (RecordId(10), ClusterId(1)),
                (RecordId(20), ClusterId(0)),
                (RecordId(30), ClusterId(1)),
            ]
        );
    }

    #[test]
    fn test_persist_stops_on_failure() {
        let mut sink = FailingSink { calls: 0 };
        assert!(persist(&sample(), &mut sink, 1).is_err());
        assert_eq!(sink.calls, 2);
    }

    #[test]
    fn test_file_sink_publishes_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.csv");

        let mut sink = DelimitedFileSink::create(&path, ",", "id").unwrap();
        persist(&sample(), &mut sink, 10).unwrap();
        drop(sink);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,cluster_id\n10,1\n20,0\n30,1\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_unfinished_file_sink_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.csv");

        let mut sink = DelimitedFileSink::create(&path, ",", "id").unwrap();
        sink.write_batch(&[(RecordId(1), ClusterId(0))]).unwrap();
        assert!(temp_path_for(&path).exists());
        drop(sink);

        assert!(!path.exists());
        assert!(!temp_path_for(&path).exists());
    }
}
