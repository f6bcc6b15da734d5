//! # Row Sources
//!
//! Suppliers of `(record id, description values)` rows for the index builder.
//! The engine itself never touches storage; sources only hand rows over.

use crate::config::SourceConfig;
use crate::model::{RecordId, SourceRow};
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// A stream of source rows.
pub trait RowSource {
    /// The next row, or `None` once the source is exhausted.
    fn next_row(&mut self) -> Result<Option<SourceRow>>;

    /// Drain the remaining rows into memory.
    fn collect_rows(&mut self) -> Result<Vec<SourceRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Rows held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    rows: std::vec::IntoIter<SourceRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for MemorySource {
    fn next_row(&mut self) -> Result<Option<SourceRow>> {
        Ok(self.rows.next())
    }
}

/// Delimited text input whose first line is a header naming the columns.
///
/// The id column is parsed as `i64`; the description columns become the
/// row's values in configured order. Blank lines are skipped and a missing
/// trailing field reads as an empty value.
pub struct DelimitedFileSource<R: BufRead> {
    lines: Lines<R>,
    column_delim: String,
    id_position: usize,
    value_positions: Vec<usize>,
    line_number: usize,
}

impl DelimitedFileSource<BufReader<File>> {
    pub fn open(path: &Path, config: &SourceConfig) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open input file {}", path.display()))?;
        Self::from_reader(BufReader::new(file), config)
            .with_context(|| format!("failed to read header of {}", path.display()))
    }
}

impl<R: BufRead> DelimitedFileSource<R> {
    pub fn from_reader(reader: R, config: &SourceConfig) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| anyhow!("input is empty: missing header line"))??;

        let columns: Vec<&str> = header
            .split(config.column_delim.as_str())
            .map(str::trim)
            .collect();
        let position_of = |name: &str| -> Result<usize> {
            columns
                .iter()
                .position(|column| *column == name)
                .ok_or_else(|| anyhow!("column '{}' not found in header {:?}", name, columns))
        };

        let id_position = position_of(&config.id_column)?;
        let value_positions = config
            .description_columns
            .iter()
            .map(|name| position_of(name))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            id_column = %config.id_column,
            description_columns = ?config.description_columns,
            "Resolved input columns"
        );

        Ok(Self {
            lines,
            column_delim: config.column_delim.clone(),
            id_position,
            value_positions,
            line_number: 1,
        })
    }

    fn parse_line(&self, line: &str) -> Result<SourceRow> {
        let fields: Vec<&str> = line.split(self.column_delim.as_str()).collect();

        let raw_id = fields.get(self.id_position).map(|f| f.trim()).unwrap_or("");
        if raw_id.is_empty() {
            bail!("line {}: missing record id", self.line_number);
        }
        let record_id: i64 = raw_id
            .parse()
            .with_context(|| format!("line {}: invalid record id '{}'", self.line_number, raw_id))?;

        let values = self
            .value_positions
            .iter()
            .map(|&position| fields.get(position).copied().unwrap_or("").to_string())
            .collect();

        Ok(SourceRow {
            record_id: RecordId(record_id),
            values,
        })
    }
}

impl<R: BufRead> RowSource for DelimitedFileSource<R> {
    fn next_row(&mut self) -> Result<Option<SourceRow>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line.with_context(|| format!("line {}: read failed", self.line_number))?;
            if line.trim().is_empty() {
                continue;
            }
            return self.parse_line(&line).map(Some);
        }
    }
}
