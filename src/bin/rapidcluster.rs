use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rapidcluster::config::{
    ConfigOverrides, EngineOverrides, SinkOverrides, SourceOverrides, TokenizerOverrides,
};
use rapidcluster::{ClusterConfig, DelimitedFileSink, DelimitedFileSource, RapidCluster};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cluster records that share description bigrams.
#[derive(Parser, Debug)]
#[command(name = "rapidcluster", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delimited input file with a header line
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file for record to cluster assignments
    #[arg(long)]
    output: Option<PathBuf>,

    /// Token delimiter inside description values
    #[arg(long)]
    data_delim: Option<String>,

    /// Column delimiter of the input file
    #[arg(long)]
    column_delim: Option<String>,

    /// Header name of the record id column
    #[arg(long)]
    id_column: Option<String>,

    /// Description column header names (repeatable)
    #[arg(long = "description-column")]
    description_columns: Vec<String>,

    /// Marker paired with the last token of a single-token value
    #[arg(long)]
    end_marker: Option<String>,

    /// Upper bound on distinct records
    #[arg(long)]
    capacity: Option<usize>,

    /// Tokenize rows on all cores
    #[arg(long)]
    parallel: bool,

    /// Assignments per sink batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            tokenizer: Some(TokenizerOverrides {
                data_delim: self.data_delim.clone(),
                end_marker: self.end_marker.clone(),
                null_marker: None,
            }),
            source: Some(SourceOverrides {
                path: self.input.clone(),
                column_delim: self.column_delim.clone(),
                id_column: self.id_column.clone(),
                description_columns: (!self.description_columns.is_empty())
                    .then(|| self.description_columns.clone()),
            }),
            sink: Some(SinkOverrides {
                path: self.output.clone(),
                batch_size: self.batch_size,
            }),
            engine: Some(EngineOverrides {
                capacity: self.capacity,
                parallel: self.parallel.then_some(true),
            }),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ClusterConfig::load(args.config.as_deref(), args.overrides())?;

    let input = config
        .source
        .path
        .clone()
        .context("no input file given (--input or source.path)")?;
    let output = config
        .sink
        .path
        .clone()
        .context("no output file given (--output or sink.path)")?;

    info!(
        input = %input.display(),
        output = %output.display(),
        columns = ?config.source.description_columns,
        "Starting clustering run"
    );

    let mut source = DelimitedFileSource::open(&input, &config.source)?;
    let mut sink = DelimitedFileSink::create(
        &output,
        &config.sink.column_delim,
        &config.source.id_column,
    )?;

    let engine = RapidCluster::new(config);
    let report = engine.run(&mut source, &mut sink)?;

    if let Some(path) = &args.stats {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!(
        "{} records in {} clusters written to {}",
        report.written,
        report.clusters.clusters,
        output.display()
    );
    Ok(())
}
