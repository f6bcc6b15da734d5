//! Layered configuration for the clustering pipeline.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (rapidcluster.toml)
//! ```toml
//! [tokenizer]
//! data_delim = " "
//! end_marker = "<END>"
//!
//! [source]
//! path = "/data/products.csv"
//! column_delim = ","
//! id_column = "product_id"
//! description_columns = ["title", "brand"]
//!
//! [sink]
//! path = "/data/product_clusters.csv"
//!
//! [engine]
//! parallel = true
//! ```
//!
//! Environment variables use the `RAPIDCLUSTER_` prefix with `__` between
//! nesting levels, e.g. `RAPIDCLUSTER_ENGINE__CAPACITY=2000000`.

mod defaults;

pub use defaults::*;

use crate::tokenizer::TokenizerSettings;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration for a clustering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Token delimiter, end marker and null marker
    pub tokenizer: TokenizerSettings,
    /// Where rows are read from
    pub source: SourceConfig,
    /// Where assignments are written to
    pub sink: SinkConfig,
    /// Clustering engine knobs
    pub engine: EngineConfig,
}

impl ClusterConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    pub fn load(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(ClusterConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with RAPIDCLUSTER_ prefix
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING_SEPARATOR));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: ClusterConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokenizer.data_delim.is_empty() {
            return Err(ConfigError::Invalid("tokenizer.data_delim must not be empty".into()));
        }
        if self.tokenizer.end_marker.is_empty() {
            return Err(ConfigError::Invalid("tokenizer.end_marker must not be empty".into()));
        }
        if self.source.column_delim.is_empty() {
            return Err(ConfigError::Invalid("source.column_delim must not be empty".into()));
        }
        if self.source.description_columns.is_empty() {
            return Err(ConfigError::Invalid(
                "source.description_columns must name at least one column".into(),
            ));
        }
        if self.sink.column_delim.is_empty() {
            return Err(ConfigError::Invalid("sink.column_delim must not be empty".into()));
        }
        if self.sink.batch_size == 0 {
            return Err(ConfigError::Invalid("sink.batch_size must be positive".into()));
        }
        Ok(())
    }
}

/// Delimited input file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Input file; the first line is a header naming the columns
    pub path: Option<PathBuf>,
    /// Separator between columns
    pub column_delim: String,
    /// Header name of the record id column
    pub id_column: String,
    /// Header names of the description columns, tokenized independently
    pub description_columns: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            column_delim: DEFAULT_COLUMN_DELIM.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            description_columns: vec![DEFAULT_DESCRIPTION_COLUMN.to_string()],
        }
    }
}

/// Delimited output file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Output file for `record_id,cluster_id` lines
    pub path: Option<PathBuf>,
    /// Separator between columns
    pub column_delim: String,
    /// Assignments written per batch
    pub batch_size: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: None,
            column_delim: DEFAULT_COLUMN_DELIM.to_string(),
            batch_size: DEFAULT_SINK_BATCH_SIZE,
        }
    }
}

/// Clustering engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on distinct records; defaults to the count gathered while indexing
    pub capacity: Option<usize>,
    /// Tokenize rows on the rayon pool
    pub parallel: bool,
    /// Rows or buckets between progress log lines (0 = silent)
    pub progress_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            parallel: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<TokenizerOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_delim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_marker: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_delim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
