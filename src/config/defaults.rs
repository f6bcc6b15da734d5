//! Default constants for rapidcluster configuration.
//!
//! All magic numbers are centralized here with documentation.

// =============================================================================
// Tokenizer Defaults
// =============================================================================

/// Default separator between tokens inside one description value
pub const DEFAULT_DATA_DELIM: &str = " ";

/// Default pseudo-token used to pad values that form no bigram
pub const DEFAULT_END_MARKER: &str = "<END>";

/// Default marker for an absent column value (matched case-insensitively)
pub const DEFAULT_NULL_MARKER: &str = "null";

// =============================================================================
// Source / Sink Defaults
// =============================================================================

/// Default separator between columns of a delimited input or output file
pub const DEFAULT_COLUMN_DELIM: &str = ",";

/// Default header name of the record id column
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Default header name of the description column
pub const DEFAULT_DESCRIPTION_COLUMN: &str = "description";

/// Default header name of the cluster id column written by the sink
pub const DEFAULT_CLUSTER_COLUMN: &str = "cluster_id";

/// Default number of assignments written per sink batch
pub const DEFAULT_SINK_BATCH_SIZE: usize = 5_000;

// =============================================================================
// Engine Defaults
// =============================================================================

/// Rows or bigram buckets processed between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "RAPIDCLUSTER_";

/// Separator between nesting levels in environment variable names
pub const ENV_NESTING_SEPARATOR: &str = "__";
