//! # Bigram Tokenizer
//!
//! Splits a delimited description value into tokens and emits the bigrams
//! formed by adjacent, distinct tokens. A value that yields no bigram but has
//! at least one token is padded with the end marker so it still takes part in
//! clustering.

use crate::config::{DEFAULT_DATA_DELIM, DEFAULT_END_MARKER, DEFAULT_NULL_MARKER};
use serde::{Deserialize, Serialize};

/// Delimiters and markers consumed by the tokenizer and the index builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    /// Separator between tokens inside one value; also joins the two halves of a bigram
    pub data_delim: String,
    /// Pseudo-token paired with the last token of a value that forms no bigram
    pub end_marker: String,
    /// Case-insensitive marker for an absent column value
    pub null_marker: String,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            data_delim: DEFAULT_DATA_DELIM.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            null_marker: DEFAULT_NULL_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BigramTokenizer {
    settings: TokenizerSettings,
}

impl BigramTokenizer {
    pub fn new(settings: TokenizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TokenizerSettings {
        &self.settings
    }

    /// Whether a column value is the null marker and must be skipped.
    #[inline]
    pub fn is_null(&self, value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(&self.settings.null_marker)
    }

    /// Collect the bigrams of `value` in token order.
    ///
    /// Blank input yields an empty vector.
    pub fn bigrams(&self, value: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.for_each_bigram(value, |bigram| out.push(bigram.to_string()));
        out
    }

    /// Visit the bigrams of `value` without allocating one string per bigram.
    ///
    /// The slice handed to `emit` is only valid for the duration of the call.
    /// Returns the number of bigrams emitted.
    pub fn for_each_bigram<F>(&self, value: &str, mut emit: F) -> usize
    where
        F: FnMut(&str),
    {
        if value.trim().is_empty() {
            return 0;
        }

        let delim = self.settings.data_delim.as_str();
        let mut scratch = String::with_capacity(value.len() + self.settings.end_marker.len());
        let mut previous: Option<&str> = None;
        let mut emitted = 0usize;

        for token in value.split(delim).filter(|token| !token.is_empty()) {
            if let Some(prev) = previous {
                // A repeated token never pairs with itself.
                if prev == token {
                    continue;
                }
                scratch.clear();
                scratch.push_str(prev);
                scratch.push_str(delim);
                scratch.push_str(token);
                emit(&scratch);
                emitted += 1;
            }
            previous = Some(token);
        }

        if emitted == 0 {
            if let Some(last) = previous {
                scratch.clear();
                scratch.push_str(last);
                scratch.push_str(delim);
                scratch.push_str(&self.settings.end_marker);
                emit(&scratch);
                emitted = 1;
            }
        }

        emitted
    }
}

impl Default for BigramTokenizer {
    fn default() -> Self {
        Self::new(TokenizerSettings::default())
    }
}
