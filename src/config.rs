//! Configuration types for ingestion and replay.
//!
//! Both structs are plain data with builder methods, and both (de)serialize
//! so they can be kept in a JSON file next to the export.
//!
//! # Example
//!
//! ```rust
//! use slackport::config::{IngestConfig, ReplayConfig};
//!
//! let ingest = IngestConfig::new().with_default_channel("imported");
//! let replay = ReplayConfig::new()
//!     .with_concurrency(2)
//!     .with_thread_name("Slack thread");
//!
//! assert!(replay.validate().is_ok());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlackportError};
use crate::splitter::{CHUNK_SIZE, MESSAGE_LIMIT};

/// Configuration for reading an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Messages at or above this many characters are left unterminated for
    /// the splitter (default: 2000)
    pub split_threshold: usize,

    /// Parse files on the rayon pool (default: true)
    pub parallel: bool,

    /// Channel that receives date files found directly in the export root
    /// (default: "general")
    pub default_channel: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            split_threshold: MESSAGE_LIMIT,
            parallel: true,
            default_channel: "general".to_string(),
        }
    }
}

impl IngestConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_split_threshold(mut self, threshold: usize) -> Self {
        self.split_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    #[must_use]
    pub fn with_default_channel(mut self, name: impl Into<String>) -> Self {
        self.default_channel = name.into();
        self
    }
}

/// Configuration for replaying channels to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Messages at or above this many characters are split (default: 2000)
    pub split_threshold: usize,

    /// Size of each piece of a split message (default: 1800)
    pub chunk_size: usize,

    /// Maximum number of channels replayed at the same time (default: 1)
    pub concurrency: usize,

    /// Name given to threads opened on the destination
    pub thread_name: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            split_threshold: MESSAGE_LIMIT,
            chunk_size: CHUNK_SIZE,
            concurrency: 1,
            thread_name: "Slack Thread".to_string(),
        }
    }
}

impl ReplayConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_split_threshold(mut self, threshold: usize) -> Self {
        self.split_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets how many channels may be replayed concurrently.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Rejects values the replay engine cannot work with.
    ///
    /// Both the split threshold and a chunk plus its `"\n"` separator must
    /// fit in one destination post of [`MESSAGE_LIMIT`] characters.
    pub fn validate(&self) -> Result<()> {
        if self.split_threshold > MESSAGE_LIMIT {
            return Err(SlackportError::config(format!(
                "split_threshold ({}) must not exceed the {MESSAGE_LIMIT}-character post limit",
                self.split_threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(SlackportError::config("chunk_size must be at least 1"));
        }
        if self.chunk_size >= MESSAGE_LIMIT {
            return Err(SlackportError::config(format!(
                "chunk_size ({}) plus its separator must fit in {MESSAGE_LIMIT} characters",
                self.chunk_size
            )));
        }
        if self.chunk_size > self.split_threshold {
            return Err(SlackportError::config(format!(
                "chunk_size ({}) must not exceed split_threshold ({})",
                self.chunk_size, self.split_threshold
            )));
        }
        if self.concurrency == 0 {
            return Err(SlackportError::config("concurrency must be at least 1"));
        }
        let name_len = self.thread_name.chars().count();
        if name_len == 0 || name_len > 100 {
            return Err(SlackportError::config(
                "thread_name must be between 1 and 100 characters",
            ));
        }
        Ok(())
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Maps Slack channel names to destination channel ids.
///
/// Stored as a flat JSON object: `{"general": "1103748523431362580"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMap(BTreeMap<String, String>);

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.0.insert(name.into(), id.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
