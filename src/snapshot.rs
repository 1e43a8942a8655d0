//! Ingestion snapshots.
//!
//! `slackport ingest` writes the normalized channels to a JSON file so that
//! `slackport replay` can send them later without reading the export again.
//!
//! # Format
//! ```json
//! {
//!   "version": 1,
//!   "channels": [
//!     {"name": "general", "messages": [{"text": "...", "role": "thread_start", "sequence": 0}]}
//!   ]
//! }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlackportError};
use crate::message::Channel;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Normalized channels as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub channels: Vec<Channel>,
}

impl Snapshot {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            channels,
        }
    }

    /// Total number of messages.
    pub fn message_count(&self) -> usize {
        self.channels.iter().map(Channel::len).sum()
    }

    /// Serializes to a pretty JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a snapshot, rejecting unknown versions and broken sequences.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Self = serde_json::from_reader(reader).map_err(|e| {
            SlackportError::invalid_snapshot(e.to_string(), Some(path.to_path_buf()))
        })?;
        snapshot.validate().map_err(|e| match e {
            SlackportError::InvalidSnapshot { message, .. } => {
                SlackportError::invalid_snapshot(message, Some(path.to_path_buf()))
            }
            other => other,
        })?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SlackportError::invalid_snapshot(
                format!("unsupported version {}", self.version),
                None,
            ));
        }
        for channel in &self.channels {
            if !channel.has_dense_sequence() {
                return Err(SlackportError::invalid_snapshot(
                    format!("channel '{}' has gaps in its message sequence", channel.name),
                    None,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Role};
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let mut channel = Channel::new("general");
        channel.push(Message::new("root\n", Role::ThreadStart).with_author("alice"));
        channel.push(Message::new("reply\n", Role::ThreadReply));
        Snapshot::new(vec![channel])
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = sample();

        snapshot.write(&path).unwrap();
        let back = Snapshot::read(&path).unwrap();

        assert_eq!(back, snapshot);
        assert_eq!(back.message_count(), 2);
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"version\": 1"));
        assert!(json.contains("\"role\": \"thread_start\""));
    }

    #[test]
    fn test_rejects_sequence_gap() {
        let json = r#"{"version": 1, "channels": [{"name": "general", "messages": [
            {"text": "a\n", "role": "normal", "sequence": 0},
            {"text": "b\n", "role": "normal", "sequence": 2}
        ]}]}"#;
        let err = Snapshot::from_json(json).unwrap_err();
        assert!(matches!(err, SlackportError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = Snapshot::from_json(r#"{"version": 9, "channels": []}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported version 9"));
    }

    #[test]
    fn test_read_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Snapshot::read(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
