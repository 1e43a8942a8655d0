//! Canonical message model.
//!
//! Every Slack record that survives normalization becomes a [`Message`]. The
//! message carries its own [`Role`], so the thread structure can never drift
//! out of step with the text it describes.
//!
//! # Examples
//!
//! ```
//! use slackport::message::{Channel, Message, Role};
//!
//! let mut channel = Channel::new("general");
//! channel.push(Message::new("01/01/2023 10:00 - alice: hi\n", Role::ThreadStart));
//! channel.push(Message::new("01/01/2023 10:01 - bob: hello\n", Role::ThreadReply));
//!
//! assert_eq!(channel.len(), 2);
//! assert_eq!(channel.messages()[1].sequence, 1);
//! ```

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thread role of a message, decided once at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A top-level post unrelated to threads.
    #[default]
    Normal,
    /// The root of a thread.
    ThreadStart,
    /// A reply belonging to the most recent thread root.
    ThreadReply,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Normal => write!(f, "normal"),
            Role::ThreadStart => write!(f, "thread start"),
            Role::ThreadReply => write!(f, "thread reply"),
        }
    }
}

/// A normalized message ready to be replayed.
///
/// | Field | Description |
/// |-------|-------------|
/// | `text` | Fully rendered post body, `"\n"`-terminated unless oversized |
/// | `role` | Thread role, see [`Role`] |
/// | `sequence` | Dense zero-based position within its channel |
/// | `source_file`, `source_ordinal` | Provenance, for diagnostics only |
/// | `author`, `timestamp`, `attachment` | Structured copies of what `text` renders |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,

    pub role: Role,

    /// Assigned by [`Channel::push`]; zero until the message joins a channel.
    #[serde(default)]
    pub sequence: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub source_file: Option<PathBuf>,

    /// Index of the record within its source file.
    #[serde(default)]
    pub source_ordinal: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Resolved attachment link, if the record carried a usable file.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub attachment: Option<String>,
}

impl Message {
    /// Creates a message with only text and role.
    pub fn new(text: impl Into<String>, role: Role) -> Self {
        Self {
            text: text.into(),
            role,
            sequence: 0,
            source_file: None,
            source_ordinal: 0,
            author: None,
            timestamp: None,
            attachment: None,
        }
    }

    /// Sets the source file and the record's index inside it.
    #[must_use]
    pub fn with_source(mut self, file: impl Into<PathBuf>, ordinal: usize) -> Self {
        self.source_file = Some(file.into());
        self.source_ordinal = ordinal;
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, link: impl Into<String>) -> Self {
        self.attachment = Some(link.into());
        self
    }

    /// Number of characters in the rendered text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Human-readable provenance, e.g. `general/2023-01-01.json#4`.
    pub fn provenance(&self) -> String {
        match &self.source_file {
            Some(path) => format!("{}#{}", path.display(), self.source_ordinal),
            None => format!("#{}", self.source_ordinal),
        }
    }
}

/// The ordered history of one destination channel.
///
/// Messages can only be appended; [`push`](Channel::push) assigns the next
/// sequence number so the sequence is always `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    messages: Vec<Message>,
}

impl Channel {
    /// Creates an empty channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// Appends a message, assigning it the next sequence number.
    pub fn push(&mut self, mut message: Message) {
        message.sequence = self.messages.len();
        self.messages.push(message);
    }

    /// Appends every message in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.push(message);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Checks that sequence numbers are dense and zero-based.
    ///
    /// Channels read back from a snapshot go through this before replay.
    pub fn has_dense_sequence(&self) -> bool {
        self.messages
            .iter()
            .enumerate()
            .all(|(i, m)| m.sequence == i)
    }

    /// Counts messages per role, as `(normal, thread_start, thread_reply)`.
    pub fn role_counts(&self) -> (usize, usize, usize) {
        self.messages
            .iter()
            .fold((0, 0, 0), |(n, s, r), m| match m.role {
                Role::Normal => (n + 1, s, r),
                Role::ThreadStart => (n, s + 1, r),
                Role::ThreadReply => (n, s, r + 1),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_dense_sequence() {
        let mut channel = Channel::new("general");
        for i in 0..5 {
            let mut msg = Message::new(format!("m{i}\n"), Role::Normal);
            msg.sequence = 99;
            channel.push(msg);
        }
        let sequences: Vec<usize> = channel.messages().iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(channel.has_dense_sequence());
    }

    #[test]
    fn test_role_counts() {
        let mut channel = Channel::new("general");
        channel.extend([
            Message::new("a", Role::ThreadStart),
            Message::new("b", Role::ThreadReply),
            Message::new("c", Role::ThreadReply),
            Message::new("d", Role::Normal),
        ]);
        assert_eq!(channel.role_counts(), (1, 1, 2));
    }

    #[test]
    fn test_provenance() {
        let msg = Message::new("x", Role::Normal).with_source("general/2023-01-01.json", 4);
        assert_eq!(msg.provenance(), "general/2023-01-01.json#4");
        assert_eq!(Message::new("x", Role::Normal).provenance(), "#0");
    }

    #[test]
    fn test_char_len_counts_scalars() {
        let msg = Message::new("привет", Role::Normal);
        assert_eq!(msg.char_len(), 6);
    }

    #[test]
    fn test_serialization_skips_empty_metadata() {
        let msg = Message::new("hi\n", Role::ThreadReply);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("thread_reply"));
        assert!(!json.contains("author"));
        assert!(!json.contains("attachment"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::ThreadStart.to_string(), "thread start");
        assert_eq!(Role::default(), Role::Normal);
    }
}
