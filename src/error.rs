//! Unified error types for slackport.
//!
//! The crate separates errors by how far they are allowed to travel:
//!
//! - [`SlackportError`] - setup-level failures (unreadable directories, bad
//!   snapshots, bad configuration). These are the only errors that stop a run.
//! - [`SkipReason`] - a record that produced no message. Expected, not an error.
//! - [`IngestionFileError`] - one export file could not be ingested. The rest of
//!   the export is still processed.
//! - [`TransportError`] - the destination rejected one physical post. Replay
//!   continues with the next message.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A specialized [`Result`] type for slackport operations.
pub type Result<T> = std::result::Result<T, SlackportError>;

/// The error type for operations that abort a command.
///
/// Per-record, per-file and per-post problems never surface here; they are
/// contained by [`SkipReason`], [`IngestionFileError`] and [`TransportError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SlackportError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The export directory does not exist or is not a directory.
    #[error("Export directory not found: {}", path.display())]
    ExportNotFound {
        /// The path that was given
        path: PathBuf,
    },

    /// A snapshot file could not be read back.
    #[error("Invalid snapshot{}: {message}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    InvalidSnapshot {
        /// Description of what's wrong
        message: String,
        /// The snapshot path, if available
        path: Option<PathBuf>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The destination could not be set up (authentication, client creation).
    #[error("Destination setup failed: {0}")]
    Setup(#[source] TransportError),
}

impl SlackportError {
    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        SlackportError::InvalidSnapshot {
            message: message.into(),
            path,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SlackportError::Config(message.into())
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, SlackportError::Io(_))
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, SlackportError::Config(_))
    }
}

// ============================================================================
// Record skips
// ============================================================================

/// Why a record did not produce a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No author/text pair and no usable attachment.
    NoContent,
    /// The record is not a JSON object.
    NotAnObject,
    /// Author and text are present but `ts` is missing or not a number.
    InvalidTimestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoContent => write!(f, "no renderable content"),
            SkipReason::NotAnObject => write!(f, "record is not a JSON object"),
            SkipReason::InvalidTimestamp => write!(f, "missing or invalid timestamp"),
        }
    }
}

// ============================================================================
// Ingestion file errors
// ============================================================================

/// One export file that could not be ingested.
#[derive(Debug, Error)]
#[error("Skipped {}: {kind}", path.display())]
pub struct IngestionFileError {
    /// The offending file or channel directory
    pub path: PathBuf,
    /// What went wrong
    #[source]
    pub kind: IngestErrorKind,
}

/// Kinds of per-file ingestion failures.
#[derive(Debug, Error)]
pub enum IngestErrorKind {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON is valid but not an array of records
    #[error("expected a JSON array of records")]
    NotAnArray,
    /// The filename is not a `YYYY-MM-DD` date
    #[error("invalid file date '{0}'. Expected format: YYYY-MM-DD")]
    InvalidDate(String),
}

impl IngestionFileError {
    pub fn new(path: impl AsRef<Path>, kind: impl Into<IngestErrorKind>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind: kind.into(),
        }
    }

    /// Returns `true` if the file was rejected because of its name.
    pub fn is_invalid_date(&self) -> bool {
        matches!(self.kind, IngestErrorKind::InvalidDate(_))
    }
}

// ============================================================================
// Transport errors
// ============================================================================

/// The destination failed to deliver one post or open one thread.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request never completed (connection, timeout, TLS).
    #[error("request failed: {0}")]
    Http(String),

    /// The destination answered with a non-success status.
    #[error("destination returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// The destination refused the action outright.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// No destination channel is known for a source channel name.
    #[error("no destination channel for '{0}'")]
    UnknownChannel(String),
}

impl TransportError {
    /// Returns `true` if the destination asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::Status { status: 429, .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
