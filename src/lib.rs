//! # Slackport
//!
//! Imports a Slack workspace export into Discord, keeping thread structure.
//!
//! ## Overview
//!
//! A run has two phases:
//!
//! 1. **Ingestion** - every `YYYY-MM-DD.json` file of the export is parsed,
//!    each record is normalized into a [`Message`] with its thread [`Role`],
//!    and messages are appended to their [`Channel`] in date order.
//! 2. **Replay** - each channel is sent to a [`Transport`] in order. A
//!    `ThreadStart` opens a thread, replies go into it, and oversized text is
//!    split into several posts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slackport::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let ingestion = ingest_dir("slack_export", &IngestConfig::default())?;
//!     let channels = ingestion.into_channels();
//!
//!     let transport = DryRunTransport::new();
//!     let config = ReplayConfig::default();
//!     let summary = Replayer::new(&transport, &config).replay(&channels)?;
//!
//!     println!("{} posts, {} failed", summary.posts(), summary.failed_posts());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`parsing`] - single-record normalization
//!   - [`RawRecord`](parsing::RawRecord), [`normalize`](parsing::normalize),
//!     [`classify`](parsing::classify), [`dedupe_links`](parsing::dedupe_links)
//! - [`splitter`] - splitting text into post-sized chunks
//! - [`ingest`] - export discovery and ordered ingestion
//! - [`replay`] - the replay engine and its transports
//! - [`snapshot`] - JSON persistence of ingested channels
//! - [`config`] - [`IngestConfig`], [`ReplayConfig`], [`ChannelMap`]
//! - [`progress`] - progress reporting
//! - [`error`] - error types ([`SlackportError`], [`Result`])
//! - `cli` - command-line arguments (feature `cli`)
//! - [`prelude`] - convenient re-exports
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `discord` | Discord REST transport (`reqwest`) |
//! | `cli` | The `slackport` binary |
//! | `full` | Everything (default) |

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod message;
pub mod parsing;
pub mod progress;
pub mod replay;
pub mod snapshot;
pub mod splitter;

pub use config::{ChannelMap, IngestConfig, ReplayConfig};
pub use error::{Result, SlackportError};
pub use message::{Channel, Message, Role};
pub use replay::Transport;

/// Convenient re-exports for common usage.
///
/// ```rust
/// use slackport::prelude::*;
/// ```
pub mod prelude {
    pub use crate::message::{Channel, Message, Role};

    pub use crate::error::{IngestionFileError, Result, SkipReason, SlackportError, TransportError};

    pub use crate::config::{ChannelMap, IngestConfig, ReplayConfig};

    pub use crate::parsing::{RawRecord, classify, normalize};

    pub use crate::splitter::{CHUNK_SIZE, MESSAGE_LIMIT, split};

    pub use crate::ingest::{Discovery, ExportFile, Ingestion, discover, ingest, ingest_dir};

    pub use crate::replay::{
        CancelToken, DryRunTransport, RecordingTransport, ReplaySummary, Replayer, Transport,
    };

    #[cfg(feature = "discord")]
    pub use crate::replay::DiscordTransport;

    pub use crate::progress::{Progress, ProgressCallback};

    pub use crate::snapshot::Snapshot;
}
