//! Replaying normalized channels to a destination.
//!
//! - [`engine`] - the per-channel thread state machine
//! - [`transport`] - the [`Transport`] seam and its handle types
//! - [`dry_run`] - prints what would be sent
//! - [`memory`] - records calls in memory
//! - `discord` - Discord REST transport (feature `discord`)

pub mod dry_run;
pub mod engine;
pub mod memory;
pub mod transport;

#[cfg(feature = "discord")]
pub mod discord;

pub use dry_run::DryRunTransport;
pub use engine::{CancelToken, ChannelReport, ReplaySummary, Replayer, ThreadState, planned_posts};
pub use memory::{Call, RecordingTransport};
pub use transport::{ChannelRef, PostHandle, Target, ThreadHandle, Transport};

#[cfg(feature = "discord")]
pub use discord::DiscordTransport;
