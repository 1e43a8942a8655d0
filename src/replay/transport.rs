//! The destination seam.
//!
//! The replay engine never talks to the network itself; it drives a
//! [`Transport`]. Implementations decide how ids look and how rate limits are
//! honored.

use std::fmt;

use crate::error::TransportError;

/// A destination channel resolved from a source channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    /// Source channel name.
    pub name: String,
    /// Destination-side channel id.
    pub id: String,
}

impl ChannelRef {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// A post created on the destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostHandle {
    pub id: String,
}

impl PostHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A thread opened on the destination, with the channel it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle {
    pub id: String,
    pub channel: ChannelRef,
}

impl ThreadHandle {
    pub fn new(id: impl Into<String>, channel: ChannelRef) -> Self {
        Self {
            id: id.into(),
            channel,
        }
    }
}

/// Where a post goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Top level of a channel.
    Channel(&'a ChannelRef),
    /// Inside an open thread.
    Thread(&'a ThreadHandle),
}

impl Target<'_> {
    /// Destination id the post is sent to.
    pub fn id(&self) -> &str {
        match self {
            Target::Channel(channel) => &channel.id,
            Target::Thread(thread) => &thread.id,
        }
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Channel(channel) => write!(f, "#{}", channel.name),
            Target::Thread(thread) => write!(f, "#{} thread {}", thread.channel.name, thread.id),
        }
    }
}

/// Destination service operations used by replay.
///
/// Calls may block for as long as the destination needs; the engine holds no
/// locks across them. Implementations enforce the destination's own size and
/// rate limits.
pub trait Transport: Send + Sync {
    /// Short name used in logs (e.g. "Discord", "dry run").
    fn name(&self) -> &'static str;

    /// Maps a source channel name to an existing destination channel.
    fn resolve_channel(&self, name: &str) -> Result<ChannelRef, TransportError>;

    /// Creates one post.
    fn post_message(&self, target: Target<'_>, text: &str) -> Result<PostHandle, TransportError>;

    /// Opens a thread anchored on `anchor`, a post in `channel`.
    fn open_thread(
        &self,
        channel: &ChannelRef,
        anchor: &PostHandle,
        name: &str,
    ) -> Result<ThreadHandle, TransportError>;
}
