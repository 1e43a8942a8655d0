//! Transport that prints what would be sent instead of sending it.

use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::transport::{ChannelRef, PostHandle, Target, ThreadHandle, Transport};
use crate::config::ChannelMap;
use crate::error::TransportError;

/// Writes every post and thread action as a line of text.
///
/// Channels resolve through the optional [`ChannelMap`]; unmapped channels
/// use their own name as id, so a dry run works without any destination
/// setup.
pub struct DryRunTransport {
    out: Mutex<Box<dyn Write + Send>>,
    channels: ChannelMap,
    next_id: AtomicUsize,
}

impl DryRunTransport {
    /// Prints to stdout.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            channels: ChannelMap::new(),
            next_id: AtomicUsize::new(1),
        }
    }

    #[must_use]
    pub fn with_channels(mut self, channels: ChannelMap) -> Self {
        self.channels = channels;
        self
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn emit(&self, line: &str) -> Result<(), TransportError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::Rejected("output writer poisoned".into()))?;
        writeln!(out, "{line}").map_err(|e| TransportError::Http(e.to_string()))
    }
}

impl Default for DryRunTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DryRunTransport {
    fn name(&self) -> &'static str {
        "dry run"
    }

    fn resolve_channel(&self, name: &str) -> Result<ChannelRef, TransportError> {
        let id = self.channels.get(name).unwrap_or(name);
        Ok(ChannelRef::new(name, id))
    }

    fn post_message(&self, target: Target<'_>, text: &str) -> Result<PostHandle, TransportError> {
        let id = self.next_id("post");
        self.emit(&format!("[{target}] {}", text.trim_end()))?;
        Ok(PostHandle::new(id))
    }

    fn open_thread(
        &self,
        channel: &ChannelRef,
        anchor: &PostHandle,
        name: &str,
    ) -> Result<ThreadHandle, TransportError> {
        let id = self.next_id("thread");
        self.emit(&format!("[#{}] opened thread '{name}' ({id}) on {}", channel.name, anchor.id))?;
        Ok(ThreadHandle::new(id, channel.clone()))
    }
}
