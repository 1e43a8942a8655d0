//! In-memory transport that records every call.
//!
//! Used by tests and by library users who want to inspect what a replay
//! would do. Failures can be injected per post or per thread.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::transport::{ChannelRef, PostHandle, Target, ThreadHandle, Transport};
use crate::error::TransportError;

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// A post; `target` is the destination id (channel or thread).
    Post {
        channel: String,
        target: String,
        in_thread: bool,
        text: String,
        id: String,
    },
    /// A thread opened on the post `anchor`.
    OpenThread {
        channel: String,
        anchor: String,
        id: String,
    },
}

/// Transport that keeps everything in memory.
///
/// Channel ids are `"chan-<name>"`, post ids `"post-<n>"` and thread ids
/// `"thread-<n>"`, with `n` counted per kind across the whole transport.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    posts: AtomicUsize,
    threads: AtomicUsize,
    fail_posts_containing: Option<String>,
    fail_threads: bool,
    unknown_channels: HashSet<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every post whose text contains `needle`.
    #[must_use]
    pub fn failing_posts_containing(mut self, needle: impl Into<String>) -> Self {
        self.fail_posts_containing = Some(needle.into());
        self
    }

    /// Rejects every thread-open call.
    #[must_use]
    pub fn failing_threads(mut self) -> Self {
        self.fail_threads = true;
        self
    }

    /// Makes `name` unresolvable.
    #[must_use]
    pub fn without_channel(mut self, name: impl Into<String>) -> Self {
        self.unknown_channels.insert(name.into());
        self
    }

    /// All successful calls, in the order they happened.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    /// Successful posts for one channel, in order.
    pub fn posts_in(&self, channel: &str) -> Vec<Call> {
        self.lock()
            .iter()
            .filter(|c| matches!(c, Call::Post { channel: ch, .. } if ch == channel))
            .cloned()
            .collect()
    }

    /// Number of successful thread-open calls.
    pub fn threads_opened(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, Call::OpenThread { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
        // Recover the calls even if another test thread panicked holding the lock.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn resolve_channel(&self, name: &str) -> Result<ChannelRef, TransportError> {
        if self.unknown_channels.contains(name) {
            return Err(TransportError::UnknownChannel(name.to_string()));
        }
        Ok(ChannelRef::new(name, format!("chan-{name}")))
    }

    fn post_message(&self, target: Target<'_>, text: &str) -> Result<PostHandle, TransportError> {
        if let Some(needle) = &self.fail_posts_containing {
            if text.contains(needle.as_str()) {
                return Err(TransportError::Rejected(format!("post refused: {needle}")));
            }
        }
        let id = format!("post-{}", self.posts.fetch_add(1, Ordering::SeqCst) + 1);
        let (channel, in_thread) = match target {
            Target::Channel(channel) => (channel.name.clone(), false),
            Target::Thread(thread) => (thread.channel.name.clone(), true),
        };
        self.lock().push(Call::Post {
            channel,
            target: target.id().to_string(),
            in_thread,
            text: text.to_string(),
            id: id.clone(),
        });
        Ok(PostHandle::new(id))
    }

    fn open_thread(
        &self,
        channel: &ChannelRef,
        anchor: &PostHandle,
        _name: &str,
    ) -> Result<ThreadHandle, TransportError> {
        if self.fail_threads {
            return Err(TransportError::Rejected("thread creation disabled".into()));
        }
        let id = format!("thread-{}", self.threads.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock().push(Call::OpenThread {
            channel: channel.name.clone(),
            anchor: anchor.id.clone(),
            id: id.clone(),
        });
        Ok(ThreadHandle::new(id, channel.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_posts_and_threads() {
        let transport = RecordingTransport::new();
        let channel = transport.resolve_channel("general").unwrap();
        let post = transport.post_message(Target::Channel(&channel), "root\n").unwrap();
        let thread = transport.open_thread(&channel, &post, "t").unwrap();
        transport.post_message(Target::Thread(&thread), "reply\n").unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            Call::OpenThread {
                channel: "general".into(),
                anchor: "post-1".into(),
                id: "thread-1".into()
            }
        );
        assert!(matches!(&calls[2], Call::Post { in_thread: true, target, .. } if target == "thread-1"));
        assert_eq!(transport.posts_in("general").len(), 2);
    }

    #[test]
    fn test_injected_failures() {
        let transport = RecordingTransport::new()
            .failing_posts_containing("boom")
            .failing_threads()
            .without_channel("secret");

        assert!(transport.resolve_channel("secret").is_err());
        let channel = transport.resolve_channel("general").unwrap();
        assert!(transport.post_message(Target::Channel(&channel), "boom\n").is_err());
        let post = transport.post_message(Target::Channel(&channel), "ok\n").unwrap();
        assert!(transport.open_thread(&channel, &post, "t").is_err());
        assert_eq!(transport.calls().len(), 1);
    }
}
