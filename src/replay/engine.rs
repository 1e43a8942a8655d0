//! The replay state machine.
//!
//! Each channel is replayed strictly in sequence order with one piece of
//! state, the currently open thread:
//!
//! | role | no open thread | open thread `h` |
//! |------|----------------|-----------------|
//! | `Normal` | top-level post | top-level post, `h` stays open |
//! | `ThreadStart` | top-level post, open thread on it | same; the new thread replaces `h` |
//! | `ThreadReply` | top-level post + fallback warning | post into `h` |
//!
//! Text at or above the split threshold is posted as several chunks. Only the
//! first chunk of a `ThreadStart` anchors the thread; the remaining chunks go
//! into it. A failed post is logged and counted, and replay moves on.
//!
//! Channels are independent and may be replayed concurrently on a bounded
//! rayon pool; messages within a channel never are.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{error, info, warn};

use super::transport::{ChannelRef, PostHandle, Target, ThreadHandle, Transport};
use crate::config::ReplayConfig;
use crate::error::Result;
use crate::message::{Channel, Message, Role};
use crate::progress::{ProgressCallback, ProgressCounter, no_progress};
use crate::splitter::{needs_split, post_count, split};

/// Cooperative cancellation for a whole run.
///
/// Checked before each message; a message whose first post has been issued
/// is always finished.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Thread state of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    NoActiveThread,
    ActiveThread(ThreadHandle),
}

impl ThreadState {
    fn handle(&self) -> Option<&ThreadHandle> {
        match self {
            ThreadState::NoActiveThread => None,
            ThreadState::ActiveThread(handle) => Some(handle),
        }
    }
}

/// Outcome of replaying one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: String,
    /// Messages whose delivery was started.
    pub messages: usize,
    /// Physical posts accepted by the destination.
    pub posts: usize,
    /// Physical posts the destination rejected.
    pub failed_posts: usize,
    /// Replies posted top-level because no thread was open.
    pub fallbacks: usize,
    pub threads_opened: usize,
    pub thread_failures: usize,
    /// The channel could not be resolved on the destination; nothing was sent.
    pub unresolved: bool,
    /// Replay stopped early because the run was cancelled.
    pub cancelled: bool,
}

/// Outcome of a whole replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// One report per channel, in input order.
    pub channels: Vec<ChannelReport>,
}

impl ReplaySummary {
    pub fn posts(&self) -> usize {
        self.channels.iter().map(|c| c.posts).sum()
    }

    pub fn failed_posts(&self) -> usize {
        self.channels.iter().map(|c| c.failed_posts).sum()
    }

    pub fn fallbacks(&self) -> usize {
        self.channels.iter().map(|c| c.fallbacks).sum()
    }

    pub fn threads_opened(&self) -> usize {
        self.channels.iter().map(|c| c.threads_opened).sum()
    }

    pub fn thread_failures(&self) -> usize {
        self.channels.iter().map(|c| c.thread_failures).sum()
    }

    pub fn unresolved_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.unresolved).count()
    }

    pub fn cancelled(&self) -> bool {
        self.channels.iter().any(|c| c.cancelled)
    }
}

/// Number of physical posts replaying `channels` takes.
pub fn planned_posts(channels: &[Channel], config: &ReplayConfig) -> usize {
    channels
        .iter()
        .flat_map(Channel::messages)
        .map(|m| post_count(&m.text, config.split_threshold, config.chunk_size))
        .sum()
}

/// Replays channels to a transport.
///
/// ```
/// use slackport::config::ReplayConfig;
/// use slackport::message::{Channel, Message, Role};
/// use slackport::replay::{RecordingTransport, Replayer};
///
/// let mut channel = Channel::new("general");
/// channel.push(Message::new("root\n", Role::ThreadStart));
/// channel.push(Message::new("reply\n", Role::ThreadReply));
///
/// let transport = RecordingTransport::new();
/// let config = ReplayConfig::default();
/// let summary = Replayer::new(&transport, &config).replay(&[channel])?;
///
/// assert_eq!(summary.posts(), 2);
/// assert_eq!(summary.threads_opened(), 1);
/// # Ok::<(), slackport::SlackportError>(())
/// ```
pub struct Replayer<'a> {
    transport: &'a dyn Transport,
    config: &'a ReplayConfig,
    progress: ProgressCallback,
    cancel: CancelToken,
}

impl<'a> Replayer<'a> {
    pub fn new(transport: &'a dyn Transport, config: &'a ReplayConfig) -> Self {
        Self {
            transport,
            config,
            progress: no_progress(),
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replays every channel, up to `config.concurrency` at a time.
    ///
    /// Only an invalid configuration is an error; per-post failures end up
    /// in the summary.
    pub fn replay(&self, channels: &[Channel]) -> Result<ReplaySummary> {
        self.config.validate()?;
        let counter = ProgressCounter::new(
            planned_posts(channels, self.config),
            Arc::clone(&self.progress),
        );

        info!(
            transport = self.transport.name(),
            channels = channels.len(),
            posts = counter.total(),
            "starting replay"
        );

        let reports: Vec<ChannelReport> = if self.config.concurrency <= 1 || channels.len() <= 1 {
            channels
                .iter()
                .map(|c| self.replay_channel(c, &counter))
                .collect()
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.concurrency)
                .thread_name(|i| format!("replay-{i}"))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    channels
                        .par_iter()
                        .map(|c| self.replay_channel(c, &counter))
                        .collect()
                }),
                Err(e) => {
                    warn!("Failed to create replay pool: {e}. Replaying sequentially.");
                    channels
                        .iter()
                        .map(|c| self.replay_channel(c, &counter))
                        .collect()
                }
            }
        };

        Ok(ReplaySummary { channels: reports })
    }

    /// Replays one channel in sequence order.
    pub fn replay_channel(&self, channel: &Channel, progress: &ProgressCounter) -> ChannelReport {
        let mut report = ChannelReport {
            channel: channel.name.clone(),
            ..ChannelReport::default()
        };

        let destination = match self.transport.resolve_channel(&channel.name) {
            Ok(destination) => destination,
            Err(e) => {
                error!(channel = %channel.name, error = %e, "cannot resolve destination channel, skipping");
                report.unresolved = true;
                return report;
            }
        };

        info!(channel = %channel.name, messages = channel.len(), "replaying channel");

        let mut state = ThreadState::NoActiveThread;
        for message in channel.messages() {
            if self.cancel.is_cancelled() {
                warn!(channel = %channel.name, at = message.sequence, "replay cancelled");
                report.cancelled = true;
                break;
            }
            self.deliver(message, &destination, &mut state, &mut report, progress);
            report.messages += 1;
        }

        info!(
            channel = %channel.name,
            posts = report.posts,
            failed = report.failed_posts,
            fallbacks = report.fallbacks,
            threads = report.threads_opened,
            "finished channel"
        );
        report
    }

    /// Delivers one message according to its role and the thread state.
    fn deliver(
        &self,
        message: &Message,
        channel: &ChannelRef,
        state: &mut ThreadState,
        report: &mut ChannelReport,
        progress: &ProgressCounter,
    ) {
        let pieces = self.pieces(message);

        match message.role {
            Role::Normal => {
                for piece in &pieces {
                    self.post(Target::Channel(channel), piece, message, report, progress);
                }
            }
            Role::ThreadReply => {
                let target = match state.handle() {
                    Some(handle) => Target::Thread(handle),
                    None => {
                        warn!(
                            channel = %channel.name,
                            source = %message.provenance(),
                            "export marks a thread reply but no thread is open; posting as a normal message"
                        );
                        report.fallbacks += 1;
                        Target::Channel(channel)
                    }
                };
                for piece in &pieces {
                    self.post(target, piece, message, report, progress);
                }
            }
            Role::ThreadStart => {
                *state = ThreadState::NoActiveThread;
                let mut pieces = pieces.iter();
                if let Some(first) = pieces.next() {
                    let anchor = self.post(Target::Channel(channel), first, message, report, progress);
                    if let Some(anchor) = anchor {
                        self.open_thread(channel, &anchor, message, state, report);
                    }
                }
                for piece in pieces {
                    let target = state
                        .handle()
                        .map_or(Target::Channel(channel), Target::Thread);
                    self.post(target, piece, message, report, progress);
                }
            }
        }
    }

    /// The physical posts a message turns into.
    fn pieces<'m>(&self, message: &'m Message) -> Vec<Cow<'m, str>> {
        if needs_split(&message.text, self.config.split_threshold) {
            split(&message.text, self.config.chunk_size)
                .map(|chunk| Cow::Owned(format!("{chunk}\n")))
                .collect()
        } else {
            vec![Cow::Borrowed(message.text.as_str())]
        }
    }

    fn post(
        &self,
        target: Target<'_>,
        text: &str,
        message: &Message,
        report: &mut ChannelReport,
        progress: &ProgressCounter,
    ) -> Option<PostHandle> {
        let result = self.transport.post_message(target, text);
        progress.advance();
        match result {
            Ok(handle) => {
                report.posts += 1;
                Some(handle)
            }
            Err(e) => {
                error!(
                    destination = %target,
                    source = %message.provenance(),
                    error = %e,
                    "post failed, continuing"
                );
                report.failed_posts += 1;
                None
            }
        }
    }

    fn open_thread(
        &self,
        channel: &ChannelRef,
        anchor: &PostHandle,
        message: &Message,
        state: &mut ThreadState,
        report: &mut ChannelReport,
    ) {
        match self
            .transport
            .open_thread(channel, anchor, &self.config.thread_name)
        {
            Ok(handle) => {
                report.threads_opened += 1;
                *state = ThreadState::ActiveThread(handle);
            }
            Err(e) => {
                error!(
                    channel = %channel.name,
                    source = %message.provenance(),
                    error = %e,
                    "could not open thread; its replies will be posted top-level"
                );
                report.thread_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::replay::memory::{Call, RecordingTransport};

    fn channel(roles: &[Role]) -> Channel {
        let mut channel = Channel::new("general");
        for (i, role) in roles.iter().enumerate() {
            channel.push(Message::new(format!("m{i}\n"), *role));
        }
        channel
    }

    fn run(transport: &RecordingTransport, channels: &[Channel]) -> ReplaySummary {
        let config = ReplayConfig::default();
        Replayer::new(transport, &config).replay(channels).unwrap()
    }

    /// `(text, destination id)` of every post, in order.
    fn posts(transport: &RecordingTransport) -> Vec<(String, String)> {
        transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post { text, target, .. } => Some((text, target)),
                Call::OpenThread { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_normal_does_not_close_thread() {
        let transport = RecordingTransport::new();
        let summary = run(
            &transport,
            &[channel(&[
                Role::ThreadStart,
                Role::ThreadReply,
                Role::ThreadReply,
                Role::Normal,
                Role::ThreadReply,
            ])],
        );

        let posts = posts(&transport);
        assert_eq!(posts[0], ("m0\n".into(), "chan-general".into()));
        assert_eq!(posts[1], ("m1\n".into(), "thread-1".into()));
        assert_eq!(posts[2], ("m2\n".into(), "thread-1".into()));
        assert_eq!(posts[3], ("m3\n".into(), "chan-general".into()));
        assert_eq!(posts[4], ("m4\n".into(), "thread-1".into()));
        assert_eq!(summary.threads_opened(), 1);
        assert_eq!(summary.fallbacks(), 0);
    }

    #[test]
    fn test_orphan_reply_falls_back() {
        let transport = RecordingTransport::new();
        let summary = run(&transport, &[channel(&[Role::ThreadReply])]);

        assert_eq!(posts(&transport), vec![("m0\n".to_string(), "chan-general".to_string())]);
        assert_eq!(summary.fallbacks(), 1);
        assert_eq!(transport.threads_opened(), 0);
    }

    #[test]
    fn test_new_thread_start_replaces_handle() {
        let transport = RecordingTransport::new();
        run(
            &transport,
            &[channel(&[Role::ThreadStart, Role::ThreadReply, Role::ThreadStart, Role::ThreadReply])],
        );
        let targets: Vec<String> = posts(&transport).into_iter().map(|(_, t)| t).collect();
        assert_eq!(targets, vec!["chan-general", "thread-1", "chan-general", "thread-2"]);
    }

    #[test]
    fn test_split_thread_start_opens_thread_once() {
        let mut ch = Channel::new("general");
        ch.push(Message::new("a".repeat(4000), Role::ThreadStart));
        ch.push(Message::new("reply\n", Role::ThreadReply));

        let transport = RecordingTransport::new();
        let summary = run(&transport, &[ch]);

        let posts = posts(&transport);
        assert_eq!(posts.len(), 4);
        assert_eq!(posts[0].1, "chan-general");
        assert_eq!(posts[0].0.chars().count(), 1801);
        assert!(posts[0].0.ends_with('\n'));
        assert_eq!(posts[1].1, "thread-1");
        assert_eq!(posts[2].1, "thread-1");
        assert_eq!(posts[2].0, format!("{}\n", "a".repeat(400)));
        assert_eq!(posts[3], ("reply\n".to_string(), "thread-1".to_string()));
        assert_eq!(transport.threads_opened(), 1);
        assert_eq!(summary.posts(), 4);
    }

    #[test]
    fn test_split_orphan_reply_counts_one_fallback() {
        let mut ch = Channel::new("general");
        ch.push(Message::new("b".repeat(3700), Role::ThreadReply));

        let transport = RecordingTransport::new();
        let summary = run(&transport, &[ch]);

        assert_eq!(summary.posts(), 3);
        assert_eq!(summary.fallbacks(), 1);
        assert!(posts(&transport).iter().all(|(_, t)| t == "chan-general"));
    }

    #[test]
    fn test_failed_post_does_not_stop_channel() {
        let mut ch = Channel::new("general");
        ch.push(Message::new("ok 1\n", Role::Normal));
        ch.push(Message::new("boom\n", Role::Normal));
        ch.push(Message::new("ok 2\n", Role::Normal));

        let transport = RecordingTransport::new().failing_posts_containing("boom");
        let summary = run(&transport, &[ch]);

        assert_eq!(summary.posts(), 2);
        assert_eq!(summary.failed_posts(), 1);
        assert_eq!(summary.channels[0].messages, 3);
    }

    #[test]
    fn test_failed_root_post_clears_thread() {
        let mut ch = Channel::new("general");
        ch.push(Message::new("first root\n", Role::ThreadStart));
        ch.push(Message::new("boom root\n", Role::ThreadStart));
        ch.push(Message::new("reply\n", Role::ThreadReply));

        let transport = RecordingTransport::new().failing_posts_containing("boom");
        let summary = run(&transport, &[ch]);

        let last = posts(&transport).pop().unwrap();
        assert_eq!(last, ("reply\n".to_string(), "chan-general".to_string()));
        assert_eq!(summary.fallbacks(), 1);
    }

    #[test]
    fn test_thread_open_failure_falls_back() {
        let transport = RecordingTransport::new().failing_threads();
        let summary = run(&transport, &[channel(&[Role::ThreadStart, Role::ThreadReply])]);

        assert_eq!(summary.channels[0].thread_failures, 1);
        assert_eq!(summary.thread_failures(), 1);
        assert_eq!(summary.fallbacks(), 1);
        assert_eq!(summary.posts(), 2);
    }

    #[test]
    fn test_unresolved_channel_is_skipped() {
        let mut other = channel(&[Role::Normal]);
        other.name = "random".into();
        let transport = RecordingTransport::new().without_channel("general");
        let summary = run(&transport, &[channel(&[Role::Normal]), other]);

        assert!(summary.channels[0].unresolved);
        assert_eq!(summary.channels[1].posts, 1);
        assert_eq!(summary.unresolved_channels(), 1);
    }

    #[test]
    fn test_thread_state_is_per_channel() {
        let mut second = channel(&[Role::ThreadReply]);
        second.name = "random".into();
        let transport = RecordingTransport::new();
        let summary = run(&transport, &[channel(&[Role::ThreadStart]), second]);

        assert_eq!(summary.channels[1].fallbacks, 1);
        assert_eq!(transport.posts_in("random").len(), 1);
    }

    #[test]
    fn test_cancel_before_start() {
        let transport = RecordingTransport::new();
        let config = ReplayConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let summary = Replayer::new(&transport, &config)
            .with_cancel(cancel)
            .replay(&[channel(&[Role::Normal, Role::Normal])])
            .unwrap();

        assert!(summary.cancelled());
        assert_eq!(summary.posts(), 0);
        assert!(transport.calls().is_empty());
    }

    /// Cancels the run from inside its first post.
    struct CancelOnFirstPost {
        inner: RecordingTransport,
        cancel: CancelToken,
    }

    impl Transport for CancelOnFirstPost {
        fn name(&self) -> &'static str {
            "cancel on first post"
        }

        fn resolve_channel(&self, name: &str) -> std::result::Result<ChannelRef, TransportError> {
            self.inner.resolve_channel(name)
        }

        fn post_message(
            &self,
            target: Target<'_>,
            text: &str,
        ) -> std::result::Result<PostHandle, TransportError> {
            self.cancel.cancel();
            self.inner.post_message(target, text)
        }

        fn open_thread(
            &self,
            channel: &ChannelRef,
            anchor: &PostHandle,
            name: &str,
        ) -> std::result::Result<ThreadHandle, TransportError> {
            self.inner.open_thread(channel, anchor, name)
        }
    }

    #[test]
    fn test_cancel_mid_message_finishes_its_chunks() {
        let mut ch = Channel::new("general");
        ch.push(Message::new("a".repeat(4000), Role::Normal));
        ch.push(Message::new("after\n", Role::Normal));

        let cancel = CancelToken::new();
        let transport = CancelOnFirstPost {
            inner: RecordingTransport::new(),
            cancel: cancel.clone(),
        };
        let config = ReplayConfig::default();
        let summary = Replayer::new(&transport, &config)
            .with_cancel(cancel)
            .replay(&[ch])
            .unwrap();

        let texts: Vec<String> = posts(&transport.inner).into_iter().map(|(text, _)| text).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts.iter().all(|t| t.starts_with('a') && t.ends_with('\n')));
        assert!(!texts.iter().any(|t| t == "after\n"));

        let report = &summary.channels[0];
        assert!(report.cancelled);
        assert_eq!(report.messages, 1);
        assert_eq!(report.posts, 3);
    }

    #[test]
    fn test_progress_reaches_planned_total() {
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut ch = channel(&[Role::Normal, Role::ThreadStart]);
        ch.push(Message::new("c".repeat(2000), Role::ThreadReply));

        let transport = RecordingTransport::new();
        let config = ReplayConfig::default();
        Replayer::new(&transport, &config)
            .with_progress(Arc::new(move |p| sink.lock().unwrap().push((p.current, p.total))))
            .replay(&[ch])
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_concurrent_channels_keep_their_order() {
        let channels: Vec<Channel> = (0..4)
            .map(|n| {
                let mut ch = Channel::new(format!("ch{n}"));
                for i in 0..20 {
                    ch.push(Message::new(format!("{n}-{i}\n"), Role::Normal));
                }
                ch
            })
            .collect();

        let transport = RecordingTransport::new();
        let config = ReplayConfig::default().with_concurrency(3);
        let summary = Replayer::new(&transport, &config).replay(&channels).unwrap();

        assert_eq!(summary.posts(), 80);
        for n in 0..4 {
            let texts: Vec<String> = transport
                .posts_in(&format!("ch{n}"))
                .into_iter()
                .filter_map(|c| match c {
                    Call::Post { text, .. } => Some(text),
                    Call::OpenThread { .. } => None,
                })
                .collect();
            let expected: Vec<String> = (0..20).map(|i| format!("{n}-{i}\n")).collect();
            assert_eq!(texts, expected);
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let transport = RecordingTransport::new();
        let config = ReplayConfig::default().with_concurrency(0);
        assert!(Replayer::new(&transport, &config).replay(&[]).is_err());
    }
}
