//! Property-based tests for slackport.
//!
//! These tests generate random inputs to find edge cases.

use proptest::prelude::*;
use serde_json::json;

use slackport::parsing::{RawRecord, classify, dedupe_links, normalize};
use slackport::splitter::{CHUNK_SIZE, MESSAGE_LIMIT, char_len, needs_split, post_count, split};
use slackport::{Channel, Message, ReplayConfig, Role};
use slackport::replay::{Call, RecordingTransport, Replayer};

/// Text mixing ASCII, multi-byte characters and newlines.
fn arb_text(max_chars: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!['a', 'z', ' ', '\n', 'é', 'Ж', '😀', '|', '<', '>']),
        0..max_chars,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::Normal, Role::ThreadStart, Role::ThreadReply])
}

proptest! {
    #[test]
    fn split_concatenates_back(text in arb_text(5000), limit in 1usize..2500) {
        let joined: String = split(&text, limit).collect();
        prop_assert_eq!(joined, text);
    }

    #[test]
    fn chunks_respect_limit(text in arb_text(5000), limit in 1usize..2500) {
        let chunks: Vec<&str> = split(&text, limit).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let len = char_len(chunk);
            prop_assert!(len <= limit);
            prop_assert!(len > 0);
            if i + 1 < chunks.len() {
                prop_assert_eq!(len, limit);
            }
        }
    }

    #[test]
    fn chunk_count_is_ceiling(text in arb_text(5000), limit in 1usize..2500) {
        prop_assert_eq!(split(&text, limit).count(), char_len(&text).div_ceil(limit));
    }

    #[test]
    fn resplitting_chunks_is_identity(text in arb_text(4000)) {
        for chunk in split(&text, CHUNK_SIZE) {
            let again: Vec<&str> = split(chunk, CHUNK_SIZE).collect();
            prop_assert_eq!(again, vec![chunk]);
        }
    }

    #[test]
    fn split_posts_fit_destination(text in arb_text(6000)) {
        if needs_split(&text, MESSAGE_LIMIT) {
            for chunk in split(&text, CHUNK_SIZE) {
                prop_assert!(char_len(chunk) + 1 < MESSAGE_LIMIT);
            }
        }
    }

    #[test]
    fn classify_is_a_pure_function(thread_ts: bool, reply_count: bool) {
        let role = classify(thread_ts, reply_count);
        prop_assert_eq!(role, classify(thread_ts, reply_count));
        prop_assert_eq!(role == Role::Normal, !thread_ts);
        prop_assert_eq!(role == Role::ThreadStart, thread_ts && reply_count);
    }

    #[test]
    fn dedupe_leaves_pipeless_text_alone(text in "[a-z <>&;:/.]{0,80}") {
        prop_assert_eq!(dedupe_links(&text), text);
    }

    #[test]
    fn normalized_text_is_terminated_below_limit(body in arb_text(2200)) {
        let raw = RawRecord::from_value(json!({
            "text": body,
            "ts": "1672574400.000200",
            "user_profile": {"display_name": "alice"}
        }))
        .unwrap();

        if let Ok(message) = normalize(&raw) {
            let len = char_len(&message.text);
            prop_assert!(message.text.ends_with('\n') || len >= MESSAGE_LIMIT);
            prop_assert_eq!(message.text.ends_with('\n'), !needs_split(&message.text, MESSAGE_LIMIT));
            prop_assert!(message.text.starts_with("01/01/2023 12:00 - alice: "));
        }
    }

    #[test]
    fn replay_posts_planned_count(
        entries in prop::collection::vec((arb_role(), 1usize..4500), 0..12)
    ) {
        let mut channel = Channel::new("general");
        for (role, len) in &entries {
            channel.push(Message::new("m".repeat(*len), *role));
        }

        let transport = RecordingTransport::new();
        let config = ReplayConfig::default();
        let summary = Replayer::new(&transport, &config).replay(&[channel.clone()]).unwrap();

        let expected: usize = channel
            .messages()
            .iter()
            .map(|m| post_count(&m.text, MESSAGE_LIMIT, CHUNK_SIZE))
            .sum();
        prop_assert_eq!(summary.posts(), expected);

        let starts = entries.iter().filter(|(r, _)| *r == Role::ThreadStart).count();
        let opened = transport
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::OpenThread { .. }))
            .count();
        prop_assert_eq!(opened, starts);
    }
}
