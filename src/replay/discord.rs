//! Discord REST transport.
//!
//! Uses the bot token REST API directly:
//!
//! | Action | Request |
//! |--------|---------|
//! | post | `POST /channels/{channel or thread id}/messages` |
//! | open thread | `POST /channels/{channel id}/messages/{message id}/threads` |
//! | verify token | `GET /users/@me` |
//!
//! Channels are not created here; they must already exist and be listed in the
//! [`ChannelMap`]. HTTP 429 answers are waited out using Discord's
//! `retry_after`. Every other failure is returned to the engine unchanged.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use tracing::warn;

use super::transport::{ChannelRef, PostHandle, Target, ThreadHandle, Transport};
use crate::config::ChannelMap;
use crate::error::TransportError;

/// Discord API base URL.
pub const API_BASE: &str = "https://discord.com/api/v10";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_RATE_LIMIT_WAITS: usize = 5;
const MAX_RATE_LIMIT_SLEEP: Duration = Duration::from_secs(60);

/// One day, in minutes.
const THREAD_AUTO_ARCHIVE_MINUTES: u64 = 1440;

/// Posts to Discord with a bot token.
pub struct DiscordTransport {
    client: Client,
    token: String,
    base_url: String,
    channels: ChannelMap,
}

impl DiscordTransport {
    pub fn new(token: impl Into<String>, channels: ChannelMap) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("DiscordBot (slackport, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into().trim().to_string(),
            base_url: API_BASE.to_string(),
            channels,
        })
    }

    /// Points the transport at another API root, such as a local stub server.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Checks that the token is accepted. Returns the bot's user name.
    pub fn verify(&self) -> Result<String, TransportError> {
        let me = self.send(|| self.client.get(format!("{}/users/@me", self.base_url)))?;
        Ok(me
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Sends a request, waiting out rate limits, and decodes the JSON body.
    fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Value, TransportError> {
        let mut waits = 0;
        loop {
            let response = build()
                .header(AUTHORIZATION, format!("Bot {}", self.token))
                .send()
                .map_err(|e| TransportError::Http(e.to_string()))?;
            let status = response.status();

            if status.is_success() {
                return response
                    .json::<Value>()
                    .map_err(|e| TransportError::Decode(e.to_string()));
            }

            let body = response.text().unwrap_or_default();
            let error = TransportError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            };
            if error.is_rate_limited() && waits < MAX_RATE_LIMIT_WAITS {
                let wait = retry_after(&body).min(MAX_RATE_LIMIT_SLEEP);
                warn!(
                    "Rate limited by Discord, waiting {:.1}s (attempt {}/{})",
                    wait.as_secs_f64(),
                    waits + 1,
                    MAX_RATE_LIMIT_WAITS
                );
                thread::sleep(wait);
                waits += 1;
                continue;
            }
            return Err(error);
        }
    }
}

/// Reads `retry_after` (seconds, fractional) from a 429 body.
fn retry_after(body: &str) -> Duration {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("retry_after").and_then(Value::as_f64))
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(Duration::from_secs(1), Duration::from_secs_f64)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn id_of(value: &Value) -> Result<String, TransportError> {
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| TransportError::Decode("response has no id".into()))
}

impl Transport for DiscordTransport {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn resolve_channel(&self, name: &str) -> Result<ChannelRef, TransportError> {
        self.channels
            .get(name)
            .map(|id| ChannelRef::new(name, id))
            .ok_or_else(|| TransportError::UnknownChannel(name.to_string()))
    }

    fn post_message(&self, target: Target<'_>, text: &str) -> Result<PostHandle, TransportError> {
        let url = format!("{}/channels/{}/messages", self.base_url, target.id());
        // Imported history must not ping anyone.
        let payload = json!({
            "content": text,
            "allowed_mentions": { "parse": [] },
        });
        let created = self.send(|| self.client.post(&url).json(&payload))?;
        Ok(PostHandle::new(id_of(&created)?))
    }

    fn open_thread(
        &self,
        channel: &ChannelRef,
        anchor: &PostHandle,
        name: &str,
    ) -> Result<ThreadHandle, TransportError> {
        let url = format!(
            "{}/channels/{}/messages/{}/threads",
            self.base_url, channel.id, anchor.id
        );
        let payload = json!({
            "name": name,
            "auto_archive_duration": THREAD_AUTO_ARCHIVE_MINUTES,
        });
        let created = self.send(|| self.client.post(&url).json(&payload))?;
        Ok(ThreadHandle::new(id_of(&created)?, channel.clone()))
    }
}
