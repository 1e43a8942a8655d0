//! Raw Slack export records and thread classification.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::message::Role;

/// One JSON object from a Slack export file.
///
/// Slack records are loosely typed: the same key may be a string in one
/// export and a number in another, and thread flags are signalled by the mere
/// presence of a key. The record is therefore kept as an untyped map and read
/// through accessors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

/// Slack's `user_profile` object, reduced to the fields we render.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The message body, if `text` is a string.
    pub fn text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }

    /// The raw user id (`U012AB3CD`).
    pub fn user_id(&self) -> Option<&str> {
        self.0.get("user").and_then(Value::as_str)
    }

    /// The author profile, if present and well formed.
    pub fn user_profile(&self) -> Option<UserProfile> {
        self.0
            .get("user_profile")
            .and_then(|v| UserProfile::deserialize(v).ok())
    }

    /// Display name, falling back to real name, then the raw user id.
    pub fn author_name(&self) -> Option<String> {
        let non_empty = |name: &Option<String>| {
            name.as_deref()
                .filter(|n| !n.trim().is_empty())
                .map(str::to_owned)
        };
        let profile = self.user_profile()?;
        non_empty(&profile.display_name)
            .or_else(|| non_empty(&profile.real_name))
            .or_else(|| self.user_id().map(str::to_owned))
            .or_else(|| Some("unknown".to_string()))
    }

    /// The `ts` field as a UTC timestamp.
    ///
    /// Slack writes `ts` as a decimal string (`"1672531200.000100"`); some
    /// tools re-export it as a number. Both are accepted.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let secs = match self.0.get("ts")? {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
    }

    /// The first entry of `files`, if it is an object.
    pub fn first_file(&self) -> Option<&Map<String, Value>> {
        self.0
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| files.first())
            .and_then(Value::as_object)
    }

    /// Thread role of this record, see [`classify`].
    pub fn role(&self) -> Role {
        classify(self.has("thread_ts"), self.has("reply_count"))
    }
}

/// Decides a record's thread role from the presence of its thread keys.
///
/// | `thread_ts` | `reply_count` | role |
/// |---|---|---|
/// | yes | yes | [`Role::ThreadStart`] |
/// | yes | no | [`Role::ThreadReply`] |
/// | no | any | [`Role::Normal`] |
pub fn classify(has_thread_ts: bool, has_reply_count: bool) -> Role {
    match (has_thread_ts, has_reply_count) {
        (true, true) => Role::ThreadStart,
        (true, false) => Role::ThreadReply,
        (false, _) => Role::Normal,
    }
}
