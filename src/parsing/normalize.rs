//! Record normalization: one [`RawRecord`] in, one [`Message`] out.

use chrono::{DateTime, Utc};

use super::links::{dedupe_links, resolve_attachment};
use super::record::RawRecord;
use crate::error::SkipReason;
use crate::message::Message;
use crate::splitter::{MESSAGE_LIMIT, needs_split};

/// Format used for the timestamp prefix of every rendered line.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Renders a timestamp the way it appears at the start of a post.
pub fn render_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Normalizes a record using the destination's default size limit.
///
/// See [`normalize_with_limit`].
pub fn normalize(raw: &RawRecord) -> Result<Message, SkipReason> {
    normalize_with_limit(raw, MESSAGE_LIMIT)
}

/// Turns one export record into a canonical message.
///
/// The rendered text is `"<timestamp> - <author>: <body>"` for authored
/// records and the bare link for attachment-only records. When a record has
/// both, the link follows the authored line. Trailing line breaks of the
/// rendered text are dropped. Text shorter than `split_threshold` characters
/// is then terminated with `"\n"`; longer text is left unterminated for the
/// splitter, so [`needs_split`] gives the same answer on the stored text.
///
/// The returned message has `sequence` 0; the channel assigns the real one.
pub fn normalize_with_limit(raw: &RawRecord, split_threshold: usize) -> Result<Message, SkipReason> {
    let role = raw.role();

    let attachment = raw.first_file().and_then(resolve_attachment).map(str::to_owned);

    let authored = match (raw.author_name(), raw.text()) {
        (Some(author), Some(body)) if !body.trim().is_empty() => Some((author, body)),
        _ => None,
    };

    let mut message = match (authored, attachment) {
        (None, None) => return Err(SkipReason::NoContent),
        (None, Some(link)) => {
            let mut message = Message::new(link.clone(), role).with_attachment(link);
            if let Some(ts) = raw.timestamp() {
                message = message.with_timestamp(ts);
            }
            message
        }
        (Some((author, body)), attachment) => {
            let ts = raw.timestamp().ok_or(SkipReason::InvalidTimestamp)?;
            let mut text = format!("{} - {}: {}", render_timestamp(&ts), author, dedupe_links(body));
            let mut message = Message::new(String::new(), role)
                .with_author(author)
                .with_timestamp(ts);
            if let Some(link) = attachment {
                text.push('\n');
                text.push_str(&link);
                message = message.with_attachment(link);
            }
            message.text = text;
            message
        }
    };

    let rendered = message.text.trim_end_matches('\n').len();
    message.text.truncate(rendered);
    if !needs_split(&message.text, split_threshold) {
        message.text.push('\n');
    }
    Ok(message)
}
