//! Attachment link resolution and inline link de-duplication.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Candidate keys for video attachments, highest priority first.
pub const VIDEO_LINK_KEYS: &[&str] = &["permalink"];

/// Candidate keys for every other attachment type, highest priority first.
pub const FILE_LINK_KEYS: &[&str] = &[
    "thumb_1024",
    "thumb_960",
    "thumb_720",
    "thumb_480",
    "thumb_360",
    "thumb_160",
    "thumb_80",
    "thumb_64",
    "thumb_video",
    "permalink_public",
    "permalink",
    "url_private",
];

/// Candidate keys for an attachment of the given declared type.
pub fn candidate_keys(filetype: &str) -> &'static [&'static str] {
    if filetype.eq_ignore_ascii_case("mp4") {
        VIDEO_LINK_KEYS
    } else {
        FILE_LINK_KEYS
    }
}

/// Resolves the representative link of a Slack file object.
///
/// Returns the value of the first candidate key that holds a non-empty
/// string. Files without a `filetype` resolve to `None`.
pub fn resolve_attachment(file: &Map<String, Value>) -> Option<&str> {
    let filetype = file.get("filetype").and_then(Value::as_str)?;
    first_present(file, candidate_keys(filetype))
}

/// Returns the first key in `keys` whose value is a non-empty string.
pub fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}

/// `<left|right>` and its HTML-escaped form `&lt;left|right&gt;`.
static LINK_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:<|&lt;)([^<>|\n]*?)\|([^<>|\n]+?)(?:>|&gt;)").unwrap()
});

/// Collapses a single `<url|label>` construct into one readable piece.
///
/// Only text with exactly one `|` is touched. When both halves are URLs that
/// differ only in query or fragment, the construct becomes the first half;
/// otherwise it becomes the second half.
///
/// ```
/// use slackport::parsing::dedupe_links;
///
/// assert_eq!(
///     dedupe_links("see <https://example.com/a|example.com/a>"),
///     "see example.com/a"
/// );
/// assert_eq!(
///     dedupe_links("<https://x.io/doc|https://x.io/doc?utm=1>"),
///     "https://x.io/doc"
/// );
/// ```
pub fn dedupe_links(text: &str) -> String {
    if text.matches('|').count() != 1 {
        return text.to_string();
    }
    let Some(caps) = LINK_ALIAS.captures(text) else {
        return text.to_string();
    };
    let (Some(whole), Some(left), Some(right)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return text.to_string();
    };
    let (left, right) = (left.as_str(), right.as_str());

    let replacement = if same_resource(left, right) { left } else { right };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..whole.start()]);
    out.push_str(replacement);
    out.push_str(&text[whole.end()..]);
    out
}

/// Whether two strings are URLs naming the same resource.
///
/// Scheme and host compare without case, the path compares exactly, and the
/// query and fragment are ignored.
fn same_resource(a: &str, b: &str) -> bool {
    match (resource(a), resource(b)) {
        (Some((scheme_a, host_a, path_a)), Some((scheme_b, host_b, path_b))) => {
            scheme_a.eq_ignore_ascii_case(scheme_b)
                && host_a.eq_ignore_ascii_case(host_b)
                && path_a == path_b
        }
        _ => false,
    }
}

/// Splits an absolute http(s) URL into scheme, host and path.
fn resource(url: &str) -> Option<(&str, &str, &str)> {
    let (scheme, rest) = url.trim().split_once("://")?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }
    let rest = &rest[..rest.find(['?', '#']).unwrap_or(rest.len())];
    let (host, path) = rest.find('/').map_or((rest, ""), |idx| rest.split_at(idx));
    if host.is_empty() {
        return None;
    }
    Some((scheme, host, path))
}
