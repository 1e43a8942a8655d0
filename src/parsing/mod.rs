//! Slack record parsing.
//!
//! - [`record`] - the untyped [`RawRecord`] and the thread [`classify`]er
//! - [`links`] - attachment link resolution and `<url|label>` de-duplication
//! - [`normalize`](mod@normalize) - record → [`Message`](crate::Message)

pub mod links;
pub mod normalize;
pub mod record;

pub use links::{dedupe_links, resolve_attachment};
pub use normalize::{normalize, normalize_with_limit, render_timestamp};
pub use record::{RawRecord, classify};
