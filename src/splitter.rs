//! Fixed-width text splitting for oversized posts.
//!
//! Discord rejects messages longer than [`MESSAGE_LIMIT`] characters. Text at
//! or above that length is cut into [`CHUNK_SIZE`]-character pieces, leaving
//! headroom for the separator appended to each piece. Cuts fall on character
//! boundaries, never inside a UTF-8 sequence, and ignore word boundaries.
//!
//! ```
//! use slackport::splitter::split;
//!
//! let chunks: Vec<&str> = split("abcdefg", 3).collect();
//! assert_eq!(chunks, ["abc", "def", "g"]);
//! ```

/// Destination hard limit on a single post, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Chunk size used when a message has to be split.
pub const CHUNK_SIZE: usize = 1800;

/// Number of Unicode scalar values in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Whether `text` must be split before posting.
///
/// A single trailing `"\n"` separator is not counted.
pub fn needs_split(text: &str, threshold: usize) -> bool {
    char_len(text.strip_suffix('\n').unwrap_or(text)) >= threshold
}

/// Splits `text` into consecutive chunks of at most `limit` characters.
///
/// The iterator is lazy and borrows from `text`; calling `split` again
/// restarts from the beginning. Empty text yields no chunks.
///
/// # Panics
///
/// Panics if `limit` is zero.
pub fn split(text: &str, limit: usize) -> Chunks<'_> {
    assert!(limit > 0, "chunk limit must be positive");
    Chunks { rest: text, limit }
}

/// Iterator returned by [`split`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    limit: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let cut = self
            .rest
            .char_indices()
            .nth(self.limit)
            .map_or(self.rest.len(), |(idx, _)| idx);
        let (chunk, rest) = self.rest.split_at(cut);
        self.rest = rest;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.rest.is_empty() {
            return (0, Some(0));
        }
        // Between one char per byte and four bytes per char.
        let bytes = self.rest.len();
        (bytes.div_ceil(4).div_ceil(self.limit), Some(bytes.div_ceil(self.limit)))
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

/// Number of physical posts `text` turns into.
pub fn post_count(text: &str, threshold: usize, chunk_size: usize) -> usize {
    if needs_split(text, threshold) {
        split(text, chunk_size).count()
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_exact_multiple() {
        let text = "a".repeat(3600);
        let chunks: Vec<&str> = split(&text, CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| char_len(c) == CHUNK_SIZE));
    }

    #[test]
    fn test_split_remainder() {
        let text = "b".repeat(2001);
        let lens: Vec<usize> = split(&text, CHUNK_SIZE).map(char_len).collect();
        assert_eq!(lens, vec![1800, 201]);
    }

    #[test]
    fn test_split_multibyte_boundaries() {
        let text = "ж".repeat(5);
        let chunks: Vec<&str> = split(&text, 2).collect();
        assert_eq!(chunks, ["жж", "жж", "ж"]);
    }

    #[test]
    fn test_split_empty() {
        assert_eq!(split("", 10).count(), 0);
    }

    #[test]
    fn test_split_is_restartable() {
        let text = "0123456789";
        let first: Vec<&str> = split(text, 4).collect();
        let second: Vec<&str> = split(text, 4).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_size_hint_bounds_count() {
        let text = "héllo wörld ".repeat(400);
        let iter = split(&text, 300);
        let (lo, hi) = iter.size_hint();
        let n = iter.count();
        assert!(lo <= n);
        assert!(n <= hi.unwrap());
    }

    #[test]
    #[should_panic(expected = "chunk limit")]
    fn test_zero_limit_panics() {
        let _ = split("abc", 0);
    }

    #[test]
    fn test_needs_split_threshold() {
        assert!(!needs_split(&"x".repeat(1999), MESSAGE_LIMIT));
        assert!(needs_split(&"x".repeat(2000), MESSAGE_LIMIT));
        // padded short text is not oversized
        let padded = format!("{}\n", "x".repeat(1999));
        assert!(!needs_split(&padded, MESSAGE_LIMIT));
    }

    #[test]
    fn test_post_count() {
        assert_eq!(post_count("short\n", MESSAGE_LIMIT, CHUNK_SIZE), 1);
        assert_eq!(post_count(&"x".repeat(4000), MESSAGE_LIMIT, CHUNK_SIZE), 3);
    }
}
