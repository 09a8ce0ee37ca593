//! Shared utility functions

use crate::har::Pair;

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// If the string is already shorter than `max_bytes`, returns it unchanged.
/// Otherwise, finds the last valid UTF-8 character boundary at or before `max_bytes`
/// and returns a slice up to that point.
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Returns true if any (name, value) pair in the sequence matches the predicate.
///
/// Headers and query strings are ordered sequences of single-item pairs that
/// may contain duplicate names, so scanning them is a linear walk rather than
/// a map lookup.
pub fn any_pair(pairs: &[Pair], f: impl Fn(&str, &str) -> bool) -> bool {
    pairs.iter().any(|pair| f(&pair.name, &pair.value))
}
