//! Hierarchical configuration keys.
//!
//! A key is a sequence of segments joined by [`KEY_DELIMITER`]. Segments are
//! opaque: a field name that itself contains `:` simply yields more segments
//! when the key is split again. Comparison is case-sensitive, matching
//! document ids and field names in the store.

use std::cmp::Ordering;

/// Separator between key segments.
pub const KEY_DELIMITER: &str = ":";

/// Field names starting with this prefix are store metadata (`_id`, `_rev`,
/// `_attachments`, ...) and never become configuration.
pub const RESERVED_PREFIX: char = '_';

/// Joins segments into one key.
pub fn combine<I, S>(segments: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut key = String::new();
	for (i, segment) in segments.into_iter().enumerate() {
		if i > 0 {
			key.push_str(KEY_DELIMITER);
		}
		key.push_str(segment.as_ref());
	}
	key
}

/// Appends one segment to `prefix`.
pub fn child(prefix: &str, segment: &str) -> String {
	if prefix.is_empty() {
		return segment.to_string();
	}
	let mut key = String::with_capacity(prefix.len() + KEY_DELIMITER.len() + segment.len());
	key.push_str(prefix);
	key.push_str(KEY_DELIMITER);
	key.push_str(segment);
	key
}

/// Last segment of `key`.
pub fn section_key(key: &str) -> &str {
	key.rsplit_once(KEY_DELIMITER).map_or(key, |(_, last)| last)
}

/// Everything before the last segment, or `None` for a top-level key.
pub fn parent(key: &str) -> Option<&str> {
	key.rsplit_once(KEY_DELIMITER).map(|(parent, _)| parent)
}

/// Returns true if a field name denotes store metadata.
pub fn is_reserved(field: &str) -> bool {
	field.starts_with(RESERVED_PREFIX)
}

/// Next segment of `key` after the first `prefix_len` bytes.
pub(crate) fn segment_at(key: &str, prefix_len: usize) -> &str {
	let rest = &key[prefix_len..];
	rest.split_once(KEY_DELIMITER).map_or(rest, |(head, _)| head)
}

/// Ordering used for child-key listings.
///
/// Segments that both parse as unsigned integers compare numerically, so
/// array indices list as `0, 1, 2, 10` rather than `0, 1, 10, 2`. Integers
/// sort before other segments; everything else compares ordinally.
pub fn compare_segments(a: &str, b: &str) -> Ordering {
	match (a.parse::<u64>(), b.parse::<u64>()) {
		(Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
		(Ok(_), Err(_)) => Ordering::Less,
		(Err(_), Ok(_)) => Ordering::Greater,
		(Err(_), Err(_)) => a.cmp(b),
	}
}
