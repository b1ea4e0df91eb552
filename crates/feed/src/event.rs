use serde::Deserialize;

use crate::{FeedError, Result};

/// One record of the continuous change feed.
///
/// Only the fields needed to drive reloads are decoded; revision lists and
/// deletion markers are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeEvent {
	/// Strictly increasing feed sequence number.
	pub seq: i64,
	/// Id of the changed document.
	pub id: String,
}

/// Parses one feed line.
///
/// Returns `Ok(None)` for blank or whitespace-only heartbeat lines, and
/// [`FeedError::EndOfStream`] for the `{"last_seq": ...}` trailer.
pub fn parse_line(line: &str) -> Result<Option<ChangeEvent>> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(None);
	}

	serde_json::from_str(line).map(Some).map_err(|source| {
		if is_trailer(line) {
			return FeedError::EndOfStream;
		}
		FeedError::MalformedEvent {
			line: line.to_string(),
			source,
		}
	})
}

/// `{"last_seq": ...}`, written by the server before it closes a timed-out feed.
fn is_trailer(line: &str) -> bool {
	serde_json::from_str::<serde_json::Value>(line).is_ok_and(|value| value.get("last_seq").is_some())
}
