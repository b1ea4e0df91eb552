//! Error types for the change-feed reader.

use thiserror::Error;

/// Failures of one feed connection attempt.
///
/// None of these reach feed consumers: every variant ends the current
/// connection and sends the reader through its reconnect delay.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedError {
	/// Connecting to the feed or reading its body failed.
	#[error("feed transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// The feed answered with a non-success status.
	#[error("feed responded with status {0}")]
	Status(reqwest::StatusCode),

	/// Reading a line from the response body failed.
	#[error("feed read error: {0}")]
	Io(#[from] std::io::Error),

	/// A non-blank line was not a valid change record.
	#[error("malformed change event {line:?}: {source}")]
	MalformedEvent {
		/// The offending line, trimmed.
		line: String,
		/// The underlying parse failure.
		source: serde_json::Error,
	},

	/// The server closed the feed.
	#[error("feed reached end of stream")]
	EndOfStream,
}

/// Result type for feed operations.
pub type Result<T, E = FeedError> = std::result::Result<T, E>;
