//! Error types for loading and querying document-store configuration.

use thiserror::Error;

/// Errors that can occur while loading or querying configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// Sending a request to the store or reading its body failed.
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// The store answered with a non-success status.
	#[error("{url} responded with status {status}")]
	Status {
		/// Requested URL.
		url: String,
		/// Response status.
		status: reqwest::StatusCode,
	},

	/// A response body was not the expected JSON shape.
	#[error("invalid JSON from store: {0}")]
	Json(#[from] serde_json::Error),

	/// The configured store URL could not be parsed.
	#[error("invalid store URL: {0}")]
	InvalidUrl(#[from] url::ParseError),

	/// Options are inconsistent (for example an empty database name).
	#[error("invalid options: {0}")]
	InvalidOptions(String),

	/// A file-provider path does not name a document.
	#[error("invalid document path '{0}'")]
	InvalidPath(String),

	/// Write-back was attempted; the source is read-only.
	#[error("cannot set '{key}': document-store configuration is read-only")]
	ReadOnly {
		/// Key the caller tried to set.
		key: String,
	},

	/// The change-feed watcher could not be started.
	#[cfg(feature = "watch")]
	#[error("failed to start change-feed watcher: {0}")]
	Watch(#[from] couchconf_feed::FeedError),
}

/// Result type for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
