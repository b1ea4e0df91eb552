//! Connection and watch options.
//!
//! Options deserialize from any serde format the host configuration uses,
//! with every field optional except `database`:
//!
//! ```json
//! {
//!     "host": "couch.internal",
//!     "port": 5984,
//!     "database": "settings",
//!     "watch": { "debounce_ms": 250 }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{ConfigError, Result};

/// Where to find the store and how to follow it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CouchDbOptions {
	/// `http` or `https`.
	pub scheme: String,
	/// Store host name or address.
	pub host: String,
	/// Store port.
	pub port: u16,
	/// Database whose documents form the configuration.
	pub database: String,
	/// Follow the change feed and reload after every quiet period.
	pub reload_on_change: bool,
	/// Change-feed tuning.
	pub watch: WatchOptions,
}

impl Default for CouchDbOptions {
	fn default() -> Self {
		Self {
			scheme: "http".to_string(),
			host: "localhost".to_string(),
			port: 5984,
			database: String::new(),
			reload_on_change: true,
			watch: WatchOptions::default(),
		}
	}
}

/// Change-feed tuning, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
	/// Fixed delay before reconnecting a failed feed.
	pub retry_delay_ms: u64,
	/// Quiet period that closes a burst of changes.
	pub debounce_ms: u64,
	/// Connect timeout for the feed request.
	pub connect_timeout_ms: u64,
	/// Capacity of the reload request queue.
	pub channel_capacity: usize,
}

impl Default for WatchOptions {
	fn default() -> Self {
		Self {
			retry_delay_ms: 1_000,
			debounce_ms: 500,
			connect_timeout_ms: 10_000,
			channel_capacity: 16,
		}
	}
}

impl WatchOptions {
	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	#[cfg(feature = "watch")]
	pub(crate) fn feed_config(&self, url: Url) -> couchconf_feed::FeedConfig {
		couchconf_feed::FeedConfig::new(url)
			.retry_delay(self.retry_delay())
			.debounce(self.debounce())
			.connect_timeout(self.connect_timeout())
			.channel_capacity(self.channel_capacity.max(1))
	}
}

impl CouchDbOptions {
	/// Options for `database` on `host:port` with defaults elsewhere.
	pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			port,
			database: database.into(),
			..Self::default()
		}
	}

	/// Parses `scheme://host[:port]/database`.
	///
	/// The database is the last non-empty path segment, percent-decoded.
	pub fn from_url(raw: &str) -> Result<Self> {
		let url = Url::parse(raw)?;
		let host = url
			.host_str()
			.ok_or_else(|| ConfigError::InvalidOptions(format!("{raw}: missing host")))?;
		let port = url
			.port_or_known_default()
			.ok_or_else(|| ConfigError::InvalidOptions(format!("{raw}: missing port")))?;
		let database = url
			.path_segments()
			.and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
			.ok_or_else(|| ConfigError::InvalidOptions(format!("{raw}: missing database name")))?;
		let database = urlencoding::decode(database)
			.map_err(|e| ConfigError::InvalidOptions(format!("{raw}: database name is not UTF-8: {e}")))?
			.into_owned();

		let options = Self {
			scheme: url.scheme().to_string(),
			host: host.to_string(),
			port,
			database,
			..Self::default()
		};
		options.validate()?;
		Ok(options)
	}

	/// Builder-style toggle for change-feed reloads.
	#[must_use]
	pub fn reload_on_change(mut self, enabled: bool) -> Self {
		self.reload_on_change = enabled;
		self
	}

	/// Builder-style watch tuning.
	#[must_use]
	pub fn watch(mut self, watch: WatchOptions) -> Self {
		self.watch = watch;
		self
	}

	/// Checks the options without contacting the store.
	pub fn validate(&self) -> Result<()> {
		if !matches!(self.scheme.as_str(), "http" | "https") {
			return Err(ConfigError::InvalidOptions(format!("unsupported scheme '{}'", self.scheme)));
		}
		if self.host.is_empty() {
			return Err(ConfigError::InvalidOptions("host must not be empty".to_string()));
		}
		if self.database.is_empty() {
			return Err(ConfigError::InvalidOptions("database must not be empty".to_string()));
		}
		if self.watch.channel_capacity == 0 {
			return Err(ConfigError::InvalidOptions("watch.channel_capacity must be > 0".to_string()));
		}
		Ok(())
	}

	/// `<scheme>://<host>:<port>/<database>`.
	pub fn base_url(&self) -> Result<Url> {
		self.url_with(&[], None)
	}

	/// Continuous change feed of the database.
	pub fn changes_url(&self) -> Result<Url> {
		self.url_with(&["_changes"], Some("feed=continuous"))
	}

	/// Bulk fetch of every document with its body.
	pub fn all_docs_url(&self) -> Result<Url> {
		self.url_with(&["_all_docs"], Some("include_docs=true"))
	}

	/// One document, with `id` encoded as a single path segment.
	pub fn document_url(&self, id: &str) -> Result<Url> {
		self.url_with(&[id], None)
	}

	fn url_with(&self, segments: &[&str], query: Option<&str>) -> Result<Url> {
		self.validate()?;
		let mut url = Url::parse(&format!("{}://{}:{}/", self.scheme, self.host, self.port))?;
		url.path_segments_mut()
			.map_err(|()| ConfigError::InvalidOptions("store URL cannot be a base".to_string()))?
			.clear()
			.push(&self.database)
			.extend(segments);
		url.set_query(query);
		Ok(url)
	}
}
