use std::time::Duration;

use url::Url;

/// Delay between a failed feed connection and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Quiet period required before a burst of changes becomes one reload request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Upper bound on establishing the TCP/TLS connection to the feed.
///
/// Reads are never timed out; the feed is expected to stay idle for long stretches.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the reload request channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Configuration for one change-feed watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
	/// Absolute URL of the continuous change feed.
	pub url: Url,
	/// Fixed delay before every reconnect attempt.
	pub retry_delay: Duration,
	/// Trailing-edge debounce window.
	pub debounce: Duration,
	/// Connect timeout for the streaming request.
	pub connect_timeout: Duration,
	/// Capacity of the reload request channel.
	pub channel_capacity: usize,
}

impl FeedConfig {
	/// Creates a configuration for `url` with default timings.
	pub fn new(url: Url) -> Self {
		Self {
			url,
			retry_delay: DEFAULT_RETRY_DELAY,
			debounce: DEFAULT_DEBOUNCE,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
		}
	}

	/// Sets the reconnect delay.
	#[must_use]
	pub fn retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = delay;
		self
	}

	/// Sets the debounce window.
	#[must_use]
	pub fn debounce(mut self, window: Duration) -> Self {
		self.debounce = window;
		self
	}

	/// Sets the connect timeout.
	#[must_use]
	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	/// Sets the reload channel capacity.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	#[must_use]
	pub fn channel_capacity(mut self, capacity: usize) -> Self {
		assert!(capacity > 0, "reload channel capacity must be > 0");
		self.channel_capacity = capacity;
		self
	}
}
