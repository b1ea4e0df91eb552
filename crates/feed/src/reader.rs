//! Streaming reader for the continuous change feed.

use std::io;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::{FutureExt, StreamExt};
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, Lines};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::{ChangeEvent, FeedConfig, FeedError, FeedState, Result, parse_line};

type FeedLines = Lines<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>;

/// Reconnecting reader over one change feed.
///
/// The reader yields parsed [`ChangeEvent`]s forever. Any failure (refused
/// connection, error status, broken body, clean end of stream, malformed
/// line) drops the current connection and schedules a new attempt after
/// [`FeedConfig::retry_delay`]. Only cancellation ends the sequence.
pub struct FeedReader {
	config: FeedConfig,
	client: Client,
	cancel: CancellationToken,
	state: watch::Sender<FeedState>,
	connecting: Option<BoxFuture<'static, Result<FeedLines>>>,
	lines: Option<FeedLines>,
	retry_at: Option<Instant>,
	attempts: u64,
}

impl FeedReader {
	/// Creates a reader with its own HTTP client.
	///
	/// The client has a connect timeout but no read timeout.
	pub fn new(config: FeedConfig, cancel: CancellationToken) -> Result<Self> {
		let client = Client::builder().connect_timeout(config.connect_timeout).build()?;
		Ok(Self::with_client(config, client, cancel))
	}

	/// Creates a reader over an existing client.
	///
	/// The client must not carry a total request timeout, or every streaming
	/// connection is cut when it expires.
	pub fn with_client(config: FeedConfig, client: Client, cancel: CancellationToken) -> Self {
		let (state, _) = watch::channel(FeedState::Disconnected);
		Self {
			config,
			client,
			cancel,
			state,
			connecting: None,
			lines: None,
			retry_at: None,
			attempts: 0,
		}
	}

	/// Current connection state.
	pub fn state(&self) -> FeedState {
		*self.state.borrow()
	}

	/// Subscribes to connection state transitions.
	pub fn watch_state(&self) -> watch::Receiver<FeedState> {
		self.state.subscribe()
	}

	/// Number of connection attempts made so far.
	pub const fn attempts(&self) -> u64 {
		self.attempts
	}

	/// Waits for the next change event.
	///
	/// Returns `None` only once the cancellation token fires. Cancel safe: an
	/// in-flight connection attempt, open stream, and retry deadline are kept
	/// on `self` and resumed by the next call.
	pub async fn next_event(&mut self) -> Option<ChangeEvent> {
		let cancel = self.cancel.clone();
		while !cancel.is_cancelled() {
			if let Some(at) = self.retry_at {
				tokio::select! {
					biased;
					() = cancel.cancelled() => break,
					() = tokio::time::sleep_until(at) => {}
				}
				self.retry_at = None;
			}

			if self.lines.is_none() {
				if self.connecting.is_none() {
					self.attempts = self.attempts.wrapping_add(1);
					self.set_state(FeedState::Connecting);
					self.connecting = Some(connect(self.client.clone(), self.config.url.clone()).boxed());
				}
				let Some(connecting) = self.connecting.as_mut() else {
					continue;
				};
				let attempt = tokio::select! {
					biased;
					() = cancel.cancelled() => break,
					attempt = connecting => attempt,
				};
				self.connecting = None;
				match attempt {
					Ok(lines) => {
						debug!(url = %self.config.url, attempt = self.attempts, "feed.connected");
						self.lines = Some(lines);
						self.set_state(FeedState::Streaming);
					}
					Err(error) => {
						self.schedule_retry(&error);
						continue;
					}
				}
			}

			let Some(lines) = self.lines.as_mut() else {
				continue;
			};
			let read = tokio::select! {
				biased;
				() = cancel.cancelled() => break,
				read = read_event(lines) => read,
			};
			match read {
				Ok(event) => {
					trace!(seq = event.seq, id = %event.id, "feed.event");
					return Some(event);
				}
				Err(error) => self.schedule_retry(&error),
			}
		}

		self.close();
		None
	}

	/// Converts the reader into an unbounded event stream.
	///
	/// The stream owns the reader and ends only on cancellation; it cannot be
	/// restarted.
	pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send + 'static {
		futures::stream::unfold(self, |mut reader| async move {
			let event = reader.next_event().await?;
			Some((event, reader))
		})
	}

	fn schedule_retry(&mut self, error: &FeedError) {
		self.lines = None;
		self.set_state(FeedState::Disconnected);
		match error {
			FeedError::MalformedEvent { .. } => {
				warn!(url = %self.config.url, error = %error, "feed.malformed_event");
			}
			_ => {
				debug!(
					url = %self.config.url,
					error = %error,
					attempt = self.attempts,
					retry_in_ms = self.config.retry_delay.as_millis() as u64,
					"feed.disconnected"
				);
			}
		}
		self.retry_at = Some(Instant::now() + self.config.retry_delay);
	}

	/// Drops any connection state and moves to [`FeedState::Stopped`].
	pub fn close(&mut self) {
		self.connecting = None;
		self.lines = None;
		self.retry_at = None;
		self.set_state(FeedState::Stopped);
	}

	fn set_state(&self, state: FeedState) {
		let previous = self.state.send_replace(state);
		if previous != state {
			trace!(from = previous.as_str(), to = state.as_str(), "feed.state");
		}
	}
}

impl std::fmt::Debug for FeedReader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FeedReader")
			.field("url", &self.config.url.as_str())
			.field("state", &self.state())
			.field("attempts", &self.attempts)
			.field("retry_at", &self.retry_at)
			.finish_non_exhaustive()
	}
}

async fn connect(client: Client, url: Url) -> Result<FeedLines> {
	let response = client.get(url).send().await?;
	let status = response.status();
	if !status.is_success() {
		return Err(FeedError::Status(status));
	}

	let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other)).boxed();
	Ok(StreamReader::new(body).lines())
}

/// Reads lines until one carries an event; heartbeats are skipped.
async fn read_event(lines: &mut FeedLines) -> Result<ChangeEvent> {
	while let Some(line) = lines.next_line().await? {
		if let Some(event) = parse_line(&line)? {
			return Ok(event);
		}
	}
	Err(FeedError::EndOfStream)
}
