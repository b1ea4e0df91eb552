use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::spawn::spawn_background;
use crate::{ChangeEvent, Debouncer, FeedConfig, FeedReader, FeedState, ReloadRequest, Result, SequenceTracker};

/// Capacity of the accepted-event broadcast channel.
const EVENT_BUFFER: usize = 64;

/// Builder for one background change-feed watcher.
#[derive(Debug)]
pub struct FeedWatcher {
	config: FeedConfig,
	client: Option<Client>,
	cancel: CancellationToken,
}

impl FeedWatcher {
	/// Creates a watcher for `config`.
	pub fn new(config: FeedConfig) -> Self {
		Self {
			config,
			client: None,
			cancel: CancellationToken::new(),
		}
	}

	/// Uses an existing HTTP client instead of building one.
	#[must_use]
	pub fn with_client(mut self, client: Client) -> Self {
		self.client = Some(client);
		self
	}

	/// Ties the watcher to an outer cancellation scope.
	///
	/// The watcher uses a child of `parent`, so stopping the watcher does not
	/// cancel the parent.
	#[must_use]
	pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
		self.cancel = parent.child_token();
		self
	}

	/// Starts the background task.
	///
	/// Returns the owning handle and the receiver of debounced reload
	/// requests. Does not block; when called outside a Tokio runtime the task
	/// runs on a shared background runtime.
	pub fn spawn(self) -> Result<(WatcherHandle, mpsc::Receiver<ReloadRequest>)> {
		let (reload_tx, reload_rx) = mpsc::channel(self.config.channel_capacity);
		let handle = self.start(Some(reload_tx))?;
		Ok((handle, reload_rx))
	}

	/// Starts the background task without debouncing.
	///
	/// Accepted events still reach [`WatcherHandle::subscribe`]; no reload
	/// requests are produced.
	pub fn spawn_events(self) -> Result<WatcherHandle> {
		self.start(None)
	}

	fn start(self, reloads: Option<mpsc::Sender<ReloadRequest>>) -> Result<WatcherHandle> {
		let Self { config, client, cancel } = self;
		let url = config.url.clone();
		let debounce = config.debounce;
		let (events, _) = broadcast::channel(EVENT_BUFFER);

		let reader = match client {
			Some(client) => FeedReader::with_client(config, client, cancel.clone()),
			None => FeedReader::new(config, cancel.clone())?,
		};
		let state = reader.watch_state();

		debug!(
			url = %url,
			debounce_ms = debounce.as_millis() as u64,
			reloads = reloads.is_some(),
			"feed.watch_start"
		);
		let task = spawn_background(
			"feed-watcher",
			run(reader, debounce, reloads, events.clone(), cancel.clone()),
		);

		Ok(WatcherHandle {
			url,
			cancel,
			state,
			events,
			task: Some(task),
		})
	}
}

/// Owning handle of a running watcher.
///
/// Dropping the handle cancels the watcher.
#[derive(Debug)]
pub struct WatcherHandle {
	url: Url,
	cancel: CancellationToken,
	state: watch::Receiver<FeedState>,
	events: broadcast::Sender<ChangeEvent>,
	task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
	/// Feed URL being watched.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Current connection state.
	pub fn state(&self) -> FeedState {
		*self.state.borrow()
	}

	/// Subscribes to connection state transitions.
	pub fn watch_state(&self) -> watch::Receiver<FeedState> {
		self.state.clone()
	}

	/// Subscribes to accepted change events, in sequence order.
	///
	/// Only events published after the call are received.
	pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
		self.events.subscribe()
	}

	/// Token cancelled when the watcher stops.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Requests cancellation without waiting.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns true once cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Cancels the watcher and waits for its task to exit.
	pub async fn stop(mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take()
			&& let Err(error) = task.await
		{
			warn!(url = %self.url, error = %error, "feed.watch_join_failed");
		}
	}
}

impl Drop for WatcherHandle {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

async fn run(
	mut reader: FeedReader,
	debounce: Duration,
	reloads: Option<mpsc::Sender<ReloadRequest>>,
	events: broadcast::Sender<ChangeEvent>,
	cancel: CancellationToken,
) {
	let mut tracker = SequenceTracker::new();
	let mut debouncer = Debouncer::new(debounce);

	loop {
		let deadline = debouncer.deadline();
		tokio::select! {
			biased;
			() = cancel.cancelled() => break,
			() = sleep_until(deadline), if deadline.is_some() => {
				if let Some(request) = debouncer.poll_due(Instant::now())
					&& let Some(reloads) = &reloads
				{
					deliver(reloads, request);
				}
			}
			event = reader.next_event() => {
				let Some(event) = event else {
					break;
				};
				if !tracker.accept(event.seq) {
					trace!(seq = event.seq, last = tracker.last(), id = %event.id, "feed.event_ignored");
					continue;
				}
				if reloads.is_some() {
					debouncer.arm(event.clone());
				}
				let _ = events.send(event);
			}
		}
	}

	reader.close();
	if debouncer.cancel() {
		trace!("feed.pending_reload_discarded");
	}
	debug!(last_seq = tracker.last(), "feed.watch_stop");
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

/// Posts a reload request without waiting.
///
/// A full channel already holds a request that has not started, and that
/// reload observes this change too, so the new request is dropped.
fn deliver(reloads: &mpsc::Sender<ReloadRequest>, request: ReloadRequest) {
	debug!(seq = request.seq, id = %request.id, "feed.reload_requested");
	match reloads.try_send(request) {
		Ok(()) => {}
		Err(TrySendError::Full(request)) => {
			trace!(seq = request.seq, id = %request.id, "feed.reload_coalesced");
		}
		Err(TrySendError::Closed(request)) => {
			trace!(seq = request.seq, id = %request.id, "feed.reload_receiver_closed");
		}
	}
}
