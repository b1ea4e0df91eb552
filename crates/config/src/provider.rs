//! Configuration source backed by one database.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "watch")]
use couchconf_feed::{FeedWatcher, ReloadRequest, WatcherHandle, spawn_background};
#[cfg(feature = "watch")]
use parking_lot::Mutex;
#[cfg(feature = "watch")]
use tokio::sync::mpsc;
#[cfg(feature = "watch")]
use tokio_util::sync::CancellationToken;
use tracing::debug;
#[cfg(feature = "watch")]
use tracing::warn;

use crate::{
	ConfigError, CouchDbOptions, DocumentClient, ReloadToken, Result, ScalarValue, Snapshot, SnapshotStore,
	flatten_documents,
};

/// Contract between a configuration source and the host configuration
/// framework.
///
/// Lookups and child-key listings read the current snapshot and never
/// block on the network.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
	/// Fetches the source and replaces the current snapshot.
	async fn load(&self) -> Result<()>;

	/// String form of the value at `key`, or `None` if absent.
	fn try_get(&self, key: &str) -> Option<String>;

	/// Immediate children of `parent` merged with `earlier`, sorted.
	fn child_keys(&self, earlier: Vec<String>, parent: Option<&str>) -> Vec<String>;

	/// Writes `value` at `key`.
	fn set(&self, key: &str, value: &str) -> Result<()>;

	/// Token that fires when the current snapshot is replaced.
	fn reload_token(&self) -> ReloadToken;
}

struct Shared {
	client: DocumentClient,
	store: SnapshotStore,
}

impl Shared {
	async fn reload(&self) -> Result<u64> {
		let documents = self.client.fetch_all().await?;
		let entries = flatten_documents(&self.client.options().database, &documents);
		Ok(self.store.publish(entries))
	}
}

#[cfg(feature = "watch")]
struct Watching {
	handle: WatcherHandle,
	cancel: CancellationToken,
}

/// Read-only configuration derived from every document of one database.
///
/// Keys have the form `database:document_id:field[:nested...]`. After
/// [`load`](ConfigurationProvider::load) the provider optionally follows the
/// change feed and reloads the whole database after each burst of changes.
pub struct CouchDbConfigProvider {
	shared: Arc<Shared>,
	#[cfg(feature = "watch")]
	http: reqwest::Client,
	#[cfg(feature = "watch")]
	watching: Mutex<Option<Watching>>,
}

impl std::fmt::Debug for CouchDbConfigProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut s = f.debug_struct("CouchDbConfigProvider");
		s.field("options", self.shared.client.options());
		s.field("generation", &self.shared.store.current().generation());
		#[cfg(feature = "watch")]
		s.field("watching", &self.is_watching());
		s.finish()
	}
}

impl CouchDbConfigProvider {
	/// Creates an unloaded provider. Nothing is fetched until `load`.
	pub fn new(options: CouchDbOptions) -> Result<Self> {
		let http = reqwest::Client::builder()
			.connect_timeout(options.watch.connect_timeout())
			.build()?;
		Self::with_client(http, options)
	}

	/// Creates a provider sharing an existing `reqwest` client for bulk
	/// fetches and the change feed.
	pub fn with_client(http: reqwest::Client, options: CouchDbOptions) -> Result<Self> {
		let client = DocumentClient::with_client(http.clone(), options)?;
		#[cfg(not(feature = "watch"))]
		drop(http);
		Ok(Self {
			shared: Arc::new(Shared {
				client,
				store: SnapshotStore::new(),
			}),
			#[cfg(feature = "watch")]
			http,
			#[cfg(feature = "watch")]
			watching: Mutex::new(None),
		})
	}

	pub fn options(&self) -> &CouchDbOptions {
		self.shared.client.options()
	}

	/// Current snapshot.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.shared.store.current()
	}

	/// Typed value at `key`.
	pub fn get(&self, key: &str) -> Option<ScalarValue> {
		self.shared.store.get(key)
	}

	/// Starts following the change feed. Idempotent.
	///
	/// Does not block; each debounced reload request triggers a full reload
	/// on a background task. A failed background reload is logged and the
	/// previous snapshot stays in place.
	#[cfg(feature = "watch")]
	pub fn start_watching(&self) -> Result<()> {
		let mut watching = self.watching.lock();
		if watching.as_ref().is_some_and(|w| !w.cancel.is_cancelled()) {
			return Ok(());
		}

		let options = self.options();
		let config = options.watch.feed_config(options.changes_url()?);
		let (handle, requests) = FeedWatcher::new(config).with_client(self.http.clone()).spawn()?;
		let cancel = handle.cancellation_token();

		spawn_background(
			"config-reloads",
			drive_reloads(Arc::clone(&self.shared), requests, cancel.clone()),
		);
		*watching = Some(Watching { handle, cancel });
		Ok(())
	}

	/// Stops following the change feed. The current snapshot is kept.
	#[cfg(feature = "watch")]
	pub fn stop_watching(&self) {
		if let Some(watching) = self.watching.lock().take() {
			debug!(database = %self.options().database, "config.watch_stop");
			watching.handle.cancel();
		}
	}

	#[cfg(feature = "watch")]
	pub fn is_watching(&self) -> bool {
		self.watching.lock().as_ref().is_some_and(|w| !w.cancel.is_cancelled())
	}

	/// Feed state of the running watcher, if any.
	#[cfg(feature = "watch")]
	pub fn feed_state(&self) -> Option<couchconf_feed::FeedState> {
		self.watching.lock().as_ref().map(|w| w.handle.state())
	}
}

#[async_trait]
impl ConfigurationProvider for CouchDbConfigProvider {
	async fn load(&self) -> Result<()> {
		let generation = self.shared.reload().await?;
		debug!(database = %self.options().database, generation, "config.load");

		#[cfg(feature = "watch")]
		if self.options().reload_on_change {
			self.start_watching()?;
		}
		Ok(())
	}

	fn try_get(&self, key: &str) -> Option<String> {
		self.get(key).map(|value| value.render())
	}

	fn child_keys(&self, earlier: Vec<String>, parent: Option<&str>) -> Vec<String> {
		self.shared.store.current().child_keys(earlier, parent)
	}

	fn set(&self, key: &str, _value: &str) -> Result<()> {
		Err(ConfigError::ReadOnly { key: key.to_string() })
	}

	fn reload_token(&self) -> ReloadToken {
		self.shared.store.reload_token()
	}
}

#[cfg(feature = "watch")]
impl Drop for CouchDbConfigProvider {
	fn drop(&mut self) {
		self.stop_watching();
	}
}

#[cfg(feature = "watch")]
async fn drive_reloads(shared: Arc<Shared>, mut requests: mpsc::Receiver<ReloadRequest>, cancel: CancellationToken) {
	loop {
		let request = tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			request = requests.recv() => match request {
				Some(request) => request,
				None => break,
			},
		};

		debug!(seq = request.seq, id = %request.id, "config.reload");
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			result = shared.reload() => {
				if let Err(error) = result {
					warn!(seq = request.seq, error = %error, "config.reload_failed");
				}
			}
		}
	}
	debug!("config.reloads_stopped");
}
