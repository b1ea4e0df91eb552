//! Documents exposed as read-only files.
//!
//! A path names one document id, with an optional leading `/`. Directories
//! do not exist; every document is a flat file whose contents are its raw
//! JSON body.

#[cfg(feature = "watch")]
use std::collections::HashMap;
#[cfg(feature = "watch")]
use std::sync::Arc;

use bytes::Bytes;
#[cfg(feature = "watch")]
use couchconf_feed::{ChangeEvent, FeedWatcher, WatcherHandle, spawn_background};
#[cfg(feature = "watch")]
use parking_lot::Mutex;
#[cfg(feature = "watch")]
use tokio::sync::broadcast::{self, error::RecvError};

#[cfg(feature = "watch")]
use crate::ReloadToken;
#[cfg(feature = "watch")]
use crate::token::GenerationClock;
use crate::{ConfigError, CouchDbOptions, DocumentClient, Result};

/// Metadata of one document-file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFileInfo {
	/// Document id.
	pub name: String,
	pub exists: bool,
	/// Body length in bytes; 0 when the document does not exist.
	pub length: u64,
	/// Always false.
	pub is_directory: bool,
}

/// Pending per-document watches, keyed by id.
#[cfg(feature = "watch")]
#[derive(Debug, Default)]
struct Watches {
	pending: HashMap<String, ReloadToken>,
}

#[cfg(feature = "watch")]
impl Watches {
	fn fire(&mut self, id: &str) {
		if let Some(token) = self.pending.remove(id) {
			tracing::trace!(id, "config.file_changed");
			token.fire();
		}
	}

	fn fire_all(&mut self) {
		for (_, token) in self.pending.drain() {
			token.fire();
		}
	}
}

/// File-provider view of one database.
#[derive(Debug)]
pub struct DocumentFileProvider {
	client: DocumentClient,
	#[cfg(feature = "watch")]
	watches: Arc<Mutex<Watches>>,
	#[cfg(feature = "watch")]
	clock: GenerationClock,
	#[cfg(feature = "watch")]
	handle: Option<WatcherHandle>,
}

impl DocumentFileProvider {
	/// Creates the provider; with `reload_on_change` set it also starts
	/// following the change feed so that [`watch`](Self::watch) tokens fire.
	pub fn new(options: CouchDbOptions) -> Result<Self> {
		let http = reqwest::Client::builder()
			.connect_timeout(options.watch.connect_timeout())
			.build()?;
		Self::with_client(http, options)
	}

	pub fn with_client(http: reqwest::Client, options: CouchDbOptions) -> Result<Self> {
		let client = DocumentClient::with_client(http.clone(), options)?;

		#[cfg(feature = "watch")]
		{
			let watches = Arc::new(Mutex::new(Watches::default()));
			let options = client.options();
			let handle = if options.reload_on_change {
				let config = options.watch.feed_config(options.changes_url()?);
				let handle = FeedWatcher::new(config).with_client(http).spawn_events()?;
				spawn_background("config-file-watches", dispatch(handle.subscribe(), Arc::clone(&watches)));
				Some(handle)
			} else {
				None
			};
			Ok(Self {
				client,
				watches,
				clock: GenerationClock::new(),
				handle,
			})
		}
		#[cfg(not(feature = "watch"))]
		{
			drop(http);
			Ok(Self { client })
		}
	}

	/// Looks up a document without fetching its body.
	pub async fn file_info(&self, path: &str) -> Result<DocumentFileInfo> {
		let name = document_id(path);
		let length = match name {
			Some(id) => self.client.head_document(id).await?,
			None => None,
		};
		Ok(DocumentFileInfo {
			name: name.unwrap_or_default().to_string(),
			exists: length.is_some(),
			length: length.unwrap_or(0),
			is_directory: false,
		})
	}

	/// Fetches the raw body of a document.
	pub async fn read(&self, path: &str) -> Result<Bytes> {
		let id = document_id(path).ok_or_else(|| ConfigError::InvalidPath(path.to_string()))?;
		self.client.fetch_document(id).await
	}

	/// Feed state of the change-feed watcher, if one is running.
	#[cfg(feature = "watch")]
	pub fn feed_state(&self) -> Option<couchconf_feed::FeedState> {
		self.handle.as_ref().map(WatcherHandle::state)
	}

	/// Token that fires once the next time the document at `path` changes.
	///
	/// Without a running change feed the token never fires.
	#[cfg(feature = "watch")]
	pub fn watch(&self, path: &str) -> ReloadToken {
		let Some(id) = document_id(path) else {
			return ReloadToken::new(0);
		};
		self.watches
			.lock()
			.pending
			.entry(id.to_string())
			.or_insert_with(|| ReloadToken::new(self.clock.next()))
			.clone()
	}
}

fn document_id(path: &str) -> Option<&str> {
	let id = path.strip_prefix('/').unwrap_or(path);
	(!id.is_empty()).then_some(id)
}

#[cfg(feature = "watch")]
async fn dispatch(mut events: broadcast::Receiver<ChangeEvent>, watches: Arc<Mutex<Watches>>) {
	loop {
		match events.recv().await {
			Ok(event) => watches.lock().fire(&event.id),
			Err(RecvError::Lagged(missed)) => {
				tracing::debug!(missed, "config.file_watches_lagged");
				watches.lock().fire_all();
			}
			Err(RecvError::Closed) => break,
		}
	}
}
