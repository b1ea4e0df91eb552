//! Continuous change-feed watcher for CouchDB-style document stores.
//!
//! The crate is centered on [`FeedWatcher`], which owns one background task
//! driving three pieces in a single loop:
//!
//! - [`FeedReader`]: a long-lived streaming `GET <db>/_changes?feed=continuous`
//!   connection that reconnects after a fixed delay whenever the connection
//!   fails, the server closes the stream, or a line cannot be parsed.
//! - [`SequenceTracker`]: drops every event whose sequence number is not
//!   strictly greater than the last accepted one, including events the server
//!   redelivers after a reconnect.
//! - [`Debouncer`]: trailing-edge coalescing of accepted events into one
//!   [`ReloadRequest`] per quiet period.
//!
//! Reload requests are delivered as messages on a bounded channel that the
//! consumer drains on its own task. Accepted events are additionally broadcast
//! to any subscriber via [`WatcherHandle::subscribe`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use couchconf_feed::{FeedConfig, FeedWatcher};
//!
//! let config = FeedConfig::new("http://localhost:5984/settings/_changes?feed=continuous".parse()?);
//! let (handle, mut reloads) = FeedWatcher::new(config).spawn()?;
//! while let Some(request) = reloads.recv().await {
//! 	tracing::info!(seq = request.seq, id = %request.id, "reload requested");
//! }
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod debounce;
mod error;
mod event;
mod reader;
mod spawn;
mod state;
mod watcher;

pub use config::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DEBOUNCE, DEFAULT_RETRY_DELAY, FeedConfig};
pub use debounce::{Debouncer, ReloadRequest, SequenceTracker};
pub use error::{FeedError, Result};
pub use event::{ChangeEvent, parse_line};
pub use reader::FeedReader;
pub use spawn::spawn_background;
pub use state::FeedState;
pub use watcher::{FeedWatcher, WatcherHandle};
