//! Live hierarchical configuration from a CouchDB-style document store.
//!
//! Every document of one database is flattened into `:`-delimited keys:
//!
//! ```text
//! settings/app  {"_id": "app", "logging": {"level": "debug"}, "hosts": ["a", "b"]}
//!
//! settings:app:logging:level = debug
//! settings:app:hosts:0       = a
//! settings:app:hosts:1       = b
//! ```
//!
//! Fields starting with `_` are store metadata and are skipped at every
//! depth. The flat mapping lives in an immutable [`Snapshot`] that is
//! replaced whole on every reload; lookups never block and never observe a
//! half-built mapping.
//!
//! # Providers
//!
//! - [`CouchDbConfigProvider`] implements [`ConfigurationProvider`]: initial
//!   [`load`](ConfigurationProvider::load), lookups, child-key listings and a
//!   [`ReloadToken`] that fires after every reload. Writes fail with
//!   [`ConfigError::ReadOnly`].
//! - [`DocumentFileProvider`] exposes each document as a read-only file with
//!   per-document change watches.
//!
//! # Features
//!
//! - `watch` (default): follow the database's continuous change feed and
//!   reload after each burst of changes.
//!
//! ```no_run
//! # async fn demo() -> couchconf_config::Result<()> {
//! use couchconf_config::{ConfigurationProvider, CouchDbConfigProvider, CouchDbOptions};
//!
//! let provider = CouchDbConfigProvider::new(CouchDbOptions::from_url("http://localhost:5984/settings")?)?;
//! provider.load().await?;
//!
//! let level = provider.try_get("settings:app:logging:level");
//! let token = provider.reload_token();
//! token.changed().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod files;
mod flatten;
mod options;
pub mod path;
mod provider;
mod snapshot;
mod store;
mod token;
mod value;

pub use client::DocumentClient;
pub use error::{ConfigError, Result};
pub use files::{DocumentFileInfo, DocumentFileProvider};
pub use flatten::{Document, flatten_document, flatten_documents};
pub use options::{CouchDbOptions, WatchOptions};
pub use provider::{ConfigurationProvider, CouchDbConfigProvider};
pub use snapshot::Snapshot;
pub use store::SnapshotStore;
pub use token::ReloadToken;
pub use value::ScalarValue;
