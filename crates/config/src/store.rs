use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::token::GenerationClock;
use crate::{ReloadToken, ScalarValue, Snapshot};

/// Holder of the current [`Snapshot`] and its [`ReloadToken`].
///
/// Readers are wait-free (`ArcSwap` load plus immutable map reads). Writers
/// build a complete mapping first and publish it with one pointer swap;
/// concurrent publishers race and the last swap wins.
#[derive(Debug)]
pub struct SnapshotStore {
	snap: ArcSwap<Snapshot>,
	token: ArcSwap<ReloadToken>,
	clock: GenerationClock,
}

impl Default for SnapshotStore {
	fn default() -> Self {
		Self::new()
	}
}

impl SnapshotStore {
	/// Creates a store holding an empty generation-0 snapshot.
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(Snapshot::empty()),
			token: ArcSwap::from_pointee(ReloadToken::new(0)),
			clock: GenerationClock::new(),
		}
	}

	/// Returns the current snapshot.
	pub fn current(&self) -> Arc<Snapshot> {
		self.snap.load_full()
	}

	#[inline]
	pub fn get(&self, key: &str) -> Option<ScalarValue> {
		self.snap.load().get(key).cloned()
	}

	/// Token that fires when the current snapshot is replaced.
	pub fn reload_token(&self) -> ReloadToken {
		self.token.load().as_ref().clone()
	}

	/// Replaces the snapshot and fires the outstanding token.
	///
	/// The snapshot is swapped before the token so that woken waiters read
	/// the new mapping. Returns the new generation.
	pub fn publish(&self, entries: BTreeMap<String, ScalarValue>) -> u64 {
		let generation = self.clock.next();
		let keys = entries.len();

		self.snap.store(Arc::new(Snapshot::new(entries, generation)));
		let previous = self.token.swap(Arc::new(ReloadToken::new(generation)));
		previous.fire();

		tracing::debug!(generation, keys, "config.snapshot_published");
		generation
	}
}
