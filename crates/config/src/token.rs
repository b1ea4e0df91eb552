use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Hands out snapshot generations; clones share one counter.
#[derive(Debug, Default, Clone)]
pub(crate) struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// The first [`next`](Self::next) yields 1.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// One-shot notification that the snapshot it was handed out with has been
/// replaced.
///
/// Tokens are cheap to clone; every clone fires together. Once fired a token
/// stays fired, so callers re-acquire a fresh token from the provider after
/// each change.
#[derive(Debug, Clone)]
pub struct ReloadToken {
	generation: u64,
	fired: CancellationToken,
}

impl ReloadToken {
	pub(crate) fn new(generation: u64) -> Self {
		Self {
			generation,
			fired: CancellationToken::new(),
		}
	}

	/// Generation of the snapshot this token guards.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true once a newer snapshot has been published.
	pub fn has_changed(&self) -> bool {
		self.fired.is_cancelled()
	}

	/// Resolves when a newer snapshot has been published.
	pub async fn changed(&self) {
		self.fired.cancelled().await;
	}

	/// Owned variant of [`changed`](Self::changed) for spawned tasks.
	pub fn into_changed(self) -> WaitForCancellationFutureOwned {
		self.fired.cancelled_owned()
	}

	pub(crate) fn fire(&self) {
		self.fired.cancel();
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn generations_increase() {
		let clock = GenerationClock::new();
		assert_eq!(clock.next(), 1);
		assert_eq!(clock.clone().next(), 2);
		assert_eq!(clock.next(), 3);
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn clones_fire_together() {
		let token = ReloadToken::new(4);
		let clone = token.clone();
		assert!(!clone.has_changed());

		let waiter = tokio::spawn(clone.into_changed());
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!waiter.is_finished());

		token.fire();
		tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
		assert!(token.has_changed());
		assert_eq!(token.generation(), 4);

		// Fired tokens resolve immediately.
		token.changed().await;
	}
}
