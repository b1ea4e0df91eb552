//! Sequence filtering and trailing-edge debounce for change events.
//!
//! Both types are plain state machines owned by the watcher task. The
//! debouncer never runs user code: when its deadline passes the owner takes a
//! [`ReloadRequest`] out of it and posts that as a message.

use std::time::Duration;

use tokio::time::Instant;

use crate::ChangeEvent;

/// Accepts only strictly increasing sequence numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceTracker {
	last: Option<i64>,
}

impl SequenceTracker {
	/// Creates a tracker that accepts any first sequence number.
	pub const fn new() -> Self {
		Self { last: None }
	}

	/// Records `seq` and returns true if it is newer than every accepted one.
	pub fn accept(&mut self, seq: i64) -> bool {
		if self.last.is_some_and(|last| seq <= last) {
			return false;
		}
		self.last = Some(seq);
		true
	}

	/// Last accepted sequence number.
	pub const fn last(&self) -> Option<i64> {
		self.last
	}
}

/// Request for a full reload, emitted once per quiet period.
///
/// `seq` and `id` describe the event that last armed the debouncer. They are
/// informational; the recovery is always a full reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
	/// Sequence number of the triggering event.
	pub seq: i64,
	/// Document id of the triggering event.
	pub id: String,
}

impl From<ChangeEvent> for ReloadRequest {
	fn from(event: ChangeEvent) -> Self {
		Self {
			seq: event.seq,
			id: event.id,
		}
	}
}

#[derive(Debug)]
struct Pending {
	deadline: Instant,
	event: ChangeEvent,
}

/// Trailing-edge debouncer.
///
/// At most one request is pending. Arming while pending replaces both the
/// deadline and the event.
#[derive(Debug)]
pub struct Debouncer {
	window: Duration,
	pending: Option<Pending>,
}

impl Debouncer {
	/// Creates an idle debouncer with the given quiet window.
	pub const fn new(window: Duration) -> Self {
		Self { window, pending: None }
	}

	/// Quiet window.
	pub const fn window(&self) -> Duration {
		self.window
	}

	/// Arms (or re-arms) the timer for `event`.
	///
	/// Returns true if a pending request was superseded.
	pub fn arm(&mut self, event: ChangeEvent) -> bool {
		let deadline = Instant::now() + self.window;
		self.pending.replace(Pending { deadline, event }).is_some()
	}

	/// Returns true while a request is waiting for its quiet period.
	pub const fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Deadline of the pending request.
	pub fn deadline(&self) -> Option<Instant> {
		self.pending.as_ref().map(|pending| pending.deadline)
	}

	/// Takes the pending request if its deadline has passed at `now`.
	pub fn poll_due(&mut self, now: Instant) -> Option<ReloadRequest> {
		if self.deadline()? > now {
			return None;
		}
		self.pending.take().map(|pending| pending.event.into())
	}

	/// Waits for the pending deadline, then takes the request.
	///
	/// Resolves to `None` immediately when idle. Cancel safe: dropping the
	/// future leaves the pending request in place.
	pub async fn expired(&mut self) -> Option<ReloadRequest> {
		let deadline = self.deadline()?;
		tokio::time::sleep_until(deadline).await;
		self.poll_due(Instant::now())
	}

	/// Drops the pending request without firing it.
	pub fn cancel(&mut self) -> bool {
		self.pending.take().is_some()
	}
}
