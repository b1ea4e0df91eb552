/// Connection lifecycle of a feed reader.
///
/// `Disconnected -> Connecting -> Streaming -> Disconnected` repeats until
/// cancellation moves the reader to `Stopped`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
	/// No connection; waiting out the retry delay or not yet started.
	#[default]
	Disconnected,
	/// Streaming request in flight.
	Connecting,
	/// Response headers received; reading lines.
	Streaming,
	/// Cancelled. No further connections are made.
	Stopped,
}

impl FeedState {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Streaming => "streaming",
			Self::Stopped => "stopped",
		}
	}

	/// Returns true once the reader has been cancelled.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Stopped)
	}
}
