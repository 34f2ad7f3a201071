//! The recovery sink: where [`RuntimeError`](crate::error::RuntimeError)s are reported so the
//! activity loop can keep running instead of dying on the first hiccup.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::error::RuntimeError;

/// A sink for recoverable errors.
///
/// Unlike [`LogSink`](crate::log::LogSink), reporting here is never on the hot path of a
/// passing run: it only happens when something went wrong, so an implementation is free to be
/// louder or slower than the log sink.
pub trait RecoverySink: Send + Sync {
	/// Report one recoverable error.
	///
	/// Implementations must not block the caller indefinitely; a full or closed backing channel
	/// should be treated as "best effort" and swallowed rather than awaited on forever, since the
	/// activity loop has its own escalation path (via [`CriticalError::ChannelClosed`]) for the
	/// case where the sink itself is unusable.
	///
	/// [`CriticalError::ChannelClosed`]: crate::error::CriticalError::ChannelClosed
	fn recover(&self, err: RuntimeError);
}

/// A channel-backed [`RecoverySink`] paired with an [`UnboundedReceiver`] the embedder drains.
///
/// This is the shape named in the external interfaces: a sink that hands errors off to an
/// unbounded channel rather than formatting or logging them itself.
#[derive(Clone, Debug)]
pub struct ChannelRecoverySink {
	tx: UnboundedSender<RuntimeError>,
}

impl ChannelRecoverySink {
	/// Creates a paired sink and receiver.
	pub fn new() -> (Self, UnboundedReceiver<RuntimeError>) {
		let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl RecoverySink for ChannelRecoverySink {
	fn recover(&self, err: RuntimeError) {
		// An error here means the receiving half is gone; there is nothing further this sink can
		// do about it, and the caller is expected to be escalating via CriticalError already.
		let _ = self.tx.send(err);
	}
}

#[cfg(test)]
mod tests {
	use std::io;

	use super::{ChannelRecoverySink, RecoverySink};
	use crate::error::RuntimeError;

	#[tokio::test]
	async fn delivers_to_receiver() {
		let (sink, mut rx) = ChannelRecoverySink::new();
		sink.recover(RuntimeError::Process(io::Error::other("boom")));
		let received = rx.recv().await.expect("one error");
		assert!(matches!(received, RuntimeError::Process(_)));
	}

	#[test]
	fn survives_dropped_receiver() {
		let (sink, rx) = ChannelRecoverySink::new();
		drop(rx);
		sink.recover(RuntimeError::Process(io::Error::other("boom")));
	}
}
