//! A one-shot, read-many/write-once cancellation signal shared by every command spawned
//! during one run context.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use tokio::sync::Notify;

/// The cancellation token for a single run context.
///
/// Cloning is cheap and shares the same underlying flag: any clone can trigger the
/// cancellation, and every clone observes it. A fresh [`CancelToken`] must be minted for
/// each new run context rather than reused — see the design notes on restart.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
	flag: Arc<AtomicBool>,
	notify: Arc<Notify>,
}

impl CancelToken {
	/// Creates a new, not-yet-cancelled token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Triggers cancellation. Idempotent: cancelling an already-cancelled token is a no-op.
	pub fn cancel(&self) {
		if !self.flag.swap(true, Ordering::SeqCst) {
			self.notify.notify_waiters();
		}
	}

	/// Returns whether cancellation has already been triggered.
	///
	/// This is the cheap synchronous check used just before spawning a `Leaf`.
	pub fn is_cancelled(&self) -> bool {
		self.flag.load(Ordering::SeqCst)
	}

	/// Resolves once cancellation has been triggered.
	///
	/// If the token is already cancelled, returns immediately.
	pub async fn cancelled(&self) {
		if self.is_cancelled() {
			return;
		}

		// Notify::notified() must be constructed before re-checking the flag, else a
		// cancel() that races in between the first check and this call would be missed.
		let notified = self.notify.notified();
		if self.is_cancelled() {
			return;
		}
		notified.await;
	}
}
