use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinError;

use super::RuntimeError;

/// Errors which are not recoverable and stop the activity loop outright.
///
/// Per the error handling design, only failure to create the watcher, or to reach the event
/// loop at all, should surface here; everything else goes through [`RuntimeError`] and the
/// recovery sink.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
#[diagnostic(url(docsrs))]
pub enum CriticalError {
	/// The filesystem watcher could not be created at all.
	#[error("cannot create fs watcher: {0}")]
	#[diagnostic(code(activity::critical::fs_watcher_create))]
	FsWatcherCreate(#[source] notify::Error),

	/// Installing the shutdown signal handler failed.
	#[error("cannot install shutdown signal handler: {0}")]
	#[diagnostic(code(activity::critical::signal_handler))]
	SignalHandler(#[source] std::io::Error),

	/// One of the activity loop's subtasks panicked or was cancelled from outside.
	#[error("subtask join: {0}")]
	#[diagnostic(code(activity::critical::task_join))]
	TaskJoin(#[source] JoinError),

	/// A recoverable error escalated because a channel it needed was gone.
	#[error("internal channel closed: {0}")]
	#[diagnostic(code(activity::critical::channel_closed))]
	ChannelClosed(String),

	/// For custom critical errors raised by an embedder.
	#[error("external(critical): {0}")]
	#[diagnostic(code(activity::critical::external))]
	External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RuntimeError> for CriticalError {
	/// Upgrades a runtime error that could not be delivered to the recovery sink into a
	/// critical one, since a full channel or dead receiver means the loop itself is compromised.
	fn from(err: RuntimeError) -> Self {
		Self::ChannelClosed(err.to_string())
	}
}
