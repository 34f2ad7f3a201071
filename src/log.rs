//! The log sink: one call per line of child output, plus system-level lifecycle tags.

use std::fmt;

/// What kind of record is being logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogTag {
	/// A line of a child's stdout.
	Out,
	/// A line of a child's stderr.
	Err,
	/// A lifecycle record about a command itself (Running/Finished).
	Cmd,
	/// Initial indexing of watch roots is underway.
	Indexing,
	/// A filesystem event was accepted and is about to restart the main task.
	FileChanged,
	/// A watched file was removed.
	Removed,
	/// A watched file was changed (created, written, or renamed).
	Changed,
	/// An error was observed on the watcher stream.
	WatchError,
	/// A generic error record.
	Error,
}

impl fmt::Display for LogTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Out => "Out",
			Self::Err => "Err",
			Self::Cmd => "Cmd",
			Self::Indexing => "Indexing",
			Self::FileChanged => "File Changed",
			Self::Removed => "Removed",
			Self::Changed => "Changed",
			Self::WatchError => "Watch Error",
			Self::Error => "Error",
		})
	}
}

/// A sink for one log record at a time.
///
/// Implementations must be safe to call concurrently from any number of tasks: the same
/// command may have two readers (stdout, stderr) pushing through this at once, and several
/// commands may be running in parallel under one `Parallel` node.
pub trait LogSink: Send + Sync {
	/// Record a single line or lifecycle message, tagged with its kind.
	fn log(&self, tag: LogTag, message: &str);
}

/// The default log sink: forwards every record to `tracing`.
///
/// Installing a format/target for these events (colorized terminal output, JSON, etc.) is the
/// embedder's job via a `tracing-subscriber` layer; this crate only emits through the `tracing`
/// facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
	fn log(&self, tag: LogTag, message: &str) {
		match tag {
			LogTag::Out | LogTag::Err | LogTag::Cmd => {
				tracing::info!(tag = %tag, "{message}");
			}
			LogTag::WatchError | LogTag::Error => {
				tracing::warn!(tag = %tag, "{message}");
			}
			LogTag::Indexing | LogTag::FileChanged | LogTag::Removed | LogTag::Changed => {
				tracing::debug!(tag = %tag, "{message}");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::{LogSink, LogTag, TracingLogSink};

	#[derive(Default)]
	pub struct RecordingLogSink(pub Mutex<Vec<(LogTag, String)>>);

	impl LogSink for RecordingLogSink {
		fn log(&self, tag: LogTag, message: &str) {
			self.0.lock().unwrap().push((tag, message.to_owned()));
		}
	}

	#[test]
	fn tracing_sink_does_not_panic() {
		tracing_subscriber::fmt::try_init().ok();
		TracingLogSink.log(LogTag::Cmd, "Running 'echo'");
		TracingLogSink.log(LogTag::Error, "boom");
	}

	#[test]
	fn tag_display_matches_spec_wording() {
		assert_eq!(LogTag::FileChanged.to_string(), "File Changed");
		assert_eq!(LogTag::WatchError.to_string(), "Watch Error");
	}
}
