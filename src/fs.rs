//! C4: the file watcher adapter — a thin, resource-owning wrapper over `notify`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use atomic_take::AtomicTake;
use notify::{Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use walkdir::WalkDir;

use crate::error::RuntimeError;

/// A live filesystem watch, plus the two channels its callback feeds.
///
/// Construction installs a `notify` callback that forwards every event and error onto unbounded
/// channels; [`Self::events`] and [`Self::errors`] hand out the receiving halves exactly once.
/// Dropping the adapter drops the underlying `notify::Watcher`, which stops the OS-level watch.
pub struct FileWatcherAdapter {
	watcher: Box<dyn Watcher + Send>,
	events: AtomicTake<UnboundedReceiver<Event>>,
	errors: AtomicTake<UnboundedReceiver<notify::Error>>,
}

impl FileWatcherAdapter {
	/// Creates a new adapter with no paths watched yet.
	///
	/// When `legacy` is true, a polling backend is used instead of the platform's native
	/// notification mechanism; this trades latency and CPU for reliability on filesystems
	/// (network mounts, some container overlays) where native notification is unreliable.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::FsWatcher`] if the platform watcher could not be created at all
	/// (as opposed to failing on a specific path, which happens later in [`Self::watch`]).
	pub fn new(legacy: bool) -> Result<Self, RuntimeError> {
		let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
		let (error_tx, error_rx) = tokio::sync::mpsc::unbounded_channel();

		let watcher: Box<dyn Watcher + Send> = if legacy {
			Box::new(
				PollWatcher::new(
					handler(event_tx, error_tx),
					notify::Config::default().with_poll_interval(Duration::from_secs(1)),
				)
				.map_err(RuntimeError::FsWatcher)?,
			)
		} else {
			Box::new(
				RecommendedWatcher::new(handler(event_tx, error_tx), notify::Config::default())
					.map_err(RuntimeError::FsWatcher)?,
			)
		};

		Ok(Self {
			watcher,
			events: AtomicTake::new(event_rx),
			errors: AtomicTake::new(error_rx),
		})
	}

	/// Recursively walks `root`, returning every regular file found.
	///
	/// This is the initial indexing pass: it does not itself install any watch.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Walk`] if the walk fails partway through (e.g. a directory is
	/// removed while being traversed, or permissions are denied).
	pub fn walk(root: &Path) -> Result<Vec<PathBuf>, RuntimeError> {
		let mut files = Vec::new();
		for entry in WalkDir::new(root) {
			let entry = entry.map_err(|err| RuntimeError::Walk { root: root.to_path_buf(), err })?;
			if entry.file_type().is_file() {
				files.push(entry.into_path());
			}
		}
		Ok(files)
	}

	/// Starts watching `root` recursively.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::FsWatcher`] if the path cannot be attached (doesn't exist, no
	/// permission, or an OS-level watch limit was hit).
	pub fn watch(&mut self, root: &Path) -> Result<(), RuntimeError> {
		self.watcher.watch(root, RecursiveMode::Recursive).map_err(RuntimeError::FsWatcher)
	}

	/// Stops watching `path` (and everything under it, if it was a directory watch).
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::FsWatcher`] if the watcher never had this path registered, or the
	/// platform backend refuses the removal.
	pub fn remove(&mut self, path: &Path) -> Result<(), RuntimeError> {
		self.watcher.unwatch(path).map_err(RuntimeError::FsWatcher)
	}

	/// Takes the event receiver.
	///
	/// # Panics
	///
	/// Panics if called more than once on the same adapter.
	pub fn events(&self) -> UnboundedReceiver<Event> {
		self.events.take().expect("events() called more than once")
	}

	/// Takes the error receiver.
	///
	/// # Panics
	///
	/// Panics if called more than once on the same adapter.
	pub fn errors(&self) -> UnboundedReceiver<notify::Error> {
		self.errors.take().expect("errors() called more than once")
	}
}

/// Builds the callback shared by both the native and polling backends.
fn handler(
	event_tx: UnboundedSender<Event>,
	error_tx: UnboundedSender<notify::Error>,
) -> impl FnMut(Result<Event, notify::Error>) + Send + 'static {
	move |result: Result<Event, notify::Error>| match result {
		Ok(event) => forward(&event_tx, event),
		Err(err) => forward(&error_tx, err),
	}
}

fn forward<T>(tx: &UnboundedSender<T>, value: T) {
	// The activity loop may already be shutting down and have dropped its receiver; a send
	// failure here is simply lost telemetry, not a reason to panic inside notify's callback.
	let _ = tx.send(value);
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::FileWatcherAdapter;

	#[tokio::test]
	async fn walk_finds_files() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
		std::fs::create_dir(dir.path().join("sub")).unwrap();
		std::fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

		let mut files = FileWatcherAdapter::walk(dir.path()).unwrap();
		files.sort();
		assert_eq!(files.len(), 2);
	}

	#[tokio::test]
	async fn watch_reports_a_write() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("watched.txt");
		std::fs::write(&file, b"initial").unwrap();

		let mut adapter = FileWatcherAdapter::new(false).unwrap();
		adapter.watch(dir.path()).unwrap();
		let mut events = adapter.events();

		tokio::time::sleep(Duration::from_millis(100)).await;
		std::fs::write(&file, b"changed").unwrap();

		let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
			.await
			.expect("an event should arrive")
			.expect("channel should stay open");
		assert!(event.paths.iter().any(|p| p == &file));
	}

	#[tokio::test]
	async fn legacy_watcher_also_reports_a_write() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("watched.txt");
		std::fs::write(&file, b"initial").unwrap();

		let mut adapter = FileWatcherAdapter::new(true).unwrap();
		adapter.watch(dir.path()).unwrap();
		let mut events = adapter.events();

		tokio::time::sleep(Duration::from_millis(100)).await;
		std::fs::write(&file, b"changed").unwrap();

		let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
			.await
			.expect("the poll watcher should eventually notice the write")
			.expect("channel should stay open");
		assert!(event.paths.iter().any(|p| p == &file));
	}
}
