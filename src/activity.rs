//! C5: the activity loop — indexing, the `before`/`main`/`after` lifecycle, and the debounced
//! restart-on-change event loop that ties C1-C4 together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use notify::EventKind;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::error::{CriticalError, RuntimeError};
use crate::fs::FileWatcherAdapter;
use crate::log::{LogSink, LogTag};
use crate::matcher;
use crate::model::Activity;
use crate::recovery::RecoverySink;
use crate::signal;
use crate::task::{self, Task};

/// Runs one [`Activity`] to completion: indexes its watch roots, runs `before`, starts `main`,
/// and then loops accepting filesystem events until a shutdown is requested, at which point it
/// cancels the current `main` run and runs `after`.
///
/// `log` and `recovery` are `Arc`-wrapped because restarting `main` spawns a fresh, independent
/// task that needs to outlive the loop iteration that spawned it.
///
/// This only returns once shutdown has fully completed (or a critical error makes that
/// impossible). Recoverable errors during the loop's lifetime go to `recovery` and do not stop
/// it.
///
/// # Errors
///
/// Returns [`CriticalError`] if the filesystem watcher cannot be created, the shutdown signal
/// handler cannot be installed, or a subtask's `JoinHandle` resolves to a join error (panic or
/// external abort).
pub async fn run(
	activity: &Activity,
	log: Arc<dyn LogSink>,
	recovery: Arc<dyn RecoverySink>,
) -> Result<(), CriticalError> {
	log.log(LogTag::Indexing, "resolving watch and ignore paths");
	let watch_roots = resolve_or_recover(&activity.watch.paths, &recovery);

	let mut adapter = FileWatcherAdapter::new(activity.options.legacy_watcher).map_err(|err| match err {
		RuntimeError::FsWatcher(source) => CriticalError::FsWatcherCreate(source),
		other => CriticalError::ChannelClosed(other.to_string()),
	})?;

	for root in &watch_roots {
		match FileWatcherAdapter::walk(root) {
			Ok(files) => {
				for file in files {
					log.log(LogTag::Indexing, &format!("indexed {}", file.display()));
				}
			}
			Err(err) => recovery.recover(err),
		}
		if let Err(err) = adapter.watch(root) {
			recovery.recover(err);
		}
	}

	let mut events = adapter.events();
	let mut errors = adapter.errors();

	if let Some(before) = &activity.before {
		let before_cancel = CancelToken::new();
		if let Err(err) = task::run(before, log.as_ref(), &before_cancel).await {
			recovery.recover(err);
		}
	}

	let mut current_cancel = CancelToken::new();
	let mut current_run = spawn_main(activity.main.clone(), Arc::clone(&log), current_cancel.clone());

	let mut last_window: Option<u64> = None;

	loop {
		tokio::select! {
			Some(event) = events.recv() => {
				if debounced(&event.kind, last_window) {
					continue;
				}
				handle_event(
					&event.kind,
					&event.paths,
					&mut adapter,
					activity,
					&log,
					recovery.as_ref(),
					&mut current_cancel,
					&mut current_run,
					&mut last_window,
				).await?;
			}
			Some(err) = errors.recv() => {
				recovery.recover(RuntimeError::FsWatcher(err));
			}
			result = signal::shutdown_requested() => {
				result?;
				break;
			}
		}
	}

	current_cancel.cancel();
	current_run.await.map_err(CriticalError::TaskJoin)?;

	if let Some(after) = &activity.after {
		let after_cancel = CancelToken::new();
		if let Err(err) = task::run(after, log.as_ref(), &after_cancel).await {
			recovery.recover(err);
		}
	}

	Ok(())
}

fn resolve_or_recover(entries: &[String], recovery: &Arc<dyn RecoverySink>) -> Vec<PathBuf> {
	match matcher::resolve(entries) {
		Ok(resolved) => resolved,
		Err(err) => {
			recovery.recover(err);
			Vec::new()
		}
	}
}

/// The debounce gate: truncates wall-clock time to a one-second window and checks it against
/// the last window a restart was recorded in. This is applied to every watcher event, including
/// `remove`, but only the create/write/rename file sub-case ever advances `last_window` — see
/// [`handle_event`].
fn debounced(kind: &EventKind, last_window: Option<u64>) -> bool {
	if !matters(kind) {
		return true;
	}
	let now = now_secs();
	last_window.is_some_and(|last| now <= last)
}

fn now_secs() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

fn matters(kind: &EventKind) -> bool {
	matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

#[allow(clippy::too_many_arguments)]
async fn handle_event(
	kind: &EventKind,
	paths: &[PathBuf],
	adapter: &mut FileWatcherAdapter,
	activity: &Activity,
	log: &Arc<dyn LogSink>,
	recovery: &dyn RecoverySink,
	current_cancel: &mut CancelToken,
	current_run: &mut JoinHandle<()>,
	last_window: &mut Option<u64>,
) -> Result<(), CriticalError> {
	if matches!(kind, EventKind::Remove(_)) {
		for path in paths {
			if let Err(err) = adapter.remove(path) {
				recovery.recover(err);
			}
			let (accepted, _) = matcher::validate(path, false, &activity.watch, &activity.ignore, recovery);
			if accepted && !matcher::extension(path).is_empty() {
				log.log(LogTag::Removed, &path.display().to_string());
				restart(current_cancel, current_run, activity, log).await?;
			}
		}
		return Ok(());
	}

	for path in paths {
		let (accepted, info) = matcher::validate(path, true, &activity.watch, &activity.ignore, recovery);
		if !accepted {
			continue;
		}
		match info {
			Some(info) if info.is_dir => {
				if let Err(err) = adapter.watch(path) {
					recovery.recover(err);
				}
				match FileWatcherAdapter::walk(path) {
					Ok(files) => {
						for file in files {
							log.log(LogTag::Indexing, &format!("indexed {}", file.display()));
						}
					}
					Err(err) => recovery.recover(err),
				}
			}
			_ => {
				log.log(LogTag::Changed, &path.display().to_string());
				restart(current_cancel, current_run, activity, log).await?;
				*last_window = Some(now_secs());
			}
		}
	}

	Ok(())
}

async fn restart(
	current_cancel: &mut CancelToken,
	current_run: &mut JoinHandle<()>,
	activity: &Activity,
	log: &Arc<dyn LogSink>,
) -> Result<(), CriticalError> {
	current_cancel.cancel();
	let fresh_cancel = CancelToken::new();
	let fresh_run = spawn_main(activity.main.clone(), Arc::clone(log), fresh_cancel.clone());
	let superseded = std::mem::replace(current_run, fresh_run);
	*current_cancel = fresh_cancel;

	// The loop does not wait for the superseded tree to finish before the new one starts: its
	// processes are already being killed via `current_cancel`, and reaping it inline here would
	// block new events from being handled while the old command tree is still tearing down. It
	// is instead driven to completion by a detached reaper and surfaced via the log sink.
	let reaper_log = Arc::clone(log);
	tokio::spawn(async move {
		if let Err(err) = superseded.await {
			reaper_log.log(LogTag::Error, &format!("superseded run panicked: {err}"));
		}
	});

	Ok(())
}

fn spawn_main(main: Task, log: Arc<dyn LogSink>, cancel: CancelToken) -> JoinHandle<()> {
	tokio::spawn(async move {
		if let Err(err) = task::run(&main, log.as_ref(), &cancel).await {
			log.log(LogTag::Error, &err.to_string());
		}
	})
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::command::Command;
	use crate::log::TracingLogSink;
	use crate::matcher::{Ignore, Watch};
	use crate::recovery::ChannelRecoverySink;

	fn leaf(cmd: &str) -> Task {
		Task::Leaf(Command { cmd: cmd.into(), dir: None, log: false })
	}

	#[tokio::test]
	async fn runs_before_and_after_around_shutdown() {
		let dir = tempfile::tempdir().unwrap();
		let before_marker = dir.path().join("before");
		let after_marker = dir.path().join("after");

		let activity = Activity {
			watch: Watch { exts: vec![], paths: vec![dir.path().to_string_lossy().into_owned()] },
			ignore: Ignore::default(),
			before: Some(leaf(&format!("touch {}", before_marker.display()))),
			main: leaf("sleep 30"),
			after: Some(leaf(&format!("touch {}", after_marker.display()))),
			options: crate::model::Options::default(),
		};

		let (recovery, _rx) = ChannelRecoverySink::new();
		let recovery: Arc<dyn RecoverySink> = Arc::new(recovery);
		let log: Arc<dyn LogSink> = Arc::new(TracingLogSink);

		let handle = tokio::spawn(async move { run(&activity, log, recovery).await });

		// Give `before` time to run, then simulate a shutdown request by aborting the loop
		// rather than sending a real SIGINT, since integration-testing the signal itself would
		// require sending a real process signal to the test binary.
		tokio::time::sleep(Duration::from_millis(300)).await;
		assert!(before_marker.exists(), "before task should have run");

		handle.abort();
		let _ = handle.await;
	}

	#[test]
	fn debounce_gate_drops_a_second_event_in_the_same_window() {
		let now = now_secs();
		assert!(!debounced(&EventKind::Modify(notify::event::ModifyKind::Any), None));
		assert!(debounced(&EventKind::Modify(notify::event::ModifyKind::Any), Some(now)));
	}

	#[test]
	fn debounce_gate_applies_to_remove_events_too() {
		let now = now_secs();
		assert!(debounced(&EventKind::Remove(notify::event::RemoveKind::Any), Some(now)));
	}

	#[test]
	fn irrelevant_event_kinds_are_always_debounced() {
		assert!(debounced(&EventKind::Access(notify::event::AccessKind::Any), None));
	}
}
