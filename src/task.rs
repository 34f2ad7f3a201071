//! C3: the task tree, and its recursive, cooperatively-cancellable executor.

use async_recursion::async_recursion;
use futures::future::join_all;
use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::command::{self, Command};
use crate::error::RuntimeError;
use crate::log::LogSink;

/// A node in the task tree.
///
/// `Parallel` and `Series` both run their children in the order given, but `Parallel` fans them
/// all out at once while `Series` runs one at a time and stops early if cancellation fires
/// between children.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Task {
	/// A single command to run.
	Leaf(Command),
	/// Every child runs concurrently; this node completes when all of them have.
	Parallel(Vec<Task>),
	/// Children run one after another, in order.
	#[serde(rename = "sequence")]
	Series(Vec<Task>),
}

/// Runs `task` to completion, respecting `cancel`.
///
/// Cancellation is cooperative, not preemptive: a running [`Command`] is killed as soon as
/// `cancel` fires (see [`command::exec`]), but the check for whether to even start the *next*
/// leaf only happens right before that leaf would spawn. A `Leaf` already mid-execution when
/// cancellation fires always runs `exec` to its (killed) conclusion rather than being abandoned
/// mid-poll, so that process cleanup always happens.
///
/// # Errors
///
/// Returns the first [`RuntimeError`] encountered building or spawning a command. For
/// `Parallel`, if more than one child errors, they are collected into
/// [`RuntimeError::Set`](crate::error::RuntimeError::Set).
#[async_recursion]
pub async fn run(task: &Task, log: &dyn LogSink, cancel: &CancelToken) -> Result<(), RuntimeError> {
	if cancel.is_cancelled() {
		return Ok(());
	}

	match task {
		Task::Leaf(cmd) => command::exec(cmd, log, cancel).await,
		Task::Parallel(children) => {
			let results = join_all(children.iter().map(|child| run(child, log, cancel))).await;
			let errors: Vec<RuntimeError> = results.into_iter().filter_map(Result::err).collect();
			match errors.len() {
				0 => Ok(()),
				1 => Err(errors.into_iter().next().expect("len checked above")),
				_ => Err(RuntimeError::Set(errors)),
			}
		}
		Task::Series(children) => {
			for child in children {
				if cancel.is_cancelled() {
					break;
				}
				run(child, log, cancel).await?;
			}
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::{run, Task};
	use crate::cancel::CancelToken;
	use crate::command::Command;
	use crate::log::TracingLogSink;

	fn leaf(cmd: &str) -> Task {
		Task::Leaf(Command { cmd: cmd.into(), dir: None, log: false })
	}

	#[tokio::test]
	async fn series_runs_children_in_order() {
		let marker = tempfile::NamedTempFile::new().unwrap();
		let path = marker.path().to_str().unwrap();
		let tree = Task::Series(vec![
			leaf(&format!("sh -c \"echo a >> {path}\"")),
			leaf(&format!("sh -c \"echo b >> {path}\"")),
		]);

		let cancel = CancelToken::new();
		run(&tree, &TracingLogSink, &cancel).await.unwrap();

		let contents = std::fs::read_to_string(path).unwrap();
		assert_eq!(contents, "a\nb\n");
	}

	#[tokio::test]
	async fn parallel_runs_all_children() {
		let children: Vec<Task> = (0..4).map(|_| leaf("true")).collect();
		let tree = Task::Parallel(children);

		let cancel = CancelToken::new();
		run(&tree, &TracingLogSink, &cancel).await.unwrap();
	}

	#[tokio::test]
	async fn parallel_collects_multiple_errors_as_a_set() {
		let tree = Task::Parallel(vec![
			leaf("this-binary-does-not-exist-a"),
			leaf("this-binary-does-not-exist-b"),
		]);

		let cancel = CancelToken::new();
		let err = run(&tree, &TracingLogSink, &cancel).await.unwrap_err();
		assert!(matches!(err, crate::error::RuntimeError::Set(_)));
	}

	#[tokio::test]
	async fn already_cancelled_token_skips_everything() {
		let tree = Task::Series(vec![leaf("sleep 30")]);
		let cancel = CancelToken::new();
		cancel.cancel();

		let result = tokio::time::timeout(Duration::from_secs(2), run(&tree, &TracingLogSink, &cancel)).await;
		assert!(result.is_ok(), "a pre-cancelled run must return promptly");
	}

	#[tokio::test]
	async fn cancellation_mid_series_stops_before_next_leaf() {
		let tree = Task::Series(vec![leaf("true"), leaf("sleep 30"), leaf("true")]);
		let cancel = CancelToken::new();
		let cancel_for_task = cancel.clone();

		let handle = tokio::spawn(async move { run(&tree, &TracingLogSink, &cancel_for_task).await });
		tokio::time::sleep(Duration::from_millis(200)).await;
		cancel.cancel();

		let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
		assert!(result.is_ok(), "cancellation should unblock the sleeping leaf promptly");
	}
}
