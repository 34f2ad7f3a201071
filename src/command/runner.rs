//! C2: spawn one command, stream its output, and tear it down on cancellation.

use std::time::Instant;

use command_group::AsyncCommandGroup;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::process::Process;
use super::Command;
use crate::cancel::CancelToken;
use crate::error::RuntimeError;
use crate::log::{LogSink, LogTag};

/// Spawns `cmd`, streams its stdout/stderr through `log` line by line, and waits for it to
/// finish — or for `cancel` to fire, at which point the process (and its group, if any) is
/// killed.
///
/// A non-zero exit status is not itself an error: the caller decides what a failing command
/// means for the rest of the task tree. This returns `Ok(())` once the process is no longer
/// running, whatever its exit status was.
///
/// # Errors
///
/// Returns [`RuntimeError::Spawn`] if the command could not be started, or
/// [`RuntimeError::Pipe`] if its stdout/stderr could not be attached.
pub async fn exec(cmd: &Command, log: &dyn LogSink, cancel: &CancelToken) -> Result<(), RuntimeError> {
	let program = cmd.program()?.to_owned();
	let mut tokio_command = cmd.to_tokio_command()?;

	let mut process = match tokio_command.group_spawn() {
		Ok(grouped) => Process::Grouped(grouped),
		Err(_) => {
			let child = tokio_command.spawn().map_err(|err| RuntimeError::Spawn {
				program: program.clone(),
				err,
			})?;
			Process::Ungrouped(child)
		}
	};

	log.log(LogTag::Cmd, &format!("Running '{}'", display_name(&cmd.cmd)));

	let (stdout, stderr) = match &mut process {
		Process::Grouped(child) => (child.inner().stdout.take(), child.inner().stderr.take()),
		Process::Ungrouped(child) => (child.stdout.take(), child.stderr.take()),
		Process::Done(_) => (None, None),
	};
	let (stdout, stderr) = (
		stdout.ok_or_else(|| RuntimeError::Pipe { program: program.clone() })?,
		stderr.ok_or_else(|| RuntimeError::Pipe { program: program.clone() })?,
	);

	let started = Instant::now();
	let mut stdout_lines = BufReader::new(stdout).lines();
	let mut stderr_lines = BufReader::new(stderr).lines();
	let (mut stdout_done, mut stderr_done) = (false, false);

	loop {
		tokio::select! {
			result = process.wait(), if stdout_done && stderr_done => {
				result?;
				break;
			}
			line = stdout_lines.next_line(), if !stdout_done => {
				match line {
					Ok(Some(line)) if cmd.log => log.log(LogTag::Out, &line),
					Ok(Some(_)) => {}
					_ => stdout_done = true,
				}
			}
			line = stderr_lines.next_line(), if !stderr_done => {
				match line {
					Ok(Some(line)) if cmd.log => log.log(LogTag::Err, &line),
					Ok(Some(_)) => {}
					_ => stderr_done = true,
				}
			}
			() = cancel.cancelled() => {
				process.kill().await?;
				break;
			}
		}
	}

	// Defensive follow-up regardless of how the loop exited: a group kill (or a natural exit
	// racing a misbehaving descendant) doesn't always reach every process in the tree.
	#[cfg(unix)]
	process.interrupt()?;
	#[cfg(not(unix))]
	process.interrupt().await?;
	let _ = process.wait().await;

	log.log(
		LogTag::Cmd,
		&format!("Finished '{}' in {:.3}s", display_name(&cmd.cmd), started.elapsed().as_secs_f64()),
	);

	Ok(())
}

/// The `argv[0]` prefix of a command line, for display: everything before the first `" -"`
/// (where flags start), or the whole string if it has none.
fn display_name(cmd: &str) -> &str {
	cmd.find(" -").map_or(cmd, |idx| &cmd[..idx])
}

#[cfg(test)]
mod tests {
	use super::{display_name, exec};
	use crate::cancel::CancelToken;
	use crate::command::Command;
	use crate::log::TracingLogSink;

	fn cmd(s: &str) -> Command {
		Command { cmd: s.into(), dir: None, log: true }
	}

	#[tokio::test]
	async fn runs_to_completion() {
		let cancel = CancelToken::new();
		exec(&cmd("true"), &TracingLogSink, &cancel).await.unwrap();
	}

	#[tokio::test]
	async fn non_zero_exit_is_not_an_error() {
		let cancel = CancelToken::new();
		exec(&cmd("false"), &TracingLogSink, &cancel).await.unwrap();
	}

	#[tokio::test]
	async fn cancellation_kills_a_sleeping_child() {
		let cancel = CancelToken::new();
		let cancel_for_task = cancel.clone();

		let handle = tokio::spawn(async move {
			exec(&cmd("sleep 30"), &TracingLogSink, &cancel_for_task).await
		});

		tokio::time::sleep(std::time::Duration::from_millis(100)).await;
		cancel.cancel();

		let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
			.await
			.expect("exec should return promptly once cancelled")
			.expect("task join");
		assert!(result.is_ok());
	}

	#[test]
	fn display_name_truncates_before_flags() {
		assert_eq!(display_name("cargo test --quiet -- --nocapture"), "cargo test");
		assert_eq!(display_name("echo hello"), "echo hello");
	}

	#[tokio::test]
	async fn spawn_failure_is_reported() {
		let cancel = CancelToken::new();
		let err = exec(&cmd("this-binary-does-not-exist-anywhere"), &TracingLogSink, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(err, crate::error::RuntimeError::Spawn { .. }));
	}
}
