//! A running child process, grouped or not, and the small set of operations the command runner
//! needs from it.

use std::process::ExitStatus;

use command_group::AsyncGroupChild;
use tokio::process::Child;

use crate::error::RuntimeError;

/// A spawned child, in whichever shape the platform could give us.
///
/// Grouping (via `command-group`) puts the child in its own process group / job object so that
/// killing it also reaches any further children it spawned; this is attempted first and is the
/// normal case. If group creation itself fails for some reason, we fall back to spawning the
/// child directly rather than failing the whole command.
pub enum Process {
	/// The child is the leader of its own process group.
	Grouped(AsyncGroupChild),
	/// The child is a plain, ungrouped process.
	Ungrouped(Child),
	/// The child has already been waited on; further operations are no-ops.
	Done(ExitStatus),
}

impl Process {
	/// Returns the exit status if the child has already finished, without blocking.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Process`] if the underlying `try_wait` call fails.
	pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, RuntimeError> {
		match self {
			Self::Grouped(child) => child.try_wait().map_err(RuntimeError::Process),
			Self::Ungrouped(child) => child.try_wait().map_err(RuntimeError::Process),
			Self::Done(status) => Ok(Some(*status)),
		}
	}

	/// Waits for the child to exit, consuming it into [`Self::Done`].
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Process`] if the underlying `wait` call fails.
	pub async fn wait(&mut self) -> Result<ExitStatus, RuntimeError> {
		let status = match self {
			Self::Grouped(child) => child.wait().await.map_err(RuntimeError::Process)?,
			Self::Ungrouped(child) => child.wait().await.map_err(RuntimeError::Process)?,
			Self::Done(status) => return Ok(*status),
		};
		*self = Self::Done(status);
		Ok(status)
	}

	/// Forcibly kills the child (and, if grouped, every process in its group).
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Process`] if the underlying kill call fails. Killing an already
	/// exited child is not an error.
	pub async fn kill(&mut self) -> Result<(), RuntimeError> {
		match self {
			Self::Grouped(child) => child.kill().map_err(RuntimeError::Process),
			Self::Ungrouped(child) => child.start_kill().map_err(RuntimeError::Process),
			Self::Done(_) => Ok(()),
		}
	}

	/// Sends an interrupt as a defensive follow-up to [`Self::kill`], for platforms or
	/// process shapes where the group kill may not have reached every descendant.
	///
	/// On unix this is `SIGINT`; on other platforms this degrades to [`Self::kill`] again,
	/// since there is no equivalent distinct signal to send.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Process`] if the underlying signal call fails.
	#[cfg(unix)]
	pub fn interrupt(&mut self) -> Result<(), RuntimeError> {
		use command_group::Signal;

		match self {
			Self::Grouped(child) => child.signal(Signal::SIGINT).map_err(RuntimeError::Process),
			// An ungrouped child has no group to forward a signal to; killing it directly is
			// the best we can do, and it was likely already sent a kill just before this.
			Self::Ungrouped(child) => child.start_kill().map_err(RuntimeError::Process),
			Self::Done(_) => Ok(()),
		}
	}

	/// See [`Self::interrupt`]; on non-unix platforms this is just another kill.
	#[cfg(not(unix))]
	pub async fn interrupt(&mut self) -> Result<(), RuntimeError> {
		self.kill().await
	}
}
