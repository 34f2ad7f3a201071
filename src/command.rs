//! A single shell command: what it is, and how it turns into a spawnable child process.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::process::Command as TokioCommand;

use crate::error::RuntimeError;

pub mod process;
pub mod runner;

#[doc(inline)]
pub use runner::exec;

/// One leaf command: a program plus arguments, an optional working directory, and whether its
/// output should be sent through the log sink.
///
/// `cmd` is tokenized on ASCII spaces with no shell interpretation and no quoting: the first
/// token is the program, and every other token is passed to it verbatim as one argument. A
/// command that needs shell features (globbing, pipes, redirection, quoting) must invoke a
/// shell explicitly, e.g. `cmd: "sh -c \"echo a && echo b\""`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Command {
	/// The full command line, ASCII-space tokenized.
	pub cmd: String,

	/// Working directory to spawn the child in. Defaults to the current process's.
	#[serde(default)]
	pub dir: Option<String>,

	/// Whether the child's stdout/stderr lines are sent through the log sink.
	#[serde(default = "default_log")]
	pub log: bool,
}

fn default_log() -> bool {
	true
}

impl Command {
	/// Splits [`Self::cmd`] on ASCII spaces into `(program, args)`.
	///
	/// Runs of multiple spaces collapse, and leading/trailing whitespace is dropped — exactly
	/// `str::split_ascii_whitespace`'s semantics, not plain `split(' ')`.
	#[must_use]
	pub fn tokenize(&self) -> Vec<&str> {
		self.cmd.split_ascii_whitespace().collect()
	}

	/// The program name, i.e. the first token of [`Self::cmd`].
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Spawn`] if `cmd` tokenizes to nothing (empty or all-whitespace).
	pub fn program(&self) -> Result<&str, RuntimeError> {
		self.tokenize().first().copied().ok_or_else(|| RuntimeError::Spawn {
			program: self.cmd.clone(),
			err: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
		})
	}

	/// Builds a [`tokio::process::Command`] ready to spawn, with stdout/stderr piped.
	///
	/// # Errors
	///
	/// Returns [`RuntimeError::Spawn`] if `cmd` has no program token.
	pub fn to_tokio_command(&self) -> Result<TokioCommand, RuntimeError> {
		let tokens = self.tokenize();
		let (program, args) = tokens.split_first().ok_or_else(|| RuntimeError::Spawn {
			program: self.cmd.clone(),
			err: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
		})?;

		let mut command = TokioCommand::new(program);
		command.args(args);
		if let Some(dir) = &self.dir {
			command.current_dir(PathBuf::from(dir));
		}
		command.stdout(std::process::Stdio::piped());
		command.stderr(std::process::Stdio::piped());
		command.stdin(std::process::Stdio::null());
		command.kill_on_drop(true);

		Ok(command)
	}
}

#[cfg(test)]
mod tests {
	use super::Command;

	fn cmd(s: &str) -> Command {
		Command { cmd: s.into(), dir: None, log: true }
	}

	#[test]
	fn tokenizes_on_ascii_space() {
		assert_eq!(cmd("echo hello world").tokenize(), vec!["echo", "hello", "world"]);
	}

	#[test]
	fn collapses_repeated_spaces() {
		assert_eq!(cmd("echo   hello").tokenize(), vec!["echo", "hello"]);
	}

	#[test]
	fn program_is_first_token() {
		assert_eq!(cmd("cargo test --quiet").program().unwrap(), "cargo");
	}

	#[test]
	fn empty_command_errors() {
		assert!(cmd("   ").program().is_err());
	}

	#[test]
	fn to_tokio_command_sets_dir() {
		let c = Command { cmd: "echo hi".into(), dir: Some("/tmp".into()), log: true };
		// We can't introspect a tokio::process::Command's fields directly, but building it must
		// not error for a well-formed command.
		assert!(c.to_tokio_command().is_ok());
	}
}
