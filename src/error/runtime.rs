use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors which _may_ be recoverable, transient, or only affect a part of the operation, and
/// should be reported via the recovery sink, but will not outright stop the activity loop.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
#[diagnostic(url(docsrs))]
pub enum RuntimeError {
	/// A path could not be resolved to its absolute form.
	#[error("resolving path {path:?}: {err}")]
	#[diagnostic(code(activity::runtime::path_resolve))]
	PathResolve {
		/// The path that failed to resolve.
		path: PathBuf,

		/// The underlying error.
		#[source]
		err: std::io::Error,
	},

	/// A glob pattern in `watch.paths` or `ignore.paths` failed to compile or expand.
	#[error("glob {pattern:?}: {err}")]
	#[diagnostic(code(activity::runtime::glob))]
	Glob {
		/// The offending pattern.
		pattern: String,

		/// The underlying error.
		#[source]
		err: glob::PatternError,
	},

	/// The command could not be started.
	#[error("spawning '{program}': {err}")]
	#[diagnostic(code(activity::runtime::spawn))]
	Spawn {
		/// The program that failed to launch (argv\[0\]).
		program: String,

		/// The underlying error.
		#[source]
		err: std::io::Error,
	},

	/// The child's stdout or stderr could not be attached.
	#[error("attaching pipes to '{program}': {0}", program = .program)]
	#[diagnostic(code(activity::runtime::pipe))]
	Pipe {
		/// The program whose pipes failed.
		program: String,
	},

	/// Generic I/O error while operating on a live process (signal, kill, wait).
	#[error("operating on process: {0}")]
	#[diagnostic(code(activity::runtime::process))]
	Process(#[source] std::io::Error),

	/// The filesystem watcher failed to create or attach to one or more paths.
	#[error("fs watcher: {0}")]
	#[diagnostic(code(activity::runtime::fs_watcher))]
	FsWatcher(#[source] notify::Error),

	/// Walking a directory during indexing failed part-way through.
	#[error("walking {root:?}: {err}")]
	#[diagnostic(code(activity::runtime::walk))]
	Walk {
		/// The root that was being walked.
		root: PathBuf,

		/// The underlying error.
		#[source]
		err: walkdir::Error,
	},

	/// A set of related runtime errors, reported together.
	#[error("related: {0:?}")]
	#[diagnostic(code(activity::runtime::set))]
	Set(#[related] Vec<RuntimeError>),
}
