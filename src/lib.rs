//! Watch a set of paths and re-run a tree of shell commands whenever something changes in them.
//!
//! The pieces, roughly bottom-up:
//!
//! - [`command`] spawns one shell command and streams its output.
//! - [`task`] is a tree of commands (leaf, parallel, sequence) and its recursive executor.
//! - [`matcher`] decides whether a changed path should count, given watch/ignore rules.
//! - [`fs`] wraps the OS-level file watcher.
//! - [`model`] is the `serde`-deserializable shape an embedder builds an [`model::Activity`] from.
//! - [`activity`] is the loop that ties all of the above together: index, run `before`, run
//!   `main`, then restart `main` on every accepted, debounced change until shutdown, then run
//!   `after`.
//!
//! Recoverable failures (a glob that didn't parse, a command that failed to spawn, a watcher
//! hiccup on one path) are reported through a [`recovery::RecoverySink`] and do not stop the
//! loop; failures that make continuing meaningless (the watcher can't be created at all, the
//! shutdown signal handler can't be installed, a subtask panicked) surface as
//! [`error::CriticalError`] and end [`activity::run`].

#![forbid(unsafe_code)]

pub mod activity;
pub mod cancel;
pub mod command;
pub mod error;
pub mod fs;
pub mod log;
pub mod matcher;
pub mod model;
pub mod recovery;
pub mod signal;
pub mod task;

#[doc(inline)]
pub use activity::run;
#[doc(inline)]
pub use cancel::CancelToken;
#[doc(inline)]
pub use error::{CriticalError, RuntimeError};
#[doc(inline)]
pub use model::Activity;
