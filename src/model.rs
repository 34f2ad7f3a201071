//! The config-shape data model: what an embedder deserializes to build an [`Activity`].

use serde::Deserialize;

use crate::matcher::{Ignore, Watch};
use crate::task::Task;

/// A complete description of one activity: what to watch, what to ignore, and the three task
/// trees that run around it (`before` once at startup, `main` on every accepted change, `after`
/// once at shutdown).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Activity {
	/// What to watch.
	pub watch: Watch,

	/// What to exclude from the watch.
	#[serde(default)]
	pub ignore: Ignore,

	/// Runs once before indexing completes and the event loop starts. Optional.
	#[serde(default)]
	pub before: Option<Task>,

	/// Runs once at startup (after `before`) and again after every accepted, debounced change.
	pub main: Task,

	/// Runs once, after the event loop has been told to shut down. Optional.
	#[serde(default)]
	pub after: Option<Task>,

	/// Knobs that affect how the filesystem watcher itself is set up, not what it watches.
	#[serde(default)]
	pub options: Options,
}

/// Watcher-level options, as opposed to the path-matching rules in [`Watch`]/[`Ignore`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Options {
	/// Use a polling watcher instead of the platform's native notification backend.
	///
	/// Native backends (inotify, FSEvents, ReadDirectoryChangesW) can be unreliable on some
	/// filesystems (network mounts, some container overlays); polling trades latency and CPU for
	/// reliability there.
	#[serde(default)]
	pub legacy_watcher: bool,
}

#[cfg(test)]
mod tests {
	use super::Activity;

	#[test]
	fn deserializes_minimal_shape() {
		let json = r#"{
			"watch": { "paths": ["src"] },
			"main": { "leaf": { "cmd": "cargo test" } }
		}"#;

		let activity: Activity = serde_json::from_str(json).unwrap();
		assert_eq!(activity.watch.paths, vec!["src".to_string()]);
		assert!(activity.before.is_none());
		assert!(activity.after.is_none());
		assert!(!activity.options.legacy_watcher);
	}

	#[test]
	fn legacy_watcher_defaults_to_false_but_can_be_set() {
		let json = r#"{
			"watch": { "paths": ["src"] },
			"main": { "leaf": { "cmd": "cargo test" } },
			"options": { "legacy_watcher": true }
		}"#;

		let activity: Activity = serde_json::from_str(json).unwrap();
		assert!(activity.options.legacy_watcher);
	}

	#[test]
	fn deserializes_full_shape_with_task_tree() {
		let json = r#"{
			"watch": { "paths": ["src", "tests"] },
			"ignore": { "dot": true, "exts": ["tmp"], "paths": ["target"] },
			"before": { "leaf": { "cmd": "echo starting" } },
			"main": {
				"sequence": [
					{ "leaf": { "cmd": "cargo build" } },
					{ "parallel": [
						{ "leaf": { "cmd": "cargo test --lib" } },
						{ "leaf": { "cmd": "cargo test --doc" } }
					] }
				]
			},
			"after": { "leaf": { "cmd": "echo stopped" } }
		}"#;

		let activity: Activity = serde_json::from_str(json).unwrap();
		assert!(activity.ignore.dot);
		assert_eq!(activity.ignore.exts, vec!["tmp".to_string()]);
		assert!(activity.before.is_some());
		assert!(activity.after.is_some());
	}
}
