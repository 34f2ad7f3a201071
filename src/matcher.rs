//! C1: deciding whether a changed path is one we care about.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::RuntimeError;
use crate::recovery::RecoverySink;

/// Roots and extra rules describing what to watch.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Watch {
	/// File extensions (without the leading dot) a changed path must have to be accepted.
	/// Empty means every extension is accepted.
	#[serde(default)]
	pub exts: Vec<String>,

	/// Root paths (and glob patterns) to walk and watch.
	#[serde(default)]
	pub paths: Vec<String>,
}

/// Rules describing what to exclude from an otherwise-matched watch.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Ignore {
	/// Dotfiles and dot-directories (anything whose final path component starts with `.`) are
	/// ignored when true.
	#[serde(default)]
	pub dot: bool,

	/// File extensions (without the leading dot) to ignore, e.g. `["tmp", "log"]`.
	#[serde(default)]
	pub exts: Vec<String>,

	/// Extra paths and glob patterns to ignore, matched the same way as `watch.paths`.
	#[serde(default)]
	pub paths: Vec<String>,
}

/// What [`validate`] learns about an accepted path when asked to stat it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileInfo {
	/// Whether the path is a directory.
	pub is_dir: bool,
}

/// Resolves every entry of `rule` (plain paths and glob patterns alike) into absolute paths.
///
/// Plain entries are canonicalized relative to the current directory if not already absolute;
/// glob entries (those containing any of `*?[`) are expanded first and each match resolved the
/// same way. A glob that matches nothing is not an error.
///
/// # Errors
///
/// Returns [`RuntimeError::Glob`] if an entry is not a well-formed glob pattern, or
/// [`RuntimeError::PathResolve`] if a non-glob entry cannot be resolved to an absolute path.
pub fn resolve(entries: &[String]) -> Result<Vec<PathBuf>, RuntimeError> {
	let mut resolved = Vec::new();

	for entry in entries {
		if is_glob(entry) {
			let paths = glob::glob(entry).map_err(|err| RuntimeError::Glob {
				pattern: entry.clone(),
				err,
			})?;
			for path in paths.flatten() {
				resolved.push(absolute(&path)?);
			}
		} else {
			resolved.push(absolute(Path::new(entry))?);
		}
	}

	Ok(resolved)
}

fn is_glob(entry: &str) -> bool {
	entry.contains(['*', '?', '['])
}

fn absolute(path: &Path) -> Result<PathBuf, RuntimeError> {
	if path.is_absolute() {
		Ok(path.to_path_buf())
	} else {
		std::env::current_dir()
			.and_then(|cwd| cwd.join(path).canonicalize().or_else(|_| Ok(cwd.join(path))))
			.map_err(|err| RuntimeError::PathResolve { path: path.to_path_buf(), err })
	}
}

/// The final suffix after the last `.` in `path`'s basename, or empty if there is none.
///
/// This is deliberately not [`Path::extension`], which treats a leading dot specially (so
/// `.env` has no extension by that method's reckoning, but has extension `env` by this one).
#[must_use]
pub fn extension(path: &Path) -> &str {
	let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
	match basename.rfind('.') {
		Some(idx) => &basename[idx + 1..],
		None => "",
	}
}

fn is_dotfile(path: &Path) -> bool {
	path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'))
}

/// Whether `entry` (a raw, possibly-glob, possibly-relative rule from `watch.paths` or
/// `ignore.paths`) matches absolute path `abs`.
///
/// A plain entry matches if its absolute form is a substring of `abs`; a glob entry
/// additionally expands and checks each expansion the same way.
fn matches_rule(abs: &str, entry: &str) -> bool {
	let Ok(entry_abs) = absolute(Path::new(entry)) else { return false };
	if abs.contains(entry_abs.to_string_lossy().as_ref()) {
		return true;
	}
	if is_glob(entry) {
		if let Ok(expansions) = glob::glob(entry) {
			for expansion in expansions.flatten() {
				if abs.contains(expansion.to_string_lossy().as_ref()) {
					return true;
				}
			}
		}
	}
	false
}

/// Runs the seven-step decision pipeline against one path.
///
/// Matching against `watch.paths`/`ignore.paths` is containment by substring on the absolute
/// path, not prefix matching and not pure glob matching: a rule of `/home/user/project/src`
/// matches a changed path of `/home/user/project/src/main.rs` because the former is literally a
/// substring of the latter. This also means a rule of `/src` would match
/// `/home/user/othersrc/file` — surprising, but intentional: callers that mind should pass
/// fully-qualified roots.
///
/// If `want_stat` is true and the path is accepted, the returned [`FileInfo`] is populated by
/// stat'ing the path; a path that no longer exists by the time of the stat is still accepted,
/// just with no `FileInfo`.
#[must_use]
pub fn validate(
	path: &Path,
	want_stat: bool,
	watch: &Watch,
	ignore: &Ignore,
	recovery: &dyn RecoverySink,
) -> (bool, Option<FileInfo>) {
	// 1. Empty path.
	if path.as_os_str().is_empty() {
		return (false, None);
	}

	// 2. Dot-check on the final path component only.
	if ignore.dot && is_dotfile(path) {
		return (false, None);
	}

	// 3. Extension gates, only when the path actually has an extension.
	let ext = extension(path);
	if !ext.is_empty() {
		if ignore.exts.iter().any(|ignored| ignored == ext) {
			return (false, None);
		}
		if !watch.exts.is_empty() && !watch.exts.iter().any(|wanted| wanted == ext) {
			return (false, None);
		}
	}

	// 4. Resolve to an absolute path, reporting and rejecting on failure.
	let abs = match absolute(path) {
		Ok(abs) => abs,
		Err(err) => {
			recovery.recover(err);
			return (false, None);
		}
	};
	let abs_str = abs.to_string_lossy();

	// 5. ignore.paths.
	if ignore.paths.iter().any(|entry| matches_rule(&abs_str, entry)) {
		return (false, None);
	}

	// 6. watch.paths, only enforced when non-empty: an empty list means "watch everything".
	if !watch.paths.is_empty() && !watch.paths.iter().any(|entry| matches_rule(&abs_str, entry)) {
		return (false, None);
	}

	// 7. Accepted.
	let info = want_stat
		.then(|| std::fs::metadata(&abs).ok())
		.flatten()
		.map(|metadata| FileInfo { is_dir: metadata.is_dir() });
	(true, info)
}
