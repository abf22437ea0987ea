use std::path::Path;
use std::path::PathBuf;

use crate::manifest::MANIFEST_FILE;

/// Locate the manifest governing `start` by walking up the directory tree.
///
/// The search begins in `start`'s directory (or `start` itself when it is a
/// directory) and is bounded by `root`: a path outside the root, or a tree
/// with no manifest, yields `None` rather than an error so callers degrade
/// to "no result".
pub fn resolve_manifest(start: &Path, root: &Path) -> Option<PathBuf> {
	let mut dir = if start.is_dir() { start } else { start.parent()? };

	if !dir.starts_with(root) {
		return None;
	}

	loop {
		let candidate = dir.join(MANIFEST_FILE);
		if candidate.is_file() {
			return Some(candidate);
		}
		if dir == root {
			return None;
		}
		dir = dir.parent()?;
	}
}

/// Locate the nearest manifest from `start` upward, unbounded. The CLI uses
/// this to find the project from the working directory; the manifest's own
/// directory then becomes the project root.
pub fn find_manifest_upward(start: &Path) -> Option<PathBuf> {
	let mut dir = if start.is_dir() {
		Some(start)
	} else {
		start.parent()
	};

	while let Some(current) = dir {
		let candidate = current.join(MANIFEST_FILE);
		if candidate.is_file() {
			return Some(candidate);
		}
		dir = current.parent();
	}

	None
}
