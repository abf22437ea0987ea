use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::config::CmapConfig;
use crate::config::DEFAULT_MAX_FILE_SIZE;
use crate::config::DEFAULT_PUBLIC_DIR;
use crate::lexer::memstr;
use crate::manifest::COMPONENTS_DIR;
use crate::manifest::MANIFEST_FILE;
use crate::manifest::placeholder_name;
use crate::position::LineTable;
use crate::position::Position;

/// Options for controlling how a project is scanned.
///
/// Use [`ScanOptions::default()`] for sensible defaults or
/// [`ScanOptions::from_config`] to construct from a [`CmapConfig`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
	/// Gitignore-style patterns to exclude from scanning.
	pub exclude_patterns: Vec<String>,
	/// Glob patterns for additional files scanned as HTML.
	pub include_set: GlobSet,
	/// Directory that `/public/` asset references resolve into, relative to
	/// the project root.
	pub public_dir: String,
	/// Maximum file size to scan in bytes.
	pub max_file_size: u64,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
}

impl Default for ScanOptions {
	fn default() -> Self {
		Self {
			exclude_patterns: Vec::new(),
			include_set: GlobSet::empty(),
			public_dir: DEFAULT_PUBLIC_DIR.to_string(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
		}
	}
}

impl ScanOptions {
	/// Construct [`ScanOptions`] from a [`CmapConfig`].
	pub fn from_config(config: Option<&CmapConfig>) -> Self {
		let exclude_patterns = config
			.map(|c| c.exclude.patterns.clone())
			.unwrap_or_default();
		let include_patterns = config.map(|c| &c.include.patterns[..]).unwrap_or_default();
		let public_dir = config.map_or_else(
			|| DEFAULT_PUBLIC_DIR.to_string(),
			|c| c.public_dir.clone(),
		);
		let max_file_size = config.map_or(DEFAULT_MAX_FILE_SIZE, |c| c.max_file_size);
		let disable_gitignore = config.is_some_and(|c| c.disable_gitignore);
		let include_set = build_glob_set(include_patterns);

		Self {
			exclude_patterns,
			include_set,
			public_dir,
			max_file_size,
			disable_gitignore,
		}
	}
}

/// A located match of a placeholder comment in a project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
	/// The file where the match was found.
	pub file: PathBuf,
	/// The span of the whole comment, `<!--` through `-->`.
	pub position: Position,
}

/// Extract HTML comments (`<!-- ... -->`) from raw text, returning each
/// comment's full text and byte range. Unterminated comments are ignored.
pub(crate) fn extract_html_comments(content: &str) -> Vec<(String, Range<usize>)> {
	let bytes = content.as_bytes();
	let open_marker = b"<!--";
	let close_marker = b"-->";
	let mut comments = Vec::new();
	let mut search_from = 0;

	while search_from < bytes.len() {
		let Some(open_offset) = memstr(&bytes[search_from..], open_marker) else {
			break;
		};
		let abs_open = search_from + open_offset;

		let after_open = abs_open + open_marker.len();
		if after_open >= bytes.len() {
			break;
		}

		let Some(close_offset) = memstr(&bytes[after_open..], close_marker) else {
			break;
		};
		let abs_close_end = after_open + close_offset + close_marker.len();

		let value = String::from_utf8_lossy(&bytes[abs_open..abs_close_end]).to_string();
		comments.push((value, abs_open..abs_close_end));

		search_from = abs_close_end;
	}

	comments
}

/// Placeholder comments in a single document: `(name, position)` pairs in
/// document order. Comments whose inner text is not a bare identifier are
/// skipped.
pub fn placeholder_occurrences(content: &str) -> Vec<(String, Position)> {
	let table = LineTable::new(content);
	extract_html_comments(content)
		.into_iter()
		.filter_map(|(value, range)| {
			let name = placeholder_name(&value)?;
			Some((name.to_string(), table.position(range)))
		})
		.collect()
}

/// All placeholder occurrences in the project's HTML subtree, grouped by
/// placeholder name. One filesystem pass regardless of how many distinct
/// names occur.
pub fn collect_placeholder_usages(
	root: &Path,
	options: &ScanOptions,
) -> BTreeMap<String, Vec<Occurrence>> {
	scan_usages(root, options, None)
}

/// Every occurrence of one placeholder in the project's HTML subtree.
pub fn find_placeholder_usages(root: &Path, name: &str, options: &ScanOptions) -> Vec<Occurrence> {
	scan_usages(root, options, Some(name))
		.remove(name)
		.unwrap_or_default()
}

/// Occurrence count per distinct placeholder name.
pub fn count_placeholder_usages(root: &Path, options: &ScanOptions) -> HashMap<String, usize> {
	collect_placeholder_usages(root, options)
		.into_iter()
		.map(|(name, occurrences)| (name, occurrences.len()))
		.collect()
}

fn scan_usages(
	root: &Path,
	options: &ScanOptions,
	filter: Option<&str>,
) -> BTreeMap<String, Vec<Occurrence>> {
	let mut usages: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();

	for file in collect_html_files(root, options) {
		let Some(content) = read_scannable(&file, options.max_file_size) else {
			continue;
		};

		for (name, position) in placeholder_occurrences(&content) {
			if filter.is_some_and(|wanted| wanted != name) {
				continue;
			}
			usages.entry(name).or_default().push(Occurrence {
				file: file.clone(),
				position,
			});
		}
	}

	usages
}

/// Collect the HTML files of the project subtree: `.html`/`.htm` files plus
/// anything matching the configured include patterns. Sorted for
/// deterministic ordering.
pub fn collect_html_files(root: &Path, options: &ScanOptions) -> Vec<PathBuf> {
	let mut files = Vec::new();
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, &options.exclude_patterns);
	let mut visited_dirs = HashSet::new();

	walk_dir(
		root,
		&mut files,
		true,
		&gitignore,
		&custom_exclude,
		&mut visited_dirs,
		&mut |path| {
			is_html_file(path)
				|| path
					.strip_prefix(root)
					.is_ok_and(|relative| options.include_set.is_match(relative))
		},
	);

	// Sort for deterministic ordering.
	files.sort();
	files
}

/// Component module files under the manifest's components directory,
/// sorted. Used by the orphan check and the asset scan.
pub fn collect_component_modules(manifest_dir: &Path, options: &ScanOptions) -> Vec<PathBuf> {
	let components_dir = manifest_dir.join(COMPONENTS_DIR);
	if !components_dir.is_dir() {
		return Vec::new();
	}

	let mut files = Vec::new();
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(manifest_dir)
	};
	let custom_exclude = build_exclude_matcher(manifest_dir, &options.exclude_patterns);
	let mut visited_dirs = HashSet::new();

	walk_dir(
		&components_dir,
		&mut files,
		true,
		&gitignore,
		&custom_exclude,
		&mut visited_dirs,
		&mut |path| is_script_file(path),
	);

	files.sort();
	files
}

/// Byte span of the first recognizable default-export marker in module
/// source: `module.exports` or `export default`.
pub fn find_export(source: &str) -> Option<Range<usize>> {
	let bytes = source.as_bytes();
	let markers: [&[u8]; 2] = [b"module.exports", b"export default"];
	let mut best: Option<Range<usize>> = None;

	for marker in markers {
		if let Some(offset) = memstr(bytes, marker) {
			let range = offset..offset + marker.len();
			if best.as_ref().is_none_or(|current| range.start < current.start) {
				best = Some(range);
			}
		}
	}

	best
}

/// Read a file for scanning, skipping (with a warning) anything oversized or
/// unreadable. Scans degrade to "fewer results", never to an error.
pub(crate) fn read_scannable(path: &Path, max_file_size: u64) -> Option<String> {
	match std::fs::metadata(path) {
		Ok(metadata) if metadata.len() > max_file_size => {
			tracing::warn!(
				"skipping oversized file `{}` ({} bytes)",
				path.display(),
				metadata.len()
			);
			return None;
		}
		Ok(_) => {}
		Err(error) => {
			tracing::warn!("skipping unreadable file `{}`: {error}", path.display());
			return None;
		}
	}

	match std::fs::read_to_string(path) {
		Ok(content) => Some(content),
		Err(error) => {
			tracing::warn!("skipping unreadable file `{}`: {error}", path.display());
			None
		}
	}
}

/// Build a `GlobSet` from a list of glob pattern strings.
fn build_glob_set(patterns: &[String]) -> GlobSet {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		if let Ok(glob) = Glob::new(pattern) {
			builder.add(glob);
		} else {
			tracing::warn!("ignoring invalid include pattern `{pattern}`");
		}
	}
	builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Build a `Gitignore` matcher from exclude patterns specified in
/// `cmap.toml` `[exclude]`. These follow `.gitignore` syntax and are applied
/// on top of any `.gitignore` rules. Invalid patterns are skipped.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		if builder.add_line(None, pattern).is_err() {
			tracing::warn!("ignoring invalid exclude pattern `{pattern}`");
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

/// Whether a directory holds its own manifest and therefore owns its
/// subtree as a separate project scope.
fn has_own_manifest(dir: &Path) -> bool {
	dir.join(MANIFEST_FILE).is_file()
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	is_root: bool,
	gitignore: &Gitignore,
	custom_exclude: &Gitignore,
	visited_dirs: &mut HashSet<PathBuf>,
	wanted: &mut dyn FnMut(&Path) -> bool,
) {
	if !dir.is_dir() {
		return;
	}

	// Detect symlink cycles by tracking canonical paths. A revisited
	// directory is skipped, not an error: scans degrade instead of failing.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		tracing::debug!("skipping already visited directory `{}`", dir.display());
		return;
	}

	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(error) => {
			tracing::warn!("skipping unreadable directory `{}`: {error}", dir.display());
			return;
		}
	};

	for entry in entries {
		let Ok(entry) = entry else {
			continue;
		};
		let path = entry.path();

		// Skip hidden directories and common non-source directories.
		if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
			if is_ignored_directory_name(name) {
				continue;
			}
		}

		let is_dir = path.is_dir();

		if gitignore.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if custom_exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			// A nested manifest owns its subtree (separate project scope).
			if !is_root && has_own_manifest(&path) {
				continue;
			}
			walk_dir(
				&path,
				files,
				false,
				gitignore,
				custom_exclude,
				visited_dirs,
				wanted,
			);
		} else if wanted(&path) {
			files.push(path);
		}
	}
}

fn is_html_file(path: &Path) -> bool {
	let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
		return false;
	};

	matches!(ext, "html" | "htm")
}

/// Check if a file is a script module (candidate component file).
pub(crate) fn is_script_file(path: &Path) -> bool {
	let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
		return false;
	};

	matches!(ext, "js" | "mjs" | "cjs")
}
