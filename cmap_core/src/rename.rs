use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::error::CmapError;
use crate::error::CmapResult;
use crate::manifest::canonical_placeholder;
use crate::manifest::is_valid_placeholder_name;
use crate::manifest::parse_manifest;
use crate::position::Position;
use crate::project::ScanOptions;
use crate::project::find_placeholder_usages;

/// A single text replacement produced by a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
	/// The file the replacement applies to.
	pub file: PathBuf,
	/// Span of the text being replaced, as found on disk.
	pub position: Position,
	/// Replacement text, including any surrounding quotes for manifest
	/// literals.
	pub replacement: String,
}

/// The staged result of applying a set of [`Edit`]s.
#[derive(Debug, Clone, Default)]
pub struct RenameOutcome {
	/// Files that change and their full new content.
	pub updated_files: HashMap<PathBuf, String>,
	/// Number of individual replacements applied.
	pub edit_count: usize,
}

/// Compute every replacement needed to rename the placeholder `old` to
/// `new`: the placeholder literal of each manifest record declaring `old`,
/// plus every `<!-- old -->` occurrence in the project's HTML subtree.
///
/// Occurrences are rewritten to the canonical `<!-- new -->` form even when
/// the original spelling was irregular. Manifest literals keep their original
/// quote character. Fails with [`CmapError::InvalidName`] when either name
/// contains characters outside letters, digits, and underscores, and with
/// [`CmapError::UnknownPlaceholder`] when `old` matches neither a manifest
/// record nor any usage.
pub fn rename_edits(
	manifest_path: &Path,
	old: &str,
	new: &str,
	options: &ScanOptions,
) -> CmapResult<Vec<Edit>> {
	if !is_valid_placeholder_name(old) {
		return Err(CmapError::InvalidName(old.to_string()));
	}
	if !is_valid_placeholder_name(new) {
		return Err(CmapError::InvalidName(new.to_string()));
	}

	let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
	let manifest_text = std::fs::read_to_string(manifest_path)?;
	let manifest = parse_manifest(&manifest_text);
	let mut edits = Vec::new();

	for record in &manifest.records {
		if record.name != old {
			continue;
		}
		// Reuse the quote character the author wrote so the rewrite does not
		// churn unrelated style.
		let quote = manifest_text
			.as_bytes()
			.get(record.placeholder_span.start.offset)
			.copied()
			.unwrap_or(b'\'') as char;
		edits.push(Edit {
			file: manifest_path.to_path_buf(),
			position: record.placeholder_span,
			replacement: format!("{quote}{}{quote}", canonical_placeholder(new)),
		});
	}

	for occurrence in find_placeholder_usages(manifest_dir, old, options) {
		edits.push(Edit {
			file: occurrence.file,
			position: occurrence.position,
			replacement: canonical_placeholder(new),
		});
	}

	if edits.is_empty() {
		return Err(CmapError::UnknownPlaceholder(old.to_string()));
	}

	Ok(edits)
}

/// Compute the new content of every file touched by `edits` without writing
/// anything.
pub fn stage_edits(edits: &[Edit]) -> CmapResult<RenameOutcome> {
	let mut edits_by_file: HashMap<&Path, Vec<&Edit>> = HashMap::new();
	for edit in edits {
		edits_by_file.entry(edit.file.as_path()).or_default().push(edit);
	}

	let mut outcome = RenameOutcome::default();
	for (file, mut file_edits) in edits_by_file {
		let mut result = std::fs::read_to_string(file)?;
		// Apply in reverse offset order so earlier replacements don't shift
		// the positions of later ones.
		file_edits.sort_by(|a, b| b.position.start.offset.cmp(&a.position.start.offset));

		let mut had_update = false;
		for edit in file_edits {
			let range = edit.position.to_range();
			if range.start > range.end || range.end > result.len() {
				continue;
			}
			result.replace_range(range, &edit.replacement);
			had_update = true;
			outcome.edit_count += 1;
		}

		if had_update {
			outcome.updated_files.insert(file.to_path_buf(), result);
		}
	}

	Ok(outcome)
}

/// Stage every file rewrite, then write them all back. No file is touched
/// until the whole set has staged cleanly.
pub fn apply_edits(edits: &[Edit]) -> CmapResult<RenameOutcome> {
	let outcome = stage_edits(edits)?;
	for (path, content) in &outcome.updated_files {
		std::fs::write(path, content)?;
		tracing::debug!("rewrote `{}`", path.display());
	}
	Ok(outcome)
}
