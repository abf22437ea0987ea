use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Serialize;

use crate::lexer::scan_string_literals;
use crate::manifest::Manifest;
use crate::manifest::MappingRecord;
use crate::manifest::parse_manifest;
use crate::manifest::resolve_component;
use crate::position::LineTable;
use crate::position::Position;
use crate::project::ScanOptions;
use crate::project::collect_component_modules;
use crate::project::count_placeholder_usages;
use crate::project::find_export;
use crate::project::read_scannable;

/// String literals containing this prefix are treated as project-relative
/// asset references and existence-checked.
pub const PUBLIC_PREFIX: &str = "/public/";

/// Severity of a project diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Error,
	Warning,
}

/// The kind of diagnostic produced by [`validate`]. Paths inside kinds are
/// kept as written in the manifest (or relative to it) so messages read the
/// way the project is authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum DiagnosticKind {
	/// A placeholder literal deviates from the canonical `<!-- name -->`
	/// form.
	MalformedPlaceholder { literal: String },
	/// A placeholder name is declared more than once; flagged on the later
	/// declarations.
	DuplicatePlaceholder { name: String },
	/// A declared placeholder with zero occurrences in the HTML subtree.
	UnusedPlaceholder { name: String },
	/// A non-sentinel data file that does not exist on disk.
	MissingDataFile { name: String, path: String },
	/// An existing data file that fails to parse as JSON.
	InvalidDataFile {
		name: String,
		path: String,
		reason: String,
	},
	/// A component reference that resolves to no file, even with the script
	/// extension probed.
	MissingComponent { name: String, path: String },
	/// An existing component module with no recognizable default export.
	MissingExport { name: String, path: String },
	/// A component module file that no mapping record points to.
	OrphanComponent { path: String },
	/// A `/public/` string literal that resolves to no file under the
	/// public directory.
	DanglingAsset { reference: String },
}

/// A diagnostic produced by validating a project against its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDiagnostic {
	/// The file the diagnostic is attributed to.
	pub file: PathBuf,
	/// The kind of diagnostic.
	pub kind: DiagnosticKind,
	/// The span of the offending declaration or literal.
	pub position: Position,
}

impl ProjectDiagnostic {
	/// Unused and orphan findings are advisory; everything else blocks
	/// correctness.
	pub fn severity(&self) -> Severity {
		match &self.kind {
			DiagnosticKind::UnusedPlaceholder { .. } | DiagnosticKind::OrphanComponent { .. } => {
				Severity::Warning
			}
			_ => Severity::Error,
		}
	}

	pub fn is_error(&self) -> bool {
		self.severity() == Severity::Error
	}

	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			DiagnosticKind::MalformedPlaceholder { literal } => {
				format!("malformed placeholder literal `{literal}`")
			}
			DiagnosticKind::DuplicatePlaceholder { name } => {
				format!("duplicate placeholder `{name}`")
			}
			DiagnosticKind::UnusedPlaceholder { name } => {
				format!("placeholder `{name}` has no occurrences in any HTML file")
			}
			DiagnosticKind::MissingDataFile { name, path } => {
				format!("data file `{path}` for placeholder `{name}` does not exist")
			}
			DiagnosticKind::InvalidDataFile { name, path, reason } => {
				format!("data file `{path}` for placeholder `{name}` is not valid JSON: {reason}")
			}
			DiagnosticKind::MissingComponent { name, path } => {
				format!("component module `{path}` for placeholder `{name}` does not exist")
			}
			DiagnosticKind::MissingExport { name: _, path } => {
				format!("component module `{path}` has no default export")
			}
			DiagnosticKind::OrphanComponent { path } => {
				format!("component module `{path}` is not mapped to any placeholder")
			}
			DiagnosticKind::DanglingAsset { reference } => {
				format!("asset `{reference}` does not exist under the public directory")
			}
		}
	}

	/// Diagnostic code in the `cmap::` namespace.
	pub fn code(&self) -> &'static str {
		match &self.kind {
			DiagnosticKind::MalformedPlaceholder { .. } => "cmap::malformed_placeholder",
			DiagnosticKind::DuplicatePlaceholder { .. } => "cmap::duplicate_placeholder",
			DiagnosticKind::UnusedPlaceholder { .. } => "cmap::unused_placeholder",
			DiagnosticKind::MissingDataFile { .. } => "cmap::missing_data_file",
			DiagnosticKind::InvalidDataFile { .. } => "cmap::invalid_data_file",
			DiagnosticKind::MissingComponent { .. } => "cmap::missing_component",
			DiagnosticKind::MissingExport { .. } => "cmap::missing_export",
			DiagnosticKind::OrphanComponent { .. } => "cmap::orphan_component",
			DiagnosticKind::DanglingAsset { .. } => "cmap::dangling_asset",
		}
	}

	/// Actionable advice rendered under the message, when there is any.
	pub fn help(&self) -> Option<String> {
		match &self.kind {
			DiagnosticKind::MalformedPlaceholder { literal } => {
				let expected = crate::manifest::placeholder_name(literal)
					.map_or_else(|| "<!-- name -->".to_string(), crate::manifest::canonical_placeholder);
				Some(format!("use the exact form `{expected}`"))
			}
			DiagnosticKind::DuplicatePlaceholder { .. } => {
				Some("remove or rename one of the declarations".to_string())
			}
			DiagnosticKind::UnusedPlaceholder { name } => {
				Some(format!("add `<!-- {name} -->` to a page or remove the entry"))
			}
			DiagnosticKind::MissingDataFile { .. } => {
				Some("create the file, or use the no-data sentinel if the component takes no data".to_string())
			}
			DiagnosticKind::InvalidDataFile { .. } => None,
			DiagnosticKind::MissingComponent { .. } => None,
			DiagnosticKind::MissingExport { .. } => {
				Some("add `module.exports = ...` (or `export default ...`) to the module".to_string())
			}
			DiagnosticKind::OrphanComponent { .. } => {
				Some("map it in the component map or delete the file".to_string())
			}
			DiagnosticKind::DanglingAsset { .. } => {
				Some("add the file under the public directory or fix the reference".to_string())
			}
		}
	}
}

/// All diagnostics produced by one validation pass: manifest checks in
/// declaration order, then per-file supplementary checks.
#[derive(Debug, Default, Deref, DerefMut, Serialize)]
pub struct Diagnostics(Vec<ProjectDiagnostic>);

impl Diagnostics {
	pub fn error_count(&self) -> usize {
		self.0.iter().filter(|diagnostic| diagnostic.is_error()).count()
	}

	pub fn warning_count(&self) -> usize {
		self.0.len() - self.error_count()
	}

	pub fn has_errors(&self) -> bool {
		self.0.iter().any(ProjectDiagnostic::is_error)
	}

	/// Diagnostics attributed to one file.
	pub fn for_file<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a ProjectDiagnostic> {
		self.0.iter().filter(move |diagnostic| diagnostic.file == file)
	}

	pub fn into_inner(self) -> Vec<ProjectDiagnostic> {
		self.0
	}
}

/// Validate a project against its manifest text.
///
/// The manifest's directory is the project root: the HTML subtree, the
/// components directory, and the public asset directory all live under it.
/// Every check runs independently; the result replaces any previous
/// diagnostic set wholesale. This is a pure function of the manifest text
/// plus filesystem state, so it is safe to re-run on every edit.
pub fn validate(manifest_path: &Path, manifest_text: &str, options: &ScanOptions) -> Diagnostics {
	let manifest = parse_manifest(manifest_text);
	let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
	let mut diagnostics = Diagnostics::default();

	let usage_counts = count_placeholder_usages(manifest_dir, options);

	let mut seen: HashSet<&str> = HashSet::new();
	for record in &manifest.records {
		if !record.is_canonical() {
			diagnostics.push(ProjectDiagnostic {
				file: manifest_path.to_path_buf(),
				kind: DiagnosticKind::MalformedPlaceholder {
					literal: record.placeholder.clone(),
				},
				position: record.placeholder_span,
			});
		}
		if record.name.is_empty() {
			// No identifier to check anything else against.
			continue;
		}

		if !seen.insert(record.name.as_str()) {
			diagnostics.push(ProjectDiagnostic {
				file: manifest_path.to_path_buf(),
				kind: DiagnosticKind::DuplicatePlaceholder {
					name: record.name.clone(),
				},
				position: record.placeholder_span,
			});
		}

		check_data_file(manifest_path, manifest_dir, record, &mut diagnostics);
		check_component(manifest_path, manifest_dir, record, &mut diagnostics);
	}

	// One unused warning per distinct name, attributed to the winning record.
	for record in manifest.mapping() {
		if usage_counts.get(record.name.as_str()).copied().unwrap_or(0) == 0 {
			diagnostics.push(ProjectDiagnostic {
				file: manifest_path.to_path_buf(),
				kind: DiagnosticKind::UnusedPlaceholder {
					name: record.name.clone(),
				},
				position: record.placeholder_span,
			});
		}
	}

	check_orphans(manifest_dir, &manifest, options, &mut diagnostics);
	check_assets(manifest_dir, &manifest, options, &mut diagnostics);

	diagnostics
}

/// The no-data sentinel never produces a missing-file diagnostic, whether or
/// not the sentinel path itself exists.
fn check_data_file(
	manifest_path: &Path,
	manifest_dir: &Path,
	record: &MappingRecord,
	diagnostics: &mut Diagnostics,
) {
	let Some(relative) = record.data.as_file() else {
		return;
	};
	let position = record.data_span.unwrap_or(record.placeholder_span);
	let path = manifest_dir.join(relative);

	if !path.is_file() {
		diagnostics.push(ProjectDiagnostic {
			file: manifest_path.to_path_buf(),
			kind: DiagnosticKind::MissingDataFile {
				name: record.name.clone(),
				path: relative.to_string(),
			},
			position,
		});
		return;
	}

	let content = match std::fs::read_to_string(&path) {
		Ok(content) => content,
		Err(error) => {
			diagnostics.push(ProjectDiagnostic {
				file: manifest_path.to_path_buf(),
				kind: DiagnosticKind::InvalidDataFile {
					name: record.name.clone(),
					path: relative.to_string(),
					reason: error.to_string(),
				},
				position,
			});
			return;
		}
	};

	if let Err(error) = serde_json::from_str::<serde_json::Value>(&content) {
		diagnostics.push(ProjectDiagnostic {
			file: manifest_path.to_path_buf(),
			kind: DiagnosticKind::InvalidDataFile {
				name: record.name.clone(),
				path: relative.to_string(),
				reason: error.to_string(),
			},
			position,
		});
	}
}

fn check_component(
	manifest_path: &Path,
	manifest_dir: &Path,
	record: &MappingRecord,
	diagnostics: &mut Diagnostics,
) {
	let Some(path) = resolve_component(manifest_dir, &record.component) else {
		diagnostics.push(ProjectDiagnostic {
			file: manifest_path.to_path_buf(),
			kind: DiagnosticKind::MissingComponent {
				name: record.name.clone(),
				path: record.component.clone(),
			},
			position: record.component_span,
		});
		return;
	};

	let Ok(content) = std::fs::read_to_string(&path) else {
		tracing::warn!("could not read component module `{}`", path.display());
		return;
	};

	if find_export(&content).is_none() {
		diagnostics.push(ProjectDiagnostic {
			file: manifest_path.to_path_buf(),
			kind: DiagnosticKind::MissingExport {
				name: record.name.clone(),
				path: record.component.clone(),
			},
			position: record.component_span,
		});
	}
}

/// Component modules no record points to. Attributed to the module's export
/// line (or the file start when it has no export).
fn check_orphans(
	manifest_dir: &Path,
	manifest: &Manifest,
	options: &ScanOptions,
	diagnostics: &mut Diagnostics,
) {
	let modules = collect_component_modules(manifest_dir, options);
	if modules.is_empty() {
		return;
	}

	let mut mapped: HashSet<PathBuf> = HashSet::new();
	for record in &manifest.records {
		if let Some(path) = resolve_component(manifest_dir, &record.component) {
			mapped.insert(path.canonicalize().unwrap_or(path));
		}
	}

	for module in modules {
		let canonical = module.canonicalize().unwrap_or_else(|_| module.clone());
		if mapped.contains(&canonical) {
			continue;
		}

		let position = match read_scannable(&module, options.max_file_size) {
			Some(content) => {
				let table = LineTable::new(&content);
				match find_export(&content) {
					Some(range) => table.position(range),
					None => table.position(0..0),
				}
			}
			None => Position::new(1, 1, 0, 1, 1, 0),
		};

		diagnostics.push(ProjectDiagnostic {
			file: module.clone(),
			kind: DiagnosticKind::OrphanComponent {
				path: relative_display(manifest_dir, &module),
			},
			position,
		});
	}
}

/// Existence-check every `/public/` string literal in referenced data files
/// and component modules.
fn check_assets(
	manifest_dir: &Path,
	manifest: &Manifest,
	options: &ScanOptions,
	diagnostics: &mut Diagnostics,
) {
	let mut targets: Vec<PathBuf> = Vec::new();
	let mut seen: HashSet<PathBuf> = HashSet::new();
	let mut add_target = |path: PathBuf, targets: &mut Vec<PathBuf>| {
		let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
		if seen.insert(canonical) {
			targets.push(path);
		}
	};

	for record in &manifest.records {
		if let Some(path) = record.data_path(manifest_dir) {
			if path.is_file() {
				add_target(path, &mut targets);
			}
		}
		if let Some(path) = resolve_component(manifest_dir, &record.component) {
			add_target(path, &mut targets);
		}
	}
	for module in collect_component_modules(manifest_dir, options) {
		add_target(module, &mut targets);
	}

	let public_root = manifest_dir.join(&options.public_dir);
	for file in targets {
		let Some(content) = read_scannable(&file, options.max_file_size) else {
			continue;
		};
		let table = LineTable::new(&content);

		for (reference, range) in public_asset_references(&content) {
			let asset = public_root.join(&reference[PUBLIC_PREFIX.len()..]);
			if !asset.is_file() {
				diagnostics.push(ProjectDiagnostic {
					file: file.clone(),
					kind: DiagnosticKind::DanglingAsset { reference },
					position: table.position(range),
				});
			}
		}
	}
}

/// Extracts `/public/` asset references from string literals in source text.
///
/// Each entry pairs the reference (trimmed to start at the prefix) with the
/// byte range of the enclosing string literal.
pub fn public_asset_references(content: &str) -> Vec<(String, Range<usize>)> {
	scan_string_literals(content)
		.into_iter()
		.filter_map(|(value, range)| {
			let prefix_at = value.find(PUBLIC_PREFIX)?;
			Some((value[prefix_at..].to_string(), range))
		})
		.collect()
}

fn relative_display(root: &Path, path: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
