use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::CmapError;
use crate::CmapResult;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default directory (relative to the project root) that `/public/...`
/// asset references resolve into.
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["cmap.toml", ".cmap.toml", ".config/cmap.toml"];

/// Configuration loaded from a `cmap.toml` file.
///
/// ```toml
/// public_dir = "public"
/// max_file_size = 10485760
/// disable_gitignore = false
///
/// [exclude]
/// patterns = ["legacy/", "*.min.html"]
///
/// [include]
/// patterns = ["pages/**/*.tmpl"]
/// ```
#[derive(Debug, Deserialize)]
pub struct CmapConfig {
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Inclusion configuration — additional glob patterns scanned as HTML.
	#[serde(default)]
	pub include: IncludeConfig,
	/// Directory that `/public/` asset references resolve into, relative to
	/// the project root.
	#[serde(default = "default_public_dir")]
	pub public_dir: String,
	/// Maximum file size in bytes to scan. Files larger than this are
	/// skipped. Defaults to 10 MB.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// When true, `.gitignore` files are not used for filtering. By default
	/// (`false`), cmap respects `.gitignore` patterns and skips files that
	/// would be ignored by git. Set to `true` when working outside a git
	/// repository — in that case, use `[exclude]` patterns instead.
	#[serde(default)]
	pub disable_gitignore: bool,
}

/// Configuration for excluding files and directories from scanning.
///
/// Patterns follow gitignore syntax and are applied on top of any
/// `.gitignore` rules (unless `disable_gitignore` is set). Supports negation
/// (`!pattern`), directory markers (trailing `/`), and all standard
/// gitignore wildcards.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns for files and directories to skip during
	/// scanning. These are relative to the project root.
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Configuration for including additional files in the HTML scan.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeConfig {
	/// Additional glob patterns for files to scan for placeholder comments,
	/// relative to the project root.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl CmapConfig {
	/// Resolve the config path from known discovery candidates.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> CmapResult<Option<CmapConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: CmapConfig =
			toml::from_str(&content).map_err(|e| CmapError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

fn default_public_dir() -> String {
	DEFAULT_PUBLIC_DIR.to_string()
}
