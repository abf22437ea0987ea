use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CmapError {
	#[error(transparent)]
	#[diagnostic(code(cmap::io_error))]
	Io(#[from] std::io::Error),

	#[error("no component map found from `{0}`")]
	#[diagnostic(
		code(cmap::manifest_not_found),
		help("create a `_componentsMap.js` file at the project root, or run `cmap init`")
	)]
	ManifestNotFound(String),

	#[error("invalid placeholder name: `{0}`")]
	#[diagnostic(
		code(cmap::invalid_name),
		help("placeholder names may only contain letters, digits, and underscores")
	)]
	InvalidName(String),

	#[error("unknown placeholder: `{0}`")]
	#[diagnostic(
		code(cmap::unknown_placeholder),
		help("run `cmap list` to see the placeholders declared in the component map")
	)]
	UnknownPlaceholder(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(cmap::config_parse),
		help("check that cmap.toml is valid TOML with optional [include] and [exclude] sections")
	)]
	ConfigParse(String),

	#[error("refusing to overwrite `{0}`")]
	#[diagnostic(
		code(cmap::already_exists),
		help("delete the existing file first if you want to re-scaffold the project")
	)]
	AlreadyExists(String),

	#[error("file too large: `{path}` is {size} bytes (limit: {limit} bytes)")]
	#[diagnostic(
		code(cmap::file_too_large),
		help("increase the file size limit in cmap.toml or exclude this file")
	)]
	FileTooLarge { path: String, size: u64, limit: u64 },
}

pub type CmapResult<T> = Result<T, CmapError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
