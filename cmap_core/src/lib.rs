//! `cmap_core` is the core library for the [cmap](https://github.com/ifiokjr/cmap)
//! component map toolkit. It provides the manifest parser, project scanner,
//! consistency validator, and rename engine for HTML projects that stamp
//! component render targets with `<!-- placeholder -->` comments and declare
//! the placeholder-to-component wiring in a `_componentsMap.js` manifest.
//!
//! ## Processing Pipeline
//!
//! ```text
//! _componentsMap.js
//!   → Lexer (tokenizes the manifest JavaScript into literals and punctuation)
//!   → Manifest parser (detects the dialect, extracts mapping records with spans)
//!   → Project scanner (walks the directory tree, indexes placeholder usages)
//!   → Validator (cross-checks records, files on disk, and usages into diagnostics)
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Configuration loading from `cmap.toml`, including
//!   exclude/include patterns, the public asset directory, and scan limits.
//! - [`manifest`] — Manifest parsing for both supported dialects, constant
//!   substitution, and component path resolution.
//! - [`project`] — Directory walking and the placeholder usage index over the
//!   project's HTML files.
//! - [`validate`] — The consistency checks relating manifest records to the
//!   files and usages they reference.
//!
//! ## Key Types
//!
//! - [`Manifest`] — A parsed component map with records in declaration order.
//! - [`MappingRecord`] — One placeholder mapping: name, data file, component
//!   reference, and the source spans of each.
//! - [`ScanOptions`] — Filters and limits applied by every directory walk.
//! - [`Diagnostics`] — The validator's output, one entry per finding.
//! - [`Edit`] — A staged text replacement produced by a rename.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cmap_core::ScanOptions;
//! use cmap_core::find_manifest_upward;
//! use cmap_core::validate;
//!
//! let manifest_path = find_manifest_upward(Path::new(".")).unwrap();
//! let manifest_text = std::fs::read_to_string(&manifest_path).unwrap();
//! let diagnostics = validate(&manifest_path, &manifest_text, &ScanOptions::default());
//!
//! for diagnostic in diagnostics.iter() {
//! 	eprintln!("{}", diagnostic.message());
//! }
//! ```

pub use config::*;
pub use error::*;
pub use manifest::*;
pub use position::*;
pub use project::*;
pub use rename::*;
pub use resolver::*;
pub use validate::*;

pub mod config;
mod error;
pub(crate) mod lexer;
pub mod manifest;
mod position;
pub mod project;
mod rename;
mod resolver;
pub mod validate;

#[cfg(test)]
mod __fixtures;
