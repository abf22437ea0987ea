use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::lexer::lex;
use crate::position::LineTable;
use crate::position::Position;

/// Name of the manifest file mapping placeholders to components.
pub const MANIFEST_FILE: &str = "_componentsMap.js";

/// Conventional directory (next to the manifest) holding component modules.
pub const COMPONENTS_DIR: &str = "_components";

/// Conventional file name marking "this component takes no data".
pub const EMPTY_DATA_FILE: &str = "_empty.json";

/// Identifier conventionally bound to the data directory constant.
pub const DATA_DIR_IDENT: &str = "dataDir";

/// Identifier conventionally bound to the no-data sentinel path.
pub const NO_DATA_IDENT: &str = "noData";

/// Extension probed when a component reference omits it.
pub const SCRIPT_EXTENSION: &str = "js";

/// The two manifest syntaxes found in the wild. Both parse into the same
/// [`MappingRecord`] representation; the dialect only drives how records are
/// located and how component references are qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
	/// `module.exports = { name: { placeholder, dataFile, component }, ... }`
	/// with `require(...)` component references and templated data paths.
	Keyed,
	/// `module.exports = [{ placeholder, dataFile, component }, ...]` with
	/// plain string fields; bare component references live under
	/// [`COMPONENTS_DIR`].
	Records,
}

/// Where a mapping record's render data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSpec {
	/// The record opted out of external data: an empty string, the
	/// [`NO_DATA_IDENT`] identifier, or a path to the conventional empty
	/// data file.
	None,
	/// A JSON data file path, relative to the manifest's directory.
	File(String),
}

impl DataSpec {
	/// Classify a fully resolved data-file expression.
	fn from_resolved(value: &str) -> Self {
		let trimmed = value.trim();
		if trimmed.is_empty() {
			return Self::None;
		}

		let file_name = trimmed.rsplit('/').next().unwrap_or(trimmed);
		if file_name == EMPTY_DATA_FILE {
			return Self::None;
		}

		Self::File(trimmed.to_string())
	}

	pub fn is_none(&self) -> bool {
		matches!(self, Self::None)
	}

	/// The manifest-relative data file path, unless this is the sentinel.
	pub fn as_file(&self) -> Option<&str> {
		match self {
			Self::None => None,
			Self::File(path) => Some(path.as_str()),
		}
	}
}

/// One placeholder mapping parsed from the manifest.
///
/// Paths are kept relative to the manifest's directory exactly as written
/// (after constant substitution). `name` is empty when the placeholder
/// literal holds no extractable identifier; such records are excluded from
/// [`Manifest::mapping`] but retained here so the validator can attribute a
/// syntax error to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
	pub name: String,
	/// The placeholder literal exactly as written, e.g. `<!-- hero -->`.
	pub placeholder: String,
	pub data: DataSpec,
	/// Component module reference, possibly missing its extension.
	pub component: String,
	/// Span of the placeholder string literal (including quotes).
	pub placeholder_span: Position,
	/// Span of the `dataFile` value, when the field is present.
	pub data_span: Option<Position>,
	/// Span of the component reference (the string inside `require(...)` for
	/// the keyed dialect).
	pub component_span: Position,
	/// Span of the whole record, from its key (or opening brace) to its
	/// closing brace.
	pub span: Position,
}

impl MappingRecord {
	/// Whether the placeholder literal matches the canonical
	/// `<!-- name -->` form exactly.
	pub fn is_canonical(&self) -> bool {
		!self.name.is_empty() && self.placeholder == canonical_placeholder(&self.name)
	}

	/// Absolute path of the record's data file, or `None` for no-data
	/// records.
	pub fn data_path(&self, manifest_dir: &Path) -> Option<PathBuf> {
		self.data.as_file().map(|relative| manifest_dir.join(relative))
	}
}

/// A parsed component map. Records appear in declaration order, including
/// duplicates and syntactically damaged entries; use [`Manifest::mapping`]
/// for the deduplicated view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
	pub records: Vec<MappingRecord>,
	pub dialect: Dialect,
	/// Value of the data directory constant, when declared.
	pub data_dir: Option<String>,
	/// Resolved value of the no-data sentinel constant, when declared.
	pub no_data: Option<String>,
}

impl Manifest {
	/// Deduplicated view over the records: one record per placeholder name,
	/// where the last declaration of a name wins, iterated in
	/// first-declaration order.
	pub fn mapping(&self) -> Vec<&MappingRecord> {
		let mut order: Vec<&str> = Vec::new();
		let mut winners: HashMap<&str, &MappingRecord> = HashMap::new();

		for record in &self.records {
			if record.name.is_empty() {
				continue;
			}
			if !winners.contains_key(record.name.as_str()) {
				order.push(record.name.as_str());
			}
			winners.insert(record.name.as_str(), record);
		}

		order.into_iter().map(|name| winners[name]).collect()
	}

	/// The winning record for `name`, if any.
	pub fn get(&self, name: &str) -> Option<&MappingRecord> {
		self.records.iter().rev().find(|record| record.name == name)
	}
}

/// Parse manifest text into a [`Manifest`].
///
/// Never fails: malformed records are skipped, an unrecognizable root yields
/// an empty record list. Declaration order is preserved so diagnostics and
/// lenses iterate stably.
pub fn parse_manifest(source: &str) -> Manifest {
	let tokens = lex(source);
	let table = LineTable::new(source);
	Parser::new(&tokens, &table).parse()
}

/// Extract the placeholder identifier from an HTML comment or placeholder
/// literal. Tolerates irregular spacing and missing markers; returns `None`
/// when the inner text is not a single bare identifier.
pub fn placeholder_name(text: &str) -> Option<&str> {
	let inner = text.trim();
	let inner = inner.strip_prefix("<!--").unwrap_or(inner);
	let inner = inner.strip_suffix("-->").unwrap_or(inner);
	let inner = inner.trim();
	is_valid_placeholder_name(inner).then_some(inner)
}

/// Whether `name` is a valid placeholder identifier (`[A-Za-z0-9_]+`).
pub fn is_valid_placeholder_name(name: &str) -> bool {
	!name.is_empty()
		&& name
			.bytes()
			.all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

/// The canonical literal form of a placeholder comment.
pub fn canonical_placeholder(name: &str) -> String {
	format!("<!-- {name} -->")
}

/// Resolve a component module reference against the manifest directory,
/// probing with [`SCRIPT_EXTENSION`] appended when the reference as written
/// does not exist on disk. Returns `None` when neither candidate is a file.
pub fn resolve_component(manifest_dir: &Path, reference: &str) -> Option<PathBuf> {
	let direct = manifest_dir.join(reference);
	if direct.is_file() {
		return Some(direct);
	}

	let probed = manifest_dir.join(format!("{reference}.{SCRIPT_EXTENSION}"));
	probed.is_file().then_some(probed)
}

/// Substitute `${name}` markers in a template string against collected
/// constants. Unknown names keep their marker text so the failure is visible
/// downstream instead of silently producing a different path.
fn substitute(constants: &HashMap<String, String>, template: &str) -> String {
	let mut result = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(start) = rest.find("${") {
		result.push_str(&rest[..start]);
		let marker = &rest[start..];
		let Some(end) = marker.find('}') else {
			result.push_str(marker);
			return result;
		};
		let name = marker[2..end].trim();
		match constants.get(name) {
			Some(value) => result.push_str(value),
			None => result.push_str(&marker[..=end]),
		}
		rest = &marker[end + 1..];
	}

	result.push_str(rest);
	result
}

/// Dialect B component references without an explicit path prefix resolve
/// under the conventional components directory.
fn qualify_component(reference: &str) -> String {
	if reference.starts_with('.') || reference.starts_with('/') {
		return reference.to_string();
	}
	format!("{COMPONENTS_DIR}/{reference}")
}

fn find_matching_brace(tokens: &[Token], open: usize) -> Option<usize> {
	let mut depth = 0usize;
	for (index, token) in tokens.iter().enumerate().skip(open) {
		match token.kind {
			TokenKind::BraceOpen => depth += 1,
			TokenKind::BraceClose => {
				depth -= 1;
				if depth == 0 {
					return Some(index);
				}
			}
			_ => {}
		}
	}
	None
}

fn find_matching_bracket(tokens: &[Token], open: usize) -> Option<usize> {
	let mut depth = 0usize;
	for (index, token) in tokens.iter().enumerate().skip(open) {
		match token.kind {
			TokenKind::BracketOpen => depth += 1,
			TokenKind::BracketClose => {
				depth -= 1;
				if depth == 0 {
					return Some(index);
				}
			}
			_ => {}
		}
	}
	None
}

/// Recursive-descent scanner over the cooked token stream. One pass collects
/// `const name = "..."` declarations and locates the exported root; the
/// dialect-specific record scanners then walk the root's contents.
struct Parser<'a> {
	tokens: &'a [Token],
	table: &'a LineTable,
	constants: HashMap<String, String>,
}

impl<'a> Parser<'a> {
	fn new(tokens: &'a [Token], table: &'a LineTable) -> Self {
		Self {
			tokens,
			table,
			constants: HashMap::new(),
		}
	}

	fn kind_at(&self, index: usize) -> Option<&TokenKind> {
		self.tokens.get(index).map(|token| &token.kind)
	}

	fn ident_at(&self, index: usize) -> Option<&str> {
		match self.kind_at(index) {
			Some(TokenKind::Ident(word)) => Some(word.as_str()),
			_ => None,
		}
	}

	fn span_of(&self, index: usize) -> Position {
		self.table.position(self.tokens[index].span.clone())
	}

	fn parse(mut self) -> Manifest {
		let mut root: Option<(Dialect, usize)> = None;
		let mut fallback: Option<(Dialect, usize)> = None;
		let mut index = 0;

		while index < self.tokens.len() {
			match self.ident_at(index) {
				Some("const") => {
					index = self.parse_constant(index);
					continue;
				}
				Some("module") if self.is_exports_assignment(index) => {
					if let Some(found) = self.probe_root(index + 4) {
						root = Some(found);
						break;
					}
				}
				Some("export") if self.ident_at(index + 1) == Some("default") => {
					if let Some(found) = self.probe_root(index + 2) {
						root = Some(found);
						break;
					}
				}
				_ => {
					if fallback.is_none() {
						fallback = self.probe_root(index);
					}
				}
			}
			index += 1;
		}

		let (dialect, records) = match root.or(fallback) {
			Some((Dialect::Keyed, open)) => (Dialect::Keyed, self.parse_keyed(open)),
			Some((Dialect::Records, open)) => (Dialect::Records, self.parse_records(open)),
			None => (Dialect::Keyed, Vec::new()),
		};

		Manifest {
			records,
			dialect,
			data_dir: self.constants.get(DATA_DIR_IDENT).cloned(),
			no_data: self.constants.get(NO_DATA_IDENT).cloned(),
		}
	}

	/// `module . exports =` starting at `index`.
	fn is_exports_assignment(&self, index: usize) -> bool {
		matches!(self.kind_at(index + 1), Some(TokenKind::Dot))
			&& self.ident_at(index + 2) == Some("exports")
			&& matches!(self.kind_at(index + 3), Some(TokenKind::Equals))
	}

	fn probe_root(&self, index: usize) -> Option<(Dialect, usize)> {
		match self.kind_at(index) {
			Some(TokenKind::BraceOpen) => Some((Dialect::Keyed, index)),
			Some(TokenKind::BracketOpen) => Some((Dialect::Records, index)),
			_ => None,
		}
	}

	/// Collect `const name = <string|template>`; other `const` forms (like a
	/// map bound to a name before export) are left for the root probe.
	fn parse_constant(&mut self, index: usize) -> usize {
		let Some(name) = self.ident_at(index + 1) else {
			return index + 1;
		};
		if !matches!(self.kind_at(index + 2), Some(TokenKind::Equals)) {
			return index + 1;
		}

		let value = match self.kind_at(index + 3) {
			Some(TokenKind::Str(value)) => value.clone(),
			Some(TokenKind::Template(template)) => substitute(&self.constants, template),
			_ => return index + 1,
		};

		self.constants.insert(name.to_string(), value);
		index + 4
	}

	/// Dialect A: `key: { ... }` entries inside the root object.
	fn parse_keyed(&self, open: usize) -> Vec<MappingRecord> {
		let close = find_matching_brace(self.tokens, open).unwrap_or(self.tokens.len());
		let mut records = Vec::new();
		let mut index = open + 1;

		while index < close {
			let key_like = matches!(
				self.kind_at(index),
				Some(TokenKind::Ident(_) | TokenKind::Str(_))
			);
			if key_like
				&& matches!(self.kind_at(index + 1), Some(TokenKind::Colon))
				&& matches!(self.kind_at(index + 2), Some(TokenKind::BraceOpen))
			{
				let Some(record_close) = find_matching_brace(self.tokens, index + 2) else {
					break;
				};
				if let Some(record) =
					self.parse_record(Dialect::Keyed, index, index + 2, record_close)
				{
					records.push(record);
				}
				index = record_close + 1;
			} else {
				index += 1;
			}
		}

		records
	}

	/// Dialect B: `{ ... }` entries inside the root array.
	fn parse_records(&self, open: usize) -> Vec<MappingRecord> {
		let close = find_matching_bracket(self.tokens, open).unwrap_or(self.tokens.len());
		let mut records = Vec::new();
		let mut index = open + 1;

		while index < close {
			if matches!(self.kind_at(index), Some(TokenKind::BraceOpen)) {
				let Some(record_close) = find_matching_brace(self.tokens, index) else {
					break;
				};
				if let Some(record) =
					self.parse_record(Dialect::Records, index, index, record_close)
				{
					records.push(record);
				}
				index = record_close + 1;
			} else {
				index += 1;
			}
		}

		records
	}

	/// Parse one record block between `open` and `close`. Returns `None`
	/// when a required field is missing or carries an unusable value; the
	/// record is then skipped without failing the parse.
	fn parse_record(
		&self,
		dialect: Dialect,
		start: usize,
		open: usize,
		close: usize,
	) -> Option<MappingRecord> {
		let mut placeholder: Option<(String, Position)> = None;
		let mut data: Option<(DataSpec, Position)> = None;
		let mut component: Option<(String, Position)> = None;

		let mut index = open + 1;
		while index < close {
			let field = match self.kind_at(index) {
				Some(TokenKind::Ident(name) | TokenKind::Str(name)) => name.clone(),
				_ => {
					index += 1;
					continue;
				}
			};
			if !matches!(self.kind_at(index + 1), Some(TokenKind::Colon)) {
				index += 1;
				continue;
			}

			let value_index = index + 2;
			match field.as_str() {
				"placeholder" => {
					match self.kind_at(value_index) {
						Some(TokenKind::Str(value) | TokenKind::Template(value)) => {
							placeholder = Some((value.clone(), self.span_of(value_index)));
						}
						_ => return None,
					}
					index = value_index + 1;
				}
				"dataFile" => {
					let spec = match self.kind_at(value_index) {
						Some(TokenKind::Str(value)) => DataSpec::from_resolved(value),
						Some(TokenKind::Template(template)) => {
							DataSpec::from_resolved(&substitute(&self.constants, template))
						}
						Some(TokenKind::Ident(ident)) if ident == NO_DATA_IDENT => DataSpec::None,
						Some(TokenKind::Ident(ident)) => {
							DataSpec::from_resolved(self.constants.get(ident)?)
						}
						_ => return None,
					};
					data = Some((spec, self.span_of(value_index)));
					index = value_index + 1;
				}
				"component" => {
					let parsed = self.parse_component_value(dialect, value_index)?;
					component = Some((parsed.0, parsed.1));
					index = parsed.2;
				}
				_ => {
					index = self.skip_value(value_index);
				}
			}
		}

		let (placeholder, placeholder_span) = placeholder?;
		let (component, component_span) = component?;
		let (data, data_span) = match data {
			Some((spec, span)) => (spec, Some(span)),
			None => (DataSpec::None, None),
		};
		let name = placeholder_name(&placeholder).unwrap_or_default().to_string();

		Some(MappingRecord {
			name,
			placeholder,
			data,
			component,
			placeholder_span,
			data_span,
			component_span,
			span: self
				.table
				.position(self.tokens[start].span.start..self.tokens[close].span.end),
		})
	}

	/// A component value: `require(<string|template>)` in the keyed dialect,
	/// or a plain string/template reference. Returns the normalized
	/// reference, its span, and the index after the value.
	fn parse_component_value(
		&self,
		dialect: Dialect,
		value_index: usize,
	) -> Option<(String, Position, usize)> {
		match self.kind_at(value_index) {
			Some(TokenKind::Ident(ident)) if ident == "require" => {
				if !matches!(self.kind_at(value_index + 1), Some(TokenKind::ParenOpen)) {
					return None;
				}
				let reference = match self.kind_at(value_index + 2) {
					Some(TokenKind::Str(value)) => value.clone(),
					Some(TokenKind::Template(template)) => substitute(&self.constants, template),
					_ => return None,
				};
				if !matches!(self.kind_at(value_index + 3), Some(TokenKind::ParenClose)) {
					return None;
				}
				Some((reference, self.span_of(value_index + 2), value_index + 4))
			}
			Some(TokenKind::Str(value)) => {
				let reference = match dialect {
					Dialect::Keyed => value.clone(),
					Dialect::Records => qualify_component(value),
				};
				Some((reference, self.span_of(value_index), value_index + 1))
			}
			Some(TokenKind::Template(template)) => {
				let substituted = substitute(&self.constants, template);
				let reference = match dialect {
					Dialect::Keyed => substituted,
					Dialect::Records => qualify_component(&substituted),
				};
				Some((reference, self.span_of(value_index), value_index + 1))
			}
			_ => None,
		}
	}

	/// Skip over the value of an unknown field, stepping across nested
	/// objects, arrays, and call expressions.
	fn skip_value(&self, value_index: usize) -> usize {
		match self.kind_at(value_index) {
			Some(TokenKind::BraceOpen) => {
				find_matching_brace(self.tokens, value_index)
					.map_or(self.tokens.len(), |close| close + 1)
			}
			Some(TokenKind::BracketOpen) => {
				find_matching_bracket(self.tokens, value_index)
					.map_or(self.tokens.len(), |close| close + 1)
			}
			Some(TokenKind::Ident(_))
				if matches!(self.kind_at(value_index + 1), Some(TokenKind::ParenOpen)) =>
			{
				let mut depth = 0usize;
				for (index, token) in self.tokens.iter().enumerate().skip(value_index + 1) {
					match token.kind {
						TokenKind::ParenOpen => depth += 1,
						TokenKind::ParenClose => {
							depth -= 1;
							if depth == 0 {
								return index + 1;
							}
						}
						_ => {}
					}
				}
				self.tokens.len()
			}
			_ => value_index + 1,
		}
	}
}
