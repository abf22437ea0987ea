use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use cmap_core::CONFIG_FILE_CANDIDATES;
use cmap_core::CmapConfig;
use cmap_core::LineTable;
use cmap_core::MANIFEST_FILE;
use cmap_core::Manifest;
use cmap_core::MappingRecord;
use cmap_core::Occurrence;
use cmap_core::PUBLIC_PREFIX;
use cmap_core::SCRIPT_EXTENSION;
use cmap_core::ScanOptions;
use cmap_core::canonical_placeholder;
use cmap_core::collect_placeholder_usages;
use cmap_core::find_manifest_upward;
use cmap_core::is_valid_placeholder_name;
use cmap_core::parse_manifest;
use cmap_core::placeholder_occurrences;
use cmap_core::public_asset_references;
use cmap_core::resolve_component;
use cmap_core::resolve_manifest;
use cmap_core::validate;
use tokio::sync::RwLock;
use tower_lsp_server::Client;
use tower_lsp_server::LanguageServer;
use tower_lsp_server::jsonrpc::Error as LspError;
use tower_lsp_server::jsonrpc::Result as LspResult;
use tower_lsp_server::ls_types::*;

/// State for a single open document.
#[derive(Debug, Clone)]
struct DocumentState {
	/// The full text content of the document.
	content: String,
}

/// Per-document diagnostic collections, kept so a validation pass can clear
/// documents whose findings all went away. `set` replaces one document's
/// collection wholesale and `delete` drops it.
#[derive(Debug, Default)]
struct DiagnosticsRegistry {
	collections: HashMap<PathBuf, Vec<Diagnostic>>,
}

impl DiagnosticsRegistry {
	/// Replace one document's diagnostic collection.
	fn set(&mut self, file: PathBuf, diagnostics: Vec<Diagnostic>) {
		self.collections.insert(file, diagnostics);
	}

	/// Drop one document's collection. Returns whether it existed.
	fn delete(&mut self, file: &Path) -> bool {
		self.collections.remove(file).is_some()
	}

	/// Replace every collection under `scope` with `next`, and return the
	/// publish list: each document in `next` with its new diagnostics, plus an
	/// empty set for each previously tracked document under `scope` that no
	/// longer has any.
	fn sync(
		&mut self,
		scope: &Path,
		next: HashMap<PathBuf, Vec<Diagnostic>>,
	) -> Vec<(PathBuf, Vec<Diagnostic>)> {
		let stale: Vec<PathBuf> = self
			.collections
			.keys()
			.filter(|file| file.starts_with(scope) && !next.contains_key(*file))
			.cloned()
			.collect();

		let mut publishes: Vec<(PathBuf, Vec<Diagnostic>)> = Vec::new();
		for file in stale {
			self.delete(&file);
			publishes.push((file, Vec::new()));
		}
		for (file, diagnostics) in next {
			self.set(file.clone(), diagnostics.clone());
			publishes.push((file, diagnostics));
		}

		publishes.sort_by(|a, b| a.0.cmp(&b.0));
		publishes
	}
}

/// Workspace-level state shared across all LSP requests.
#[derive(Debug, Default)]
struct WorkspaceState {
	/// The workspace root path.
	root: Option<PathBuf>,
	/// Scan options from the project config, refreshed when a config file is
	/// saved.
	options: ScanOptions,
	/// Open documents keyed by URI.
	documents: HashMap<Uri, DocumentState>,
	/// Diagnostic collections from the last validation pass.
	registry: DiagnosticsRegistry,
	/// Whether the missing-manifest warning was already shown this session.
	manifest_warned: bool,
}

impl WorkspaceState {
	/// Reload scan options from the workspace's config file. Called on
	/// initialize and whenever a config file is saved.
	fn reload_config(&mut self) {
		let Some(root) = &self.root else {
			return;
		};

		match CmapConfig::load(root) {
			Ok(config) => {
				self.options = ScanOptions::from_config(config.as_ref());
			}
			Err(e) => {
				eprintln!("cmap-lsp: failed to load config: {e}");
			}
		}
	}

	/// The manifest governing `file`: the nearest `_componentsMap.js` walking
	/// upward, bounded by the workspace root when one is known.
	fn manifest_for(&self, file: &Path) -> Option<PathBuf> {
		match &self.root {
			Some(root) => resolve_manifest(file, root),
			None => find_manifest_upward(file),
		}
	}

	/// Text for `path`, preferring an open buffer over the file on disk.
	fn content_for(&self, path: &Path) -> Option<String> {
		for (uri, doc) in &self.documents {
			let buffer_path = uri.to_file_path().map(std::borrow::Cow::into_owned);
			if buffer_path.as_deref() == Some(path) {
				return Some(doc.content.clone());
			}
		}
		std::fs::read_to_string(path).ok()
	}
}

/// Whether a path is an HTML page the usage scanner would index.
fn is_html_path(path: &Path) -> bool {
	matches!(
		path.extension().and_then(|ext| ext.to_str()),
		Some("html" | "htm")
	)
}

/// Whether a path is the component map manifest.
fn is_manifest_path(path: &Path) -> bool {
	path.file_name().and_then(|name| name.to_str()) == Some(MANIFEST_FILE)
}

/// Files whose string literals are scanned for `/public/` links: the
/// manifest, script modules, and JSON data files.
fn is_linkable_path(path: &Path) -> bool {
	if is_manifest_path(path) {
		return true;
	}
	matches!(
		path.extension().and_then(|ext| ext.to_str()),
		Some("js" | "mjs" | "cjs" | "json")
	)
}

/// The placeholder comment containing `offset` in an HTML document, if any.
fn placeholder_at(content: &str, offset: usize) -> Option<(String, cmap_core::Position)> {
	placeholder_occurrences(content)
		.into_iter()
		.find(|(_, position)| position.contains_offset(offset))
}

/// The mapping record under `offset` in the manifest. The placeholder literal
/// is the primary target; anywhere else inside a record's braces works too.
fn record_at(manifest: &Manifest, offset: usize) -> Option<&MappingRecord> {
	manifest
		.records
		.iter()
		.find(|record| !record.name.is_empty() && record.placeholder_span.contains_offset(offset))
		.or_else(|| {
			manifest
				.records
				.iter()
				.find(|record| !record.name.is_empty() && record.span.contains_offset(offset))
		})
}

/// Placeholder occurrences across the project grouped by name, with open
/// buffer content taking precedence over what is on disk.
fn project_usage_index(
	state: &WorkspaceState,
	manifest_dir: &Path,
) -> BTreeMap<String, Vec<Occurrence>> {
	let mut usages = collect_placeholder_usages(manifest_dir, &state.options);

	for (uri, doc) in &state.documents {
		let Some(file) = uri.to_file_path().map(std::borrow::Cow::into_owned) else {
			continue;
		};
		if !is_html_path(&file) || !file.starts_with(manifest_dir) {
			continue;
		}

		for occurrences in usages.values_mut() {
			occurrences.retain(|occurrence| occurrence.file != file);
		}
		for (name, position) in placeholder_occurrences(&doc.content) {
			usages.entry(name).or_default().push(Occurrence {
				file: file.clone(),
				position,
			});
		}
	}

	usages.retain(|_, occurrences| !occurrences.is_empty());
	for occurrences in usages.values_mut() {
		occurrences.sort_by(|a, b| {
			a.file
				.cmp(&b.file)
				.then(a.position.start.offset.cmp(&b.position.start.offset))
		});
	}
	usages
}

/// Every occurrence of one placeholder, buffer content winning over disk.
fn project_usages(state: &WorkspaceState, manifest_dir: &Path, name: &str) -> Vec<Occurrence> {
	project_usage_index(state, manifest_dir)
		.remove(name)
		.unwrap_or_default()
}

/// Convert a core `Point` (1-indexed line, 1-indexed column) to an LSP
/// `Position` (0-indexed).
fn to_lsp_position(point: &cmap_core::Point) -> Position {
	Position {
		line: point.line.saturating_sub(1) as u32,
		character: point.column.saturating_sub(1) as u32,
	}
}

/// Convert a core `Position` to an LSP `Range`.
fn to_lsp_range(pos: &cmap_core::Position) -> Range {
	Range {
		start: to_lsp_position(&pos.start),
		end: to_lsp_position(&pos.end),
	}
}

/// Convert an LSP `Position` (0-indexed line, character in UTF-16 code units)
/// to a byte offset within `content`. Returns `None` if the position is out of
/// bounds.
fn lsp_position_to_offset(content: &str, position: Position) -> Option<usize> {
	let mut offset = 0;
	for (i, line) in content.split('\n').enumerate() {
		if i == position.line as usize {
			// LSP character offsets are in UTF-16 code units, so we need to
			// walk the line converting from UTF-16 units to byte indices.
			let mut utf16_offset = 0u32;
			for (byte_idx, c) in line.char_indices() {
				if utf16_offset == position.character {
					return Some(offset + byte_idx);
				}
				utf16_offset += c.len_utf16() as u32;
			}
			// Position at end of line (past last character).
			if utf16_offset == position.character {
				return Some(offset + line.len());
			}
			return None;
		}
		offset += line.len() + 1; // +1 for '\n'
	}
	None
}

/// Apply LSP content changes to a buffer in order. With INCREMENTAL sync each
/// change carries a `range` indicating the region to replace; a change without
/// a range replaces the whole buffer (backward compat).
fn apply_content_changes(content: &mut String, changes: Vec<TextDocumentContentChangeEvent>) {
	for change in changes {
		if let Some(range) = change.range {
			let start = lsp_position_to_offset(content, range.start);
			let end = lsp_position_to_offset(content, range.end);
			if let (Some(start), Some(end)) = (start, end) {
				content.replace_range(start..end, &change.text);
			}
		} else {
			*content = change.text;
		}
	}
}

/// The cmap language server.
#[derive(Debug)]
pub struct CmapLanguageServer {
	client: Client,
	state: RwLock<WorkspaceState>,
}

impl CmapLanguageServer {
	pub fn new(client: Client) -> Self {
		Self {
			client,
			state: RwLock::new(WorkspaceState::default()),
		}
	}

	/// Locate the manifest governing `uri`, warning the user once per session
	/// when there is none.
	async fn manifest_for_request(&self, uri: &Uri) -> Option<PathBuf> {
		let file = uri.to_file_path().map(std::borrow::Cow::into_owned)?;
		let manifest_path = {
			let state = self.state.read().await;
			state.manifest_for(&file)
		};

		if manifest_path.is_none() {
			let warned = {
				let mut state = self.state.write().await;
				std::mem::replace(&mut state.manifest_warned, true)
			};
			if !warned {
				self.client
					.show_message(
						MessageType::WARNING,
						format!("no `{MANIFEST_FILE}` found for this workspace"),
					)
					.await;
			}
		}

		manifest_path
	}

	/// Re-validate the project that governs `uri` and publish the new
	/// diagnostics, clearing documents whose findings all went away.
	async fn refresh_diagnostics(&self, uri: &Uri) {
		let Some(file) = uri.to_file_path().map(std::borrow::Cow::into_owned) else {
			return;
		};

		let publishes = {
			let mut state = self.state.write().await;
			let Some(manifest_path) = state.manifest_for(&file) else {
				return;
			};
			let scope = manifest_path
				.parent()
				.map(Path::to_path_buf)
				.unwrap_or_default();
			let next = compute_diagnostics(&state, &manifest_path);
			state.registry.sync(&scope, next)
		};

		tracing::debug!("publishing diagnostics for {} file(s)", publishes.len());
		for (file, diagnostics) in publishes {
			let Some(target) = Uri::from_file_path(&file) else {
				continue;
			};
			self.client
				.publish_diagnostics(target, diagnostics, None)
				.await;
		}
	}

	/// Handle a document being opened or changed — store the buffer and
	/// publish fresh diagnostics.
	async fn on_document_change(&self, uri: &Uri, content: String) {
		{
			let mut state = self.state.write().await;
			state
				.documents
				.insert(uri.clone(), DocumentState { content });
		}
		self.refresh_diagnostics(uri).await;
	}
}

impl LanguageServer for CmapLanguageServer {
	async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
		// Determine workspace root — prefer `workspace_folders` (modern LSP),
		// fall back to the deprecated `root_uri` for older clients.
		let root = params
			.workspace_folders
			.as_ref()
			.and_then(|folders| folders.first())
			.and_then(|folder| folder.uri.to_file_path().map(std::borrow::Cow::into_owned))
			.or_else(|| {
				#[allow(deprecated)]
				params
					.root_uri
					.as_ref()
					.and_then(|uri| uri.to_file_path().map(std::borrow::Cow::into_owned))
			});

		{
			let mut state = self.state.write().await;
			state.root = root;
			state.reload_config();
		}

		Ok(InitializeResult {
			capabilities: ServerCapabilities {
				text_document_sync: Some(TextDocumentSyncCapability::Kind(
					TextDocumentSyncKind::INCREMENTAL,
				)),
				definition_provider: Some(OneOf::Left(true)),
				references_provider: Some(OneOf::Left(true)),
				rename_provider: Some(OneOf::Left(true)),
				code_lens_provider: Some(CodeLensOptions {
					resolve_provider: Some(false),
				}),
				document_link_provider: Some(DocumentLinkOptions {
					resolve_provider: Some(false),
					work_done_progress_options: WorkDoneProgressOptions::default(),
				}),
				..Default::default()
			},
			server_info: Some(ServerInfo {
				name: "cmap-lsp".to_string(),
				version: Some(env!("CARGO_PKG_VERSION").to_string()),
			}),
			offset_encoding: None,
		})
	}

	async fn initialized(&self, _: InitializedParams) {
		self.client
			.log_message(MessageType::INFO, "cmap language server initialized")
			.await;
	}

	async fn shutdown(&self) -> LspResult<()> {
		Ok(())
	}

	async fn did_open(&self, params: DidOpenTextDocumentParams) {
		let uri = params.text_document.uri;
		let content = params.text_document.text;
		self.on_document_change(&uri, content).await;
	}

	async fn did_change(&self, params: DidChangeTextDocumentParams) {
		let uri = params.text_document.uri;

		// Get the current document content to apply incremental changes to.
		let current_content = {
			let state = self.state.read().await;
			state.documents.get(&uri).map(|doc| doc.content.clone())
		};

		let Some(mut content) = current_content else {
			// Document not tracked yet — use the last change as full content.
			if let Some(change) = params.content_changes.into_iter().next_back() {
				self.on_document_change(&uri, change.text).await;
			}
			return;
		};

		apply_content_changes(&mut content, params.content_changes);
		self.on_document_change(&uri, content).await;
	}

	async fn did_save(&self, params: DidSaveTextDocumentParams) {
		let uri = &params.text_document.uri;
		let is_config = CONFIG_FILE_CANDIDATES
			.iter()
			.any(|candidate| uri.path().as_str().ends_with(candidate));

		if is_config {
			// Config changed — exclude patterns, public dir, or size limits
			// may differ now.
			let mut state = self.state.write().await;
			state.reload_config();
		}

		self.refresh_diagnostics(uri).await;
	}

	async fn did_close(&self, params: DidCloseTextDocumentParams) {
		let uri = params.text_document.uri;
		{
			let mut state = self.state.write().await;
			state.documents.remove(&uri);
			if let Some(file) = uri.to_file_path().map(std::borrow::Cow::into_owned) {
				state.registry.delete(&file);
			}
		}
		// Clear diagnostics for the closed document.
		self.client.publish_diagnostics(uri, Vec::new(), None).await;
	}

	async fn goto_definition(
		&self,
		params: GotoDefinitionParams,
	) -> LspResult<Option<GotoDefinitionResponse>> {
		let uri = &params.text_document_position_params.text_document.uri;
		let position = params.text_document_position_params.position;

		let Some(manifest_path) = self.manifest_for_request(uri).await else {
			return Ok(None);
		};

		let state = self.state.read().await;
		Ok(compute_definition(&state, uri, &manifest_path, position))
	}

	async fn references(&self, params: ReferenceParams) -> LspResult<Option<Vec<Location>>> {
		let uri = &params.text_document_position.text_document.uri;
		let position = params.text_document_position.position;
		let include_declaration = params.context.include_declaration;

		let Some(manifest_path) = self.manifest_for_request(uri).await else {
			return Ok(None);
		};

		let state = self.state.read().await;
		Ok(compute_references(
			&state,
			uri,
			&manifest_path,
			position,
			include_declaration,
		))
	}

	async fn rename(&self, params: RenameParams) -> LspResult<Option<WorkspaceEdit>> {
		let uri = &params.text_document_position.text_document.uri;
		let position = params.text_document_position.position;
		let new_name = params.new_name;

		if !is_valid_placeholder_name(&new_name) {
			return Err(LspError::invalid_params(format!(
				"invalid placeholder name: `{new_name}`"
			)));
		}

		let Some(manifest_path) = self.manifest_for_request(uri).await else {
			return Ok(None);
		};

		let state = self.state.read().await;
		Ok(compute_rename(
			&state,
			uri,
			&manifest_path,
			position,
			&new_name,
		))
	}

	async fn code_lens(&self, params: CodeLensParams) -> LspResult<Option<Vec<CodeLens>>> {
		let uri = &params.text_document.uri;

		let Some(manifest_path) = self.manifest_for_request(uri).await else {
			return Ok(None);
		};

		let state = self.state.read().await;
		let lenses = compute_code_lens(&state, uri, &manifest_path);

		if lenses.is_empty() {
			Ok(None)
		} else {
			Ok(Some(lenses))
		}
	}

	async fn document_link(
		&self,
		params: DocumentLinkParams,
	) -> LspResult<Option<Vec<DocumentLink>>> {
		let uri = &params.text_document.uri;

		let Some(manifest_path) = self.manifest_for_request(uri).await else {
			return Ok(None);
		};

		let state = self.state.read().await;
		let links = compute_document_links(&state, uri, &manifest_path);

		if links.is_empty() {
			Ok(None)
		} else {
			Ok(Some(links))
		}
	}
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Convert a validation finding to an LSP diagnostic.
fn project_diagnostic_to_lsp(diagnostic: &cmap_core::ProjectDiagnostic) -> Diagnostic {
	let severity = match diagnostic.severity() {
		cmap_core::Severity::Error => DiagnosticSeverity::ERROR,
		cmap_core::Severity::Warning => DiagnosticSeverity::WARNING,
	};

	Diagnostic {
		range: to_lsp_range(&diagnostic.position),
		severity: Some(severity),
		code: Some(NumberOrString::String(diagnostic.code().to_string())),
		source: Some("cmap".to_string()),
		message: diagnostic.message(),
		..Default::default()
	}
}

/// Validate the project owning `manifest_path` and group the findings per
/// file. Open-buffer content wins over disk content for the manifest itself;
/// HTML usage ranges come from the files on disk.
fn compute_diagnostics(
	state: &WorkspaceState,
	manifest_path: &Path,
) -> HashMap<PathBuf, Vec<Diagnostic>> {
	let Some(manifest_text) = state.content_for(manifest_path) else {
		return HashMap::new();
	};

	let mut grouped: HashMap<PathBuf, Vec<Diagnostic>> = HashMap::new();
	for diagnostic in validate(manifest_path, &manifest_text, &state.options).into_inner() {
		grouped
			.entry(diagnostic.file.clone())
			.or_default()
			.push(project_diagnostic_to_lsp(&diagnostic));
	}
	grouped
}

// ---------------------------------------------------------------------------
// Go to Definition
// ---------------------------------------------------------------------------

/// Compute go-to-definition for a placeholder comment in an HTML page: the
/// component module, the data file (skipped for no-data records), and the
/// manifest declaration, in that order.
fn compute_definition(
	state: &WorkspaceState,
	uri: &Uri,
	manifest_path: &Path,
	position: Position,
) -> Option<GotoDefinitionResponse> {
	let doc = state.documents.get(uri)?;
	let file = uri.to_file_path().map(std::borrow::Cow::into_owned)?;
	if !is_html_path(&file) {
		return None;
	}

	let offset = lsp_position_to_offset(&doc.content, position)?;
	let (name, _) = placeholder_at(&doc.content, offset)?;

	let manifest_text = state.content_for(manifest_path)?;
	let manifest = parse_manifest(&manifest_text);
	let record = manifest.get(&name)?;
	let manifest_dir = manifest_path.parent()?;

	let mut locations = Vec::new();

	// Component module — fall back to the conventional path when the file is
	// missing so the editor can offer to create it.
	let component = resolve_component(manifest_dir, &record.component).unwrap_or_else(|| {
		let direct = manifest_dir.join(&record.component);
		match direct.extension() {
			Some(_) => direct,
			None => direct.with_extension(SCRIPT_EXTENSION),
		}
	});
	if let Some(target) = Uri::from_file_path(&component) {
		locations.push(Location {
			uri: target,
			range: Range::default(),
		});
	}

	if let Some(data_path) = record.data_path(manifest_dir) {
		if let Some(target) = Uri::from_file_path(&data_path) {
			locations.push(Location {
				uri: target,
				range: Range::default(),
			});
		}
	}

	if let Some(target) = Uri::from_file_path(manifest_path) {
		locations.push(Location {
			uri: target,
			range: to_lsp_range(&record.placeholder_span),
		});
	}

	if locations.is_empty() {
		None
	} else if locations.len() == 1 {
		Some(GotoDefinitionResponse::Scalar(
			locations.into_iter().next()?,
		))
	} else {
		Some(GotoDefinitionResponse::Array(locations))
	}
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Compute all references to the placeholder under the cursor. Works from an
/// HTML occurrence or from the manifest record itself; the declaration is
/// prepended when the client asks for it.
fn compute_references(
	state: &WorkspaceState,
	uri: &Uri,
	manifest_path: &Path,
	position: Position,
	include_declaration: bool,
) -> Option<Vec<Location>> {
	let doc = state.documents.get(uri)?;
	let file = uri.to_file_path().map(std::borrow::Cow::into_owned)?;
	let offset = lsp_position_to_offset(&doc.content, position)?;

	let manifest_text = state.content_for(manifest_path)?;
	let manifest = parse_manifest(&manifest_text);

	let name = if is_manifest_path(&file) {
		record_at(&manifest, offset)?.name.clone()
	} else if is_html_path(&file) {
		placeholder_at(&doc.content, offset)?.0
	} else {
		return None;
	};

	let manifest_dir = manifest_path.parent()?;
	let mut locations = Vec::new();

	if include_declaration {
		if let Some(record) = manifest.get(&name) {
			if let Some(target) = Uri::from_file_path(manifest_path) {
				locations.push(Location {
					uri: target,
					range: to_lsp_range(&record.placeholder_span),
				});
			}
		}
	}

	for occurrence in project_usages(state, manifest_dir, &name) {
		if let Some(target) = Uri::from_file_path(&occurrence.file) {
			locations.push(Location {
				uri: target,
				range: to_lsp_range(&occurrence.position),
			});
		}
	}

	if locations.is_empty() {
		None
	} else {
		Some(locations)
	}
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

/// Compute a workspace edit renaming the placeholder under the cursor: every
/// declaration in the manifest plus every HTML occurrence, batched so the
/// client applies them atomically. Manifest literals keep the quote character
/// the author wrote.
fn compute_rename(
	state: &WorkspaceState,
	uri: &Uri,
	manifest_path: &Path,
	position: Position,
	new_name: &str,
) -> Option<WorkspaceEdit> {
	let doc = state.documents.get(uri)?;
	let file = uri.to_file_path().map(std::borrow::Cow::into_owned)?;
	let offset = lsp_position_to_offset(&doc.content, position)?;

	let manifest_text = state.content_for(manifest_path)?;
	let manifest = parse_manifest(&manifest_text);

	let old_name = if is_manifest_path(&file) {
		record_at(&manifest, offset)?.name.clone()
	} else if is_html_path(&file) {
		placeholder_at(&doc.content, offset)?.0
	} else {
		return None;
	};

	let manifest_dir = manifest_path.parent()?;
	let replacement = canonical_placeholder(new_name);
	let mut changes: HashMap<Uri, Vec<TextEdit>> = HashMap::new();

	let manifest_uri = Uri::from_file_path(manifest_path)?;
	for record in &manifest.records {
		if record.name != old_name {
			continue;
		}
		let quote = manifest_text
			.as_bytes()
			.get(record.placeholder_span.start.offset)
			.copied()
			.unwrap_or(b'\'') as char;
		changes
			.entry(manifest_uri.clone())
			.or_default()
			.push(TextEdit {
				range: to_lsp_range(&record.placeholder_span),
				new_text: format!("{quote}{replacement}{quote}"),
			});
	}

	for occurrence in project_usages(state, manifest_dir, &old_name) {
		let Some(target) = Uri::from_file_path(&occurrence.file) else {
			continue;
		};
		changes.entry(target).or_default().push(TextEdit {
			range: to_lsp_range(&occurrence.position),
			new_text: replacement.clone(),
		});
	}

	if changes.is_empty() {
		return None;
	}

	Some(WorkspaceEdit {
		changes: Some(changes),
		..Default::default()
	})
}

// ---------------------------------------------------------------------------
// Code Lens
// ---------------------------------------------------------------------------

/// Compute one usage-count lens per mapping record on the manifest document.
fn compute_code_lens(state: &WorkspaceState, uri: &Uri, manifest_path: &Path) -> Vec<CodeLens> {
	let Some(file) = uri.to_file_path().map(std::borrow::Cow::into_owned) else {
		return Vec::new();
	};
	if !is_manifest_path(&file) {
		return Vec::new();
	}
	let Some(manifest_text) = state.content_for(manifest_path) else {
		return Vec::new();
	};
	let Some(manifest_dir) = manifest_path.parent() else {
		return Vec::new();
	};

	let manifest = parse_manifest(&manifest_text);
	let index = project_usage_index(state, manifest_dir);

	manifest
		.mapping()
		.iter()
		.map(|record| {
			let count = index.get(&record.name).map_or(0, Vec::len);
			let title = if count == 1 {
				"1 usage".to_string()
			} else {
				format!("{count} usages")
			};
			CodeLens {
				range: to_lsp_range(&record.placeholder_span),
				command: Some(Command {
					title,
					command: "cmap.showUsages".to_string(),
					arguments: Some(vec![serde_json::Value::String(record.name.clone())]),
				}),
				data: None,
			}
		})
		.collect()
}

// ---------------------------------------------------------------------------
// Document Links
// ---------------------------------------------------------------------------

/// Compute links for `/public/` asset references in the manifest, script
/// modules, and JSON data files. Only references that resolve to an existing
/// file become links; missing ones surface as diagnostics instead.
fn compute_document_links(
	state: &WorkspaceState,
	uri: &Uri,
	manifest_path: &Path,
) -> Vec<DocumentLink> {
	let Some(doc) = state.documents.get(uri) else {
		return Vec::new();
	};
	let Some(file) = uri.to_file_path().map(std::borrow::Cow::into_owned) else {
		return Vec::new();
	};
	if !is_linkable_path(&file) {
		return Vec::new();
	}
	let Some(manifest_dir) = manifest_path.parent() else {
		return Vec::new();
	};

	let table = LineTable::new(&doc.content);
	let public_root = manifest_dir.join(&state.options.public_dir);
	let mut links = Vec::new();

	for (reference, range) in public_asset_references(&doc.content) {
		let asset = public_root.join(&reference[PUBLIC_PREFIX.len()..]);
		if !asset.is_file() {
			continue;
		}
		let Some(target) = Uri::from_file_path(&asset) else {
			continue;
		};

		// Narrow the range from the enclosing literal to the reference itself
		// when it can be located verbatim.
		let raw = &doc.content[range.clone()];
		let span = raw.find(reference.as_str()).map_or(range.clone(), |at| {
			range.start + at..range.start + at + reference.len()
		});

		links.push(DocumentLink {
			range: to_lsp_range(&table.position(span)),
			target: Some(target),
			tooltip: None,
			data: None,
		});
	}

	links
}

/// Start the LSP server on stdin/stdout. This is what `cmap lsp` runs; the
/// log filter comes from the `CMAP_LOG` environment variable and output goes
/// to stderr so the protocol stream stays clean.
pub async fn run_server() {
	let filter = tracing_subscriber::EnvFilter::try_from_env("CMAP_LOG")
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.try_init()
		.ok();

	let stdin = tokio::io::stdin();
	let stdout = tokio::io::stdout();

	let (service, socket) = tower_lsp_server::LspService::new(CmapLanguageServer::new);
	tower_lsp_server::Server::new(stdin, stdout, socket)
		.serve(service)
		.await;
}
