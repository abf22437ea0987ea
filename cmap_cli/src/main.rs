use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use cmap_cli::CmapCli;
use cmap_cli::Commands;
use cmap_cli::OutputFormat;
use cmap_core::COMPONENTS_DIR;
use cmap_core::CmapConfig;
use cmap_core::CmapError;
use cmap_core::DiagnosticKind;
use cmap_core::EMPTY_DATA_FILE;
use cmap_core::MANIFEST_FILE;
use cmap_core::ProjectDiagnostic;
use cmap_core::ScanOptions;
use cmap_core::Severity;
use cmap_core::apply_edits;
use cmap_core::count_placeholder_usages;
use cmap_core::find_manifest_upward;
use cmap_core::find_placeholder_usages;
use cmap_core::is_valid_placeholder_name;
use cmap_core::parse_manifest;
use cmap_core::rename_edits;
use cmap_core::stage_edits;
use cmap_core::validate;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = CmapCli::parse();

	// Respect the NO_COLOR env var, the --no-color flag, and piped output.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Surface scan warnings from cmap_core on stderr when asked.
	if args.verbose {
		tracing_subscriber::fmt()
			.with_env_filter(
				tracing_subscriber::EnvFilter::try_from_env("CMAP_LOG")
					.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
			)
			.with_writer(std::io::stderr)
			.with_ansi(use_color)
			.try_init()
			.ok();
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Check { format, watch }) => run_check(&args, format, watch),
		Some(Commands::List) => run_list(&args),
		Some(Commands::Usages { ref name }) => run_usages(&args, name),
		Some(Commands::Rename {
			ref old,
			ref new,
			dry_run,
		}) => run_rename(&args, old, new, dry_run),
		Some(Commands::Lsp) => run_lsp(),
		None => {
			eprintln!("No subcommand specified. Run `cmap --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<CmapError>() {
			Ok(cmap_err) => {
				let report: miette::Report = (*cmap_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_root(args: &CmapCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Locate the manifest upward from the project root and load scan options
/// from the optional config file next to it.
fn project_scope(
	args: &CmapCli,
) -> Result<(PathBuf, PathBuf, ScanOptions), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let manifest_path = find_manifest_upward(&root)
		.ok_or_else(|| CmapError::ManifestNotFound(root.display().to_string()))?;
	let manifest_dir = manifest_path
		.parent()
		.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
	let config = CmapConfig::load(&manifest_dir)?;
	let options = ScanOptions::from_config(config.as_ref());
	Ok((manifest_path, manifest_dir, options))
}

fn run_init(args: &CmapCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let manifest_path = root.join(MANIFEST_FILE);

	if manifest_path.exists() {
		return Err(CmapError::AlreadyExists(manifest_path.display().to_string()).into());
	}

	let manifest_content = r"// Maps placeholder comments to component modules.
const dataDir = './_data';
const noData = `${dataDir}/_empty.json`;

module.exports = {
	welcomeBanner: {
		placeholder: '<!-- welcomeBanner -->',
		dataFile: `${dataDir}/welcomeBanner.json`,
		component: require('./_components/welcomeBanner.js'),
	},
};
";

	std::fs::create_dir_all(root.join(COMPONENTS_DIR))?;
	std::fs::create_dir_all(root.join("_data"))?;
	std::fs::write(&manifest_path, manifest_content)?;
	println!("Created {}", manifest_path.display());

	let component_path = root.join(COMPONENTS_DIR).join("welcomeBanner.js");
	if !component_path.exists() {
		let component_content = "module.exports = function welcomeBanner(data) {\n\treturn \
		                         `<section>${data.title}</section>`;\n};\n";
		std::fs::write(&component_path, component_content)?;
		println!("Created {}", component_path.display());
	}

	let data_path = root.join("_data").join("welcomeBanner.json");
	if !data_path.exists() {
		std::fs::write(&data_path, "{ \"title\": \"Welcome\" }\n")?;
		println!("Created {}", data_path.display());
	}

	let empty_path = root.join("_data").join(EMPTY_DATA_FILE);
	if !empty_path.exists() {
		std::fs::write(&empty_path, "{}\n")?;
	}

	let index_path = root.join("index.html");
	if index_path.exists() {
		println!("Add `<!-- welcomeBanner -->` to an HTML file to render the sample component.");
	} else {
		std::fs::write(
			&index_path,
			"<!doctype html>\n<main>\n\t<!-- welcomeBanner -->\n</main>\n",
		)?;
		println!("Created {}", index_path.display());
	}

	println!();
	println!("Next steps:");
	println!("  1. Run `cmap check` to validate the project");
	println!("  2. Run `cmap list` to see the mapping with usage counts");
	println!("  3. Rename the sample: `cmap rename welcomeBanner <name>`");

	Ok(())
}

fn run_check(
	args: &CmapCli,
	format: OutputFormat,
	watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	// Run the initial check.
	let has_errors = run_check_once(args, format)?;

	if !watch {
		if has_errors {
			process::exit(1);
		}
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = resolve_root(args);
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, checking...");
		if let Err(e) = run_check_once(args, format) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

#[derive(Serialize)]
struct CheckReport {
	ok: bool,
	errors: usize,
	warnings: usize,
	diagnostics: Vec<DiagnosticEntry>,
}

#[derive(Serialize)]
struct DiagnosticEntry {
	file: String,
	line: usize,
	column: usize,
	severity: Severity,
	code: &'static str,
	message: String,
}

/// Run a single check and return whether any errors were found (warnings
/// alone pass).
fn run_check_once(
	args: &CmapCli,
	format: OutputFormat,
) -> Result<bool, Box<dyn std::error::Error>> {
	let (manifest_path, manifest_dir, options) = project_scope(args)?;
	let manifest_text = std::fs::read_to_string(&manifest_path)?;
	let mut diagnostics = validate(&manifest_path, &manifest_text, &options).into_inner();

	if args.ignore_unused {
		diagnostics.retain(|diag| !matches!(diag.kind, DiagnosticKind::UnusedPlaceholder { .. }));
	}
	if args.ignore_orphans {
		diagnostics.retain(|diag| !matches!(diag.kind, DiagnosticKind::OrphanComponent { .. }));
	}

	if args.verbose {
		let usage_total: usize = count_placeholder_usages(&manifest_dir, &options)
			.values()
			.sum();
		println!(
			"Scanned project: {} mapping record(s), {} placeholder usage(s)",
			parse_manifest(&manifest_text).records.len(),
			usage_total
		);
	}

	if diagnostics.is_empty() {
		match format {
			OutputFormat::Json => {
				let report = CheckReport {
					ok: true,
					errors: 0,
					warnings: 0,
					diagnostics: Vec::new(),
				};
				println!("{}", serde_json::to_string(&report)?);
			}
			OutputFormat::Github => {
				println!("Component map is consistent.");
			}
			OutputFormat::Text => {
				println!("Check passed: component map and project are consistent.");
			}
		}
		return Ok(false);
	}

	diagnostics.sort_by(|a, b| {
		make_relative(&a.file, &manifest_dir)
			.cmp(&make_relative(&b.file, &manifest_dir))
			.then_with(|| a.position.start.line.cmp(&b.position.start.line))
			.then_with(|| a.position.start.column.cmp(&b.position.start.column))
			.then_with(|| a.code().cmp(b.code()))
	});

	let error_count = diagnostics.iter().filter(|diag| diag.is_error()).count();
	let warning_count = diagnostics.len() - error_count;

	match format {
		OutputFormat::Json => {
			let entries: Vec<DiagnosticEntry> = diagnostics
				.iter()
				.map(|diag| DiagnosticEntry {
					file: make_relative(&diag.file, &manifest_dir),
					line: diag.position.start.line,
					column: diag.position.start.column,
					severity: diag.severity(),
					code: diag.code(),
					message: diag.message(),
				})
				.collect();
			let report = CheckReport {
				ok: error_count == 0,
				errors: error_count,
				warnings: warning_count,
				diagnostics: entries,
			};
			println!("{}", serde_json::to_string(&report)?);
		}
		OutputFormat::Github => {
			for diag in &diagnostics {
				let rel = make_relative(&diag.file, &manifest_dir);
				let kind = if diag.is_error() { "error" } else { "warning" };
				println!(
					"::{kind} file={rel},line={},col={}::{}",
					diag.position.start.line,
					diag.position.start.column,
					diag.message()
				);
			}
			eprintln!("{}", check_summary(error_count, warning_count));
		}
		OutputFormat::Text => {
			for diag in &diagnostics {
				let rel = make_relative(&diag.file, &manifest_dir);
				let report = diagnostic_to_report(diag, &rel);
				eprintln!("{report:?}");
			}
			eprintln!("{}", check_summary(error_count, warning_count));
		}
	}

	Ok(error_count > 0)
}

fn check_summary(errors: usize, warnings: usize) -> String {
	let mut parts = Vec::new();
	if errors > 0 {
		parts.push(format!("{errors} error(s)"));
	}
	if warnings > 0 {
		parts.push(format!("{warnings} warning(s)"));
	}
	format!("Found {}.", parts.join(" and "))
}

fn run_list(args: &CmapCli) -> Result<(), Box<dyn std::error::Error>> {
	let (manifest_path, manifest_dir, options) = project_scope(args)?;
	let manifest_text = std::fs::read_to_string(&manifest_path)?;
	let manifest = parse_manifest(&manifest_text);
	let mapping = manifest.mapping();

	if mapping.is_empty() {
		println!(
			"No mapping records found in `{}`.",
			make_relative(&manifest_path, &manifest_dir)
		);
		return Ok(());
	}

	let counts = count_placeholder_usages(&manifest_dir, &options);
	let mut total_usages = 0;

	println!("{}", colored!("Placeholders:", bold));
	for record in &mapping {
		let usages = counts.get(&record.name).copied().unwrap_or(0);
		total_usages += usages;
		let data = record.data.as_file().unwrap_or("none");
		println!(
			"  {} -> {} (data: {data}, {usages} usage(s))",
			record.name, record.component
		);
	}

	// Placeholders that occur in HTML but have no mapping record.
	let mut unmapped: Vec<(&String, usize)> = counts
		.iter()
		.filter(|(name, _)| manifest.get(name).is_none())
		.map(|(name, count)| (name, *count))
		.collect();
	unmapped.sort();

	if !unmapped.is_empty() {
		println!();
		println!("{}", colored!("Unmapped placeholders:", bold));
		for (name, count) in &unmapped {
			println!("  {name} ({count} usage(s))");
		}
	}

	println!("\n{} record(s), {} usage(s)", mapping.len(), total_usages);

	Ok(())
}

fn run_usages(args: &CmapCli, name: &str) -> Result<(), Box<dyn std::error::Error>> {
	if !is_valid_placeholder_name(name) {
		return Err(CmapError::InvalidName(name.to_string()).into());
	}

	let (_, manifest_dir, options) = project_scope(args)?;
	let mut occurrences = find_placeholder_usages(&manifest_dir, name, &options);
	occurrences.sort_by(|a, b| {
		a.file
			.cmp(&b.file)
			.then_with(|| a.position.start.offset.cmp(&b.position.start.offset))
	});

	if occurrences.is_empty() {
		println!("No usages of `{name}` found.");
		return Ok(());
	}

	for occurrence in &occurrences {
		let rel = make_relative(&occurrence.file, &manifest_dir);
		println!(
			"  {rel}:{}:{}",
			occurrence.position.start.line, occurrence.position.start.column
		);
	}
	println!("\n{} usage(s) of `{name}`", occurrences.len());

	Ok(())
}

fn run_rename(
	args: &CmapCli,
	old: &str,
	new: &str,
	dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let (manifest_path, manifest_dir, options) = project_scope(args)?;
	let edits = rename_edits(&manifest_path, old, new, &options)?;

	if dry_run {
		let outcome = stage_edits(&edits)?;
		println!(
			"Dry run: would apply {} edit(s) in {} file(s):",
			outcome.edit_count,
			outcome.updated_files.len()
		);
		let mut paths: Vec<_> = outcome.updated_files.keys().collect();
		paths.sort();
		for path in paths {
			let rel = make_relative(path, &manifest_dir);
			println!("  {rel}");
			let current = std::fs::read_to_string(path)?;
			print_diff(&current, &outcome.updated_files[path]);
		}
		return Ok(());
	}

	let outcome = apply_edits(&edits)?;
	println!(
		"Renamed `{old}` to `{new}`: {} edit(s) in {} file(s).",
		outcome.edit_count,
		outcome.updated_files.len()
	);

	if args.verbose {
		let mut paths: Vec<_> = outcome.updated_files.keys().collect();
		paths.sort();
		for path in paths {
			println!("  {}", make_relative(path, &manifest_dir));
		}
	}

	Ok(())
}

fn run_lsp() -> Result<(), Box<dyn std::error::Error>> {
	let rt = tokio::runtime::Runtime::new()?;
	rt.block_on(cmap_lsp::run_server());
	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Convert a `ProjectDiagnostic` into a `miette::Report` with its severity,
/// error code, and help text for rich terminal display.
fn diagnostic_to_report(diag: &ProjectDiagnostic, rel_path: &str) -> miette::Report {
	let location = format!(
		"{rel_path}:{}:{}",
		diag.position.start.line, diag.position.start.column
	);
	let severity = match diag.severity() {
		Severity::Error => miette::Severity::Error,
		Severity::Warning => miette::Severity::Warning,
	};

	let mut diag_value = miette::MietteDiagnostic::new(format!("[{location}] {}", diag.message()))
		.with_code(diag.code())
		.with_severity(severity);
	if let Some(help) = diag.help() {
		diag_value = diag_value.with_help(help);
	}
	miette::Report::new(diag_value)
}
