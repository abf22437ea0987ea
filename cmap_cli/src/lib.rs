use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep HTML comment placeholders, component modules, and data files consistent.",
	long_about = "cmap (component map) validates projects that stamp HTML pages with \
	              `<!-- placeholder -->` comments and wire each placeholder to a JavaScript \
	              component module and a JSON data file through a `_componentsMap.js` \
	              manifest.\n\nQuick start:\n  cmap init     Scaffold a manifest in an empty \
	              project\n  cmap check    Validate the manifest against the project\n  cmap \
	              list     Show the mapping with usage counts\n  cmap rename   Rename a \
	              placeholder everywhere at once"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct CmapCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,

	/// Ignore unused placeholder warnings (declared in the manifest but never
	/// used in any HTML file).
	#[arg(long, global = true, default_value_t = false)]
	pub ignore_unused: bool,

	/// Ignore orphan component warnings (module files in the components
	/// directory that no mapping record points to).
	#[arg(long, global = true, default_value_t = false)]
	pub ignore_orphans: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize a component map in a project.
	///
	/// Creates a `_componentsMap.js` manifest with one sample mapping record,
	/// the `_components/` and `_data/` directories it references, and a sample
	/// HTML page when none exists. Refuses to run if a manifest is already
	/// present.
	Init,
	/// Check that the manifest and the project agree.
	///
	/// Parses the manifest, indexes every placeholder comment in the HTML
	/// subtree, and cross-checks both against the files on disk: missing or
	/// invalid data files, missing component modules or exports, unused and
	/// duplicate placeholders, orphan components, and dangling `/public/`
	/// asset references.
	///
	/// Exits `1` when errors are found (warnings alone pass), which makes it
	/// suitable for CI. Use `--format` to control the output style.
	Check {
		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations that appear inline on PRs.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Watch for file changes and re-run checks automatically. Monitors
		/// the manifest, HTML files, components, and data files.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// List every mapping record with its component, data file, and usage
	/// count.
	///
	/// Reads the manifest in declaration order (later duplicates win) and
	/// counts occurrences of each placeholder across the HTML subtree. Useful
	/// for auditing which components are actually referenced.
	List,
	/// Show every occurrence of one placeholder in the HTML subtree.
	///
	/// Prints `file:line:column` for each `<!-- name -->` comment found. A
	/// placeholder with zero occurrences is not an error; the command only
	/// fails when the name itself is invalid.
	Usages {
		/// The placeholder name to look up, without the comment delimiters.
		name: String,
	},
	/// Rename a placeholder across the manifest and every HTML file.
	///
	/// Rewrites the placeholder literal of each manifest record declaring the
	/// old name (keeping its quote style) and every `<!-- old -->` comment in
	/// the project. No file is written until the whole edit set has staged
	/// cleanly.
	///
	/// Use `--dry-run` to preview the changes as unified diffs without
	/// touching disk.
	Rename {
		/// The current placeholder name.
		old: String,

		/// The new placeholder name. Letters, digits, and underscores only.
		new: String,

		/// Preview changes without writing files. Prints a diff for each
		/// file that would be modified.
		#[arg(long, default_value_t = false)]
		dry_run: bool,
	},
	/// Start the cmap language server (LSP).
	///
	/// Communicates over stdin/stdout using the Language Server Protocol.
	/// Configure your editor to run `cmap lsp` as the language server command
	/// for HTML, JSON, and `_componentsMap.js` files.
	///
	/// Provides project-wide diagnostics, go-to-definition from placeholder
	/// comments, find-references, rename, usage-count code lenses, and
	/// document links for `/public/` assets.
	Lsp,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Includes every diagnostic
	/// with its file, position, severity, code, and message.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` or `::error`
	/// annotations that appear inline on pull request diffs.
	Github,
}
