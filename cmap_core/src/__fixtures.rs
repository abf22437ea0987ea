use std::path::Path;

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: impl AsRef<[u8]>) {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

/// Keyed-object manifest exercising declared constants, template literals,
/// the no-data sentinel, and an extensionless component reference.
pub fn keyed_manifest() -> &'static str {
	r"// Maps placeholder comments to component modules.
const dataDir = './_data';
const noData = `${dataDir}/_empty.json`;

module.exports = {
	heroBanner: {
		placeholder: '<!-- heroBanner -->',
		dataFile: `${dataDir}/heroBanner.json`,
		component: require('./_components/heroBanner.js'),
	},
	siteFooter: {
		placeholder: '<!-- siteFooter -->',
		dataFile: noData,
		component: require('./_components/siteFooter'),
	},
};
"
}

/// Array-of-records manifest with plain string paths and a bare component
/// reference that resolves under the conventional components directory.
pub fn records_manifest() -> &'static str {
	r#"export default [
	{
		placeholder: "<!-- heroBanner -->",
		dataFile: "_data/heroBanner.json",
		component: "heroBanner",
	},
	{
		placeholder: "<!-- siteFooter -->",
		component: "./custom/siteFooter.js",
	},
];
"#
}

/// Scaffold a complete, internally consistent project at `root`: the keyed
/// manifest, both mapped component modules, their data files, pages using
/// every placeholder, and the public asset the data file references.
///
/// `heroBanner` is used twice and `siteFooter` once, so a clean validation
/// pass produces no diagnostics at all.
pub fn scaffold_project(root: &Path) {
	write_file(&root.join("_componentsMap.js"), keyed_manifest());
	write_file(
		&root.join("_components/heroBanner.js"),
		"module.exports = function heroBanner(data) {\n\treturn `<section>${data.title}</section>`;\n};\n",
	);
	write_file(
		&root.join("_components/siteFooter.js"),
		"export default function siteFooter() {\n\treturn '<footer></footer>';\n}\n",
	);
	write_file(
		&root.join("_data/heroBanner.json"),
		"{ \"title\": \"Welcome\", \"image\": \"/public/images/hero.png\" }\n",
	);
	write_file(&root.join("_data/_empty.json"), "{}\n");
	write_file(&root.join("public/images/hero.png"), "png-bytes");
	write_file(
		&root.join("index.html"),
		"<!doctype html>\n<main>\n\t<!-- heroBanner -->\n</main>\n<!-- siteFooter -->\n",
	);
	write_file(
		&root.join("about/index.html"),
		"<main>\n\t<!-- heroBanner -->\n</main>\n",
	);
}
