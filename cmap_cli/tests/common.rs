use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn cmap_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("cmap"));
	cmd.env("NO_COLOR", "1");
	cmd
}

/// Write a consistent sample project: `heroBanner` used twice, `siteFooter`
/// once, every referenced file present.
pub fn scaffold_project(root: &Path) {
	write_file(
		&root.join("_componentsMap.js"),
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
",
	);
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

fn write_file(path: &Path, content: &str) {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}
