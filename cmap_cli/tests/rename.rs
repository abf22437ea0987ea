mod common;

use cmap_core::AnyEmptyResult;
use similar_asserts::assert_eq;

#[test]
fn rename_rewrites_manifest_and_html() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	let mut cmd = common::cmap_cmd();
	cmd.arg("rename")
		.arg("heroBanner")
		.arg("mainHero")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Renamed `heroBanner` to `mainHero`: 3 edit(s) in 3 file(s).",
		));

	let manifest = std::fs::read_to_string(tmp.path().join("_componentsMap.js"))?;
	assert!(manifest.contains("'<!-- mainHero -->'"));
	assert!(!manifest.contains("heroBanner -->"));
	// Only the placeholder literal changes; the key and paths keep the old
	// spelling.
	assert!(manifest.contains("heroBanner: {"));

	let index = std::fs::read_to_string(tmp.path().join("index.html"))?;
	assert_eq!(
		index,
		"<!doctype html>\n<main>\n\t<!-- mainHero -->\n</main>\n<!-- siteFooter -->\n"
	);

	let about = std::fs::read_to_string(tmp.path().join("about/index.html"))?;
	assert_eq!(about, "<main>\n\t<!-- mainHero -->\n</main>\n");

	Ok(())
}

#[test]
fn rename_dry_run_previews_without_writing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	let mut cmd = common::cmap_cmd();
	cmd.arg("rename")
		.arg("heroBanner")
		.arg("mainHero")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Dry run: would apply 3 edit(s) in 3 file(s):",
		))
		.stderr(predicates::str::contains("<!-- mainHero -->"));

	// Nothing on disk changes.
	let manifest = std::fs::read_to_string(tmp.path().join("_componentsMap.js"))?;
	assert!(manifest.contains("'<!-- heroBanner -->'"));
	let index = std::fs::read_to_string(tmp.path().join("index.html"))?;
	assert!(index.contains("<!-- heroBanner -->"));

	Ok(())
}

#[test]
fn rename_covers_placeholders_without_manifest_records() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());
	std::fs::write(
		tmp.path().join("extra.html"),
		"<main>\n\t<!-- mystery -->\n</main>\n",
	)?;

	let mut cmd = common::cmap_cmd();
	cmd.arg("rename")
		.arg("mystery")
		.arg("solved")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("1 edit(s) in 1 file(s)."));

	let extra = std::fs::read_to_string(tmp.path().join("extra.html"))?;
	assert_eq!(extra, "<main>\n\t<!-- solved -->\n</main>\n");

	Ok(())
}

#[test]
fn rename_rejects_invalid_names() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	let mut cmd = common::cmap_cmd();
	cmd.arg("rename")
		.arg("heroBanner")
		.arg("bad-name")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("invalid placeholder name"));

	// The project is untouched.
	let manifest = std::fs::read_to_string(tmp.path().join("_componentsMap.js"))?;
	assert!(manifest.contains("'<!-- heroBanner -->'"));

	Ok(())
}

#[test]
fn rename_fails_for_unknown_placeholders() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	let mut cmd = common::cmap_cmd();
	cmd.arg("rename")
		.arg("missing")
		.arg("anything")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unknown placeholder"));

	Ok(())
}
