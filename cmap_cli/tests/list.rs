mod common;

use cmap_core::AnyEmptyResult;

#[test]
fn list_shows_records_with_usage_counts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	let assert = common::cmap_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
	insta::assert_snapshot!(stdout, @r"
	Placeholders:
	  heroBanner -> ./_components/heroBanner.js (data: ./_data/heroBanner.json, 2 usage(s))
	  siteFooter -> ./_components/siteFooter (data: none, 1 usage(s))

	2 record(s), 3 usage(s)
	");

	Ok(())
}

#[test]
fn list_reports_unmapped_placeholders() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());
	std::fs::write(
		tmp.path().join("extra.html"),
		"<main>\n\t<!-- mystery -->\n</main>\n",
	)?;

	common::cmap_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Unmapped placeholders:"))
		.stdout(predicates::str::contains("  mystery (1 usage(s))"))
		.stdout(predicates::str::contains("2 record(s), 3 usage(s)"));

	Ok(())
}

#[test]
fn list_with_an_empty_manifest() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("_componentsMap.js"), "module.exports = {};\n")?;

	common::cmap_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"No mapping records found in `_componentsMap.js`.",
		));

	Ok(())
}
