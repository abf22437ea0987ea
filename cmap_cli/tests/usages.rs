mod common;

use cmap_core::AnyEmptyResult;

#[test]
fn usages_lists_locations_in_path_order() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	common::cmap_cmd()
		.arg("usages")
		.arg("heroBanner")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"  about/index.html:2:2\n  index.html:3:2",
		))
		.stdout(predicates::str::contains("2 usage(s) of `heroBanner`"));

	Ok(())
}

#[test]
fn usages_reports_zero_occurrences() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	common::cmap_cmd()
		.arg("usages")
		.arg("mystery")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No usages of `mystery` found."));

	Ok(())
}

#[test]
fn usages_rejects_invalid_names() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::scaffold_project(tmp.path());

	common::cmap_cmd()
		.arg("usages")
		.arg("bad name")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("invalid placeholder name"));

	Ok(())
}
