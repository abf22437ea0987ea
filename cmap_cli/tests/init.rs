use assert_cmd::Command;
use cmap_core::AnyEmptyResult;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let mut cmd = Command::cargo_bin("cmap")?;
	let assert = cmd
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	assert
		.stdout(predicates::str::contains("_componentsMap.js"))
		.stdout(predicates::str::contains("welcomeBanner.js"));

	let manifest_path = tmp.path().join("_componentsMap.js");
	assert!(manifest_path.exists());

	let content = std::fs::read_to_string(&manifest_path)?;
	assert!(content.contains("'<!-- welcomeBanner -->'"));
	assert!(content.contains("./_components/welcomeBanner.js"));

	assert!(tmp.path().join("_components/welcomeBanner.js").exists());
	assert!(tmp.path().join("_data/welcomeBanner.json").exists());
	assert!(tmp.path().join("_data/_empty.json").exists());
	assert!(tmp.path().join("index.html").exists());

	Ok(())
}

#[test]
fn init_scaffold_passes_check() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	Command::cargo_bin("cmap")?
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	// The generated project should be internally consistent.
	Command::cargo_bin("cmap")?
		.env("NO_COLOR", "1")
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}

#[test]
fn init_refuses_to_overwrite_an_existing_manifest() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let manifest_path = tmp.path().join("_componentsMap.js");
	std::fs::write(&manifest_path, "module.exports = {};\n")?;

	let mut cmd = Command::cargo_bin("cmap")?;
	cmd.env("NO_COLOR", "1")
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("refusing to overwrite"));

	// Nothing else is scaffolded after the refusal.
	let content = std::fs::read_to_string(&manifest_path)?;
	assert_eq!(content, "module.exports = {};\n");
	assert!(!tmp.path().join("_components").exists());

	Ok(())
}

#[test]
fn init_keeps_an_existing_html_page() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let index_path = tmp.path().join("index.html");
	std::fs::write(&index_path, "<main>mine</main>\n")?;

	Command::cargo_bin("cmap")?
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Add `<!-- welcomeBanner -->`"));

	let content = std::fs::read_to_string(&index_path)?;
	assert_eq!(content, "<main>mine</main>\n");

	Ok(())
}

#[test]
fn init_shows_next_steps() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	Command::cargo_bin("cmap")?
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Next steps"))
		.stdout(predicates::str::contains("cmap check"));

	Ok(())
}
