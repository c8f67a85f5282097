//! Tests for end-to-end runs of the CLI wiring.

use super::*;
use crate::cli::Cli;
use arrow_shade_engine::test_support::{ClassFileBuilder, read_jar, write_jar};
use clap::Parser;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const SHADE_TOML: &str = r#"
[project]
name = "nbt"
version = "1.0"
group = "org.broken.arrow.library"

[[rules]]
kind = "relocate"
from = "de.tr7zw.changeme.nbtapi"
package = "nbt"
"#;

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    fs::write(root.join("shade.toml"), SHADE_TOML).expect("write config");
    let class = ClassFileBuilder::new("de/tr7zw/changeme/nbtapi/NBTItem").build();
    write_jar(
        root.join("item-nbt-api.jar").as_std_path(),
        &[("de/tr7zw/changeme/nbtapi/NBTItem.class", class.as_slice())],
    )
    .expect("write dependency jar");
    fs::create_dir_all(root.join("classes/org/broken/arrow/nbt")).expect("module dirs");
    fs::write(root.join("classes/plugin.yml"), "name: nbt\n").expect("write module file");
    Workspace { _dir: dir, root }
}

fn cli_for(workspace: &Workspace, extra: &[&str]) -> Cli {
    let root = &workspace.root;
    let config = root.join("shade.toml");
    let output = root.join("out");
    let module = format!("module={}", root.join("classes"));
    let dependency = root.join("item-nbt-api.jar");
    let mut args = vec![
        "arrow-shade".to_owned(),
        "--config".to_owned(),
        config.to_string(),
        "--output-dir".to_owned(),
        output.to_string(),
    ];
    args.extend(extra.iter().map(|arg| (*arg).to_owned()));
    args.push(module);
    args.push(dependency.to_string());
    Cli::parse_from(args)
}

#[rstest]
fn run_writes_the_shaded_archive(workspace: Workspace) {
    let artifact = run(&cli_for(&workspace, &[])).expect("run succeeds");

    assert_eq!(artifact.path, workspace.root.join("out").join("nbt-1.0.jar"));
    let names: Vec<String> = read_jar(artifact.path.as_std_path())
        .expect("readable archive")
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert!(names.contains(&"plugin.yml".to_owned()));
    assert!(names.contains(&"org/broken/arrow/library/dependencies/nbt/NBTItem.class".to_owned()));
    assert_eq!(artifact.stats.inputs, 2);
}

#[rstest]
fn classifier_flag_renames_the_archive(workspace: Workspace) {
    let artifact = run(&cli_for(&workspace, &["--classifier", "all"])).expect("run succeeds");
    assert_eq!(artifact.file_name, "nbt-1.0-all.jar");
}

#[rstest]
fn missing_configuration_is_reported(workspace: Workspace) {
    fs::remove_file(workspace.root.join("shade.toml")).expect("remove config");

    let outcome = run(&cli_for(&workspace, &[]));

    assert!(matches!(outcome, Err(CliError::Config(ConfigError::Read { .. }))));
}

#[rstest]
fn unreadable_input_leaves_no_archive(workspace: Workspace) {
    fs::write(workspace.root.join("item-nbt-api.jar"), b"not a zip").expect("corrupt jar");

    let outcome = run(&cli_for(&workspace, &[]));

    assert!(matches!(
        outcome,
        Err(CliError::Packaging(PackagingError::ArchiveRead { .. }))
    ));
    assert!(!workspace.root.join("out").join("nbt-1.0.jar").exists());
}

#[rstest]
fn json_report_carries_digest_and_entries(workspace: Workspace) {
    let artifact = run(&cli_for(&workspace, &[])).expect("run succeeds");

    let report = render_report(&artifact, true).expect("report renders");
    let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");

    assert_eq!(parsed["file_name"], "nbt-1.0.jar");
    assert_eq!(parsed["sha256"], artifact.sha256.as_str());
    assert_eq!(parsed["stats"]["inputs"], 2);
    assert!(parsed["entries"].as_array().is_some_and(|entries| !entries.is_empty()));
}

#[rstest]
fn plain_report_is_the_archive_path(workspace: Workspace) {
    let artifact = run(&cli_for(&workspace, &[])).expect("run succeeds");
    assert_eq!(
        render_report(&artifact, false).expect("report renders"),
        artifact.path.as_str()
    );
}
