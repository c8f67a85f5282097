//! Tests for CLI parsing and input specifications.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["arrow-shade", "-o", "build/libs", "module.jar"]);
    assert_eq!(cli.config, Utf8PathBuf::from("shade.toml"));
    assert_eq!(cli.output_dir, Utf8PathBuf::from("build/libs"));
    assert!(cli.classifier.is_none());
    assert!(!cli.json);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert_eq!(cli.log_level(), LevelFilter::Warn);
    assert_eq!(cli.inputs.len(), 1);
}

#[test]
fn cli_requires_an_input() {
    assert!(Cli::try_parse_from(["arrow-shade", "-o", "out"]).is_err());
}

#[test]
fn cli_requires_an_output_dir() {
    assert!(Cli::try_parse_from(["arrow-shade", "module.jar"]).is_err());
}

#[test]
fn cli_keeps_input_order() {
    let cli = Cli::parse_from([
        "arrow-shade",
        "-o",
        "out",
        "module=build/classes",
        "deps/item-nbt-api.jar",
    ]);
    let paths: Vec<_> = cli.inputs.iter().map(|input| input.path.as_str()).collect();
    assert_eq!(paths, ["build/classes", "deps/item-nbt-api.jar"]);
}

#[test]
fn cli_collects_identity_overrides() {
    let cli = Cli::parse_from([
        "arrow-shade",
        "-o",
        "out",
        "--name",
        "nbt",
        "--version",
        "1.0",
        "--group",
        "org.broken.arrow.library",
        "a.jar",
    ]);
    let overrides = cli.identity_overrides();
    assert_eq!(overrides.name.as_deref(), Some("nbt"));
    assert_eq!(overrides.version.as_deref(), Some("1.0"));
    assert_eq!(overrides.group.as_deref(), Some("org.broken.arrow.library"));
}

#[test]
fn cli_rejects_quiet_with_verbose() {
    assert!(Cli::try_parse_from(["arrow-shade", "-o", "out", "-q", "-v", "a.jar"]).is_err());
}

#[rstest]
#[case::quiet(&["-q"], LevelFilter::Error)]
#[case::default(&[], LevelFilter::Warn)]
#[case::info(&["-v"], LevelFilter::Info)]
#[case::debug(&["-vv"], LevelFilter::Debug)]
#[case::trace(&["-vvvv"], LevelFilter::Trace)]
fn log_level_follows_flags(#[case] flags: &[&str], #[case] expected: LevelFilter) {
    let args = ["arrow-shade", "-o", "out"]
        .into_iter()
        .chain(flags.iter().copied())
        .chain(["a.jar"]);
    let cli = Cli::parse_from(args);
    assert_eq!(cli.log_level(), expected);
}

#[rstest]
#[case::bare_path("deps/nbt.jar", None, "deps/nbt.jar")]
#[case::named("module=build/classes", Some("module"), "build/classes")]
#[case::separator_in_prefix("build/a=b/classes", None, "build/a=b/classes")]
#[case::empty_name("=deps/nbt.jar", None, "=deps/nbt.jar")]
fn input_spec_parses_optional_names(
    #[case] input: &str,
    #[case] name: Option<&str>,
    #[case] path: &str,
) {
    let spec: InputSpec = input.parse().expect("input specs always parse");
    assert_eq!(spec.name.as_deref(), name);
    assert_eq!(spec.path, Utf8PathBuf::from(path));
}

#[rstest]
#[case::existing_file_with_equals(true, None, "lib=1.0.jar")]
#[case::missing_file_is_split(false, Some("lib"), "1.0.jar")]
fn existing_paths_are_never_split(
    #[case] exists: bool,
    #[case] name: Option<&str>,
    #[case] path: &str,
) {
    let spec = InputSpec::parse_with("lib=1.0.jar", |_| exists);
    assert_eq!(spec.name.as_deref(), name);
    assert_eq!(spec.path, Utf8PathBuf::from(path));
}

#[test]
fn named_directory_input_reports_its_name() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    let spec = InputSpec {
        name: Some("module".to_owned()),
        path,
    };
    assert_eq!(spec.to_source().name(), "module");
}
