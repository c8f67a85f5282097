//! Unit tests for the merged archive.

use super::*;
use crate::test_support::read_jar;
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("temp dir creation succeeds")
}

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir")
}

fn archive_with(entries: &[(&str, &str)]) -> MergedArchive {
    let mut archive = MergedArchive::new();
    for (path, content) in entries {
        archive
            .insert(
                (*path).to_owned(),
                content.as_bytes().to_vec(),
                "input.jar",
                DuplicatePolicy::KeepFirst,
            )
            .expect("insert succeeds");
    }
    archive
}

#[rstest]
#[case::keep_first(DuplicatePolicy::KeepFirst, InsertOutcome::KeptFirst, "first")]
#[case::overwrite(DuplicatePolicy::Overwrite, InsertOutcome::Overwritten, "second")]
#[case::merge(DuplicatePolicy::Merge, InsertOutcome::Merged, "first\nsecond\n")]
fn duplicate_policies_resolve_collisions(
    #[case] policy: DuplicatePolicy,
    #[case] expected_outcome: InsertOutcome,
    #[case] expected_content: &str,
) {
    let mut archive = archive_with(&[("config.yml", "first")]);
    let outcome = archive
        .insert("config.yml".to_owned(), b"second".to_vec(), "b.jar", policy)
        .expect("policy resolves the collision");

    assert_eq!(outcome, expected_outcome);
    assert_eq!(archive.get("config.yml"), Some(expected_content.as_bytes()));
    assert_eq!(archive.len(), 1);
}

#[test]
fn fail_policy_reports_both_origins() {
    let mut archive = archive_with(&[("config.yml", "first")]);
    let err = archive
        .insert(
            "config.yml".to_owned(),
            b"second".to_vec(),
            "b.jar",
            DuplicatePolicy::Fail,
        )
        .expect_err("collision must fail");

    assert!(matches!(
        err,
        PackagingError::DuplicateEntry { ref path, ref first, ref second }
            if path == "config.yml" && first == "input.jar" && second == "b.jar"
    ));
}

#[test]
fn overwrite_keeps_original_position() {
    let mut archive = archive_with(&[("a.txt", "1"), ("b.txt", "2")]);
    archive
        .insert(
            "a.txt".to_owned(),
            b"3".to_vec(),
            "later.jar",
            DuplicatePolicy::Overwrite,
        )
        .expect("overwrite");
    assert_eq!(archive.paths().collect::<Vec<_>>(), ["a.txt", "b.txt"]);
}

#[test]
fn parent_directories_are_listed_outermost_first() {
    assert_eq!(
        parent_directories("org/broken/arrow/A.class").collect::<Vec<_>>(),
        ["org/", "org/broken/", "org/broken/arrow/"]
    );
    assert_eq!(parent_directories("plugin.yml").count(), 0);
}

#[rstest]
fn finalize_synthesizes_directories_and_leads_with_manifest(temp_dir: TempDir) {
    let archive = archive_with(&[
        ("org/broken/arrow/A.class", "a"),
        ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n"),
        ("org/broken/arrow/B.class", "b"),
    ]);
    let destination = utf8(&temp_dir).join("nbt-1.0.jar");

    let finalized = archive.finalize(&destination).expect("finalize succeeds");

    assert_eq!(
        finalized.written,
        [
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "org/",
            "org/broken/",
            "org/broken/arrow/",
            "org/broken/arrow/A.class",
            "org/broken/arrow/B.class",
        ]
    );
    let on_disk: Vec<String> = read_jar(destination.as_std_path())
        .expect("readable jar")
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(on_disk, finalized.written);
}

#[rstest]
fn finalize_is_byte_reproducible(temp_dir: TempDir) {
    let entries = [("a/B.class", "bytes"), ("plugin.yml", "name: nbt")];
    let first = utf8(&temp_dir).join("first.jar");
    let second = utf8(&temp_dir).join("second.jar");

    let one = archive_with(&entries).finalize(&first).expect("first");
    let two = archive_with(&entries).finalize(&second).expect("second");

    assert_eq!(one.sha256, two.sha256);
    assert_eq!(
        fs::read(&first).expect("read first"),
        fs::read(&second).expect("read second")
    );
}

#[rstest]
fn finalize_digest_matches_file(temp_dir: TempDir) {
    let destination = utf8(&temp_dir).join("out.jar");
    let finalized = archive_with(&[("a.txt", "x")])
        .finalize(&destination)
        .expect("finalize");
    assert_eq!(
        compute_sha256(&destination).expect("digest"),
        finalized.sha256
    );
    assert_eq!(finalized.sha256.len(), 64);
}

#[rstest]
fn failed_finalize_leaves_no_files(temp_dir: TempDir) {
    let destination = utf8(&temp_dir).join("missing-dir").join("out.jar");
    let result = archive_with(&[("a.txt", "x")]).finalize(&destination);

    assert!(matches!(result, Err(PackagingError::ArchiveWrite { .. })));
    assert!(!destination.exists());
    assert_eq!(
        fs::read_dir(temp_dir.path()).expect("list").count(),
        0,
        "no temporary files may remain"
    );
}

#[rstest]
fn failed_rename_leaves_no_archive(temp_dir: TempDir) {
    let destination = utf8(&temp_dir).join("out.jar");
    fs::create_dir(&destination).expect("occupy the destination");
    fs::write(destination.join("keep"), b"x").expect("write");

    let result = archive_with(&[("a.txt", "x")]).finalize(&destination);

    assert!(matches!(result, Err(PackagingError::ArchiveWrite { .. })));
    assert!(destination.is_dir());
    assert_eq!(
        fs::read_dir(temp_dir.path()).expect("list").count(),
        1,
        "only the occupying directory may remain"
    );
}

#[test]
fn digest_is_taken_from_the_written_bytes() {
    let bytes = b"archive bytes".as_slice();
    let from_reader = sha256_of(bytes).expect("in-memory digest");
    let dir = TempDir::new().expect("temp dir");
    let path = utf8(&dir).join("copy.bin");
    fs::write(&path, bytes).expect("write");
    assert_eq!(compute_sha256(&path).expect("file digest"), from_reader);
}

#[rstest]
fn compute_sha256_of_known_content(temp_dir: TempDir) {
    let path = utf8(&temp_dir).join("empty.bin");
    fs::write(&path, b"").expect("write");
    assert_eq!(
        compute_sha256(&path).expect("sha256 succeeds"),
        concat!(
            "e3b0c44298fc1c149afbf4c8996fb924",
            "27ae41e4649b934ca495991b7852b855"
        )
    );
}
