//! Command-line tests for th-import

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const DUMP: &str = "\
INSERT INTO `members` VALUES \
(5,'Ann','Woman','1990-01-01','ann@x.com','pw',NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,'Yes','2019-01-01',NULL,5,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL),\
(6,'Bo','Man','1991-01-01','bo@x.com','pw',NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,'no','2019-01-01',NULL,6,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL,NULL),\
(7,'Br'oken');
INSERT INTO `likes` VALUES (1,5,6,'2024-01-01 00:00:00'),(2,5,999,NULL);
";

fn dump_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(DUMP.as_bytes()).unwrap();
    file
}

fn th_import() -> Command {
    let mut cmd = Command::cargo_bin("th-import").unwrap();
    cmd.env_remove("LOG_LEVEL").env_remove("LOG_OUTPUT");
    cmd
}

#[test]
fn test_help() {
    th_import()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_inspect_prints_counts() {
    let file = dump_file();

    th_import()
        .arg("inspect")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "members (members): 1 statements, 3 tuples, 1 malformed",
        ))
        .stdout(predicate::str::contains("likes (likes): 1 statements, 2 tuples, 0 malformed"))
        .stdout(predicate::str::contains("images (img_links): 0 statements"));
}

#[test]
fn test_dry_run_json_tally() {
    let file = dump_file();

    let output = th_import()
        .args(["import", "--dry-run", "--json"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let tally: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        tally,
        serde_json::json!({
            "members": {"imported": 2, "skipped": 1},
            "images": {"imported": 0, "skipped": 0},
            "likes": {"imported": 1, "skipped": 1},
            "messages": {"imported": 0, "skipped": 0}
        })
    );
}

#[test]
fn test_missing_dump_fails() {
    th_import()
        .args(["import", "--dry-run", "/nonexistent/dump.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read dump"));
}

#[test]
fn test_invalid_primary_image_policy() {
    let file = dump_file();

    th_import()
        .args(["import", "--dry-run", "--primary-image", "random"])
        .arg(file.path())
        .assert()
        .failure();
}
