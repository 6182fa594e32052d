// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, body).expect("write");
}

fn coursecheck() -> Command {
    Command::cargo_bin("coursecheck").expect("bin")
}

#[test]
fn list_passes_prints_catalog() {
    coursecheck()
        .arg("--list-passes")
        .assert()
        .success()
        .stdout(predicate::str::contains("references"))
        .stdout(predicate::str::contains("live-urls"))
        .stdout(predicate::str::contains("opt-in"));
}

#[test]
fn clean_corpus_exits_zero() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "book/01_intro.md", "# Chapter 1: Intro\n\nHello.\n");
    coursecheck()
        .arg(tmp.path())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("summary: errors=0 warnings=0 infos=1"));
}

#[test]
fn missing_asset_link_exits_one() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "book/01_intro.md", "# Chapter 1: Intro\n\nSee [x](missing.json).\n");
    coursecheck()
        .arg(tmp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("errors (1):"))
        .stdout(predicate::str::contains("MissingReference book/01_intro.md (cell 0, line 3)"))
        .stdout(predicate::str::contains("missing.json"));
}

#[test]
fn json_format_is_machine_readable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "book/01_intro.md", "# Chapter 1: Intro\n\nSee [x](missing.json).\n");
    let output = coursecheck()
        .arg(tmp.path())
        .args(["--format", "json"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["summary"]["errors"], 1);
    assert_eq!(json["findings"][0]["rule"], "MissingReference");
    assert_eq!(json["fingerprint"].as_str().map(str::len), Some(64));
}

#[test]
fn only_restricts_passes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "book/01_intro.md", "# Wrong title\n\nSee [x](missing.json).\n");
    coursecheck()
        .arg(tmp.path())
        .args(["--only", "naming"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("TitleMismatch"))
        .stdout(predicate::str::contains("MissingReference").not());
}

#[test]
fn missing_root_exits_two() {
    let tmp = tempfile::tempdir().expect("tempdir");
    coursecheck()
        .arg(tmp.path().join("absent"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn invalid_config_and_unknown_pass_exit_two() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(tmp.path(), "book/01_intro.md", "# Chapter 1: Intro\n");
    write(tmp.path(), "coursecheck.toml", "live_url_workers = 0\n");
    coursecheck()
        .arg(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("live_url_workers"));

    coursecheck()
        .arg(tmp.path())
        .args(["--only", "spelling"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown pass id"));
}
