//! Integration tests for the bdb CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get a bdb command isolated from the user's environment
fn bdb(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bdb").unwrap();
    cmd.current_dir(tmp.path())
        .env("BDB_SYSTEM_CONFIG", tmp.path().join("system-config.yaml"))
        .env_remove("BDB_ROOT")
        .env_remove("BDB_PATH_DEPTH")
        .env_remove("BDB_LOG");
    cmd
}

/// Canonical root of a test database
fn root(tmp: &TempDir) -> PathBuf {
    tmp.path().canonicalize().unwrap()
}

fn mkdir(base: &Path, rel: &str) -> PathBuf {
    let path = base.join(rel);
    fs::create_dir_all(&path).unwrap();
    path
}

/// Helper to create a test database with a few entities
///
/// Webs/WB0001_first (component -D2_left), Webs/WB0003_third,
/// Slurries/SL0010_mix
fn setup_test_db() -> TempDir {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp).arg("init").assert().success();

    let base = tmp.path();
    mkdir(base, "Webs/WB0001_first/-D2_left");
    mkdir(base, "Webs/WB0003_third");
    mkdir(base, "Slurries/SL0010_mix");
    tmp
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("barely-db"))
        .stdout(predicate::str::contains("entities"))
        .stdout(predicate::str::contains("revisions"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bdb"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp).arg("frobnicate").assert().failure();
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_config() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized database"));

    let config = tmp.path().join(".bdb/config.yaml");
    assert!(config.exists());
    let contents = fs::read_to_string(config).unwrap();
    assert!(contents.contains("path_depth: 1"));
    assert!(contents.contains("barelydb://"));
}

#[test]
fn test_init_with_options() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["init", "--name", "lab", "--depth", "0"])
        .assert()
        .success();

    let contents = fs::read_to_string(tmp.path().join(".bdb/config.yaml")).unwrap();
    assert!(contents.contains("name: lab"));
    assert!(contents.contains("path_depth: 0"));
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_fail_outside_database() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp).arg("entities").assert().failure();
}

// ============================================================================
// Entity Tests
// ============================================================================

#[test]
fn test_entities_lists_all() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["entities", "-f", "tsv"]));

    let ids: Vec<&str> = out.lines().filter_map(|l| l.split('\t').next()).collect();
    assert_eq!(ids, vec!["SL0010", "WB0001", "WB0003"]);
    assert!(out.contains("WB0001\tweb\tfirst\tWebs/WB0001_first"));
}

#[test]
fn test_entities_filter_by_type() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["entities", "--type", "web", "-f", "id"])
        .assert()
        .success()
        .stdout("WB0001\nWB0003\n");
}

#[test]
fn test_entities_unknown_type_fails() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["entities", "--type", "spaceship"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown entity type"));
}

#[test]
fn test_entities_json() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["entities", "-f", "json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 3);
    assert_eq!(parsed[0]["id"], "SL0010");
}

#[test]
fn test_entities_with_root_flag() {
    let tmp = setup_test_db();
    let elsewhere = TempDir::new().unwrap();
    Command::cargo_bin("bdb")
        .unwrap()
        .current_dir(elsewhere.path())
        .env("BDB_SYSTEM_CONFIG", elsewhere.path().join("none.yaml"))
        .env_remove("BDB_ROOT")
        .arg("--root")
        .arg(tmp.path())
        .args(["entities", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB0003"));
}

#[test]
fn test_entities_with_root_env() {
    let tmp = setup_test_db();
    let elsewhere = TempDir::new().unwrap();
    Command::cargo_bin("bdb")
        .unwrap()
        .current_dir(elsewhere.path())
        .env("BDB_SYSTEM_CONFIG", elsewhere.path().join("none.yaml"))
        .env("BDB_ROOT", tmp.path())
        .args(["entities", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SL0010"));
}

#[test]
fn test_entities_from_subdirectory() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .current_dir(tmp.path().join("Webs/WB0003_third"))
        .args(["entities", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB0001"));
}

#[test]
fn test_path_of_entity_and_component() {
    let tmp = setup_test_db();
    let root = root(&tmp);

    let out = stdout_of(bdb(&tmp).args(["path", "wb0001"]));
    assert_eq!(PathBuf::from(out.trim()), root.join("Webs/WB0001_first"));

    let out = stdout_of(bdb(&tmp).args(["path", "WB0001-D2"]));
    assert_eq!(PathBuf::from(out.trim()), root.join("Webs/WB0001_first/-D2_left"));
}

#[test]
fn test_path_unknown_entity_fails() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["path", "WB0999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WB0999"));
}

#[test]
fn test_path_missing_component_fails() {
    let tmp = setup_test_db();
    bdb(&tmp).args(["path", "WB0001-D7"]).assert().failure();
}

#[test]
fn test_components_listed() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["components", "WB0001", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB0001-D2\tD2\t"));
}

#[test]
fn test_free_from_type() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["free", "web"])
        .assert()
        .success()
        .stdout("WB0002\n");
}

#[test]
fn test_free_skips_short_runs() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["free", "WB", "-n", "2"])
        .assert()
        .success()
        .stdout("WB0004\nWB0005\n");
}

#[test]
fn test_new_entity_by_type() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["new", "web", "--comment", "second"]));

    let created = root(&tmp).join("Webs/WB0002_second");
    assert_eq!(PathBuf::from(out.trim()), created);
    assert!(created.is_dir());

    bdb(&tmp)
        .args(["entities", "-f", "id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB0002"));
}

#[test]
fn test_new_existing_entity_returns_its_folder() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["new", "WB0003", "--comment", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB0003_third"))
        .stderr(predicate::str::contains("Already exists"));
    assert!(!tmp.path().join("Webs/WB0003_other").exists());
}

#[test]
fn test_new_type_without_parent_fails() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["new", "cells"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CL"));
}

#[test]
fn test_new_component() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["new-component", "WB0003", "D1", "--comment", "cut"])
        .assert()
        .success();
    assert!(tmp.path().join("Webs/WB0003_third/-D1_cut").is_dir());

    bdb(&tmp)
        .args(["components", "WB0003", "-f", "id"])
        .assert()
        .success()
        .stdout("WB0003-D1\n");
}

#[test]
fn test_open_dry_run() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["open", "SL0010", "--dry-run"]));
    assert_eq!(PathBuf::from(out.trim()), root(&tmp).join("Slurries/SL0010_mix"));
}

// ============================================================================
// Path Alias Tests
// ============================================================================

#[test]
fn test_resolve_uri_alias() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["resolve", "barelydb://Webs/WB0001_first"]));
    assert_eq!(PathBuf::from(out.trim()), root(&tmp).join("Webs/WB0001_first"));
}

#[test]
fn test_resolve_unknown_uri_untouched() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["resolve", "https://example.com/a\\b"])
        .assert()
        .success()
        .stdout("https://example.com/a\\b\n");
}

#[test]
fn test_relative_and_absolute() {
    let tmp = setup_test_db();
    let root = root(&tmp);
    let inside = root.join("Webs/WB0001_first/notes.txt");

    bdb(&tmp)
        .arg("relative")
        .arg(&inside)
        .assert()
        .success()
        .stdout("Webs/WB0001_first/notes.txt\n");

    let out = stdout_of(bdb(&tmp).args(["absolute", "Webs/./WB0003_third"]));
    assert_eq!(PathBuf::from(out.trim()), root.join("Webs/WB0003_third"));
}

#[test]
fn test_relative_outside_root_fails() {
    let tmp = setup_test_db();
    let outside = TempDir::new().unwrap();
    bdb(&tmp)
        .arg("relative")
        .arg(outside.path())
        .assert()
        .failure();

    bdb(&tmp).args(["absolute", "../escape"]).assert().failure();
}

// ============================================================================
// Parse Tests
// ============================================================================

#[test]
fn test_parse_unique() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["parse", "XasfwX_sl293_sl293__Y"])
        .assert()
        .success()
        .stdout("SL0293\n");
}

#[test]
fn test_parse_all_unique() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["parse", "WB0001 and wb02-d2 and WB0001", "--mode", "all_unique", "--unknown", "ignore"])
        .assert()
        .success()
        .stdout("WB0001\nWB0002-D2\n");
}

#[test]
fn test_parse_ambiguous_fails() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["parse", "XasfwX_sl293_sl333__Y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No identifier found"));
}

#[test]
fn test_parse_without_identifier_fails() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp).args(["parse", "nothing here"]).assert().failure();
}

#[test]
fn test_parse_invalid_mode_fails() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["parse", "WB0001", "--mode", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown parse mode"));
}

// ============================================================================
// File Tests
// ============================================================================

#[test]
fn test_files_across_database() {
    let tmp = setup_test_db();
    fs::write(tmp.path().join("Webs/WB0001_first/WB0001_recipe.yaml"), "a: 1\n").unwrap();
    fs::write(tmp.path().join("Webs/WB0001_first/-D2_left/cut.yaml"), "b: 2\n").unwrap();
    fs::write(tmp.path().join("Slurries/SL0010_mix/notes.txt"), "x").unwrap();

    let out = stdout_of(bdb(&tmp).args(["files", "*.yaml", "-f", "tsv"]));
    assert!(out.contains("WB0001\tWebs/WB0001_first/WB0001_recipe.yaml"));
    assert!(out.contains("WB0001-D2\tWebs/WB0001_first/-D2_left/cut.yaml"));
    assert!(!out.contains("notes.txt"));
}

#[test]
fn test_files_of_one_entity() {
    let tmp = setup_test_db();
    fs::write(tmp.path().join("Slurries/SL0010_mix/notes.txt"), "x").unwrap();
    fs::write(tmp.path().join("Webs/WB0003_third/other.txt"), "y").unwrap();

    let out = stdout_of(bdb(&tmp).args(["files", "--entity", "SL0010", "-f", "tsv"]));
    assert!(out.contains("notes.txt"));
    assert!(!out.contains("other.txt"));
}

#[test]
fn test_revisions_listed_newest_first() {
    let tmp = setup_test_db();
    let dir = tmp.path().join("Webs/WB0001_first");
    fs::write(dir.join("data.yaml"), "v: 3\n").unwrap();
    fs::write(dir.join("data.yaml.1"), "v: 2\n").unwrap();
    fs::write(dir.join("data.yaml.2"), "v: 1\n").unwrap();

    let out = stdout_of(bdb(&tmp).args(["revisions", "barelydb://Webs/WB0001_first/data.yaml", "-f", "tsv"]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("0\tdata.yaml\t5\t"));
    assert!(lines[2].starts_with("2\tdata.yaml.2\t"));
}

#[test]
fn test_revisions_missing_file_fails() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["revisions", "Webs/WB0001_first/missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

// ============================================================================
// Property Tests
// ============================================================================

#[test]
fn test_props_query_and_list() {
    let tmp = setup_test_db();
    let dir = tmp.path().join("Webs/WB0001_first");
    fs::write(
        dir.join("coating.property.json"),
        r#"{"buid": "WB0001", "source": "coater", "thickness": 42, "operator": "kim"}"#,
    )
    .unwrap();

    bdb(&tmp)
        .args(["props", "WB0001", "thickness"])
        .assert()
        .success()
        .stdout("42\n");

    bdb(&tmp)
        .args(["props", "WB0001", "operator"])
        .assert()
        .success()
        .stdout("kim\n");

    bdb(&tmp)
        .args(["props", "WB0001", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coating.property.json\tcoater\tWB0001"));
}

#[test]
fn test_props_ambiguous_needs_preference() {
    let tmp = setup_test_db();
    let dir = tmp.path().join("Webs/WB0001_first");
    fs::write(dir.join("a.property.json"), r#"{"source": "a", "width": 10}"#).unwrap();
    fs::write(dir.join("b.property.json"), r#"{"source": "b", "width": 12}"#).unwrap();

    bdb(&tmp).args(["props", "WB0001", "width"]).assert().failure();

    bdb(&tmp)
        .args(["props", "WB0001", "width", "--prefer", "b.property.json"])
        .assert()
        .success()
        .stdout("12\n");
}

#[test]
fn test_props_missing_name_fails() {
    let tmp = setup_test_db();
    bdb(&tmp).args(["props", "WB0003", "width"]).assert().failure();
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_types() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["config", "types", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WB\tweb"))
        .stdout(predicate::str::contains("SL\tslurry"));
}

#[test]
fn test_config_show_json() {
    let tmp = setup_test_db();
    let out = stdout_of(bdb(&tmp).args(["config", "show", "-f", "json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["path_depth"], 1);
}

#[test]
fn test_config_path() {
    let tmp = setup_test_db();
    bdb(&tmp)
        .args(["config", "path", "-f", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("database\t"))
        .stdout(predicate::str::contains("system\t"));
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    bdb(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bdb"));
}
