//! Config lookup, error-message and init integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use scribe_core::{config, ConfigError, ProjectLayout};
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = ProjectLayout::new(root.path());
    root.child(".scribe/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(&layout, None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(
        err.to_string().contains("config.yaml"),
        "must contain file path, got: {err}"
    );
}

#[test]
fn wrong_type_yaml_returns_parse_error() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = ProjectLayout::new(root.path());
    root.child(".scribe/config.yaml")
        .write_str("debounce_ms: soon\n")
        .expect("write");

    let err = config::load_at(&layout, None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn invalid_values_are_reported_on_load() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = ProjectLayout::new(root.path());
    root.child(".scribe/config.yaml")
        .write_str("artifact_dir: /abs/mirror\n")
        .expect("write");

    let err = config::load_at(&layout, None).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Lookup order
// ---------------------------------------------------------------------------

#[test]
fn user_config_applies_when_project_has_none() {
    let root = assert_fs::TempDir::new().expect("root");
    let config_home = assert_fs::TempDir::new().expect("config home");
    config_home
        .child("scribe/config.yaml")
        .write_str("sweep_interval_secs: 60\n")
        .expect("write user config");

    let layout = ProjectLayout::new(root.path());
    let loaded = config::load_at(&layout, Some(config_home.path())).expect("load");
    assert_eq!(loaded.sweep_interval_secs, 60);
}

#[test]
fn project_config_wins_over_user_config() {
    let root = assert_fs::TempDir::new().expect("root");
    let config_home = assert_fs::TempDir::new().expect("config home");
    config_home
        .child("scribe/config.yaml")
        .write_str("sweep_interval_secs: 60\n")
        .expect("write user config");
    root.child(".scribe/config.yaml")
        .write_str("sweep_interval_secs: 900\n")
        .expect("write project config");

    let layout = ProjectLayout::new(root.path());
    let loaded = config::load_at(&layout, Some(config_home.path())).expect("load");
    assert_eq!(loaded.sweep_interval_secs, 900);
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_scribe_tree_and_config() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = ProjectLayout::new(root.path());

    let created = config::init_at(&layout).expect("init");

    root.child(".scribe/config.yaml")
        .assert(predicate::path::exists());
    root.child(".scribe/state").assert(predicate::path::is_dir());
    root.child(".scribe/logs").assert(predicate::path::is_dir());
    root.child(".scribe/config.yaml")
        .assert(predicate::str::contains("skip_if_unchanged: true"));
    assert_eq!(created, config::Config::default());
}

#[test]
fn init_is_idempotent_and_keeps_edits() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let layout = ProjectLayout::new(root.path());
    config::init_at(&layout).expect("first init");

    let path = layout.config_path();
    let edited = fs::read_to_string(&path)
        .expect("read")
        .replace("debounce_ms: 500", "debounce_ms: 750");
    fs::write(&path, edited).expect("edit");

    let again = config::init_at(&layout).expect("second init");
    assert_eq!(again.debounce_ms, 750);
}
