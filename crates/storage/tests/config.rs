#![forbid(unsafe_code)]

mod common;

use common::{init_tracing, open_store_with};
use fl_storage::{SqliteStore, StoreConfig, StoreError};
use rusqlite::{Connection, params};
use std::collections::BTreeMap;

#[test]
fn defaults_match_documented_values() {
    let config = StoreConfig::default();
    assert_eq!(config.db_file_name, "forklore.db");
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(config.max_branch_depth, 128);
    assert_eq!(config.default_vote_threshold, 1_000);
}

#[test]
fn toml_fills_missing_keys_from_defaults() {
    let config = StoreConfig::from_toml_str(
        r#"
        db_file_name = "stories.sqlite"
        max_branch_depth = 16
        "#,
    )
    .expect("parse config");
    assert_eq!(config.db_file_name, "stories.sqlite");
    assert_eq!(config.max_branch_depth, 16);
    assert_eq!(config.busy_timeout_ms, 5_000);

    let err = StoreConfig::from_toml_str("unknown_key = 1").expect_err("unknown key");
    assert_eq!(err.code(), "CONFIG");

    let err = StoreConfig::from_toml_str("max_branch_depth = 0").expect_err("zero depth");
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn overrides_take_precedence_and_are_validated() {
    let env = BTreeMap::from([
        ("FORKLORE_DB_FILE", "override.db"),
        ("FORKLORE_BUSY_TIMEOUT_MS", " 250 "),
        ("FORKLORE_MAX_BRANCH_DEPTH", "4"),
    ]);
    let mut config = StoreConfig::default();
    config
        .apply_overrides(|key| env.get(key).map(|value| value.to_string()))
        .expect("apply overrides");
    assert_eq!(config.db_file_name, "override.db");
    assert_eq!(config.busy_timeout_ms, 250);
    assert_eq!(config.max_branch_depth, 4);

    let err = StoreConfig::default()
        .apply_overrides(|key| (key == "FORKLORE_MAX_BRANCH_DEPTH").then(|| "deep".to_string()))
        .expect_err("not a number");
    assert_eq!(err.code(), "CONFIG");
}

#[test]
fn load_reads_the_file_when_present() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("forklore.toml");
    std::fs::write(&path, "default_vote_threshold = 25\n").expect("write config");

    let config = StoreConfig::load(&path).expect("load config");
    assert_eq!(config.default_vote_threshold, 25);

    let missing = StoreConfig::load(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(missing.default_vote_threshold, 1_000);
}

#[test]
fn open_with_config_uses_the_configured_file_name() {
    let config = StoreConfig {
        db_file_name: "custom.db".to_string(),
        ..StoreConfig::default()
    };
    let (dir, store) = open_store_with(config);
    assert!(dir.path().join("custom.db").exists());
    assert_eq!(store.config().db_file_name, "custom.db");
    assert_eq!(store.storage_dir(), dir.path());
}

#[test]
fn reopening_an_existing_store_is_fine() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    drop(SqliteStore::open(dir.path()).expect("first open"));
    SqliteStore::open(dir.path()).expect("second open");
}

#[test]
fn foreign_schema_is_rejected_fail_closed() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = Connection::open(dir.path().join("forklore.db")).expect("raw db");
    conn.execute("CREATE TABLE novels(id INTEGER PRIMARY KEY)", [])
        .expect("foreign table");
    drop(conn);

    let err = SqliteStore::open(dir.path()).expect_err("foreign schema");
    assert_eq!(err.code(), "RESET_REQUIRED");
}

#[test]
fn unknown_schema_version_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().expect("temp dir");
    drop(SqliteStore::open(dir.path()).expect("fresh store"));

    let conn = Connection::open(dir.path().join("forklore.db")).expect("raw db");
    conn.execute(
        "UPDATE store_state SET schema_version=?1 WHERE singleton=1",
        params![99],
    )
    .expect("bump schema version");
    drop(conn);

    let err = SqliteStore::open(dir.path()).expect_err("unknown schema version");
    assert!(matches!(err, StoreError::ResetRequired(_)));
    assert_eq!(err.code(), "RESET_REQUIRED");
}
