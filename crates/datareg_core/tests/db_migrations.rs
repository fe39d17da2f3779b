use datareg_core::db::migrations::{apply_migrations, latest_version, schema_version};
use datareg_core::db::{open_db, open_db_in_memory, open_from_config, DbError};
use datareg_core::CatalogConfig;
use rusqlite::Connection;

const CATALOG_TABLES: &[&str] = &[
    "users",
    "auth_tokens",
    "sources",
    "source_versions",
    "data_product_versions",
    "data_product_version_source_versions",
    "model_runs",
    "model_run_inputs",
    "model_run_outputs",
    "issues",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in CATALOG_TABLES {
        assert_table_exists(&conn, table);
    }
    assert_trigger_exists(&conn, "trg_sources_delete_issues");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn migrated_connection_has_nothing_pending() {
    let mut conn = open_db_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("datareg.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "issues");
}

#[test]
fn open_from_config_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = CatalogConfig {
        db_path: dir.path().join("configured.db"),
        ..CatalogConfig::default()
    };

    let conn = open_from_config(&config).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert!(config.db_path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(
        schema_object_exists(conn, "table", table_name),
        "table {table_name} does not exist"
    );
}

fn assert_trigger_exists(conn: &Connection, trigger_name: &str) {
    assert!(
        schema_object_exists(conn, "trigger", trigger_name),
        "trigger {trigger_name} does not exist"
    );
}

fn schema_object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = ?1 AND name = ?2
        );",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}
