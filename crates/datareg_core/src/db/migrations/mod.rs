//! Ordered schema steps for the catalog database.
//!
//! # Responsibility
//! - List every schema step with a stable version and a short label.
//! - Bring a connection up to the newest step inside one transaction.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - `PRAGMA user_version` always names the last applied step.
//! - Step 2 owns the triggers that drop issues of a deleted row, including
//!   rows removed by foreign-key cascades.

use crate::db::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "catalog_tables",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        label: "issue_cascade_triggers",
        sql: include_str!("0002_issue_cascade.sql"),
    },
];

/// Newest schema version this build can produce.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|step| step.version).max().unwrap_or(0)
}

/// Version recorded in the database header.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Runs every step newer than the recorded version.
///
/// Returns the number of steps applied. A database written by a newer build
/// is refused untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = schema_version(conn)?;
    let target = latest_version();
    if from > target {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: target,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > from).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| {
                error!(
                    "event=db_migrate_step module=db status=error version={} label={} error={source}",
                    step.version, step.label
                );
                DbError::Migration {
                    version: step.version,
                    label: step.label,
                    source,
                }
            })?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} label={}",
            step.version, step.label
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={from} to_version={target} steps={}",
        pending.len()
    );
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, STEPS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn failing_step_names_the_step_and_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Step 1 keeps this table and then fails indexing its missing columns.
        conn.execute_batch("CREATE TABLE issues (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        match err {
            DbError::Migration { version, label, .. } => {
                assert_eq!(version, 1);
                assert_eq!(label, "catalog_tables");
            }
            other => panic!("unexpected error: {other}"),
        }
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
        let users: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'users';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(users, 0);
    }

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.label);
        }
        assert_eq!(latest_version() as usize, STEPS.len());
    }
}
