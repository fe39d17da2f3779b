//! Catalog storage: connection setup and schema versioning.
//!
//! # Responsibility
//! - Hand out SQLite connections that are ready for catalog reads/writes.
//! - Keep the on-disk schema in step with this build.
//!
//! # Invariants
//! - Every returned connection enforces foreign keys and is fully migrated.
//! - A database stamped by a newer build is refused, never downgraded.
//!
//! # See also
//! - crate::repo::entity_repo

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_from_config};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap failure.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A schema step failed; nothing from the batch was committed.
    Migration {
        version: u32,
        label: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a build with more schema steps than this one.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Migration {
                version,
                label,
                source,
            } => write!(f, "schema step v{version} ({label}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema v{db_version} is newer than this build (up to v{latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
