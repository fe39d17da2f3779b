//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/endpoint orchestration.
//!
//! # Invariants
//! - Repository writes validate records and resolve every reference before
//!   SQL mutations.
//! - Repository APIs return semantic errors (`NotFound`, `Reference`,
//!   `Validation`) in addition to DB transport errors.
//! - Invariant violations are reported, never auto-corrected.

pub mod entity_repo;
pub mod filter;
pub mod user_repo;

use crate::db::DbError;
use crate::model::{EntityId, EntityKind, UnknownEntityType, UserId, ValidationError};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Foreign key, link target or issue target does not resolve.
    Reference {
        field: &'static str,
        kind: EntityKind,
        id: EntityId,
    },
    /// Principal reference does not resolve.
    MissingPrincipal { field: &'static str, id: UserId },
    /// Persisted reference names a type outside the registry.
    UnregisteredType(String),
    /// Unknown id of a known type.
    NotFound { kind: EntityKind, id: EntityId },
    /// Type name not present in the registry.
    UnknownType(String),
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    /// Whether this error belongs to the reference (dangling/unresolved) class.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::Reference { .. } | Self::MissingPrincipal { .. } | Self::UnregisteredType(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Reference { field, kind, id } => {
                write!(f, "`{field}` references missing {kind} {id}")
            }
            Self::MissingPrincipal { field, id } => {
                write!(f, "`{field}` references missing user {id}")
            }
            Self::UnregisteredType(name) => write!(f, "reference to unregistered type `{name}`"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::UnknownType(name) => write!(f, "unknown entity type `{name}`"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::FromSqlConversionFailure(_, _, source) = &value {
            if let Some(unknown) = source.downcast_ref::<UnknownEntityType>() {
                return Self::UnregisteredType(unknown.0.clone());
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Default listing order: `name` ascending, then `last_updated` descending.
///
/// Row id breaks remaining ties so pagination is stable.
pub fn listing_order(
    left: (&str, NaiveDate, EntityId),
    right: (&str, NaiveDate, EntityId),
) -> Ordering {
    left.0
        .cmp(right.0)
        .then_with(|| right.1.cmp(&left.1))
        .then_with(|| left.2.cmp(&right.2))
}
