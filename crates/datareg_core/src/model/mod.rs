//! Catalog domain model.
//!
//! # Responsibility
//! - Define the closed set of catalog entity kinds and their record shapes.
//! - Describe each kind's storage columns, relations and naming rule
//!   declaratively, so registry/repository/endpoint code stays generic.
//!
//! # Invariants
//! - Every concrete record type implements [`Entity`]; object types also
//!   implement [`DataObject`], version types implement
//!   [`version::VersionedObject`].
//! - `updated_by` and `last_updated` live only on [`Stored`] and are stamped
//!   by the write path; record types cannot carry them.
//! - A record's `name` is either a stored column or derived from related
//!   records, never both.
//!
//! # See also
//! - crate::registry

pub mod issue;
pub mod object;
pub mod reference;
pub mod user;
pub mod version;

use crate::repo::RepoResult;
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row identifier of every catalog record.
pub type EntityId = i64;

/// Row identifier of a user principal.
pub type UserId = i64;

/// Closed set of concrete catalog entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Accessibility,
    DataProduct,
    DataProductDataType,
    DataProductType,
    DataProductVersion,
    DataProductVersionComponent,
    DataStore,
    Issue,
    Model,
    ModelRun,
    ModelVersion,
    ProcessingScript,
    ProcessingScriptVersion,
    Source,
    SourceType,
    SourceVersion,
    StorageRoot,
    StorageType,
}

impl EntityKind {
    pub const ALL: [EntityKind; 18] = [
        Self::Accessibility,
        Self::DataProduct,
        Self::DataProductDataType,
        Self::DataProductType,
        Self::DataProductVersion,
        Self::DataProductVersionComponent,
        Self::DataStore,
        Self::Issue,
        Self::Model,
        Self::ModelRun,
        Self::ModelVersion,
        Self::ProcessingScript,
        Self::ProcessingScriptVersion,
        Self::Source,
        Self::SourceType,
        Self::SourceVersion,
        Self::StorageRoot,
        Self::StorageType,
    ];

    /// Stable type name used in registry keys and issue targets.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Accessibility => "Accessibility",
            Self::DataProduct => "DataProduct",
            Self::DataProductDataType => "DataProductDataType",
            Self::DataProductType => "DataProductType",
            Self::DataProductVersion => "DataProductVersion",
            Self::DataProductVersionComponent => "DataProductVersionComponent",
            Self::DataStore => "DataStore",
            Self::Issue => "Issue",
            Self::Model => "Model",
            Self::ModelRun => "ModelRun",
            Self::ModelVersion => "ModelVersion",
            Self::ProcessingScript => "ProcessingScript",
            Self::ProcessingScriptVersion => "ProcessingScriptVersion",
            Self::Source => "Source",
            Self::SourceType => "SourceType",
            Self::SourceVersion => "SourceVersion",
            Self::StorageRoot => "StorageRoot",
            Self::StorageType => "StorageType",
        }
    }

    /// Storage table backing this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibilities",
            Self::DataProduct => "data_products",
            Self::DataProductDataType => "data_product_data_types",
            Self::DataProductType => "data_product_types",
            Self::DataProductVersion => "data_product_versions",
            Self::DataProductVersionComponent => "data_product_version_components",
            Self::DataStore => "data_stores",
            Self::Issue => "issues",
            Self::Model => "models",
            Self::ModelRun => "model_runs",
            Self::ModelVersion => "model_versions",
            Self::ProcessingScript => "processing_scripts",
            Self::ProcessingScriptVersion => "processing_script_versions",
            Self::Source => "sources",
            Self::SourceType => "source_types",
            Self::SourceVersion => "source_versions",
            Self::StorageRoot => "storage_roots",
            Self::StorageType => "storage_types",
        }
    }

    /// Parses an exact type name. Matching is case-sensitive.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == value)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Raised when persisted data names a type outside the closed kind set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntityType(pub String);

impl Display for UnknownEntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown entity type `{}`", self.0)
    }
}

impl Error for UnknownEntityType {}

impl FromSql for EntityKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| FromSqlError::Other(Box::new(UnknownEntityType(text.to_string()))))
    }
}

/// Storage shape of one declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Date,
    /// Reference to another catalog record.
    ForeignKey(EntityKind),
    /// Reference to a user principal.
    Principal,
}

/// One declared column of an entity table (excluding id/attribution columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    pub max_len: Option<usize>,
}

impl Column {
    pub const fn text(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            required: true,
            max_len: Some(max_len),
        }
    }

    pub const fn optional_text(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            required: false,
            max_len: Some(max_len),
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Integer,
            required: true,
            max_len: None,
        }
    }

    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Date,
            required: true,
            max_len: None,
        }
    }

    pub const fn foreign_key(name: &'static str, target: EntityKind) -> Self {
        Self {
            name,
            kind: ColumnKind::ForeignKey(target),
            required: true,
            max_len: None,
        }
    }

    pub const fn optional_foreign_key(name: &'static str, target: EntityKind) -> Self {
        Self {
            name,
            kind: ColumnKind::ForeignKey(target),
            required: false,
            max_len: None,
        }
    }

    pub const fn principal(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Principal,
            required: true,
            max_len: None,
        }
    }
}

/// Many-to-many relation stored in a link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub field: &'static str,
    pub target: EntityKind,
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
}

/// How an extra-display relation is found from the displayed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationVia {
    /// Rows of `source` whose `column` points at the displayed record.
    Reverse { column: &'static str },
    /// Owners of a link table row whose target is the displayed record.
    ReverseLink(&'static Link),
}

/// Relation eagerly expanded in list/detail payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub source: EntityKind,
    pub via: RelationVia,
}

/// Where a record's `name` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// Stored `name` column, unique across the table.
    Stored,
    /// Computed on every read from related records.
    Derived,
}

/// Reference held outside the declared columns (e.g. an issue target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: EntityId,
}

/// Resolves display names of arbitrary catalog records.
pub trait NameResolver {
    fn resolve_name(&self, kind: EntityKind, id: EntityId) -> RepoResult<String>;
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is missing or blank.
    Required(&'static str),
    /// Text field exceeds its declared length.
    TooLong { field: &'static str, max_len: usize },
    /// Storage rejected a duplicate of a unique field group.
    Duplicate { fields: Vec<&'static str> },
    /// Supersession chain would loop back to the record itself.
    SupersessionCycle { kind: EntityKind, id: EntityId },
    /// Malformed input value (filters, pagination, identifiers).
    Invalid { field: String, message: String },
}

impl ValidationError {
    /// Names of the offending fields.
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::Required(field) | Self::TooLong { field, .. } => vec![(*field).to_string()],
            Self::Duplicate { fields } => fields.iter().map(|field| (*field).to_string()).collect(),
            Self::SupersessionCycle { .. } => vec!["supersedes".to_string()],
            Self::Invalid { field, .. } => vec![field.clone()],
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "`{field}` is required"),
            Self::TooLong { field, max_len } => {
                write!(f, "`{field}` must be at most {max_len} characters")
            }
            Self::Duplicate { fields } => {
                write!(f, "a record with the same {} already exists", fields.join(", "))
            }
            Self::SupersessionCycle { kind, id } => {
                write!(f, "{kind} {id} cannot supersede itself through its own history")
            }
            Self::Invalid { field, message } => write!(f, "`{field}`: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Contract shared by every concrete catalog record.
///
/// The associated constants form the declarative descriptor consumed by the
/// registry, repository and endpoint factory.
pub trait Entity: Serialize + Clone + Sized + Send + Sync + 'static {
    const KIND: EntityKind;
    /// One-line description shown on the browse index.
    const DOC: &'static str;
    const NAMING: Naming = Naming::Stored;
    /// Columns in the order produced by [`Entity::values`].
    const COLUMNS: &'static [Column];
    const LINKS: &'static [Link] = &[];
    /// Fields accepted as list filters.
    const FILTERS: &'static [&'static str];
    const EXTRA_DISPLAY: &'static [Relation] = &[];
    /// Field group whose uniqueness storage enforces.
    const UNIQUE: &'static [&'static str] = &["name"];

    /// Column values aligned with [`Entity::COLUMNS`].
    fn values(&self) -> Vec<Value>;

    /// Builds the record from one table row. Link fields start empty.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Display name, stored or derived.
    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String>;

    /// Link targets aligned with [`Entity::LINKS`].
    fn link_ids(&self) -> Vec<Vec<EntityId>> {
        Vec::new()
    }

    fn set_link_ids(&mut self, _field: &str, _ids: Vec<EntityId>) {}

    /// Predecessor in the supersession chain, for kinds that have one.
    fn supersedes(&self) -> Option<EntityId> {
        None
    }

    /// References not expressed as declared foreign-key columns.
    fn extra_references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Checks required fields and declared lengths.
    fn validate(&self) -> Result<(), ValidationError> {
        validate_columns(Self::COLUMNS, &self.values())
    }
}

/// Catalog record that carries a responsible person and accepts issues.
pub trait DataObject: Entity {
    fn responsible_person(&self) -> UserId;
}

/// Persisted record with write-path attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stored<T> {
    pub id: EntityId,
    pub updated_by: UserId,
    pub last_updated: NaiveDate,
    #[serde(flatten)]
    pub record: T,
}

/// Validates values against declared columns.
pub fn validate_columns(columns: &[Column], values: &[Value]) -> Result<(), ValidationError> {
    for (column, value) in columns.iter().zip(values) {
        match value {
            Value::Null if column.required => return Err(ValidationError::Required(column.name)),
            Value::Text(text) => {
                if column.required && text.trim().is_empty() {
                    return Err(ValidationError::Required(column.name));
                }
                if let Some(max_len) = column.max_len {
                    if text.chars().count() > max_len {
                        return Err(ValidationError::TooLong {
                            field: column.name,
                            max_len,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn text_value(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn optional_text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text_value)
}

pub(crate) fn id_value(value: EntityId) -> Value {
    Value::Integer(value)
}

pub(crate) fn optional_id_value(value: Option<EntityId>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(crate) fn date_value(value: NaiveDate) -> Value {
    Value::Text(value.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::{validate_columns, Column, EntityKind, ValidationError};
    use rusqlite::types::Value;

    #[test]
    fn parses_every_type_name_back_to_its_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::parse(kind.type_name()), Some(kind));
        }
        assert_eq!(EntityKind::parse("sourceversion"), None);
    }

    #[test]
    fn validate_columns_reports_missing_and_blank_required_fields() {
        let columns = [Column::text("name", 10), Column::optional_text("description", 10)];

        let missing = validate_columns(&columns, &[Value::Null, Value::Null]);
        assert_eq!(missing, Err(ValidationError::Required("name")));

        let blank = validate_columns(&columns, &[Value::Text("  ".into()), Value::Null]);
        assert_eq!(blank, Err(ValidationError::Required("name")));

        let ok = validate_columns(&columns, &[Value::Text("x".into()), Value::Null]);
        assert_eq!(ok, Ok(()));
    }

    #[test]
    fn validate_columns_enforces_max_length() {
        let columns = [Column::text("name", 3)];
        let err = validate_columns(&columns, &[Value::Text("abcd".into())]).unwrap_err();
        assert_eq!(err.fields(), vec!["name".to_string()]);
        assert!(matches!(err, ValidationError::TooLong { max_len: 3, .. }));
    }
}
