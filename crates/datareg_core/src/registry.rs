//! Process-wide entity registry.
//!
//! # Responsibility
//! - Index every concrete catalog type by type name, built once from a
//!   static registration table.
//! - Expose the declarative descriptor of each type and type-erased record
//!   access for the endpoint factory and annotation code.
//!
//! # Invariants
//! - Built once on first use and immutable afterwards; readers need no
//!   synchronization.
//! - Type names are unique; iteration is alphabetical by type name.
//! - Every `EntityKind` has exactly one registered entry.

use crate::model::issue::Issue;
use crate::model::object::{
    DataProduct, DataProductVersionComponent, DataStore, Model, ModelRun, ProcessingScript, Source,
};
use crate::model::reference::{
    Accessibility, DataProductDataType, DataProductType, SourceType, StorageRoot, StorageType,
};
use crate::model::version::{
    DataProductVersion, ModelVersion, ProcessingScriptVersion, SourceVersion,
};
use crate::model::{
    Column, DataObject, Entity, EntityId, EntityKind, Link, Naming, Relation, Stored, UserId,
};
use crate::repo::entity_repo::{EntityRepository, SqliteEntityRepository};
use crate::repo::filter::FilterSet;
use crate::repo::{listing_order, RepoError, RepoResult};
use chrono::NaiveDate;
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

static LOWER_UPPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid camel case regex"));
static ACRONYM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z])([A-Z][a-z])").expect("valid acronym regex"));

/// `"DataProductVersion"` -> `"data product version"`.
pub fn camel_case_to_spaces(value: &str) -> String {
    let spaced = LOWER_UPPER_RE.replace_all(value, "$1 $2");
    let spaced = ACRONYM_RE.replace_all(&spaced, "$1 $2");
    spaced.trim().to_lowercase()
}

/// URL segment for a type's list: lower-cased type name plus `s`.
pub fn list_name_of(type_name: &str) -> String {
    format!("{}s", type_name.to_lowercase())
}

/// Declarative description of one registered type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub type_name: &'static str,
    pub table: &'static str,
    pub doc: &'static str,
    /// Data object types carry a responsible person and accept issues.
    pub is_object: bool,
    pub naming: Naming,
    pub columns: &'static [Column],
    pub links: &'static [Link],
    pub filters: &'static [&'static str],
    pub extra_display: &'static [Relation],
    pub unique: &'static [&'static str],
}

impl EntityDescriptor {
    fn of<T: Entity>(is_object: bool) -> Self {
        Self {
            kind: T::KIND,
            type_name: T::KIND.type_name(),
            table: T::KIND.table(),
            doc: T::DOC,
            is_object,
            naming: T::NAMING,
            columns: T::COLUMNS,
            links: T::LINKS,
            filters: T::FILTERS,
            extra_display: T::EXTRA_DISPLAY,
            unique: T::UNIQUE,
        }
    }

    pub fn list_name(&self) -> String {
        list_name_of(self.type_name)
    }

    pub fn display_name(&self) -> String {
        camel_case_to_spaces(self.type_name)
    }

    pub fn plural_display_name(&self) -> String {
        format!("{}s", self.display_name())
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Whether records of this type form a supersession chain.
    pub fn is_supersedable(&self) -> bool {
        self.column("supersedes").is_some()
    }
}

/// Type-erased view of one persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub kind: EntityKind,
    pub id: EntityId,
    pub name: String,
    pub updated_by: UserId,
    pub last_updated: NaiveDate,
    /// Declared fields (and link fields) as serialized by the record type.
    pub fields: Map<String, JsonValue>,
    /// Extra-display relations, in declaration order.
    pub related: Vec<(&'static Relation, Vec<EntityId>)>,
    /// Out-of-column references such as an issue target; all resolve.
    pub references: Vec<(&'static str, EntityKind, EntityId)>,
    /// Successors, for supersedable types.
    pub superseded_by: Option<Vec<EntityId>>,
}

/// Record access for one registered type, without naming the type.
pub trait EntityOps: Send + Sync {
    fn get_record(&self, conn: &Connection, id: EntityId) -> RepoResult<Option<CatalogRecord>>;
    /// Matching records in default listing order.
    fn list_records(&self, conn: &Connection, filters: &FilterSet) -> RepoResult<Vec<CatalogRecord>>;
    /// Display name of one record; `NotFound` if it does not exist.
    fn name_of(&self, conn: &Connection, id: EntityId) -> RepoResult<String>;
}

struct TypedOps<T>(PhantomData<fn() -> T>);

impl<T: Entity> TypedOps<T> {
    fn to_record(
        repo: &SqliteEntityRepository<'_>,
        stored: Stored<T>,
    ) -> RepoResult<CatalogRecord> {
        let name = stored.record.name(repo)?;
        let fields = match serde_json::to_value(&stored.record) {
            Ok(JsonValue::Object(fields)) => fields,
            Ok(_) => {
                return Err(RepoError::InvalidData(format!(
                    "{} did not serialize to an object",
                    T::KIND
                )))
            }
            Err(err) => return Err(RepoError::InvalidData(err.to_string())),
        };

        let mut related = Vec::with_capacity(T::EXTRA_DISPLAY.len());
        for relation in T::EXTRA_DISPLAY {
            related.push((relation, repo.related_ids(relation, stored.id)?));
        }

        let superseded_by = if T::COLUMNS.iter().any(|column| column.name == "supersedes") {
            Some(repo.superseded_by(T::KIND, stored.id)?)
        } else {
            None
        };

        let mut references = Vec::new();
        for reference in stored.record.extra_references() {
            if !repo.exists(reference.kind, reference.id)? {
                error!(
                    "event=record_read module=registry status=error error_code=dangling_reference kind={} id={} field={} target_type={} target_id={}",
                    T::KIND,
                    stored.id,
                    reference.field,
                    reference.kind,
                    reference.id
                );
                return Err(RepoError::Reference {
                    field: reference.field,
                    kind: reference.kind,
                    id: reference.id,
                });
            }
            references.push((reference.field, reference.kind, reference.id));
        }

        Ok(CatalogRecord {
            kind: T::KIND,
            id: stored.id,
            name,
            updated_by: stored.updated_by,
            last_updated: stored.last_updated,
            fields,
            related,
            references,
            superseded_by,
        })
    }
}

impl<T: Entity> EntityOps for TypedOps<T> {
    fn get_record(&self, conn: &Connection, id: EntityId) -> RepoResult<Option<CatalogRecord>> {
        let repo = SqliteEntityRepository::new(conn);
        match repo.get::<T>(id)? {
            Some(stored) => Self::to_record(&repo, stored).map(Some),
            None => Ok(None),
        }
    }

    fn list_records(&self, conn: &Connection, filters: &FilterSet) -> RepoResult<Vec<CatalogRecord>> {
        let repo = SqliteEntityRepository::new(conn);
        let mut records = repo
            .list::<T>(filters)?
            .into_iter()
            .map(|stored| Self::to_record(&repo, stored))
            .collect::<RepoResult<Vec<_>>>()?;
        records.sort_by(|left, right| {
            listing_order(
                (left.name.as_str(), left.last_updated, left.id),
                (right.name.as_str(), right.last_updated, right.id),
            )
        });
        Ok(records)
    }

    fn name_of(&self, conn: &Connection, id: EntityId) -> RepoResult<String> {
        let repo = SqliteEntityRepository::new(conn);
        match repo.get::<T>(id)? {
            Some(stored) => stored.record.name(&repo),
            None => Err(RepoError::NotFound { kind: T::KIND, id }),
        }
    }
}

/// Registry entry: descriptor plus record access.
pub struct RegisteredEntity {
    descriptor: EntityDescriptor,
    ops: Box<dyn EntityOps>,
}

impl RegisteredEntity {
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn ops(&self) -> &dyn EntityOps {
        self.ops.as_ref()
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateType(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateType(name) => write!(f, "entity type already registered: {name}"),
        }
    }
}

impl Error for RegistryError {}

/// Index of concrete catalog types keyed by type name.
#[derive(Default)]
pub struct EntityRegistry {
    entries: BTreeMap<&'static str, RegisteredEntity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain entity type.
    pub fn register_entity<T: Entity>(&mut self) -> Result<(), RegistryError> {
        self.insert::<T>(false)
    }

    /// Registers a data object type.
    pub fn register_object<T: DataObject>(&mut self) -> Result<(), RegistryError> {
        self.insert::<T>(true)
    }

    fn insert<T: Entity>(&mut self, is_object: bool) -> Result<(), RegistryError> {
        let type_name = T::KIND.type_name();
        if self.entries.contains_key(type_name) {
            return Err(RegistryError::DuplicateType(type_name.to_string()));
        }
        self.entries.insert(
            type_name,
            RegisteredEntity {
                descriptor: EntityDescriptor::of::<T>(is_object),
                ops: Box::new(TypedOps::<T>(PhantomData)),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Data object types, alphabetical by type name.
    pub fn all_object_types(&self) -> impl Iterator<Item = &RegisteredEntity> {
        self.entries
            .values()
            .filter(|entry| entry.descriptor.is_object)
    }

    /// Every registered type, alphabetical by type name.
    pub fn all_entity_types(&self) -> impl Iterator<Item = &RegisteredEntity> {
        self.entries.values()
    }

    /// Exact, case-sensitive type-name lookup.
    pub fn lookup(&self, type_name: &str) -> Option<&RegisteredEntity> {
        self.entries.get(type_name)
    }

    /// Lookup by URL list segment (`"sourceversions"`).
    pub fn lookup_list_name(&self, list_name: &str) -> Option<&RegisteredEntity> {
        self.entries
            .values()
            .find(|entry| entry.descriptor.list_name() == list_name)
    }

    /// Entry for a kind; a missing kind is reported as unregistered.
    pub fn entry(&self, kind: EntityKind) -> RepoResult<&RegisteredEntity> {
        self.lookup(kind.type_name()).ok_or_else(|| {
            error!(
                "event=registry_lookup module=registry status=error kind={kind} error_code=unregistered_type"
            );
            RepoError::UnregisteredType(kind.type_name().to_string())
        })
    }

    /// Validates a type-name string against the registry.
    pub fn resolve_type(&self, type_name: &str) -> RepoResult<EntityKind> {
        self.lookup(type_name)
            .map(|entry| entry.descriptor.kind)
            .ok_or_else(|| RepoError::UnregisteredType(type_name.to_string()))
    }
}

type Registration = fn(&mut EntityRegistry) -> Result<(), RegistryError>;

/// Every concrete catalog type compiled into this binary.
const CATALOG_TYPES: &[Registration] = &[
    EntityRegistry::register_entity::<Accessibility>,
    EntityRegistry::register_entity::<DataProductDataType>,
    EntityRegistry::register_entity::<DataProductType>,
    EntityRegistry::register_entity::<Issue>,
    EntityRegistry::register_entity::<SourceType>,
    EntityRegistry::register_entity::<StorageRoot>,
    EntityRegistry::register_entity::<StorageType>,
    EntityRegistry::register_object::<DataProduct>,
    EntityRegistry::register_object::<DataProductVersion>,
    EntityRegistry::register_object::<DataProductVersionComponent>,
    EntityRegistry::register_object::<DataStore>,
    EntityRegistry::register_object::<Model>,
    EntityRegistry::register_object::<ModelRun>,
    EntityRegistry::register_object::<ModelVersion>,
    EntityRegistry::register_object::<ProcessingScript>,
    EntityRegistry::register_object::<ProcessingScriptVersion>,
    EntityRegistry::register_object::<Source>,
    EntityRegistry::register_object::<SourceVersion>,
];

/// Builds a registry from a registration table.
pub fn build_registry(table: &[Registration]) -> Result<EntityRegistry, RegistryError> {
    let mut registry = EntityRegistry::new();
    for register in table {
        register(&mut registry)?;
    }
    Ok(registry)
}

static REGISTRY: Lazy<EntityRegistry> = Lazy::new(|| {
    build_registry(CATALOG_TYPES).expect("catalog type table has unique type names")
});

/// The process-wide registry of compiled-in catalog types.
pub fn registry() -> &'static EntityRegistry {
    &REGISTRY
}
