//! Versioned data objects.
//!
//! # Responsibility
//! - Model one released version of a parent data object.
//! - Derive version names from the parent on every read.
//!
//! # Invariants
//! - `name` is never stored: it is `"<parent name> (version <identifier>)"`.
//! - Name derivation dereferences exactly one level (the parent's own name).
//! - A missing parent is a reference error, never a silent default.
//! - `supersedes` points at most one predecessor of the same kind; several
//!   versions may claim the same predecessor.

use super::object::MODEL_RUN_OUTPUTS;
use super::{
    id_value, optional_id_value, text_value, Column, DataObject, Entity, EntityId, EntityKind,
    Link, NameResolver, Naming, Relation, RelationVia, UserId,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Source versions a data product version was derived from.
pub const DATA_PRODUCT_VERSION_SOURCES: Link = Link {
    field: "source_versions",
    target: EntityKind::SourceVersion,
    table: "data_product_version_source_versions",
    owner_column: "data_product_version_id",
    target_column: "source_version_id",
};

/// Data object representing one version of a parent data object.
pub trait VersionedObject: DataObject {
    type Parent: DataObject;

    /// Field holding the parent reference, for diagnostics.
    const PARENT_FIELD: &'static str;

    /// Parent record this version belongs to.
    fn parent(&self) -> EntityId;

    fn version_identifier(&self) -> &str;
}

/// Derives `"<parent name> (version <identifier>)"` from the current parent row.
pub fn versioned_name<V: VersionedObject>(
    version: &V,
    resolver: &dyn NameResolver,
) -> RepoResult<String> {
    let parent_kind = <V::Parent as Entity>::KIND;
    let parent_name = resolver
        .resolve_name(parent_kind, version.parent())
        .map_err(|err| match err {
            RepoError::NotFound { kind, id } => RepoError::Reference {
                field: V::PARENT_FIELD,
                kind,
                id,
            },
            other => other,
        })?;
    Ok(format!(
        "{parent_name} (version {})",
        version.version_identifier()
    ))
}

/// Released version of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersion {
    pub responsible_person: UserId,
    pub version_identifier: String,
    pub supersedes: Option<EntityId>,
    pub source: EntityId,
    pub store: EntityId,
    pub description: String,
    pub accessibility: EntityId,
}

impl Entity for SourceVersion {
    const KIND: EntityKind = EntityKind::SourceVersion;
    const DOC: &'static str = "Specific release of a source.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::principal("responsible_person"),
        Column::text("version_identifier", 255),
        Column::optional_foreign_key("supersedes", EntityKind::SourceVersion),
        Column::foreign_key("source", EntityKind::Source),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::text("description", 255),
        Column::foreign_key("accessibility", EntityKind::Accessibility),
    ];
    const FILTERS: &'static [&'static str] =
        &["version_identifier", "source", "store", "accessibility"];
    const UNIQUE: &'static [&'static str] = &["source", "version_identifier"];

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.responsible_person),
            text_value(&self.version_identifier),
            optional_id_value(self.supersedes),
            id_value(self.source),
            id_value(self.store),
            text_value(&self.description),
            id_value(self.accessibility),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            responsible_person: row.get("responsible_person")?,
            version_identifier: row.get("version_identifier")?,
            supersedes: row.get("supersedes")?,
            source: row.get("source")?,
            store: row.get("store")?,
            description: row.get("description")?,
            accessibility: row.get("accessibility")?,
        })
    }

    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String> {
        versioned_name(self, resolver)
    }

    fn supersedes(&self) -> Option<EntityId> {
        self.supersedes
    }
}

impl DataObject for SourceVersion {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

impl VersionedObject for SourceVersion {
    type Parent = super::object::Source;
    const PARENT_FIELD: &'static str = "source";

    fn parent(&self) -> EntityId {
        self.source
    }

    fn version_identifier(&self) -> &str {
        &self.version_identifier
    }
}

/// Released version of a processing script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingScriptVersion {
    pub responsible_person: UserId,
    pub version_identifier: String,
    pub supersedes: Option<EntityId>,
    pub processing_script: EntityId,
    pub store: EntityId,
    pub accessibility: EntityId,
}

impl Entity for ProcessingScriptVersion {
    const KIND: EntityKind = EntityKind::ProcessingScriptVersion;
    const DOC: &'static str = "Specific release of a processing script.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::principal("responsible_person"),
        Column::text("version_identifier", 255),
        Column::optional_foreign_key("supersedes", EntityKind::ProcessingScriptVersion),
        Column::foreign_key("processing_script", EntityKind::ProcessingScript),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::foreign_key("accessibility", EntityKind::Accessibility),
    ];
    const FILTERS: &'static [&'static str] = &["version_identifier", "processing_script", "store"];
    const UNIQUE: &'static [&'static str] = &["processing_script", "version_identifier"];

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.responsible_person),
            text_value(&self.version_identifier),
            optional_id_value(self.supersedes),
            id_value(self.processing_script),
            id_value(self.store),
            id_value(self.accessibility),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            responsible_person: row.get("responsible_person")?,
            version_identifier: row.get("version_identifier")?,
            supersedes: row.get("supersedes")?,
            processing_script: row.get("processing_script")?,
            store: row.get("store")?,
            accessibility: row.get("accessibility")?,
        })
    }

    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String> {
        versioned_name(self, resolver)
    }

    fn supersedes(&self) -> Option<EntityId> {
        self.supersedes
    }
}

impl DataObject for ProcessingScriptVersion {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

impl VersionedObject for ProcessingScriptVersion {
    type Parent = super::object::ProcessingScript;
    const PARENT_FIELD: &'static str = "processing_script";

    fn parent(&self) -> EntityId {
        self.processing_script
    }

    fn version_identifier(&self) -> &str {
        &self.version_identifier
    }
}

/// Released version of a data product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProductVersion {
    pub responsible_person: UserId,
    pub version_identifier: String,
    pub supersedes: Option<EntityId>,
    pub data_product: EntityId,
    pub data_type: EntityId,
    pub description: String,
    pub store: EntityId,
    pub accessibility: EntityId,
    pub processing_script_version: EntityId,
    #[serde(default)]
    pub source_versions: Vec<EntityId>,
}

impl Entity for DataProductVersion {
    const KIND: EntityKind = EntityKind::DataProductVersion;
    const DOC: &'static str = "Specific release of a data product, with its provenance.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::principal("responsible_person"),
        Column::text("version_identifier", 255),
        Column::optional_foreign_key("supersedes", EntityKind::DataProductVersion),
        Column::foreign_key("data_product", EntityKind::DataProduct),
        Column::foreign_key("data_type", EntityKind::DataProductDataType),
        Column::text("description", 1024),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::foreign_key("accessibility", EntityKind::Accessibility),
        Column::foreign_key(
            "processing_script_version",
            EntityKind::ProcessingScriptVersion,
        ),
    ];
    const LINKS: &'static [Link] = &[DATA_PRODUCT_VERSION_SOURCES];
    const FILTERS: &'static [&'static str] = &[
        "version_identifier",
        "data_product",
        "data_type",
        "processing_script_version",
    ];
    const EXTRA_DISPLAY: &'static [Relation] = &[
        Relation {
            field: "components",
            source: EntityKind::DataProductVersionComponent,
            via: RelationVia::Reverse {
                column: "data_product_version",
            },
        },
        Relation {
            field: "model_runs",
            source: EntityKind::ModelRun,
            via: RelationVia::ReverseLink(&MODEL_RUN_OUTPUTS),
        },
    ];
    const UNIQUE: &'static [&'static str] = &["data_product", "version_identifier"];

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.responsible_person),
            text_value(&self.version_identifier),
            optional_id_value(self.supersedes),
            id_value(self.data_product),
            id_value(self.data_type),
            text_value(&self.description),
            id_value(self.store),
            id_value(self.accessibility),
            id_value(self.processing_script_version),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            responsible_person: row.get("responsible_person")?,
            version_identifier: row.get("version_identifier")?,
            supersedes: row.get("supersedes")?,
            data_product: row.get("data_product")?,
            data_type: row.get("data_type")?,
            description: row.get("description")?,
            store: row.get("store")?,
            accessibility: row.get("accessibility")?,
            processing_script_version: row.get("processing_script_version")?,
            source_versions: Vec::new(),
        })
    }

    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String> {
        versioned_name(self, resolver)
    }

    fn link_ids(&self) -> Vec<Vec<EntityId>> {
        vec![self.source_versions.clone()]
    }

    fn set_link_ids(&mut self, field: &str, ids: Vec<EntityId>) {
        if field == DATA_PRODUCT_VERSION_SOURCES.field {
            self.source_versions = ids;
        }
    }

    fn supersedes(&self) -> Option<EntityId> {
        self.supersedes
    }
}

impl DataObject for DataProductVersion {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

impl VersionedObject for DataProductVersion {
    type Parent = super::object::DataProduct;
    const PARENT_FIELD: &'static str = "data_product";

    fn parent(&self) -> EntityId {
        self.data_product
    }

    fn version_identifier(&self) -> &str {
        &self.version_identifier
    }
}

/// Released version of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub responsible_person: UserId,
    pub version_identifier: String,
    pub supersedes: Option<EntityId>,
    pub model: EntityId,
    pub store: EntityId,
    pub description: String,
    pub accessibility: EntityId,
}

impl Entity for ModelVersion {
    const KIND: EntityKind = EntityKind::ModelVersion;
    const DOC: &'static str = "Specific release of a model's code.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::principal("responsible_person"),
        Column::text("version_identifier", 255),
        Column::optional_foreign_key("supersedes", EntityKind::ModelVersion),
        Column::foreign_key("model", EntityKind::Model),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::text("description", 1024),
        Column::foreign_key("accessibility", EntityKind::Accessibility),
    ];
    const FILTERS: &'static [&'static str] = &["version_identifier", "model", "store"];
    const EXTRA_DISPLAY: &'static [Relation] = &[Relation {
        field: "model_runs",
        source: EntityKind::ModelRun,
        via: RelationVia::Reverse {
            column: "model_version",
        },
    }];
    const UNIQUE: &'static [&'static str] = &["model", "version_identifier"];

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.responsible_person),
            text_value(&self.version_identifier),
            optional_id_value(self.supersedes),
            id_value(self.model),
            id_value(self.store),
            text_value(&self.description),
            id_value(self.accessibility),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            responsible_person: row.get("responsible_person")?,
            version_identifier: row.get("version_identifier")?,
            supersedes: row.get("supersedes")?,
            model: row.get("model")?,
            store: row.get("store")?,
            description: row.get("description")?,
            accessibility: row.get("accessibility")?,
        })
    }

    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String> {
        versioned_name(self, resolver)
    }

    fn supersedes(&self) -> Option<EntityId> {
        self.supersedes
    }
}

impl DataObject for ModelVersion {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

impl VersionedObject for ModelVersion {
    type Parent = super::object::Model;
    const PARENT_FIELD: &'static str = "model";

    fn parent(&self) -> EntityId {
        self.model
    }

    fn version_identifier(&self) -> &str {
        &self.version_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::{versioned_name, SourceVersion};
    use crate::model::{EntityId, EntityKind, NameResolver};
    use crate::repo::{RepoError, RepoResult};

    struct FixedNames;

    impl NameResolver for FixedNames {
        fn resolve_name(&self, kind: EntityKind, id: EntityId) -> RepoResult<String> {
            match (kind, id) {
                (EntityKind::Source, 1) => Ok("Journal X".to_string()),
                _ => Err(RepoError::NotFound { kind, id }),
            }
        }
    }

    fn version_of(source: EntityId) -> SourceVersion {
        SourceVersion {
            responsible_person: 1,
            version_identifier: "0.1.0".to_string(),
            supersedes: None,
            source,
            store: 1,
            description: "first release".to_string(),
            accessibility: 1,
        }
    }

    #[test]
    fn derives_name_from_parent_and_identifier() {
        let name = versioned_name(&version_of(1), &FixedNames).expect("parent should resolve");
        assert_eq!(name, "Journal X (version 0.1.0)");
    }

    #[test]
    fn missing_parent_is_a_reference_error() {
        let err = versioned_name(&version_of(7), &FixedNames).expect_err("parent is missing");
        assert!(matches!(
            err,
            RepoError::Reference {
                field: "source",
                kind: EntityKind::Source,
                id: 7
            }
        ));
    }
}
