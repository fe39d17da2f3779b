//! Data objects: annotatable catalog records with a responsible person.

use super::{
    date_value, id_value, optional_id_value, optional_text_value, text_value, Column, DataObject,
    Entity, EntityId, EntityKind, Link, NameResolver, Naming, Relation, RelationVia, UserId,
};
use crate::repo::RepoResult;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Model runs consuming data product version components.
pub const MODEL_RUN_INPUTS: Link = Link {
    field: "inputs",
    target: EntityKind::DataProductVersionComponent,
    table: "model_run_inputs",
    owner_column: "model_run_id",
    target_column: "component_id",
};

/// Model runs producing data product versions.
pub const MODEL_RUN_OUTPUTS: Link = Link {
    field: "outputs",
    target: EntityKind::DataProductVersion,
    table: "model_run_outputs",
    owner_column: "model_run_id",
    target_column: "data_product_version_id",
};

/// Location of stored bytes under a storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStore {
    pub name: String,
    pub responsible_person: UserId,
    pub store_root: EntityId,
    pub description: Option<String>,
    pub path: Option<String>,
    pub hash: Option<String>,
    pub local_cache_url: Option<String>,
}

impl Entity for DataStore {
    const KIND: EntityKind = EntityKind::DataStore;
    const DOC: &'static str = "Externally addressed storage location, by path and hash, under a storage root.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::foreign_key("store_root", EntityKind::StorageRoot),
        Column::optional_text("description", 1024),
        Column::optional_text("path", 1024),
        Column::optional_text("hash", 1024),
        Column::optional_text("local_cache_url", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name", "store_root", "path", "hash"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            id_value(self.store_root),
            optional_text_value(self.description.as_deref()),
            optional_text_value(self.path.as_deref()),
            optional_text_value(self.hash.as_deref()),
            optional_text_value(self.local_cache_url.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            store_root: row.get("store_root")?,
            description: row.get("description")?,
            path: row.get("path")?,
            hash: row.get("hash")?,
            local_cache_url: row.get("local_cache_url")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for DataStore {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// Original source of data, such as a journal or open data repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub responsible_person: UserId,
    pub store: EntityId,
    pub source_type: EntityId,
    pub description: String,
}

impl Entity for Source {
    const KIND: EntityKind = EntityKind::Source;
    const DOC: &'static str = "Original source of data such as a journal, repository or web site.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::foreign_key("source_type", EntityKind::SourceType),
        Column::text("description", 255),
    ];
    const FILTERS: &'static [&'static str] = &["name", "store", "source_type", "responsible_person"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            id_value(self.store),
            id_value(self.source_type),
            text_value(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            store: row.get("store")?,
            source_type: row.get("source_type")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for Source {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// Data product whose releases are tracked as versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProduct {
    pub name: String,
    pub responsible_person: UserId,
    pub description: String,
}

impl Entity for DataProduct {
    const KIND: EntityKind = EntityKind::DataProduct;
    const DOC: &'static str = "Data product derived from sources by processing scripts.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::text("description", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name", "responsible_person"];
    const EXTRA_DISPLAY: &'static [Relation] = &[Relation {
        field: "versions",
        source: EntityKind::DataProductVersion,
        via: RelationVia::Reverse {
            column: "data_product",
        },
    }];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            text_value(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for DataProduct {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// Script that turns source versions into data product versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingScript {
    pub name: String,
    pub responsible_person: UserId,
    pub store: EntityId,
}

impl Entity for ProcessingScript {
    const KIND: EntityKind = EntityKind::ProcessingScript;
    const DOC: &'static str = "Script that processes source versions into data product versions.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::foreign_key("store", EntityKind::DataStore),
    ];
    const FILTERS: &'static [&'static str] = &["name", "store"];
    const EXTRA_DISPLAY: &'static [Relation] = &[Relation {
        field: "versions",
        source: EntityKind::ProcessingScriptVersion,
        via: RelationVia::Reverse {
            column: "processing_script",
        },
    }];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            id_value(self.store),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            store: row.get("store")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for ProcessingScript {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// Addressable component inside one data product version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProductVersionComponent {
    pub name: String,
    pub responsible_person: UserId,
    pub data_product_version: EntityId,
}

impl Entity for DataProductVersionComponent {
    const KIND: EntityKind = EntityKind::DataProductVersionComponent;
    const DOC: &'static str = "Named component of a data product version, usable as a model run input.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::foreign_key("data_product_version", EntityKind::DataProductVersion),
    ];
    const FILTERS: &'static [&'static str] = &["name", "data_product_version"];
    const EXTRA_DISPLAY: &'static [Relation] = &[Relation {
        field: "model_runs",
        source: EntityKind::ModelRun,
        via: RelationVia::ReverseLink(&MODEL_RUN_INPUTS),
    }];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            id_value(self.data_product_version),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            data_product_version: row.get("data_product_version")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for DataProductVersionComponent {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// Model whose released code is tracked as versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub responsible_person: UserId,
    pub store: EntityId,
    pub description: String,
}

impl Entity for Model {
    const KIND: EntityKind = EntityKind::Model;
    const DOC: &'static str = "Simulation or statistical model.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::principal("responsible_person"),
        Column::foreign_key("store", EntityKind::DataStore),
        Column::text("description", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name", "store"];
    const EXTRA_DISPLAY: &'static [Relation] = &[Relation {
        field: "versions",
        source: EntityKind::ModelVersion,
        via: RelationVia::Reverse { column: "model" },
    }];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.responsible_person),
            id_value(self.store),
            text_value(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            responsible_person: row.get("responsible_person")?,
            store: row.get("store")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

impl DataObject for Model {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}

/// One execution of a model version, named after the version and its release date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRun {
    pub responsible_person: UserId,
    pub model_version: EntityId,
    pub release_date: NaiveDate,
    pub description: Option<String>,
    pub model_config: Option<String>,
    pub submission_script: Option<String>,
    pub supersedes: Option<EntityId>,
    #[serde(default)]
    pub inputs: Vec<EntityId>,
    #[serde(default)]
    pub outputs: Vec<EntityId>,
}

impl Entity for ModelRun {
    const KIND: EntityKind = EntityKind::ModelRun;
    const DOC: &'static str = "Run of a model version consuming and producing data product versions.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::principal("responsible_person"),
        Column::foreign_key("model_version", EntityKind::ModelVersion),
        Column::date("release_date"),
        Column::optional_text("description", 1024),
        Column::optional_text("model_config", 1024),
        Column::optional_text("submission_script", 1024),
        Column::optional_foreign_key("supersedes", EntityKind::ModelRun),
    ];
    const LINKS: &'static [Link] = &[MODEL_RUN_INPUTS, MODEL_RUN_OUTPUTS];
    const FILTERS: &'static [&'static str] = &["model_version", "release_date", "description"];
    const UNIQUE: &'static [&'static str] = &["model_version", "release_date"];

    fn values(&self) -> Vec<Value> {
        vec![
            id_value(self.responsible_person),
            id_value(self.model_version),
            date_value(self.release_date),
            optional_text_value(self.description.as_deref()),
            optional_text_value(self.model_config.as_deref()),
            optional_text_value(self.submission_script.as_deref()),
            optional_id_value(self.supersedes),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            responsible_person: row.get("responsible_person")?,
            model_version: row.get("model_version")?,
            release_date: row.get("release_date")?,
            description: row.get("description")?,
            model_config: row.get("model_config")?,
            submission_script: row.get("submission_script")?,
            supersedes: row.get("supersedes")?,
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    fn name(&self, resolver: &dyn NameResolver) -> RepoResult<String> {
        let version_name = resolver.resolve_name(EntityKind::ModelVersion, self.model_version)?;
        Ok(format!(
            "{version_name} (Run {})",
            self.release_date.format("%Y-%m-%d")
        ))
    }

    fn link_ids(&self) -> Vec<Vec<EntityId>> {
        vec![self.inputs.clone(), self.outputs.clone()]
    }

    fn set_link_ids(&mut self, field: &str, ids: Vec<EntityId>) {
        match field {
            "inputs" => self.inputs = ids,
            "outputs" => self.outputs = ids,
            _ => {}
        }
    }

    fn supersedes(&self) -> Option<EntityId> {
        self.supersedes
    }
}

impl DataObject for ModelRun {
    fn responsible_person(&self) -> UserId {
        self.responsible_person
    }
}
