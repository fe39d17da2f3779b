//! Supporting reference records.
//!
//! These are plain catalog entities: they carry a stored unique `name` and
//! are looked up by data objects, but have no responsible person.

use super::{
    id_value, optional_text_value, text_value, Column, Entity, EntityId, EntityKind, NameResolver,
};
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Kind of data product (e.g. table, array, distribution).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProductType {
    pub name: String,
    pub description: String,
}

impl Entity for DataProductType {
    const KIND: EntityKind = EntityKind::DataProductType;
    const DOC: &'static str = "Broad category of a data product.";
    const COLUMNS: &'static [Column] = &[Column::text("name", 255), Column::text("description", 1024)];
    const FILTERS: &'static [&'static str] = &["name"];

    fn values(&self) -> Vec<Value> {
        vec![text_value(&self.name), text_value(&self.description)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

/// Kind of storage system (e.g. git host, object store, local disk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageType {
    pub name: String,
    pub description: Option<String>,
}

impl Entity for StorageType {
    const KIND: EntityKind = EntityKind::StorageType;
    const DOC: &'static str = "Kind of storage system holding data.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::optional_text("description", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            optional_text_value(self.description.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

/// Addressable root under which data stores live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRoot {
    pub name: String,
    #[serde(rename = "type")]
    pub storage_type: EntityId,
    pub description: Option<String>,
    pub uri: String,
}

impl Entity for StorageRoot {
    const KIND: EntityKind = EntityKind::StorageRoot;
    const DOC: &'static str = "Root location (URI) of a storage system.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::foreign_key("type", EntityKind::StorageType),
        Column::optional_text("description", 1024),
        Column::text("uri", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name", "type", "uri"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            id_value(self.storage_type),
            optional_text_value(self.description.as_deref()),
            text_value(&self.uri),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            storage_type: row.get("type")?,
            description: row.get("description")?,
            uri: row.get("uri")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

/// Access conditions attached to stored versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessibility {
    pub name: String,
    pub description: Option<String>,
    pub access_info: String,
}

impl Entity for Accessibility {
    const KIND: EntityKind = EntityKind::Accessibility;
    const DOC: &'static str = "Access conditions for stored data.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::optional_text("description", 1024),
        Column::text("access_info", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["name", "access_info"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            optional_text_value(self.description.as_deref()),
            text_value(&self.access_info),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
            access_info: row.get("access_info")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

/// Kind of original source (journal, repository, web site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceType {
    pub name: String,
    pub description: String,
}

impl Entity for SourceType {
    const KIND: EntityKind = EntityKind::SourceType;
    const DOC: &'static str = "Kind of original data source.";
    const COLUMNS: &'static [Column] = &[Column::text("name", 255), Column::text("description", 255)];
    const FILTERS: &'static [&'static str] = &["name"];

    fn values(&self) -> Vec<Value> {
        vec![text_value(&self.name), text_value(&self.description)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}

/// Concrete data type of a data product, within a data product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProductDataType {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub product_type: EntityId,
}

impl Entity for DataProductDataType {
    const KIND: EntityKind = EntityKind::DataProductDataType;
    const DOC: &'static str = "Concrete data type of a data product.";
    const COLUMNS: &'static [Column] = &[
        Column::text("name", 255),
        Column::text("description", 255),
        Column::foreign_key("type", EntityKind::DataProductType),
    ];
    const FILTERS: &'static [&'static str] = &["name", "type"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(&self.name),
            text_value(&self.description),
            id_value(self.product_type),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
            product_type: row.get("type")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.name.clone())
    }
}
