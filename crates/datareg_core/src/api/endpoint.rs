//! Generic list/detail endpoint instantiated once per registered type.
//!
//! # Responsibility
//! - Serve paginated, filtered lists and single-record detail for any
//!   registered type from its descriptor alone.
//! - Render records: references become `/<list>/<id>/` links, principals
//!   become usernames.
//!
//! # Invariants
//! - List results follow the default listing order before pagination.
//! - Pages are 1-based; a page outside `1..=page_count` is `InvalidPage`
//!   (page 1 of an empty list is valid).

use crate::api::ApiError;
use crate::model::{ColumnKind, EntityId, EntityKind, UserId};
use crate::registry::{list_name_of, CatalogRecord, EntityDescriptor, RegisteredEntity};
use crate::repo::filter::FilterSet;
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

const PAGE_PARAM: &str = "page";

/// Canonical URL of one record.
pub fn record_url(kind: EntityKind, id: EntityId) -> String {
    format!("/{}/{}/", list_name_of(kind.type_name()), id)
}

/// Parsed list query: page number plus field filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: usize,
    pub filters: FilterSet,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            filters: FilterSet::new(),
        }
    }
}

impl ListQuery {
    /// Splits `page` from filter pairs.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut query = Self::default();
        for (key, value) in pairs {
            if key == PAGE_PARAM {
                query.page = match value.trim().parse::<usize>() {
                    Ok(page) if page >= 1 => page,
                    _ => return Err(ApiError::InvalidPage(value.clone())),
                };
            } else {
                query.filters = query.filters.with(key.as_str(), value);
            }
        }
        Ok(query)
    }
}

/// Paginated list payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<JsonValue>,
}

/// List/detail endpoint for one registered type.
pub struct ObjectEndpoint<'r> {
    entry: &'r RegisteredEntity,
    page_size: usize,
}

impl<'r> ObjectEndpoint<'r> {
    pub fn new(entry: &'r RegisteredEntity, page_size: usize) -> Self {
        Self {
            entry,
            page_size: page_size.max(1),
        }
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        self.entry.descriptor()
    }

    pub fn list_name(&self) -> String {
        self.descriptor().list_name()
    }

    pub fn list_url(&self) -> String {
        format!("/{}/", self.list_name())
    }

    /// `GET /<list>/`.
    pub fn list(&self, conn: &Connection, query: &ListQuery) -> Result<Page, ApiError> {
        let records = self.entry.ops().list_records(conn, &query.filters)?;
        let count = records.len();
        let page_count = count.div_ceil(self.page_size).max(1);
        if query.page > page_count {
            return Err(ApiError::InvalidPage(query.page.to_string()));
        }

        let start = (query.page - 1) * self.page_size;
        let results = records
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|record| render_record(conn, self.descriptor(), record))
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(Page {
            count,
            next: (query.page < page_count).then(|| self.page_link(query, query.page + 1)),
            previous: (query.page > 1).then(|| self.page_link(query, query.page - 1)),
            results,
        })
    }

    /// `GET /<list>/<id>/`.
    pub fn detail(&self, conn: &Connection, id: EntityId) -> Result<JsonValue, ApiError> {
        let kind = self.descriptor().kind;
        let record = self
            .entry
            .ops()
            .get_record(conn, id)?
            .ok_or(ApiError::NotFound { kind, id })?;
        Ok(render_record(conn, self.descriptor(), &record)?)
    }

    fn page_link(&self, query: &ListQuery, page: usize) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (field, value) in query.filters.pairs() {
            serializer.append_pair(field, value);
        }
        serializer.append_pair(PAGE_PARAM, &page.to_string());
        format!("{}?{}", self.list_url(), serializer.finish())
    }
}

/// Renders one record payload.
pub fn render_record(
    conn: &Connection,
    descriptor: &EntityDescriptor,
    record: &CatalogRecord,
) -> RepoResult<JsonValue> {
    let users = SqliteUserRepository::new(conn);
    let mut out = Map::new();
    out.insert("id".into(), JsonValue::from(record.id));
    out.insert("url".into(), JsonValue::from(record_url(record.kind, record.id)));
    out.insert("name".into(), JsonValue::from(record.name.clone()));

    for column in descriptor.columns {
        let raw = record.fields.get(column.name).cloned().unwrap_or(JsonValue::Null);
        let rendered = match (column.kind, raw.as_i64()) {
            (ColumnKind::ForeignKey(target), Some(id)) => JsonValue::from(record_url(target, id)),
            (ColumnKind::Principal, Some(id)) => {
                JsonValue::from(username(&users, column.name, id)?)
            }
            _ => raw,
        };
        out.insert(column.name.into(), rendered);
    }

    for link in descriptor.links {
        let ids = record
            .fields
            .get(link.field)
            .and_then(JsonValue::as_array)
            .map(|values| values.iter().filter_map(JsonValue::as_i64).collect::<Vec<_>>())
            .unwrap_or_default();
        out.insert(link.field.into(), links(link.target, &ids));
    }

    for (relation, ids) in &record.related {
        out.insert(relation.field.into(), links(relation.source, ids));
    }

    for (field, kind, id) in &record.references {
        out.insert((*field).into(), JsonValue::from(record_url(*kind, *id)));
    }

    if let Some(successors) = &record.superseded_by {
        out.insert("superseded_by".into(), links(record.kind, successors));
    }

    out.insert(
        "last_updated".into(),
        JsonValue::from(record.last_updated.format("%Y-%m-%d").to_string()),
    );
    out.insert(
        "updated_by".into(),
        JsonValue::from(username(&users, "updated_by", record.updated_by)?),
    );

    Ok(JsonValue::Object(out))
}

fn links(kind: EntityKind, ids: &[EntityId]) -> JsonValue {
    JsonValue::Array(
        ids.iter()
            .map(|id| JsonValue::from(record_url(kind, *id)))
            .collect(),
    )
}

fn username(
    users: &SqliteUserRepository<'_>,
    field: &'static str,
    id: UserId,
) -> RepoResult<String> {
    users
        .get_user(id)?
        .map(|user| user.username)
        .ok_or(RepoError::MissingPrincipal { field, id })
}
