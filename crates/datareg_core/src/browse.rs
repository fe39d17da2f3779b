//! Browse-page contexts for data object types.
//!
//! # Responsibility
//! - Build the index, list and detail contexts a page renderer consumes,
//!   for every registered data object type.
//! - Surface issues: all of them on the index, per instance on detail pages.
//!
//! # Invariants
//! - Index entries are alphabetical by type name.
//! - Only data object types have list/detail pages; issues have their own.

use crate::api::endpoint::{record_url, render_record};
use crate::model::issue::{Issue, IssueTarget};
use crate::model::{EntityId, EntityKind};
use crate::registry::{registry, RegisteredEntity};
use crate::repo::entity_repo::{EntityRepository, SqliteEntityRepository};
use crate::repo::filter::FilterSet;
use crate::repo::{RepoError, RepoResult};
use crate::service::catalog_service::Named;
use crate::service::issue_service::IssueService;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One object type on the index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    /// List name used in URLs (`"sourceversions"`).
    pub name: String,
    pub display_name: String,
    pub count: u64,
    pub doc: &'static str,
}

/// Issue as shown on browse pages, with its resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueView {
    pub id: EntityId,
    pub name: String,
    pub severity: u16,
    pub desc: String,
    pub target_type: EntityKind,
    pub target_id: EntityId,
    pub target_name: String,
    pub target_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPage {
    pub objects: Vec<ObjectSummary>,
    pub issues: Vec<IssueView>,
}

/// Link to one object on a list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectLink {
    pub id: EntityId,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListPage {
    /// Lower-cased type name.
    pub model_name: String,
    /// Plural display name (`"source versions"`).
    pub display_name: String,
    pub list_name: String,
    pub objects: Vec<ObjectLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPage {
    pub model_name: String,
    pub list_name: String,
    pub list_display_name: String,
    pub object: JsonValue,
    pub issues: Vec<IssueView>,
}

/// Builds browse contexts over one connection.
pub struct Browser<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Browser<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn issues(&self) -> IssueService<SqliteEntityRepository<'conn>> {
        IssueService::new(SqliteEntityRepository::new(self.conn))
    }

    /// Object type summaries plus every issue.
    pub fn index(&self) -> RepoResult<IndexPage> {
        let repo = SqliteEntityRepository::new(self.conn);
        let objects = registry()
            .all_object_types()
            .map(|entry| -> RepoResult<ObjectSummary> {
                let descriptor = entry.descriptor();
                Ok(ObjectSummary {
                    name: descriptor.list_name(),
                    display_name: descriptor.display_name(),
                    count: repo.count(descriptor.kind)?,
                    doc: descriptor.doc,
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;

        let issues = self.issues();
        let issue_views = issues
            .list_all()?
            .iter()
            .map(|issue| self.issue_view(&issues, issue))
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(IndexPage {
            objects,
            issues: issue_views,
        })
    }

    /// Ordered objects of one type.
    pub fn list_page(&self, list_name: &str) -> RepoResult<ListPage> {
        let entry = object_entry(list_name)?;
        let descriptor = entry.descriptor();
        let objects = entry
            .ops()
            .list_records(self.conn, &FilterSet::new())?
            .into_iter()
            .map(|record| ObjectLink {
                id: record.id,
                url: record_url(record.kind, record.id),
                name: record.name,
            })
            .collect();

        Ok(ListPage {
            model_name: descriptor.type_name.to_lowercase(),
            display_name: descriptor.plural_display_name(),
            list_name: descriptor.list_name(),
            objects,
        })
    }

    /// One object with the issues attached to it.
    pub fn detail_page(&self, list_name: &str, id: EntityId) -> RepoResult<DetailPage> {
        let entry = object_entry(list_name)?;
        let descriptor = entry.descriptor();
        let record = entry
            .ops()
            .get_record(self.conn, id)?
            .ok_or(RepoError::NotFound {
                kind: descriptor.kind,
                id,
            })?;

        let issues = self.issues();
        let issue_views = issues
            .list_for(IssueTarget::new(descriptor.kind, id))?
            .iter()
            .map(|issue| self.issue_view(&issues, issue))
            .collect::<RepoResult<Vec<_>>>()?;

        Ok(DetailPage {
            model_name: descriptor.type_name.to_lowercase(),
            list_name: descriptor.list_name(),
            list_display_name: descriptor.plural_display_name(),
            object: render_record(self.conn, descriptor, &record)?,
            issues: issue_views,
        })
    }

    /// All issues, for the issue list page.
    pub fn issue_list_page(&self) -> RepoResult<Vec<IssueView>> {
        let issues = self.issues();
        issues
            .list_all()?
            .iter()
            .map(|issue| self.issue_view(&issues, issue))
            .collect()
    }

    pub fn issue_detail_page(&self, id: EntityId) -> RepoResult<IssueView> {
        let issues = self.issues();
        let issue = issues.get(id)?;
        self.issue_view(&issues, &issue)
    }

    fn issue_view(
        &self,
        issues: &IssueService<SqliteEntityRepository<'conn>>,
        issue: &Named<Issue>,
    ) -> RepoResult<IssueView> {
        let record = issue.record();
        Ok(IssueView {
            id: issue.id(),
            name: issue.name.clone(),
            severity: record.severity,
            desc: record.desc.clone(),
            target_type: record.target_type,
            target_id: record.target_id,
            target_name: issues.target_name(issue)?,
            target_url: record_url(record.target_type, record.target_id),
        })
    }
}

fn object_entry(list_name: &str) -> RepoResult<&'static RegisteredEntity> {
    registry()
        .lookup_list_name(list_name)
        .filter(|entry| entry.descriptor().is_object)
        .ok_or_else(|| RepoError::UnknownType(list_name.to_string()))
}
