//! Issue annotation use-cases.
//!
//! # Responsibility
//! - Attach severity-rated issues to records of any registered kind.
//! - Query issues per target and globally.
//!
//! # Invariants
//! - Targets are validated on write (the record must exist) and again on
//!   read: a dangling target is a `Reference` error, logged as an integrity
//!   fault, never dropped from results.
//! - Deleting a target removes its issues in the same statement (storage
//!   triggers), so scoped and global listings agree.

use crate::model::issue::{Issue, IssueTarget};
use crate::model::user::Principal;
use crate::model::{Entity, EntityId};
use crate::registry::registry;
use crate::repo::entity_repo::EntityRepository;
use crate::repo::filter::FilterSet;
use crate::repo::{RepoError, RepoResult};
use crate::service::catalog_service::{CatalogService, Named};
use log::{error, info};

/// Use-case service for issue annotations.
pub struct IssueService<R: EntityRepository> {
    catalog: CatalogService<R>,
}

impl<R: EntityRepository> IssueService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            catalog: CatalogService::new(repo),
        }
    }

    /// Attaches a new issue to `target`.
    pub fn attach(
        &self,
        target: IssueTarget,
        severity: u16,
        desc: &str,
        actor: &Principal,
    ) -> RepoResult<Named<Issue>> {
        let issue = Issue::new(target, desc).with_severity(severity);
        let id = self.catalog.create(&issue, actor)?;
        info!(
            "event=issue_attach module=service status=ok issue_id={} target_type={} target_id={} severity={}",
            id, target.kind, target.id, severity
        );
        self.catalog.get::<Issue>(id)
    }

    /// Attaches an issue to a target named by type-name string.
    pub fn attach_to(
        &self,
        type_name: &str,
        target_id: EntityId,
        severity: u16,
        desc: &str,
        actor: &Principal,
    ) -> RepoResult<Named<Issue>> {
        let kind = registry().resolve_type(type_name)?;
        self.attach(IssueTarget::new(kind, target_id), severity, desc, actor)
    }

    /// Issues attached to one record.
    pub fn list_for(&self, target: IssueTarget) -> RepoResult<Vec<Named<Issue>>> {
        registry().entry(target.kind)?;
        if !self.catalog.repo().exists(target.kind, target.id)? {
            return Err(RepoError::Reference {
                field: "target",
                kind: target.kind,
                id: target.id,
            });
        }
        self.catalog.list::<Issue>(&target_filter(target))
    }

    /// Every issue in the catalog, with targets verified.
    pub fn list_all(&self) -> RepoResult<Vec<Named<Issue>>> {
        let issues = self.catalog.list::<Issue>(&FilterSet::new())?;
        for issue in &issues {
            self.verify_target(issue)?;
        }
        Ok(issues)
    }

    /// Display name of the record an issue annotates.
    pub fn target_name(&self, issue: &Named<Issue>) -> RepoResult<String> {
        self.verify_target(issue)?;
        let target = issue.record().target();
        self.catalog.repo().resolve_name(target.kind, target.id)
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Named<Issue>> {
        self.catalog.get::<Issue>(id)
    }

    pub fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.catalog.delete::<Issue>(id)
    }

    fn verify_target(&self, issue: &Named<Issue>) -> RepoResult<()> {
        let target = issue.record().target();
        if self.catalog.repo().exists(target.kind, target.id)? {
            return Ok(());
        }

        error!(
            "event=issue_target module=service status=error error_code=dangling_reference issue_id={} target_type={} target_id={}",
            issue.id(),
            target.kind,
            target.id
        );
        Err(RepoError::Reference {
            field: "target",
            kind: target.kind,
            id: target.id,
        })
    }
}

fn target_filter(target: IssueTarget) -> FilterSet {
    FilterSet::new()
        .exact("target_type", target.kind.type_name())
        .exact("target_id", target.id.to_string())
}

/// Issue target for a typed record id.
pub fn target_of<T: Entity>(id: EntityId) -> IssueTarget {
    IssueTarget::new(T::KIND, id)
}
