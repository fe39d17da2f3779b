//! Issue annotations.
//!
//! An issue is a severity-rated note attached to one instance of any
//! registered entity kind. The target is a `(kind, id)` pair; the annotated
//! type needs no knowledge of issues.

use super::{
    id_value, text_value, Column, Entity, EntityId, EntityKind, NameResolver, Naming, Reference,
};
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Severity assigned when the caller does not pick one.
pub const DEFAULT_SEVERITY: u16 = 1;

/// Annotated record, identified by kind and row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueTarget {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl IssueTarget {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

/// Severity-rated annotation on one catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub target_type: EntityKind,
    pub target_id: EntityId,
    pub severity: u16,
    pub desc: String,
}

impl Issue {
    /// Creates an issue with the default severity.
    pub fn new(target: IssueTarget, desc: impl Into<String>) -> Self {
        Self {
            target_type: target.kind,
            target_id: target.id,
            severity: DEFAULT_SEVERITY,
            desc: desc.into(),
        }
    }

    pub fn with_severity(mut self, severity: u16) -> Self {
        self.severity = severity;
        self
    }

    pub fn target(&self) -> IssueTarget {
        IssueTarget::new(self.target_type, self.target_id)
    }

    /// `"<desc> [Severity <severity>]"`.
    pub fn display_name(&self) -> String {
        format!("{} [Severity {}]", self.desc, self.severity)
    }
}

impl Entity for Issue {
    const KIND: EntityKind = EntityKind::Issue;
    const DOC: &'static str = "Known problem with a catalog record, rated by severity.";
    const NAMING: Naming = Naming::Derived;
    const COLUMNS: &'static [Column] = &[
        Column::text("target_type", 255),
        Column::integer("target_id"),
        Column::integer("severity"),
        Column::text("desc", 1024),
    ];
    const FILTERS: &'static [&'static str] = &["severity", "target_type", "target_id", "desc"];
    const UNIQUE: &'static [&'static str] = &["desc", "severity"];

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(self.target_type.type_name()),
            id_value(self.target_id),
            Value::Integer(i64::from(self.severity)),
            text_value(&self.desc),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            target_type: row.get("target_type")?,
            target_id: row.get("target_id")?,
            severity: row.get("severity")?,
            desc: row.get("desc")?,
        })
    }

    fn name(&self, _resolver: &dyn NameResolver) -> RepoResult<String> {
        Ok(self.display_name())
    }

    fn extra_references(&self) -> Vec<Reference> {
        vec![Reference {
            field: "target",
            kind: self.target_type,
            id: self.target_id,
        }]
    }
}
