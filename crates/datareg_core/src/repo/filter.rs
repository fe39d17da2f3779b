//! List filters: exact and glob matching on declared fields.
//!
//! # Invariants
//! - Only fields declared filterable by the entity kind are accepted; any
//!   other field is a validation error, never silently ignored.
//! - Values containing `*` or `[` are glob patterns (SQLite `GLOB`,
//!   case-sensitive); anything else matches exactly. `?` is always a
//!   literal character.
//! - Foreign-key filters accept a numeric id, or the name (exact or glob) of
//!   the referenced record when that kind stores its name.

use crate::model::{Column, ColumnKind, EntityId, Naming, ValidationError};
use crate::registry::registry;
use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;

static GLOB_META_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*\[]").expect("valid glob regex"));

/// How one filter value is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterPattern {
    Exact(String),
    Glob(String),
}

impl FilterPattern {
    /// Classifies a raw query value.
    pub fn parse(value: &str) -> Self {
        if GLOB_META_RE.is_match(value) {
            Self::Glob(value.to_string())
        } else {
            Self::Exact(value.to_string())
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Exact(value) | Self::Glob(value) => value,
        }
    }

    /// Value bound into SQL; glob patterns get a literal `?`.
    fn sql_text(&self) -> String {
        match self {
            Self::Exact(value) => value.clone(),
            Self::Glob(value) => escape_question_marks(value),
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            Self::Exact(_) => "=",
            Self::Glob(_) => "GLOB",
        }
    }
}

/// Conjunction of field filters for one list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<(String, FilterPattern)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter, classifying the value as exact or glob.
    pub fn with(mut self, field: impl Into<String>, value: &str) -> Self {
        self.filters.push((field.into(), FilterPattern::parse(value)));
        self
    }

    /// Adds an exact filter regardless of glob metacharacters.
    pub fn exact(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .push((field.into(), FilterPattern::Exact(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Raw `(field, value)` pairs, for rebuilding query strings.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .map(|(field, pattern)| (field.as_str(), pattern.value()))
    }

    /// Builds a `WHERE` clause and its bind values for one table.
    pub(crate) fn to_sql(
        &self,
        allowed: &[&str],
        columns: &[Column],
    ) -> RepoResult<(String, Vec<Value>)> {
        let mut clause = String::from(" WHERE 1 = 1");
        let mut binds = Vec::new();

        for (field, pattern) in &self.filters {
            let column = columns
                .iter()
                .find(|column| column.name == field.as_str())
                .filter(|_| allowed.contains(&field.as_str()))
                .ok_or_else(|| ValidationError::Invalid {
                    field: field.clone(),
                    message: "filtering on this field is not supported".to_string(),
                })?;
            let quoted = quote_ident(column.name);
            let operator = pattern.operator();

            match column.kind {
                ColumnKind::Text | ColumnKind::Date => {
                    clause.push_str(&format!(" AND {quoted} {operator} ?"));
                    binds.push(Value::Text(pattern.sql_text()));
                }
                ColumnKind::Integer => {
                    clause.push_str(&format!(" AND {quoted} = ?"));
                    binds.push(Value::Integer(parse_integer(field, pattern)?));
                }
                ColumnKind::ForeignKey(target) => match numeric_id(pattern) {
                    Some(id) => {
                        clause.push_str(&format!(" AND {quoted} = ?"));
                        binds.push(Value::Integer(id));
                    }
                    None => {
                        if registry().entry(target)?.descriptor().naming != Naming::Stored {
                            return Err(ValidationError::Invalid {
                                field: field.clone(),
                                message: format!("expected a numeric {target} id"),
                            }
                            .into());
                        }
                        clause.push_str(&format!(
                            " AND {quoted} IN (SELECT id FROM {} WHERE \"name\" {operator} ?)",
                            target.table()
                        ));
                        binds.push(Value::Text(pattern.sql_text()));
                    }
                },
                ColumnKind::Principal => match numeric_id(pattern) {
                    Some(id) => {
                        clause.push_str(&format!(" AND {quoted} = ?"));
                        binds.push(Value::Integer(id));
                    }
                    None => {
                        clause.push_str(&format!(
                            " AND {quoted} IN (SELECT id FROM users WHERE username {operator} ?)"
                        ));
                        binds.push(Value::Text(pattern.sql_text()));
                    }
                },
            }
        }

        Ok((clause, binds))
    }
}

/// Rewrites `?` outside `[...]` sets as `[?]`.
fn escape_question_marks(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_set = false;
    for ch in pattern.chars() {
        match ch {
            '[' if !in_set => {
                in_set = true;
                out.push(ch);
            }
            ']' if in_set => {
                in_set = false;
                out.push(ch);
            }
            '?' if !in_set => out.push_str("[?]"),
            _ => out.push(ch),
        }
    }
    out
}

/// Quotes a declared identifier for SQL (`type`, `desc` are keywords).
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn numeric_id(pattern: &FilterPattern) -> Option<EntityId> {
    match pattern {
        FilterPattern::Exact(value) => value.trim().parse::<EntityId>().ok(),
        FilterPattern::Glob(_) => None,
    }
}

fn parse_integer(field: &str, pattern: &FilterPattern) -> RepoResult<i64> {
    match pattern {
        FilterPattern::Exact(value) => value.trim().parse::<i64>().map_err(|_| {
            RepoError::from(ValidationError::Invalid {
                field: field.to_string(),
                message: format!("expected an integer, got `{value}`"),
            })
        }),
        FilterPattern::Glob(value) => Err(ValidationError::Invalid {
            field: field.to_string(),
            message: format!("glob patterns are not supported on numeric fields, got `{value}`"),
        }
        .into()),
    }
}
