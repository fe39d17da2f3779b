//! Generic entity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over every catalog table from the per-kind column
//!   descriptors, without per-kind SQL.
//! - Stamp write attribution (`updated_by`, `last_updated`) on every write.
//! - Resolve display names of any record for derived naming.
//!
//! # Invariants
//! - Write paths call `Entity::validate()` and resolve every reference
//!   before SQL mutations.
//! - Updates reject supersession chains that loop back to the record.
//! - Storage uniqueness violations surface as `ValidationError::Duplicate`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::user::Principal;
use crate::model::{
    date_value, ColumnKind, Entity, EntityId, EntityKind, NameResolver, Relation, RelationVia,
    Stored, UserId, ValidationError,
};
use crate::registry::registry;
use crate::repo::filter::{quote_ident, FilterSet};
use crate::repo::{RepoError, RepoResult};
use chrono::Utc;
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;

/// Repository interface for catalog records of any registered kind.
pub trait EntityRepository: NameResolver {
    fn insert<T: Entity>(&self, record: &T, actor: &Principal) -> RepoResult<EntityId>;
    fn update<T: Entity>(&self, id: EntityId, record: &T, actor: &Principal) -> RepoResult<()>;
    fn get<T: Entity>(&self, id: EntityId) -> RepoResult<Option<Stored<T>>>;
    /// Rows matching `filters`, in id order.
    fn list<T: Entity>(&self, filters: &FilterSet) -> RepoResult<Vec<Stored<T>>>;
    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()>;
    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool>;
    fn count(&self, kind: EntityKind) -> RepoResult<u64>;
    /// Ids of records reached through an extra-display relation.
    fn related_ids(&self, relation: &Relation, id: EntityId) -> RepoResult<Vec<EntityId>>;
    /// Ids of records whose `supersedes` points at `id`.
    fn superseded_by(&self, kind: EntityKind, id: EntityId) -> RepoResult<Vec<EntityId>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn user_exists(&self, id: UserId) -> RepoResult<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            params![id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn check_references<T: Entity>(&self, record: &T, actor: &Principal) -> RepoResult<()> {
        if !self.user_exists(actor.user_id())? {
            return Err(RepoError::MissingPrincipal {
                field: "updated_by",
                id: actor.user_id(),
            });
        }

        for (column, value) in T::COLUMNS.iter().zip(record.values()) {
            let Value::Integer(id) = value else {
                continue;
            };
            match column.kind {
                ColumnKind::ForeignKey(target) if !self.exists(target, id)? => {
                    return Err(RepoError::Reference {
                        field: column.name,
                        kind: target,
                        id,
                    });
                }
                ColumnKind::Principal if !self.user_exists(id)? => {
                    return Err(RepoError::MissingPrincipal {
                        field: column.name,
                        id,
                    });
                }
                _ => {}
            }
        }

        for (link, ids) in T::LINKS.iter().zip(record.link_ids()) {
            for id in ids {
                if !self.exists(link.target, id)? {
                    return Err(RepoError::Reference {
                        field: link.field,
                        kind: link.target,
                        id,
                    });
                }
            }
        }

        for reference in record.extra_references() {
            if !self.exists(reference.kind, reference.id)? {
                return Err(RepoError::Reference {
                    field: reference.field,
                    kind: reference.kind,
                    id: reference.id,
                });
            }
        }

        Ok(())
    }

    /// Walks the predecessor chain starting at `supersedes`.
    fn check_supersession<T: Entity>(&self, id: EntityId, supersedes: Option<EntityId>) -> RepoResult<()> {
        let sql = format!("SELECT supersedes FROM {} WHERE id = ?1;", T::KIND.table());
        let mut seen = HashSet::new();
        let mut current = supersedes;

        while let Some(predecessor) = current {
            if predecessor == id {
                return Err(ValidationError::SupersessionCycle { kind: T::KIND, id }.into());
            }
            if !seen.insert(predecessor) {
                // Pre-existing loop not involving `id`; nothing this write adds.
                break;
            }
            current = self
                .conn
                .query_row(&sql, params![predecessor], |row| {
                    row.get::<_, Option<EntityId>>(0)
                })
                .optional()?
                .flatten();
        }

        Ok(())
    }

    fn load_links<T: Entity>(&self, record: &mut T, id: EntityId) -> RepoResult<()> {
        for link in T::LINKS {
            let sql = format!(
                "SELECT {target} FROM {table} WHERE {owner} = ?1 ORDER BY {target};",
                target = link.target_column,
                table = link.table,
                owner = link.owner_column,
            );
            let ids = collect_ids(self.conn, &sql, id)?;
            record.set_link_ids(link.field, ids);
        }
        Ok(())
    }
}

impl NameResolver for SqliteEntityRepository<'_> {
    fn resolve_name(&self, kind: EntityKind, id: EntityId) -> RepoResult<String> {
        registry().entry(kind)?.ops().name_of(self.conn, id)
    }
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn insert<T: Entity>(&self, record: &T, actor: &Principal) -> RepoResult<EntityId> {
        record.validate()?;
        self.check_references(record, actor)?;

        let names = column_names::<T>();
        let placeholders = vec!["?"; T::COLUMNS.len() + 2].join(", ");
        let sql = format!(
            "INSERT INTO {} ({names}, updated_by, last_updated) VALUES ({placeholders});",
            T::KIND.table()
        );
        let mut binds = record.values();
        binds.push(Value::Integer(actor.user_id()));
        binds.push(date_value(Utc::now().date_naive()));

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, params_from_iter(binds))
            .map_err(|err| map_write_error::<T>(err, "create"))?;
        let id = tx.last_insert_rowid();
        write_links(&tx, record, id)?;
        tx.commit()?;

        info!(
            "event=entity_write module=repo status=ok op=create kind={} id={} actor={}",
            T::KIND,
            id,
            actor.username()
        );
        Ok(id)
    }

    fn update<T: Entity>(&self, id: EntityId, record: &T, actor: &Principal) -> RepoResult<()> {
        record.validate()?;
        if !self.exists(T::KIND, id)? {
            return Err(RepoError::NotFound { kind: T::KIND, id });
        }
        self.check_references(record, actor)?;
        self.check_supersession::<T>(id, record.supersedes())?;

        let assignments = T::COLUMNS
            .iter()
            .map(|column| format!("{} = ?", quote_ident(column.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments}, updated_by = ?, last_updated = ? WHERE id = ?;",
            T::KIND.table()
        );
        let mut binds = record.values();
        binds.push(Value::Integer(actor.user_id()));
        binds.push(date_value(Utc::now().date_naive()));
        binds.push(Value::Integer(id));

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, params_from_iter(binds))
            .map_err(|err| map_write_error::<T>(err, "update"))?;
        write_links(&tx, record, id)?;
        tx.commit()?;

        info!(
            "event=entity_write module=repo status=ok op=update kind={} id={} actor={}",
            T::KIND,
            id,
            actor.username()
        );
        Ok(())
    }

    fn get<T: Entity>(&self, id: EntityId) -> RepoResult<Option<Stored<T>>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?1;", T::KIND.table());
        let stored = self
            .conn
            .query_row(&sql, params![id], parse_stored::<T>)
            .optional()?;

        match stored {
            Some(mut stored) => {
                self.load_links(&mut stored.record, id)?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    fn list<T: Entity>(&self, filters: &FilterSet) -> RepoResult<Vec<Stored<T>>> {
        let (clause, binds) = filters.to_sql(T::FILTERS, T::COLUMNS)?;
        let sql = format!("SELECT * FROM {}{clause} ORDER BY id;", T::KIND.table());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds), parse_stored::<T>)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        drop(stmt);

        for stored in &mut records {
            self.load_links(&mut stored.record, stored.id)?;
        }
        Ok(records)
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", kind.table()), params![id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }

        info!("event=entity_delete module=repo status=ok kind={kind} id={id}");
        Ok(())
    }

    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool> {
        let exists = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", kind.table()),
            params![id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn count(&self, kind: EntityKind) -> RepoResult<u64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", kind.table()),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count for {kind}")))
    }

    fn related_ids(&self, relation: &Relation, id: EntityId) -> RepoResult<Vec<EntityId>> {
        let sql = match relation.via {
            RelationVia::Reverse { column } => format!(
                "SELECT id FROM {} WHERE {} = ?1 ORDER BY id;",
                relation.source.table(),
                quote_ident(column)
            ),
            RelationVia::ReverseLink(link) => format!(
                "SELECT {owner} FROM {table} WHERE {target} = ?1 ORDER BY {owner};",
                owner = link.owner_column,
                table = link.table,
                target = link.target_column,
            ),
        };
        collect_ids(self.conn, &sql, id)
    }

    fn superseded_by(&self, kind: EntityKind, id: EntityId) -> RepoResult<Vec<EntityId>> {
        let sql = format!(
            "SELECT id FROM {} WHERE supersedes = ?1 ORDER BY id;",
            kind.table()
        );
        collect_ids(self.conn, &sql, id)
    }
}

fn column_names<T: Entity>() -> String {
    T::COLUMNS
        .iter()
        .map(|column| quote_ident(column.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_stored<T: Entity>(row: &Row<'_>) -> rusqlite::Result<Stored<T>> {
    Ok(Stored {
        id: row.get("id")?,
        updated_by: row.get("updated_by")?,
        last_updated: row.get("last_updated")?,
        record: T::from_row(row)?,
    })
}

fn collect_ids(conn: &Connection, sql: &str, id: EntityId) -> RepoResult<Vec<EntityId>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, EntityId>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Replaces the link rows owned by `id` with the record's current targets.
fn write_links<T: Entity>(conn: &Connection, record: &T, id: EntityId) -> RepoResult<()> {
    for (link, ids) in T::LINKS.iter().zip(record.link_ids()) {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", link.table, link.owner_column),
            params![id],
        )?;

        let insert = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2);",
            link.table, link.owner_column, link.target_column
        );
        for target in ids {
            conn.execute(&insert, params![id, target])?;
        }
    }
    Ok(())
}

fn map_write_error<T: Entity>(err: rusqlite::Error, op: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            info!(
                "event=entity_write module=repo status=error op={op} kind={} error_code=duplicate",
                T::KIND
            );
            return ValidationError::Duplicate {
                fields: T::UNIQUE.to_vec(),
            }
            .into();
        }
    }

    error!(
        "event=entity_write module=repo status=error op={op} kind={} error={}",
        T::KIND,
        err
    );
    err.into()
}
