//! User principal and API token persistence.
//!
//! # Invariants
//! - Usernames are unique and non-blank.
//! - A user owns at most one token at a time.

use crate::model::user::User;
use crate::model::{UserId, ValidationError};
use crate::repo::{RepoError, RepoResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

const USERNAME_MAX_LEN: usize = 150;

/// Repository interface for users and their tokens.
pub trait UserRepository {
    fn create_user(&self, username: &str) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user(&self, username: &str) -> RepoResult<Option<User>>;
    fn store_token(&self, user: UserId, token: &str) -> RepoResult<()>;
    /// Removes the user's token; returns whether one existed.
    fn delete_tokens(&self, user: UserId) -> RepoResult<bool>;
    fn find_token_owner(&self, token: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, username: &str) -> RepoResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::Required("username").into());
        }
        if username.chars().count() > USERNAME_MAX_LEN {
            return Err(ValidationError::TooLong {
                field: "username",
                max_len: USERNAME_MAX_LEN,
            }
            .into());
        }

        match self
            .conn
            .execute("INSERT INTO users (username) VALUES (?1);", params![username])
        {
            Ok(_) => Ok(User {
                id: self.conn.last_insert_rowid(),
                username: username.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(ValidationError::Duplicate {
                    fields: vec!["username"],
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username FROM users WHERE id = ?1;",
                params![id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_user(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username FROM users WHERE username = ?1;",
                params![username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn store_token(&self, user: UserId, token: &str) -> RepoResult<()> {
        if self.get_user(user)?.is_none() {
            return Err(RepoError::MissingPrincipal { field: "user", id: user });
        }
        self.conn.execute(
            "INSERT INTO auth_tokens (token, user_id, created) VALUES (?1, ?2, ?3);",
            params![token, user, Utc::now()],
        )?;
        Ok(())
    }

    fn delete_tokens(&self, user: UserId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM auth_tokens WHERE user_id = ?1;", params![user])?;
        Ok(changed > 0)
    }

    fn find_token_owner(&self, token: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT u.id, u.username
                 FROM auth_tokens t
                 JOIN users u ON u.id = t.user_id
                 WHERE t.token = ?1;",
                params![token],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{SqliteUserRepository, UserRepository};
    use crate::db::open_db_in_memory;
    use crate::model::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn duplicate_username_is_a_validation_error() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteUserRepository::new(&conn);
        repo.create_user("alice").expect("first user");

        let err = repo.create_user("alice").expect_err("duplicate");
        assert!(matches!(
            err,
            RepoError::Validation(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn token_lookup_resolves_owner() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteUserRepository::new(&conn);
        let user = repo.create_user("bob").expect("user");

        repo.store_token(user.id, "abc123").expect("store");
        assert_eq!(repo.find_token_owner("abc123").expect("lookup"), Some(user.clone()));
        assert!(repo.delete_tokens(user.id).expect("delete"));
        assert_eq!(repo.find_token_owner("abc123").expect("lookup"), None);
    }
}
