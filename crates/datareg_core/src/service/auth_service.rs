//! Token authentication for catalog requests.
//!
//! # Responsibility
//! - Register users and issue/revoke their API tokens.
//! - Resolve a request token into the acting [`Principal`].
//!
//! # Invariants
//! - A user holds at most one token; issuing replaces the previous one.
//! - Authentication failures never reveal whether a user exists.

use crate::model::user::{Principal, User};
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TOKEN_SCHEME: &str = "Token";

/// Authorization failure, reported before any catalog logic runs.
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken,
    Repo(RepoError),
}

impl AuthError {
    /// Client-facing detail message.
    pub fn detail(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Authentication credentials were not provided.",
            Self::InvalidToken | Self::Repo(_) => "Invalid token.",
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "token lookup failed: {err}"),
            other => f.write_str(other.detail()),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Extracts the token from an `Authorization: Token <key>` header value.
pub fn parse_authorization_header(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme == TOKEN_SCHEME && !token.is_empty()).then_some(token)
}

/// Use-case service for users and tokens.
pub struct AuthService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn register_user(&self, username: &str) -> RepoResult<User> {
        let user = self.repo.create_user(username)?;
        info!(
            "event=user_register module=auth status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> RepoResult<Option<User>> {
        self.repo.find_user(username)
    }

    /// Issues a fresh token for `user`, replacing any existing one.
    pub fn issue_token(&self, user: &User) -> RepoResult<String> {
        self.repo.delete_tokens(user.id)?;
        let token = Uuid::new_v4().simple().to_string();
        self.repo.store_token(user.id, &token)?;
        info!("event=token_issue module=auth status=ok user_id={}", user.id);
        Ok(token)
    }

    /// Revokes the user's token; returns whether one existed.
    pub fn revoke_token(&self, user: &User) -> RepoResult<bool> {
        let revoked = self.repo.delete_tokens(user.id)?;
        info!(
            "event=token_revoke module=auth status=ok user_id={} revoked={}",
            user.id, revoked
        );
        Ok(revoked)
    }

    /// Resolves the acting principal for a request token.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
            warn!("event=auth_reject module=auth status=error error_code=missing_credentials");
            return Err(AuthError::MissingCredentials);
        };

        match self.repo.find_token_owner(token)? {
            Some(user) => Ok(Principal::from(&user)),
            None => {
                warn!("event=auth_reject module=auth status=error error_code=invalid_token");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
