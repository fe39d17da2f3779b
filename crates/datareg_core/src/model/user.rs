//! User principals.
//!
//! The principal model is deliberately thin: a unique username and a row id
//! used for write attribution and token ownership.

use super::UserId;
use serde::{Deserialize, Serialize};

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Authenticated acting principal for one request.
///
/// Only produced by authentication or from a persisted [`User`], so write
/// attribution cannot be supplied by clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    username: String,
}

impl Principal {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}
