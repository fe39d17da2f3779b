//! Read API surface generated from the entity registry.
//!
//! # Responsibility
//! - Model transport-neutral requests/responses for list and detail reads.
//! - Map the catalog error taxonomy onto status codes and payloads.
//!
//! # Invariants
//! - Authentication runs before any routing or catalog access.
//! - Unknown type names and unknown ids are both 404, with distinct codes.
//! - Authorization failures carry exactly `{"detail": "..."}`.
//!
//! # See also
//! - crate::registry

pub mod endpoint;
pub mod router;

use crate::model::{EntityId, EntityKind, ValidationError};
use crate::repo::RepoError;
use crate::service::auth_service::{parse_authorization_header, AuthError};
use log::{error, warn};
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One read request: path, decoded query pairs and bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    path: String,
    query: Vec<(String, String)>,
    token: Option<String>,
}

impl ApiRequest {
    /// Builds a request from `path[?query]`.
    pub fn get(target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            token: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Takes the token from an `Authorization` header value.
    pub fn with_authorization(mut self, header: &str) -> Self {
        self.token = parse_authorization_header(header).map(str::to_string);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl ApiResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        Self {
            status: err.status(),
            body: err.body(),
        }
    }
}

/// Endpoint failure mapped to a client-visible status.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// Type name not in the registry.
    UnknownType(String),
    /// Unknown id of a known type.
    NotFound { kind: EntityKind, id: EntityId },
    /// Path shape matches no endpoint.
    NoRoute(String),
    InvalidPage(String),
    Validation(ValidationError),
    /// Dangling or unresolvable persisted reference.
    Integrity(RepoError),
    Internal(RepoError),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Auth(_) => 403,
            Self::UnknownType(_) | Self::NotFound { .. } | Self::NoRoute(_) | Self::InvalidPage(_) => {
                404
            }
            Self::Validation(_) => 400,
            Self::Integrity(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::MissingCredentials) => "not_authenticated",
            Self::Auth(_) => "authentication_failed",
            Self::UnknownType(_) => "unknown_type",
            Self::NotFound { .. } => "not_found",
            Self::NoRoute(_) => "no_route",
            Self::InvalidPage(_) => "invalid_page",
            Self::Validation(_) => "invalid",
            Self::Integrity(_) => "integrity_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn body(&self) -> JsonValue {
        match self {
            Self::Auth(err) => json!({ "detail": err.detail() }),
            Self::Validation(err) => json!({
                "detail": err.to_string(),
                "code": self.code(),
                "fields": err.fields(),
            }),
            Self::NotFound { .. } | Self::NoRoute(_) => json!({
                "detail": "Not found.",
                "code": self.code(),
            }),
            Self::InvalidPage(_) => json!({
                "detail": "Invalid page.",
                "code": self.code(),
            }),
            Self::Integrity(_) | Self::Internal(_) => json!({
                "detail": "Internal error.",
                "code": self.code(),
            }),
            Self::UnknownType(_) => json!({
                "detail": self.to_string(),
                "code": self.code(),
            }),
        }
    }

    pub(crate) fn log(&self, path: &str) {
        if self.status() >= 500 {
            error!(
                "event=api_request module=api status=error path={} status_code={} error_code={} error={}",
                path,
                self.status(),
                self.code(),
                self
            );
        } else {
            warn!(
                "event=api_request module=api status=error path={} status_code={} error_code={}",
                path,
                self.status(),
                self.code()
            );
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(err) => write!(f, "{err}"),
            Self::UnknownType(name) => write!(f, "Unknown type `{name}`."),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::NoRoute(path) => write!(f, "no endpoint for `{path}`"),
            Self::InvalidPage(page) => write!(f, "invalid page `{page}`"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Integrity(err) | Self::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Integrity(err) | Self::Internal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::UnknownType(name) => Self::UnknownType(name),
            other if other.is_reference() => Self::Integrity(other),
            other => Self::Internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ApiRequest};
    use crate::model::EntityKind;
    use crate::service::auth_service::AuthError;
    use serde_json::json;

    #[test]
    fn parses_path_and_query() {
        let request = ApiRequest::get("/sources/?name=Journal%20X&page=2").with_token("t");
        assert_eq!(request.path(), "/sources/");
        assert_eq!(
            request.query(),
            &[
                ("name".to_string(), "Journal X".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
        assert_eq!(request.token(), Some("t"));
    }

    #[test]
    fn with_query_appends_after_parsed_pairs() {
        let request = ApiRequest::get("/issues/?page=1").with_query("severity", "6");
        assert_eq!(
            request.query(),
            &[
                ("page".to_string(), "1".to_string()),
                ("severity".to_string(), "6".to_string())
            ]
        );
    }

    #[test]
    fn authorization_header_sets_token() {
        let request = ApiRequest::get("/").with_authorization("Token abc");
        assert_eq!(request.token(), Some("abc"));
    }

    #[test]
    fn auth_errors_render_detail_only() {
        let err = ApiError::from(AuthError::MissingCredentials);
        assert_eq!(err.status(), 403);
        assert_eq!(
            err.body(),
            json!({ "detail": "Authentication credentials were not provided." })
        );
    }

    #[test]
    fn unknown_type_and_unknown_id_are_distinguishable() {
        let unknown_type = ApiError::UnknownType("widgets".to_string());
        let unknown_id = ApiError::NotFound {
            kind: EntityKind::Source,
            id: 9,
        };
        assert_eq!(unknown_type.status(), 404);
        assert_eq!(unknown_id.status(), 404);
        assert_ne!(unknown_type.body()["code"], unknown_id.body()["code"]);
    }
}
