//! Core domain logic for the data provenance catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod api;
pub mod browse;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use api::router::ApiRouter;
pub use api::{ApiError, ApiRequest, ApiResponse};
pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::user::{Principal, User};
pub use model::{DataObject, Entity, EntityId, EntityKind, Stored, ValidationError};
pub use registry::{registry, EntityRegistry};
pub use repo::entity_repo::{EntityRepository, SqliteEntityRepository};
pub use repo::filter::FilterSet;
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::auth_service::{AuthError, AuthService};
pub use service::catalog_service::{CatalogService, Named};
pub use service::issue_service::IssueService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
