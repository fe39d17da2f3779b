//! Request dispatch over registry-generated endpoints.

use crate::api::endpoint::{ListQuery, ObjectEndpoint};
use crate::api::{ApiError, ApiRequest, ApiResponse};
use crate::model::EntityId;
use crate::registry::EntityRegistry;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::RepoError;
use crate::service::auth_service::AuthService;
use log::debug;
use rusqlite::Connection;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// One list/detail endpoint per registered type, keyed by list name.
pub struct ApiRouter<'r> {
    endpoints: BTreeMap<String, ObjectEndpoint<'r>>,
}

impl<'r> ApiRouter<'r> {
    /// Instantiates an endpoint for every registered type.
    pub fn from_registry(registry: &'r EntityRegistry, page_size: usize) -> Self {
        let endpoints = registry
            .all_entity_types()
            .map(|entry| {
                let endpoint = ObjectEndpoint::new(entry, page_size);
                (endpoint.list_name(), endpoint)
            })
            .collect();
        Self { endpoints }
    }

    pub fn endpoint(&self, list_name: &str) -> Option<&ObjectEndpoint<'r>> {
        self.endpoints.get(list_name)
    }

    /// Sorted list names of all endpoints.
    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Authenticates, routes and renders one request.
    pub fn handle(&self, conn: &Connection, request: &ApiRequest) -> ApiResponse {
        match self.dispatch(conn, request) {
            Ok(body) => {
                debug!(
                    "event=api_request module=api status=ok path={} status_code=200",
                    request.path()
                );
                ApiResponse::ok(body)
            }
            Err(err) => {
                err.log(request.path());
                ApiResponse::from(err)
            }
        }
    }

    fn dispatch(&self, conn: &Connection, request: &ApiRequest) -> Result<JsonValue, ApiError> {
        AuthService::new(SqliteUserRepository::new(conn)).authenticate(request.token())?;

        let segments: Vec<&str> = request
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Ok(self.root()),
            [list_name] => {
                let endpoint = self.resolve(list_name)?;
                let query = ListQuery::from_pairs(request.query())?;
                let page = endpoint.list(conn, &query)?;
                serde_json::to_value(page).map_err(|err| {
                    ApiError::Internal(RepoError::InvalidData(err.to_string()))
                })
            }
            [list_name, id] => {
                let endpoint = self.resolve(list_name)?;
                let id = id
                    .parse::<EntityId>()
                    .map_err(|_| ApiError::NoRoute(request.path().to_string()))?;
                endpoint.detail(conn, id)
            }
            _ => Err(ApiError::NoRoute(request.path().to_string())),
        }
    }

    fn resolve(&self, list_name: &str) -> Result<&ObjectEndpoint<'r>, ApiError> {
        self.endpoint(list_name)
            .ok_or_else(|| ApiError::UnknownType(list_name.to_string()))
    }

    /// API root: list name -> list URL.
    fn root(&self) -> JsonValue {
        let links = self
            .endpoints
            .iter()
            .map(|(name, endpoint)| (name.clone(), JsonValue::from(endpoint.list_url())))
            .collect::<Map<_, _>>();
        JsonValue::Object(links)
    }
}
