// HTTP controllers: one route group per concern.

pub mod baskets;
pub mod ingest;
pub mod requests;
pub mod responses;
pub mod stats;
pub mod version;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::{Config, ConfigTrait};
use crate::db::{constant_time_eq, Basket, BasketsDatabase, StoreError};
use crate::forward::Forwarder;
use crate::script::ScriptSandbox;

pub use baskets::BasketsController;
pub use ingest::IngestController;
pub use requests::RequestsController;
pub use responses::ResponsesController;
pub use stats::StatsController;
pub use version::VersionController;

/// Trait for adding routes to the HTTP server.
pub trait Controller: Send + Sync {
    /// Adds routes to the router.
    fn add_route(&self, router: Router) -> Router;
}

/// Shared handler context.
pub struct ServiceState {
    pub cfg: Config,
    pub db: Arc<dyn BasketsDatabase>,
    pub forwarder: Arc<Forwarder>,
    pub sandbox: Arc<ScriptSandbox>,
    pub master_token: String,
}

/// Common paging/search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub max: Option<usize>,
    pub skip: Option<usize>,
    pub q: Option<String>,
    #[serde(rename = "in")]
    pub scope: Option<String>,
}

impl PageQuery {
    /// Clamps the requested `max` to the service page limit (which itself
    /// never exceeds the hard ceiling).
    pub fn effective_max(&self, cfg: &Config) -> usize {
        let limit = cfg.page_limit();
        self.max.unwrap_or(limit).min(limit)
    }

    pub fn effective_skip(&self) -> usize {
        self.skip.unwrap_or(0)
    }
}

/// Extracts the caller's token from the Authorization header.
pub fn request_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
}

/// Whether the caller presented the service master token.
pub fn master_authorized(state: &ServiceState, headers: &HeaderMap) -> bool {
    request_token(headers)
        .map(|token| constant_time_eq(token, &state.master_token))
        .unwrap_or(false)
}

/// Whether the caller may administer the given basket: its own token or
/// the service master token.
pub fn basket_authorized(state: &ServiceState, basket: &Basket, headers: &HeaderMap) -> bool {
    match request_token(headers) {
        Some(token) => basket.authorize(token) || constant_time_eq(token, &state.master_token),
        None => false,
    }
}

/// Maps store errors onto admin API responses.
pub fn store_error_response(error: StoreError) -> Response {
    let status = match &error {
        StoreError::InvalidName(_) | StoreError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        StoreError::ReservedName(_) => StatusCode::FORBIDDEN,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, error.to_string()).into_response()
}

/// 401 for a missing/invalid token.
pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "invalid authorization token").into_response()
}

/// 404 for an unknown basket name.
pub fn basket_not_found(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        format!("basket '{}' does not exist", name),
    )
        .into_response()
}
