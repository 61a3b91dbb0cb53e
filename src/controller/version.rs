//! Service version endpoint.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use super::Controller;

pub struct VersionController;

impl VersionController {
    pub fn new() -> Self {
        Self
    }

    /// `GET /api/version`: service name and version.
    async fn handle_version() -> impl IntoResponse {
        Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}

impl Controller for VersionController {
    fn add_route(&self, router: Router) -> Router {
        router.route("/api/version", get(Self::handle_version))
    }
}
