//! Captured-request listing, search and clearing endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use super::{
    basket_authorized, basket_not_found, store_error_response, unauthorized, Controller,
    PageQuery, ServiceState,
};

pub struct RequestsController {
    state: Arc<ServiceState>,
}

impl RequestsController {
    pub fn new(state: Arc<ServiceState>) -> Self {
        Self { state }
    }

    /// `GET /api/baskets/{name}/requests?max=&skip=&q=&in=`: pages the ring
    /// newest-first; with `q` it searches instead, scoped by `in`.
    async fn handle_list(
        State(state): State<Arc<ServiceState>>,
        Path(name): Path<String>,
        Query(page): Query<PageQuery>,
        headers: HeaderMap,
    ) -> Response {
        let basket = match state.db.get(&name) {
            Ok(Some(basket)) => basket,
            Ok(None) => return basket_not_found(&name),
            Err(e) => return store_error_response(e),
        };
        if !basket_authorized(&state, &basket, &headers) {
            return unauthorized();
        }

        let max = page.effective_max(&state.cfg);
        let skip = page.effective_skip();

        match page.q.as_deref().filter(|q| !q.is_empty()) {
            Some(query) => {
                let scope = page.scope.as_deref().unwrap_or("");
                Json(basket.find_requests(query, scope, max, skip)).into_response()
            }
            None => Json(basket.get_requests(max, skip)).into_response(),
        }
    }

    /// `DELETE /api/baskets/{name}/requests`: empties the ring.
    async fn handle_clear(
        State(state): State<Arc<ServiceState>>,
        Path(name): Path<String>,
        headers: HeaderMap,
    ) -> Response {
        let basket = match state.db.get(&name) {
            Ok(Some(basket)) => basket,
            Ok(None) => return basket_not_found(&name),
            Err(e) => return store_error_response(e),
        };
        if !basket_authorized(&state, &basket, &headers) {
            return unauthorized();
        }
        basket.clear();
        StatusCode::NO_CONTENT.into_response()
    }
}

impl Controller for RequestsController {
    fn add_route(&self, router: Router) -> Router {
        router.route(
            "/api/baskets/:name/requests",
            get(Self::handle_list)
                .delete(Self::handle_clear)
                .with_state(self.state.clone()),
        )
    }
}
