//! Per-method response configuration endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;

use crate::model::ResponseSpec;

use super::{
    basket_authorized, basket_not_found, store_error_response, unauthorized, Controller,
    ServiceState,
};

pub struct ResponsesController {
    state: Arc<ServiceState>,
}

impl ResponsesController {
    pub fn new(state: Arc<ServiceState>) -> Self {
        Self { state }
    }

    /// `GET /api/baskets/{name}/responses/{method}`: the configured response
    /// for a method, or the default when none is set.
    async fn handle_get(
        State(state): State<Arc<ServiceState>>,
        Path((name, method)): Path<(String, String)>,
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
        let spec = basket
            .get_response(&method.to_uppercase())
            .unwrap_or_default();
        Json(spec).into_response()
    }

    /// `PUT /api/baskets/{name}/responses/{method}`: replaces the configured
    /// response for a method.
    async fn handle_set(
        State(state): State<Arc<ServiceState>>,
        Path((name, method)): Path<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let basket = match state.db.get(&name) {
            Ok(Some(basket)) => basket,
            Ok(None) => return basket_not_found(&name),
            Err(e) => return store_error_response(e),
        };
        if !basket_authorized(&state, &basket, &headers) {
            return unauthorized();
        }

        let spec: ResponseSpec = match serde_json::from_slice(&body) {
            Ok(spec) => spec,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("invalid response configuration: {}", e),
                )
                    .into_response();
            }
        };

        match basket.set_response(&method, spec) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => store_error_response(e),
        }
    }

    /// `DELETE /api/baskets/{name}/responses/{method}`: resets a method to
    /// the default response.
    async fn handle_delete(
        State(state): State<Arc<ServiceState>>,
        Path((name, method)): Path<(String, String)>,
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
        basket.delete_response(&method.to_uppercase());
        StatusCode::NO_CONTENT.into_response()
    }
}

impl Controller for ResponsesController {
    fn add_route(&self, router: Router) -> Router {
        router.route(
            "/api/baskets/:name/responses/:method",
            get(Self::handle_get)
                .put(Self::handle_set)
                .delete(Self::handle_delete)
                .with_state(self.state.clone()),
        )
    }
}
