//! Basket lifecycle and listing endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::ConfigTrait;
use crate::model::BasketConfig;

use super::{
    basket_authorized, basket_not_found, master_authorized, store_error_response, unauthorized,
    Controller, PageQuery, ServiceState,
};

pub struct BasketsController {
    state: Arc<ServiceState>,
}

impl BasketsController {
    pub fn new(state: Arc<ServiceState>) -> Self {
        Self { state }
    }

    /// `POST /api/baskets/{name}`: creates a basket and returns its token.
    /// An empty body creates a basket with the default configuration.
    async fn handle_create(
        State(state): State<Arc<ServiceState>>,
        Path(name): Path<String>,
        body: Bytes,
    ) -> Response {
        let config: BasketConfig = if body.is_empty() {
            BasketConfig::default()
        } else {
            match serde_json::from_slice(&body) {
                Ok(config) => config,
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        format!("invalid basket configuration: {}", e),
                    )
                        .into_response();
                }
            }
        };

        match state.db.create(&name, config) {
            Ok(token) => {
                info!(
                    component = "api",
                    event = "basket_created",
                    basket = %name,
                    "basket created"
                );
                (StatusCode::CREATED, Json(json!({ "token": token }))).into_response()
            }
            Err(e) => store_error_response(e),
        }
    }

    /// `GET /api/baskets/{name}`: returns the basket configuration.
    async fn handle_get(
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
        Json(basket.config()).into_response()
    }

    /// `PUT /api/baskets/{name}`: replaces the basket configuration.
    async fn handle_update(
        State(state): State<Arc<ServiceState>>,
        Path(name): Path<String>,
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

        let config: BasketConfig = match serde_json::from_slice(&body) {
            Ok(config) => config,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("invalid basket configuration: {}", e),
                )
                    .into_response();
            }
        };

        match basket.update(config, state.cfg.max_capacity()) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => store_error_response(e),
        }
    }

    /// `DELETE /api/baskets/{name}`: removes the basket. Idempotent.
    async fn handle_delete(
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
        match state.db.delete(&name) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => store_error_response(e),
        }
    }

    /// `GET /api/baskets?max=&skip=&q=`: lists or searches basket names.
    async fn handle_list(
        State(state): State<Arc<ServiceState>>,
        Query(page): Query<PageQuery>,
        headers: HeaderMap,
    ) -> Response {
        if !master_authorized(&state, &headers) {
            return unauthorized();
        }

        let max = page.effective_max(&state.cfg);
        let skip = page.effective_skip();

        match page.q.as_deref().filter(|q| !q.is_empty()) {
            Some(query) => match state.db.find_names(query, max, skip) {
                Ok(page) => Json(page).into_response(),
                Err(e) => store_error_response(e),
            },
            None => match state.db.get_names(max, skip) {
                Ok(page) => Json(page).into_response(),
                Err(e) => store_error_response(e),
            },
        }
    }
}

impl Controller for BasketsController {
    fn add_route(&self, router: Router) -> Router {
        router
            .route(
                "/api/baskets",
                get(Self::handle_list).with_state(self.state.clone()),
            )
            .route(
                "/api/baskets/:name",
                post(Self::handle_create)
                    .get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete)
                    .with_state(self.state.clone()),
            )
    }
}
