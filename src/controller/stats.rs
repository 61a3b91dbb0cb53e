//! Service statistics endpoint.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::config::{ConfigTrait, PAGE_LIMIT_CEILING};

use super::{master_authorized, store_error_response, unauthorized, Controller, PageQuery, ServiceState};

pub struct StatsController {
    state: Arc<ServiceState>,
}

impl StatsController {
    pub fn new(state: Arc<ServiceState>) -> Self {
        Self { state }
    }

    /// `GET /api/stats?max=`: aggregate statistics over all baskets with
    /// top-K lists bounded at `max` entries.
    async fn handle_stats(
        State(state): State<Arc<ServiceState>>,
        Query(page): Query<PageQuery>,
        headers: HeaderMap,
    ) -> Response {
        if !master_authorized(&state, &headers) {
            return unauthorized();
        }

        let top_k = page
            .max
            .unwrap_or_else(|| state.cfg.stats_top_k())
            .min(PAGE_LIMIT_CEILING);

        match state.db.get_stats(top_k) {
            Ok(stats) => Json(stats).into_response(),
            Err(e) => store_error_response(e),
        }
    }
}

impl Controller for StatsController {
    fn add_route(&self, router: Router) -> Router {
        router.route(
            "/api/stats",
            get(Self::handle_stats).with_state(self.state.clone()),
        )
    }
}
