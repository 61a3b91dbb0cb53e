//! Request intake: capture, store, forward, respond.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::ConfigTrait;
use crate::forward::{ForwardedResponse, DO_NOT_FORWARD_HEADER};
use crate::model::{Headers, RequestRecord, ResponseSpec};
use crate::script::ScriptError;

use super::{basket_not_found, Controller, ServiceState};

pub struct IngestController {
    state: Arc<ServiceState>,
}

impl IngestController {
    pub fn new(state: Arc<ServiceState>) -> Self {
        Self { state }
    }

    /// Any method on `/{basket}` or `/{basket}/...` is captured into the
    /// named basket. The reply is the configured response for the method,
    /// or the upstream's when forwarding with `proxy_response` set.
    ///
    /// This path never fails the caller over internal errors: upstream
    /// outages synthesize a 502, a bad forward URL only logs.
    async fn handle_ingest(State(state): State<Arc<ServiceState>>, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        let name = parts
            .uri
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let basket = match state.db.get(&name) {
            Ok(Some(basket)) => basket,
            Ok(None) | Err(_) => return basket_not_found(&name),
        };

        let cap = state.cfg.max_body_bytes();
        let bytes = collect_body(body, cap).await;
        let record =
            RequestRecord::capture(&parts.method, &parts.uri, &parts.headers, &bytes, cap);

        let config = basket.config();
        let record = basket.add(record);

        // A request that already carries the marker must not be relayed,
        // or two baskets pointing at each other would loop forever.
        let should_forward = !config.forward_url.is_empty()
            && !parts.headers.contains_key(DO_NOT_FORWARD_HEADER);

        if should_forward && config.proxy_response {
            match state.forwarder.forward(&record, &config, &name).await {
                Ok(upstream) => return proxied_response(upstream),
                Err(e) => {
                    error!(
                        component = "ingest",
                        event = "forward_url_invalid",
                        basket = %name,
                        error = %e,
                        "forward target rejected, serving configured response"
                    );
                }
            }
        } else if should_forward {
            let forwarder = state.forwarder.clone();
            let record = record.clone();
            let config = config.clone();
            let name = name.clone();
            tokio::task::spawn(async move {
                if let Err(e) = forwarder.forward(&record, &config, &name).await {
                    error!(
                        component = "ingest",
                        event = "forward_url_invalid",
                        basket = %name,
                        error = %e,
                        "forward target rejected"
                    );
                }
            });
        }

        Self::configured_response(&state, &basket, &name, &record).await
    }

    /// Evaluates the response spec for the captured method: a script if one
    /// is set, else a template, else the body verbatim.
    async fn configured_response(
        state: &Arc<ServiceState>,
        basket: &Arc<crate::db::Basket>,
        name: &str,
        record: &RequestRecord,
    ) -> Response {
        let spec = basket
            .get_response(&record.method)
            .or_else(|| basket.get_response(""))
            .unwrap_or_default();

        let body = if spec.is_script {
            match evaluate_script(state, name, &spec, record).await {
                Ok(output) => output.into_bytes(),
                Err(e) => {
                    warn!(
                        component = "ingest",
                        event = "script_failed",
                        basket = %name,
                        error = %e,
                        "response script failed"
                    );
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("response script failed: {}", e),
                    )
                        .into_response();
                }
            }
        } else if spec.is_template {
            spec.expand_template(record).into_bytes()
        } else {
            spec.body.clone().into_bytes()
        };

        build_response(spec.status, &spec.headers, body, false)
    }
}

async fn evaluate_script(
    state: &Arc<ServiceState>,
    name: &str,
    spec: &ResponseSpec,
    record: &RequestRecord,
) -> Result<String, ScriptError> {
    let sandbox = state.sandbox.clone();
    let basket = name.to_string();
    let script = spec.body.clone();
    let record = record.clone();
    tokio::task::spawn_blocking(move || sandbox.eval(&basket, &script, &record))
        .await
        .map_err(|e| ScriptError::Eval(e.to_string()))?
}

/// Reads the request body, stopping one byte past the cap so capture can
/// flag the truncation. Read errors yield whatever bytes arrived.
async fn collect_body(body: axum::body::Body, cap: usize) -> Vec<u8> {
    let limit = cap.saturating_add(1);
    let mut stream = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                let room = limit - buf.len();
                if bytes.len() >= room {
                    buf.extend_from_slice(&bytes[..room]);
                    break;
                }
                buf.extend_from_slice(&bytes);
            }
            Err(_) => break,
        }
    }
    buf
}

fn proxied_response(upstream: ForwardedResponse) -> Response {
    build_response(upstream.status, &upstream.headers, upstream.body, true)
}

fn build_response(status: u16, headers: &Headers, body: Vec<u8>, proxied: bool) -> Response {
    let mut header_map = HeaderMap::new();
    for (name, values) in headers {
        // The entity framing of a proxied reply is rebuilt for this hop.
        if proxied && matches!(name.as_str(), "content-length" | "transfer-encoding") {
            continue;
        }
        let header_name = match HeaderName::try_from(name.as_str()) {
            Ok(n) => n,
            Err(_) => continue,
        };
        for value in values {
            if let Ok(v) = HeaderValue::from_str(value) {
                header_map.append(header_name.clone(), v);
            }
        }
    }

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    (status, header_map, body).into_response()
}

impl Controller for IngestController {
    fn add_route(&self, router: Router) -> Router {
        router
            .route(
                "/:basket",
                any(Self::handle_ingest).with_state(self.state.clone()),
            )
            .route(
                "/:basket/*path",
                any(Self::handle_ingest).with_state(self.state.clone()),
            )
    }
}
