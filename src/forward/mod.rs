//! Relaying captured requests to a configured upstream.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::model::{BasketConfig, Headers, RequestRecord};

#[cfg(test)]
mod forward_test;

/// Presence of this header on an inbound request suppresses forwarding;
/// the forwarder always sets it on outbound requests. Breaks forwarding
/// loops when a basket's forward target points at another basket.
pub const DO_NOT_FORWARD_HEADER: &str = "x-do-not-forward";

/// Hop-by-hop headers that must not be relayed.
const HOP_BY_HOP: &[&str] = &["connection", "upgrade", "te"];

/// Headers the client derives itself from the rebuilt request.
const CLIENT_OWNED: &[&str] = &["host", "content-length"];

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid forward url: {0}")]
    InvalidUrl(String),
}

/// Upstream reply (or a synthesized one) carried back to the ingest path.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Forwarding client pair shared across baskets.
///
/// Certificate validation is a per-basket setting, so two clients are kept:
/// a strict one and a lax one with validation disabled, selected per request.
pub struct Forwarder {
    strict: reqwest::Client,
    insecure: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let strict = reqwest::Client::builder().timeout(timeout).build()?;
        let insecure = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            strict,
            insecure,
            timeout,
        })
    }

    fn client(&self, insecure_tls: bool) -> &reqwest::Client {
        if insecure_tls {
            &self.insecure
        } else {
            &self.strict
        }
    }

    /// Relays a captured request to the basket's forward target.
    ///
    /// A malformed forward URL is the only error this returns; transport
    /// failures are swallowed into a synthesized 502 reply so the ingest
    /// path never fails the inbound caller over an upstream outage.
    pub async fn forward(
        &self,
        record: &RequestRecord,
        config: &BasketConfig,
        basket: &str,
    ) -> Result<ForwardedResponse, ForwardError> {
        let target = forward_target(config, basket, record)?;

        let method = reqwest::Method::from_bytes(record.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);

        let mut headers = reqwest::header::HeaderMap::new();
        for (name, values) in &record.headers {
            if HOP_BY_HOP.contains(&name.as_str()) || CLIENT_OWNED.contains(&name.as_str()) {
                continue;
            }
            let header_name = match reqwest::header::HeaderName::from_bytes(name.as_bytes()) {
                Ok(n) => n,
                Err(_) => continue,
            };
            for value in values {
                if let Ok(v) = reqwest::header::HeaderValue::from_str(value) {
                    headers.append(header_name.clone(), v);
                }
            }
        }
        headers.insert(
            reqwest::header::HeaderName::from_static(DO_NOT_FORWARD_HEADER),
            reqwest::header::HeaderValue::from_static("1"),
        );

        debug!(
            component = "forwarder",
            event = "forward",
            basket = basket,
            target = %target,
            method = %method,
            "forwarding captured request"
        );

        let result = self
            .client(config.insecure_tls)
            .request(method, target.clone())
            .headers(headers)
            .body(record.body.clone().into_bytes())
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let mut headers: Headers = BTreeMap::new();
                for (name, value) in response.headers().iter() {
                    headers
                        .entry(name.as_str().to_string())
                        .or_default()
                        .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
                }
                let body = response.bytes().await.unwrap_or_default().to_vec();
                Ok(ForwardedResponse {
                    status,
                    headers,
                    body,
                })
            }
            Err(e) => {
                warn!(
                    component = "forwarder",
                    event = "forward_failed",
                    basket = basket,
                    target = %target,
                    error = %e,
                    "upstream unreachable, synthesizing 502"
                );
                Ok(synthesize_bad_gateway(basket, &e))
            }
        }
    }
}

/// Computes the upstream URL: path expansion beyond `/<basket>` when enabled,
/// then a merge of the captured query string with the target's own.
pub fn forward_target(
    config: &BasketConfig,
    basket: &str,
    record: &RequestRecord,
) -> Result<Url, ForwardError> {
    let mut url = Url::parse(&config.forward_url)
        .map_err(|e| ForwardError::InvalidUrl(format!("{}: {}", config.forward_url, e)))?;

    let prefix_len = basket.len() + 1;
    if config.expand_path && record.path.len() > prefix_len {
        let suffix = &record.path[prefix_len..];
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", base, suffix));
    }

    if !record.query.is_empty() {
        let merged = match url.query() {
            Some(existing) if !existing.is_empty() => {
                format!("{}&{}", existing, record.query)
            }
            _ => record.query.clone(),
        };
        url.set_query(Some(&merged));
    }

    Ok(url)
}

fn synthesize_bad_gateway(basket: &str, error: &reqwest::Error) -> ForwardedResponse {
    let mut headers: Headers = BTreeMap::new();
    headers.insert(
        "content-type".to_string(),
        vec!["text/plain".to_string()],
    );
    ForwardedResponse {
        status: 502,
        headers,
        body: format!(
            "failed to forward request for basket '{}': {}",
            basket, error
        )
        .into_bytes(),
    }
}
