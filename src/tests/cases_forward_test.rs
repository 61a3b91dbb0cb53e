//! Forwarding cases: proxying, loop protection, path expansion, outages.

use std::time::Duration;

use crate::support::{TestService, UpstreamServer};

#[tokio::test]
async fn test_proxy_response_relays_upstream_reply() {
    let upstream = UpstreamServer::start().await;
    let service = TestService::start().await;
    let client = reqwest::Client::new();

    let config = format!(
        r#"{{"capacity": 10, "forward_url": "{}", "proxy_response": true}}"#,
        upstream.url("/hook")
    );
    let token = service.create_basket("proxied", &config).await;

    let response = client
        .post(service.url("/proxied"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-upstream"], "1");
    assert_eq!(response.text().await.unwrap(), "upstream-ok");

    let hits = upstream.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, "POST");
    assert_eq!(hits[0].path, "/hook");
    assert_eq!(hits[0].body, "payload");
    assert_eq!(hits[0].headers.get("x-do-not-forward").map(String::as_str), Some("1"));

    // The request is captured locally as well.
    let response = client
        .get(service.url("/api/baskets/proxied/requests"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page["total_count"], 1);

    service.stop();
    upstream.stop();
}

#[tokio::test]
async fn test_do_not_forward_marker_suppresses_relay() {
    let upstream = UpstreamServer::start().await;
    let service = TestService::start().await;
    let client = reqwest::Client::new();

    let config = format!(
        r#"{{"capacity": 10, "forward_url": "{}", "proxy_response": true}}"#,
        upstream.url("/hook")
    );
    let token = service.create_basket("looped", &config).await;

    let response = client
        .post(service.url("/looped"))
        .header("x-do-not-forward", "1")
        .body("x")
        .send()
        .await
        .unwrap();
    // No relay happens, so the configured (default) response is served.
    assert_eq!(response.status(), 200);

    // Captured, but the upstream never saw it.
    let response = client
        .get(service.url("/api/baskets/looped/requests"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page["total_count"], 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(upstream.hits().is_empty());

    service.stop();
    upstream.stop();
}

#[tokio::test]
async fn test_expand_path_rewrites_target() {
    let upstream = UpstreamServer::start().await;
    let service = TestService::start().await;
    let client = reqwest::Client::new();

    let config = format!(
        r#"{{"capacity": 10, "forward_url": "{}", "proxy_response": true, "expand_path": true}}"#,
        upstream.url("/x/")
    );
    service.create_basket("expanded", &config).await;

    let response = client
        .get(service.url("/expanded/y/z?k=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let hits = upstream.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].method, "GET");
    assert_eq!(hits[0].path, "/x/y/z");
    assert_eq!(hits[0].query, "k=1");
    assert_eq!(hits[0].headers.get("x-do-not-forward").map(String::as_str), Some("1"));

    service.stop();
    upstream.stop();
}

#[tokio::test]
async fn test_unreachable_upstream_yields_bad_gateway() {
    let service = TestService::start().await;
    let client = reqwest::Client::new();

    let token = service
        .create_basket(
            "unreachable",
            r#"{"capacity": 10, "forward_url": "http://127.0.0.1:1", "proxy_response": true}"#,
        )
        .await;

    let response = client
        .post(service.url("/unreachable"))
        .body("hi")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert_eq!(response.headers()["content-type"], "text/plain");
    let body = response.text().await.unwrap();
    assert!(body.contains("unreachable"), "502 body names the basket: {:?}", body);

    // The outage never prevents capture.
    let response = client
        .get(service.url("/api/baskets/unreachable/requests"))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["requests"][0]["body"], "hi");

    service.stop();
}

#[tokio::test]
async fn test_forward_without_proxy_serves_configured_response() {
    let upstream = UpstreamServer::start().await;
    let service = TestService::start().await;
    let client = reqwest::Client::new();

    let config = format!(
        r#"{{"capacity": 10, "forward_url": "{}"}}"#,
        upstream.url("/hook")
    );
    let token = service.create_basket("fire-and-forget", &config).await;

    client
        .put(service.url("/api/baskets/fire-and-forget/responses/POST"))
        .header("Authorization", &token)
        .body(r#"{"status": 202, "body": "accepted"}"#)
        .send()
        .await
        .unwrap();

    let response = client
        .post(service.url("/fire-and-forget"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    assert_eq!(response.text().await.unwrap(), "accepted");

    // The relay still happens in the background.
    assert!(upstream.wait_for_hits(1, Duration::from_secs(3)).await);

    service.stop();
    upstream.stop();
}
