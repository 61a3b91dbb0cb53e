//! Tests for forward-target rewriting and transport-failure synthesis.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::forward::{forward_target, ForwardError, Forwarder};
    use crate::model::{BasketConfig, RequestRecord};

    fn make_record(path: &str, query: &str) -> RequestRecord {
        RequestRecord {
            date: 1700000000000,
            method: "GET".to_string(),
            path: path.to_string(),
            query: query.to_string(),
            headers: Default::default(),
            content_length: 0,
            body: String::new(),
            truncated: false,
        }
    }

    fn make_config(forward_url: &str, expand_path: bool) -> BasketConfig {
        BasketConfig {
            forward_url: forward_url.to_string(),
            expand_path,
            capacity: 10,
            ..BasketConfig::default()
        }
    }

    #[test]
    fn test_target_without_expansion_keeps_upstream_path() {
        let config = make_config("http://up/x/", false);
        let record = make_record("/b1/y/z", "");
        let url = forward_target(&config, "b1", &record).expect("valid target");
        assert_eq!(url.as_str(), "http://up/x/");
    }

    #[test]
    fn test_target_expands_trailing_path() {
        let config = make_config("http://up/x/", true);
        let record = make_record("/b1/y/z", "k=1");
        let url = forward_target(&config, "b1", &record).expect("valid target");
        assert_eq!(url.as_str(), "http://up/x/y/z?k=1");
    }

    #[test]
    fn test_target_expansion_ignores_bare_basket_path() {
        let config = make_config("http://up/x", true);
        let record = make_record("/b1", "");
        let url = forward_target(&config, "b1", &record).expect("valid target");
        assert_eq!(url.as_str(), "http://up/x");
    }

    #[test]
    fn test_target_merges_query_strings() {
        let config = make_config("http://up/hook?fixed=1", false);
        let record = make_record("/b1", "k=2&v=3");
        let url = forward_target(&config, "b1", &record).expect("valid target");
        assert_eq!(url.query(), Some("fixed=1&k=2&v=3"));
    }

    #[test]
    fn test_target_takes_request_query_when_upstream_has_none() {
        let config = make_config("http://up/hook", false);
        let record = make_record("/b1", "k=2");
        let url = forward_target(&config, "b1", &record).expect("valid target");
        assert_eq!(url.query(), Some("k=2"));
    }

    #[test]
    fn test_target_rejects_malformed_url() {
        let config = make_config("not a url", false);
        let record = make_record("/b1", "");
        match forward_target(&config, "b1", &record) {
            Err(ForwardError::InvalidUrl(_)) => {}
            other => panic!("expected InvalidUrl, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_upstream_synthesizes_bad_gateway() {
        let forwarder = Forwarder::new(Duration::from_secs(2)).expect("client builds");
        let config = make_config("http://127.0.0.1:1", false);
        let record = make_record("/b1", "");

        let response = forwarder
            .forward(&record, &config, "b1")
            .await
            .expect("transport failures never propagate");

        assert_eq!(response.status, 502);
        assert_eq!(
            response.headers.get("content-type").map(|v| v[0].as_str()),
            Some("text/plain")
        );
        let body = String::from_utf8(response.body).expect("plain text body");
        assert!(body.contains("b1"), "body must name the basket: {:?}", body);
    }
}
