//! Captured HTTP request model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time;

/// Header multimap as captured from the wire: name (lowercase) to ordered values.
pub type Headers = BTreeMap<String, Vec<String>>;

/// A single captured HTTP request. Immutable once appended to a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Wall-clock milliseconds since epoch at capture.
    pub date: i64,
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Headers,
    /// Declared length from the Content-Length header. May differ from the
    /// actual body length if the client lied; both are preserved.
    #[serde(rename = "content_length")]
    pub content_length: i64,
    pub body: String,
    /// Set when the body exceeded the configured cap and was cut at capture.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl RequestRecord {
    /// Captures an inbound request into an immutable record.
    ///
    /// Bodies longer than `max_body_bytes` are cut and flagged. A body read
    /// error upstream of this call yields a record with whatever bytes were
    /// received; capture itself never fails.
    pub fn capture(
        method: &axum::http::Method,
        uri: &axum::http::Uri,
        headers: &axum::http::HeaderMap,
        body: &[u8],
        max_body_bytes: usize,
    ) -> Self {
        let mut captured: Headers = BTreeMap::new();
        for (name, value) in headers.iter() {
            let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
            captured.entry(name.as_str().to_string()).or_default().push(text);
        }

        let content_length = headers
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(body.len() as i64);

        let truncated = body.len() > max_body_bytes;
        let kept = if truncated { &body[..max_body_bytes] } else { body };

        Self {
            date: time::now_unix_millis(),
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            query: uri.query().unwrap_or_default().to_string(),
            headers: captured,
            content_length,
            body: String::from_utf8_lossy(kept).into_owned(),
            truncated,
        }
    }

    /// Tests whether `query` appears as a substring in the selected scope:
    /// `"body"`, `"query"`, `"headers"`, or anything else for all three.
    pub fn matches(&self, query: &str, scope: &str) -> bool {
        match scope {
            "body" => self.body.contains(query),
            "query" => self.query.contains(query),
            "headers" => self.header_values_contain(query),
            _ => {
                self.body.contains(query)
                    || self.query.contains(query)
                    || self.header_values_contain(query)
            }
        }
    }

    fn header_values_contain(&self, query: &str) -> bool {
        self.headers
            .values()
            .any(|values| values.iter().any(|v| v.contains(query)))
    }

    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_at(name, 0)
    }

    /// Indexed value of a header, looked up case-insensitively.
    pub fn header_at(&self, name: &str, index: usize) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .get(&name)
            .and_then(|values| values.get(index))
            .map(|v| v.as_str())
    }
}
