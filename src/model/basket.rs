//! Basket configuration and page types.

use serde::{Deserialize, Serialize};
use url::Url;

use super::request::RequestRecord;
use crate::db::StoreError;

/// Per-basket settings, validated at create and update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    /// Absolute URL to relay captured requests to, or empty to disable forwarding.
    #[serde(rename = "forward_url")]
    pub forward_url: String,
    /// When set and forwarding succeeded, the upstream response replaces the configured one.
    #[serde(rename = "proxy_response")]
    pub proxy_response: bool,
    /// Disables certificate validation on the forwarding client for this basket.
    #[serde(rename = "insecure_tls")]
    pub insecure_tls: bool,
    /// Appends the trailing path beyond `/<basket>` to the forward URL's path.
    #[serde(rename = "expand_path")]
    pub expand_path: bool,
    /// Ring capacity; 0 means "use the service default".
    pub capacity: usize,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            forward_url: String::new(),
            proxy_response: false,
            insecure_tls: false,
            expand_path: false,
            capacity: 0,
        }
    }
}

impl BasketConfig {
    /// Validates capacity bounds and the forward URL.
    pub fn validate(&self, max_capacity: usize) -> Result<(), StoreError> {
        if self.capacity < 1 {
            return Err(StoreError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.capacity > max_capacity {
            return Err(StoreError::InvalidConfig(format!(
                "capacity {} exceeds the service limit of {}",
                self.capacity, max_capacity
            )));
        }
        if !self.forward_url.is_empty() {
            let url = Url::parse(&self.forward_url).map_err(|e| {
                StoreError::InvalidConfig(format!("invalid forward_url: {}", e))
            })?;
            if !url.has_host() {
                return Err(StoreError::InvalidConfig(
                    "forward_url must be an absolute URL".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Page of captured requests in newest-first order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsPage {
    pub requests: Vec<RequestRecord>,
    /// Current ring length.
    pub count: usize,
    /// Requests ever accepted by the basket; unaffected by eviction.
    #[serde(rename = "total_count")]
    pub total_count: u64,
    #[serde(rename = "has_more")]
    pub has_more: bool,
}

/// Page of search results over captured requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsQueryPage {
    pub requests: Vec<RequestRecord>,
    #[serde(rename = "has_more")]
    pub has_more: bool,
}

/// Page of basket names in stable lexicographic order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketNamesPage {
    pub names: Vec<String>,
    /// Number of baskets in the store.
    pub count: usize,
    #[serde(rename = "has_more")]
    pub has_more: bool,
}

/// Page of basket-name search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketNamesQueryPage {
    pub names: Vec<String>,
    #[serde(rename = "has_more")]
    pub has_more: bool,
}
