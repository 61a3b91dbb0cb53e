// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod test_config;
pub use test_config::new_test_config;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

/// Default clamp applied to `max` in paged calls when the config is silent.
pub const DEFAULT_PAGE_LIMIT: usize = 20;
/// Hard ceiling for `max` in paged calls regardless of configuration.
pub const PAGE_LIMIT_CEILING: usize = 500;
/// Service-wide ceiling for per-basket ring capacity.
pub const DEFAULT_MAX_CAPACITY: usize = 2000;
/// Ring capacity used when a create request omits one.
pub const DEFAULT_INIT_CAPACITY: usize = 200;
/// Captured request bodies are truncated beyond this many bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;
/// Number of entries kept in each top-K stats list by default.
pub const DEFAULT_STATS_TOP_K: usize = 5;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "baskets")]
    pub baskets: BasketsBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasketsBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub service: Option<Service>,
    pub forward: Option<Forward>,
    pub script: Option<Script>,
    pub persistence: Option<Persistence>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Service {
    #[serde(rename = "page_size_limit")]
    pub page_size_limit: Option<usize>,
    #[serde(rename = "max_capacity")]
    pub max_capacity: Option<usize>,
    #[serde(rename = "init_capacity")]
    pub init_capacity: Option<usize>,
    #[serde(rename = "max_body_bytes")]
    pub max_body_bytes: Option<usize>,
    #[serde(rename = "reserved_names")]
    pub reserved_names: Option<Vec<String>>,
    #[serde(rename = "master_token")]
    pub master_token: Option<String>,
    #[serde(rename = "stats_top_k")]
    pub stats_top_k: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Forward {
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Script {
    #[serde(rename = "max_operations")]
    pub max_operations: Option<u64>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Persistence {
    pub enabled: bool,
    pub file: Option<String>,
}

/// Read access to effective configuration values.
/// Accessors resolve the documented defaults so call sites never re-derive them.
pub trait ConfigTrait {
    fn is_prod(&self) -> bool;
    fn logs(&self) -> Option<&Logs>;
    fn api(&self) -> Option<&Api>;
    fn persistence(&self) -> Option<&Persistence>;

    fn page_limit(&self) -> usize;
    fn max_capacity(&self) -> usize;
    fn init_capacity(&self) -> usize;
    fn max_body_bytes(&self) -> usize;
    fn reserved_names(&self) -> Vec<String>;
    fn master_token(&self) -> Option<&str>;
    fn stats_top_k(&self) -> usize;

    fn forward_timeout(&self) -> Duration;
    fn script_max_operations(&self) -> u64;
    fn script_timeout(&self) -> Duration;
}

impl ConfigTrait for Config {
    fn is_prod(&self) -> bool {
        self.baskets.env == PROD
    }

    fn logs(&self) -> Option<&Logs> {
        self.baskets.logs.as_ref()
    }

    fn api(&self) -> Option<&Api> {
        self.baskets.api.as_ref()
    }

    fn persistence(&self) -> Option<&Persistence> {
        self.baskets.persistence.as_ref()
    }

    fn page_limit(&self) -> usize {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.page_size_limit)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(PAGE_LIMIT_CEILING)
    }

    fn max_capacity(&self) -> usize {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.max_capacity)
            .unwrap_or(DEFAULT_MAX_CAPACITY)
    }

    fn init_capacity(&self) -> usize {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.init_capacity)
            .unwrap_or(DEFAULT_INIT_CAPACITY)
            .min(self.max_capacity())
    }

    fn max_body_bytes(&self) -> usize {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    fn reserved_names(&self) -> Vec<String> {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.reserved_names.clone())
            .unwrap_or_else(|| {
                vec![
                    "api".to_string(),
                    "baskets".to_string(),
                    "web".to_string(),
                    "version".to_string(),
                ]
            })
    }

    fn master_token(&self) -> Option<&str> {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.master_token.as_deref())
            .filter(|t| !t.is_empty())
    }

    fn stats_top_k(&self) -> usize {
        self.baskets
            .service
            .as_ref()
            .and_then(|s| s.stats_top_k)
            .unwrap_or(DEFAULT_STATS_TOP_K)
            .min(PAGE_LIMIT_CEILING)
    }

    fn forward_timeout(&self) -> Duration {
        self.baskets
            .forward
            .as_ref()
            .and_then(|f| f.timeout)
            .unwrap_or(Duration::from_secs(30))
    }

    fn script_max_operations(&self) -> u64 {
        self.baskets
            .script
            .as_ref()
            .and_then(|s| s.max_operations)
            .unwrap_or(1_000_000)
    }

    fn script_timeout(&self) -> Duration {
        self.baskets
            .script
            .as_ref()
            .and_then(|s| s.timeout)
            .unwrap_or(Duration::from_millis(500))
    }
}

impl Config {
    /// Loads the configuration struct from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {:?}", path.as_ref()))?;
        Ok(cfg)
    }
}
