use super::{Api, BasketsBox, Config, Forward, Logs, Persistence, Script, Service};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        baskets: BasketsBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            api: Some(Api {
                name: Some("rbaskets".to_string()),
                port: Some("0".to_string()),
            }),
            service: Some(Service {
                page_size_limit: Some(20),
                max_capacity: Some(200),
                init_capacity: Some(20),
                max_body_bytes: Some(64 << 10),
                reserved_names: Some(vec![
                    "api".to_string(),
                    "baskets".to_string(),
                    "web".to_string(),
                    "version".to_string(),
                ]),
                master_token: Some("test-master-token-0123456789".to_string()),
                stats_top_k: Some(5),
            }),
            forward: Some(Forward {
                timeout: Some(Duration::from_secs(5)),
            }),
            script: Some(Script {
                max_operations: Some(100_000),
                timeout: Some(Duration::from_millis(200)),
            }),
            persistence: Some(Persistence {
                enabled: false,
                file: None,
            }),
        },
    }
}
