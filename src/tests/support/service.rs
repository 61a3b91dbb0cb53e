// In-process service instance bound to an ephemeral port.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Config, ConfigTrait};
use crate::controller::{
    BasketsController, IngestController, RequestsController, ResponsesController, ServiceState,
    StatsController, VersionController,
};
use crate::db::{BasketsDatabase, MemoryDatabase};
use crate::forward::Forwarder;
use crate::http::Controller;
use crate::script::ScriptSandbox;

pub struct TestService {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestService {
    /// Starts a service with the stock test configuration.
    pub async fn start() -> Self {
        Self::start_with(config::new_test_config()).await
    }

    /// Starts a service with a caller-tuned configuration.
    pub async fn start_with(cfg: Config) -> Self {
        let db: Arc<dyn BasketsDatabase> = Arc::new(MemoryDatabase::new(
            cfg.reserved_names(),
            cfg.max_capacity(),
            cfg.init_capacity(),
        ));
        let forwarder =
            Arc::new(Forwarder::new(cfg.forward_timeout()).expect("forward client must build"));
        let sandbox = Arc::new(ScriptSandbox::new(
            cfg.script_max_operations(),
            cfg.script_timeout(),
        ));
        let master_token = cfg
            .master_token()
            .unwrap_or(super::MASTER_TOKEN)
            .to_string();

        let state = Arc::new(ServiceState {
            cfg,
            db,
            forwarder,
            sandbox,
            master_token,
        });

        let controllers: Vec<Box<dyn Controller>> = vec![
            Box::new(BasketsController::new(state.clone())),
            Box::new(RequestsController::new(state.clone())),
            Box::new(ResponsesController::new(state.clone())),
            Box::new(StatsController::new(state.clone())),
            Box::new(VersionController::new()),
            Box::new(IngestController::new(state.clone())),
        ];

        let mut router = Router::new();
        for controller in &controllers {
            router = controller.add_route(router);
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral bind must succeed");
        let addr = listener.local_addr().expect("bound address");

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::task::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .ok();
        });

        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Creates a basket through the REST API and returns its token.
    pub async fn create_basket(&self, name: &str, config_json: &str) -> String {
        let client = reqwest::Client::new();
        let response = client
            .post(self.url(&format!("/api/baskets/{}", name)))
            .body(config_json.to_string())
            .send()
            .await
            .expect("create request must reach the service");
        assert_eq!(response.status(), 201, "basket create must succeed");
        let payload: serde_json::Value =
            response.json().await.expect("create returns JSON");
        payload["token"]
            .as_str()
            .expect("create returns a token")
            .to_string()
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
