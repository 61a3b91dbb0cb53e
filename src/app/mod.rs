// Main basket service application wiring.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{Config, ConfigTrait};
use crate::controller::{
    BasketsController, IngestController, RequestsController, ResponsesController, ServiceState,
    StatsController, VersionController,
};
use crate::db::{self, BasketsDatabase, Dumper};
use crate::forward::Forwarder;
use crate::http::{Controller, HttpServer};
use crate::script::ScriptSandbox;

/// Encapsulates the entire service state.
#[derive(Clone)]
pub struct App {
    shutdown_token: CancellationToken,
    db: Arc<dyn BasketsDatabase>,
    dumper: Arc<Dumper>,
    server: Arc<HttpServer>,
}

impl App {
    /// Creates a new service instance: store, forwarder, sandbox, and the
    /// HTTP surface on top of them. Restores persisted baskets when enabled.
    pub async fn new(shutdown_token: CancellationToken, cfg: Config) -> Result<Self> {
        let db: Arc<dyn BasketsDatabase> = Arc::new(db::MemoryDatabase::new(
            cfg.reserved_names(),
            cfg.max_capacity(),
            cfg.init_capacity(),
        ));

        let dumper = Arc::new(Dumper::new(&cfg));
        dumper.load(&db).await?;

        let forwarder = Arc::new(Forwarder::new(cfg.forward_timeout())?);
        let sandbox = Arc::new(ScriptSandbox::new(
            cfg.script_max_operations(),
            cfg.script_timeout(),
        ));

        let master_token = match cfg.master_token() {
            Some(token) => token.to_string(),
            None => {
                let token = db::mint_token();
                info!(
                    component = "app",
                    event = "master_token_minted",
                    token = %token,
                    "no master token configured, minted one for this run"
                );
                token
            }
        };

        let state = Arc::new(ServiceState {
            cfg: cfg.clone(),
            db: db.clone(),
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

        let server = HttpServer::new(shutdown_token.clone(), cfg, controllers)?;

        Ok(Self {
            shutdown_token,
            db,
            dumper,
            server,
        })
    }

    /// Serves the HTTP surface in the background; flushes and releases the
    /// store once the server stops.
    pub async fn serve(&self, gsh: Arc<crate::shutdown::GracefulShutdown>) -> Result<()> {
        let server = self.server.clone();
        let app_for_close = self.clone();

        tokio::task::spawn(async move {
            if let Err(e) = server.listen_and_serve().await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }

            if let Err(e) = app_for_close.close().await {
                error!(
                    component = "app",
                    scope = "shutdown",
                    event = "close_failed",
                    error = %e,
                    "application close failed"
                );
            }

            gsh.done();
        });

        info!(component = "app", event = "started", "application lifecycle");
        Ok(())
    }

    /// Best-effort flush of all baskets, then store release.
    pub async fn close(&self) -> Result<()> {
        self.shutdown_token.cancel();

        if let Err(e) = self.dumper.dump(&self.db).await {
            error!(
                component = "app",
                scope = "shutdown",
                event = "dump_failed",
                error = %e,
                "failed to flush baskets to disk"
            );
        }

        self.db.release()?;
        Ok(())
    }
}
