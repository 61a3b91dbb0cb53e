// Stub upstream server that records every request it receives.

use axum::extract::Request;
use axum::response::IntoResponse;
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct UpstreamHit {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

pub struct UpstreamServer {
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<UpstreamHit>>>,
    shutdown: CancellationToken,
}

impl UpstreamServer {
    pub async fn start() -> Self {
        let hits: Arc<Mutex<Vec<UpstreamHit>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = hits.clone();

        let handler = move |request: Request| {
            let sink = sink.clone();
            async move {
                let (parts, body) = request.into_parts();
                let bytes = axum::body::to_bytes(body, usize::MAX)
                    .await
                    .unwrap_or_default();

                let mut headers = HashMap::new();
                for (name, value) in parts.headers.iter() {
                    headers.insert(
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    );
                }

                sink.lock().push(UpstreamHit {
                    method: parts.method.to_string(),
                    path: parts.uri.path().to_string(),
                    query: parts.uri.query().unwrap_or_default().to_string(),
                    headers,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });

                (
                    [("content-type", "text/plain"), ("x-upstream", "1")],
                    "upstream-ok",
                )
                    .into_response()
            }
        };

        let router = Router::new().fallback(handler);

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

        Self {
            addr,
            hits,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> Vec<UpstreamHit> {
        self.hits.lock().clone()
    }

    /// Polls until at least `n` hits arrived or the deadline passes.
    pub async fn wait_for_hits(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.hits.lock().len() >= n {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for UpstreamServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
