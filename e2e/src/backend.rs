//! Mock backends the balancer forwards to
//!
//! Every backend tags its responses with `x-backend: <name>` and records what
//! it received. `GET /status/<code>` answers with that status code. Backends
//! can be stopped and restarted on the same port to drive health checks.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::types::{BackendState, ReceivedRequest, SharedBackendState};

#[derive(Clone)]
struct HandlerState {
    name: String,
    log: SharedBackendState,
}

/// Catch-all handler: record the request, answer with the backend's name
async fn handle_any(State(state): State<HandlerState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, 10 * 1024 * 1024)
        .await
        .unwrap_or_default();

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let status = path
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    state.log.lock().unwrap().received_requests.push(ReceivedRequest {
        method: parts.method.to_string(),
        path,
        headers,
        body: String::from_utf8_lossy(&body_bytes).into_owned(),
    });

    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("x-backend", &state.name)
        .body(Body::from(format!("Hello from {}", state.name)))
        .unwrap()
}

/// One mock backend bound to a fixed port
pub struct MockBackend {
    pub name: String,
    pub port: u16,
    pub state: SharedBackendState,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockBackend {
    /// Start a backend named `name` on 127.0.0.1:`port`
    pub async fn start(name: &str, port: u16) -> anyhow::Result<Self> {
        let mut backend = Self {
            name: name.to_string(),
            port,
            state: std::sync::Arc::new(std::sync::Mutex::new(BackendState::default())),
            shutdown: None,
            task: None,
        };
        backend.listen().await?;
        Ok(backend)
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    async fn listen(&mut self) -> anyhow::Result<()> {
        let app = Router::new().fallback(handle_any).with_state(HandlerState {
            name: self.name.clone(),
            log: self.state.clone(),
        });

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind mock backend {} to {}: {}", self.name, addr, e))?;

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .expect("Mock backend server failed");
        });

        self.shutdown = Some(tx);
        self.task = Some(task);

        // Brief pause to let the server start accepting connections
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    /// Stop accepting connections and close the port
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .map_err(|_| anyhow::anyhow!("Mock backend {} did not shut down", self.name))?
                .map_err(|e| anyhow::anyhow!("Mock backend {} task failed: {}", self.name, e))?;
        }
        Ok(())
    }

    /// Bring a stopped backend back on the same port
    pub async fn restart(&mut self) -> anyhow::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.listen().await
    }
}

/// Start the named backends on consecutive ports beginning at `first_port`
pub async fn start_all(names: &[&str], first_port: u16) -> anyhow::Result<Vec<MockBackend>> {
    let mut backends = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        backends.push(MockBackend::start(name, first_port + i as u16).await?);
    }
    Ok(backends)
}

/// Helper to get all requests received since last clear
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}

/// Helper to clear the request log
pub fn clear_requests(state: &SharedBackendState) {
    state.lock().unwrap().received_requests.clear();
}
