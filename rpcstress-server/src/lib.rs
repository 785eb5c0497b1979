use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rpcstress_common::{Args, Reply, RpcRequest, RpcResponse, DEFAULT_METHOD};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub mod config;

#[derive(Clone)]
pub struct AppState {
    /// Latency added to every RPC before it is answered.
    pub delay: Duration,
    /// Number of RPCs received, answered or not.
    pub calls: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(delay: Duration) -> Self {
        Self { delay, calls: Arc::new(AtomicU64::new(0)) }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub delay: Duration,
}

/// Reference RPC server
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handle_health))
            .route("/rpc", post(handle_rpc))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let state = AppState::new(self.config.delay);
        self.run_with_state(state, ready_tx).await
    }

    /// Like [`Server::run`], but serving a caller-provided state so the caller can observe it.
    pub async fn run_with_state(
        self,
        state: AppState,
        ready_tx: tokio::sync::oneshot::Sender<SocketAddr>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, delay = ?state.delay, "rpc server listening");
        ready_tx.send(local_addr).ok();
        let app = Self::create_router(state);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Handler for GET /health — answers as soon as the server accepts connections.
pub async fn handle_health() -> &'static str {
    "ok"
}

/// Handler for POST /rpc — dispatches the envelope to the named method after the configured delay.
pub async fn handle_rpc(State(state): State<AppState>, Json(request): Json<RpcRequest>) -> Json<RpcResponse> {
    state.calls.fetch_add(1, Ordering::Relaxed);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    Json(dispatch(&request))
}

/// Route a request to its method. Unknown methods and bad params produce an error envelope.
pub fn dispatch(request: &RpcRequest) -> RpcResponse {
    let outcome = match request.method.as_str() {
        DEFAULT_METHOD => multiply(&request.params),
        other => Err(format!("rpc: can't find method {}", other)),
    };

    match outcome {
        Ok(result) => RpcResponse::ok(&request.id, result),
        Err(error) => {
            debug!(method = %request.method, %error, "rpc failed");
            RpcResponse::err(&request.id, error)
        }
    }
}

fn multiply(params: &Value) -> Result<Value, String> {
    let args: Args = serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))?;
    let result = args
        .a
        .checked_mul(args.b)
        .ok_or_else(|| format!("overflow multiplying {} by {}", args.a, args.b))?;
    serde_json::to_value(Reply { result }).map_err(|e| e.to_string())
}
