//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

use plantmon_telemetry::Metrics;

use crate::broadcast::run_broadcaster;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;
use crate::types::{
    BrokerRequest, BrokerView, Crumb, DashboardMessage, DashboardSnapshot, NodeSummary, NodeView,
    SearchQuery, SelectRequest, TreeNodeView,
};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot; the slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        dashboard_state: DashboardState,
        broadcast_tx: broadcast::Sender<String>,
        config: DashboardConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dashboard_state,
            broadcast_tx,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
            shutdown,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/", get(serve_index))
        .route("/api/tree", get(get_tree))
        .route("/api/nodes/{id}", get(get_node))
        .route("/api/nodes/{id}/path", get(get_node_path))
        .route("/api/search", get(search_nodes))
        .route("/api/selection", get(get_selection).post(post_selection))
        .route(
            "/api/broker",
            get(get_broker).post(post_broker).delete(delete_broker),
        )
        .route("/api/snapshot", get(get_snapshot))
        .route("/metrics", get(get_metrics))
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &DashboardConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Reject requests without valid credentials when basic auth is enabled.
async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.auth_enabled() && !check_basic_auth(request.headers(), &state.config) {
        return unauthorized_response();
    }
    next.run(request).await
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn get_tree(State(state): State<AppState>) -> Json<TreeNodeView> {
    Json(state.dashboard_state.tree_view())
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> DashboardResult<Json<NodeView>> {
    state
        .dashboard_state
        .node_view(&id)
        .map(Json)
        .ok_or(DashboardError::NodeNotFound(id))
}

async fn get_node_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> DashboardResult<Json<Vec<Crumb>>> {
    state
        .dashboard_state
        .breadcrumb(&id)
        .map(Json)
        .ok_or(DashboardError::NodeNotFound(id))
}

async fn search_nodes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<NodeSummary>> {
    Json(state.dashboard_state.search(&query.q))
}

async fn get_selection(State(state): State<AppState>) -> Json<Option<NodeView>> {
    Json(state.dashboard_state.selected_view())
}

async fn post_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> DashboardResult<Json<NodeView>> {
    state.dashboard_state.select(&request.id).await.map(Json)
}

async fn get_broker(State(state): State<AppState>) -> DashboardResult<Json<BrokerView>> {
    state.dashboard_state.broker_view().map(Json)
}

async fn post_broker(
    State(state): State<AppState>,
    Json(request): Json<BrokerRequest>,
) -> DashboardResult<Json<BrokerView>> {
    state.dashboard_state.connect_broker(request).await.map(Json)
}

async fn delete_broker(State(state): State<AppState>) -> DashboardResult<StatusCode> {
    if state.dashboard_state.disconnect_broker().await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

/// Get current state snapshot as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard_state.collect_snapshot())
}

/// Prometheus text exposition.
async fn get_metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.connection_limiter.try_acquire() else {
        warn!(
            current = state.connection_limiter.current_count(),
            max = state.config.max_connections,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, guard: ConnectionGuard) {
    let _guard = guard;
    Metrics::dashboard_client_connected();

    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcast_tx.subscribe();
    let mut notification_rx = state.dashboard_state.overlay().notifier().subscribe();

    // Send initial snapshot
    let initial_msg = DashboardMessage::Snapshot(state.dashboard_state.collect_snapshot());
    if let Ok(json) = serde_json::to_string(&initial_msg) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial snapshot, client disconnected");
            Metrics::dashboard_client_disconnected();
            return;
        }
    }

    // Incoming messages only matter for close detection
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        let outgoing = tokio::select! {
            () = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            result = broadcast_rx.recv() => match result {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "WebSocket client lagged, catching up");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            },
            result = notification_rx.recv() => match result {
                Ok(notification) => {
                    match serde_json::to_string(&DashboardMessage::Notification(notification)) {
                        Ok(json) => json,
                        Err(e) => {
                            debug!(error = %e, "Failed to serialize notification");
                            continue;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Notification stream lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        };

        if sender.send(Message::Text(outgoing.into())).await.is_err() {
            debug!("Failed to send message, client disconnected");
            break;
        }
    }

    incoming_task.abort();
    Metrics::dashboard_client_disconnected();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Check basic authentication.
fn check_basic_auth(headers: &HeaderMap, config: &DashboardConfig) -> bool {
    let Some(auth_str) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = auth_str.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
        return false;
    };

    let expected = format!("{}:{}", config.username, config.password);
    decoded == expected.as_bytes()
}

/// Create an unauthorized response.
fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"plantmon\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Serve the dashboard on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    // 32 messages of headroom for slow clients
    let (broadcast_tx, _) = broadcast::channel::<String>(32);

    let state = AppState::new(
        dashboard_state.clone(),
        broadcast_tx.clone(),
        config.clone(),
        shutdown.clone(),
    );
    let app = create_router(state);

    let broadcaster = tokio::spawn(run_broadcaster(
        dashboard_state,
        broadcast_tx,
        config.update_interval_ms,
        shutdown.clone(),
    ));

    info!(addr = ?listener.local_addr().ok(), "Starting dashboard server");
    let token = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await;

    shutdown.cancel();
    if let Err(e) = broadcaster.await {
        warn!(error = %e, "Broadcaster ended abnormally");
    }
    result?;
    info!("Dashboard server stopped");
    Ok(())
}

/// Bind `config.socket_address()` and serve until `shutdown` fires.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let address = config.socket_address();
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| DashboardError::InvalidAddress {
            address: address.clone(),
            source,
        })?;
    let listener = TcpListener::bind(addr).await?;
    serve(listener, dashboard_state, config, shutdown).await
}
