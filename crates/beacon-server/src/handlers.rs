//! Connection handling for the beacon server.
//!
//! The server owns sockets and nothing else. Per socket it emits one
//! `connect`, one `message` per inbound text frame, and one `disconnect`
//! — each handled by its own spawned task over a clone of the stateless
//! router, the way a fleet of independent handlers would. Outbound
//! traffic arrives through the gateway queue and is drained into the
//! socket sink by a writer task.

use crate::config::Config;
use crate::gateway::Gateway;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use beacon_core::{ConnectionId, SignalEvent, SignalRouter};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct AppState {
    /// The stateless event router.
    pub signal: SignalRouter,
    /// This process's socket table.
    pub gateway: Arc<Gateway>,
    /// Server configuration.
    pub config: Config,
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(
    config: Config,
    signal: SignalRouter,
    gateway: Arc<Gateway>,
) -> Result<()> {
    let state = Arc::new(AppState {
        signal,
        gateway,
        config: config.clone(),
    });

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = Router::new()
        .route(&config.signal.path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("beacon server listening on {}", addr);
    info!("Signaling endpoint: ws://{}{}", addr, config.signal.path);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection from accept to teardown.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();
    let conn = ConnectionId::generate();
    debug!(conn = %conn, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Register the outbound queue before anything can publish at us.
    let mut outbound = state.gateway.register(conn.clone());

    // Writer task: drain the gateway queue into the socket sink. Ends on
    // its own once the gateway entry (and thus the queue sender) is gone.
    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            metrics::record_frame(payload.len(), "outbound");
            let text = String::from_utf8_lossy(&payload).into_owned();
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    dispatch_event(state.clone(), SignalEvent::Connect(conn.clone())).await;

    // Read loop: one spawned event unit per inbound frame.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if text.len() > state.config.frame_cap() {
                    debug!(conn = %conn, size = text.len(), "dropping oversized frame");
                    continue;
                }
                metrics::record_frame(text.len(), "inbound");

                let state = state.clone();
                let conn = conn.clone();
                tokio::spawn(async move {
                    dispatch_event(state, SignalEvent::Message(conn, text)).await;
                });
            }
            Ok(Message::Binary(_)) => {
                debug!(conn = %conn, "dropping binary frame; protocol is text");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // WebSocket-level keepalive is handled underneath us.
            }
            Ok(Message::Close(_)) => {
                debug!(conn = %conn, "received close frame");
                break;
            }
            Err(e) => {
                warn!(conn = %conn, error = %e, "WebSocket error");
                metrics::record_error("websocket");
                break;
            }
        }
    }

    // Closing the gateway entry ends the writer; pushes fail as gone.
    state.gateway.unregister(&conn);
    dispatch_event(state, SignalEvent::Disconnect(conn.clone())).await;
    let _ = writer.await;

    debug!(conn = %conn, "WebSocket disconnected");
}

/// Run one event through the router, retrying transient failures within
/// the configured budget.
async fn dispatch_event(state: Arc<AppState>, event: SignalEvent) {
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match state.signal.handle(event.clone()).await {
            Ok(outcome) => {
                metrics::record_deliveries(outcome.delivered, outcome.stale, outcome.failed);
                metrics::record_event_latency(start.elapsed().as_secs_f64());
                return;
            }
            Err(e) if attempt < state.config.events.retry_budget => {
                attempt += 1;
                warn!(error = %e, attempt, "transient event failure, retrying");
                tokio::time::sleep(Duration::from_millis(state.config.events.retry_delay_ms))
                    .await;
            }
            Err(e) => {
                // The client's own reconnect cycle re-establishes state.
                error!(error = %e, "event dropped after retries");
                metrics::record_error("event");
                return;
            }
        }
    }
}
