//! Connection handlers for the Surge server.
//!
//! This module terminates WebSocket connections and HTTP publishes and
//! routes them into the application state block. All protocol semantics
//! live in `surge-core`; this layer only moves frames.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use surge_core::{App, AppConfig};
use surge_protocol::codec;
use surge_protocol::message::{codes, OutboundMessage, PublishRequest};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Shared server state.
pub struct ServerState {
    /// The application state block.
    pub app: App,
    /// Server configuration.
    pub config: Config,
}

impl ServerState {
    /// Create new server state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let app_config = AppConfig::new(config.app.key.clone(), config.app.secret.clone())
            .with_activity_timeout(config.app.activity_timeout_secs);

        Self {
            app: App::new(app_config),
            config,
        }
    }
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(ServerState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    // Build router; unknown routes and methods both answer 404
    let router = Router::new()
        .route("/app/:key", get(ws_handler).fallback(not_found))
        .route("/apps/:app_id/events", post(publish_handler).fallback(not_found))
        .route("/health", get(health_handler))
        .fallback(not_found)
        .with_state(state);

    // Bind and serve
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Surge server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/app/{}", addr, config.app.key);

    axum::serve(listener, router).await?;

    Ok(())
}

/// Fixed 404 for unknown routes and methods.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(key): Path<String>,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, key))
}

/// Handle a WebSocket connection for its whole lifetime.
async fn handle_websocket(socket: WebSocket, state: Arc<ServerState>, key: String) {
    // Record connection metrics
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (mut sender, mut receiver) = socket.split();

    // This instance serves exactly one application
    if key != state.app.key() {
        warn!(key = %key, "Rejecting connection for unknown application key");
        metrics::record_error("app_key");
        let rejection = OutboundMessage::error(
            codes::APP_KEY_MISMATCH,
            format!("Application key {key} not found"),
        );
        if let Ok(frame) = codec::encode(&rejection) {
            let _ = sender.send(Message::Text(frame)).await;
        }
        return;
    }

    // Register the session around its outbound queue
    let (handle, mut outbound) = mpsc::unbounded_channel();
    let socket_id = state.app.connect(handle);
    debug!(connection = %socket_id, "WebSocket connected");

    loop {
        tokio::select! {
            biased;

            // Drain queued outbound messages to the socket
            Some(message) = outbound.recv() => {
                match codec::encode(&message) {
                    Ok(frame) => {
                        metrics::record_frame("outbound");
                        if sender.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        error!(connection = %socket_id, error = %err, "Failed to encode outbound frame");
                        metrics::record_error("encode");
                    }
                }
            }

            // Receive from the WebSocket
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        metrics::record_frame("inbound");
                        state.app.handle_message(&socket_id, &text);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // The protocol is text frames; tolerate UTF-8 binary
                        if let Ok(text) = String::from_utf8(data) {
                            metrics::record_frame("inbound");
                            state.app.handle_message(&socket_id, &text);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %socket_id, "Received close frame");
                        break;
                    }
                    Some(Err(err)) => {
                        warn!(connection = %socket_id, error = %err, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %socket_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup: unsubscribe from all channels and drop the session
    state.app.disconnect(&socket_id);
    metrics::set_active_channels(state.app.stats().channel_count);

    debug!(connection = %socket_id, "WebSocket disconnected");
}

/// Server-originated publish endpoint.
async fn publish_handler(
    Path(app_id): Path<String>,
    State(state): State<Arc<ServerState>>,
    Json(request): Json<PublishRequest>,
) -> Response {
    if app_id != state.config.app.id {
        metrics::record_error("unknown_app");
        return StatusCode::NOT_FOUND.into_response();
    }

    let delivered = state.app.publish(&request);
    metrics::record_deliveries(delivered, "publish");
    metrics::set_active_channels(state.app.stats().channel_count);
    debug!(event = %request.name, recipients = delivered, "Published event");

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "sent": true })),
    )
        .into_response()
}
