use crate::config::Config;
use crate::iss::ConnectionRegistry;
use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared state passed to all request handlers
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

/// Build the application router
pub fn build_router(config: &Config, state: AppState) -> Router {
    let cors = build_cors_layer(&config.allowed_origin);

    Router::new()
        // Realtime position feed
        .route("/ws", get(ws_handler))
        // Health check endpoint
        .route("/health", get(health_check))
        // Stats endpoint
        .route("/stats", get(stats))
        // Static front-end for everything else
        .fallback_service(ServeDir::new(&config.static_dir))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn run(config: Config, registry: Arc<ConnectionRegistry>) -> anyhow::Result<()> {
    let app = build_router(&config, AppState::new(registry));

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);
    info!("Realtime feed at ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_cors_layer(allowed_origin: &str) -> CorsLayer {
    if allowed_origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(
                "Invalid allowed_origin '{}', falling back to any origin",
                allowed_origin
            );
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

/// Handles WebSocket upgrade requests to `/ws`
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_client_socket(socket, state))
}

/// Manages a single client connection
///
/// Forwards every broadcast report to the client as a JSON text frame
/// until the client goes away. Each connection runs in its own task, so
/// one client failing or lagging never touches the others.
async fn handle_client_socket(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::now_v7();
    let mut report_rx = state.registry.on_connect(client_id).await;

    loop {
        tokio::select! {
            // Forward position reports to the client
            result = report_rx.recv() => {
                match result {
                    Ok(report) => {
                        let text = match serde_json::to_string(&report) {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to serialize report for {}: {}", client_id, e);
                                continue;
                            }
                        };

                        if let Err(e) = socket.send(Message::Text(text.into())).await {
                            // Client gone, stop forwarding
                            warn!("Failed to deliver report to {}: {}", client_id, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, skipped {} report(s)", client_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Watch the socket for close frames and errors
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.registry.on_disconnect(client_id).await;
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Stats endpoint - returns basic service information
async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = serde_json::json!({
        "status": "running",
        "service": "orbitcast-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "connected_clients": state.registry.client_count().await,
        "broadcasting": state.registry.is_broadcasting().await,
    });
    (StatusCode::OK, Json(stats))
}
