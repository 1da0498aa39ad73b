//! Connection handlers for the Roomcast server.
//!
//! This module handles the connection lifecycle and the HTTP endpoints.

use crate::config::Config;
use crate::dispatch;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use roomcast_core::{Chat, ChatId, ClientId, Registry};
use roomcast_protocol::codec;
use roomcast_transport::{ChannelConnection, ConnectionId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Shared server state.
pub struct AppState {
    /// The room registry.
    pub registry: Registry,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::with_config(config.registry_config()),
            config,
        }
    }
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    let ws_path = state.config.transport.websocket_path.clone();
    Router::new()
        .route(&ws_path, get(ws_handler))
        .route("/health", get(health_handler))
        .route("/chats", get(list_chats_handler).put(import_chats_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            warn!("Failed to start metrics server: {}", e);
        }
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Roomcast server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.registry.stats();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chats": stats.chat_count,
        "clients": stats.client_count,
    }))
}

/// Export all chats, ordered by ID.
async fn list_chats_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Chat>> {
    Json(state.registry.list_chats())
}

/// Merge a chat table snapshot into the registry.
async fn import_chats_handler(
    State(state): State<Arc<AppState>>,
    Json(chats): Json<HashMap<ChatId, Chat>>,
) -> Json<serde_json::Value> {
    let received = chats.len();
    let imported = state.registry.import_chats(chats);
    metrics::set_active_chats(state.registry.stats().chat_count);
    info!(imported, skipped = received - imported, "Imported chat snapshot");
    Json(serde_json::json!({ "imported": imported, "skipped": received - imported }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.registry.stats().client_count >= state.config.limits.max_connections {
        warn!(remote = %addr, "Connection limit reached");
        metrics::record_error("connection_limit");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    }

    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, addr, state))
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, addr: SocketAddr, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let connection_id = ConnectionId::generate();
    let (conn, mut outbound) = ChannelConnection::new(connection_id);
    let client = state
        .registry
        .bind_connection(Arc::new(conn.with_remote_addr(addr.to_string())));

    debug!(connection = %connection_id, client = %client.id, remote = %addr, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    // Sole owner of the sink; drains the connection's outbound queue in order
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            match codec::encode(&msg) {
                Ok(data) => {
                    metrics::record_message(data.len(), "outbound");
                    if sender.send(Message::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to encode outbound message");
                    metrics::record_error("encode");
                }
            }
        }
    });

    let mut read_buffer = BytesMut::with_capacity(4096);

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Binary(data)) => {
                process_bytes(&state, client.id, &mut read_buffer, &data).await;
            }
            Ok(Message::Text(text)) => {
                // Treat text as binary
                process_bytes(&state, client.id, &mut read_buffer, text.as_bytes()).await;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(connection = %connection_id, "Received close frame");
                break;
            }
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "WebSocket error");
                metrics::record_error("websocket");
                break;
            }
        }
    }

    state.registry.unbind(&connection_id);
    writer.abort();
    metrics::set_active_chats(state.registry.stats().chat_count);

    debug!(connection = %connection_id, client = %client.id, "WebSocket disconnected");
}

/// Append received bytes and handle every complete message in the buffer.
async fn process_bytes(
    state: &AppState,
    client_id: ClientId,
    read_buffer: &mut BytesMut,
    data: &[u8],
) {
    let start = Instant::now();
    read_buffer.extend_from_slice(data);

    loop {
        match codec::decode_from(read_buffer) {
            Ok(Some(msg)) => {
                metrics::record_message(msg.payload_size(), "inbound");
                dispatch::handle_msg(state, client_id, msg).await;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(client = %client_id, error = %e, "Dropping undecodable input");
                metrics::record_error("protocol");
                read_buffer.clear();
                break;
            }
        }
    }

    metrics::record_latency(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_protocol::{Msg, Resp};
    use std::time::Duration;

    #[test]
    fn test_import_payload_shape() {
        let body = r#"{"500": {"id": 500, "name": "remote", "creator": "eve",
                       "creator_id": 7, "created_at": 0}}"#;
        let chats: HashMap<ChatId, Chat> = serde_json::from_str(body).unwrap();

        let state = AppState::new(Config::default());
        state.registry.import_chats(chats);
        assert_eq!(state.registry.list_chats()[0].name, "remote");
    }

    #[tokio::test]
    async fn test_import_reports_skipped_chats() {
        let body = format!(
            r#"{{"{max}": {{"id": 0, "name": "edge", "creator": "eve", "creator_id": 7, "created_at": 0}},
                 "600": {{"id": 600, "name": "fine", "creator": "eve", "creator_id": 7, "created_at": 0}}}}"#,
            max = i64::MAX - 10
        );
        let chats: HashMap<ChatId, Chat> = serde_json::from_str(&body).unwrap();

        let state = Arc::new(AppState::new(Config::default()));
        let Json(report) = import_chats_handler(State(Arc::clone(&state)), Json(chats)).await;
        assert_eq!(report["imported"], 1);
        assert_eq!(report["skipped"], 1);

        let chat = state.registry.create_chat(ClientId(1), "local");
        assert_eq!(chat.id, ChatId(700));
    }

    #[tokio::test]
    async fn test_process_bytes_handles_split_frames() {
        let state = AppState::new(Config::default());
        let (conn, mut rx) = ChannelConnection::new(ConnectionId::generate());
        let client = state.registry.bind_connection(Arc::new(conn));

        let payload = codec::encode_payload(&roomcast_protocol::Request::Whoami).unwrap();
        let encoded = codec::encode(&Msg::new(11, payload)).unwrap();
        let (head, tail) = encoded.split_at(3);

        let mut buffer = BytesMut::new();
        process_bytes(&state, client.id, &mut buffer, head).await;
        assert!(rx.try_recv().is_err());

        process_bytes(&state, client.id, &mut buffer, tail).await;
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.id, 11);
        let resp: Resp = codec::decode_payload(&msg.data).unwrap();
        assert!(resp.is_ok());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_process_bytes_drops_garbage() {
        let state = AppState::new(Config::default());
        let mut buffer = BytesMut::new();

        let mut garbage = vec![0, 0, 0, 2];
        garbage.extend_from_slice(&[0xc1, 0xc1]);
        process_bytes(&state, ClientId(1), &mut buffer, &garbage).await;
        assert!(buffer.is_empty());
    }
}
