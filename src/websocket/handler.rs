//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.
//! Data flows server to client only; the read side exists to notice when the
//! peer goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::registry::{Connection, ConnectionRegistry};
use crate::api::AppState;
use crate::reading::Reading;

/// WebSocket upgrade handler
///
/// Entry point for `/ws`. Any origin is accepted.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let registry = Arc::clone(&state.registry);
    ws.on_failed_upgrade(|e: axum::Error| {
        tracing::warn!(error = %e, "WebSocket upgrade failed");
    })
    .on_upgrade(move |socket| handle_socket(socket, registry))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Reading>>();
    let conn = Connection::new(tx);
    let connection_id = conn.id().to_string();

    if !registry.add(conn).await {
        return;
    }

    let conn_id_for_send = connection_id.clone();

    // Forward readings from the hub to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(reading) = rx.recv().await {
            let text = match serde_json::to_string(reading.as_ref()) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize reading");
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(text)).await {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    error = %e,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
        let _ = sender.close().await;
    });

    let conn_id_for_recv = connection_id.clone();

    // Read until the peer closes or errors; inbound frames carry no meaning
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %conn_id_for_recv, "Client requested close");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    registry.remove(&connection_id).await;
}
