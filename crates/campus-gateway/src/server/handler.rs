//! WebSocket handler
//!
//! Accepts upgraded connections, registers them, and pumps messages between
//! the socket and the registry channel.

use crate::protocol::{ClientMessage, Envelope};
use crate::registry::{Connection, Role};
use crate::server::GatewayState;
use axum::{
    extract::{ws::Message, ws::WebSocket, Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// WebSocket endpoint for student/user channels
pub async fn user_socket_handler(
    State(state): State<GatewayState>,
    Path(identifier): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket, Role::User, identifier))
}

/// WebSocket endpoint for counselor channels
pub async fn counselor_socket_handler(
    State(state): State<GatewayState>,
    Path(identifier): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket, Role::Counselor, identifier))
}

/// Handle an upgraded WebSocket connection
///
/// The transport-level channel is already established and accepted here;
/// authentication of the channel happens upstream and is not re-checked.
async fn handle_socket(state: GatewayState, socket: WebSocket, role: Role, identifier: String) {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Envelope>(state.config().connections.message_buffer);
    let connection = state.registry().register(role, identifier.clone(), tx);
    let send_timeout = Duration::from_millis(state.config().connections.send_timeout_ms);

    tracing::info!(role = %role, identifier = %identifier, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Drain the registry channel into the socket
    let identifier_send = identifier.clone();
    let send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            identifier = %identifier_send,
                            "Socket write failed, stopping sender"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize envelope");
                }
            }
        }

        // Channel closed (unregistered or replaced): close the socket
        let _ = ws_sink.close().await;
    });

    // Read control messages from the socket
    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let identifier_recv = identifier.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_message(
                        &state_recv,
                        &connection_recv,
                        role,
                        &identifier_recv,
                        &text,
                        send_timeout,
                    )
                    .await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        role = %role,
                        identifier = %identifier_recv,
                        "Client closed connection"
                    );
                    break;
                }
                // Transport-level ping/pong is answered by axum itself
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        role = %role,
                        identifier = %identifier_recv,
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
            }
        }
    });

    // Either side ending tears the connection down
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    // Identity-checked removal: never evict a replacement registration
    state
        .registry()
        .unregister_exact(role, &identifier, &connection);

    tracing::info!(role = %role, identifier = %identifier, "WebSocket connection closed");
}

/// Handle a text message from the client
///
/// Only the liveness handshake and the peer-message relay are acted on here;
/// everything else belongs to the domain layer and is ignored with a log.
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    role: Role,
    identifier: &str,
    text: &str,
    send_timeout: Duration,
) {
    match ClientMessage::from_json(text) {
        Ok(ClientMessage::Ping) => {
            if connection.send(Envelope::pong(), send_timeout).await.is_err() {
                tracing::debug!(identifier = %identifier, "Failed to answer ping");
            }
        }
        Ok(ClientMessage::PeerMessage {
            recipient_id,
            content,
        }) => {
            if role == Role::User {
                let delivered = state
                    .dispatcher()
                    .notify_peer_message(&recipient_id, identifier, &content)
                    .await;
                tracing::debug!(
                    sender = %identifier,
                    recipient = %recipient_id,
                    delivered = delivered,
                    "Peer message relayed"
                );
            }
        }
        Ok(ClientMessage::Unknown) => {
            tracing::debug!(identifier = %identifier, "Ignoring unhandled message type");
        }
        Err(e) => {
            tracing::debug!(
                identifier = %identifier,
                error = %e,
                "Failed to parse client message"
            );
        }
    }
}
