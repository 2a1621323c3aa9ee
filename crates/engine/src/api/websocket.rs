//! WebSocket handling for host and player connections.
//!
//! One control loop per accepted connection. Every connection is accepted
//! unconditionally; protocol errors are reported over the channel, not by
//! refusing the handshake. The first message declares the role
//! (`create_session` or `join_session`), and everything after is
//! dispatched by that role.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{
    stream::{SplitStream, StreamExt},
    SinkExt,
};
use tokio::sync::mpsc;

use embertale_domain::{ConnectionId, SessionCode};
use embertale_protocol::{ClientMessage, ServerMessage};

use super::registry::SessionRegistry;
use super::session::GameSession;

/// Buffer size for per-connection message channel.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// How long to let the forwarder drain queued messages after the loop ends.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared state for WebSocket handlers, injected at startup.
pub struct WsState {
    pub registry: Arc<SessionRegistry>,
}

/// WebSocket upgrade handler - entry point for new connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection from handshake to disconnect.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = ConnectionId::new();

    // Bounded channel for messages to this client, drained by a forwarder
    // task so session code never awaits on a slow socket.
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CONNECTION_CHANNEL_BUFFER);
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    match negotiate_role(&mut ws_receiver, &tx).await {
        Some(FirstMessage::CreateSession) => {
            let (code, session) = state.registry.create_session(tx.clone());
            let _ = tx.try_send(ServerMessage::SessionCreated {
                session_code: code.clone(),
            });
            tracing::info!(connection_id = %connection_id, session_code = %code, "Host created session");

            host_loop(&mut ws_receiver, &session, &tx).await;

            // The game cannot continue without its narrative authority.
            state.registry.remove(&code);
            session.close("The host has left the game").await;
        }
        Some(FirstMessage::JoinSession { session_code }) => {
            let code = SessionCode::from(session_code);
            let Some(session) = state.registry.get(&code) else {
                tracing::info!(connection_id = %connection_id, session_code = %code, "Join with unknown code");
                let _ = tx.try_send(ServerMessage::JoinSessionError {
                    message: "Invalid session code".to_string(),
                });
                finish(tx, send_task).await;
                return;
            };

            let count = session.connect_player(connection_id, tx.clone()).await;
            session.notify_host(ServerMessage::PlayerJoined {
                player_count: count,
            });

            player_loop(&mut ws_receiver, &session, connection_id, &tx).await;

            let remaining = session.disconnect_player(connection_id).await;
            session.notify_host(ServerMessage::PlayerLeft {
                player_count: remaining,
            });
        }
        None => {}
    }

    finish(tx, send_task).await;
    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}

/// The two valid session-opening messages.
enum FirstMessage {
    CreateSession,
    JoinSession { session_code: String },
}

/// Wait for the role-declaring first message. Anything else gets an error
/// reply and ends the handler before any session state exists.
async fn negotiate_role(
    ws_receiver: &mut SplitStream<WebSocket>,
    tx: &mpsc::Sender<ServerMessage>,
) -> Option<FirstMessage> {
    loop {
        let text = match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return None,
            // Pings and binary frames before the role declaration are noise.
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "WebSocket error before role declaration");
                return None;
            }
        };
        return match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::CreateSession) => Some(FirstMessage::CreateSession),
            Ok(ClientMessage::JoinSession { session_code }) => {
                Some(FirstMessage::JoinSession { session_code })
            }
            Ok(other) => {
                tracing::warn!(message = ?other, "First message did not declare a role");
                let _ = tx.try_send(ServerMessage::Error {
                    message: "First message must be create_session or join_session".to_string(),
                });
                None
            }
            Err(e) => {
                let _ = tx.try_send(ServerMessage::Error {
                    message: format!("Invalid message format: {e}"),
                });
                None
            }
        };
    }
}

/// Message loop for the session's host.
async fn host_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    session: &GameSession,
    tx: &mpsc::Sender<ServerMessage>,
) {
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::UpdateGameState { scene }) => {
                    session.update_game_state(scene).await;
                }
                Ok(ClientMessage::UpdateCharacters { characters }) => {
                    session.update_characters(characters).await;
                }
                Ok(other) => {
                    // Not fatal; player-role messages from the host are ignored.
                    tracing::debug!(
                        session_code = %session.code(),
                        message = ?other,
                        "Ignoring message outside host role"
                    );
                }
                Err(e) => {
                    tracing::warn!(session_code = %session.code(), error = %e, "Failed to parse host message");
                    let _ = tx.try_send(ServerMessage::Error {
                        message: format!("Invalid message format: {e}"),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(session_code = %session.code(), "Host closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(session_code = %session.code(), error = %e, "Host WebSocket error");
                break;
            }
        }
    }
}

/// Message loop for a player connection.
async fn player_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    session: &GameSession,
    connection_id: ConnectionId,
    tx: &mpsc::Sender<ServerMessage>,
) {
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::SelectCharacter { character_index }) => {
                    if let Err(e) = session.assign_character(connection_id, character_index).await {
                        let _ = tx.try_send(ServerMessage::Error {
                            message: e.to_string(),
                        });
                    }
                }
                Ok(ClientMessage::PlayerAction { action }) => {
                    // Off-turn and unassigned actions drop silently.
                    let outcome = session.route_action(connection_id, action).await;
                    tracing::debug!(
                        session_code = %session.code(),
                        connection_id = %connection_id,
                        outcome = ?outcome,
                        "Player action routed"
                    );
                }
                Ok(other) => {
                    tracing::debug!(
                        session_code = %session.code(),
                        connection_id = %connection_id,
                        message = ?other,
                        "Ignoring message outside player role"
                    );
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Failed to parse player message");
                    let _ = tx.try_send(ServerMessage::Error {
                        message: format!("Invalid message format: {e}"),
                    });
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection_id, "Player closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "Player WebSocket error");
                break;
            }
        }
    }
}

/// Let the forwarder flush whatever is queued, then stop it. The session
/// may still hold a sender clone (the host handle lives as long as the
/// session), so draining is bounded by a timeout rather than open-ended.
async fn finish(tx: mpsc::Sender<ServerMessage>, mut send_task: tokio::task::JoinHandle<()>) {
    drop(tx);
    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        // The socket half is gone, so there is nothing left to deliver.
        send_task.abort();
    }
}
