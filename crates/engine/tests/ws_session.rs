//! End-to-end WebSocket tests against a real server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage, MaybeTlsStream};

use embertale_domain::{ActionChoice, CharacterClass, PlayerCharacter, Race, Scene};
use embertale_engine::api::{self, websocket::WsState, SessionRegistry};
use embertale_protocol::{ClientMessage, ServerMessage};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> SocketAddr {
    let registry = Arc::new(SessionRegistry::new());
    let ws_state = Arc::new(WsState { registry });
    let router = api::http::routes()
        .route("/ws", get(api::websocket::ws_handler).with_state(ws_state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server run");
    });
    addr
}

struct TestClient {
    ws: tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (ws, _resp) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("websocket connect");
        Self { ws }
    }

    async fn send(&mut self, msg: &ClientMessage) {
        let json = serde_json::to_string(msg).expect("serialize client message");
        self.ws
            .send(WsMessage::Text(json))
            .await
            .expect("send client message");
    }

    async fn recv(&mut self) -> ServerMessage {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for server message")
                .expect("connection closed while waiting")
                .expect("websocket error");
            match frame {
                WsMessage::Text(text) => {
                    return serde_json::from_str(&text).expect("parse server message")
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

fn character(name: &str, index: usize) -> PlayerCharacter {
    PlayerCharacter {
        name: name.to_string(),
        race: Race::Dwarf,
        character_class: CharacterClass::Ranger,
        gender: "female".to_string(),
        player_index: index,
        icon: None,
    }
}

fn scene(active_character_index: usize) -> Scene {
    Scene {
        text: "Rain hammers the old watchtower.".to_string(),
        choices: vec![ActionChoice {
            id: 1,
            text: "Climb the stairs".to_string(),
        }],
        active_character_index,
        image: None,
        audio: None,
    }
}

#[tokio::test]
async fn full_session_flow() {
    let addr = spawn_server().await;

    // Host opens a session.
    let mut host = TestClient::connect(addr).await;
    host.send(&ClientMessage::CreateSession).await;
    let code = match host.recv().await {
        ServerMessage::SessionCreated { session_code } => session_code,
        other => panic!("expected session_created, got {other:?}"),
    };
    // First player joins before the host has provided any characters.
    let mut player_a = TestClient::connect(addr).await;
    player_a
        .send(&ClientMessage::JoinSession {
            session_code: code.to_string(),
        })
        .await;
    match player_a.recv().await {
        ServerMessage::AvailableCharacters { characters } => assert!(characters.is_empty()),
        other => panic!("expected available_characters, got {other:?}"),
    }
    match host.recv().await {
        ServerMessage::PlayerJoined { player_count } => assert_eq!(player_count, 1),
        other => panic!("expected player_joined, got {other:?}"),
    }

    // The roster lands and is re-pushed to the unassigned player.
    host.send(&ClientMessage::UpdateCharacters {
        characters: vec![character("Brom", 0), character("Mira", 1)],
    })
    .await;
    match player_a.recv().await {
        ServerMessage::AvailableCharacters { characters } => {
            assert_eq!(characters.len(), 2);
            assert!(characters.iter().all(|c| !c.assigned));
        }
        other => panic!("expected available_characters, got {other:?}"),
    }

    // Player A claims character 0.
    player_a
        .send(&ClientMessage::SelectCharacter { character_index: 0 })
        .await;
    match player_a.recv().await {
        ServerMessage::CharacterAssigned { character } => assert_eq!(character.name, "Brom"),
        other => panic!("expected character_assigned, got {other:?}"),
    }
    match host.recv().await {
        ServerMessage::PlayerCharacterAssigned {
            player_index,
            character_index,
            character_name,
        } => {
            assert_eq!(player_index, 0);
            assert_eq!(character_index, 0);
            assert_eq!(character_name, "Brom");
        }
        other => panic!("expected player_character_assigned, got {other:?}"),
    }

    // Second player joins; the roster shows character 0 as taken.
    let mut player_b = TestClient::connect(addr).await;
    player_b
        .send(&ClientMessage::JoinSession {
            session_code: code.to_string(),
        })
        .await;
    match player_b.recv().await {
        ServerMessage::AvailableCharacters { characters } => {
            assert!(characters[0].assigned);
            assert!(!characters[1].assigned);
        }
        other => panic!("expected available_characters, got {other:?}"),
    }
    match host.recv().await {
        ServerMessage::PlayerJoined { player_count } => assert_eq!(player_count, 2),
        other => panic!("expected player_joined, got {other:?}"),
    }

    // Player B tries to grab the taken character and is told off.
    player_b
        .send(&ClientMessage::SelectCharacter { character_index: 0 })
        .await;
    match player_b.recv().await {
        ServerMessage::Error { message } => {
            assert_eq!(message, "This character is already taken by another player");
        }
        other => panic!("expected error, got {other:?}"),
    }

    // Host pushes a scene; only the assigned player receives it.
    host.send(&ClientMessage::UpdateGameState { scene: scene(0) })
        .await;
    match player_a.recv().await {
        ServerMessage::GameStateUpdate { new_scene } => {
            assert_eq!(new_scene.active_character_index, 0);
        }
        other => panic!("expected game_state_update, got {other:?}"),
    }

    // Player B claims the free character and catches up on the stored scene.
    player_b
        .send(&ClientMessage::SelectCharacter { character_index: 1 })
        .await;
    match player_b.recv().await {
        ServerMessage::CharacterAssigned { character } => assert_eq!(character.name, "Mira"),
        other => panic!("expected character_assigned, got {other:?}"),
    }
    match player_b.recv().await {
        ServerMessage::GameStateUpdate { new_scene } => {
            assert_eq!(new_scene.active_character_index, 0);
        }
        other => panic!("expected stored scene, got {other:?}"),
    }
    match host.recv().await {
        ServerMessage::PlayerCharacterAssigned { character_index, .. } => {
            assert_eq!(character_index, 1);
        }
        other => panic!("expected player_character_assigned, got {other:?}"),
    }

    // Off-turn action from B is dropped; A's action reaches the host.
    player_b
        .send(&ClientMessage::PlayerAction {
            action: "Strike first".to_string(),
        })
        .await;
    player_a
        .send(&ClientMessage::PlayerAction {
            action: "Climb the stairs".to_string(),
        })
        .await;
    match host.recv().await {
        ServerMessage::PlayerAction {
            player_index,
            action,
        } => {
            assert_eq!(player_index, 0);
            assert_eq!(action, "Climb the stairs");
        }
        other => panic!("expected player_action, got {other:?}"),
    }

    // A leaving frees its seat and the host learns the new count.
    player_a.close().await;
    match host.recv().await {
        ServerMessage::PlayerLeft { player_count } => assert_eq!(player_count, 1),
        other => panic!("expected player_left, got {other:?}"),
    }
}

#[tokio::test]
async fn joining_an_unknown_code_fails_cleanly() {
    let addr = spawn_server().await;

    let mut player = TestClient::connect(addr).await;
    player
        .send(&ClientMessage::JoinSession {
            session_code: "0000".to_string(),
        })
        .await;
    match player.recv().await {
        ServerMessage::JoinSessionError { message } => {
            assert_eq!(message, "Invalid session code");
        }
        other => panic!("expected join_session_error, got {other:?}"),
    }
}

#[tokio::test]
async fn host_disconnect_tears_the_session_down() {
    let addr = spawn_server().await;

    let mut host = TestClient::connect(addr).await;
    host.send(&ClientMessage::CreateSession).await;
    let code = match host.recv().await {
        ServerMessage::SessionCreated { session_code } => session_code,
        other => panic!("expected session_created, got {other:?}"),
    };

    let mut player = TestClient::connect(addr).await;
    player
        .send(&ClientMessage::JoinSession {
            session_code: code.to_string(),
        })
        .await;
    match player.recv().await {
        ServerMessage::AvailableCharacters { .. } => {}
        other => panic!("expected available_characters, got {other:?}"),
    }
    // Drain the host's player_joined so the close is the next event.
    match host.recv().await {
        ServerMessage::PlayerJoined { .. } => {}
        other => panic!("expected player_joined, got {other:?}"),
    }

    host.close().await;

    // The player is told the session is gone...
    match player.recv().await {
        ServerMessage::SessionClosed { .. } => {}
        other => panic!("expected session_closed, got {other:?}"),
    }

    // ...and the code is no longer joinable.
    let mut late_joiner = TestClient::connect(addr).await;
    late_joiner
        .send(&ClientMessage::JoinSession {
            session_code: code.to_string(),
        })
        .await;
    match late_joiner.recv().await {
        ServerMessage::JoinSessionError { .. } => {}
        other => panic!("expected join_session_error, got {other:?}"),
    }
}

#[tokio::test]
async fn first_message_must_declare_a_role() {
    let addr = spawn_server().await;

    let mut client = TestClient::connect(addr).await;
    client
        .send(&ClientMessage::PlayerAction {
            action: "Look around".to_string(),
        })
        .await;
    match client.recv().await {
        ServerMessage::Error { message } => {
            assert!(message.contains("create_session or join_session"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}
