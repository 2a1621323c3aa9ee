//! One live game session: membership, character assignment, turn-gated
//! action routing.
//!
//! The host connection is the narrative authority; the session is a message
//! router plus membership and turn bookkeeping. Nothing here ever waits on
//! story generation: every delivery is a non-blocking `try_send` into a
//! connection's channel, and a failed send is that connection's problem
//! alone.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};

use embertale_domain::{ConnectionId, PlayerCharacter, Scene, SessionCode};
use embertale_protocol::{RosterEntry, ServerMessage};

/// A player connection within a session.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub connection_id: ConnectionId,
    /// Channel to send messages to this client.
    pub sender: mpsc::Sender<ServerMessage>,
    pub joined_at: DateTime<Utc>,
}

/// Mutable session state, guarded as a unit so every multi-field change is
/// a single uninterrupted step.
#[derive(Debug, Default)]
struct SessionState {
    /// Player connections in join order. Never contains the host.
    players: Vec<PlayerHandle>,
    /// Selectable characters, replaceable wholesale by the host.
    characters: Vec<PlayerCharacter>,
    /// Injective map from connection to roster index.
    assignments: HashMap<ConnectionId, usize>,
    /// Last snapshot pushed by the host, kept for late assignees.
    current_scene: Option<Scene>,
}

/// An active game session.
pub struct GameSession {
    code: SessionCode,
    /// The narrative authority; set at creation, never reassigned.
    host: mpsc::Sender<ServerMessage>,
    state: RwLock<SessionState>,
}

/// Recoverable assignment failures, reported to the requesting player only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("This character is already taken by another player")]
    CharacterTaken,
    #[error("Invalid character selection")]
    InvalidCharacterIndex,
}

/// What happened to a forwarded player action.
///
/// Every non-`Forwarded` outcome is a silent drop from the player's point
/// of view; the host is the sole authority for recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Sent to the host as `player_action`.
    Forwarded,
    /// The sender has not claimed a character.
    NotAssigned,
    /// No scene has been pushed yet, so there is no active turn.
    NoScene,
    /// The sender's character is not the active one.
    NotYourTurn,
    /// It was the sender's turn, but the host channel rejected the send.
    HostUnreachable,
}

/// Result of a best-effort broadcast: one connection's failure never
/// blocks delivery to the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<ConnectionId>,
}

impl GameSession {
    pub fn new(code: SessionCode, host: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            code,
            host,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Add a player connection and immediately show it the roster with
    /// assignment flags. Returns the new player count.
    pub async fn connect_player(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> usize {
        let mut state = self.state.write().await;
        state.players.push(PlayerHandle {
            connection_id,
            sender: sender.clone(),
            joined_at: Utc::now(),
        });
        let roster = ServerMessage::AvailableCharacters {
            characters: annotated_roster(&state),
        };
        if let Err(e) = sender.try_send(roster) {
            tracing::warn!(
                session_code = %self.code,
                connection_id = %connection_id,
                error = %e,
                "Failed to send roster to new player"
            );
        }
        let count = state.players.len();
        tracing::info!(
            session_code = %self.code,
            connection_id = %connection_id,
            player_count = count,
            "Player joined session"
        );
        count
    }

    /// Claim a character for a connection.
    ///
    /// The claim is exclusive in both directions: one connection per
    /// character and one character per connection. On success the player
    /// gets a confirmation plus the stored scene (if the host has pushed
    /// one), and the host is told who picked what. A failed host
    /// notification never fails the assignment.
    pub async fn assign_character(
        &self,
        connection_id: ConnectionId,
        character_index: usize,
    ) -> Result<(), SessionError> {
        let mut state = self.state.write().await;

        if state.assignments.values().any(|&idx| idx == character_index) {
            return Err(SessionError::CharacterTaken);
        }
        if character_index >= state.characters.len() {
            return Err(SessionError::InvalidCharacterIndex);
        }
        // Re-selecting drops the previous claim rather than holding two.
        state.assignments.insert(connection_id, character_index);

        let character = state.characters[character_index].clone();
        if let Some(player) = state
            .players
            .iter()
            .find(|p| p.connection_id == connection_id)
        {
            let confirm = ServerMessage::CharacterAssigned {
                character: character.clone(),
            };
            if let Err(e) = player.sender.try_send(confirm) {
                tracing::warn!(
                    session_code = %self.code,
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to confirm character assignment"
                );
            }
            // A scene stored before this player picked is delivered now.
            if let Some(scene) = state.current_scene.clone() {
                if let Err(e) = player
                    .sender
                    .try_send(ServerMessage::GameStateUpdate { new_scene: scene })
                {
                    tracing::warn!(
                        session_code = %self.code,
                        connection_id = %connection_id,
                        error = %e,
                        "Failed to send stored scene to new assignee"
                    );
                }
            }
        }

        let player_index = state
            .players
            .iter()
            .position(|p| p.connection_id == connection_id)
            .unwrap_or_default();
        let notify = ServerMessage::PlayerCharacterAssigned {
            player_index,
            character_index,
            character_name: character.name,
        };
        if let Err(e) = self.host.try_send(notify) {
            tracing::warn!(
                session_code = %self.code,
                connection_id = %connection_id,
                error = %e,
                "Failed to notify host of character assignment"
            );
        }

        tracing::info!(
            session_code = %self.code,
            connection_id = %connection_id,
            character_index,
            "Character assigned"
        );
        Ok(())
    }

    /// Remove a player connection and free any character it held.
    /// Idempotent; returns the remaining player count.
    pub async fn disconnect_player(&self, connection_id: ConnectionId) -> usize {
        let mut state = self.state.write().await;
        // Absent on repeat disconnects; log only when someone actually left.
        let joined_at = state
            .players
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.joined_at);
        state.players.retain(|p| p.connection_id != connection_id);
        state.assignments.remove(&connection_id);
        let count = state.players.len();
        if let Some(joined_at) = joined_at {
            tracing::info!(
                session_code = %self.code,
                connection_id = %connection_id,
                player_count = count,
                connected_secs = (Utc::now() - joined_at).num_seconds(),
                "Player left session"
            );
        }
        count
    }

    /// Replace the roster wholesale and re-show it to every player who has
    /// not yet claimed a character. Assigned players keep seeing the
    /// character they chose.
    pub async fn update_characters(&self, characters: Vec<PlayerCharacter>) {
        let mut state = self.state.write().await;
        state.characters = characters;
        let roster = annotated_roster(&state);
        for player in &state.players {
            if state.assignments.contains_key(&player.connection_id) {
                continue;
            }
            let msg = ServerMessage::AvailableCharacters {
                characters: roster.clone(),
            };
            if let Err(e) = player.sender.try_send(msg) {
                tracing::warn!(
                    session_code = %self.code,
                    connection_id = %player.connection_id,
                    error = %e,
                    "Failed to re-send roster"
                );
            }
        }
        tracing::info!(session_code = %self.code, "Character roster updated");
    }

    /// Store a new scene snapshot and broadcast it to every assigned
    /// player. Delivery is best-effort per connection; the report lists
    /// who missed it.
    pub async fn update_game_state(&self, scene: Scene) -> BroadcastReport {
        let mut state = self.state.write().await;
        state.current_scene = Some(scene.clone());

        let mut report = BroadcastReport::default();
        for player in &state.players {
            if !state.assignments.contains_key(&player.connection_id) {
                continue;
            }
            let msg = ServerMessage::GameStateUpdate {
                new_scene: scene.clone(),
            };
            match player.sender.try_send(msg) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        session_code = %self.code,
                        connection_id = %player.connection_id,
                        error = %e,
                        "Failed to broadcast game state"
                    );
                    report.failed.push(player.connection_id);
                }
            }
        }
        tracing::info!(
            session_code = %self.code,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Game state updated"
        );
        report
    }

    /// Forward a player's action to the host, but only on their turn.
    pub async fn route_action(&self, connection_id: ConnectionId, action: String) -> RouteOutcome {
        let state = self.state.read().await;

        let Some(&character_index) = state.assignments.get(&connection_id) else {
            return RouteOutcome::NotAssigned;
        };
        let Some(scene) = &state.current_scene else {
            return RouteOutcome::NoScene;
        };
        if character_index != scene.active_character_index {
            return RouteOutcome::NotYourTurn;
        }

        // The host sees the character index, not the join position.
        let msg = ServerMessage::PlayerAction {
            player_index: character_index,
            action,
        };
        match self.host.try_send(msg) {
            Ok(()) => RouteOutcome::Forwarded,
            Err(e) => {
                tracing::warn!(
                    session_code = %self.code,
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to forward player action to host"
                );
                RouteOutcome::HostUnreachable
            }
        }
    }

    /// Best-effort message to the host connection.
    pub fn notify_host(&self, msg: ServerMessage) {
        if let Err(e) = self.host.try_send(msg) {
            tracing::warn!(session_code = %self.code, error = %e, "Failed to notify host");
        }
    }

    /// Courtesy push to every player when the session is torn down.
    pub async fn close(&self, message: &str) {
        let state = self.state.read().await;
        for player in &state.players {
            let msg = ServerMessage::SessionClosed {
                message: message.to_string(),
            };
            if let Err(e) = player.sender.try_send(msg) {
                tracing::debug!(
                    session_code = %self.code,
                    connection_id = %player.connection_id,
                    error = %e,
                    "Failed to deliver session_closed"
                );
            }
        }
    }

    pub async fn player_count(&self) -> usize {
        self.state.read().await.players.len()
    }

    #[cfg(test)]
    async fn assignment_of(&self, connection_id: ConnectionId) -> Option<usize> {
        self.state.read().await.assignments.get(&connection_id).copied()
    }

    #[cfg(test)]
    async fn joined_at_of(&self, connection_id: ConnectionId) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .players
            .iter()
            .find(|p| p.connection_id == connection_id)
            .map(|p| p.joined_at)
    }
}

/// The roster with each entry flagged as taken or free.
fn annotated_roster(state: &SessionState) -> Vec<RosterEntry> {
    let taken: HashSet<usize> = state.assignments.values().copied().collect();
    state
        .characters
        .iter()
        .enumerate()
        .map(|(idx, character)| RosterEntry {
            character: character.clone(),
            assigned: taken.contains(&idx),
        })
        .collect()
}
