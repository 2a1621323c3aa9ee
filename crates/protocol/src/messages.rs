//! WebSocket message types for the session protocol.
//!
//! Both directions share the `{"type": ..., "data": {...}}` envelope;
//! unit variants omit `data`. Field spellings inside payloads follow the
//! client conventions (`sessionCode`, `newScene` are camelCase, the rest
//! snake_case).

use serde::{Deserialize, Serialize};

use embertale_domain::{PlayerCharacter, Scene, SessionCode};

/// Messages from a client (host or player) to the server.
///
/// Role is enforced at dispatch, not in the type: a player sending
/// `update_game_state` parses fine and is then ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message from a host: register a new session.
    CreateSession,
    /// First message from a player: join an existing session by code.
    JoinSession {
        #[serde(rename = "sessionCode")]
        session_code: String,
    },
    /// Host pushes a new scene snapshot to store and broadcast.
    UpdateGameState { scene: Scene },
    /// Host replaces the character roster wholesale.
    UpdateCharacters { characters: Vec<PlayerCharacter> },
    /// Player claims a character by roster index.
    SelectCharacter { character_index: usize },
    /// Player submits an action for their character's turn.
    PlayerAction { action: String },
}

/// Messages from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `create_session` with the join code.
    SessionCreated { session_code: SessionCode },
    /// Host notification: a player connected.
    PlayerJoined { player_count: usize },
    /// Host notification: a player claimed a character.
    PlayerCharacterAssigned {
        player_index: usize,
        character_index: usize,
        character_name: String,
    },
    /// Host notification: a turn-validated action, forwarded verbatim.
    /// `player_index` carries the character index, not the join position.
    PlayerAction { player_index: usize, action: String },
    /// Host notification: a player disconnected.
    PlayerLeft { player_count: usize },
    /// Roster annotated with assignment status, for character selection.
    AvailableCharacters { characters: Vec<RosterEntry> },
    /// Confirmation of a successful character claim.
    CharacterAssigned { character: PlayerCharacter },
    /// A full scene snapshot; replaces anything the client holds.
    GameStateUpdate {
        #[serde(rename = "newScene")]
        new_scene: Scene,
    },
    /// A recoverable protocol error, reported only to the sender.
    Error { message: String },
    /// Join failed; the connection will be closed.
    JoinSessionError { message: String },
    /// Courtesy push when the host goes away and the session is torn down.
    SessionClosed { message: String },
}

/// One roster entry as shown to players picking a character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub character: PlayerCharacter,
    /// Whether some connected player already owns this character.
    pub assigned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use embertale_domain::{ActionChoice, CharacterClass, Race};

    fn sample_character(index: usize) -> PlayerCharacter {
        PlayerCharacter {
            name: "Mira".to_string(),
            race: Race::Elf,
            character_class: CharacterClass::Mage,
            gender: "female".to_string(),
            player_index: index,
            icon: None,
        }
    }

    #[test]
    fn create_session_has_no_data_key() {
        let json = serde_json::to_value(ClientMessage::CreateSession).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "create_session"}));
    }

    #[test]
    fn join_session_uses_camel_case_code_field() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "join_session", "data": {"sessionCode": "4821"}}"#,
        )
        .expect("deserialize");
        match msg {
            ClientMessage::JoinSession { session_code } => assert_eq!(session_code, "4821"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn session_created_envelope_shape() {
        let json = serde_json::to_value(ServerMessage::SessionCreated {
            session_code: SessionCode::from("4821"),
        })
        .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": "session_created", "data": {"session_code": "4821"}})
        );
    }

    #[test]
    fn roster_entry_flattens_character_fields() {
        let json = serde_json::to_value(ServerMessage::AvailableCharacters {
            characters: vec![RosterEntry {
                character: sample_character(0),
                assigned: true,
            }],
        })
        .expect("serialize");
        let entry = &json["data"]["characters"][0];
        assert_eq!(entry["name"], "Mira");
        assert_eq!(entry["playerIndex"], 0);
        assert_eq!(entry["assigned"], true);
    }

    #[test]
    fn game_state_update_uses_new_scene_key() {
        let scene = Scene {
            text: "The cave mouth yawns ahead.".to_string(),
            choices: vec![ActionChoice {
                id: 1,
                text: "Light a torch".to_string(),
            }],
            active_character_index: 0,
            image: None,
            audio: None,
        };
        let json =
            serde_json::to_value(ServerMessage::GameStateUpdate { new_scene: scene }).expect("serialize");
        assert_eq!(json["data"]["newScene"]["activeCharacterIndex"], 0);
        assert_eq!(json["data"]["newScene"]["choices"][0]["text"], "Light a torch");
    }

    #[test]
    fn player_action_round_trips() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "player_action", "data": {"action": "Sneak past the guard"}}"#,
        )
        .expect("deserialize");
        match msg {
            ClientMessage::PlayerAction { action } => assert_eq!(action, "Sneak past the guard"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
