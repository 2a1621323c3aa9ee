//! The scene snapshot broadcast to players.

use serde::{Deserialize, Serialize};

/// One action a player can pick for their turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChoice {
    pub id: u32,
    pub text: String,
}

/// The host's last-known narrative state.
///
/// Each `update_game_state` replaces the previous snapshot wholesale;
/// the session layer never patches a scene in place. The only field the
/// session layer reads is `active_character_index`, which gates whose
/// action is forwarded to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub text: String,
    pub choices: Vec<ActionChoice>,
    /// Roster index of the character whose turn it is.
    pub active_character_index: usize,
    /// Base64-encoded illustration, if image generation is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Base64-encoded narration audio, if TTS is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}
