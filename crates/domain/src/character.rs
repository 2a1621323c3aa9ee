//! Player character descriptors.
//!
//! The roster is authored on the host side; the engine treats these as
//! opaque beyond the `player_index` used for assignment bookkeeping.
//! Serialized field names are camelCase to match the client payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Orc,
    Halfling,
    Gnome,
    Dragonborn,
    Tiefling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterClass {
    Warrior,
    Mage,
    Rogue,
    Cleric,
    Bard,
    Paladin,
    Ranger,
    Druid,
}

/// One selectable character as provided by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCharacter {
    pub name: String,
    pub race: Race,
    pub character_class: CharacterClass,
    pub gender: String,
    /// Stable index of this character within the roster.
    pub player_index: usize,
    /// Base64-encoded portrait, generated host-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}
