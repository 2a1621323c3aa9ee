//! Embertale Domain - Pure game types and narrative progression rules
//!
//! This crate contains the vocabulary shared by the engine and the wire
//! protocol: character descriptors, the immutable scene snapshot, session
//! settings, and the chapter/arc progression state machine. No I/O lives
//! here.

pub mod character;
pub mod error;
pub mod ids;
pub mod progression;
pub mod scene;
pub mod session_code;
pub mod settings;

pub use character::{CharacterClass, PlayerCharacter, Race};
pub use error::DomainError;
pub use ids::ConnectionId;
pub use progression::ProgressionConfig;
pub use scene::{ActionChoice, Scene};
pub use session_code::SessionCode;
pub use settings::GameSettings;
