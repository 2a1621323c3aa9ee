//! Embertale Protocol - WebSocket message types shared by host and player clients
//!
//! One message = one JSON object with a snake_case `type` discriminant and
//! an optional `data` payload. Both directions use the same envelope.
//!
//! # Design Principles
//!
//! 1. **No business logic** - pure data types and serialization
//! 2. **Closed set** - every message the server accepts or emits is a
//!    variant here, validated at the boundary before dispatch

pub mod messages;

pub use messages::{ClientMessage, RosterEntry, ServerMessage};
