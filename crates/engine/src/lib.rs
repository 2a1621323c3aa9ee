//! Embertale Engine library.
//!
//! Server-side session coordination for the Embertale party game: the
//! registry of live sessions, per-session membership and character
//! assignment, turn-gated action forwarding, and the WebSocket protocol
//! loop that drives it all.
//!
//! ## Structure
//!
//! - `api/` - WebSocket and HTTP entry points, registry, sessions

pub mod api;
