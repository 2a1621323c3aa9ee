//! API layer - WebSocket and HTTP entry points.

pub mod http;
pub mod registry;
pub mod session;
pub mod websocket;

pub use registry::SessionRegistry;
pub use session::GameSession;
