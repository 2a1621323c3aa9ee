//! Process-wide table of live sessions.
//!
//! The registry is the only process-wide mutable resource. It is created
//! once at startup and passed explicitly to the WebSocket state; there is
//! no module-level singleton.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;

use embertale_domain::SessionCode;
use embertale_protocol::ServerMessage;

use super::session::GameSession;

/// Size of the numeric code space. Large relative to the expected number
/// of concurrent sessions, so collision retries stay O(1).
const CODE_SPACE: u32 = 10_000;

/// Registry of live sessions keyed by join code.
pub struct SessionRegistry {
    sessions: DashMap<SessionCode, Arc<GameSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session owned by the given host connection, under a fresh
    /// collision-free code. Reservation and insertion are one atomic step,
    /// so two concurrent hosts can never claim the same code.
    pub fn create_session(
        &self,
        host: mpsc::Sender<ServerMessage>,
    ) -> (SessionCode, Arc<GameSession>) {
        loop {
            let code = SessionCode::new(format!(
                "{:04}",
                rand::thread_rng().gen_range(0..CODE_SPACE)
            ));
            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let session = Arc::new(GameSession::new(code.clone(), host));
                    slot.insert(session.clone());
                    tracing::info!(session_code = %code, "Created game session");
                    return (code, session);
                }
            }
        }
    }

    /// Pure lookup, no side effects.
    pub fn get(&self, code: &SessionCode) -> Option<Arc<GameSession>> {
        self.sessions.get(code).map(|entry| entry.value().clone())
    }

    /// Remove a session and free its code for reuse. Idempotent; removing
    /// an absent code is a no-op.
    pub fn remove(&self, code: &SessionCode) {
        if self.sessions.remove(code).is_some() {
            tracing::info!(session_code = %code, "Removed game session");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn host_sender() -> mpsc::Sender<ServerMessage> {
        mpsc::channel(8).0
    }

    #[test]
    fn codes_are_unique_among_live_sessions() {
        let registry = SessionRegistry::new();
        let mut codes = HashSet::new();
        for _ in 0..100 {
            let (code, _) = registry.create_session(host_sender());
            assert!(codes.insert(code), "duplicate live session code");
        }
        assert_eq!(registry.len(), 100);
    }

    #[test]
    fn codes_are_four_digit_strings() {
        let registry = SessionRegistry::new();
        let (code, _) = registry.create_session(host_sender());
        assert_eq!(code.as_str().len(), 4);
        assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn lookup_finds_live_sessions_only() {
        let registry = SessionRegistry::new();
        let (code, session) = registry.create_session(host_sender());
        let found = registry.get(&code).expect("session must be live");
        assert_eq!(found.code(), session.code());
        assert!(registry.get(&SessionCode::from("no-such")).is_none());
    }

    #[test]
    fn removal_is_idempotent_and_frees_the_code() {
        let registry = SessionRegistry::new();
        let (code, _) = registry.create_session(host_sender());
        registry.remove(&code);
        assert!(registry.get(&code).is_none());
        // Removing again is a no-op.
        registry.remove(&code);
        assert!(registry.is_empty());
    }
}
