//! Short join codes for live sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 4-digit numeric code identifying one live session.
///
/// Codes are generated by the registry with collision retry and are unique
/// among currently-live sessions only; removing a session frees its code
/// for reuse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionCode(String);

impl SessionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
