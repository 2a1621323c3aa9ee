//! Domain error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A narrative threshold was configured as zero. Thresholds are
    /// rejected at construction time, never clamped.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
