//! Unified error handling for paird.
//!
//! Every boundary operation returns a `Result` with this taxonomy rather
//! than panicking past the core; the HTTP layer maps variants to status
//! codes and the metric label comes from `error_code()`.

use thiserror::Error;

/// Errors surfaced by the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Malformed or missing input. No state was mutated.
    #[error("{0}")]
    Validation(String),

    /// Referenced session is absent. Treated as already cleaned up, not fatal;
    /// the caller should rejoin.
    #[error("no such session: {0}")]
    NotFound(String),

    /// The caller's partner assumption is stale (disconnect/rematch race).
    /// The caller should re-poll its events to resynchronize.
    #[error("pairing mismatch: {0}")]
    PairingMismatch(String),

    /// An asymmetric partner link was detected. Both sides have been
    /// force-cleared and re-queued; this indicates a bug if it ever fires.
    #[error("internal inconsistency: {0}")]
    Inconsistency(String),
}

impl ChatError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::PairingMismatch(_) => "pairing_mismatch",
            Self::Inconsistency(_) => "inconsistency",
        }
    }
}

/// Result type for chat core operations.
pub type ChatResult<T> = Result<T, ChatError>;
