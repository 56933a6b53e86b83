// crates/client/src/error.rs
use thiserror::Error;

/// Everything that can go wrong talking to the remote-control daemon.
#[derive(Debug, Error)]
pub enum RcError {
    /// Connection, timeout or body-read failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The daemon answered 401, whatever the body said.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Malformed or unexpected daemon reply. Carries the daemon's own text
    /// when it sent one.
    #[error("{0}")]
    Protocol(String),

    /// The daemon reported an error for a specific job or call.
    #[error("{0}")]
    Remote(String),

    /// Cooperative cancellation was observed.
    #[error("{0}")]
    Cancelled(String),

    #[error("No client found")]
    NoSession,

    #[error("Invalid host {host}: {reason}")]
    InvalidHost { host: String, reason: String },

    /// A guarded action is already in flight.
    #[error("{0}")]
    Busy(String),
}

impl RcError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RcError::Cancelled(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RcError::Unauthorized)
    }
}
