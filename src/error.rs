//! Error taxonomy shared by every public operation.

use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TermError>;

/// Errors returned by sessions, windows and format writers.
#[derive(Error, Debug)]
pub enum TermError {
    /// The session was never started or has already been torn down.
    #[error("terminal session is not initialized")]
    NotInitialized,

    /// Another session already owns the process terminal.
    #[error("terminal session is already initialized")]
    AlreadyInitialized,

    /// The terminal lacks a requested feature.
    #[error("unsupported terminal capability: {0}")]
    UnsupportedCapability(String),

    /// A named resource (color pair, color, window, panel) does not exist.
    #[error("{kind} \"{name}\" does not exist")]
    NotFound {
        /// What kind of resource was looked up.
        kind: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// A value was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A fixed-capacity table is full.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The dispatcher received a command it cannot execute. Fatal.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A blocking read was cancelled because the session shut down.
    #[error("blocking read interrupted by shutdown")]
    Interrupted,

    /// The terminal backend failed while answering a request.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TermError {
    /// Shorthand for a [`TermError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether this error is the fatal protocol category.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }
}

impl From<TermError> for io::Error {
    fn from(err: TermError) -> Self {
        match err {
            TermError::Io(inner) => inner,
            TermError::NotInitialized => Self::new(io::ErrorKind::NotConnected, err),
            // Final, not the retryable `ErrorKind::Interrupted`.
            TermError::Interrupted => Self::new(io::ErrorKind::BrokenPipe, err),
            TermError::NotFound { .. } => Self::new(io::ErrorKind::NotFound, err),
            TermError::InvalidArgument(_) => Self::new(io::ErrorKind::InvalidInput, err),
            other => Self::other(other),
        }
    }
}
