//! Session configuration.

use crate::error::{Result, TermError};
use crate::format::MarkerTable;
use std::time::Duration;

/// What the dispatcher does after a fatal protocol violation, once the
/// terminal has been restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalAction {
    /// Terminate the process with this exit status.
    Exit(i32),
    /// Stop the dispatcher and leave the process running. Every later call
    /// fails with `NotInitialized`.
    Halt,
}

impl Default for FatalAction {
    fn default() -> Self {
        Self::Exit(1)
    }
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the command queue. Producers block when it is full.
    pub queue_capacity: usize,
    /// Maximum bytes accepted by one line read.
    pub read_limit: usize,
    /// How often a blocking read checks whether the session is closing.
    pub input_poll_timeout: Duration,
    /// Reaction to a fatal protocol violation.
    pub fatal_action: FatalAction,
    /// Markers understood by format writers.
    pub markers: MarkerTable,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            read_limit: 255,
            input_poll_timeout: Duration::from_millis(10),
            fatal_action: FatalAction::default(),
            markers: MarkerTable::default(),
        }
    }
}

impl SessionConfig {
    /// Check the values are usable.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero queue capacity, read limit or poll timeout.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(TermError::InvalidArgument("queue capacity must be positive".into()));
        }
        if self.read_limit == 0 {
            return Err(TermError::InvalidArgument("read limit must be positive".into()));
        }
        if self.input_poll_timeout.is_zero() {
            return Err(TermError::InvalidArgument("input poll timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fatal_action, FatalAction::Exit(1));
        assert_eq!(config.read_limit, 255);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = SessionConfig {
            queue_capacity: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(TermError::InvalidArgument(_))));
    }
}
