//! Single-use response channel for request/response commands.
//!
//! A [`Reply`] travels inside the command to the dispatcher and is consumed
//! by sending, so it can answer at most once. The caller keeps the
//! [`Pending`] half and waits on it exactly once. If the command is dropped
//! without an answer (the session closed first) the wait ends with
//! [`TermError::Interrupted`].

use crate::error::{Result, TermError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;

/// Answering half, owned by the command.
pub struct Reply<T> {
    tx: Sender<T>,
}

/// Waiting half, owned by the caller.
pub struct Pending<T> {
    rx: Receiver<T>,
}

/// Create a connected reply/pending pair.
pub fn channel<T>() -> (Reply<T>, Pending<T>) {
    let (tx, rx) = bounded(1);
    (Reply { tx }, Pending { rx })
}

impl<T> Reply<T> {
    /// Deliver the answer. A caller that stopped waiting is not an error.
    pub fn send(self, value: T) {
        let _ = self.tx.send(value);
    }
}

impl<T> Pending<T> {
    /// Block until the answer arrives.
    ///
    /// # Errors
    ///
    /// [`TermError::Interrupted`] if the reply was dropped unanswered.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| TermError::Interrupted)
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply")
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pending")
    }
}
