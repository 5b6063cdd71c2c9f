//! Command bus: many producers, one dispatcher.
//!
//! Every operation against the terminal becomes a [`Command`] sent over a
//! bounded queue. The dispatcher thread is the only consumer and the only
//! caller of the backend, so commands execute one at a time in dequeue
//! order. A producer's commands keep their program order; commands from
//! different producers interleave only at whole-command granularity.
//!
//! ## Lifecycle
//!
//! The bus is open from session start until [`Bus::close`] (or a fatal
//! protocol violation). Sending on a closed bus fails with
//! [`TermError::NotInitialized`]. Closing raises the shared [`Interrupt`] so a
//! read blocked on user input gives up; its caller sees
//! [`TermError::Interrupted`].

pub mod command;
pub(crate) mod dispatcher;
pub mod oneshot;

pub use command::{Answer, Command, GlobalOp, LocalOp, PanelId, Scope, SurfaceId};
pub use oneshot::{Pending, Reply};

use crate::backend::Interrupt;
use crate::error::{Result, TermError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

/// State shared by producers and the dispatcher.
#[derive(Debug)]
pub(crate) struct BusState {
    open: AtomicBool,
    interrupt: Interrupt,
    fatal: Mutex<Option<String>>,
}

impl BusState {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Close the bus because of a fatal error.
    pub(crate) fn mark_fatal(&self, message: String) {
        *self.fatal.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
        self.open.store(false, Ordering::Release);
        self.interrupt.raise();
    }

    pub(crate) fn fatal(&self) -> Option<String> {
        self.fatal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Producer side of the command queue.
#[derive(Debug, Clone)]
pub struct Bus {
    tx: Sender<Command>,
    state: Arc<BusState>,
}

impl Bus {
    /// Create an open bus and the dispatcher's receiving end.
    pub(crate) fn new(capacity: usize, interrupt: Interrupt) -> (Self, Receiver<Command>) {
        let (tx, rx) = bounded(capacity);
        let state = Arc::new(BusState {
            open: AtomicBool::new(true),
            interrupt,
            fatal: Mutex::new(None),
        });
        (Self { tx, state }, rx)
    }

    pub(crate) fn state(&self) -> Arc<BusState> {
        Arc::clone(&self.state)
    }

    /// Whether commands are still accepted.
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Queue a command, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the bus is closed or the dispatcher is gone.
    pub fn enqueue(&self, command: Command) -> Result<()> {
        if !self.is_open() {
            return Err(TermError::NotInitialized);
        }
        trace!(target: "termbus::bus", command = %command, "enqueue");
        self.tx.send(command).map_err(|_| TermError::NotInitialized)
    }

    /// Queue a request and block until the dispatcher answers.
    ///
    /// # Errors
    ///
    /// `NotInitialized` as for [`enqueue`](Self::enqueue), `Interrupted` if
    /// the session closed before the answer, `Io` if the backend failed.
    pub fn request<T>(&self, make: impl FnOnce(Answer<T>) -> Command) -> Result<T> {
        let (reply, pending) = oneshot::channel();
        self.enqueue(make(reply))?;
        Ok(pending.wait()??)
    }

    /// Stop accepting commands and tell the dispatcher to stop.
    ///
    /// Returns `false` if the bus was already closed.
    pub(crate) fn close(&self) -> bool {
        if !self.state.open.swap(false, Ordering::AcqRel) {
            return false;
        }
        debug!(target: "termbus::bus", "closing");
        self.state.interrupt.raise();
        // Lands behind every accepted command. Fails if the dispatcher
        // already exited.
        let _ = self.tx.send(Command::Shutdown);
        true
    }
}
