//! # Termbus
//!
//! Drive one non-reentrant terminal from many threads.
//!
//! Every window call becomes a command on a bounded queue. A dedicated
//! dispatcher thread owns the terminal and executes the commands one at a
//! time, in order. Blocking reads travel the same way and get their answer
//! back on a single-use channel.
//!
//! ## Core Concepts
//!
//! - **Command bus**: many producers, one consumer, total order
//! - **Windows**: cheap, cloneable handles that only enqueue
//! - **Format writer**: `*bold*`, `~reverse~`, `-italic-` and `_underline_`
//!   markers become attribute changes; doubled markers are literal
//! - **Teardown**: ending the session cancels blocked reads and restores the
//!   terminal, also after a fatal error
//!
//! ## Example
//!
//! ```rust,ignore
//! use termbus::{Position, Session, Size, TerminalBackend};
//!
//! let session = Session::init(TerminalBackend::stdout())?;
//! let dialog = session.new_window("dialog", Position::new(5, 20), Size::new(5, 40))?;
//! dialog.border()?;
//! dialog.move_to(1, 2)?;
//! dialog.format_writer().print("What is your *name*? ")?;
//! dialog.refresh()?;
//! let name = dialog.read_line()?;
//! session.end()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod bus;
pub mod config;
mod context;
pub mod error;
pub mod format;
pub mod layout;
pub mod session;
pub mod style;
pub mod window;

// Re-exports for convenience
pub use backend::{
    Backend, Capabilities, CursorVisibility, Key, RecordingBackend, SharedOutput, TerminalBackend,
};
pub use config::{FatalAction, SessionConfig};
pub use context::ROOT_WINDOW;
pub use error::{Result, TermError};
pub use format::{parse, FormatOp, FormatWriter, MarkerTable};
pub use layout::{Position, Rect, Size};
pub use session::Session;
pub use style::{Attributes, Color, CustomColor, PairId};
pub use window::{Panel, Window};
