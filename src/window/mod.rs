//! Windows and panels.
//!
//! A [`Window`] is the handle application threads hold. It owns no terminal
//! state of its own beyond bookkeeping (cursor, geometry, mode flags, the
//! unread part of the last line). Everything else goes through the bus.

mod panel;
#[allow(clippy::module_inception)]
mod window;

pub use panel::Panel;
pub use window::Window;
