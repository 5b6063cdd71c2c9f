//! Backend: the boundary to the native terminal library.
//!
//! A [`Backend`] is non-reentrant and is only ever driven from the
//! dispatcher thread, which owns it for the whole session. Native surface
//! and panel handles never leave that thread, so they carry no `Send` bound.
//!
//! Implementations:
//! - [`TerminalBackend`]: renders through `crossterm` onto stdout (or any
//!   writer, with scripted input, for headless use)
//! - [`RecordingBackend`]: records every native call, for tests

mod input;
mod recording;
mod screen;
mod terminal;

pub use input::{
    read_key_with, read_line_with, CrosstermInput, InputSource, Key, LineEdit, ScriptedInput,
    ScriptedKeys,
};
pub use recording::{NativeCall, RecordedCall, RecordingBackend, RecordingHandle};
pub use terminal::{SharedOutput, TerminalBackend};

use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, Color, CustomColor, PairId};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cursor visibility modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorVisibility {
    /// Cursor is hidden.
    Hidden,
    /// Cursor is visible.
    #[default]
    Visible,
    /// Cursor is visible and highlighted (not supported on all terminals).
    Highlighted,
}

/// What the terminal supports, reported once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the terminal can display colors at all.
    pub has_colors: bool,
    /// Whether custom colors can be defined.
    pub can_change_color: bool,
    /// Number of colors, base colors included.
    pub colors: u16,
    /// Number of color pairs, the default pair included.
    pub color_pairs: u16,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            has_colors: true,
            can_change_color: false,
            colors: 8,
            color_pairs: 64,
        }
    }
}

/// Raised when the session shuts down.
///
/// Blocking reads wait for input in slices of `poll_interval` and check the
/// flag between slices.
#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl Interrupt {
    /// A fresh, lowered flag.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            poll_interval,
        }
    }

    /// Raise the flag.
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether the flag has been raised.
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// How long a read waits for input before checking the flag again.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// The native terminal library, as seen by the dispatcher.
///
/// Reads return `Ok(None)` when `interrupt` was raised before input arrived.
#[allow(missing_docs)]
pub trait Backend: Send + 'static {
    /// Native surface handle.
    type Surface;
    /// Native panel handle.
    type Panel;

    /// Whether this backend owns the process terminal. At most one session
    /// over such a backend may be live at a time.
    fn claims_terminal(&self) -> bool {
        false
    }

    /// Enter terminal mode.
    fn initialize(&mut self) -> io::Result<Capabilities>;
    /// Leave terminal mode, restoring the user's terminal.
    fn finalize(&mut self) -> io::Result<()>;
    /// Best-effort restoration after a fatal error. Must not panic.
    fn emergency_shutdown(&mut self) {
        let _ = self.finalize();
    }

    /// The full-screen root surface.
    fn root_surface(&mut self) -> io::Result<Self::Surface>;
    fn create_surface(&mut self, area: Rect) -> io::Result<Self::Surface>;
    fn destroy_surface(&mut self, surface: Self::Surface) -> io::Result<()>;
    fn query_size(&mut self, surface: &Self::Surface) -> io::Result<Size>;

    fn move_cursor(&mut self, surface: &Self::Surface, to: Position) -> io::Result<()>;
    fn append_text(&mut self, surface: &Self::Surface, text: &str) -> io::Result<()>;
    fn insert_text(&mut self, surface: &Self::Surface, text: &str) -> io::Result<()>;
    fn delete_char(&mut self, surface: &Self::Surface) -> io::Result<()>;
    fn refresh(&mut self, surface: &Self::Surface) -> io::Result<()>;
    fn clear(&mut self, surface: &Self::Surface) -> io::Result<()>;
    fn erase(&mut self, surface: &Self::Surface) -> io::Result<()>;
    fn set_scrolling(&mut self, surface: &Self::Surface, enabled: bool) -> io::Result<()>;
    fn scroll(&mut self, surface: &Self::Surface, lines: i32) -> io::Result<()>;
    fn set_attributes(&mut self, surface: &Self::Surface, attributes: Attributes) -> io::Result<()>;
    fn set_color_pair(&mut self, surface: &Self::Surface, pair: PairId) -> io::Result<()>;
    fn set_background(&mut self, surface: &Self::Surface, pair: PairId) -> io::Result<()>;
    fn draw_border(&mut self, surface: &Self::Surface) -> io::Result<()>;

    /// Block until a full line is entered, at most `max_len` bytes.
    fn read_line(
        &mut self,
        surface: &Self::Surface,
        max_len: usize,
        interrupt: &Interrupt,
    ) -> io::Result<Option<Vec<u8>>>;
    /// Block until a single key is pressed.
    fn read_key(
        &mut self,
        surface: &Self::Surface,
        interrupt: &Interrupt,
    ) -> io::Result<Option<Key>>;

    fn start_color(&mut self) -> io::Result<()>;
    fn init_pair(&mut self, pair: PairId, fg: Color, bg: Color) -> io::Result<()>;
    fn init_color(&mut self, color: Color, value: CustomColor) -> io::Result<()>;
    fn set_echo(&mut self, enabled: bool) -> io::Result<()>;
    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()>;

    fn create_panel(&mut self, surface: &Self::Surface) -> io::Result<Self::Panel>;
    fn raise_panel(&mut self, panel: &Self::Panel) -> io::Result<()>;
    fn lower_panel(&mut self, panel: &Self::Panel) -> io::Result<()>;
}
