//! A backend that records every native call instead of drawing.

use super::input::{read_key_with, read_line_with, Key, ScriptedInput, ScriptedKeys};
use super::{Backend, Capabilities, CursorVisibility, Interrupt};
use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, Color, CustomColor, PairId};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// One native call, with surfaces and panels identified by their native index.
/// The root surface is index 0.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Initialize,
    Finalize,
    EmergencyShutdown,
    CreateSurface { surface: u32, area: Rect },
    DestroySurface(u32),
    QuerySize(u32),
    Move(u32, Position),
    Append(u32, String),
    Insert(u32, String),
    DeleteChar(u32),
    Refresh(u32),
    Clear(u32),
    Erase(u32),
    SetScrolling(u32, bool),
    Scroll(u32, i32),
    SetAttributes(u32, Attributes),
    SetColorPair(u32, PairId),
    SetBackground(u32, PairId),
    Border(u32),
    ReadLine { surface: u32, max_len: usize },
    ReadKey(u32),
    StartColor,
    InitPair(PairId, Color, Color),
    InitColor(Color, CustomColor),
    SetEcho(bool),
    SetCursor(CursorVisibility),
    CreatePanel(u32),
    RaisePanel(u32),
    LowerPanel(u32),
}

impl NativeCall {
    /// The surface the call operates on, if any.
    pub const fn surface(&self) -> Option<u32> {
        match self {
            Self::CreateSurface { surface, .. } | Self::ReadLine { surface, .. } => Some(*surface),
            Self::DestroySurface(s)
            | Self::QuerySize(s)
            | Self::Move(s, _)
            | Self::Append(s, _)
            | Self::Insert(s, _)
            | Self::DeleteChar(s)
            | Self::Refresh(s)
            | Self::Clear(s)
            | Self::Erase(s)
            | Self::SetScrolling(s, _)
            | Self::Scroll(s, _)
            | Self::SetAttributes(s, _)
            | Self::SetColorPair(s, _)
            | Self::SetBackground(s, _)
            | Self::Border(s)
            | Self::ReadKey(s)
            | Self::CreatePanel(s)
            | Self::RaisePanel(s)
            | Self::LowerPanel(s) => Some(*s),
            _ => None,
        }
    }
}

/// A native call and the thread that made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Calling thread.
    pub thread: ThreadId,
    /// The call.
    pub call: NativeCall,
}

type Log = Arc<Mutex<Vec<RecordedCall>>>;
type FailWhen = fn(&NativeCall) -> bool;

/// Backend recording native calls into a shared log.
#[derive(Debug)]
pub struct RecordingBackend {
    log: Log,
    input: ScriptedInput,
    root_size: Size,
    capabilities: Capabilities,
    claims: bool,
    delay: Option<Duration>,
    fail_when: Option<FailWhen>,
    next_surface: u32,
    live_surfaces: Vec<u32>,
}

/// Test-side view of a [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    log: Log,
    /// Feeds keys to the backend's reads.
    pub keys: ScriptedKeys,
}

impl RecordingBackend {
    /// A backend with a 24x80 root surface and default capabilities.
    pub fn new() -> (Self, RecordingHandle) {
        let log = Log::default();
        let (input, keys) = ScriptedInput::new();
        let backend = Self {
            log: Arc::clone(&log),
            input,
            root_size: Size::new(24, 80),
            capabilities: Capabilities::default(),
            claims: false,
            delay: None,
            fail_when: None,
            next_surface: 1,
            live_surfaces: vec![0],
        };
        (backend, RecordingHandle { log, keys })
    }

    /// Report `size` for the root surface.
    #[must_use]
    pub fn with_root_size(mut self, size: Size) -> Self {
        self.root_size = size;
        self
    }

    /// Report `capabilities` from `initialize`.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sleep inside every call, to widen race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call matching `fail_when` with an I/O error.
    #[must_use]
    pub fn failing_when(mut self, fail_when: FailWhen) -> Self {
        self.fail_when = Some(fail_when);
        self
    }

    /// Behave like a backend owning the process terminal.
    #[must_use]
    pub fn claiming_terminal(mut self) -> Self {
        self.claims = true;
        self
    }

    fn record(&self, call: NativeCall) -> io::Result<()> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let failed = self.fail_when.is_some_and(|f| f(&call));
        let message = failed.then(|| format!("native call failed: {call:?}"));
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                thread: thread::current().id(),
                call,
            });
        match message {
            Some(message) => Err(io::Error::other(message)),
            None => Ok(()),
        }
    }

    fn check_live(&self, surface: u32) -> io::Result<()> {
        if self.live_surfaces.contains(&surface) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("no surface {surface}")))
        }
    }
}

impl RecordingHandle {
    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded calls without thread ids.
    pub fn native_calls(&self) -> Vec<NativeCall> {
        self.calls().into_iter().map(|c| c.call).collect()
    }

    /// Calls on one surface, in order.
    pub fn calls_on(&self, surface: u32) -> Vec<NativeCall> {
        self.native_calls()
            .into_iter()
            .filter(|c| c.surface() == Some(surface))
            .collect()
    }
}

impl Backend for RecordingBackend {
    type Surface = u32;
    type Panel = u32;

    fn claims_terminal(&self) -> bool {
        self.claims
    }

    fn initialize(&mut self) -> io::Result<Capabilities> {
        self.record(NativeCall::Initialize)?;
        Ok(self.capabilities)
    }

    fn finalize(&mut self) -> io::Result<()> {
        self.record(NativeCall::Finalize)
    }

    fn emergency_shutdown(&mut self) {
        let _ = self.record(NativeCall::EmergencyShutdown);
    }

    fn root_surface(&mut self) -> io::Result<u32> {
        Ok(0)
    }

    fn create_surface(&mut self, area: Rect) -> io::Result<u32> {
        let surface = self.next_surface;
        self.record(NativeCall::CreateSurface { surface, area })?;
        self.next_surface += 1;
        self.live_surfaces.push(surface);
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: u32) -> io::Result<()> {
        self.check_live(surface)?;
        self.live_surfaces.retain(|&s| s != surface);
        self.record(NativeCall::DestroySurface(surface))
    }

    fn query_size(&mut self, surface: &u32) -> io::Result<Size> {
        self.record(NativeCall::QuerySize(*surface))?;
        Ok(self.root_size)
    }

    fn move_cursor(&mut self, surface: &u32, to: Position) -> io::Result<()> {
        self.record(NativeCall::Move(*surface, to))
    }

    fn append_text(&mut self, surface: &u32, text: &str) -> io::Result<()> {
        self.record(NativeCall::Append(*surface, text.to_string()))
    }

    fn insert_text(&mut self, surface: &u32, text: &str) -> io::Result<()> {
        self.record(NativeCall::Insert(*surface, text.to_string()))
    }

    fn delete_char(&mut self, surface: &u32) -> io::Result<()> {
        self.record(NativeCall::DeleteChar(*surface))
    }

    fn refresh(&mut self, surface: &u32) -> io::Result<()> {
        self.record(NativeCall::Refresh(*surface))
    }

    fn clear(&mut self, surface: &u32) -> io::Result<()> {
        self.record(NativeCall::Clear(*surface))
    }

    fn erase(&mut self, surface: &u32) -> io::Result<()> {
        self.record(NativeCall::Erase(*surface))
    }

    fn set_scrolling(&mut self, surface: &u32, enabled: bool) -> io::Result<()> {
        self.record(NativeCall::SetScrolling(*surface, enabled))
    }

    fn scroll(&mut self, surface: &u32, lines: i32) -> io::Result<()> {
        self.record(NativeCall::Scroll(*surface, lines))
    }

    fn set_attributes(&mut self, surface: &u32, attributes: Attributes) -> io::Result<()> {
        self.record(NativeCall::SetAttributes(*surface, attributes))
    }

    fn set_color_pair(&mut self, surface: &u32, pair: PairId) -> io::Result<()> {
        self.record(NativeCall::SetColorPair(*surface, pair))
    }

    fn set_background(&mut self, surface: &u32, pair: PairId) -> io::Result<()> {
        self.record(NativeCall::SetBackground(*surface, pair))
    }

    fn draw_border(&mut self, surface: &u32) -> io::Result<()> {
        self.record(NativeCall::Border(*surface))
    }

    fn read_line(
        &mut self,
        surface: &u32,
        max_len: usize,
        interrupt: &Interrupt,
    ) -> io::Result<Option<Vec<u8>>> {
        self.record(NativeCall::ReadLine {
            surface: *surface,
            max_len,
        })?;
        read_line_with(&mut self.input, max_len, interrupt, |_| Ok(()))
    }

    fn read_key(&mut self, surface: &u32, interrupt: &Interrupt) -> io::Result<Option<Key>> {
        self.record(NativeCall::ReadKey(*surface))?;
        read_key_with(&mut self.input, interrupt)
    }

    fn start_color(&mut self) -> io::Result<()> {
        self.record(NativeCall::StartColor)
    }

    fn init_pair(&mut self, pair: PairId, fg: Color, bg: Color) -> io::Result<()> {
        self.record(NativeCall::InitPair(pair, fg, bg))
    }

    fn init_color(&mut self, color: Color, value: CustomColor) -> io::Result<()> {
        self.record(NativeCall::InitColor(color, value))
    }

    fn set_echo(&mut self, enabled: bool) -> io::Result<()> {
        self.record(NativeCall::SetEcho(enabled))
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        self.record(NativeCall::SetCursor(visibility))
    }

    fn create_panel(&mut self, surface: &u32) -> io::Result<u32> {
        self.check_live(*surface)?;
        self.record(NativeCall::CreatePanel(*surface))?;
        Ok(*surface)
    }

    fn raise_panel(&mut self, panel: &u32) -> io::Result<()> {
        self.record(NativeCall::RaisePanel(*panel))
    }

    fn lower_panel(&mut self, panel: &u32) -> io::Result<()> {
        self.record(NativeCall::LowerPanel(*panel))
    }
}
