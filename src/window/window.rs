//! `Window`: the thread-safe handle producers draw through.

use super::panel::Panel;
use crate::backend::{CursorVisibility, Key};
use crate::bus::{Command, GlobalOp, LocalOp, PanelId, SurfaceId};
use crate::context::{Context, ROOT_WINDOW};
use crate::error::{Result, TermError};
use crate::format::{AttributeSink, FormatWriter};
use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, PairId};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A named drawing surface.
///
/// Cloning is cheap; all clones refer to the same surface. Every mutating
/// call becomes a command on the session's bus and returns once queued.
/// Reads block until the dispatcher answers.
#[derive(Clone)]
pub struct Window {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    id: SurfaceId,
    ctx: Arc<Context>,
    alive: AtomicBool,
    geometry: Mutex<Rect>,
    cursor: Mutex<Position>,
    auto_refresh: AtomicBool,
    auto_cursor: AtomicBool,
    auto_echo: AtomicBool,
    read_limit: AtomicUsize,
    last_color: Mutex<Option<String>>,
    /// Unread part of the last line read; `None` once drained.
    input: Mutex<Option<Vec<u8>>>,
    panels: Mutex<HashMap<String, PanelId>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Window {
    pub(crate) fn new(ctx: Arc<Context>, name: &str, id: SurfaceId, area: Rect) -> Self {
        let read_limit = ctx.read_limit;
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                id,
                ctx,
                alive: AtomicBool::new(true),
                geometry: Mutex::new(area),
                cursor: Mutex::new(Position::ORIGIN),
                auto_refresh: AtomicBool::new(false),
                auto_cursor: AtomicBool::new(false),
                auto_echo: AtomicBool::new(false),
                read_limit: AtomicUsize::new(read_limit),
                last_color: Mutex::new(None),
                input: Mutex::new(None),
                panels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The registry name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[cfg(test)]
    pub(crate) fn id(&self) -> SurfaceId {
        self.inner.id
    }

    /// Placement on screen, as last known.
    pub fn geometry(&self) -> Rect {
        *lock(&self.inner.geometry)
    }

    /// Cursor position as last set through [`move_to`](Self::move_to).
    pub fn cursor(&self) -> Position {
        *lock(&self.inner.cursor)
    }

    /// Name of the color pair last applied with [`set_color`](Self::set_color).
    pub fn last_color(&self) -> Option<String> {
        lock(&self.inner.last_color).clone()
    }

    /// Refresh after every mutating call.
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.inner.auto_refresh.store(enabled, Ordering::Relaxed);
    }

    /// Show the cursor while a read waits and hide it afterwards.
    pub fn set_auto_cursor(&self, enabled: bool) {
        self.inner.auto_cursor.store(enabled, Ordering::Relaxed);
    }

    /// Enable echo while a read waits and disable it afterwards.
    pub fn set_auto_echo(&self, enabled: bool) {
        self.inner.auto_echo.store(enabled, Ordering::Relaxed);
    }

    /// Maximum bytes accepted by one line read.
    pub fn set_read_limit(&self, limit: usize) {
        self.inner.read_limit.store(limit.max(1), Ordering::Relaxed);
    }

    fn check(&self) -> Result<()> {
        self.inner.ctx.ensure_open()?;
        if self.inner.alive.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TermError::not_found("window", self.name()))
        }
    }

    pub(crate) fn send(&self, op: LocalOp) -> Result<()> {
        self.check()?;
        self.inner.ctx.bus.enqueue(Command::local(self.inner.id, op))
    }

    /// Send, then refresh if auto-refresh is on.
    pub(crate) fn send_refreshing(&self, op: LocalOp) -> Result<()> {
        self.send(op)?;
        if self.inner.auto_refresh.load(Ordering::Relaxed) {
            self.send(LocalOp::Refresh)?;
        }
        Ok(())
    }

    fn global(&self, op: GlobalOp) -> Result<()> {
        self.inner.ctx.bus.enqueue(Command::Global(op))
    }

    /// Move the cursor, relative to the window origin.
    pub fn move_to(&self, y: u16, x: u16) -> Result<()> {
        let to = Position::new(y, x);
        self.send_refreshing(LocalOp::Move(to))?;
        *lock(&self.inner.cursor) = to;
        Ok(())
    }

    /// Append text at the cursor. Returns the number of bytes queued.
    pub fn write_str(&self, text: &str) -> Result<usize> {
        self.send_refreshing(LocalOp::Append(text.to_string()))?;
        Ok(text.len())
    }

    /// Insert text at the cursor, shifting the rest of the line.
    pub fn insert(&self, text: &str) -> Result<()> {
        self.send_refreshing(LocalOp::Insert(text.to_string()))
    }

    /// Delete the character under the cursor.
    pub fn delete_char(&self) -> Result<()> {
        self.send_refreshing(LocalOp::DeleteChar)
    }

    /// Show everything written since the last refresh.
    pub fn refresh(&self) -> Result<()> {
        self.send(LocalOp::Refresh)
    }

    /// Blank the window and repaint it from scratch on the next refresh.
    pub fn clear(&self) -> Result<()> {
        self.send_refreshing(LocalOp::Clear)
    }

    /// Blank the window.
    pub fn erase(&self) -> Result<()> {
        self.send_refreshing(LocalOp::Erase)
    }

    /// Allow the window to scroll. Required before [`scroll`](Self::scroll).
    pub fn set_scrolling(&self, enabled: bool) -> Result<()> {
        self.send(LocalOp::SetScrolling(enabled))
    }

    /// Scroll up by `lines` (down when negative).
    pub fn scroll(&self, lines: i32) -> Result<()> {
        self.send_refreshing(LocalOp::Scroll(lines))
    }

    /// Draw a box around the window edge.
    pub fn border(&self) -> Result<()> {
        self.send_refreshing(LocalOp::Border)
    }

    /// Apply `attributes` to subsequent writes.
    pub fn set_attributes(&self, attributes: Attributes) -> Result<()> {
        self.send(LocalOp::SetAttributes(attributes))
    }

    /// Apply a registered color pair to subsequent writes.
    ///
    /// # Errors
    ///
    /// `NotFound` if no pair has that name.
    pub fn set_color(&self, name: &str) -> Result<()> {
        let pair = self.inner.ctx.pair(name)?;
        self.send(LocalOp::SetColor(pair))?;
        *lock(&self.inner.last_color) = Some(name.to_string());
        Ok(())
    }

    /// Change the window background to a registered color pair.
    ///
    /// # Errors
    ///
    /// `NotFound` if no pair has that name.
    pub fn set_background(&self, name: &str) -> Result<()> {
        let pair = self.inner.ctx.pair(name)?;
        self.send_refreshing(LocalOp::SetBackground(pair))
    }

    /// Fill the whole window with blanks in color pair `name`, then restore
    /// the previously applied color and home the cursor.
    ///
    /// # Errors
    ///
    /// `NotFound` if no pair has that name.
    pub fn draw_bg(&self, name: &str) -> Result<()> {
        let previous = self.last_color();
        self.set_color(name)?;
        let size = self.geometry().size();
        let blank = " ".repeat(usize::from(size.width));
        for y in 0..size.height {
            self.move_to(y, 0)?;
            self.write_str(&blank)?;
        }
        match previous {
            Some(previous) => self.set_color(&previous)?,
            None => {
                self.send(LocalOp::SetColor(PairId::DEFAULT))?;
                *lock(&self.inner.last_color) = None;
            }
        }
        self.move_to(0, 0)
    }

    /// Ask the terminal for the window size and remember it.
    pub fn max_yx(&self) -> Result<Size> {
        self.check()?;
        let size = self
            .inner
            .ctx
            .bus
            .request(|reply| Command::local(self.inner.id, LocalOp::QuerySize { reply }))?;
        {
            let mut geometry = lock(&self.inner.geometry);
            geometry.width = size.width;
            geometry.height = size.height;
        }
        if self.inner.id == SurfaceId::ROOT {
            self.inner.ctx.set_root_size(size);
        }
        Ok(size)
    }

    /// Run a blocking read between the auto cursor and echo toggles.
    fn with_input_modes<T>(&self, read: impl FnOnce() -> Result<T>) -> Result<T> {
        let cursor = self.inner.auto_cursor.load(Ordering::Relaxed);
        let echo = self.inner.auto_echo.load(Ordering::Relaxed);
        if cursor {
            self.global(GlobalOp::SetCursor(CursorVisibility::Visible))?;
        }
        if echo {
            self.global(GlobalOp::SetEcho(true))?;
        }
        let value = read();
        let restored = self.restore_input_modes(cursor, echo);
        let value = value?;
        restored?;
        Ok(value)
    }

    fn restore_input_modes(&self, cursor: bool, echo: bool) -> Result<()> {
        if cursor {
            self.global(GlobalOp::SetCursor(CursorVisibility::Hidden))?;
        }
        if echo {
            self.global(GlobalOp::SetEcho(false))?;
        }
        Ok(())
    }

    fn request_line(&self) -> Result<Vec<u8>> {
        self.check()?;
        let max_len = self.inner.read_limit.load(Ordering::Relaxed);
        self.inner
            .ctx
            .bus
            .request(|reply| Command::local(self.inner.id, LocalOp::ReadLine { max_len, reply }))
    }

    /// Block until the user enters a line. The line ending is not included.
    ///
    /// # Errors
    ///
    /// `Interrupted` if the session closes while waiting.
    pub fn read_line(&self) -> Result<String> {
        let line = self.with_input_modes(|| self.request_line())?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Block until the user presses a key.
    ///
    /// # Errors
    ///
    /// `Interrupted` if the session closes while waiting.
    pub fn get_char(&self) -> Result<Key> {
        self.with_input_modes(|| {
            self.check()?;
            self.inner
                .ctx
                .bus
                .request(|reply| Command::local(self.inner.id, LocalOp::ReadKey { reply }))
        })
    }

    /// A writer interpreting inline attribute markers, using the session's
    /// marker table.
    pub fn format_writer(&self) -> FormatWriter<Self> {
        FormatWriter::with_markers(self.clone(), self.inner.ctx.markers.clone())
    }

    /// Make this window a panel registered under `name`.
    pub fn new_panel(&self, name: &str) -> Result<Panel> {
        self.check()?;
        let id = self.inner.ctx.next_panel();
        self.inner.ctx.bus.request(|reply| {
            Command::local(self.inner.id, LocalOp::CreatePanel { panel: id, reply })
        })?;
        lock(&self.inner.panels).insert(name.to_string(), id);
        Ok(Panel::new(id, name, self.clone()))
    }

    /// Look up a panel created on this window.
    pub fn panel(&self, name: &str) -> Result<Panel> {
        let id = lock(&self.inner.panels)
            .get(name)
            .copied()
            .ok_or_else(|| TermError::not_found("panel", name))?;
        Ok(Panel::new(id, name, self.clone()))
    }

    /// Remove the window from the registry and release its surface.
    /// Every later call on any clone fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for the root window.
    pub fn destroy(&self) -> Result<()> {
        if self.inner.id == SurfaceId::ROOT {
            return Err(TermError::InvalidArgument(format!(
                "the root window \"{ROOT_WINDOW}\" cannot be destroyed"
            )));
        }
        self.check()?;
        if self.inner.alive.swap(false, Ordering::AcqRel) {
            self.inner.ctx.unregister(self.name());
            lock(&self.inner.panels).clear();
            self.global(GlobalOp::DestroySurface(self.inner.id))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id.0)
            .field("geometry", &self.geometry())
            .field("cursor", &self.cursor())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Window {}

impl AttributeSink for Window {
    fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
        Window::set_attributes(self, attributes)
    }

    fn write_text(&mut self, text: &str) -> Result<usize> {
        self.write_str(text)
    }
}

impl io::Write for Window {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_str(&String::from_utf8_lossy(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.refresh()?)
    }
}

/// Reads a line once, hands it out across calls, then reports end of data
/// once and starts over with a fresh line on the next call.
impl io::Read for Window {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut input = lock(&self.inner.input);
        if input.is_none() {
            *input = Some(self.with_input_modes(|| self.request_line())?);
        }
        let pending = input.get_or_insert_with(Vec::new);
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        if n == 0 {
            *input = None;
        } else {
            *pending = pending.split_off(n);
        }
        Ok(n)
    }
}
