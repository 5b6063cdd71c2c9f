//! Keyboard input sources and the line editor used by blocking reads.
//!
//! Blocking reads never park forever on the device: they poll with a short
//! timeout and give up as soon as the session's [`Interrupt`] is raised.

use super::Interrupt;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use crossterm::event::{self, Event, KeyEventKind, KeyModifiers};
use std::io;
use std::time::Duration;

/// Key codes delivered by `get_char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (or a control code for Ctrl+letter).
    Char(char),
    /// Function key (F1-F12).
    F(u8),
    /// Backspace key.
    Backspace,
    /// Enter/Return key.
    Enter,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Tab key.
    Tab,
    /// Backtab (Shift+Tab).
    BackTab,
    /// Delete key.
    Delete,
    /// Insert key.
    Insert,
    /// Escape key.
    Esc,
}

impl Key {
    /// Map a typed character to a key, the way a terminal would send it.
    pub const fn from_char(c: char) -> Self {
        match c {
            '\n' | '\r' => Self::Enter,
            '\t' => Self::Tab,
            '\x08' | '\x7f' => Self::Backspace,
            '\x1b' => Self::Esc,
            c => Self::Char(c),
        }
    }
}

/// A source of key presses.
pub trait InputSource: Send {
    /// Wait up to `timeout` for the next key.
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>>;
}

/// Live keyboard input through crossterm's event queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            // Only key presses, not releases or repeats
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                Ok(convert_key(key_event.code, key_event.modifiers))
            }
            _ => Ok(None),
        }
    }
}

/// Convert a crossterm key code to our [`Key`].
fn convert_key(code: event::KeyCode, modifiers: KeyModifiers) -> Option<Key> {
    Some(match code {
        event::KeyCode::Char(c)
            if modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() =>
        {
            Key::Char(char::from(c.to_ascii_lowercase() as u8 & 0x1f))
        }
        event::KeyCode::Char(c) => Key::Char(c),
        event::KeyCode::F(n) => Key::F(n),
        event::KeyCode::Backspace => Key::Backspace,
        event::KeyCode::Enter => Key::Enter,
        event::KeyCode::Left => Key::Left,
        event::KeyCode::Right => Key::Right,
        event::KeyCode::Up => Key::Up,
        event::KeyCode::Down => Key::Down,
        event::KeyCode::Home => Key::Home,
        event::KeyCode::End => Key::End,
        event::KeyCode::PageUp => Key::PageUp,
        event::KeyCode::PageDown => Key::PageDown,
        event::KeyCode::Tab => Key::Tab,
        event::KeyCode::BackTab => Key::BackTab,
        event::KeyCode::Delete => Key::Delete,
        event::KeyCode::Insert => Key::Insert,
        event::KeyCode::Esc => Key::Esc,
        _ => return None,
    })
}

/// Keys fed from another thread, for headless sessions and tests.
#[derive(Debug)]
pub struct ScriptedInput {
    keys: Receiver<Key>,
}

/// The feeding end of a [`ScriptedInput`].
#[derive(Debug, Clone)]
pub struct ScriptedKeys {
    keys: Sender<Key>,
}

impl ScriptedInput {
    /// Create a scripted source and its feeding handle.
    pub fn new() -> (Self, ScriptedKeys) {
        let (tx, rx) = unbounded();
        (Self { keys: rx }, ScriptedKeys { keys: tx })
    }
}

impl InputSource for ScriptedInput {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        match self.keys.recv_timeout(timeout) {
            Ok(key) => Ok(Some(key)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scripted input exhausted",
            )),
        }
    }
}

impl ScriptedKeys {
    /// Queue one key press.
    pub fn press(&self, key: Key) {
        let _ = self.keys.send(key);
    }

    /// Queue the keys for typing `text`; `'\n'` becomes Enter.
    pub fn type_str(&self, text: &str) {
        for c in text.chars() {
            self.press(Key::from_char(c));
        }
    }
}

/// A change to the line being edited, for echoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEdit {
    /// A character was appended.
    Push(char),
    /// The last character was erased.
    Pop(char),
}

/// Collect keys into a line until Enter.
///
/// Characters that would push the line past `max_len` bytes are dropped.
/// Returns `Ok(None)` if `interrupt` is raised first.
pub fn read_line_with<I, F>(
    input: &mut I,
    max_len: usize,
    interrupt: &Interrupt,
    mut on_edit: F,
) -> io::Result<Option<Vec<u8>>>
where
    I: InputSource + ?Sized,
    F: FnMut(LineEdit) -> io::Result<()>,
{
    let mut line = String::new();
    loop {
        if interrupt.is_raised() {
            return Ok(None);
        }
        match input.poll_key(interrupt.poll_interval())? {
            Some(Key::Enter) => return Ok(Some(line.into_bytes())),
            Some(Key::Backspace) => {
                if let Some(c) = line.pop() {
                    on_edit(LineEdit::Pop(c))?;
                }
            }
            Some(Key::Char(c)) if !c.is_control() => {
                if line.len() + c.len_utf8() <= max_len {
                    line.push(c);
                    on_edit(LineEdit::Push(c))?;
                }
            }
            _ => {}
        }
    }
}

/// Wait for a single key. Returns `Ok(None)` if `interrupt` is raised first.
pub fn read_key_with<I>(input: &mut I, interrupt: &Interrupt) -> io::Result<Option<Key>>
where
    I: InputSource + ?Sized,
{
    loop {
        if interrupt.is_raised() {
            return Ok(None);
        }
        if let Some(key) = input.poll_key(interrupt.poll_interval())? {
            return Ok(Some(key));
        }
    }
}
