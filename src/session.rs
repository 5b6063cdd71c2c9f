//! Session: terminal setup and teardown, plus the terminal-wide calls.
//!
//! A session starts the dispatcher on its own thread, initializes the
//! terminal there and registers the root window. Ending the session (or
//! dropping it) closes the bus, cancels any blocking read, restores the
//! terminal and empties the registry.

use crate::backend::{Backend, Capabilities, CursorVisibility, Interrupt};
use crate::bus::dispatcher::Dispatcher;
use crate::bus::{Bus, Command, GlobalOp, SurfaceId};
use crate::config::SessionConfig;
use crate::context::{Context, ROOT_WINDOW};
use crate::error::{Result, TermError};
use crate::layout::{Position, Rect, Size};
use crate::style::{Color, CustomColor, PairId};
use crate::window::Window;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Custom colors defined by [`Session::start_color`] when the terminal
/// allows changing colors.
pub const DEFAULT_CUSTOM_COLORS: [(&str, CustomColor); 5] = [
    ("blk", CustomColor::new(0, 0, 0)),
    ("w", CustomColor::new(999, 999, 999)),
    ("r", CustomColor::new(999, 0, 0)),
    ("g", CustomColor::new(0, 999, 0)),
    ("b", CustomColor::new(0, 0, 999)),
];

static TERMINAL_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Held while a session owns the process terminal.
#[derive(Debug)]
struct TerminalClaim;

impl TerminalClaim {
    fn acquire() -> Result<Self> {
        if TERMINAL_CLAIMED.swap(true, Ordering::AcqRel) {
            Err(TermError::AlreadyInitialized)
        } else {
            Ok(Self)
        }
    }
}

impl Drop for TerminalClaim {
    fn drop(&mut self) {
        TERMINAL_CLAIMED.store(false, Ordering::Release);
    }
}

/// A running terminal session.
///
/// # Example
///
/// ```rust,ignore
/// use termbus::{Session, TerminalBackend};
///
/// let session = Session::init(TerminalBackend::stdout())?;
/// let root = session.root();
/// root.move_to(1, 2)?;
/// root.write_str("Hello")?;
/// root.refresh()?;
/// session.end()?;
/// ```
#[derive(Debug)]
pub struct Session {
    ctx: Arc<Context>,
    root: Window,
    dispatcher: Dispatcher,
    ended: bool,
}

impl Session {
    /// Start a session with the default configuration.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if another live session owns the terminal, `Io`
    /// if the terminal cannot be set up.
    pub fn init<B: Backend>(backend: B) -> Result<Self> {
        Self::with_config(backend, SessionConfig::default())
    }

    /// Start a session.
    ///
    /// # Errors
    ///
    /// As [`init`](Self::init), plus `InvalidArgument` for an unusable config.
    pub fn with_config<B: Backend>(backend: B, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let claim = if backend.claims_terminal() {
            Some(TerminalClaim::acquire()?)
        } else {
            None
        };

        let interrupt = Interrupt::new(config.input_poll_timeout);
        let (bus, receiver) = Bus::new(config.queue_capacity, interrupt);
        let (dispatcher, ready) =
            Dispatcher::spawn(backend, receiver, bus.state(), config.fatal_action, claim)?;

        let ctx = Arc::new(Context::new(
            bus,
            ready.capabilities,
            ready.root_size,
            config.markers,
            config.read_limit,
        ));
        let root = Window::new(
            Arc::clone(&ctx),
            ROOT_WINDOW,
            SurfaceId::ROOT,
            Rect::from_size(ready.root_size),
        );
        ctx.register(root.clone())?;

        info!(
            target: "termbus::session",
            rows = ready.root_size.height,
            cols = ready.root_size.width,
            colors = ready.capabilities.colors,
            "session started"
        );
        Ok(Self {
            ctx,
            root,
            dispatcher,
            ended: false,
        })
    }

    /// The full-screen root window.
    pub const fn root(&self) -> &Window {
        &self.root
    }

    /// What the terminal reported at startup.
    pub fn capabilities(&self) -> Capabilities {
        self.ctx.capabilities
    }

    /// Whether the session still accepts calls.
    pub fn is_initialized(&self) -> bool {
        self.ctx.bus.is_open()
    }

    /// The fatal error that stopped the dispatcher, if any.
    pub fn fatal_error(&self) -> Option<String> {
        self.ctx.bus.state().fatal()
    }

    /// Create a window at `origin` (relative to the screen) with `size`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the name is taken, the size is empty or the
    /// window does not fit on screen. Nothing is queued in that case.
    pub fn new_window(&self, name: &str, origin: Position, size: Size) -> Result<Window> {
        self.ctx.ensure_open()?;
        self.ctx.ensure_unique(name)?;
        if size.is_empty() {
            return Err(TermError::InvalidArgument(format!(
                "window \"{name}\" has an empty size {size:?}"
            )));
        }
        let area = Rect::from_parts(origin, size);
        let screen = self.ctx.root_size();
        if !area.fits_within(screen) {
            return Err(TermError::InvalidArgument(format!(
                "window \"{name}\" at {area:?} exceeds terminal size {screen:?}"
            )));
        }

        let id = self.ctx.next_surface();
        self.ctx
            .bus
            .request(|reply| Command::Global(GlobalOp::CreateSurface { id, area, reply }))?;
        let window = Window::new(Arc::clone(&self.ctx), name, id, area);
        if let Err(e) = self.ctx.register(window.clone()) {
            // Lost a naming race; release the surface again.
            self.ctx.bus.enqueue(Command::Global(GlobalOp::DestroySurface(id)))?;
            return Err(e);
        }
        debug!(target: "termbus::session", name, ?area, "window created");
        Ok(window)
    }

    /// Look up a window by name.
    pub fn window(&self, name: &str) -> Result<Window> {
        self.ctx.ensure_open()?;
        self.ctx.window(name)
    }

    /// Toggle echo of typed input.
    pub fn set_echo(&self, enabled: bool) -> Result<()> {
        self.ctx.bus.enqueue(Command::Global(GlobalOp::SetEcho(enabled)))
    }

    /// Change cursor visibility.
    pub fn set_cursor(&self, visibility: CursorVisibility) -> Result<()> {
        self.ctx.bus.enqueue(Command::Global(GlobalOp::SetCursor(visibility)))
    }

    /// Switch to color mode and register the default pair `"std"`.
    ///
    /// When the terminal can change colors, also defines the custom colors
    /// listed in [`DEFAULT_CUSTOM_COLORS`].
    ///
    /// # Errors
    ///
    /// `UnsupportedCapability` if the terminal has no colors.
    pub fn start_color(&self) -> Result<()> {
        self.ctx.ensure_open()?;
        if !self.ctx.capabilities.has_colors {
            return Err(TermError::UnsupportedCapability(
                "terminal does not support colors".into(),
            ));
        }
        self.ctx
            .bus
            .request(|reply| Command::Global(GlobalOp::StartColor { reply }))?;
        self.ctx.colors_mut().register_default();
        if self.ctx.capabilities.can_change_color {
            for (name, color) in DEFAULT_CUSTOM_COLORS {
                self.init_color(name, color)?;
            }
        }
        Ok(())
    }

    /// Define a color pair. Adding an existing name binds it to a new id.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` once the terminal's pair capacity is used up.
    pub fn add_color_pair(&self, name: &str, fg: Color, bg: Color) -> Result<PairId> {
        self.ctx.ensure_open()?;
        let pair = self
            .ctx
            .colors_mut()
            .add_pair(name, self.ctx.capabilities.color_pairs)?;
        self.ctx.bus.enqueue(Command::Global(GlobalOp::InitPair(pair, fg, bg)))?;
        Ok(pair)
    }

    /// Apply a color pair to the root window.
    ///
    /// # Errors
    ///
    /// `NotFound` if no pair has that name.
    pub fn set_color(&self, name: &str) -> Result<()> {
        self.ctx.ensure_open()?;
        let pair = self.ctx.pair(name)?;
        self.ctx.bus.enqueue(Command::Global(GlobalOp::SetColor(pair)))
    }

    /// Define a custom color under `name`.
    ///
    /// # Errors
    ///
    /// `UnsupportedCapability` if colors cannot be changed, `InvalidArgument`
    /// for a channel above 999, `ResourceExhausted` when the terminal's
    /// colors are used up.
    pub fn init_color(&self, name: &str, value: CustomColor) -> Result<Color> {
        self.ctx.ensure_open()?;
        if !self.ctx.capabilities.can_change_color {
            return Err(TermError::UnsupportedCapability(
                "terminal does not support custom colors".into(),
            ));
        }
        let color = self
            .ctx
            .colors_mut()
            .add_color(name, &value, self.ctx.capabilities.colors)?;
        self.ctx.bus.enqueue(Command::Global(GlobalOp::InitColor(color, value)))?;
        Ok(color)
    }

    /// Look up a custom color by name.
    pub fn color(&self, name: &str) -> Result<Color> {
        self.ctx.colors().color(name)
    }

    /// Tear the session down and restore the terminal.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if the session had already stopped after a fatal
    /// error. The terminal is restored either way.
    pub fn end(mut self) -> Result<()> {
        if self.shutdown() {
            Ok(())
        } else {
            Err(TermError::NotInitialized)
        }
    }

    /// Returns whether this call closed the bus.
    fn shutdown(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.ended = true;
        let closed = self.ctx.bus.close();
        self.dispatcher.join();
        let windows = self.ctx.clear();
        info!(target: "termbus::session", windows = windows.len(), "session ended");
        closed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        Key, NativeCall, RecordingBackend, RecordingHandle, SharedOutput, TerminalBackend,
    };
    use crate::config::FatalAction;
    use crate::style::Attributes;
    use pretty_assertions::assert_eq;
    use std::io::{self, Read};
    use std::thread;
    use std::time::{Duration, Instant};

    fn config() -> SessionConfig {
        SessionConfig {
            fatal_action: FatalAction::Halt,
            input_poll_timeout: Duration::from_millis(2),
            ..SessionConfig::default()
        }
    }

    fn session() -> (Session, RecordingHandle) {
        let (backend, handle) = RecordingBackend::new();
        (Session::with_config(backend, config()).unwrap(), handle)
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_producer_order_is_preserved() {
        let (session, handle) = session();
        let root = session.root().clone();
        root.move_to(1, 2).unwrap();
        root.write_str("hi").unwrap();
        root.refresh().unwrap();
        session.end().unwrap();

        let calls: Vec<_> = handle
            .calls_on(0)
            .into_iter()
            .filter(|c| !matches!(c, NativeCall::QuerySize(_)))
            .collect();
        assert_eq!(
            calls,
            vec![
                NativeCall::Move(0, Position::new(1, 2)),
                NativeCall::Append(0, "hi".into()),
                NativeCall::Refresh(0),
            ]
        );
    }

    #[test]
    fn test_concurrent_producers_are_serialized() {
        const PRODUCERS: usize = 8;
        const COMMANDS: usize = 50;

        let (backend, handle) = RecordingBackend::new();
        let config = SessionConfig {
            queue_capacity: 4,
            ..config()
        };
        let session =
            Session::with_config(backend.with_delay(Duration::from_micros(50)), config).unwrap();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let root = session.root().clone();
                thread::spawn(move || {
                    for i in 0..COMMANDS {
                        root.write_str(&format!("{p}:{i}")).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        session.end().unwrap();

        let calls = handle.calls();
        let dispatcher = calls[0].thread;
        assert_ne!(dispatcher, thread::current().id());
        assert!(calls.iter().all(|c| c.thread == dispatcher));

        let appends: Vec<(usize, usize)> = calls
            .iter()
            .filter_map(|c| match &c.call {
                NativeCall::Append(_, text) => {
                    let (p, i) = text.split_once(':')?;
                    Some((p.parse().ok()?, i.parse().ok()?))
                }
                _ => None,
            })
            .collect();
        assert_eq!(appends.len(), PRODUCERS * COMMANDS);
        for p in 0..PRODUCERS {
            let order: Vec<usize> =
                appends.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
            assert_eq!(order, (0..COMMANDS).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_read_line_and_reader() {
        let (session, handle) = session();
        let root = session.root().clone();

        handle.keys.type_str("hello\n");
        assert_eq!(root.read_line().unwrap(), "hello");

        handle.keys.type_str("abc\n");
        let mut reader = root.clone();
        let mut buf = [0_u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ab");
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'c');
        assert_eq!(reader.read(&mut buf).unwrap(), 0);

        handle.keys.type_str("x\n");
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'x');

        let reads = handle
            .native_calls()
            .iter()
            .filter(|c| matches!(c, NativeCall::ReadLine { .. }))
            .count();
        assert_eq!(reads, 3);
        session.end().unwrap();
    }

    #[test]
    fn test_get_char_toggles_input_modes() {
        let (session, handle) = session();
        let root = session.root().clone();
        root.set_auto_cursor(true);
        root.set_auto_echo(true);
        handle.keys.press(Key::F(2));
        assert_eq!(root.get_char().unwrap(), Key::F(2));
        session.end().unwrap();

        let calls: Vec<_> = handle
            .native_calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    NativeCall::SetCursor(_) | NativeCall::SetEcho(_) | NativeCall::ReadKey(_)
                )
            })
            .collect();
        assert_eq!(
            calls,
            vec![
                NativeCall::SetCursor(CursorVisibility::Visible),
                NativeCall::SetEcho(true),
                NativeCall::ReadKey(0),
                NativeCall::SetCursor(CursorVisibility::Hidden),
                NativeCall::SetEcho(false),
            ]
        );
    }

    #[test]
    fn test_calls_after_end_fail() {
        let (session, _handle) = session();
        let root = session.root().clone();
        session.end().unwrap();
        assert!(matches!(root.write_str("late"), Err(TermError::NotInitialized)));
        assert!(matches!(root.max_yx(), Err(TermError::NotInitialized)));
    }

    #[test]
    fn test_second_terminal_session_is_rejected() {
        let (first, _h1) = RecordingBackend::new();
        let (second, _h2) = RecordingBackend::new();
        let (third, _h3) = RecordingBackend::new();

        let session = Session::with_config(first.claiming_terminal(), config()).unwrap();
        let err = Session::with_config(second.claiming_terminal(), config()).unwrap_err();
        assert!(matches!(err, TermError::AlreadyInitialized));
        session.end().unwrap();

        let session = Session::with_config(third.claiming_terminal(), config()).unwrap();
        session.end().unwrap();
    }

    #[test]
    fn test_window_geometry_is_validated() {
        let (session, handle) = session();
        let too_wide = session.new_window("w", Position::new(20, 70), Size::new(5, 20));
        assert!(matches!(too_wide, Err(TermError::InvalidArgument(_))));
        let empty = session.new_window("w", Position::new(0, 0), Size::new(0, 5));
        assert!(matches!(empty, Err(TermError::InvalidArgument(_))));
        assert!(!handle
            .native_calls()
            .iter()
            .any(|c| matches!(c, NativeCall::CreateSurface { .. })));

        let window = session
            .new_window("dialog", Position::new(5, 20), Size::new(5, 25))
            .unwrap();
        assert_eq!(window.geometry(), Rect::new(20, 5, 25, 5));
        assert_eq!(session.window("dialog").unwrap(), window);
        let duplicate = session.new_window("dialog", Position::new(0, 0), Size::new(1, 1));
        assert!(matches!(duplicate, Err(TermError::InvalidArgument(_))));
        session.end().unwrap();
    }

    #[test]
    fn test_small_terminal_limits_windows() {
        let (backend, _handle) = RecordingBackend::new();
        let session =
            Session::with_config(backend.with_root_size(Size::new(10, 20)), config()).unwrap();
        assert_eq!(session.root().geometry(), Rect::new(0, 0, 20, 10));
        assert_eq!(session.root().max_yx().unwrap(), Size::new(10, 20));
        let err = session.new_window("w", Position::new(5, 10), Size::new(5, 11));
        assert!(matches!(err, Err(TermError::InvalidArgument(_))));
        session
            .new_window("w", Position::new(5, 10), Size::new(5, 10))
            .unwrap();
        session.end().unwrap();
    }

    #[test]
    fn test_destroyed_window() {
        let (session, handle) = session();
        let window = session
            .new_window("gone", Position::new(0, 0), Size::new(2, 2))
            .unwrap();
        window.destroy().unwrap();
        assert!(matches!(window.refresh(), Err(TermError::NotFound { .. })));
        assert!(matches!(session.window("gone"), Err(TermError::NotFound { .. })));
        assert!(matches!(session.root().destroy(), Err(TermError::InvalidArgument(_))));
        session.end().unwrap();
        assert!(handle.native_calls().contains(&NativeCall::DestroySurface(1)));
    }

    #[test]
    fn test_drawing_while_another_thread_destroys() {
        let (backend, handle) = RecordingBackend::new();
        let session =
            Session::with_config(backend.with_delay(Duration::from_micros(200)), config()).unwrap();
        let window = session
            .new_window("racy", Position::new(0, 0), Size::new(2, 2))
            .unwrap();
        let id = window.id();
        let drawer = {
            let window = window.clone();
            thread::spawn(move || while window.write_str("x").is_ok() {})
        };
        thread::sleep(Duration::from_millis(5));
        window.destroy().unwrap();
        drawer.join().unwrap();
        // A producer that passed its checks before the destroy landed.
        session
            .ctx
            .bus
            .enqueue(Command::local(id, crate::bus::LocalOp::Refresh))
            .unwrap();
        session.root().write_str("still here").unwrap();
        session.end().unwrap();

        let calls = handle.native_calls();
        assert!(!calls.contains(&NativeCall::Refresh(id.0)));
        assert!(calls.contains(&NativeCall::Append(0, "still here".into())));
        assert_eq!(calls.last(), Some(&NativeCall::Finalize));
    }

    #[test]
    fn test_command_for_unknown_surface_halts() {
        let (session, handle) = session();
        session
            .ctx
            .bus
            .enqueue(Command::local(SurfaceId(42), crate::bus::LocalOp::Refresh))
            .unwrap();

        wait_until(|| !session.is_initialized());
        wait_until(|| session.fatal_error().is_some());
        assert!(session.fatal_error().unwrap().contains("unknown surface 42"));
        assert!(matches!(session.root().write_str("x"), Err(TermError::NotInitialized)));
        assert!(matches!(session.end(), Err(TermError::NotInitialized)));
        let calls = handle.native_calls();
        assert_eq!(calls.last(), Some(&NativeCall::EmergencyShutdown));
        assert!(!calls.contains(&NativeCall::Finalize));
    }

    #[test]
    fn test_end_executes_accepted_writes() {
        const WRITES: usize = 8;

        let (backend, handle) = RecordingBackend::new();
        let session =
            Session::with_config(backend.with_delay(Duration::from_millis(2)), config()).unwrap();
        let root = session.root().clone();
        for i in 0..WRITES {
            root.write_str(&i.to_string()).unwrap();
        }
        session.end().unwrap();

        let appends = handle
            .native_calls()
            .iter()
            .filter(|c| matches!(c, NativeCall::Append(0, _)))
            .count();
        assert_eq!(appends, WRITES);
    }

    #[test]
    fn test_io_read_ends_when_session_ends() {
        let (session, handle) = session();
        let mut root = session.root().clone();
        let reader = thread::spawn(move || {
            let mut text = String::new();
            root.read_to_string(&mut text)
        });
        wait_until(|| {
            handle
                .native_calls()
                .iter()
                .any(|c| matches!(c, NativeCall::ReadLine { .. }))
        });
        session.end().unwrap();
        let err = reader.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_end_interrupts_blocked_read() {
        let (session, handle) = session();
        let root = session.root().clone();
        let reader = thread::spawn(move || root.read_line());
        wait_until(|| {
            handle
                .native_calls()
                .iter()
                .any(|c| matches!(c, NativeCall::ReadLine { .. }))
        });
        session.end().unwrap();
        assert!(matches!(reader.join().unwrap(), Err(TermError::Interrupted)));
    }

    #[test]
    fn test_colors() {
        let (backend, handle) = RecordingBackend::new();
        let capabilities = Capabilities {
            has_colors: true,
            can_change_color: true,
            colors: 16,
            color_pairs: 3,
        };
        let session =
            Session::with_config(backend.with_capabilities(capabilities), config()).unwrap();
        session.start_color().unwrap();
        assert_eq!(session.color("r").unwrap(), Color(10));

        assert_eq!(session.add_color_pair("alert", Color::RED, Color::BLACK).unwrap(), PairId(1));
        assert_eq!(session.add_color_pair("calm", Color::GREEN, Color::BLACK).unwrap(), PairId(2));
        assert!(matches!(
            session.add_color_pair("more", Color::BLUE, Color::BLACK),
            Err(TermError::ResourceExhausted(_))
        ));

        let root = session.root();
        root.set_color("alert").unwrap();
        assert_eq!(root.last_color().as_deref(), Some("alert"));
        assert!(matches!(root.set_color("missing"), Err(TermError::NotFound { .. })));
        session.set_color("std").unwrap();
        assert!(matches!(
            session.init_color("bad", CustomColor::new(1000, 0, 0)),
            Err(TermError::InvalidArgument(_))
        ));
        session.end().unwrap();

        let calls = handle.native_calls();
        assert!(calls.contains(&NativeCall::StartColor));
        assert!(calls.contains(&NativeCall::InitColor(Color(8), CustomColor::new(0, 0, 0))));
        assert!(calls.contains(&NativeCall::InitPair(PairId(1), Color::RED, Color::BLACK)));
        assert!(calls.contains(&NativeCall::SetColorPair(0, PairId(1))));
        assert!(calls.contains(&NativeCall::SetColorPair(0, PairId(0))));
    }

    #[test]
    fn test_colors_unsupported() {
        let (backend, _handle) = RecordingBackend::new();
        let capabilities = Capabilities {
            has_colors: false,
            can_change_color: false,
            colors: 0,
            color_pairs: 0,
        };
        let session =
            Session::with_config(backend.with_capabilities(capabilities), config()).unwrap();
        assert!(matches!(session.start_color(), Err(TermError::UnsupportedCapability(_))));
        assert!(matches!(
            session.init_color("x", CustomColor::default()),
            Err(TermError::UnsupportedCapability(_))
        ));
        session.end().unwrap();
    }

    #[test]
    fn test_format_writer_through_window() {
        let (session, handle) = session();
        let mut writer = session.root().format_writer();
        assert_eq!(writer.print("a *b*").unwrap(), 3);
        session.end().unwrap();

        let calls: Vec<_> = handle
            .calls_on(0)
            .into_iter()
            .filter(|c| !matches!(c, NativeCall::QuerySize(_)))
            .collect();
        assert_eq!(
            calls,
            vec![
                NativeCall::Append(0, "a ".into()),
                NativeCall::SetAttributes(0, Attributes::BOLD),
                NativeCall::Append(0, "b".into()),
                NativeCall::SetAttributes(0, Attributes::NORMAL),
            ]
        );
    }

    #[test]
    fn test_auto_refresh_and_draw_bg() {
        let (session, handle) = session();
        session.start_color().unwrap();
        session.add_color_pair("bg", Color::WHITE, Color::BLUE).unwrap();
        let window = session
            .new_window("box", Position::new(1, 1), Size::new(2, 3))
            .unwrap();
        window.draw_bg("bg").unwrap();
        window.set_auto_refresh(true);
        window.write_str("x").unwrap();
        session.end().unwrap();

        assert_eq!(
            &handle.calls_on(1)[1..],
            &[
                NativeCall::SetColorPair(1, PairId(1)),
                NativeCall::Move(1, Position::new(0, 0)),
                NativeCall::Append(1, "   ".into()),
                NativeCall::Move(1, Position::new(1, 0)),
                NativeCall::Append(1, "   ".into()),
                NativeCall::SetColorPair(1, PairId(0)),
                NativeCall::Move(1, Position::new(0, 0)),
                NativeCall::Append(1, "x".into()),
                NativeCall::Refresh(1),
            ]
        );
    }

    #[test]
    fn test_panels() {
        let (session, handle) = session();
        let window = session
            .new_window("top", Position::new(0, 0), Size::new(2, 2))
            .unwrap();
        let panel = window.new_panel("p").unwrap();
        panel.raise().unwrap();
        window.panel("p").unwrap().lower().unwrap();
        assert!(matches!(window.panel("q"), Err(TermError::NotFound { .. })));
        session.end().unwrap();
        assert_eq!(
            &handle.calls_on(1)[1..],
            &[
                NativeCall::CreatePanel(1),
                NativeCall::RaisePanel(1),
                NativeCall::LowerPanel(1),
            ]
        );
    }

    #[test]
    fn test_headless_terminal_session() {
        let out = SharedOutput::new();
        let (backend, keys) = TerminalBackend::headless(Size::new(10, 40), out.clone());
        let session = Session::with_config(backend.with_alternate_screen(false), config()).unwrap();
        let root = session.root();
        assert_eq!(root.max_yx().unwrap(), Size::new(10, 40));
        root.move_to(2, 3).unwrap();
        root.write_str("Hello").unwrap();
        root.refresh().unwrap();

        keys.type_str("Ann\n");
        root.move_to(3, 3).unwrap();
        assert_eq!(root.read_line().unwrap(), "Ann");
        session.end().unwrap();

        let mut parser = vt100::Parser::new(10, 40, 0);
        parser.process(&out.contents());
        let rows: Vec<String> = parser.screen().rows(0, 40).collect();
        assert_eq!(rows[2].trim_end(), "   Hello");
        assert_eq!(rows[3].trim_end(), "   Ann");
    }
}
