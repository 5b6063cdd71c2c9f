//! `TerminalBackend`: surfaces composited onto a real (or headless) terminal
//! through crossterm.
//!
//! Each surface is an off-screen [`Screen`]. Nothing reaches the writer until
//! `refresh`, which paints the surface's cells at its origin and parks the
//! terminal cursor at the surface cursor, then flushes in one go. Panels keep
//! a z-order; raising or lowering one repaints every panel bottom to top.

use super::input::{
    read_key_with, read_line_with, CrosstermInput, InputSource, Key, LineEdit, ScriptedInput,
    ScriptedKeys,
};
use super::screen::Screen;
use super::{Backend, Capabilities, CursorVisibility, Interrupt};
use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, Color, CustomColor, PairId};
use crossterm::style::{
    self as cstyle, Attribute, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{cursor, queue, terminal};
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Native surface handle of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenKey(usize);

/// Native panel handle of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelKey(usize);

/// Pair and custom color definitions.
#[derive(Debug, Default)]
struct Palette {
    started: bool,
    pairs: HashMap<PairId, (Color, Color)>,
    custom: HashMap<Color, (u8, u8, u8)>,
}

impl Palette {
    fn color(&self, color: Color) -> cstyle::Color {
        if let Some(&(r, g, b)) = self.custom.get(&color) {
            return cstyle::Color::Rgb { r, g, b };
        }
        u8::try_from(color.0).map_or(cstyle::Color::Reset, cstyle::Color::AnsiValue)
    }

    fn colors(&self, pair: PairId) -> (cstyle::Color, cstyle::Color) {
        if !self.started {
            return (cstyle::Color::Reset, cstyle::Color::Reset);
        }
        self.pairs
            .get(&pair)
            .map_or((cstyle::Color::Reset, cstyle::Color::Reset), |&(fg, bg)| {
                (self.color(fg), self.color(bg))
            })
    }
}

/// A writer whose bytes can be inspected from another thread.
///
/// Handy as the output of a headless backend.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Terminal backend rendering through crossterm.
pub struct TerminalBackend<W, I> {
    out: W,
    input: I,
    /// Drives the process terminal: raw mode, real size.
    live: bool,
    alternate_screen: bool,
    active: bool,
    /// Size and capabilities reported when not live.
    headless_size: Size,
    headless_capabilities: Capabilities,
    screens: Vec<Option<Screen>>,
    stack: Vec<usize>,
    palette: Palette,
    echo: bool,
}

impl TerminalBackend<Stdout, CrosstermInput> {
    /// A backend driving the process terminal on stdout.
    pub fn stdout() -> Self {
        Self::build(io::stdout(), CrosstermInput, true, Size::default())
    }
}

impl<W: Write + Send + 'static> TerminalBackend<W, ScriptedInput> {
    /// A backend writing ANSI output to `out` with scripted key input.
    pub fn headless(size: Size, out: W) -> (Self, ScriptedKeys) {
        let (input, keys) = ScriptedInput::new();
        (Self::build(out, input, false, size), keys)
    }
}

impl<W: Write, I: InputSource> TerminalBackend<W, I> {
    fn build(out: W, input: I, live: bool, headless_size: Size) -> Self {
        Self {
            out,
            input,
            live,
            alternate_screen: live,
            active: false,
            headless_size,
            headless_capabilities: Capabilities::default(),
            screens: Vec::new(),
            stack: Vec::new(),
            palette: Palette::default(),
            echo: true,
        }
    }

    /// Whether to switch to the alternate screen while active.
    #[must_use]
    pub fn with_alternate_screen(mut self, enabled: bool) -> Self {
        self.alternate_screen = enabled;
        self
    }

    /// Capabilities reported by a headless backend.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.headless_capabilities = capabilities;
        self
    }

    fn screen_size(&self) -> io::Result<Size> {
        if self.live {
            let (cols, rows) = terminal::size()?;
            Ok(Size::new(rows, cols))
        } else {
            Ok(self.headless_size)
        }
    }

    fn screen(&mut self, key: ScreenKey) -> io::Result<&mut Screen> {
        self.screens
            .get_mut(key.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no surface {key:?}")))
    }

    fn paint(&mut self, index: usize) -> io::Result<()> {
        if let Some(Some(screen)) = self.screens.get(index) {
            paint_screen(&mut self.out, screen, &self.palette)?;
        }
        Ok(())
    }

    fn repaint_panels(&mut self) -> io::Result<()> {
        for index in self.stack.clone() {
            self.paint(index)?;
        }
        self.out.flush()
    }

    fn park_cursor(&mut self, key: ScreenKey) -> io::Result<()> {
        let screen = self.screen(key)?;
        let area = screen.area();
        let at = screen.cursor();
        queue!(self.out, cursor::MoveTo(area.x + at.x, area.y + at.y))
    }
}

fn paint_screen<W: Write>(out: &mut W, screen: &Screen, palette: &Palette) -> io::Result<()> {
    let area = screen.area();
    let mut style = None;
    for y in 0..area.height {
        queue!(out, cursor::MoveTo(area.x, area.y + y))?;
        for x in 0..area.width {
            let Some(cell) = screen.cell(y, x) else { continue };
            if cell.is_continuation() {
                continue;
            }
            if style != Some((cell.attributes, cell.pair)) {
                let (fg, bg) = palette.colors(cell.pair);
                queue!(out, SetAttribute(Attribute::Reset))?;
                queue_attributes(out, cell.attributes)?;
                queue!(out, SetForegroundColor(fg), SetBackgroundColor(bg))?;
                style = Some((cell.attributes, cell.pair));
            }
            queue!(out, Print(&cell.symbol))?;
        }
    }
    queue!(out, SetAttribute(Attribute::Reset), cstyle::ResetColor)
}

fn queue_attributes<W: Write>(out: &mut W, attributes: Attributes) -> io::Result<()> {
    const MAPPING: [(Attributes, Attribute); 7] = [
        (Attributes::BOLD, Attribute::Bold),
        (Attributes::DIM, Attribute::Dim),
        (Attributes::ITALIC, Attribute::Italic),
        (Attributes::UNDERLINE, Attribute::Underlined),
        (Attributes::BLINK, Attribute::SlowBlink),
        (Attributes::REVERSE.union(Attributes::STANDOUT), Attribute::Reverse),
        (Attributes::INVISIBLE, Attribute::Hidden),
    ];
    for (flags, attribute) in MAPPING {
        if attributes.intersects(flags) {
            queue!(out, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

impl<W, I> Backend for TerminalBackend<W, I>
where
    W: Write + Send + 'static,
    I: InputSource + 'static,
{
    type Surface = ScreenKey;
    type Panel = PanelKey;

    fn claims_terminal(&self) -> bool {
        self.live
    }

    fn initialize(&mut self) -> io::Result<Capabilities> {
        let capabilities = if self.live {
            terminal::enable_raw_mode()?;
            let colors = cstyle::available_color_count();
            Capabilities {
                has_colors: colors >= 8,
                can_change_color: colors >= 256,
                colors,
                color_pairs: 256,
            }
        } else {
            self.headless_capabilities
        };
        self.active = true;
        if self.alternate_screen {
            queue!(self.out, terminal::EnterAlternateScreen)?;
        }
        queue!(self.out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
        self.out.flush()?;
        Ok(capabilities)
    }

    fn finalize(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            cstyle::ResetColor,
            cursor::Show
        )?;
        if self.alternate_screen {
            queue!(self.out, terminal::LeaveAlternateScreen)?;
        }
        self.out.flush()?;
        if self.live {
            terminal::disable_raw_mode()?;
        }
        Ok(())
    }

    fn emergency_shutdown(&mut self) {
        if let Err(e) = self.finalize() {
            // Raw mode must not outlive the session.
            if self.live {
                let _ = terminal::disable_raw_mode();
            }
            tracing::warn!(target: "termbus::backend", error = %e, "terminal restore failed");
        }
    }

    fn root_surface(&mut self) -> io::Result<ScreenKey> {
        let size = self.screen_size()?;
        self.create_surface(Rect::from_size(size))
    }

    fn create_surface(&mut self, area: Rect) -> io::Result<ScreenKey> {
        self.screens.push(Some(Screen::new(area)));
        Ok(ScreenKey(self.screens.len() - 1))
    }

    fn destroy_surface(&mut self, surface: ScreenKey) -> io::Result<()> {
        let mut screen = self
            .screens
            .get_mut(surface.0)
            .and_then(Option::take)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no surface {surface:?}"))
            })?;
        self.stack.retain(|&i| i != surface.0);
        // Leave a blank hole where the surface was.
        screen.set_background(PairId::DEFAULT);
        screen.erase();
        paint_screen(&mut self.out, &screen, &self.palette)?;
        self.out.flush()
    }

    fn query_size(&mut self, surface: &ScreenKey) -> io::Result<Size> {
        if surface.0 == 0 && self.live {
            let size = self.screen_size()?;
            self.screen(*surface)?.resize(size);
        }
        Ok(self.screen(*surface)?.size())
    }

    fn move_cursor(&mut self, surface: &ScreenKey, to: Position) -> io::Result<()> {
        self.screen(*surface)?.move_to(to)
    }

    fn append_text(&mut self, surface: &ScreenKey, text: &str) -> io::Result<()> {
        self.screen(*surface)?.put_str(text);
        Ok(())
    }

    fn insert_text(&mut self, surface: &ScreenKey, text: &str) -> io::Result<()> {
        self.screen(*surface)?.insert_str(text);
        Ok(())
    }

    fn delete_char(&mut self, surface: &ScreenKey) -> io::Result<()> {
        self.screen(*surface)?.delete_char();
        Ok(())
    }

    fn refresh(&mut self, surface: &ScreenKey) -> io::Result<()> {
        self.screen(*surface)?;
        self.paint(surface.0)?;
        self.park_cursor(*surface)?;
        self.out.flush()
    }

    fn clear(&mut self, surface: &ScreenKey) -> io::Result<()> {
        self.screen(*surface)?.erase();
        // Next refresh repaints every cell anyway; make the terminal agree now.
        if surface.0 == 0 {
            queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
        }
        Ok(())
    }

    fn erase(&mut self, surface: &ScreenKey) -> io::Result<()> {
        self.screen(*surface)?.erase();
        Ok(())
    }

    fn set_scrolling(&mut self, surface: &ScreenKey, enabled: bool) -> io::Result<()> {
        self.screen(*surface)?.set_scrolling(enabled);
        Ok(())
    }

    fn scroll(&mut self, surface: &ScreenKey, lines: i32) -> io::Result<()> {
        self.screen(*surface)?.scroll(lines)
    }

    fn set_attributes(&mut self, surface: &ScreenKey, attributes: Attributes) -> io::Result<()> {
        self.screen(*surface)?.set_attributes(attributes);
        Ok(())
    }

    fn set_color_pair(&mut self, surface: &ScreenKey, pair: PairId) -> io::Result<()> {
        self.screen(*surface)?.set_pair(pair);
        Ok(())
    }

    fn set_background(&mut self, surface: &ScreenKey, pair: PairId) -> io::Result<()> {
        self.screen(*surface)?.set_background(pair);
        Ok(())
    }

    fn draw_border(&mut self, surface: &ScreenKey) -> io::Result<()> {
        self.screen(*surface)?.draw_border();
        Ok(())
    }

    fn read_line(
        &mut self,
        surface: &ScreenKey,
        max_len: usize,
        interrupt: &Interrupt,
    ) -> io::Result<Option<Vec<u8>>> {
        self.refresh(surface)?;
        let echo = self.echo;
        let key = *surface;
        let Self {
            input,
            screens,
            out,
            palette,
            ..
        } = self;
        read_line_with(input, max_len, interrupt, |edit| {
            if !echo {
                return Ok(());
            }
            let Some(Some(screen)) = screens.get_mut(key.0) else {
                return Ok(());
            };
            match edit {
                LineEdit::Push(c) => screen.put_str(c.encode_utf8(&mut [0; 4])),
                LineEdit::Pop(_) => screen.backspace(),
            }
            paint_screen(out, screen, palette)?;
            let (area, at) = (screen.area(), screen.cursor());
            queue!(out, cursor::MoveTo(area.x + at.x, area.y + at.y))?;
            out.flush()
        })
    }

    fn read_key(&mut self, surface: &ScreenKey, interrupt: &Interrupt) -> io::Result<Option<Key>> {
        self.refresh(surface)?;
        read_key_with(&mut self.input, interrupt)
    }

    fn start_color(&mut self) -> io::Result<()> {
        self.palette.started = true;
        Ok(())
    }

    fn init_pair(&mut self, pair: PairId, fg: Color, bg: Color) -> io::Result<()> {
        self.palette.pairs.insert(pair, (fg, bg));
        Ok(())
    }

    fn init_color(&mut self, color: Color, value: CustomColor) -> io::Result<()> {
        self.palette.custom.insert(color, value.to_rgb8());
        Ok(())
    }

    fn set_echo(&mut self, enabled: bool) -> io::Result<()> {
        self.echo = enabled;
        Ok(())
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        match visibility {
            CursorVisibility::Hidden => queue!(self.out, cursor::Hide)?,
            CursorVisibility::Visible => {
                queue!(self.out, cursor::SetCursorStyle::DefaultUserShape, cursor::Show)?;
            }
            CursorVisibility::Highlighted => {
                queue!(self.out, cursor::SetCursorStyle::BlinkingBlock, cursor::Show)?;
            }
        }
        self.out.flush()
    }

    fn create_panel(&mut self, surface: &ScreenKey) -> io::Result<PanelKey> {
        self.screen(*surface)?;
        self.stack.retain(|&i| i != surface.0);
        self.stack.push(surface.0);
        Ok(PanelKey(surface.0))
    }

    fn raise_panel(&mut self, panel: &PanelKey) -> io::Result<()> {
        self.stack.retain(|&i| i != panel.0);
        self.stack.push(panel.0);
        self.repaint_panels()
    }

    fn lower_panel(&mut self, panel: &PanelKey) -> io::Result<()> {
        self.stack.retain(|&i| i != panel.0);
        self.stack.insert(0, panel.0);
        self.repaint_panels()
    }
}

impl<W, I> std::fmt::Debug for TerminalBackend<W, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBackend")
            .field("live", &self.live)
            .field("active", &self.active)
            .field("surfaces", &self.screens.iter().flatten().count())
            .field("panels", &self.stack)
            .finish_non_exhaustive()
    }
}
