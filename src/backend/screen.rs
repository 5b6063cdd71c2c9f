//! Screen: the off-screen cell grid behind one surface of the terminal backend.
//!
//! Text is laid out grapheme by grapheme. Wide graphemes take two cells, the
//! second being an empty continuation cell. Writing past the right edge wraps;
//! writing past the bottom scrolls when scrolling is enabled and otherwise
//! keeps overwriting the last cell.

use crate::layout::{Position, Rect, Size};
use crate::style::{Attributes, PairId};
use std::io;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const TAB_WIDTH: u16 = 8;

/// A single grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cell {
    /// The grapheme; empty for the continuation half of a wide grapheme.
    pub symbol: String,
    pub attributes: Attributes,
    pub pair: PairId,
}

impl Cell {
    fn blank(pair: PairId) -> Self {
        Self {
            symbol: " ".to_string(),
            attributes: Attributes::NORMAL,
            pair,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.symbol.is_empty()
    }
}

/// Cell grid plus the per-surface drawing state.
#[derive(Debug, Clone)]
pub(crate) struct Screen {
    area: Rect,
    cells: Vec<Cell>,
    cursor: Position,
    attributes: Attributes,
    pair: PairId,
    background: PairId,
    scrolling: bool,
}

impl Screen {
    pub fn new(area: Rect) -> Self {
        let len = usize::try_from(area.size().area()).unwrap_or(0);
        Self {
            area,
            cells: vec![Cell::blank(PairId::DEFAULT); len],
            cursor: Position::ORIGIN,
            attributes: Attributes::NORMAL,
            pair: PairId::DEFAULT,
            background: PairId::DEFAULT,
            scrolling: false,
        }
    }

    pub const fn area(&self) -> Rect {
        self.area
    }

    pub const fn size(&self) -> Size {
        self.area.size()
    }

    pub const fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn cell(&self, y: u16, x: u16) -> Option<&Cell> {
        self.index(y, x).map(|i| &self.cells[i])
    }

    /// Text of one row, continuation cells skipped.
    #[cfg(test)]
    pub fn row_text(&self, y: u16) -> String {
        (0..self.area.width)
            .filter_map(|x| self.cell(y, x))
            .map(|c| c.symbol.as_str())
            .collect()
    }

    fn index(&self, y: u16, x: u16) -> Option<usize> {
        if y < self.area.height && x < self.area.width {
            Some(usize::from(y) * usize::from(self.area.width) + usize::from(x))
        } else {
            None
        }
    }

    fn blank(&self) -> Cell {
        Cell::blank(self.background)
    }

    fn styled(&self, symbol: &str) -> Cell {
        Cell {
            symbol: symbol.to_string(),
            attributes: self.attributes,
            pair: if self.pair == PairId::DEFAULT {
                self.background
            } else {
                self.pair
            },
        }
    }

    /// Resize the grid keeping the overlapping content.
    pub fn resize(&mut self, size: Size) {
        if size == self.size() {
            return;
        }
        let mut next = Self::new(Rect::from_parts(self.area.origin(), size));
        next.background = self.background;
        let blank = next.blank();
        next.cells.fill(blank);
        for y in 0..size.height.min(self.area.height) {
            for x in 0..size.width.min(self.area.width) {
                if let (Some(src), Some(dst)) = (self.index(y, x), next.index(y, x)) {
                    next.cells[dst] = self.cells[src].clone();
                }
            }
        }
        next.cursor = Position::new(
            self.cursor.y.min(size.height.saturating_sub(1)),
            self.cursor.x.min(size.width.saturating_sub(1)),
        );
        next.attributes = self.attributes;
        next.pair = self.pair;
        next.scrolling = self.scrolling;
        *self = next;
    }

    pub fn move_to(&mut self, to: Position) -> io::Result<()> {
        if self.index(to.y, to.x).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cursor {to:?} outside surface {:?}", self.size()),
            ));
        }
        self.cursor = to;
        Ok(())
    }

    pub const fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    pub const fn set_pair(&mut self, pair: PairId) {
        self.pair = pair;
    }

    pub const fn set_scrolling(&mut self, enabled: bool) {
        self.scrolling = enabled;
    }

    /// Change the background pair of every cell still using the old one.
    pub fn set_background(&mut self, pair: PairId) {
        let old = self.background;
        for cell in &mut self.cells {
            if cell.pair == old {
                cell.pair = pair;
            }
        }
        self.background = pair;
    }

    /// Write text at the cursor, advancing it.
    pub fn put_str(&mut self, text: &str) {
        for grapheme in text.graphemes(true) {
            match grapheme {
                "\n" | "\r\n" => self.line_feed(),
                "\r" => self.cursor.x = 0,
                "\t" => {
                    let next_stop = (self.cursor.x / TAB_WIDTH + 1) * TAB_WIDTH;
                    let spaces = next_stop.min(self.area.width) - self.cursor.x;
                    for _ in 0..spaces.max(1) {
                        self.put_grapheme(" ", 1);
                    }
                }
                g => {
                    let width = u16::try_from(UnicodeWidthStr::width(g)).unwrap_or(1);
                    if width > 0 {
                        self.put_grapheme(g, width);
                    }
                }
            }
        }
    }

    fn put_grapheme(&mut self, grapheme: &str, width: u16) {
        if self.area.is_empty() || width > self.area.width {
            return;
        }
        if self.cursor.x + width > self.area.width {
            self.wrap();
        }
        let cell = self.styled(grapheme);
        if let Some(i) = self.index(self.cursor.y, self.cursor.x) {
            self.cells[i] = cell;
        }
        if width == 2 {
            let continuation = self.styled("");
            if let Some(i) = self.index(self.cursor.y, self.cursor.x + 1) {
                self.cells[i] = continuation;
            }
        }
        self.advance(width);
    }

    fn advance(&mut self, width: u16) {
        if self.cursor.x + width >= self.area.width {
            self.wrap();
        } else {
            self.cursor.x += width;
        }
    }

    fn wrap(&mut self) {
        let last_row = self.area.height.saturating_sub(1);
        if self.cursor.y < last_row || self.scrolling {
            self.cursor.x = 0;
            self.line_feed();
        } else {
            self.cursor.x = self.area.width.saturating_sub(1);
        }
    }

    fn line_feed(&mut self) {
        let last_row = self.area.height.saturating_sub(1);
        if self.cursor.y < last_row {
            self.cursor.y += 1;
            self.cursor.x = 0;
        } else if self.scrolling {
            self.shift_rows(1);
            self.cursor.x = 0;
        }
    }

    /// Move the cursor back one cell and blank it.
    pub fn backspace(&mut self) {
        if self.cursor.x > 0 {
            self.cursor.x -= 1;
        } else if self.cursor.y > 0 {
            self.cursor.y -= 1;
            self.cursor.x = self.area.width.saturating_sub(1);
        } else {
            return;
        }
        let blank = self.blank();
        if let Some(i) = self.index(self.cursor.y, self.cursor.x) {
            self.cells[i] = blank;
        }
    }

    /// Insert text at the cursor, shifting the rest of the row right.
    /// The cursor does not move.
    pub fn insert_str(&mut self, text: &str) {
        let Some(start) = self.index(self.cursor.y, self.cursor.x) else {
            return;
        };
        let row_end = start - usize::from(self.cursor.x) + usize::from(self.area.width);
        let mut inserted = Vec::new();
        for grapheme in text.graphemes(true) {
            match UnicodeWidthStr::width(grapheme) {
                0 => {}
                1 => inserted.push(self.styled(grapheme)),
                _ => {
                    inserted.push(self.styled(grapheme));
                    inserted.push(self.styled(""));
                }
            }
        }
        let tail: Vec<Cell> = self.cells[start..row_end].to_vec();
        let row = inserted.into_iter().chain(tail).take(row_end - start);
        for (slot, cell) in self.cells[start..row_end].iter_mut().zip(row) {
            *slot = cell;
        }
    }

    /// Delete the cell under the cursor, shifting the rest of the row left.
    pub fn delete_char(&mut self) {
        let Some(start) = self.index(self.cursor.y, self.cursor.x) else {
            return;
        };
        let row_end = start - usize::from(self.cursor.x) + usize::from(self.area.width);
        self.cells[start..row_end].rotate_left(1);
        self.cells[row_end - 1] = self.blank();
    }

    /// Blank the whole grid and home the cursor.
    pub fn erase(&mut self) {
        let blank = self.blank();
        self.cells.fill(blank);
        self.cursor = Position::ORIGIN;
    }

    /// Scroll by `lines`, positive moving content up.
    pub fn scroll(&mut self, lines: i32) -> io::Result<()> {
        if !self.scrolling {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "scrolling is not enabled on this surface",
            ));
        }
        self.shift_rows(lines);
        Ok(())
    }

    fn shift_rows(&mut self, lines: i32) {
        let width = usize::from(self.area.width);
        let height = i32::from(self.area.height);
        let n = usize::try_from(lines.unsigned_abs().min(height.unsigned_abs())).unwrap_or(0);
        if n == 0 || width == 0 {
            return;
        }
        let blank = self.blank();
        if lines > 0 {
            self.cells.rotate_left(n * width);
            let len = self.cells.len();
            self.cells[len - n * width..].fill(blank);
        } else {
            self.cells.rotate_right(n * width);
            self.cells[..n * width].fill(blank);
        }
    }

    /// Draw a single-line box on the outer edge. The cursor does not move.
    pub fn draw_border(&mut self) {
        let (w, h) = (self.area.width, self.area.height);
        if w < 2 || h < 2 {
            return;
        }
        let set = |screen: &mut Self, y: u16, x: u16, symbol: &str| {
            let cell = screen.styled(symbol);
            if let Some(i) = screen.index(y, x) {
                screen.cells[i] = cell;
            }
        };
        for x in 1..w - 1 {
            set(self, 0, x, "─");
            set(self, h - 1, x, "─");
        }
        for y in 1..h - 1 {
            set(self, y, 0, "│");
            set(self, y, w - 1, "│");
        }
        set(self, 0, 0, "┌");
        set(self, 0, w - 1, "┐");
        set(self, h - 1, 0, "└");
        set(self, h - 1, w - 1, "┘");
    }
}
