//! Inline format parser.
//!
//! Converts text such as `"This is *bold* and __escaped__"` into an ordered
//! list of [`FormatOp`]s: literal text runs and attribute toggles.
//!
//! # Grammar
//!
//! A marker character toggles its attribute. Each marker keeps its own
//! open/closed state, seeded to "open" at the start of every parse, so the
//! first occurrence enables the attribute, the second disables it, and so
//! on. Different markers never constrain each other. A doubled marker
//! (`**`, `__`, ...) is an escape and produces one literal marker character.
//!
//! ```text
//!            marker              same marker again
//!   ┌──────┐ ───────▶ ┌──────────┐ ──────────────▶ ┌────────┐
//!   │ CHAR │          │ MODIFIER │                 │ ESCAPE │
//!   └──────┘ ◀─────── └──────────┘                 └────────┘
//!      ▲  ▲   toggle       │ anything else / end       │ literal
//!      │  └── ┌─────────────┐ ◀┘                       │
//!      │      │ FORMAT_FLAG │                          │
//!      │      └─────────────┘                          │
//!      └───────────────────────────────────────────────┘
//! ```

use crate::style::Attributes;

/// A marker character and the attribute it toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// The reserved character.
    pub symbol: char,
    /// The attribute it toggles.
    pub attribute: Attributes,
}

/// The fixed set of markers recognised by a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    markers: Vec<Marker>,
}

impl Default for MarkerTable {
    /// `*` bold, `~` reverse, `-` italic, `_` underline.
    fn default() -> Self {
        Self::empty()
            .with_marker('*', Attributes::BOLD)
            .with_marker('~', Attributes::REVERSE)
            .with_marker('-', Attributes::ITALIC)
            .with_marker('_', Attributes::UNDERLINE)
    }
}

impl MarkerTable {
    /// A table with no markers; every character is literal.
    pub const fn empty() -> Self {
        Self { markers: Vec::new() }
    }

    /// Bind `symbol` to `attribute`, replacing an existing binding.
    #[must_use]
    pub fn with_marker(mut self, symbol: char, attribute: Attributes) -> Self {
        match self.index_of(symbol) {
            Some(i) => self.markers[i].attribute = attribute,
            None => self.markers.push(Marker { symbol, attribute }),
        }
        self
    }

    /// All bindings in registration order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The attribute bound to `symbol`, if it is a marker.
    pub fn attribute(&self, symbol: char) -> Option<Attributes> {
        self.index_of(symbol).map(|i| self.markers[i].attribute)
    }

    fn index_of(&self, symbol: char) -> Option<usize> {
        self.markers.iter().position(|m| m.symbol == symbol)
    }
}

/// A toggle of one attribute at a point in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    /// The marker that produced this toggle.
    pub marker: char,
    /// The attribute being toggled.
    pub attribute: Attributes,
    /// `true` enables the attribute, `false` disables it.
    pub add: bool,
}

/// One parsed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOp {
    /// A literal run of text.
    Text(String),
    /// An attribute toggle.
    Toggle(Toggle),
}

impl FormatOp {
    /// Shorthand for a literal run.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Shorthand for a toggle.
    pub const fn toggle(marker: char, attribute: Attributes, add: bool) -> Self {
        Self::Toggle(Toggle {
            marker,
            attribute,
            add,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Char,
    Modifier,
    Escape,
    FormatFlag,
}

/// Parse with the default marker table.
pub fn parse(input: &str) -> Vec<FormatOp> {
    parse_with(input, &MarkerTable::default())
}

/// Parse `input` into format operations using `markers`.
///
/// Empty literal runs between toggles are dropped, except that an input
/// producing no operation at all yields a single empty run.
pub fn parse_with(input: &str, markers: &MarkerTable) -> Vec<FormatOp> {
    let chars: Vec<char> = input.chars().collect();
    let mut open = vec![true; markers.markers.len()];
    let mut ops = Vec::new();
    let mut run = String::with_capacity(input.len());
    let mut state = State::Char;
    let mut idx = 0;

    loop {
        match state {
            State::Char => {
                let Some(&c) = chars.get(idx) else { break };
                if markers.index_of(c).is_some() {
                    state = State::Modifier;
                } else {
                    run.push(c);
                }
                idx += 1;
            }
            State::Modifier => {
                // chars[idx - 1] is the marker just consumed.
                state = match chars.get(idx) {
                    Some(&c) if c == chars[idx - 1] => State::Escape,
                    _ => State::FormatFlag,
                };
            }
            State::FormatFlag => {
                let symbol = chars[idx - 1];
                if let Some(i) = markers.index_of(symbol) {
                    if !run.is_empty() {
                        ops.push(FormatOp::Text(std::mem::take(&mut run)));
                    }
                    ops.push(FormatOp::toggle(symbol, markers.markers[i].attribute, open[i]));
                    open[i] = !open[i];
                }
                state = State::Char;
            }
            State::Escape => {
                run.push(chars[idx]);
                idx += 1;
                state = State::Char;
            }
        }
    }

    if !run.is_empty() || ops.is_empty() {
        ops.push(FormatOp::Text(run));
    }
    ops
}

/// The display text of `ops` with every attribute stripped.
pub fn plain_text(ops: &[FormatOp]) -> String {
    ops.iter()
        .filter_map(|op| match op {
            FormatOp::Text(text) => Some(text.as_str()),
            FormatOp::Toggle(_) => None,
        })
        .collect()
}
