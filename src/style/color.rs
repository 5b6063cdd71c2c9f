//! Colors, color pairs and the process-wide name tables for both.
//!
//! Pair ids are handed out monotonically starting at 1. Pair 0 is the
//! terminal default pair, registered as `"std"` when color mode starts.
//! Ids are never reused while the table lives, even when a name is rebound.

use crate::error::{Result, TermError};
use std::collections::HashMap;

/// Name under which the terminal default pair is registered.
pub const DEFAULT_PAIR: &str = "std";

/// Largest accepted value for a custom color channel.
pub const MAX_CHANNEL: u16 = 999;

/// A terminal color index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Color(pub u16);

impl Color {
    /// Black
    pub const BLACK: Self = Self(0);
    /// Red
    pub const RED: Self = Self(1);
    /// Green
    pub const GREEN: Self = Self(2);
    /// Yellow
    pub const YELLOW: Self = Self(3);
    /// Blue
    pub const BLUE: Self = Self(4);
    /// Magenta
    pub const MAGENTA: Self = Self(5);
    /// Cyan
    pub const CYAN: Self = Self(6);
    /// White
    pub const WHITE: Self = Self(7);

    /// Number of base colors; custom colors are numbered after them.
    pub const BASE_COUNT: u16 = 8;
}

/// A color pair id as understood by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct PairId(pub u16);

impl PairId {
    /// The terminal default pair.
    pub const DEFAULT: Self = Self(0);
}

/// A custom color definition, each channel in `0..=999`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CustomColor {
    /// Red channel
    pub red: u16,
    /// Green channel
    pub green: u16,
    /// Blue channel
    pub blue: u16,
}

impl CustomColor {
    /// Create a custom color.
    #[inline]
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    /// Check every channel is in range.
    pub fn validate(&self) -> Result<()> {
        if self.red > MAX_CHANNEL || self.green > MAX_CHANNEL || self.blue > MAX_CHANNEL {
            return Err(TermError::InvalidArgument(format!(
                "color values must be in range of 0-{MAX_CHANNEL}, got {self:?}"
            )));
        }
        Ok(())
    }

    /// Scale to 8-bit channels.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn to_rgb8(&self) -> (u8, u8, u8) {
        const fn scale(v: u16) -> u8 {
            let v = if v > MAX_CHANNEL { MAX_CHANNEL } else { v };
            ((v as u32 * 255 + MAX_CHANNEL as u32 / 2) / MAX_CHANNEL as u32) as u8
        }
        (scale(self.red), scale(self.green), scale(self.blue))
    }
}

/// Name tables for color pairs and custom colors.
#[derive(Debug)]
pub struct ColorTable {
    pairs: HashMap<String, PairId>,
    next_pair: u16,
    colors: HashMap<String, Color>,
    next_color: u16,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorTable {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            pairs: HashMap::new(),
            next_pair: 1,
            colors: HashMap::new(),
            next_color: Color::BASE_COUNT,
        }
    }

    /// Register the default pair.
    pub fn register_default(&mut self) {
        self.pairs.insert(DEFAULT_PAIR.to_string(), PairId::DEFAULT);
    }

    /// Allocate the next pair id for `name`.
    ///
    /// `capacity` is the number of pairs the terminal supports, pair 0
    /// included.
    pub fn add_pair(&mut self, name: &str, capacity: u16) -> Result<PairId> {
        if self.next_pair >= capacity {
            return Err(TermError::ResourceExhausted(format!(
                "maximum number of color pairs ({capacity}) reached"
            )));
        }
        let id = PairId(self.next_pair);
        self.next_pair += 1;
        self.pairs.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a pair by name.
    pub fn pair(&self, name: &str) -> Result<PairId> {
        self.pairs
            .get(name)
            .copied()
            .ok_or_else(|| TermError::not_found("color pair", name))
    }

    /// Allocate the next custom color index for `name`.
    ///
    /// `capacity` is the number of colors the terminal supports.
    pub fn add_color(&mut self, name: &str, color: &CustomColor, capacity: u16) -> Result<Color> {
        color.validate()?;
        if self.next_color >= capacity {
            return Err(TermError::ResourceExhausted(format!(
                "maximum number of custom colors ({capacity}) reached"
            )));
        }
        let id = Color(self.next_color);
        self.next_color += 1;
        self.colors.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a custom color by name.
    pub fn color(&self, name: &str) -> Result<Color> {
        self.colors
            .get(name)
            .copied()
            .ok_or_else(|| TermError::not_found("color", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_start_at_one() {
        let mut table = ColorTable::new();
        table.register_default();
        assert_eq!(table.pair("std").unwrap(), PairId::DEFAULT);
        assert_eq!(table.add_pair("bw", 64).unwrap(), PairId(1));
        assert_eq!(table.add_pair("wb", 64).unwrap(), PairId(2));
        assert_eq!(table.pair("wb").unwrap(), PairId(2));
    }

    #[test]
    fn test_rebinding_never_reuses_ids() {
        let mut table = ColorTable::new();
        let first = table.add_pair("alert", 64).unwrap();
        let second = table.add_pair("alert", 64).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.pair("alert").unwrap(), second);
        assert_eq!(table.add_pair("other", 64).unwrap(), PairId(3));
    }

    #[test]
    fn test_pair_capacity() {
        let mut table = ColorTable::new();
        table.add_pair("a", 3).unwrap();
        table.add_pair("b", 3).unwrap();
        let err = table.add_pair("c", 3).unwrap_err();
        assert!(matches!(err, TermError::ResourceExhausted(_)));
    }

    #[test]
    fn test_missing_pair() {
        let table = ColorTable::new();
        let err = table.pair("nope").unwrap_err();
        assert!(matches!(err, TermError::NotFound { kind: "color pair", .. }));
    }

    #[test]
    fn test_custom_colors_follow_base_colors() {
        let mut table = ColorTable::new();
        let c = table.add_color("r", &CustomColor::new(999, 0, 0), 256).unwrap();
        assert_eq!(c, Color(8));
        assert_eq!(table.color("r").unwrap(), Color(8));
    }

    #[test]
    fn test_custom_color_range() {
        let mut table = ColorTable::new();
        let err = table
            .add_color("bad", &CustomColor::new(1000, 0, 0), 256)
            .unwrap_err();
        assert!(matches!(err, TermError::InvalidArgument(_)));

        let err = table.add_color("full", &CustomColor::new(0, 0, 0), 8).unwrap_err();
        assert!(matches!(err, TermError::ResourceExhausted(_)));
    }

    #[test]
    fn test_to_rgb8() {
        assert_eq!(CustomColor::new(999, 0, 999).to_rgb8(), (255, 0, 255));
        assert_eq!(CustomColor::new(0, 0, 0).to_rgb8(), (0, 0, 0));
    }
}
