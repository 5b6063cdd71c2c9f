//! Style module: text attributes and colors.
//!
//! This module contains:
//! - [`Attributes`]: attribute bitflags (bold, reverse, ...)
//! - [`Color`], [`PairId`], [`CustomColor`]: color identifiers
//! - [`ColorTable`]: the name tables behind `add_color_pair` / `init_color`

mod attributes;
mod color;

pub use attributes::Attributes;
pub use color::{Color, ColorTable, CustomColor, PairId, DEFAULT_PAIR, MAX_CHANNEL};
