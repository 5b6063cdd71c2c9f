//! Layout module: surface geometry.

mod rect;

pub use rect::{Position, Rect, Size};
