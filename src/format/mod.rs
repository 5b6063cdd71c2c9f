//! Format module: inline attribute markers.
//!
//! - [`parser`]: the marker state machine producing [`FormatOp`]s
//! - [`composer`]: replays operations onto an [`AttributeSink`]

pub mod composer;
pub mod parser;

pub use composer::{compose, AttributeSink, FormatWriter};
pub use parser::{parse, parse_with, plain_text, FormatOp, Marker, MarkerTable, Toggle};
