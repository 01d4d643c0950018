//! Terminal styling for the keg installer.
//!
//! Provides Ayu-themed stage tags and status colors, plus TTY and color
//! detection for status output written to stderr.

pub mod styles;
pub mod terminal;
