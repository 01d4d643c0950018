//! Ayu color theme and styling functions for keg CLI output.
//!
//! Uses the Ayu Dark color palette.
//! Color source: <https://github.com/ayu-theme/ayu-colors>

use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178 - bright red
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

// General icons
pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_WARN: &str = "\u{26A0}"; // ⚠

/// Leader printed before every stage line.
pub const STAGE_LEADER: &str = "==>";

/// How a stage line should be colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Progress,
    Pass,
    Fail,
}

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8), color: bool) -> String {
    if color {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8), color: bool) -> String {
    if color {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

/// Renders text with pass (green) styling.
pub fn render_pass(s: &str) -> String {
    color_str(s, PASS, supports_color())
}

/// Renders text with warning (yellow) styling.
pub fn render_warn(s: &str) -> String {
    color_str(s, WARN, supports_color())
}

/// Renders text with fail (red) styling.
pub fn render_fail(s: &str) -> String {
    color_str(s, FAIL, supports_color())
}

/// Renders text with muted (gray) styling.
pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED, supports_color())
}

/// Renders text in bold.
pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

pub fn render_pass_icon() -> String {
    render_pass(ICON_PASS)
}

pub fn render_warn_icon() -> String {
    render_warn(ICON_WARN)
}

// ---------------------------------------------------------------------------
// Stage lines
// ---------------------------------------------------------------------------

/// Format `==> [stage] message`, colored by `tone` when `color` is set.
pub fn format_stage_line(stage: &str, message: &str, tone: Tone, color: bool) -> String {
    let rgb = match tone {
        Tone::Progress => ACCENT,
        Tone::Pass => PASS,
        Tone::Fail => FAIL,
    };
    let leader = color_bold_str(STAGE_LEADER, rgb, color);
    let tag = color_str(&format!("[{stage}]"), rgb, color);
    if message.is_empty() {
        format!("{leader} {tag}")
    } else {
        format!("{leader} {tag} {message}")
    }
}

/// [`format_stage_line`] using terminal color detection.
pub fn stage_line(stage: &str, message: &str, tone: Tone) -> String {
    format_stage_line(stage, message, tone, supports_color())
}
