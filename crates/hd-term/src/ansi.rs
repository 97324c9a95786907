// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit: that's the `CellWriter`'s job. This
// module only knows the byte-level encoding of each terminal command.
//
// Cursor positions are 0-indexed in our API and converted to the 1-indexed
// coordinates the terminal expects.
//
// Every writer returns the `io::Error` of the underlying `Write` and fails
// for no other reason, so the functions carry no `# Errors` section each.
#![allow(clippy::missing_errors_doc)]

use std::io::{self, Write};

use crate::cell::Attr;
use crate::color::CellColor;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes (SGR 0).
///
/// The stateful writer must invalidate its tracked colors after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground color.
///
/// Compact SGR codes for the 16 basic colors (30–37, 90–97), `38;5;N` for
/// the rest of the palette, `38;2;R;G;B` for `TrueColor`.
pub fn fg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[39m"),
        CellColor::Ansi256(idx) if idx < 8 => write!(w, "\x1b[{}m", 30 + u16::from(idx)),
        CellColor::Ansi256(idx) if idx < 16 => write!(w, "\x1b[{}m", 82 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[38;5;{idx}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Set the background color. Same strategy as [`fg`] with BG codes.
pub fn bg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[49m"),
        CellColor::Ansi256(idx) if idx < 8 => write!(w, "\x1b[{}m", 40 + u16::from(idx)),
        CellColor::Ansi256(idx) if idx < 16 => write!(w, "\x1b[{}m", 92 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[48;5;{idx}m"),
        CellColor::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Emit SGR codes for `attr` as one CSI sequence (`\x1b[1;4m`).
/// Writes nothing if no attributes are set.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    const CODES: [(Attr, &[u8]); 6] = [
        (Attr::BOLD, b"1"),
        (Attr::DIM, b"2"),
        (Attr::ITALIC, b"3"),
        (Attr::UNDERLINE, b"4"),
        (Attr::BLINK, b"5"),
        (Attr::INVERSE, b"7"),
    ];

    if attr.is_empty() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    let mut first = true;
    for (flag, code) in CODES {
        if attr.contains(flag) {
            if !first {
                w.write_all(b";")?;
            }
            w.write_all(code)?;
            first = false;
        }
    }
    w.write_all(b"m")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC 2026). The terminal holds the frame
/// until [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ────────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen and restore the original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Mouse tracking granularity for the SGR mouse protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Button press and release (DEC 1000).
    Click,
    /// Plus motion while a button is held (DEC 1002).
    Drag,
    /// Plus all motion (DEC 1003).
    Motion,
}

/// Enable SGR mouse tracking (DEC 1006 encoding).
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    if matches!(mode, MouseMode::Drag | MouseMode::Motion) {
        w.write_all(b"\x1b[?1002h")?;
    }
    if mode == MouseMode::Motion {
        w.write_all(b"\x1b[?1003h")?;
    }
    w.write_all(b"\x1b[?1006h")
}

/// Disable all mouse tracking.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

// ─── Kitty Keyboard Protocol ─────────────────────────────────────────────────

/// Push Kitty keyboard enhancement flags.
///
/// `1` disambiguates escape codes, `2` adds press/repeat/release reporting.
#[inline]
pub fn enable_kitty_keyboard(w: &mut impl Write, flags: u8) -> io::Result<()> {
    write!(w, "\x1b[>{flags}u")
}

/// Pop the Kitty keyboard enhancement flags.
#[inline]
pub fn disable_kitty_keyboard(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[<u")
}

// ─── Window Title ────────────────────────────────────────────────────────────

/// Set the terminal window title (OSC 2).
///
/// Control characters would terminate or corrupt the sequence, so they
/// are dropped from `title`.
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    w.write_all(b"\x1b]2;")?;
    let clean: String = title.chars().filter(|c| !c.is_control()).collect();
    w.write_all(clean.as_bytes())?;
    w.write_all(b"\x07")
}

/// Save the current window title on the terminal's title stack (xterm
/// `CSI 22;2 t`). Terminals without a stack ignore it.
#[inline]
pub fn push_title(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[22;2t")
}

/// Restore the title saved by [`push_title`].
#[inline]
pub fn pop_title(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[23;2t")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
