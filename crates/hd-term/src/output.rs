// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering.
//
//   OutputBuffer: accumulates all ANSI bytes for a refresh in memory so
//   the whole frame goes out in a single write() syscall.
//
//   CellWriter: remembers the terminal's cursor position, colors, and
//   attributes, and skips escape sequences that wouldn't change anything.
//   A dithered bitmap is long runs of cells that share a color, so most
//   cells cost one glyph and nothing else.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Attr, Cell};
use crate::color::CellColor;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// In-memory byte accumulator flushed with one write per frame.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a codepoint as UTF-8. Invalid codepoints (and the
    /// continuation marker 0) become `?`.
    pub fn write_codepoint(&mut self, cp: u32) {
        match char::from_u32(cp) {
            Some(ch) if cp != 0 => {
                let mut enc = [0u8; 4];
                self.buf
                    .extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
            }
            _ => self.buf.push(b'?'),
        }
    }

    /// Clear for reuse, keeping capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to stdout and clear.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.flush_to(&mut lock)
    }

    /// Write everything to `w` and clear.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens in flush_stdout() / flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Stateful cell renderer that skips redundant escapes.
///
/// - **Cursor**: no CUP when the next cell is at `(last_x + 1, last_y)`.
/// - **Attributes**: on change, SGR 0 then re-emit; SGR 0 also forgets
///   the tracked colors.
/// - **Colors**: emitted only when different from the last emitted value.
/// - **Wide chars**: a continuation cell right after its owner emits nothing.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_x: i32,
    last_y: i32,
    last_fg: Option<CellColor>,
    last_bg: Option<CellColor>,
    last_attrs: Attr,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::empty(),
        }
    }

    /// Forget all tracked state. Call after a terminal reset or clear.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Render one cell, emitting only the escapes it needs.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, x: u16, y: u16, cell: &Cell) {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y).ok();
        }

        if cell.is_continuation() {
            if xi > 0 && self.last_x == xi - 1 && self.last_y == yi {
                // The terminal already drew this column with the wide char.
                self.last_x = xi;
                return;
            }
            self.apply_style(out, cell);
            out.buf.push(b' ');
        } else {
            self.apply_style(out, cell);
            out.write_codepoint(cell.ch);
        }

        self.last_x = xi;
        self.last_y = yi;
    }

    fn apply_style(&mut self, out: &mut OutputBuffer, cell: &Cell) {
        if cell.attrs != self.last_attrs {
            if !self.last_attrs.is_empty() {
                ansi::reset(out).ok();
                self.last_fg = None;
                self.last_bg = None;
            }
            self.last_attrs = cell.attrs;
            ansi::attrs(out, cell.attrs).ok();
        }

        if self.last_fg != Some(cell.fg) {
            ansi::fg(out, cell.fg).ok();
            self.last_fg = Some(cell.fg);
        }

        if self.last_bg != Some(cell.bg) {
            ansi::bg(out, cell.bg).ok();
            self.last_bg = Some(cell.bg);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text(out: &OutputBuffer) -> String {
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn new_buffer_is_empty() {
        let out = OutputBuffer::new();
        assert!(out.is_empty());
        assert_eq!(out.len(), 0);
    }

    #[test]
    fn write_codepoint_utf8() {
        let mut out = OutputBuffer::new();
        out.write_codepoint('▀' as u32);
        assert_eq!(out.as_bytes(), "▀".as_bytes());
    }

    #[test]
    fn write_codepoint_invalid_and_continuation() {
        let mut out = OutputBuffer::new();
        out.write_codepoint(0);
        out.write_codepoint(0xD800);
        assert_eq!(out.as_bytes(), b"??");
    }

    #[test]
    fn flush_to_drains_buffer() {
        let mut out = OutputBuffer::new();
        out.write_all(b"abc").unwrap();
        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"abc");
        assert!(out.is_empty());
    }

    #[test]
    fn flush_to_empty_writes_nothing() {
        let mut out = OutputBuffer::new();
        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        assert!(sink.is_empty());
    }

    // ── CellWriter ──────────────────────────────────────────────────────

    #[test]
    fn first_cell_positions_and_colors() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let cell = Cell::colored('▀', CellColor::Rgb(255, 0, 0), CellColor::Rgb(0, 0, 255));
        w.render_cell(&mut out, 0, 0, &cell);
        assert_eq!(
            text(&out),
            "\x1b[1;1H\x1b[38;2;255;0;0m\x1b[48;2;0;0;255m▀"
        );
    }

    #[test]
    fn sequential_same_style_emits_only_glyph() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let cell = Cell::colored('▀', CellColor::Ansi256(11), CellColor::Ansi256(11));
        w.render_cell(&mut out, 0, 0, &cell);
        out.clear();
        w.render_cell(&mut out, 1, 0, &cell);
        assert_eq!(text(&out), "▀");
    }

    #[test]
    fn jump_emits_cursor_move() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let cell = Cell::new('a');
        w.render_cell(&mut out, 0, 0, &cell);
        out.clear();
        w.render_cell(&mut out, 5, 2, &cell);
        assert_eq!(text(&out), "\x1b[3;6Ha");
    }

    #[test]
    fn attr_change_resets_and_reemits_colors() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let bold = Cell::new('a').with_attrs(Attr::BOLD);
        w.render_cell(&mut out, 0, 0, &bold);
        out.clear();
        w.render_cell(&mut out, 1, 0, &Cell::new('b'));
        assert_eq!(text(&out), "\x1b[0m\x1b[39m\x1b[49mb");
    }

    #[test]
    fn continuation_after_owner_is_skipped() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        w.render_cell(&mut out, 0, 0, &Cell::new('中'));
        out.clear();
        let cont = Cell::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        w.render_cell(&mut out, 1, 0, &cont);
        assert!(out.is_empty());
    }

    #[test]
    fn orphan_continuation_renders_space() {
        let mut out = OutputBuffer::new();
        let mut w = CellWriter::new();
        let cont = Cell::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        w.render_cell(&mut out, 3, 0, &cont);
        assert!(text(&out).ends_with(' '));
    }
}
