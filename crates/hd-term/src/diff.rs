// SPDX-License-Identifier: MIT
//
// Differential renderer: what `Display::refresh` runs.
//
// The current canvas is compared against the one shown by the previous
// refresh, and only changed cells are handed to the `CellWriter`. The first
// refresh (and any refresh after a size change or a forced redraw) clears
// the screen and draws everything.
//
// Per refresh:
//
//   1. Rows identical to the previous frame are skipped with one slice
//      comparison.
//   2. Changed cells go through CellWriter into OutputBuffer.
//   3. The frame is wrapped in synchronized output (DEC 2026) so the
//      terminal shows it all at once.
//   4. flush() issues a single write().

use std::io::{self, Write};

use crate::ansi;
use crate::canvas::Canvas;
use crate::output::{CellWriter, OutputBuffer};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What a render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells that changed and were emitted.
    pub cells_rendered: usize,
    /// Cells that matched the previous frame.
    pub cells_skipped: usize,
    /// Bytes of ANSI output generated.
    pub bytes_written: usize,
}

impl RenderStats {
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Emits ANSI only for cells that changed since the last render.
///
/// ```
/// use hd_term::canvas::Canvas;
/// use hd_term::diff::DiffRenderer;
///
/// let mut renderer = DiffRenderer::new();
/// let canvas = Canvas::new(8, 2);
///
/// let stats = renderer.render(&canvas);
/// assert_eq!(stats.cells_rendered, 16);
///
/// let stats = renderer.render(&canvas);
/// assert_eq!(stats.cells_rendered, 0);
/// ```
pub struct DiffRenderer {
    output: OutputBuffer,
    writer: CellWriter,
    previous: Option<Canvas>,
}

impl DiffRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            previous: None,
        }
    }

    /// Diff `current` against the previous frame and generate output.
    ///
    /// Follow with [`flush`](Self::flush) or [`flush_to`](Self::flush_to).
    pub fn render(&mut self, current: &Canvas) -> RenderStats {
        self.output.clear();
        self.writer.reset_state();

        let width = current.width();
        let height = current.height();
        let mut stats = RenderStats::default();

        if width == 0 || height == 0 {
            self.store_frame(current);
            return stats;
        }

        ansi::begin_sync(&mut self.output).ok();

        let previous = self
            .previous
            .as_ref()
            .filter(|prev| prev.width() == width && prev.height() == height);

        if previous.is_none() {
            ansi::clear_screen(&mut self.output).ok();
        }

        for y in 0..height {
            let (Some(curr_row), prev_row) = (current.row(y), previous.and_then(|p| p.row(y)))
            else {
                continue;
            };

            if prev_row == Some(curr_row) {
                stats.cells_skipped += usize::from(width);
                continue;
            }

            for (x, cell) in (0..width).zip(curr_row) {
                if prev_row.is_some_and(|row| row[usize::from(x)] == *cell) {
                    stats.cells_skipped += 1;
                } else {
                    self.writer.render_cell(&mut self.output, x, y, cell);
                    stats.cells_rendered += 1;
                }
            }
        }

        // Leave the terminal's own rendering state clean after the frame.
        ansi::reset(&mut self.output).ok();
        ansi::end_sync(&mut self.output).ok();

        stats.bytes_written = self.output.len();
        self.store_frame(current);
        stats
    }

    /// Bytes generated by the last render.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Write the last render to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush_stdout()
    }

    /// Write the last render to `w`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Forget the previous frame so the next render draws everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    fn store_frame(&mut self, current: &Canvas) {
        match &mut self.previous {
            Some(prev) => prev.copy_from(current),
            None => self.previous = Some(current.clone()),
        }
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::color::CellColor;

    fn output_str(r: &DiffRenderer) -> String {
        String::from_utf8(r.output_bytes().to_vec()).unwrap()
    }

    #[test]
    fn first_render_draws_everything() {
        let mut r = DiffRenderer::new();
        let cv = Canvas::new(10, 3);
        let stats = r.render(&cv);
        assert_eq!(stats.cells_rendered, 30);
        assert_eq!(stats.cells_skipped, 0);
        assert!(output_str(&r).contains("\x1b[2J"));
    }

    #[test]
    fn unchanged_frame_renders_nothing() {
        let mut r = DiffRenderer::new();
        let cv = Canvas::new(10, 3);
        r.render(&cv);
        let stats = r.render(&cv);
        assert_eq!(stats.cells_rendered, 0);
        assert_eq!(stats.cells_skipped, 30);
        assert!(!output_str(&r).contains("\x1b[2J"));
    }

    #[test]
    fn single_change_renders_one_cell() {
        let mut r = DiffRenderer::new();
        let mut cv = Canvas::new(10, 3);
        r.render(&cv);

        cv.set(4, 1, Cell::colored('▀', CellColor::Rgb(255, 0, 0), CellColor::Default));
        let stats = r.render(&cv);
        assert_eq!(stats.cells_rendered, 1);
        assert_eq!(stats.total_cells(), 30);
        assert!(output_str(&r).contains("\x1b[2;5H"));
    }

    #[test]
    fn size_change_forces_full_redraw() {
        let mut r = DiffRenderer::new();
        r.render(&Canvas::new(10, 3));
        let stats = r.render(&Canvas::new(5, 2));
        assert_eq!(stats.cells_rendered, 10);
        assert!(output_str(&r).contains("\x1b[2J"));
    }

    #[test]
    fn force_redraw_redraws_everything() {
        let mut r = DiffRenderer::new();
        let cv = Canvas::new(4, 4);
        r.render(&cv);
        r.force_redraw();
        assert_eq!(r.render(&cv).cells_rendered, 16);
    }

    #[test]
    fn zero_size_renders_nothing() {
        let mut r = DiffRenderer::new();
        let stats = r.render(&Canvas::new(0, 0));
        assert_eq!(stats, RenderStats::default());
        assert!(r.output_bytes().is_empty());
    }

    #[test]
    fn output_is_wrapped_in_sync() {
        let mut r = DiffRenderer::new();
        r.render(&Canvas::new(2, 2));
        let s = output_str(&r);
        assert!(s.starts_with("\x1b[?2026h"));
        assert!(s.ends_with("\x1b[0m\x1b[?2026l"));
    }

    #[test]
    fn flush_to_writes_and_reports_bytes() {
        let mut r = DiffRenderer::new();
        let stats = r.render(&Canvas::new(3, 1));
        let mut sink = Vec::new();
        r.flush_to(&mut sink).unwrap();
        assert_eq!(sink.len(), stats.bytes_written);
    }
}
