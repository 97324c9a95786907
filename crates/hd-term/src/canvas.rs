// SPDX-License-Identifier: MIT
//
// Canvas: the 2D cell grid a display owns and everything draws onto.
//
// The dither writes bitmap cells here, `put_str` writes text, and the
// diff renderer compares the canvas against the last refreshed frame to
// emit only what changed.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing (`y * width + x`). A row is
//     contiguous, so the renderer's left-to-right scan is linear.
//
//   - Coordinates handed in by callers are signed where they describe a
//     region (`Rect`): a bitmap may be placed partially off-canvas, and the
//     intersection with the canvas bounds is what actually gets written.
//
//   - Wide characters occupy two columns; the second is a continuation
//     cell. Writes that land on half of a wide character break it so no
//     orphaned halves reach the terminal.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::cell::{Attr, Cell};
use crate::color::CellColor;

// ─── Rect ────────────────────────────────────────────────────────────────────

/// A rectangle in canvas coordinates.
///
/// `x`/`y` are signed so a region may start off-canvas.
///
/// ```
/// use hd_term::canvas::Rect;
///
/// let r = Rect::new(10, 5, 80, 24);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(89, 28));
/// assert!(!r.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub fn contains(self, px: u16, py: u16) -> bool {
        let px = i32::from(px);
        let py = i32::from(py);
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Intersection of two rectangles, `None` if they don't overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            // Both differences are positive and bounded by u16 extents.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Some(Self {
                x: x1,
                y: y1,
                width: (x2 - x1) as u16,
                height: (y2 - y1) as u16,
            })
        } else {
            None
        }
    }
}

// ─── Canvas ──────────────────────────────────────────────────────────────────

/// A 2D grid of terminal cells.
///
/// ```
/// use hd_term::canvas::Canvas;
/// use hd_term::cell::Cell;
///
/// let mut cv = Canvas::new(80, 24);
/// assert_eq!((cv.width(), cv.height()), (80, 24));
///
/// cv.set(5, 3, Cell::new('X'));
/// assert_eq!(cv.get(5, 3).unwrap().character(), Some('X'));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    // ─── Construction ────────────────────────────────────────────────────

    /// A canvas filled with empty cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; size],
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The full canvas extent as a [`Rect`].
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice, `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    // ─── Clear, Resize, Copy ─────────────────────────────────────────────

    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Resize, discarding all content.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::EMPTY);
    }

    /// Overwrite this canvas with `other`, reusing the allocation when the
    /// dimensions already match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width == other.width && self.height == other.height {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.clone_from(other);
        }
    }

    // ─── Cell Writes ─────────────────────────────────────────────────────

    /// Bounds-checked write. Breaks any wide character it lands on.
    ///
    /// Returns `true` if the position was in bounds.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        true
    }

    /// Break any wide character that touches `(x, y)`.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);

        if self.cells[idx].is_continuation() && x > 0 {
            let prev = self.index(x - 1, y);
            self.cells[prev].ch = u32::from(b' ');
        }

        if x + 1 < self.width {
            let next = self.index(x + 1, y);
            if self.cells[next].is_continuation() {
                self.cells[next] = Cell::EMPTY;
            }
        }
    }

    /// Fill a rectangle with spaces on `bg`. Clipped to the canvas.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn fill_rect(&mut self, rect: Rect, bg: CellColor) {
        let Some(area) = rect.intersect(self.bounds()) else {
            return;
        };

        // Intersection with bounds at origin 0,0: all values non-negative.
        let (x1, y1) = (area.x as u16, area.y as u16);
        let (x2, y2) = (area.right() as u16, area.bottom() as u16);

        for y in y1..y2 {
            for x in x1..x2 {
                self.set(x, y, Cell::EMPTY.with_bg(bg));
            }
        }
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Write a string left-to-right starting at `(x, y)`.
    ///
    /// Each grapheme cluster takes the width of its base character;
    /// combining marks are dropped rather than emitted on their own.
    /// A wide character that doesn't fit at the right edge becomes a
    /// space. Returns the number of columns written.
    pub fn put_str(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: CellColor,
        bg: CellColor,
        attrs: Attr,
    ) -> u16 {
        if y >= self.height {
            return 0;
        }

        let mut col = x;

        for grapheme in text.graphemes(true) {
            if col >= self.width {
                break;
            }
            let Some(ch) = grapheme.chars().next() else {
                continue;
            };
            let char_w = ch.width().unwrap_or(0);
            if char_w == 0 {
                continue;
            }

            let cell = Cell {
                ch: u32::from(ch),
                fg,
                bg,
                attrs,
            };

            if char_w == 2 {
                if col + 1 >= self.width {
                    self.set(col, y, Cell { ch: u32::from(b' '), ..cell });
                    col += 1;
                    break;
                }
                self.set(col, y, cell);
                self.set(col + 1, y, Cell::continuation(fg, bg, attrs));
                col += 2;
            } else {
                self.set(col, y, cell);
                col += 1;
            }
        }

        col - x
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Canvas({}x{})", self.width, self.height)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row_text(cv: &Canvas, y: u16) -> String {
        cv.row(y)
            .unwrap()
            .iter()
            .filter_map(|c| c.character())
            .collect()
    }

    // ── Rect ─────────────────────────────────────────────────────────────

    #[test]
    fn rect_edges() {
        let r = Rect::new(10, 20, 80, 24);
        assert_eq!(r.right(), 90);
        assert_eq!(r.bottom(), 44);
        assert!(!r.is_empty());
        assert!(Rect::new(0, 0, 0, 5).is_empty());
    }

    #[test]
    fn rect_contains_with_negative_origin() {
        let r = Rect::new(-5, -3, 20, 10);
        assert!(r.contains(0, 0));
        assert!(r.contains(14, 6));
        assert!(!r.contains(15, 0));
    }

    #[test]
    fn rect_intersect_overlap() {
        let a = Rect::new(0, 0, 20, 20);
        let b = Rect::new(10, 10, 20, 20);
        assert_eq!(a.intersect(b), Some(Rect::new(10, 10, 10, 10)));
    }

    #[test]
    fn rect_intersect_adjacent_is_none() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.intersect(b), None);
    }

    // ── Construction & access ───────────────────────────────────────────

    #[test]
    fn new_is_empty() {
        let cv = Canvas::new(4, 3);
        assert_eq!(cv.cells().len(), 12);
        assert!(cv.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn zero_size_canvas() {
        let cv = Canvas::new(0, 0);
        assert!(cv.cells().is_empty());
        assert!(cv.get(0, 0).is_none());
        assert!(cv.row(0).is_none());
    }

    #[test]
    fn get_out_of_bounds() {
        let cv = Canvas::new(4, 3);
        assert!(cv.get(4, 0).is_none());
        assert!(cv.get(0, 3).is_none());
    }

    #[test]
    fn set_out_of_bounds_returns_false() {
        let mut cv = Canvas::new(4, 3);
        assert!(!cv.set(4, 0, Cell::new('x')));
        assert!(cv.set(3, 2, Cell::new('x')));
    }

    #[test]
    fn set_writes_row_major() {
        let mut cv = Canvas::new(4, 3);
        cv.set(1, 2, Cell::new('q'));
        assert_eq!(cv.cells()[2 * 4 + 1].character(), Some('q'));
    }

    #[test]
    fn resize_discards_content() {
        let mut cv = Canvas::new(4, 3);
        cv.set(0, 0, Cell::new('x'));
        cv.resize(6, 2);
        assert_eq!((cv.width(), cv.height()), (6, 2));
        assert_eq!(cv.cells().len(), 12);
        assert!(cv.get(0, 0).unwrap().is_empty());
    }

    #[test]
    fn copy_from_same_and_different_size() {
        let mut src = Canvas::new(3, 2);
        src.set(2, 1, Cell::new('z'));

        let mut same = Canvas::new(3, 2);
        same.copy_from(&src);
        assert_eq!(same, src);

        let mut other = Canvas::new(9, 9);
        other.copy_from(&src);
        assert_eq!(other, src);
    }

    #[test]
    fn clear_resets_cells() {
        let mut cv = Canvas::new(2, 2);
        cv.set(1, 1, Cell::new('x'));
        cv.clear();
        assert!(cv.cells().iter().all(|c| c.is_empty()));
    }

    // ── fill_rect ────────────────────────────────────────────────────────

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut cv = Canvas::new(4, 4);
        let red = CellColor::Rgb(255, 0, 0);
        cv.fill_rect(Rect::new(-2, 2, 4, 10), red);

        assert_eq!(cv.get(0, 2).unwrap().bg, red);
        assert_eq!(cv.get(1, 3).unwrap().bg, red);
        assert_eq!(cv.get(2, 2).unwrap().bg, CellColor::Default);
        assert_eq!(cv.get(0, 1).unwrap().bg, CellColor::Default);
    }

    #[test]
    fn fill_rect_fully_outside_is_noop() {
        let mut cv = Canvas::new(4, 4);
        cv.fill_rect(Rect::new(10, 10, 3, 3), CellColor::Ansi256(1));
        assert!(cv.cells().iter().all(|c| c.is_empty()));
    }

    // ── put_str ──────────────────────────────────────────────────────────

    #[test]
    fn put_str_ascii() {
        let mut cv = Canvas::new(10, 1);
        let n = cv.put_str(2, 0, "Hello!", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(n, 6);
        assert_eq!(row_text(&cv, 0), "  Hello!  ");
    }

    #[test]
    fn put_str_truncates_at_edge() {
        let mut cv = Canvas::new(4, 1);
        let n = cv.put_str(1, 0, "abcdef", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(n, 3);
        assert_eq!(row_text(&cv, 0), " abc");
    }

    #[test]
    fn put_str_wide_char_uses_continuation() {
        let mut cv = Canvas::new(4, 1);
        let n = cv.put_str(0, 0, "中a", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(n, 3);
        assert_eq!(cv.get(0, 0).unwrap().character(), Some('中'));
        assert!(cv.get(1, 0).unwrap().is_continuation());
        assert_eq!(cv.get(2, 0).unwrap().character(), Some('a'));
    }

    #[test]
    fn put_str_wide_char_at_edge_becomes_space() {
        let mut cv = Canvas::new(3, 1);
        let n = cv.put_str(2, 0, "中", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(n, 1);
        assert_eq!(cv.get(2, 0).unwrap().character(), Some(' '));
    }

    #[test]
    fn put_str_drops_combining_marks() {
        let mut cv = Canvas::new(4, 1);
        let n = cv.put_str(0, 0, "e\u{301}x", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(n, 2);
        assert_eq!(row_text(&cv, 0), "ex  ");
    }

    #[test]
    fn put_str_off_canvas_row() {
        let mut cv = Canvas::new(4, 1);
        assert_eq!(cv.put_str(0, 5, "x", CellColor::Default, CellColor::Default, Attr::empty()), 0);
    }

    #[test]
    fn overwriting_continuation_breaks_wide_char() {
        let mut cv = Canvas::new(4, 1);
        cv.put_str(0, 0, "中", CellColor::Default, CellColor::Default, Attr::empty());
        cv.set(1, 0, Cell::new('x'));
        assert_eq!(cv.get(0, 0).unwrap().character(), Some(' '));
        assert_eq!(cv.get(1, 0).unwrap().character(), Some('x'));
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", Canvas::new(80, 24)), "Canvas(80x24)");
    }
}
