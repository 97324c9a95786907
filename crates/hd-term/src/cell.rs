// SPDX-License-Identifier: MIT
//
// Cell: one character position on the canvas.
//
// A cell holds a Unicode codepoint, foreground and background colors, and
// a compact attribute bitfield. The dither writes cells, the canvas stores
// them, the diff renderer compares them, and the cell writer turns them
// into bytes.
//
// Wide characters (CJK, some emoji) occupy two columns. The first cell
// holds the codepoint; the second is a continuation cell (ch = 0) that the
// writer skips when it follows its owner.

use crate::color::CellColor;

// ─── Attributes ──────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes, mapped to SGR parameters on output.
    ///
    /// ```
    /// use hd_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::UNDERLINE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1
        const BOLD      = 1 << 0;
        /// SGR 2
        const DIM       = 1 << 1;
        /// SGR 3
        const ITALIC    = 1 << 2;
        /// SGR 4
        const UNDERLINE = 1 << 3;
        /// SGR 5
        const BLINK     = 1 << 4;
        /// SGR 7
        const INVERSE   = 1 << 5;
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single canvas cell.
///
/// Cells store fully resolved colors. Anything with transparency (a pixel
/// with low alpha, a bitmap row that isn't there) is handled upstream by
/// simply not writing the cell.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Unicode codepoint. `0` marks a continuation cell, `b' '` is empty.
    pub ch: u32,
    /// Foreground (glyph) color.
    pub fg: CellColor,
    /// Background color.
    pub bg: CellColor,
    /// Text attributes.
    pub attrs: Attr,
}

const CONTINUATION: u32 = 0;
const SPACE: u32 = b' ' as u32;

impl Cell {
    /// A space with default colors and no attributes.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
    };

    /// A cell with a character and default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            fg: CellColor::Default,
            bg: CellColor::Default,
            attrs: Attr::empty(),
        }
    }

    /// A cell with a character and both colors.
    #[inline]
    #[must_use]
    pub const fn colored(ch: char, fg: CellColor, bg: CellColor) -> Self {
        Self {
            ch: ch as u32,
            fg,
            bg,
            attrs: Attr::empty(),
        }
    }

    /// Continuation cell for the second column of a wide character.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: CONTINUATION,
            fg,
            bg,
            attrs,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether this cell is visually empty (space, default colors, no attrs).
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.ch == SPACE
            && self.fg == CellColor::Default
            && self.bg == CellColor::Default
            && self.attrs.is_empty()
    }

    /// The codepoint as a `char`. `None` for continuation cells.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if !self.fg.is_default() {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if !self.bg.is_default() {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn cell_is_compact() {
        assert!(mem::size_of::<Cell>() <= 16);
    }

    #[test]
    fn attr_is_1_byte() {
        assert_eq!(mem::size_of::<Attr>(), 1);
    }

    #[test]
    fn default_cell_is_empty() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert_eq!(cell.character(), Some(' '));
    }

    #[test]
    fn colored_cell_is_not_empty() {
        let cell = Cell::colored(' ', CellColor::Default, CellColor::Rgb(1, 2, 3));
        assert!(!cell.is_empty());
    }

    #[test]
    fn continuation_has_no_character() {
        let cell = Cell::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        assert!(cell.is_continuation());
        assert_eq!(cell.character(), None);
    }

    #[test]
    fn builders_replace_one_field() {
        let cell = Cell::new('x')
            .with_fg(CellColor::Ansi256(1))
            .with_bg(CellColor::Ansi256(2))
            .with_attrs(Attr::BOLD);
        assert_eq!(cell.character(), Some('x'));
        assert_eq!(cell.fg, CellColor::Ansi256(1));
        assert_eq!(cell.bg, CellColor::Ansi256(2));
        assert_eq!(cell.attrs, Attr::BOLD);
    }

    #[test]
    fn debug_skips_defaults() {
        assert_eq!(format!("{:?}", Cell::new('a')), "Cell('a')");
        let styled = Cell::colored('▀', CellColor::Rgb(255, 0, 0), CellColor::Default);
        assert_eq!(format!("{styled:?}"), "Cell('▀', fg=#ff0000)");
    }
}
