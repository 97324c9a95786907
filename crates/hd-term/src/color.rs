// SPDX-License-Identifier: MIT
//
// Terminal colors: what a cell can actually display.
//
// A terminal cell holds one of three kinds of color: 24-bit TrueColor, an
// index into the xterm 256-color palette, or "whatever the terminal's
// default is". That's `CellColor`, four bytes, compared in the diff
// renderer's hot loop.
//
// The palette half of this module answers the question the dither needs
// answered thousands of times per frame: "which palette entry is closest
// to this RGB value?" Closeness is measured in Oklab, a perceptually
// uniform space, so saturated reds don't get matched to muddy browns
// just because the Euclidean RGB distance happened to be small. The
// palette's Oklab coordinates are computed once and cached.
//
// Reference for the Oklab math: https://bottosson.github.io/posts/oklab/

use std::fmt;

// ─── CellColor ───────────────────────────────────────────────────────────────

/// Compact color for terminal cell storage.
///
/// This is what gets written to the [`Canvas`](crate::canvas::Canvas) and
/// converted to ANSI escape sequences on refresh.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index.
    Ansi256(u8),

    /// Terminal default color (inherits from terminal settings).
    #[default]
    Default,
}

impl CellColor {
    /// The RGB value this color displays as, using xterm palette defaults.
    /// Returns `None` for [`CellColor::Default`].
    #[must_use]
    pub fn to_rgb8(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Rgb(r, g, b) => Some((r, g, b)),
            Self::Ansi256(idx) => Some(palette::ansi256_to_rgb(idx)),
            Self::Default => None,
        }
    }

    /// Downgrade to the ANSI-256 palette (for terminals without `TrueColor`).
    #[must_use]
    pub fn to_ansi256(self) -> Self {
        match self {
            Self::Rgb(r, g, b) => Self::Ansi256(palette::nearest_ansi256(r, g, b)),
            other => other,
        }
    }

    /// Downgrade to the 16 basic ANSI colors.
    #[must_use]
    pub fn to_ansi16(self) -> Self {
        match self.to_rgb8() {
            Some((r, g, b)) => Self::Ansi256(palette::nearest_ansi16(r, g, b)),
            None => Self::Default,
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ─── sRGB → Oklab ────────────────────────────────────────────────────────────

/// Convert a single sRGB component (0.0–1.0) to linear light.
#[inline]
#[must_use]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert 8-bit sRGB to Oklab `(L, a, b)`.
#[must_use]
pub fn rgb8_to_oklab(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = srgb_to_linear(f32::from(r) / 255.0);
    let g = srgb_to_linear(f32::from(g) / 255.0);
    let b = srgb_to_linear(f32::from(b) / 255.0);

    // Linear sRGB → LMS
    let l = 0.051_445_995f32.mul_add(b, 0.412_221_47f32.mul_add(r, 0.536_332_55 * g));
    let m = 0.107_396_96f32.mul_add(b, 0.211_903_5f32.mul_add(r, 0.680_699_5 * g));
    let s = 0.629_978_7f32.mul_add(b, 0.088_302_46f32.mul_add(r, 0.281_718_84 * g));

    let l_ = l.cbrt();
    let m_ = m.cbrt();
    let s_ = s.cbrt();

    (
        0.004_072_047f32.mul_add(-s_, 0.210_454_26f32.mul_add(l_, 0.793_617_8 * m_)),
        0.450_593_7f32.mul_add(s_, 1.977_998_5f32.mul_add(l_, -(2.428_592_2 * m_))),
        0.808_675_77f32.mul_add(-s_, 0.025_904_037f32.mul_add(l_, 0.782_771_77 * m_)),
    )
}

// ─── Palette ─────────────────────────────────────────────────────────────────

pub mod palette {
    //! xterm color palette and perceptual nearest-match.
    //!
    //! The 256-color palette consists of:
    //! - 0–7: standard colors
    //! - 8–15: bright variants
    //! - 16–231: a 6×6×6 RGB cube
    //! - 232–255: a 24-step grayscale ramp

    use std::sync::OnceLock;

    use super::rgb8_to_oklab;

    /// The 16 basic colors as RGB, xterm defaults.
    pub const ANSI16_RGB: [(u8, u8, u8); 16] = [
        (0, 0, 0),       // 0: Black
        (128, 0, 0),     // 1: Red
        (0, 128, 0),     // 2: Green
        (128, 128, 0),   // 3: Yellow
        (0, 0, 128),     // 4: Blue
        (128, 0, 128),   // 5: Magenta
        (0, 128, 128),   // 6: Cyan
        (192, 192, 192), // 7: White
        (128, 128, 128), // 8: Bright Black
        (255, 0, 0),     // 9: Bright Red
        (0, 255, 0),     // 10: Bright Green
        (255, 255, 0),   // 11: Bright Yellow
        (0, 0, 255),     // 12: Bright Blue
        (255, 0, 255),   // 13: Bright Magenta
        (0, 255, 255),   // 14: Bright Cyan
        (255, 255, 255), // 15: Bright White
    ];

    /// Convert a palette index to RGB.
    #[must_use]
    pub fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
        match idx {
            0..=15 => ANSI16_RGB[idx as usize],
            16..=231 => {
                let idx = idx - 16;
                // Cube levels: 0, 95, 135, 175, 215, 255
                let level = |i: u8| -> u8 { if i == 0 { 0 } else { 55 + 40 * i } };
                (level(idx / 36), level((idx % 36) / 6), level(idx % 6))
            }
            232..=255 => {
                let v = 8 + 10 * (idx - 232);
                (v, v, v)
            }
        }
    }

    /// Oklab coordinates of all 256 palette entries, computed on first use.
    fn oklab_table() -> &'static [(f32, f32, f32); 256] {
        static TABLE: OnceLock<[(f32, f32, f32); 256]> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = [(0.0, 0.0, 0.0); 256];
            for (idx, slot) in (0u8..=255).zip(table.iter_mut()) {
                let (r, g, b) = ansi256_to_rgb(idx);
                *slot = rgb8_to_oklab(r, g, b);
            }
            table
        })
    }

    /// Index of the entry in `table[range]` closest to `(r, g, b)`.
    fn nearest_in(r: u8, g: u8, b: u8, count: usize) -> u8 {
        let (l1, a1, b1) = rgb8_to_oklab(r, g, b);
        let mut best_idx = 0usize;
        let mut best_dist = f32::MAX;

        for (idx, &(l2, a2, b2)) in oklab_table().iter().take(count).enumerate() {
            let dl = l1 - l2;
            let da = a1 - a2;
            let db = b1 - b2;
            let dist = db.mul_add(db, dl.mul_add(dl, da * da));
            if dist < best_dist {
                best_dist = dist;
                best_idx = idx;
            }
        }

        // count <= 256, so the index fits.
        #[allow(clippy::cast_possible_truncation)]
        let idx = best_idx as u8;
        idx
    }

    /// Nearest 256-palette entry by Oklab distance.
    #[must_use]
    pub fn nearest_ansi256(r: u8, g: u8, b: u8) -> u8 {
        nearest_in(r, g, b, 256)
    }

    /// Nearest of the 16 basic colors by Oklab distance.
    #[must_use]
    pub fn nearest_ansi16(r: u8, g: u8, b: u8) -> u8 {
        nearest_in(r, g, b, 16)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
