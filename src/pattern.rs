// SPDX-License-Identifier: MIT
//
// The demo image: a 64×32 yellow field with colored marker pixels in the
// corners, so orientation and clipping are visible at a glance.
//
// Pixels are packed 0xRRGGBBAA. The buffer never changes size; bytes for the
// converter are produced by `to_bytes` in an explicit byte order.

use hd_dither::ByteOrder;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub const LEN: usize = WIDTH * HEIGHT;

pub const BASE_COLOR: u32 = 0xFFFF_00FF;
pub const RED: u32 = 0xFF00_00FF;
pub const GREEN: u32 = 0x00FF_00FF;
pub const BLUE: u32 = 0x0000_FFFF;

/// A fixed 64×32 grid of packed RGBA pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: [u32; LEN],
}

impl PixelBuffer {
    /// All zero (transparent black).
    #[must_use]
    pub const fn new() -> Self {
        Self { pixels: [0; LEN] }
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Red, green, blue along the start of the first row; red at the end of
    /// the first row; green at the start of the last row; blue in the last
    /// pixel.
    pub fn mark_corners(&mut self) {
        for (index, color) in [
            (0, RED),
            (1, GREEN),
            (2, BLUE),
            (WIDTH - 1, RED),
            (WIDTH * (HEIGHT - 1), GREEN),
            (WIDTH * (HEIGHT - 1) + WIDTH - 1, BLUE),
        ] {
            self.pixels[index] = color;
        }
    }

    #[cfg(test)]
    fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        Some(self.pixels[y * WIDTH + x])
    }

    #[cfg(test)]
    fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// Serialize every pixel as four bytes in `order`.
    #[must_use]
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| match order {
                ByteOrder::Big => p.to_be_bytes(),
                ByteOrder::Little => p.to_le_bytes(),
            })
            .collect()
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PixelBuffer({WIDTH}x{HEIGHT})")
    }
}

/// Paint the demo image into `buffer`.
pub fn build(buffer: &mut PixelBuffer) {
    buffer.fill(BASE_COLOR);
    buffer.mark_corners();
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn built() -> PixelBuffer {
        let mut buffer = PixelBuffer::new();
        build(&mut buffer);
        buffer
    }

    const MARKERS: [usize; 6] = [0, 1, 2, 63, 64 * 31, 64 * 31 + 63];

    #[test]
    fn length_is_fixed() {
        let buffer = built();
        assert_eq!(LEN, 2048);
        assert_eq!(buffer.as_slice().len(), LEN);
        assert_eq!(buffer.to_bytes(ByteOrder::Big).len(), LEN * 4);
    }

    #[test]
    fn first_row_markers() {
        let px = built();
        assert_eq!(px.as_slice()[0], 0xFF00_00FF);
        assert_eq!(px.as_slice()[1], 0x00FF_00FF);
        assert_eq!(px.as_slice()[2], 0x0000_FFFF);
    }

    #[test]
    fn corner_markers() {
        let px = built();
        assert_eq!(px.get(63, 0), Some(RED));
        assert_eq!(px.get(0, 31), Some(GREEN));
        assert_eq!(px.get(63, 31), Some(BLUE));
        assert_eq!(px.as_slice()[64 * 31 + 63], 0x0000_FFFF);
    }

    #[test]
    fn everything_else_is_base_color() {
        let px = built();
        for (i, &p) in px.as_slice().iter().enumerate() {
            if !MARKERS.contains(&i) {
                assert_eq!(p, BASE_COLOR, "pixel {i}");
            }
        }
    }

    #[test]
    fn every_pixel_is_opaque() {
        assert!(built().as_slice().iter().all(|p| p & 0xFF == 0xFF));
    }

    #[test]
    fn build_overwrites_previous_contents() {
        let mut buffer = PixelBuffer::new();
        buffer.fill(0x1234_5678);
        build(&mut buffer);
        assert_eq!(buffer, built());
    }

    #[test]
    fn get_out_of_range() {
        assert_eq!(built().get(64, 0), None);
        assert_eq!(built().get(0, 32), None);
    }

    #[test]
    fn bytes_follow_byte_order() {
        let px = built();
        let be = px.to_bytes(ByteOrder::Big);
        let le = px.to_bytes(ByteOrder::Little);
        assert_eq!(be.len(), 2048 * 4);
        assert_eq!(&be[..4], &[0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(&le[..4], &[0xFF, 0x00, 0x00, 0xFF]);
        assert_eq!(&be[12..16], &[0xFF, 0xFF, 0x00, 0xFF]);
        assert_eq!(&le[12..16], &[0xFF, 0x00, 0xFF, 0xFF]);
    }
}
