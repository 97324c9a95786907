//! Reading single pixels out of a raw bitmap.

use crate::format::{ByteOrder, Channel, PixelFormat};

/// An 8-bit-per-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Less than half covered: drawn as a hole.
    #[inline]
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.a < 128
    }
}

/// Split a packed pixel value into channels. A missing alpha channel reads
/// as opaque, a missing color channel as zero.
#[must_use]
pub fn decode(format: &PixelFormat, raw: u32) -> Rgba {
    let channel = |c| format.mask(c).scale(raw);
    Rgba {
        r: channel(Channel::Red).unwrap_or(0),
        g: channel(Channel::Green).unwrap_or(0),
        b: channel(Channel::Blue).unwrap_or(0),
        a: channel(Channel::Alpha).unwrap_or(u8::MAX),
    }
}

/// The pixel at `(x, y)`, or `None` if it lies outside the image or the
/// bytes for it aren't in `bytes`.
#[must_use]
pub fn read_pixel(format: &PixelFormat, bytes: &[u8], x: u32, y: u32) -> Option<Rgba> {
    if x >= format.width() || y >= format.height() {
        return None;
    }
    let n = format.bytes_per_pixel();
    let offset = (y as usize)
        .checked_mul(format.stride())?
        .checked_add(x as usize * n)?;
    let packed = bytes.get(offset..offset + n)?;

    let raw = match format.byte_order() {
        ByteOrder::Big => packed.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
        ByteOrder::Little => packed.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
    };
    Some(decode(format, raw))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rgba32(width: u32, height: u32) -> PixelFormat {
        PixelFormat::new(
            32,
            width,
            height,
            width as usize * 4,
            [0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF],
        )
        .unwrap()
    }

    #[test]
    fn big_endian_rgba() {
        let f = rgba32(2, 1);
        let bytes = [0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0xFF];
        assert_eq!(read_pixel(&f, &bytes, 0, 0), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(read_pixel(&f, &bytes, 1, 0), Some(Rgba::new(0, 0, 255, 255)));
    }

    #[test]
    fn little_endian_reverses_bytes() {
        let f = rgba32(1, 1).with_byte_order(ByteOrder::Little);
        // 0xFFFF00FF stored little-endian.
        let bytes = 0xFFFF_00FFu32.to_le_bytes();
        assert_eq!(read_pixel(&f, &bytes, 0, 0), Some(Rgba::new(0xFF, 0xFF, 0x00, 0xFF)));
    }

    #[test]
    fn stride_padding_is_skipped() {
        let f = PixelFormat::new(8, 2, 2, 4, [0xE0, 0x1C, 0x03, 0]).unwrap();
        let bytes = [0x00, 0xE0, 0xAA, 0xAA, 0x1C, 0x03, 0xAA, 0xAA];
        assert_eq!(read_pixel(&f, &bytes, 1, 0), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(read_pixel(&f, &bytes, 0, 1), Some(Rgba::new(0, 255, 0, 255)));
        assert_eq!(read_pixel(&f, &bytes, 1, 1), Some(Rgba::new(0, 0, 255, 255)));
    }

    #[test]
    fn rgb565_scales_to_full_range() {
        let f = PixelFormat::new(16, 1, 1, 2, [0xF800, 0x07E0, 0x001F, 0]).unwrap();
        let px = read_pixel(&f, &0xFFFFu16.to_be_bytes(), 0, 0).unwrap();
        assert_eq!(px, Rgba::new(255, 255, 255, 255));
    }

    #[test]
    fn outside_image_is_none() {
        let f = rgba32(2, 2);
        let bytes = [0u8; 16];
        assert_eq!(read_pixel(&f, &bytes, 2, 0), None);
        assert_eq!(read_pixel(&f, &bytes, 0, 2), None);
    }

    #[test]
    fn short_slice_is_none() {
        let f = rgba32(2, 2);
        let bytes = [0xFFu8; 12];
        assert!(read_pixel(&f, &bytes, 0, 1).is_some());
        assert_eq!(read_pixel(&f, &bytes, 1, 1), None);
    }

    #[test]
    fn transparency_threshold() {
        assert!(Rgba::new(0, 0, 0, 127).is_transparent());
        assert!(!Rgba::new(0, 0, 0, 128).is_transparent());
    }
}
