//! Pixel format descriptors.
//!
//! A [`PixelFormat`] says how to find pixel `(x, y)` in a byte slice and how
//! to split it into channels: bits per pixel, image size, row stride, one
//! bit mask per channel, and the byte order of a packed pixel.
//!
//! The masks must tile the pixel exactly. Every bit of a `bpp`-bit pixel
//! belongs to exactly one channel, so `0xFF000000 / 0x00FF0000 / 0x0000FF00
//! / 0x000000FF` is a valid 32-bit RGBA layout and `0xF800 / 0x07E0 /
//! 0x001F / 0` a valid 16-bit RGB565 one.

use std::fmt;

/// Byte order of a multi-byte pixel in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Most significant byte first.
    #[default]
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const ALL: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::Alpha];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Alpha => "alpha",
        })
    }
}

// ─── Mask ────────────────────────────────────────────────────────────────────

/// The bits of a packed pixel that hold one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u32);

impl Mask {
    #[inline]
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Position of the lowest set bit.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        if self.0 == 0 { 0 } else { self.0.trailing_zeros() }
    }

    /// Number of bits in the channel.
    #[inline]
    #[must_use]
    pub const fn width(self) -> u32 {
        self.0.count_ones()
    }

    /// Extract the channel from `raw` and scale it to 0..=255.
    ///
    /// `None` for an empty mask, where the channel doesn't exist.
    #[must_use]
    pub const fn scale(self, raw: u32) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let max = (self.0 >> self.shift()) as u64;
        let value = ((raw & self.0) >> self.shift()) as u64;
        Some(((value * 255 + max / 2) / max) as u8)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Only 8, 16, 24 and 32 bits per pixel are supported.
    UnsupportedDepth(u32),
    /// Two channel masks share bits.
    OverlappingMasks(Channel, Channel),
    /// The masks together don't cover exactly the pixel's bits.
    IncompleteMasks { expected: u32, found: u32 },
    ZeroSize,
    /// A row is shorter than `width` pixels.
    StrideTooSmall { stride: usize, min: usize },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDepth(bpp) => {
                write!(f, "unsupported depth {bpp} (expected 8, 16, 24 or 32 bits per pixel)")
            }
            Self::OverlappingMasks(a, b) => write!(f, "{a} and {b} masks overlap"),
            Self::IncompleteMasks { expected, found } => write!(
                f,
                "channel masks cover {found:#010x}, expected exactly {expected:#010x}"
            ),
            Self::ZeroSize => f.write_str("width and height must be non-zero"),
            Self::StrideTooSmall { stride, min } => {
                write!(f, "stride {stride} is smaller than one row ({min} bytes)")
            }
        }
    }
}

impl std::error::Error for FormatError {}

// ─── PixelFormat ─────────────────────────────────────────────────────────────

/// A validated bitmap layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    bpp: u32,
    width: u32,
    height: u32,
    stride: usize,
    masks: [Mask; 4],
    order: ByteOrder,
}

impl PixelFormat {
    /// Describe a bitmap. `masks` are red, green, blue, alpha; a zero alpha
    /// mask means every pixel is opaque. Byte order defaults to
    /// [`ByteOrder::Big`].
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] naming the first rule the layout breaks.
    ///
    /// ```
    /// use hd_dither::PixelFormat;
    ///
    /// let rgba = PixelFormat::new(32, 64, 32, 256, [0xFF00_0000, 0xFF_0000, 0xFF00, 0xFF]);
    /// assert!(rgba.is_ok());
    ///
    /// let bad = PixelFormat::new(32, 64, 32, 256, [0xFF00_0000, 0xFF00_0000, 0xFF00, 0xFF]);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(
        bpp: u32,
        width: u32,
        height: u32,
        stride: usize,
        masks: [u32; 4],
    ) -> Result<Self, FormatError> {
        if !matches!(bpp, 8 | 16 | 24 | 32) {
            return Err(FormatError::UnsupportedDepth(bpp));
        }
        if width == 0 || height == 0 {
            return Err(FormatError::ZeroSize);
        }

        for (i, a) in Channel::ALL.iter().enumerate() {
            for b in &Channel::ALL[i + 1..] {
                if masks[a.index()] & masks[b.index()] != 0 {
                    return Err(FormatError::OverlappingMasks(*a, *b));
                }
            }
        }

        let expected = u32::MAX >> (32 - bpp);
        let found = masks.iter().fold(0, |acc, m| acc | m);
        if found != expected {
            return Err(FormatError::IncompleteMasks { expected, found });
        }

        let min = width as usize * (bpp as usize / 8);
        if stride < min {
            return Err(FormatError::StrideTooSmall { stride, min });
        }

        Ok(Self {
            bpp,
            width,
            height,
            stride,
            masks: masks.map(Mask::new),
            order: ByteOrder::Big,
        })
    }

    #[must_use]
    pub const fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    #[inline]
    #[must_use]
    pub const fn bpp(&self) -> u32 {
        self.bpp
    }

    #[inline]
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> usize {
        self.bpp as usize / 8
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    #[must_use]
    pub const fn mask(&self, channel: Channel) -> Mask {
        self.masks[channel.index()]
    }

    #[inline]
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes needed to hold the whole image (the last row needs no padding).
    #[must_use]
    pub const fn required_len(&self) -> usize {
        (self.height as usize - 1) * self.stride + self.width as usize * self.bytes_per_pixel()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
