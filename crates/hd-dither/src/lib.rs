//! # hd-dither: raw pixels onto a terminal canvas
//!
//! Takes a bitmap in any packed RGBA layout up to 32 bits per pixel and
//! draws it onto an [`hd_term::Canvas`] as colored cells.
//!
//! # Pipeline
//!
//! ```text
//! &[u8] + PixelFormat
//!     │
//!     ▼
//! pixel.rs:   read one packed pixel, split it with the channel masks
//!     │
//!     ▼
//! dither.rs:  sample (nearest or box filter) into the cell grid,
//!             adjust brightness / contrast / gamma,
//!             quantize to the color mode with ordered or error-diffusion
//!             dithering, pick glyphs for the charset
//!     │
//!     ▼
//! Canvas cells
//! ```
//!
//! The descriptor is validated once, in [`PixelFormat::new`]. After that the
//! converter never fails: pixels that the byte slice doesn't cover, and
//! pixels with less than half alpha, leave the canvas cell as it was.

// Pixel math is full of small integer-to-float round trips.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod dither;
pub mod format;
pub mod pixel;

pub use dither::{Algorithm, Charset, ColorMode, Dither, DitherOptions};
pub use format::{ByteOrder, Channel, FormatError, Mask, PixelFormat};
pub use pixel::{Rgba, read_pixel};
