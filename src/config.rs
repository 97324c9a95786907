// SPDX-License-Identifier: MIT
//
// Demo settings. Compiled in; there are no flags or config files.

use std::time::Duration;

use hd_dither::{ByteOrder, DitherOptions, FormatError, PixelFormat};

use crate::pattern;

/// The bitmap layout handed to the converter, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatConfig {
    pub bpp: u32,
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    /// Red, green, blue, alpha.
    pub masks: [u32; 4],
    pub byte_order: ByteOrder,
}

impl FormatConfig {
    /// # Errors
    ///
    /// Returns the validation error if the layout is inconsistent.
    pub fn build(&self) -> Result<PixelFormat, FormatError> {
        Ok(
            PixelFormat::new(self.bpp, self.width, self.height, self.stride, self.masks)?
                .with_byte_order(self.byte_order),
        )
    }
}

impl Default for FormatConfig {
    /// 32-bit RGBA covering the whole 64×32 buffer: the dither arguments
    /// (32, 64, 32, 4·64) read as bpp, width, height, stride.
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            bpp: 32,
            width: pattern::WIDTH as u32,
            height: pattern::HEIGHT as u32,
            stride: 4 * pattern::WIDTH,
            masks: [0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF],
            byte_order: ByteOrder::Big,
        }
    }
}

/// Everything the demo run needs to know.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub title: String,
    pub format: FormatConfig,
    pub dither: DitherOptions,
    /// How long to wait for a key. `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "Hello!".into(),
            format: FormatConfig::default(),
            dither: DitherOptions::default(),
            wait_timeout: None,
        }
    }
}
