//! Dithering a bitmap onto a canvas.
//!
//! [`Dither::bitmap`] maps the image onto a rectangle of cells. Each cell
//! covers one sample of the image, or two stacked samples with the
//! [`Charset::Blocks`] charset (`▀` with the upper sample as foreground and
//! the lower one as background). Samples are then brought down to the
//! colors the terminal can show, spreading the quantization error so flat
//! areas keep their average tone.
//!
//! Holes in the image (transparent pixels, pixels the byte slice doesn't
//! reach) are never painted: whatever was on the canvas stays.

use hd_term::canvas::{Canvas, Rect};
use hd_term::cell::Cell;
use hd_term::color::CellColor;

use crate::format::PixelFormat;
use crate::pixel::{Rgba, read_pixel};

// ─── Options ─────────────────────────────────────────────────────────────────

/// How quantization error is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// Nearest color, no dithering.
    None,
    /// 4×4 Bayer matrix.
    Ordered4,
    /// Floyd–Steinberg error diffusion.
    #[default]
    FloydSteinberg,
}

/// Which glyphs the cells are drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// Upper half blocks, two pixels per cell.
    #[default]
    Blocks,
    /// `░▒▓█` density ramp.
    Shades,
    /// Printable ASCII density ramp.
    Ascii,
}

const SHADES: &[char] = &[' ', '░', '▒', '▓', '█'];
const ASCII: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

impl Charset {
    const fn samples_per_cell(self) -> u32 {
        match self {
            Self::Blocks => 2,
            Self::Shades | Self::Ascii => 1,
        }
    }

    const fn ramp(self) -> &'static [char] {
        match self {
            Self::Blocks | Self::Shades => SHADES,
            Self::Ascii => ASCII,
        }
    }
}

/// The colors the output is limited to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMode {
    /// 24-bit RGB.
    #[default]
    TrueColor,
    /// xterm 256-color palette.
    Ansi256,
    /// The 16 basic colors.
    Ansi16,
    /// Black and white.
    Mono,
}

impl ColorMode {
    /// Rough distance between neighboring palette colors, on a 0..1 scale.
    /// Ordered dithering perturbs by up to half of this.
    const fn spread(self) -> f32 {
        match self {
            Self::TrueColor => 0.0,
            Self::Ansi256 => 0.2,
            Self::Ansi16 => 0.5,
            Self::Mono => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherOptions {
    pub algorithm: Algorithm,
    pub charset: Charset,
    pub color_mode: ColorMode,
    /// Average every pixel a sample covers instead of taking the middle one.
    pub antialias: bool,
    /// Multiplier, 1.0 leaves the image alone.
    pub brightness: f32,
    /// Stretch around mid-gray, 1.0 leaves the image alone.
    pub contrast: f32,
    /// Output is `input^(1/gamma)`; above 1.0 lightens midtones.
    pub gamma: f32,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            charset: Charset::default(),
            color_mode: ColorMode::default(),
            antialias: true,
            brightness: 1.0,
            contrast: 1.0,
            gamma: 1.0,
        }
    }
}

// ─── Dither ──────────────────────────────────────────────────────────────────

/// A bitmap converter bound to one pixel format.
///
/// ```
/// use hd_dither::{Dither, PixelFormat};
/// use hd_term::Canvas;
///
/// let format = PixelFormat::new(32, 1, 2, 4, [0xFF00_0000, 0xFF_0000, 0xFF00, 0xFF])?;
/// let pixels = [0xFF, 0, 0, 0xFF, 0, 0, 0xFF, 0xFF]; // red over blue
///
/// let mut canvas = Canvas::new(1, 1);
/// let painted = Dither::new(format).bitmap(&mut canvas, 0, 0, 1, 1, &pixels);
/// assert_eq!(painted, 1);
/// assert_eq!(canvas.get(0, 0).unwrap().character(), Some('▀'));
/// # Ok::<(), hd_dither::FormatError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dither {
    format: PixelFormat,
    options: DitherOptions,
}

/// A quantized sample: the color to draw and the luma it stands for.
type Quantized = Option<(CellColor, f32)>;

impl Dither {
    #[must_use]
    pub fn new(format: PixelFormat) -> Self {
        Self::with_options(format, DitherOptions::default())
    }

    #[must_use]
    pub const fn with_options(format: PixelFormat, options: DitherOptions) -> Self {
        Self { format, options }
    }

    #[inline]
    #[must_use]
    pub const fn format(&self) -> &PixelFormat {
        &self.format
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &DitherOptions {
        &self.options
    }

    pub const fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.options.algorithm = algorithm;
    }

    pub const fn set_charset(&mut self, charset: Charset) {
        self.options.charset = charset;
    }

    pub const fn set_color_mode(&mut self, mode: ColorMode) {
        self.options.color_mode = mode;
    }

    pub const fn set_antialias(&mut self, on: bool) {
        self.options.antialias = on;
    }

    /// Non-finite or negative values are ignored.
    pub fn set_brightness(&mut self, brightness: f32) {
        if brightness.is_finite() && brightness >= 0.0 {
            self.options.brightness = brightness;
        } else {
            log::warn!("ignoring brightness {brightness}");
        }
    }

    /// Non-finite or negative values are ignored.
    pub fn set_contrast(&mut self, contrast: f32) {
        if contrast.is_finite() && contrast >= 0.0 {
            self.options.contrast = contrast;
        } else {
            log::warn!("ignoring contrast {contrast}");
        }
    }

    /// Must be finite and positive; anything else is ignored.
    pub fn set_gamma(&mut self, gamma: f32) {
        if gamma.is_finite() && gamma > 0.0 {
            self.options.gamma = gamma;
        } else {
            log::warn!("ignoring gamma {gamma}");
        }
    }

    /// Draw `pixels` scaled into the `w`×`h` cell rectangle at `(x, y)`.
    ///
    /// The rectangle may hang off the canvas; only the visible part is
    /// drawn, with the same scaling as if it all fit. Returns the number of
    /// cells painted.
    pub fn bitmap(&self, canvas: &mut Canvas, x: i32, y: i32, w: u16, h: u16, pixels: &[u8]) -> usize {
        let target = Rect::new(x, y, w, h);
        let Some(clip) = target.intersect(canvas.bounds()) else {
            return 0;
        };

        let needed = self.format.required_len();
        if pixels.len() < needed {
            log::warn!(
                "bitmap is {} bytes but its format addresses {needed}; missing pixels are left blank",
                pixels.len()
            );
        }

        let per_cell = self.options.charset.samples_per_cell();
        let grid = Grid {
            full_w: u32::from(w),
            full_h: u32::from(h) * per_cell,
            col0: (clip.x - target.x) as u32,
            row0: (clip.y - target.y) as u32 * per_cell,
            cols: usize::from(clip.width),
            rows: usize::from(clip.height) * per_cell as usize,
        };

        let mut samples = Vec::with_capacity(grid.cols * grid.rows);
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                samples.push(self.sample(pixels, &grid, col, row));
            }
        }

        let quantized = self.quantize(samples, grid.cols);
        let painted = self.paint(canvas, clip, &quantized);
        log::debug!(
            "dithered {}x{} bitmap into {}x{} cells at ({x}, {y}), {painted} painted",
            self.format.width(),
            self.format.height(),
            w,
            h
        );
        painted
    }

    // ── Sampling ────────────────────────────────────────────────────────

    /// The adjusted color of one grid sample, `None` for a hole.
    fn sample(&self, pixels: &[u8], grid: &Grid, col: usize, row: usize) -> Option<[f32; 3]> {
        let (x0, x1) = span(grid.col0 + col as u32, grid.full_w, self.format.width());
        let (y0, y1) = span(grid.row0 + row as u32, grid.full_h, self.format.height());

        let color = if self.options.antialias {
            let mut sum = [0.0f32; 3];
            let mut opaque = 0u32;
            let mut total = 0u32;
            for py in y0..y1 {
                for px in x0..x1 {
                    total += 1;
                    if let Some(p) = read_pixel(&self.format, pixels, px, py).filter(|p| !p.is_transparent()) {
                        opaque += 1;
                        for (acc, c) in sum.iter_mut().zip([p.r, p.g, p.b]) {
                            *acc += f32::from(c) / 255.0;
                        }
                    }
                }
            }
            // Mostly holes: the sample is a hole.
            if opaque == 0 || opaque * 2 < total {
                return None;
            }
            sum.map(|c| c / opaque as f32)
        } else {
            let p = read_pixel(&self.format, pixels, (x0 + x1 - 1) / 2, (y0 + y1 - 1) / 2)?;
            if p.is_transparent() {
                return None;
            }
            unit(p)
        };

        Some(color.map(|c| self.adjust(c)))
    }

    fn adjust(&self, v: f32) -> f32 {
        let DitherOptions {
            brightness,
            contrast,
            gamma,
            ..
        } = self.options;
        let v = ((v * brightness - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
        if (gamma - 1.0).abs() < f32::EPSILON {
            v
        } else {
            v.powf(gamma.recip())
        }
    }

    // ── Quantization ────────────────────────────────────────────────────

    fn quantize(&self, mut samples: Vec<Option<[f32; 3]>>, cols: usize) -> Vec<Quantized> {
        let mode = self.options.color_mode;
        let mut out = Vec::with_capacity(samples.len());

        for i in 0..samples.len() {
            let Some(wanted) = samples[i] else {
                out.push(None);
                continue;
            };
            let (col, row) = (i % cols, i / cols);

            let wanted = match self.options.algorithm {
                Algorithm::Ordered4 => {
                    let offset = (BAYER4[row % 4][col % 4] + 0.5) / 16.0 - 0.5;
                    wanted.map(|c| (c + offset * mode.spread()).clamp(0.0, 1.0))
                }
                Algorithm::None | Algorithm::FloydSteinberg => wanted.map(|c| c.clamp(0.0, 1.0)),
            };

            let (color, got) = nearest(mode, wanted);
            out.push(Some((color, luma(wanted))));

            if self.options.algorithm == Algorithm::FloydSteinberg {
                let error = [wanted[0] - got[0], wanted[1] - got[1], wanted[2] - got[2]];
                let last_col = col + 1 == cols;
                let mut push = |index: usize, weight: f32| {
                    if let Some(Some(target)) = samples.get_mut(index) {
                        for (t, e) in target.iter_mut().zip(error) {
                            *t += e * weight;
                        }
                    }
                };
                if !last_col {
                    push(i + 1, 7.0 / 16.0);
                }
                if col > 0 {
                    push(i + cols - 1, 3.0 / 16.0);
                }
                push(i + cols, 5.0 / 16.0);
                if !last_col {
                    push(i + cols + 1, 1.0 / 16.0);
                }
            }
        }
        out
    }

    // ── Painting ────────────────────────────────────────────────────────

    fn paint(&self, canvas: &mut Canvas, clip: Rect, quantized: &[Quantized]) -> usize {
        let cols = usize::from(clip.width);
        let charset = self.options.charset;
        let per_cell = charset.samples_per_cell() as usize;
        let mut painted = 0;

        for cy in 0..clip.height {
            for cx in 0..clip.width {
                let (x, y) = ((clip.x + i32::from(cx)) as u16, (clip.y + i32::from(cy)) as u16);
                let base = usize::from(cy) * per_cell * cols + usize::from(cx);
                let behind = canvas.get(x, y).map_or(CellColor::Default, |c| c.bg);

                let cell = if charset == Charset::Blocks {
                    match (quantized[base], quantized[base + cols]) {
                        (Some((top, _)), Some((bottom, _))) => Cell::colored('▀', top, bottom),
                        (Some((top, _)), None) => Cell::colored('▀', top, behind),
                        (None, Some((bottom, _))) => Cell::colored('▄', bottom, behind),
                        (None, None) => continue,
                    }
                } else {
                    let Some((color, level)) = quantized[base] else {
                        continue;
                    };
                    let ramp = charset.ramp();
                    let step = (level * (ramp.len() - 1) as f32).round() as usize;
                    Cell::colored(ramp[step.min(ramp.len() - 1)], color, behind)
                };

                if canvas.set(x, y, cell) {
                    painted += 1;
                }
            }
        }
        painted
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Which part of the image the visible grid covers.
struct Grid {
    /// Grid size if the whole target rectangle were visible.
    full_w: u32,
    full_h: u32,
    /// First visible grid column and row.
    col0: u32,
    row0: u32,
    /// Visible grid size.
    cols: usize,
    rows: usize,
}

const BAYER4: [[f32; 4]; 4] = [
    [0.0, 8.0, 2.0, 10.0],
    [12.0, 4.0, 14.0, 6.0],
    [3.0, 11.0, 1.0, 9.0],
    [15.0, 7.0, 13.0, 5.0],
];

/// Image pixels `[start, end)` under grid cell `i` of `cells`. Never empty.
fn span(i: u32, cells: u32, pixels: u32) -> (u32, u32) {
    let start = (u64::from(i) * u64::from(pixels) / u64::from(cells)) as u32;
    let end = (u64::from(i + 1) * u64::from(pixels) / u64::from(cells)) as u32;
    (start, end.max(start + 1))
}

fn unit(p: Rgba) -> [f32; 3] {
    [p.r, p.g, p.b].map(|c| f32::from(c) / 255.0)
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn luma([r, g, b]: [f32; 3]) -> f32 {
    0.114f32.mul_add(b, 0.299f32.mul_add(r, 0.587 * g))
}

fn from_rgb8((r, g, b): (u8, u8, u8)) -> [f32; 3] {
    [r, g, b].map(|c| f32::from(c) / 255.0)
}

/// The closest color `mode` can show, and its exact value.
fn nearest(mode: ColorMode, rgb: [f32; 3]) -> (CellColor, [f32; 3]) {
    let [r, g, b] = rgb.map(to_u8);
    let exact = CellColor::Rgb(r, g, b);
    let color = match mode {
        ColorMode::TrueColor => exact,
        ColorMode::Ansi256 => exact.to_ansi256(),
        ColorMode::Ansi16 => exact.to_ansi16(),
        ColorMode::Mono if luma(rgb) >= 0.5 => CellColor::Ansi256(15),
        ColorMode::Mono => CellColor::Ansi256(0),
    };
    (color, color.to_rgb8().map_or([0.0; 3], from_rgb8))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
