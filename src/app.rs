// SPDX-License-Identifier: MIT
//
// The demo run, in order:
//
//   build pattern → open display → title → dither onto the whole canvas
//   → refresh → wait for one key press → release
//
// The display sits behind the `Surface` trait so the sequence can be
// checked without a terminal. Once a surface is open it is released exactly
// once, whether the steps after it succeed or not.

use std::time::Duration;

use anyhow::Context;
use hd_dither::Dither;
use hd_term::canvas::Canvas;
use hd_term::input::Event;
use hd_term::{Display, DisplayError, EventMask};

use crate::config::DemoConfig;
use crate::pattern::{self, PixelBuffer};

/// What the demo needs from a display.
pub trait Surface: Sized {
    fn canvas_mut(&mut self) -> &mut Canvas;

    /// # Errors
    ///
    /// Returns an error if the title can't be written.
    fn set_title(&mut self, title: &str) -> Result<(), DisplayError>;

    /// # Errors
    ///
    /// Returns an error if output fails.
    fn refresh(&mut self) -> Result<(), DisplayError>;

    /// # Errors
    ///
    /// Returns an error if input fails or ends.
    fn wait_event(
        &mut self,
        mask: EventMask,
        timeout: Option<Duration>,
    ) -> Result<Option<Event>, DisplayError>;

    /// # Errors
    ///
    /// Returns an error if the terminal can't be restored.
    fn release(self) -> Result<(), DisplayError>;
}

impl Surface for Display {
    fn canvas_mut(&mut self) -> &mut Canvas {
        Self::canvas_mut(self)
    }

    fn set_title(&mut self, title: &str) -> Result<(), DisplayError> {
        Self::set_title(self, title)
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        Self::refresh(self).map(|_| ())
    }

    fn wait_event(
        &mut self,
        mask: EventMask,
        timeout: Option<Duration>,
    ) -> Result<Option<Event>, DisplayError> {
        self.get_event(mask, timeout)
    }

    fn release(self) -> Result<(), DisplayError> {
        Self::release(self)
    }
}

/// Run the demo on the surface `open` produces.
///
/// # Errors
///
/// Fails if the surface can't be opened (nothing else happens then), or if
/// any later step fails (the surface is released first).
pub fn run<S: Surface>(
    open: impl FnOnce() -> Result<S, DisplayError>,
    config: &DemoConfig,
) -> anyhow::Result<()> {
    let mut buffer = PixelBuffer::new();
    pattern::build(&mut buffer);

    let mut surface = open().context("could not open display")?;
    let shown = show(&mut surface, config, &buffer);
    let released = surface.release().context("could not release display");

    // The first failure is the interesting one.
    shown.and(released)
}

fn show<S: Surface>(surface: &mut S, config: &DemoConfig, buffer: &PixelBuffer) -> anyhow::Result<()> {
    surface.set_title(&config.title).context("could not set title")?;

    let format = config.format.build().context("invalid pixel format")?;
    let dither = Dither::with_options(format, config.dither);
    let bytes = buffer.to_bytes(config.format.byte_order);

    let canvas = surface.canvas_mut();
    let (w, h) = (canvas.width(), canvas.height());
    let painted = dither.bitmap(canvas, 0, 0, w, h, &bytes);
    log::info!("drew {}x{} pattern onto {w}x{h} canvas ({painted} cells)", pattern::WIDTH, pattern::HEIGHT);

    surface.refresh().context("could not refresh display")?;

    match surface
        .wait_event(EventMask::KEY_PRESS, config.wait_timeout)
        .context("waiting for a key press")?
    {
        Some(event) => log::info!("got {event:?}"),
        None => log::info!("no key pressed before timeout"),
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
