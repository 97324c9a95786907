// SPDX-License-Identifier: MIT
//
// hd-term: Terminal display surface for hello-dither.
//
// Owns everything between "a grid of colored cells" and "bytes on the
// terminal": raw mode and the alternate screen, a cell canvas, stateful
// ANSI output with a differential renderer, a background stdin reader,
// and an input parser that turns raw bytes into key, mouse, and resize
// events.
//
// No TUI framework underneath. Direct termios control and hand-written
// escape sequences, so the display can be opened, drawn, waited on, and
// released with every byte accounted for.

pub mod ansi;
pub mod canvas;
pub mod cell;
pub mod color;
pub mod diff;
pub mod display;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;

pub use canvas::Canvas;
pub use display::{Display, DisplayError, EventMask};
pub use input::Event;
