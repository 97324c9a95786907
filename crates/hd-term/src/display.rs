// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// The display: a terminal in TUI mode plus a canvas to draw on.
//
// Lifecycle:
//
//   open()       raw mode, alternate screen, SIGWINCH handler, stdin reader,
//                canvas sized to the terminal
//   canvas_mut() draw cells
//   refresh()    diff the canvas against what is on screen, one write()
//   get_event()  block (or not) until an event passes the mask
//   release()    stop the reader, restore the terminal
//
// Dropping a display without releasing it restores the terminal too, so an
// early `?` in the caller never leaves the shell in raw mode.
//
// # Event wait
//
// The reader thread pushes byte chunks into a channel. `get_event` waits on
// that channel in short slices so it can also notice SIGWINCH, and so a
// lone ESC that is not followed by anything within ESCAPE_TIMEOUT becomes
// an Escape key instead of waiting forever for the rest of a sequence.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::ansi;
use crate::canvas::Canvas;
use crate::diff::{DiffRenderer, RenderStats};
use crate::input::{Event, KeyEventKind, MouseEventKind, Parser};
use crate::reader::StdinReader;
use crate::terminal::{self, Size, Terminal};

/// How long a lone ESC waits for the rest of an escape sequence.
const ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

/// Longest single channel wait, so resizes are noticed while blocked.
const WAIT_SLICE: Duration = Duration::from_millis(50);

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum DisplayError {
    /// No terminal to draw on: stdin or stdout is not a TTY.
    Unavailable,
    /// Terminal I/O failed.
    Io(io::Error),
    /// Input closed before the awaited event arrived.
    Closed,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("no terminal available (stdin and stdout must be a tty)"),
            Self::Io(err) => write!(f, "terminal i/o error: {err}"),
            Self::Closed => f.write_str("input closed"),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// ─── Event mask ──────────────────────────────────────────────────────────────

bitflags! {
    /// Which events [`Display::get_event`] returns. Everything else is
    /// consumed and dropped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u8 {
        /// Key press or auto-repeat.
        const KEY_PRESS     = 0b0000_0001;
        const KEY_RELEASE   = 0b0000_0010;
        /// Button press and scroll wheel.
        const MOUSE_PRESS   = 0b0000_0100;
        const MOUSE_RELEASE = 0b0000_1000;
        /// Drag and plain motion.
        const MOUSE_MOTION  = 0b0001_0000;
        const RESIZE        = 0b0010_0000;
        const ANY           = 0b0011_1111;
    }
}

impl EventMask {
    /// The mask bit `event` falls under.
    #[must_use]
    pub const fn of(event: &Event) -> Self {
        match event {
            Event::Key(key) => match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => Self::KEY_PRESS,
                KeyEventKind::Release => Self::KEY_RELEASE,
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Release(_) => Self::MOUSE_RELEASE,
                MouseEventKind::Drag(_) | MouseEventKind::Move => Self::MOUSE_MOTION,
                _ => Self::MOUSE_PRESS,
            },
            Event::Resize(_) => Self::RESIZE,
        }
    }

    #[inline]
    #[must_use]
    pub const fn accepts(self, event: &Event) -> bool {
        self.intersects(Self::of(event))
    }
}

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

static RESIZED: AtomicBool = AtomicBool::new(false);

/// The handler only stores to an atomic, which is async-signal-safe.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        if libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut()) != 0 {
            log::warn!("could not install SIGWINCH handler, resizes will go unnoticed");
        }
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
const fn install_sigwinch_handler() {}

// ─── Display ─────────────────────────────────────────────────────────────────

/// An open terminal display.
///
/// ```no_run
/// use hd_term::{Display, EventMask};
///
/// let mut display = Display::open()?;
/// display.set_title("demo")?;
/// display.canvas_mut().put_str(0, 0, "press a key", Default::default(), Default::default(), Default::default());
/// display.refresh()?;
/// display.get_event(EventMask::KEY_PRESS, None)?;
/// display.release()?;
/// # Ok::<(), hd_term::DisplayError>(())
/// ```
pub struct Display {
    terminal: Terminal,
    canvas: Canvas,
    renderer: DiffRenderer,
    reader: StdinReader,
    events: EventQueue,
}

impl Display {
    /// Take over the terminal.
    ///
    /// # Errors
    ///
    /// [`DisplayError::Unavailable`] if stdin or stdout is not a terminal;
    /// in that case nothing was touched. [`DisplayError::Io`] if entering
    /// TUI mode or starting the reader fails; the terminal is restored
    /// before returning.
    pub fn open() -> Result<Self, DisplayError> {
        if !terminal::is_tty() || !terminal::is_output_tty() {
            log::info!("display unavailable: not running on a terminal");
            return Err(DisplayError::Unavailable);
        }

        let mut terminal = Terminal::new();
        terminal.enter()?;
        install_sigwinch_handler();
        RESIZED.store(false, Ordering::Relaxed);

        // On failure `terminal` drops here and leaves TUI mode.
        let (reader, rx) = StdinReader::spawn()?;

        let Size { cols, rows } = terminal.size();
        log::info!("display opened at {cols}x{rows}");

        Ok(Self {
            terminal,
            canvas: Canvas::new(cols, rows),
            renderer: DiffRenderer::new(),
            reader,
            events: EventQueue::new(rx),
        })
    }

    #[inline]
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[inline]
    pub const fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    /// Set the terminal window title.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn set_title(&mut self, title: &str) -> Result<(), DisplayError> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        ansi::set_title(&mut lock, title)?;
        lock.flush()?;
        log::debug!("title set to {title:?}");
        Ok(())
    }

    /// Put the canvas on screen, sending only what changed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn refresh(&mut self) -> Result<RenderStats, DisplayError> {
        let stats = self.renderer.render(&self.canvas);
        self.renderer.flush()?;
        log::trace!(
            "refresh: {} cells drawn, {} skipped, {} bytes",
            stats.cells_rendered,
            stats.cells_skipped,
            stats.bytes_written
        );
        Ok(stats)
    }

    /// Wait for the next event accepted by `mask`.
    ///
    /// `timeout` of `None` waits forever and `Some(Duration::ZERO)` only
    /// looks at input that has already arrived. Returns `Ok(None)` when the
    /// timeout passes first.
    ///
    /// A resize is always handled, whether or not `mask` asks for it: the
    /// canvas takes the new terminal size (and is cleared) and the next
    /// refresh redraws the whole screen.
    ///
    /// # Errors
    ///
    /// [`DisplayError::Closed`] once input has ended and every event it
    /// produced has been delivered.
    pub fn get_event(
        &mut self,
        mask: EventMask,
        timeout: Option<Duration>,
    ) -> Result<Option<Event>, DisplayError> {
        let Self { terminal, canvas, renderer, events, .. } = self;
        events.wait(mask, timeout, |queue| {
            if RESIZED.swap(false, Ordering::Relaxed) {
                queue.push(apply_resize(canvas, renderer, terminal.refresh_size()));
            }
        })
    }

    /// Stop reading input and give the terminal back.
    ///
    /// # Errors
    ///
    /// Returns an error if restoring the terminal fails.
    pub fn release(mut self) -> Result<(), DisplayError> {
        self.shutdown()?;
        log::info!("display released");
        Ok(())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.reader.stop();
        self.terminal.leave()
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("restoring terminal on drop failed: {err}");
        }
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("canvas", &self.canvas)
            .field("active", &self.terminal.is_active())
            .field("queued", &self.events.len())
            .finish_non_exhaustive()
    }
}

// ─── Resize ──────────────────────────────────────────────────────────────────

/// Give the canvas the new terminal size (cleared) and make the next
/// refresh redraw everything.
fn apply_resize(canvas: &mut Canvas, renderer: &mut DiffRenderer, size: Size) -> Event {
    canvas.resize(size.cols, size.rows);
    renderer.force_redraw();
    log::debug!("resized to {}x{}", size.cols, size.rows);
    Event::Resize(size)
}

// ─── Event queue ─────────────────────────────────────────────────────────────

/// Parsed input waiting to be handed out, plus the channel it comes from.
///
/// A live display feeds it from the stdin reader; anything else that sends
/// byte chunks works the same way.
struct EventQueue {
    rx: Receiver<Vec<u8>>,
    parser: Parser,
    events: VecDeque<Event>,
    /// When the parser started holding an unfinished sequence.
    pending_since: Option<Instant>,
    closed: bool,
}

impl EventQueue {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            parser: Parser::new(),
            events: VecDeque::new(),
            pending_since: None,
            closed: false,
        }
    }

    fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    /// The loop behind [`Display::get_event`]. `on_wake` runs every time
    /// the loop comes round and may push events of its own.
    fn wait(
        &mut self,
        mask: EventMask,
        timeout: Option<Duration>,
        mut on_wake: impl FnMut(&mut Self),
    ) -> Result<Option<Event>, DisplayError> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            on_wake(self);

            while let Some(event) = self.events.pop_front() {
                if mask.accepts(&event) {
                    return Ok(Some(event));
                }
                log::trace!("event outside mask dropped: {event:?}");
            }

            if self.closed {
                return Err(DisplayError::Closed);
            }

            let now = Instant::now();
            let mut wait = deadline.map_or(WAIT_SLICE, |d| d.saturating_duration_since(now).min(WAIT_SLICE));
            if let Some(since) = self.pending_since {
                wait = wait.min((since + ESCAPE_TIMEOUT).saturating_duration_since(now));
            }

            if self.receive(wait) {
                continue;
            }

            if self.pending_since.is_some_and(|since| since.elapsed() >= ESCAPE_TIMEOUT) {
                self.events.extend(self.parser.flush());
                self.pending_since = None;
            }

            if self.events.is_empty() && deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(None);
            }
        }
    }

    /// Wait up to `wait` for one chunk of input. False on timeout.
    fn receive(&mut self, wait: Duration) -> bool {
        let chunk = if wait.is_zero() {
            match self.rx.try_recv() {
                Ok(bytes) => Ok(bytes),
                Err(TryRecvError::Empty) => Err(RecvTimeoutError::Timeout),
                Err(TryRecvError::Disconnected) => Err(RecvTimeoutError::Disconnected),
            }
        } else {
            self.rx.recv_timeout(wait)
        };

        match chunk {
            Ok(bytes) => {
                self.events.extend(self.parser.advance(&bytes));
                self.pending_since = if self.parser.has_pending() {
                    self.pending_since.or_else(|| Some(Instant::now()))
                } else {
                    None
                };
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("input closed");
                self.events.extend(self.parser.flush());
                self.pending_since = None;
                self.closed = true;
                true
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
