// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// The tty itself: size and TTY queries, raw mode, and the screen modes a
// display turns on.
//
// Two layers, each undone on drop:
//
//   RawMode   termios switched to raw (cfmakeraw); the original settings
//             are put back when the guard goes away.
//   Terminal  RawMode plus the alternate screen, hidden cursor, SGR mouse
//             clicks, Kitty key event reporting and a saved window title.
//
// A panic in raw mode would strand the user's shell, so the first `enter`
// installs a panic hook that writes a fixed restore sequence straight to
// fd 1 (no stdout lock: the panic may have happened mid-flush) and puts
// termios back from a global copy before running the previous hook.
//
// Unsafe is limited to the libc calls: isatty, ioctl(TIOCGWINSZ),
// tcgetattr/tcsetattr/cfmakeraw, and the raw write in the panic hook.

use std::io::{self, Write};
use std::sync::Once;
#[cfg(unix)]
use std::sync::Mutex;

use crate::ansi;

/// Kitty keyboard flags: disambiguate escape codes (1) and report event
/// types (2), so key releases arrive as their own events.
const KITTY_FLAGS: u8 = 0b11;

/// Used when the tty won't report its size.
const FALLBACK_SIZE: Size = Size { cols: 80, rows: 24 };

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// The size of the terminal on stdout. `None` if stdout isn't a terminal
/// or reports zero rows or columns.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    if unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) } != 0 {
        return None;
    }
    (ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub const fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

/// Whether stdout is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_output_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}

#[cfg(not(unix))]
#[must_use]
pub const fn is_tty() -> bool {
    false
}

#[cfg(not(unix))]
#[must_use]
pub const fn is_output_tty() -> bool {
    false
}

// ─── Raw mode ────────────────────────────────────────────────────────────────

/// The termios settings to go back to, readable from the panic hook.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Stdin in raw mode for as long as this lives.
pub struct RawMode {
    #[cfg(unix)]
    original: libc::termios,
}

impl RawMode {
    /// Switch stdin to raw mode: no echo, no line editing, no signal keys,
    /// bytes delivered one at a time.
    ///
    /// # Errors
    ///
    /// Returns the OS error if stdin's settings can't be read or changed.
    #[cfg(unix)]
    pub fn enable() -> io::Result<Self> {
        let fd = libc::STDIN_FILENO;
        let original = unsafe {
            let mut current: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut current) != 0 {
                return Err(io::Error::last_os_error());
            }
            current
        };

        let mut termios = original;
        unsafe {
            libc::cfmakeraw(&raw mut termios);
            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = Some(original);
        }
        Ok(Self { original })
    }

    /// # Errors
    ///
    /// Never fails on platforms without termios.
    #[cfg(not(unix))]
    pub const fn enable() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Put the original settings back now, reporting failure.
    ///
    /// # Errors
    ///
    /// Returns the OS error from `tcsetattr`.
    pub fn disable(self) -> io::Result<()> {
        let result = self.restore();
        std::mem::forget(self);
        result
    }

    #[cfg(unix)]
    fn restore(&self) -> io::Result<()> {
        let status =
            unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const self.original) };
        if status != 0 {
            return Err(io::Error::last_os_error());
        }
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_self)]
    const fn restore(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            log::warn!("could not restore terminal settings: {err}");
        }
    }
}

// ─── Panic hook ──────────────────────────────────────────────────────────────

/// `leave` in one write: end sync, mouse off, pop keyboard flags, reset
/// SGR, show cursor, pop the title, and leave the alternate screen last.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[<u\
    \x1b[0m\
    \x1b[?25h\
    \x1b[23;2t\
    \x1b[?1049l";

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            previous(info);
        }));
    });
}

#[cfg(unix)]
fn emergency_restore() {
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast(),
            EMERGENCY_RESTORE.len(),
        );
    }
    if let Ok(saved) = SAVED_TERMIOS.lock() {
        if let Some(original) = saved.as_ref() {
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

#[cfg(not(unix))]
fn emergency_restore() {
    let mut out = io::stdout();
    let _ = out.write_all(EMERGENCY_RESTORE);
    let _ = out.flush();
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// The tty, switched into full-screen mode between [`enter`](Self::enter)
/// and [`leave`](Self::leave).
///
/// ```no_run
/// use hd_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // draw, read input ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    size: Size,
    raw: Option<RawMode>,
}

impl Terminal {
    /// Query the size. Nothing on the terminal changes yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: get_size().unwrap_or(FALLBACK_SIZE),
            raw: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Ask the OS for the size again, keeping the old one if it won't say.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(size) = get_size() {
            self.size = size;
        }
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.raw.is_some()
    }

    /// Raw mode, alternate screen, hidden cursor, SGR mouse clicks, Kitty
    /// key events, and the window title saved. Does nothing if already
    /// entered.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or writing to stdout fails; raw mode is
    /// undone in that case.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.raw.is_some() {
            return Ok(());
        }

        install_panic_hook();
        let raw = RawMode::enable()?;

        let mut out = io::stdout().lock();
        ansi::push_title(&mut out)?;
        ansi::enter_alt_screen(&mut out)?;
        ansi::cursor_hide(&mut out)?;
        ansi::clear_screen(&mut out)?;
        ansi::enable_mouse(&mut out, ansi::MouseMode::Click)?;
        ansi::enable_kitty_keyboard(&mut out, KITTY_FLAGS)?;
        out.flush()?;

        self.raw = Some(raw);
        log::debug!("entered full-screen mode at {}x{}", self.size.cols, self.size.rows);
        Ok(())
    }

    /// Undo [`enter`](Self::enter). Does nothing if not entered.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout or restoring termios fails.
    pub fn leave(&mut self) -> io::Result<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };

        let mut out = io::stdout().lock();
        ansi::end_sync(&mut out)?;
        ansi::disable_kitty_keyboard(&mut out)?;
        ansi::disable_mouse(&mut out)?;
        ansi::reset(&mut out)?;
        ansi::cursor_show(&mut out)?;
        ansi::pop_title(&mut out)?;
        ansi::exit_alt_screen(&mut out)?;
        out.flush()?;
        drop(out);

        raw.disable()?;
        log::debug!("left full-screen mode");
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            log::warn!("could not restore terminal: {err}");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_do_not_panic() {
        let _ = get_size();
        let _ = is_tty();
        let _ = is_output_tty();
    }

    #[test]
    fn new_is_inactive_with_usable_size() {
        let term = Terminal::new();
        assert!(!term.is_active());
        assert!(term.size().cols > 0 && term.size().rows > 0);
    }

    #[test]
    fn refresh_size_matches_cached() {
        let mut term = Terminal::new();
        let size = term.refresh_size();
        assert_eq!(size, term.size());
    }

    #[test]
    fn leave_without_enter_is_noop() {
        let mut term = Terminal::new();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[cfg(unix)]
    #[test]
    fn raw_mode_needs_a_tty() {
        if is_tty() {
            return;
        }
        assert!(RawMode::enable().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn enter_fails_cleanly_without_tty() {
        if is_tty() {
            return;
        }
        let mut term = Terminal::new();
        assert!(term.enter().is_err());
        assert!(!term.is_active());
    }

    #[test]
    fn emergency_restore_mirrors_leave() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        for seq in ["\x1b[?1000l", "\x1b[?1006l", "\x1b[<u", "\x1b[23;2t", "\x1b[0m", "\x1b[?25h"] {
            assert!(s.contains(seq), "missing {seq:?}");
        }
        assert!(s.ends_with("\x1b[?1049l"));
    }
}
