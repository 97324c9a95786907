// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Stdin pump: a named thread that moves raw input bytes onto a channel.
//
// The display's event wait receives from the channel with a deadline, so it
// can block forever, block for a while, or only poll, and still turn a lone
// ESC into an Escape key once nothing follows it.
//
// The thread never sits in read() without knowing data is there: it polls
// with a short timeout and looks at the stop flag between polls. SIGWINCH
// interrupts poll (EINTR); that is not an error, it just goes around again.
// The channel closes when the thread exits, on stop, EOF, or a hard error.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

const CHUNK: usize = 4096;

/// How often the thread looks at the stop flag, in milliseconds.
const STOP_CHECK_MS: i32 = 50;

/// Handle to the stdin thread. Stops it on drop.
///
/// ```no_run
/// use hd_term::reader::StdinReader;
///
/// let (reader, rx) = StdinReader::spawn()?;
/// for chunk in rx.iter().take(3) {
///     eprintln!("{chunk:?}");
/// }
/// drop(reader);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct StdinReader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StdinReader {
    /// Start the thread. Every chunk on the channel is non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread can't be spawned.
    pub fn spawn() -> io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("hd-stdin".into())
            .spawn(move || pump(&tx, &flag))?;

        Ok((Self { stop, thread: Some(thread) }, rx))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the thread to exit and wait for it. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            log::warn!("stdin reader thread panicked");
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump(tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; CHUNK];
    while !stop.load(Ordering::Relaxed) {
        match next_chunk(&mut buf) {
            Ok(Some(0)) => {
                log::debug!("stdin reached end of input");
                return;
            }
            Ok(Some(n)) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("stdin read failed: {err}");
                return;
            }
        }
    }
}

/// One poll-then-read round. `Ok(None)` means nothing arrived before the
/// stop-check timeout (or the wait was interrupted).
#[cfg(unix)]
fn next_chunk(buf: &mut [u8]) -> io::Result<Option<usize>> {
    let fd = libc::STDIN_FILENO;
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    match unsafe { libc::poll(&raw mut pfd, 1, STOP_CHECK_MS) } {
        0 => return Ok(None),
        n if n < 0 => return retry_or(io::Error::last_os_error()),
        _ => {}
    }

    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        return retry_or(io::Error::last_os_error());
    }
    #[allow(clippy::cast_sign_loss)]
    Ok(Some(n as usize))
}

#[cfg(unix)]
fn retry_or(err: io::Error) -> io::Result<Option<usize>> {
    match err.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(None),
        _ => Err(err),
    }
}

/// Plain blocking read: the stop flag is only seen after the next chunk.
#[cfg(not(unix))]
fn next_chunk(buf: &mut [u8]) -> io::Result<Option<usize>> {
    use std::io::Read;

    match io::stdin().lock().read(buf) {
        Ok(n) => Ok(Some(n)),
        Err(err) if err.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(err) => Err(err),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stop_joins_and_can_repeat() {
        let (mut reader, _rx) = StdinReader::spawn().unwrap();
        reader.stop();
        assert!(!reader.is_running());
        reader.stop();
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let (reader, rx) = StdinReader::spawn().unwrap();
        drop(reader);
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn interrupted_waits_are_retried() {
        let eintr = io::Error::from(io::ErrorKind::Interrupted);
        assert!(matches!(retry_or(eintr), Ok(None)));

        let hard = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(retry_or(hard).is_err());
    }
}
