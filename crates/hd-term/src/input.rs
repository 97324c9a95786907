// SPDX-License-Identifier: MIT
//
// Input decoding.
//
// Raw stdin chunks become `Event`s. The protocols understood are the ones
// `Terminal::enter` turns on, plus the legacy encodings every terminal
// falls back to:
//
// - printable ASCII, UTF-8, and C0 control bytes (Ctrl+letter)
// - ESC-prefixed keys (Alt+key)
// - CSI cursor and function keys, with xterm modifier parameters
// - SS3 cursor and F1-F4 keys
// - Kitty `CSI u` keys, including repeat and release
// - SGR mouse reports
//
// A sequence may be split across reads, so unfinished bytes stay pending
// until the next `advance`. A lone ESC is indistinguishable from the start
// of a sequence; the display calls `flush` once its escape timeout passes.

use bitflags::bitflags;

use crate::terminal::Size;

// ─── Events ──────────────────────────────────────────────────────────────────

/// Something the user (or the terminal) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The terminal changed size. Produced by the display, never by
    /// [`Parser`].
    Resize(Size),
}

impl Event {
    /// True for key events of kind [`KeyEventKind::Press`] or `Repeat`.
    #[must_use]
    pub const fn is_key_press(&self) -> bool {
        matches!(
            self,
            Self::Key(KeyEvent {
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            kind: KeyEventKind::Press,
        }
    }
}

/// Legacy encodings only report presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Modifier keys, in xterm parameter bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

/// A mouse report. Coordinates are 0-based cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    Drag(MouseButton),
    Move,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Upper bound on a CSI sequence we are willing to wait for. Anything
/// longer is garbage and gets dropped.
const MAX_CSI_LEN: usize = 64;

/// Incremental byte-to-event decoder.
///
/// ```
/// use hd_term::input::{Event, KeyCode, Parser};
///
/// let mut parser = Parser::new();
/// let events = parser.advance(b"q\x1b[A");
/// assert_eq!(events.len(), 2);
/// assert!(matches!(events[1], Event::Key(k) if k.code == KeyCode::Up));
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    pending: Vec<u8>,
}

enum Step {
    Emit(Event, usize),
    Skip(usize),
    Incomplete,
}

impl Parser {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feed bytes and collect every event they complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.pending.extend_from_slice(data);

        let mut events = Vec::new();
        let mut pos = 0;
        while pos < self.pending.len() {
            match step(&self.pending[pos..]) {
                Step::Emit(event, used) => {
                    events.push(event);
                    pos += used;
                }
                Step::Skip(used) => {
                    log::trace!("skipping {used} unrecognized input byte(s)");
                    pos += used;
                }
                Step::Incomplete => break,
            }
        }
        self.pending.drain(..pos);
        events
    }

    /// Bytes are waiting for the rest of a sequence.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Give up on the pending sequence. A leading ESC becomes an Escape
    /// key and whatever follows is decoded as ordinary keys.
    pub fn flush(&mut self) -> Vec<Event> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.pending);
        let mut events = Vec::new();
        let tail = if rest[0] == 0x1B {
            events.push(key(KeyCode::Escape, Modifiers::empty()));
            &rest[1..]
        } else {
            &rest[..]
        };
        for &b in tail {
            // Whatever is still unfinished here is a broken sequence.
            if let Step::Emit(event, _) = step(&[b]) {
                events.push(event);
            }
        }
        events
    }
}

fn step(buf: &[u8]) -> Step {
    match buf[0] {
        0x1B => escape(buf),
        _ => plain(buf),
    }
}

const fn key(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent::new(code, modifiers))
}

// ─── Plain bytes ─────────────────────────────────────────────────────────────

fn plain(buf: &[u8]) -> Step {
    let none = Modifiers::empty();
    match buf[0] {
        b'\r' | b'\n' => Step::Emit(key(KeyCode::Enter, none), 1),
        b'\t' => Step::Emit(key(KeyCode::Tab, none), 1),
        0x08 | 0x7F => Step::Emit(key(KeyCode::Backspace, none), 1),
        0x00 => Step::Emit(key(KeyCode::Char(' '), Modifiers::CTRL), 1),
        b @ 0x01..=0x1A => Step::Emit(
            key(KeyCode::Char(char::from(b'a' + b - 1)), Modifiers::CTRL),
            1,
        ),
        b @ 0x1C..=0x1F => Step::Emit(
            key(KeyCode::Char(char::from(b + 0x40)), Modifiers::CTRL),
            1,
        ),
        b @ 0x20..=0x7E => Step::Emit(key(KeyCode::Char(char::from(b)), none), 1),
        lead => utf8(buf, lead),
    }
}

fn utf8(buf: &[u8], lead: u8) -> Step {
    let len = match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Step::Skip(1),
    };
    if buf.len() < len {
        // A non-continuation byte already in the buffer means the
        // sequence can never complete.
        if buf[1..].iter().any(|&b| b & 0xC0 != 0x80) {
            return Step::Skip(1);
        }
        return Step::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => Step::Emit(key(KeyCode::Char(ch), Modifiers::empty()), len),
        None => Step::Skip(1),
    }
}

// ─── Escape sequences ────────────────────────────────────────────────────────

fn escape(buf: &[u8]) -> Step {
    let Some(&next) = buf.get(1) else {
        return Step::Incomplete;
    };
    match next {
        b'[' => csi(buf),
        b'O' => ss3(buf),
        0x1B => Step::Emit(key(KeyCode::Escape, Modifiers::ALT), 2),
        _ => match plain(&buf[1..]) {
            Step::Emit(Event::Key(mut k), used) => {
                k.modifiers |= Modifiers::ALT;
                Step::Emit(Event::Key(k), used + 1)
            }
            Step::Incomplete => Step::Incomplete,
            // ESC followed by junk: report the ESC, let the junk be skipped.
            _ => Step::Emit(key(KeyCode::Escape, Modifiers::empty()), 1),
        },
    }
}

fn ss3(buf: &[u8]) -> Step {
    let Some(&fin) = buf.get(2) else {
        return Step::Incomplete;
    };
    match cursor_key(fin) {
        Some(code) => Step::Emit(key(code, Modifiers::empty()), 3),
        None => Step::Skip(3),
    }
}

/// Keys whose legacy encoding is a single final byte.
const fn cursor_key(fin: u8) -> Option<KeyCode> {
    Some(match fin {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return None,
    })
}

fn csi(buf: &[u8]) -> Step {
    // Parameter and intermediate bytes are 0x20..=0x3F; the final byte
    // is 0x40..=0x7E.
    let body_start = 2;
    let mut end = body_start;
    loop {
        let Some(&b) = buf.get(end) else {
            return if end >= MAX_CSI_LEN {
                Step::Skip(end)
            } else {
                Step::Incomplete
            };
        };
        match b {
            0x40..=0x7E => break,
            0x20..=0x3F => end += 1,
            _ => return Step::Skip(end),
        }
    }

    let body = &buf[body_start..end];
    let fin = buf[end];
    let used = end + 1;

    if body.first() == Some(&b'<') && matches!(fin, b'M' | b'm') {
        return sgr_mouse(&body[1..], fin == b'm', used);
    }

    let mut params = body.split(|&b| b == b';');
    let first = params.next().unwrap_or_default();
    let (mods, kind) = params.next().map_or((Modifiers::empty(), KeyEventKind::Press), modifier_param);

    let code = match fin {
        b'~' => tilde_key(number(first)),
        b'u' => Some(kitty_key(number(first))),
        b'Z' => {
            return Step::Emit(key(KeyCode::Tab, Modifiers::SHIFT), used);
        }
        _ => cursor_key(fin),
    };

    match code {
        Some(code) => Step::Emit(
            Event::Key(KeyEvent {
                code,
                modifiers: mods,
                kind,
            }),
            used,
        ),
        // Focus reports, device attributes and the like.
        None => Step::Skip(used),
    }
}

fn tilde_key(n: u32) -> Option<KeyCode> {
    Some(match n {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11..=15 => KeyCode::F(u8::try_from(n - 10).ok()?),
        17..=21 => KeyCode::F(u8::try_from(n - 11).ok()?),
        23 | 24 => KeyCode::F(u8::try_from(n - 12).ok()?),
        _ => return None,
    })
}

fn kitty_key(cp: u32) -> KeyCode {
    match cp {
        13 => KeyCode::Enter,
        9 => KeyCode::Tab,
        27 => KeyCode::Escape,
        8 | 127 => KeyCode::Backspace,
        _ => char::from_u32(cp).map_or(KeyCode::Char('\u{fffd}'), KeyCode::Char),
    }
}

/// `mods[:event]` where `mods` is 1 + modifier bits.
fn modifier_param(param: &[u8]) -> (Modifiers, KeyEventKind) {
    let mut parts = param.split(|&b| b == b':');
    let mods = number(parts.next().unwrap_or_default()).saturating_sub(1);
    let kind = match parts.next().map(number) {
        Some(2) => KeyEventKind::Repeat,
        Some(3) => KeyEventKind::Release,
        _ => KeyEventKind::Press,
    };
    #[allow(clippy::cast_possible_truncation)] // Masked to the low byte.
    let bits = (mods & 0xFF) as u8;
    (Modifiers::from_bits_truncate(bits), kind)
}

/// Decimal digits up to the first non-digit. Empty means 0.
fn number(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u32, |acc, &b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
}

// ─── SGR mouse ───────────────────────────────────────────────────────────────

fn sgr_mouse(body: &[u8], release: bool, used: usize) -> Step {
    let mut fields = body.split(|&b| b == b';').map(number);
    let (Some(cb), Some(cx), Some(cy)) = (fields.next(), fields.next(), fields.next()) else {
        return Step::Skip(used);
    };

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let button = match cb & 3 {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    };

    let kind = if cb & 64 != 0 {
        match cb & 3 {
            0 => MouseEventKind::ScrollUp,
            1 => MouseEventKind::ScrollDown,
            2 => MouseEventKind::ScrollLeft,
            _ => MouseEventKind::ScrollRight,
        }
    } else if cb & 32 != 0 {
        button.map_or(MouseEventKind::Move, MouseEventKind::Drag)
    } else {
        // Release of "no button" still means the left one on some terminals.
        let button = button.unwrap_or(MouseButton::Left);
        if release {
            MouseEventKind::Release(button)
        } else {
            MouseEventKind::Press(button)
        }
    };

    let coord = |v: u32| u16::try_from(v.saturating_sub(1)).unwrap_or(u16::MAX);
    Step::Emit(
        Event::Mouse(MouseEvent {
            kind,
            x: coord(cx),
            y: coord(cy),
            modifiers,
        }),
        used,
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &[u8]) -> Vec<Event> {
        Parser::new().advance(data)
    }

    fn k(code: KeyCode) -> Event {
        key(code, Modifiers::empty())
    }

    fn km(code: KeyCode, modifiers: Modifiers) -> Event {
        key(code, modifiers)
    }

    // ── Plain bytes ─────────────────────────────────────────────────────

    #[test]
    fn ascii_keys() {
        assert_eq!(
            parse(b"q1 "),
            vec![
                k(KeyCode::Char('q')),
                k(KeyCode::Char('1')),
                k(KeyCode::Char(' '))
            ]
        );
    }

    #[test]
    fn control_bytes() {
        assert_eq!(
            parse(b"\r\t\x7f\x03"),
            vec![
                k(KeyCode::Enter),
                k(KeyCode::Tab),
                k(KeyCode::Backspace),
                km(KeyCode::Char('c'), Modifiers::CTRL),
            ]
        );
    }

    #[test]
    fn utf8_char() {
        assert_eq!(parse("é▀".as_bytes()), vec![k(KeyCode::Char('é')), k(KeyCode::Char('▀'))]);
    }

    #[test]
    fn utf8_split_across_reads() {
        let mut p = Parser::new();
        let bytes = "▀".as_bytes();
        assert!(p.advance(&bytes[..1]).is_empty());
        assert!(p.has_pending());
        assert_eq!(p.advance(&bytes[1..]), vec![k(KeyCode::Char('▀'))]);
        assert!(!p.has_pending());
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(parse(b"\xffa"), vec![k(KeyCode::Char('a'))]);
        assert_eq!(parse(b"\xe2a"), vec![k(KeyCode::Char('a'))]);
    }

    // ── Escape handling ─────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_then_flushes() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(p.flush(), vec![k(KeyCode::Escape)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn flush_on_empty_is_empty() {
        assert!(Parser::new().flush().is_empty());
    }

    #[test]
    fn flush_unfinished_csi() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1;").is_empty());
        assert_eq!(
            p.flush(),
            vec![
                k(KeyCode::Escape),
                k(KeyCode::Char('[')),
                k(KeyCode::Char('1')),
                k(KeyCode::Char(';')),
            ]
        );
    }

    #[test]
    fn alt_keys() {
        assert_eq!(parse(b"\x1bx"), vec![km(KeyCode::Char('x'), Modifiers::ALT)]);
        assert_eq!(
            parse(b"\x1b\x01"),
            vec![km(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)]
        );
        assert_eq!(parse(b"\x1b\x1b"), vec![km(KeyCode::Escape, Modifiers::ALT)]);
    }

    // ── CSI / SS3 ───────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(
            parse(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![
                k(KeyCode::Up),
                k(KeyCode::Down),
                k(KeyCode::Right),
                k(KeyCode::Left)
            ]
        );
    }

    #[test]
    fn modified_arrow() {
        assert_eq!(
            parse(b"\x1b[1;5C"),
            vec![km(KeyCode::Right, Modifiers::CTRL)]
        );
        assert_eq!(
            parse(b"\x1b[1;4A"),
            vec![km(KeyCode::Up, Modifiers::SHIFT | Modifiers::ALT)]
        );
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(
            parse(b"\x1b[3~\x1b[5~\x1b[15~\x1b[24~"),
            vec![
                k(KeyCode::Delete),
                k(KeyCode::PageUp),
                k(KeyCode::F(5)),
                k(KeyCode::F(12))
            ]
        );
    }

    #[test]
    fn ss3_function_keys() {
        assert_eq!(
            parse(b"\x1bOP\x1bOS\x1bOH"),
            vec![k(KeyCode::F(1)), k(KeyCode::F(4)), k(KeyCode::Home)]
        );
    }

    #[test]
    fn back_tab() {
        assert_eq!(parse(b"\x1b[Z"), vec![km(KeyCode::Tab, Modifiers::SHIFT)]);
    }

    #[test]
    fn focus_reports_are_skipped() {
        assert_eq!(parse(b"\x1b[I\x1b[Oz"), vec![k(KeyCode::Char('z'))]);
    }

    #[test]
    fn csi_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1;").is_empty());
        assert_eq!(p.advance(b"2B"), vec![km(KeyCode::Down, Modifiers::SHIFT)]);
    }

    #[test]
    fn runaway_csi_is_dropped() {
        let mut data = b"\x1b[".to_vec();
        data.extend(std::iter::repeat_n(b'1', MAX_CSI_LEN));
        let mut p = Parser::new();
        assert!(p.advance(&data).iter().all(|e| matches!(e, Event::Key(_))));
        assert_eq!(p.advance(b"x").last(), Some(&k(KeyCode::Char('x'))));
    }

    // ── Kitty ───────────────────────────────────────────────────────────

    #[test]
    fn kitty_press_and_release() {
        assert_eq!(parse(b"\x1b[97u"), vec![k(KeyCode::Char('a'))]);
        assert_eq!(
            parse(b"\x1b[97;5:3u"),
            vec![Event::Key(KeyEvent {
                code: KeyCode::Char('a'),
                modifiers: Modifiers::CTRL,
                kind: KeyEventKind::Release,
            })]
        );
    }

    #[test]
    fn kitty_functional_codepoints() {
        assert_eq!(
            parse(b"\x1b[27u\x1b[13u"),
            vec![k(KeyCode::Escape), k(KeyCode::Enter)]
        );
    }

    #[test]
    fn kitty_repeat_counts_as_press() {
        let events = parse(b"\x1b[120;1:2u");
        assert!(events[0].is_key_press());
        let events = parse(b"\x1b[120;1:3u");
        assert!(!events[0].is_key_press());
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    #[test]
    fn sgr_press_and_release() {
        assert_eq!(
            parse(b"\x1b[<0;10;5M\x1b[<0;10;5m"),
            vec![
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Press(MouseButton::Left),
                    x: 9,
                    y: 4,
                    modifiers: Modifiers::empty(),
                }),
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Release(MouseButton::Left),
                    x: 9,
                    y: 4,
                    modifiers: Modifiers::empty(),
                }),
            ]
        );
    }

    #[test]
    fn sgr_scroll_drag_and_modifiers() {
        let events = parse(b"\x1b[<65;1;1M\x1b[<34;3;3M\x1b[<16;1;1M");
        let kinds: Vec<_> = events
            .iter()
            .map(|e| match e {
                Event::Mouse(m) => m.kind,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                MouseEventKind::ScrollDown,
                MouseEventKind::Drag(MouseButton::Right),
                MouseEventKind::Press(MouseButton::Left),
            ]
        );
        assert!(matches!(events[2], Event::Mouse(m) if m.modifiers == Modifiers::CTRL));
    }

    #[test]
    fn sgr_mouse_missing_fields_is_skipped() {
        assert_eq!(parse(b"\x1b[<0;1Mq"), vec![k(KeyCode::Char('q'))]);
    }
}
