// SPDX-License-Identifier: MIT
//
// Terminal key input.
//
// Turns raw stdin bytes into `KeyEvent`s. The runtime only listens to the
// keyboard (no mouse, no paste protocol), so the parser understands:
//
// - printable ASCII and UTF-8 characters
// - Ctrl+letter and the other C0 control bytes
// - Alt+key (ESC followed by a key)
// - legacy CSI sequences (arrows, editing keys, F-keys, xterm modifiers)
// - SS3 sequences (arrows and F1–F4 from terminals in application mode)
//
// Escape sequences can be split across `read()` calls, so the parser keeps
// unconsumed bytes between `advance` calls. A lone ESC is ambiguous until
// more bytes arrive or a timeout passes; the reader calls `flush` after
// the timeout to turn it into an Escape key.
//
// # Key identity
//
// Every event carries a `key`, a `rune` and `mods`. Printable input has
// `key == Key::Rune` and the character in `rune`. Named keys carry the
// character the terminal actually sent for them where one exists (Enter
// is `'\r'`, Tab is `'\t'`, Ctrl+C is `'\x03'`), so a listener on the rune
// and a listener on the key can both observe the same keystroke.

use bitflags::bitflags;

// ─── Key types ───────────────────────────────────────────────────────────────

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character; see [`KeyEvent::rune`].
    Rune,
    /// A character typed together with Ctrl (lower-case letters and the
    /// punctuation Ctrl can combine with).
    Char(char),
    Enter,
    Tab,
    /// Shift+Tab.
    BackTab,
    Backspace,
    Esc,
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
    /// F1 through F20.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags, in xterm's encoding order
    /// (`CSI` modifier parameter = 1 + bitmask).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

/// A single keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    /// The character the keystroke produced, `'\0'` if none.
    pub rune: char,
    pub mods: Modifiers,
}

impl KeyEvent {
    /// A printable character without modifiers.
    #[must_use]
    pub const fn rune(rune: char) -> Self {
        Self {
            key: Key::Rune,
            rune,
            mods: Modifiers::empty(),
        }
    }

    /// A named key. The rune is filled in from what a terminal sends for
    /// that key, e.g. `'\r'` for Enter.
    #[must_use]
    pub const fn key(key: Key, mods: Modifiers) -> Self {
        Self {
            key,
            rune: implied_rune(key, mods),
            mods,
        }
    }

    /// Ctrl combined with `c`, e.g. `KeyEvent::ctrl('c')` for Ctrl+C.
    #[must_use]
    pub const fn ctrl(c: char) -> Self {
        Self::key(Key::Char(c.to_ascii_lowercase()), Modifiers::CTRL)
    }
}

/// The byte a terminal sends for `key`, as a char.
const fn implied_rune(key: Key, mods: Modifiers) -> char {
    match key {
        Key::Enter => '\r',
        Key::Tab => '\t',
        Key::Backspace => '\x7f',
        Key::Esc => '\x1b',
        Key::Char(c) if mods.contains(Modifiers::CTRL) && c.is_ascii() => {
            let b = c.to_ascii_uppercase() as u8;
            if b >= 0x40 && b <= 0x5F {
                (b & 0x1F) as char
            } else {
                '\0'
            }
        }
        _ => '\0',
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Incremental key parser.
///
/// ```
/// use lines_term::input::{Key, KeyEvent, Parser};
///
/// let mut p = Parser::new();
/// assert_eq!(p.advance(b"a"), vec![KeyEvent::rune('a')]);
///
/// // Split escape sequence: nothing until the final byte arrives.
/// assert!(p.advance(b"\x1b[").is_empty());
/// assert_eq!(p.advance(b"A")[0].key, Key::Up);
/// ```
pub struct Parser {
    buf: Vec<u8>,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(32),
        }
    }

    /// Feed bytes and return every key that is complete so far.
    pub fn advance(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        self.buf.extend_from_slice(data);
        let mut keys = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match try_parse(&self.buf[pos..]) {
                Parsed::Key(key, used) => {
                    keys.push(key);
                    pos += used;
                }
                Parsed::Skip(n) => pos += n,
                Parsed::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        keys
    }

    /// Whether bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve pending bytes after a timeout: a lone ESC becomes Escape,
    /// whatever follows it is parsed as ordinary input.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let pending = std::mem::take(&mut self.buf);
        let mut keys = Vec::new();
        let mut rest = pending.as_slice();
        while let Some((&first, tail)) = rest.split_first() {
            if first == 0x1B {
                keys.push(KeyEvent::key(Key::Esc, Modifiers::empty()));
                rest = tail;
                continue;
            }
            match try_parse(rest) {
                Parsed::Key(key, used) => {
                    keys.push(key);
                    rest = &rest[used..];
                }
                Parsed::Skip(n) => rest = &rest[n.max(1)..],
                // An incomplete UTF-8 sequence is dropped.
                Parsed::Incomplete => break,
            }
        }
        keys
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless parsing ──────────────────────────────────────────────────────

enum Parsed {
    Key(KeyEvent, usize),
    Incomplete,
    Skip(usize),
}

fn try_parse(buf: &[u8]) -> Parsed {
    let Some(&first) = buf.first() else {
        return Parsed::Incomplete;
    };

    match first {
        0x1B => parse_escape(buf),
        0x00 => Parsed::Key(
            KeyEvent {
                key: Key::Char(' '),
                rune: '\0',
                mods: Modifiers::CTRL,
            },
            1,
        ),
        0x09 => Parsed::Key(KeyEvent::key(Key::Tab, Modifiers::empty()), 1),
        0x0A | 0x0D => Parsed::Key(KeyEvent::key(Key::Enter, Modifiers::empty()), 1),
        0x08 | 0x7F => Parsed::Key(KeyEvent::key(Key::Backspace, Modifiers::empty()), 1),
        b @ (0x01..=0x1A | 0x1C..=0x1F) => Parsed::Key(control(b, Modifiers::empty()), 1),
        b @ 0x20..=0x7E => Parsed::Key(KeyEvent::rune(b as char), 1),
        0xC0..=0xFF => parse_utf8(buf),
        _ => Parsed::Skip(1),
    }
}

/// Ctrl+key for a C0 control byte.
const fn control(b: u8, extra: Modifiers) -> KeyEvent {
    let c = if b <= 0x1A {
        (b + b'a' - 1) as char
    } else {
        (b + 0x40) as char
    };
    KeyEvent {
        key: Key::Char(c),
        rune: b as char,
        mods: Modifiers::CTRL.union(extra),
    }
}

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&second) = buf.get(1) else {
        return Parsed::Incomplete;
    };

    match second {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1B => Parsed::Key(KeyEvent::key(Key::Esc, Modifiers::ALT), 2),
        b @ 0x20..=0x7E => Parsed::Key(
            KeyEvent {
                mods: Modifiers::ALT,
                ..KeyEvent::rune(b as char)
            },
            2,
        ),
        b @ (0x01..=0x1A | 0x1C..=0x1F) if !matches!(b, 0x09 | 0x0A | 0x0D | 0x08) => {
            Parsed::Key(control(b, Modifiers::ALT), 2)
        }
        _ => Parsed::Key(KeyEvent::key(Key::Esc, Modifiers::empty()), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Parsed {
    // ESC [ params... final
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }

    let used = end + 1;
    let params = parse_params(&buf[2..end]);
    let mods = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));

    let key = match buf[end] {
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => Key::Home,
            2 => Key::Insert,
            3 => Key::Delete,
            4 | 8 => Key::End,
            5 => Key::PageUp,
            6 => Key::PageDown,
            n @ 11..=15 => Key::F((n - 10) as u8),
            n @ 17..=21 => Key::F((n - 11) as u8),
            n @ 23..=26 => Key::F((n - 12) as u8),
            n @ 28..=29 => Key::F((n - 13) as u8),
            n @ 31..=34 => Key::F((n - 14) as u8),
            _ => return Parsed::Skip(used),
        },
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        b'Z' => return Parsed::Key(KeyEvent::key(Key::BackTab, Modifiers::SHIFT), used),
        _ => return Parsed::Skip(used),
    };

    Parsed::Key(KeyEvent::key(key, mods), used)
}

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&b) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    let key = match b {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        b'H' => Key::Home,
        b'F' => Key::End,
        b'P' => Key::F(1),
        b'Q' => Key::F(2),
        b'R' => Key::F(3),
        b'S' => Key::F(4),
        _ => return Parsed::Skip(3),
    };
    Parsed::Key(KeyEvent::key(key, Modifiers::empty()), 3)
}

fn parse_utf8(buf: &[u8]) -> Parsed {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Parsed::Skip(1),
    };
    if buf.len() < len {
        return Parsed::Incomplete;
    }
    match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
        Some(c) => Parsed::Key(KeyEvent::rune(c), len),
        None => Parsed::Skip(1),
    }
}

/// Numeric CSI parameters; missing or malformed numbers become 0.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|part| {
            part.iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |n, &d| n.saturating_mul(10).saturating_add(u16::from(d - b'0')))
        })
        .collect()
}

/// xterm modifier parameter: `1 + bitmask`.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate(param.saturating_sub(1) as u8)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
