//! Keystroke types.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const TAB: &[u8] = b"\t";
pub(crate) const ENTER: &[u8] = b"\r";
pub(crate) const ESC: &[u8] = b"\x1b";
pub(crate) const SPACE: &[u8] = b" ";
pub(crate) const BACKSPACE: &[u8] = b"\x7f";
pub(crate) const UP: &[u8] = b"\x1b[A";
pub(crate) const DOWN: &[u8] = b"\x1b[B";
pub(crate) const RIGHT: &[u8] = b"\x1b[C";
pub(crate) const LEFT: &[u8] = b"\x1b[D";
pub(crate) const HOME: &[u8] = b"\x1b[H";
pub(crate) const END: &[u8] = b"\x1b[F";
pub(crate) const PAGE_UP: &[u8] = b"\x1b[5~";
pub(crate) const PAGE_DOWN: &[u8] = b"\x1b[6~";
pub(crate) const DELETE: &[u8] = b"\x1b[3~";

/// Raw sequences that have a name in the keystroke notation.
const NAMED_SEQUENCES: &[(&str, &[u8])] = &[
    ("tab", TAB),
    ("enter", ENTER),
    ("esc", ESC),
    ("space", SPACE),
    ("backspace", BACKSPACE),
    ("up", UP),
    ("down", DOWN),
    ("right", RIGHT),
    ("left", LEFT),
    ("home", HOME),
    ("end", END),
    ("pageup", PAGE_UP),
    ("pagedown", PAGE_DOWN),
    ("delete", DELETE),
];

/// xterm encodings for f1 through f12.
const FUNCTION_SEQUENCES: [&[u8]; 12] = [
    b"\x1bOP",
    b"\x1bOQ",
    b"\x1bOR",
    b"\x1bOS",
    b"\x1b[15~",
    b"\x1b[17~",
    b"\x1b[18~",
    b"\x1b[19~",
    b"\x1b[20~",
    b"\x1b[21~",
    b"\x1b[23~",
    b"\x1b[24~",
];

/// Look up the byte sequence for a named key.
pub(crate) fn named_sequence(name: &str) -> Option<&'static [u8]> {
    NAMED_SEQUENCES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, seq)| *seq)
}

pub(crate) fn sequence_name(bytes: &[u8]) -> Option<&'static str> {
    NAMED_SEQUENCES
        .iter()
        .find(|(_, seq)| *seq == bytes)
        .map(|(n, _)| *n)
}

/// Function key number for names like `f7`.
pub(crate) fn function_key_number(name: &str) -> Option<u8> {
    let n: u8 = name.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

/// Characters allowed in an Alt chord: printable ASCII, lowercase, and not
/// the `,` that separates list entries.
pub(crate) fn is_alt_char(c: char) -> bool {
    c.is_ascii_graphic() && !c.is_ascii_uppercase() && c != ','
}

/// The key half of an Alt/Meta chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AltKey {
    /// A printable character (stored lowercase)
    Char(char),
    Backspace,
    Delete,
    Enter,
    Space,
}

impl AltKey {
    /// Parse the special key names accepted after `alt+`.
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "backspace" => Some(Self::Backspace),
            "delete" => Some(Self::Delete),
            "enter" => Some(Self::Enter),
            "space" => Some(Self::Space),
            _ => None,
        }
    }
}

impl fmt::Display for AltKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c),
            Self::Backspace => write!(f, "backspace"),
            Self::Delete => write!(f, "delete"),
            Self::Enter => write!(f, "enter"),
            Self::Space => write!(f, "space"),
        }
    }
}

/// One physical input event.
///
/// Equality is structural: two keystrokes are equal when they are the same
/// variant with the same payload. `ctrl+i` and `tab` send the same byte but
/// are different keystrokes.
///
/// Serializes as its canonical notation (`"ctrl+w"`, `"alt+backspace"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyStroke {
    /// Control chord on a letter `a`-`z`
    Ctrl(char),
    /// Alt/Meta chord
    Alt(AltKey),
    /// Exact byte sequence (tab, enter, arrows, escape codes)
    RawSeq(Vec<u8>),
    /// Named function key (`f1`-`f12`)
    FnKey(String),
}

impl KeyStroke {
    /// Create a Ctrl+letter keystroke.
    pub fn ctrl(letter: char) -> Self {
        Self::Ctrl(letter.to_ascii_lowercase())
    }

    /// Create an Alt+character keystroke.
    pub fn alt(c: char) -> Self {
        Self::Alt(AltKey::Char(c.to_ascii_lowercase()))
    }

    /// Create an Alt chord on a named key.
    pub fn alt_key(key: AltKey) -> Self {
        Self::Alt(key)
    }

    /// Create a raw byte sequence keystroke.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self::RawSeq(bytes.into())
    }

    /// Create a function key keystroke.
    pub fn function(n: u8) -> Self {
        Self::FnKey(format!("f{}", n))
    }

    /// Create the raw keystroke for a named key (`tab`, `up`, ...).
    pub fn named(name: &str) -> Option<Self> {
        named_sequence(name).map(Self::raw)
    }

    pub fn tab() -> Self {
        Self::raw(TAB)
    }

    pub fn enter() -> Self {
        Self::raw(ENTER)
    }

    pub fn esc() -> Self {
        Self::raw(ESC)
    }

    pub fn up() -> Self {
        Self::raw(UP)
    }

    pub fn down() -> Self {
        Self::raw(DOWN)
    }

    pub fn home() -> Self {
        Self::raw(HOME)
    }

    pub fn end() -> Self {
        Self::raw(END)
    }

    /// The single control byte for a Ctrl chord (`letter - 'a' + 1`).
    pub fn control_byte(&self) -> Option<u8> {
        match self {
            Self::Ctrl(c) if c.is_ascii_lowercase() => Some(*c as u8 - b'a' + 1),
            _ => None,
        }
    }

    /// Whether a terminal can actually produce this keystroke.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Ctrl(c) => c.is_ascii_lowercase(),
            Self::Alt(AltKey::Char(c)) => is_alt_char(*c),
            Self::Alt(_) => true,
            Self::RawSeq(bytes) => !bytes.is_empty(),
            Self::FnKey(name) => function_key_number(name).is_some(),
        }
    }

    /// The bytes a terminal in raw mode sends for this keystroke.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        if !self.is_valid() {
            return None;
        }
        let bytes = match self {
            Self::Ctrl(_) => vec![self.control_byte()?],
            Self::Alt(key) => {
                let mut bytes = ESC.to_vec();
                match key {
                    AltKey::Char(c) => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    AltKey::Backspace => bytes.extend_from_slice(BACKSPACE),
                    AltKey::Delete => bytes.extend_from_slice(DELETE),
                    AltKey::Enter => bytes.extend_from_slice(ENTER),
                    AltKey::Space => bytes.extend_from_slice(SPACE),
                }
                bytes
            }
            Self::RawSeq(bytes) => bytes.clone(),
            Self::FnKey(name) => {
                let n = function_key_number(name)?;
                FUNCTION_SEQUENCES[usize::from(n) - 1].to_vec()
            }
        };
        Some(bytes)
    }

    /// Build a keystroke from a crossterm key event.
    ///
    /// Returns `None` for events outside the keystroke model (Shift chords,
    /// Ctrl+Alt chords, plain printable characters, Alt on `,` or non-ASCII).
    pub fn from_key_event(event: &KeyEvent) -> Option<Self> {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);

        match (event.code, ctrl, alt) {
            (KeyCode::Char(c), true, false) if c.is_ascii_alphabetic() => Some(Self::ctrl(c)),
            (KeyCode::Char(' '), false, true) => Some(Self::Alt(AltKey::Space)),
            (KeyCode::Char(c), false, true) if is_alt_char(c.to_ascii_lowercase()) => {
                Some(Self::alt(c))
            }
            (KeyCode::Backspace, false, true) => Some(Self::Alt(AltKey::Backspace)),
            (KeyCode::Delete, false, true) => Some(Self::Alt(AltKey::Delete)),
            (KeyCode::Enter, false, true) => Some(Self::Alt(AltKey::Enter)),
            (KeyCode::F(n), false, false) => Some(Self::function(n)),
            (code, false, false) => {
                let name = match code {
                    KeyCode::Tab => "tab",
                    KeyCode::Enter => "enter",
                    KeyCode::Esc => "esc",
                    KeyCode::Char(' ') => "space",
                    KeyCode::Backspace => "backspace",
                    KeyCode::Up => "up",
                    KeyCode::Down => "down",
                    KeyCode::Right => "right",
                    KeyCode::Left => "left",
                    KeyCode::Home => "home",
                    KeyCode::End => "end",
                    KeyCode::PageUp => "pageup",
                    KeyCode::PageDown => "pagedown",
                    KeyCode::Delete => "delete",
                    _ => return None,
                };
                Self::named(name)
            }
            _ => None,
        }
    }

    /// Check if this keystroke matches a crossterm key event.
    pub fn matches_event(&self, event: &KeyEvent) -> bool {
        Self::from_key_event(event).as_ref() == Some(self)
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ctrl(c) => write!(f, "ctrl+{}", c),
            Self::Alt(key) => write!(f, "alt+{}", key),
            Self::RawSeq(bytes) => match sequence_name(bytes) {
                Some(name) => write!(f, "{}", name),
                None => {
                    write!(f, "raw:")?;
                    for b in bytes {
                        write!(f, "{:02x}", b)?;
                    }
                    Ok(())
                }
            },
            Self::FnKey(name) => write!(f, "{}", name),
        }
    }
}

impl TryFrom<String> for KeyStroke {
    type Error = crate::error::KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        crate::parser::parse_keystroke(&value)
    }
}

impl From<KeyStroke> for String {
    fn from(key: KeyStroke) -> Self {
        key.to_string()
    }
}

impl std::str::FromStr for KeyStroke {
    type Err = crate::error::KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_keystroke(s)
    }
}
