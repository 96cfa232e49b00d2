//! Keystroke notation parser.

use crate::binding::{function_key_number, is_alt_char, named_sequence, AltKey, KeyStroke};
use crate::error::KeyParseError;
use serde::{Deserialize, Serialize};

const CTRL_PREFIXES: [&str; 3] = ["ctrl+", "^", "c-"];
const ALT_PREFIXES: [&str; 3] = ["alt+", "meta+", "m-"];

/// Parse a key notation string into a KeyStroke.
///
/// Supported formats (case-insensitive, surrounding whitespace ignored):
/// - `"ctrl+w"`, `"^w"`, `"C-w"` - Ctrl+W
/// - `"alt+d"`, `"meta+d"`, `"M-d"` - Alt+D (any printable ASCII but `,`)
/// - `"alt+backspace"`, `"M-delete"`, `"meta+enter"`, `"alt+space"` - Alt on a named key
/// - `"tab"`, `"enter"`, `"esc"`, `"up"`, `"home"`, ... - named raw sequences
/// - `"f1"` through `"f12"` - function keys
/// - `"raw:1b5b41"` - any byte sequence, hex encoded
pub fn parse_keystroke(s: &str) -> Result<KeyStroke, KeyParseError> {
    let token = s.trim();
    let lower = token.to_ascii_lowercase();

    if lower.is_empty() {
        return Err(KeyParseError::new(token));
    }

    for prefix in CTRL_PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return parse_ctrl(rest).ok_or_else(|| KeyParseError::new(token));
        }
    }

    for prefix in ALT_PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            return parse_alt(rest).ok_or_else(|| KeyParseError::new(token));
        }
    }

    if let Some(hex) = lower.strip_prefix("raw:") {
        return parse_hex(hex)
            .map(KeyStroke::RawSeq)
            .ok_or_else(|| KeyParseError::new(token));
    }

    let name = match lower.as_str() {
        "escape" => "esc",
        "return" => "enter",
        other => other,
    };
    if let Some(seq) = named_sequence(name) {
        return Ok(KeyStroke::raw(seq));
    }

    if function_key_number(&lower).is_some() {
        return Ok(KeyStroke::FnKey(lower));
    }

    Err(KeyParseError::new(token))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn parse_ctrl(rest: &str) -> Option<KeyStroke> {
    single_char(rest)
        .filter(char::is_ascii_alphabetic)
        .map(KeyStroke::Ctrl)
}

fn parse_alt(rest: &str) -> Option<KeyStroke> {
    if let Some(key) = AltKey::named(rest) {
        return Some(KeyStroke::Alt(key));
    }
    single_char(rest)
        .filter(|c| is_alt_char(*c))
        .map(|c| KeyStroke::Alt(AltKey::Char(c)))
}

fn parse_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Parse a key notation into a single legacy byte.
///
/// Returns the control byte for Ctrl chords and the byte of single-byte
/// named keys (`tab` is 9). Everything else, including parse failures,
/// yields 0.
pub fn parse_key_binding(s: &str) -> u8 {
    match parse_keystroke(s) {
        Ok(key @ KeyStroke::Ctrl(_)) => key.control_byte().unwrap_or(0),
        Ok(KeyStroke::RawSeq(bytes)) if bytes.len() == 1 => bytes[0],
        _ => 0,
    }
}

/// A binding value as written in configuration: one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
    /// `delete_word = "ctrl+w"`, or a comma-joined list `"ctrl+w, alt+backspace"`
    Single(String),
    /// `delete_word = ["ctrl+w", "alt+backspace"]`
    Multi(Vec<String>),
}

impl BindingSpec {
    /// Iterate over the individual keystroke tokens, in order.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => s.split(',').collect(),
            Self::Multi(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for BindingSpec {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<Vec<&str>> for BindingSpec {
    fn from(items: Vec<&str>) -> Self {
        Self::Multi(items.into_iter().map(str::to_string).collect())
    }
}

/// Parse a configured binding into an ordered keystroke list.
///
/// Input order is preserved. Any unparseable element fails the whole call.
pub fn parse_keystrokes(spec: &BindingSpec) -> Result<Vec<KeyStroke>, KeyParseError> {
    spec.tokens().into_iter().map(parse_keystroke).collect()
}
