//! Key display configuration.

use crate::binding::{sequence_name, AltKey, KeyStroke};
use crate::keymap::KeyBindingMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format for displaying key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDisplayFormat {
    /// Unicode symbols: ⌃W, ⌥⌫
    Symbolic,
    /// Text labels: Ctrl+W, Alt+Backspace
    #[default]
    Text,
}

/// Configuration for key display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDisplayConfig {
    /// Display format
    pub format: KeyDisplayFormat,
    /// Separator between the keys of one action
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    ", ".to_string()
}

impl Default for KeyDisplayConfig {
    fn default() -> Self {
        Self {
            format: KeyDisplayFormat::Text,
            separator: default_separator(),
        }
    }
}

impl KeyDisplayConfig {
    /// Create a symbolic display config.
    pub fn symbolic() -> Self {
        Self {
            format: KeyDisplayFormat::Symbolic,
            ..Self::default()
        }
    }

    /// Create a text display config.
    pub fn text() -> Self {
        Self::default()
    }

    fn ctrl_prefix(&self) -> &'static str {
        match self.format {
            KeyDisplayFormat::Symbolic => "\u{2303}",
            KeyDisplayFormat::Text => "Ctrl+",
        }
    }

    fn alt_prefix(&self) -> &'static str {
        match self.format {
            KeyDisplayFormat::Symbolic => "\u{2325}",
            KeyDisplayFormat::Text => "Alt+",
        }
    }

    /// Format a key name.
    pub fn format_key(&self, key: &str) -> String {
        let symbol = match (self.format, key) {
            (KeyDisplayFormat::Symbolic, "enter") => "\u{23ce}",
            (KeyDisplayFormat::Symbolic, "esc") => "\u{238b}",
            (KeyDisplayFormat::Symbolic, "tab") => "\u{21e5}",
            (KeyDisplayFormat::Symbolic, "backspace") => "\u{232b}",
            (KeyDisplayFormat::Symbolic, "delete") => "\u{2326}",
            (KeyDisplayFormat::Symbolic, "space") => "\u{2423}",
            (KeyDisplayFormat::Symbolic, "up") => "\u{2191}",
            (KeyDisplayFormat::Symbolic, "down") => "\u{2193}",
            (KeyDisplayFormat::Symbolic, "left") => "\u{2190}",
            (KeyDisplayFormat::Symbolic, "right") => "\u{2192}",
            (KeyDisplayFormat::Symbolic, "home") => "\u{21f1}",
            (KeyDisplayFormat::Symbolic, "end") => "\u{21f2}",
            (KeyDisplayFormat::Symbolic, "pageup") => "\u{21de}",
            (KeyDisplayFormat::Symbolic, "pagedown") => "\u{21df}",
            (KeyDisplayFormat::Text, "enter") => "Enter",
            (KeyDisplayFormat::Text, "esc") => "Escape",
            (KeyDisplayFormat::Text, "tab") => "Tab",
            (KeyDisplayFormat::Text, "backspace") => "Backspace",
            (KeyDisplayFormat::Text, "delete") => "Delete",
            (KeyDisplayFormat::Text, "space") => "Space",
            (KeyDisplayFormat::Text, "up") => "Up",
            (KeyDisplayFormat::Text, "down") => "Down",
            (KeyDisplayFormat::Text, "left") => "Left",
            (KeyDisplayFormat::Text, "right") => "Right",
            (KeyDisplayFormat::Text, "home") => "Home",
            (KeyDisplayFormat::Text, "end") => "End",
            (KeyDisplayFormat::Text, "pageup") => "PageUp",
            (KeyDisplayFormat::Text, "pagedown") => "PageDown",
            _ => return key.to_uppercase(),
        };
        symbol.to_string()
    }

    /// Format one keystroke.
    pub fn format_keystroke(&self, key: &KeyStroke) -> String {
        match key {
            KeyStroke::Ctrl(c) => format!("{}{}", self.ctrl_prefix(), c.to_ascii_uppercase()),
            KeyStroke::Alt(AltKey::Char(c)) => {
                format!("{}{}", self.alt_prefix(), c.to_uppercase())
            }
            KeyStroke::Alt(named) => {
                format!("{}{}", self.alt_prefix(), self.format_key(&named.to_string()))
            }
            KeyStroke::RawSeq(bytes) => match sequence_name(bytes) {
                Some(name) => self.format_key(name),
                None => key.to_string(),
            },
            KeyStroke::FnKey(name) => name.to_uppercase(),
        }
    }

    /// Format the keys of one action, in priority order.
    pub fn format_keystrokes(&self, keys: &[KeyStroke]) -> String {
        keys.iter()
            .map(|k| self.format_keystroke(k))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Action name to formatted keys for a whole map.
    pub fn format_map(&self, map: &KeyBindingMap) -> BTreeMap<&'static str, String> {
        map.iter()
            .map(|(action, keys)| (action.name(), self.format_keystrokes(keys)))
            .collect()
    }
}
