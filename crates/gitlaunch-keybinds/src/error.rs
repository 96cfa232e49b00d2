//! Error types for keybinding resolution.

use crate::conflict::ConflictReport;
use crate::context::Context;
use crate::keymap::Action;
use crate::profile::Profile;
use thiserror::Error;

/// Human-readable list of accepted keystroke notations.
pub const SUPPORTED_FORMATS: &str = "ctrl+<letter>, ^<letter>, c-<letter>, \
     alt+<key>, meta+<key>, m-<key> (key: a letter, backspace, delete, enter, space), \
     named keys (tab, enter, esc, space, backspace, delete, up, down, left, right, \
     home, end, pageup, pagedown), f1-f12, raw:<hex bytes>";

/// Error parsing a single keystroke notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParseError {
    /// The offending token, as written
    pub token: String,
}

impl KeyParseError {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.token.trim().is_empty() {
            write!(f, "empty keystroke; supported formats: {}", SUPPORTED_FORMATS)
        } else {
            write!(
                f,
                "invalid keystroke '{}'; supported formats: {}",
                self.token, SUPPORTED_FORMATS
            )
        }
    }
}

impl std::error::Error for KeyParseError {}

/// A single finding from profile or configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A profile does not define one of the UI contexts.
    #[error("profile '{profile}' does not define context '{context}'")]
    MissingContext { profile: Profile, context: Context },

    /// A profile context lacks a binding the launcher cannot work without.
    #[error("profile '{profile}' does not bind '{action}' in context '{context}'")]
    MissingAction {
        profile: Profile,
        context: Context,
        action: Action,
    },

    /// An action is bound to an empty key list.
    #[error("'{action}' in {location} has no keystrokes")]
    EmptyBinding { location: String, action: Action },

    /// A keystroke value that can never be produced by a terminal.
    #[error("'{action}' in {location} has an unusable keystroke '{keystroke}'")]
    UnusableKeyStroke {
        location: String,
        action: Action,
        keystroke: String,
    },

    /// A keystroke string that failed to parse.
    #[error("'{action}' in {location}: {source}")]
    InvalidKeyStroke {
        location: String,
        action: String,
        source: KeyParseError,
    },

    /// An action name that is not part of the action set.
    #[error("unknown action '{name}' in {location}")]
    UnknownAction { location: String, name: String },

    /// A section name that is not a known context, platform, terminal or profile.
    #[error("unknown {kind} '{name}'")]
    UnknownSection { kind: &'static str, name: String },
}

/// Errors produced by the keybinding engine.
#[derive(Debug, Error)]
pub enum KeybindError {
    #[error("{0}")]
    Parse(#[from] KeyParseError),

    #[error("invalid profile '{0}' (expected one of: default, emacs, vi, readline)")]
    InvalidProfile(String),

    #[error("invalid context '{0}' (expected one of: global, input, results, search)")]
    InvalidContext(String),

    #[error("profile not registered: {0}")]
    ProfileNotFound(Profile),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("validation failed:\n{}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("keybinding conflicts detected:\n{0}")]
    Conflicts(ConflictReport),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for keybinding operations.
pub type KeybindResult<T> = Result<T, KeybindError>;
