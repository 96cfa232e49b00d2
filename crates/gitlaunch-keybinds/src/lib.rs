//! # gitlaunch-keybinds
//!
//! Keybinding resolution for the gitlaunch command launcher.
//!
//! ## Features
//!
//! - Four built-in profiles: default, emacs, vi and readline
//! - Per-context bindings for the query line, results list and search
//! - Platform and terminal adjustments (macOS word deletion, screen/tmux prefixes)
//! - User overrides from TOML and `GITLAUNCH_KEY_*` environment variables
//! - Conflict detection and runtime profile switching
//!
//! ```no_run
//! use gitlaunch_keybinds::{Context, ProfileSwitcher, UserConfig};
//!
//! # fn main() -> gitlaunch_keybinds::KeybindResult<()> {
//! let config = UserConfig::load_default()?;
//! let (mut switcher, _skipped) = ProfileSwitcher::from_config(&config)?;
//! switcher.context_mut().enter_context(Context::Input);
//! let action = switcher.action_for_input(b"\x17")?;
//! # let _ = action;
//! # Ok(())
//! # }
//! ```

mod binding;
mod config;
mod conflict;
mod context;
mod display;
mod error;
mod keymap;
mod parser;
mod platform;
mod preset;
mod profile;
mod resolver;
mod switcher;

pub use binding::{AltKey, KeyStroke};
pub use config::{validate_key_bindings, ProfileConfig, RawBindings, UserConfig, UserKeyBindings};
pub use conflict::{detect_conflicts, detect_conflicts_in, Conflict, ConflictReport};
pub use context::{Context, ContextCallback, ContextManager};
pub use display::{KeyDisplayConfig, KeyDisplayFormat};
pub use error::{KeyParseError, KeybindError, KeybindResult, ValidationError};
pub use keymap::{Action, ActionBindings, KeyBindingMap, ENV_PREFIX};
pub use parser::{parse_key_binding, parse_keystroke, parse_keystrokes, BindingSpec};
pub use platform::{detect_platform, detect_terminal, EnvLookup, Platform, ProcessEnv, Terminal};
pub use preset::builtin_profiles;
pub use profile::{
    validate_profile, KeyBindingProfile, Profile, REQUIRED_INPUT_ACTIONS,
    REQUIRED_RESULTS_ACTIONS,
};
pub use resolver::{ContextualKeyBindingMap, KeyBindingResolver};
pub use switcher::{ProfileSwitcher, SwitchCallback};

/// Helper to create a Ctrl+letter keystroke.
pub fn ctrl(c: char) -> KeyStroke {
    KeyStroke::ctrl(c)
}

/// Helper to create an Alt+key keystroke.
pub fn alt(c: char) -> KeyStroke {
    KeyStroke::alt(c)
}

/// Helper to create a keystroke from a key name (`tab`, `up`, `f5`).
pub fn key(name: &str) -> Option<KeyStroke> {
    parse_keystroke(name).ok()
}
