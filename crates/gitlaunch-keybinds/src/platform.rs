//! Platform and terminal detection, and the adjustments each one needs.

use crate::binding::{AltKey, KeyStroke};
use crate::error::ValidationError;
use crate::keymap::{Action, ActionBindings, KeyBindingMap};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Read access to environment variables.
///
/// The resolver and the terminal detector go through this trait so tests can
/// supply a fixed environment.
pub trait EnvLookup: Send + Sync {
    /// Value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;

    /// Value of `key`, treating an empty value as unset.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|v| !v.trim().is_empty())
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Darwin,
    Linux,
    Windows,
    Bsd,
    Unix,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Self::Darwin,
        Self::Linux,
        Self::Windows,
        Self::Bsd,
        Self::Unix,
    ];

    /// Classify an OS identifier as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" | "darwin" | "ios" => Self::Darwin,
            "linux" | "android" => Self::Linux,
            "windows" => Self::Windows,
            "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Self::Bsd,
            _ => Self::Unix,
        }
    }

    /// The platform this process runs on.
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Bsd => "bsd",
            Self::Unix => "unix",
        }
    }

    /// Bindings this platform replaces, given the map built so far.
    ///
    /// The platform key goes first and the profile's own keys for the action
    /// are kept behind it.
    pub fn overrides(self, current: &KeyBindingMap) -> ActionBindings {
        let mut layer = ActionBindings::new();
        match self {
            Self::Darwin => {
                let alt_backspace = KeyStroke::alt_key(AltKey::Backspace);
                prefer(&mut layer, current, Action::DeleteWord, alt_backspace);
            }
            Self::Windows => {
                prefer(&mut layer, current, Action::MoveToBeginning, KeyStroke::home());
                prefer(&mut layer, current, Action::MoveToEnd, KeyStroke::end());
            }
            Self::Linux | Self::Bsd | Self::Unix => {}
        }
        layer
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownSection {
                kind: "platform",
                name: s.to_string(),
            })
    }
}

/// Terminal emulator or multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Terminal {
    Iterm,
    /// Apple Terminal.app
    Terminal,
    Tmux,
    Screen,
    Xterm,
    Alacritty,
    Kitty,
    Wezterm,
    Konsole,
    GnomeTerminal,
    Rxvt,
    Dumb,
    Generic,
    Vscode,
    Hyper,
}

impl Terminal {
    pub const ALL: [Terminal; 15] = [
        Self::Iterm,
        Self::Terminal,
        Self::Tmux,
        Self::Screen,
        Self::Xterm,
        Self::Alacritty,
        Self::Kitty,
        Self::Wezterm,
        Self::Konsole,
        Self::GnomeTerminal,
        Self::Rxvt,
        Self::Dumb,
        Self::Generic,
        Self::Vscode,
        Self::Hyper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iterm => "iterm",
            Self::Terminal => "terminal",
            Self::Tmux => "tmux",
            Self::Screen => "screen",
            Self::Xterm => "xterm",
            Self::Alacritty => "alacritty",
            Self::Kitty => "kitty",
            Self::Wezterm => "wezterm",
            Self::Konsole => "konsole",
            Self::GnomeTerminal => "gnome-terminal",
            Self::Rxvt => "rxvt",
            Self::Dumb => "dumb",
            Self::Generic => "generic",
            Self::Vscode => "vscode",
            Self::Hyper => "hyper",
        }
    }

    /// Classify the terminal from `TERM_PROGRAM`, `TERM` and friends.
    ///
    /// Multiplexers win over the emulator they run in. `TERM_PROGRAM` is
    /// inherited from the outer emulator, so `TMUX`, `STY` and a
    /// `tmux`/`screen` `TERM` are checked before it.
    pub fn detect(env: &dyn EnvLookup) -> Self {
        let term = env.non_empty("TERM").unwrap_or_default().to_ascii_lowercase();
        let program = env
            .non_empty("TERM_PROGRAM")
            .unwrap_or_default()
            .to_ascii_lowercase();

        if env.non_empty("TMUX").is_some() || term.starts_with("tmux") || program == "tmux" {
            return Self::Tmux;
        }
        if env.non_empty("STY").is_some() || term.starts_with("screen") {
            return Self::Screen;
        }

        match program.as_str() {
            "iterm.app" => return Self::Iterm,
            "apple_terminal" => return Self::Terminal,
            "vscode" => return Self::Vscode,
            "hyper" => return Self::Hyper,
            "wezterm" => return Self::Wezterm,
            _ => {}
        }

        if term == "dumb" {
            return Self::Dumb;
        }
        if term == "xterm-kitty" || env.non_empty("KITTY_WINDOW_ID").is_some() {
            return Self::Kitty;
        }
        if term.starts_with("alacritty") || env.non_empty("ALACRITTY_SOCKET").is_some() {
            return Self::Alacritty;
        }
        if env.non_empty("WEZTERM_EXECUTABLE").is_some() {
            return Self::Wezterm;
        }
        if env.non_empty("KONSOLE_VERSION").is_some() {
            return Self::Konsole;
        }
        if env.non_empty("VTE_VERSION").is_some() {
            return Self::GnomeTerminal;
        }
        if term.starts_with("rxvt") {
            return Self::Rxvt;
        }
        if term.starts_with("xterm") {
            return Self::Xterm;
        }
        Self::Generic
    }

    /// Bindings this terminal replaces, given the map built so far.
    pub fn overrides(self, current: &KeyBindingMap) -> ActionBindings {
        let mut layer = ActionBindings::new();
        match self {
            // screen keeps C-a as its command prefix
            Self::Screen => {
                layer.insert(
                    Action::MoveToBeginning,
                    vec![KeyStroke::home(), KeyStroke::alt('a')],
                );
            }
            Self::Tmux => {
                layer.insert(
                    Action::MoveToBeginning,
                    vec![KeyStroke::ctrl('a'), KeyStroke::home()],
                );
            }
            Self::Iterm | Self::Terminal => {
                let alt_backspace = KeyStroke::alt_key(AltKey::Backspace);
                prefer(&mut layer, current, Action::DeleteWord, alt_backspace);
            }
            // VS Code grabs C-k as a chord prefix unless told otherwise
            Self::Vscode => {
                layer.insert(
                    Action::DeleteToEnd,
                    vec![KeyStroke::ctrl('k'), KeyStroke::alt_key(AltKey::Delete)],
                );
            }
            Self::Dumb => {
                layer.insert(Action::MoveUp, vec![KeyStroke::ctrl('p')]);
                layer.insert(Action::MoveDown, vec![KeyStroke::ctrl('n')]);
            }
            Self::Xterm
            | Self::Alacritty
            | Self::Kitty
            | Self::Wezterm
            | Self::Konsole
            | Self::GnomeTerminal
            | Self::Rxvt
            | Self::Generic
            | Self::Hyper => {}
        }
        layer
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Terminal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownSection {
                kind: "terminal",
                name: s.to_string(),
            })
    }
}

fn prefer(layer: &mut ActionBindings, current: &KeyBindingMap, action: Action, key: KeyStroke) {
    let mut keys = vec![key.clone()];
    keys.extend(current.get(action).iter().filter(|k| **k != key).cloned());
    layer.insert(action, keys);
}

/// Detect the platform string of the running process.
pub fn detect_platform() -> String {
    Platform::detect().to_string()
}

/// Detect the terminal string from the process environment.
pub fn detect_terminal() -> String {
    Terminal::detect(&ProcessEnv).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::Darwin);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("openbsd"), Platform::Bsd);
        assert_eq!(Platform::from_os("solaris"), Platform::Unix);
    }

    #[test]
    fn test_platform_names_roundtrip() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert!("amiga".parse::<Platform>().is_err());
    }

    #[test]
    fn test_terminal_names_roundtrip() {
        for terminal in Terminal::ALL {
            assert_eq!(terminal.as_str().parse::<Terminal>().unwrap(), terminal);
        }
        assert_eq!(Terminal::GnomeTerminal.to_string(), "gnome-terminal");
    }

    #[test]
    fn test_detect_term_program() {
        assert_eq!(Terminal::detect(&env(&[("TERM_PROGRAM", "iTerm.app")])), Terminal::Iterm);
        assert_eq!(
            Terminal::detect(&env(&[("TERM_PROGRAM", "Apple_Terminal")])),
            Terminal::Terminal
        );
        assert_eq!(
            Terminal::detect(&env(&[("TERM_PROGRAM", "vscode"), ("TERM", "xterm-256color")])),
            Terminal::Vscode
        );
        assert_eq!(Terminal::detect(&env(&[("TERM_PROGRAM", "WezTerm")])), Terminal::Wezterm);
    }

    #[test]
    fn test_detect_multiplexers() {
        assert_eq!(
            Terminal::detect(&env(&[("TERM", "screen-256color"), ("TMUX", "/tmp/tmux-1000/default,1,0")])),
            Terminal::Tmux
        );
        assert_eq!(Terminal::detect(&env(&[("TERM", "screen")])), Terminal::Screen);
        assert_eq!(Terminal::detect(&env(&[("TERM", "tmux-256color")])), Terminal::Tmux);
        assert_eq!(Terminal::detect(&env(&[("TERM_PROGRAM", "tmux")])), Terminal::Tmux);
    }

    #[test]
    fn test_multiplexer_beats_inherited_term_program() {
        assert_eq!(
            Terminal::detect(&env(&[
                ("TERM_PROGRAM", "iTerm.app"),
                ("STY", "1234.pts-0.host"),
                ("TERM", "screen-256color"),
            ])),
            Terminal::Screen
        );
        assert_eq!(
            Terminal::detect(&env(&[
                ("TERM_PROGRAM", "vscode"),
                ("TMUX", "/tmp/tmux-1000/default,1,0"),
                ("TERM", "xterm-256color"),
            ])),
            Terminal::Tmux
        );
        assert_eq!(
            Terminal::detect(&env(&[
                ("TERM_PROGRAM", "Apple_Terminal"),
                ("STY", "99.ttys000.mac"),
            ])),
            Terminal::Screen
        );
    }

    #[test]
    fn test_detect_term() {
        assert_eq!(Terminal::detect(&env(&[("TERM", "dumb")])), Terminal::Dumb);
        assert_eq!(Terminal::detect(&env(&[("TERM", "xterm-kitty")])), Terminal::Kitty);
        assert_eq!(Terminal::detect(&env(&[("TERM", "alacritty")])), Terminal::Alacritty);
        assert_eq!(Terminal::detect(&env(&[("TERM", "rxvt-unicode")])), Terminal::Rxvt);
        assert_eq!(Terminal::detect(&env(&[("TERM", "xterm-256color")])), Terminal::Xterm);
        assert_eq!(
            Terminal::detect(&env(&[("TERM", "xterm-256color"), ("KONSOLE_VERSION", "230401")])),
            Terminal::Konsole
        );
        assert_eq!(
            Terminal::detect(&env(&[("TERM", "xterm-256color"), ("VTE_VERSION", "7003")])),
            Terminal::GnomeTerminal
        );
        assert_eq!(Terminal::detect(&env(&[])), Terminal::Generic);
        assert_eq!(Terminal::detect(&env(&[("TERM", ""), ("TERM_PROGRAM", "")])), Terminal::Generic);
    }

    #[test]
    fn test_platform_overrides() {
        let defaults = KeyBindingMap::builtin_defaults();
        let darwin = Platform::Darwin.overrides(&defaults);
        assert_eq!(
            darwin[&Action::DeleteWord],
            vec![KeyStroke::alt_key(AltKey::Backspace), KeyStroke::ctrl('w')]
        );
        assert!(Platform::Linux.overrides(&defaults).is_empty());

        let windows = Platform::Windows.overrides(&defaults);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[&Action::MoveToEnd], vec![KeyStroke::end(), KeyStroke::ctrl('e')]);
    }

    #[test]
    fn test_platform_overrides_keep_profile_keys() {
        let mut current = KeyBindingMap::builtin_defaults();
        current.set(Action::DeleteWord, vec![KeyStroke::alt('d')]);
        assert_eq!(
            Platform::Darwin.overrides(&current)[&Action::DeleteWord],
            vec![KeyStroke::alt_key(AltKey::Backspace), KeyStroke::alt('d')]
        );

        // already bound: moved to the front, not duplicated
        current.set(
            Action::DeleteWord,
            vec![KeyStroke::ctrl('w'), KeyStroke::alt_key(AltKey::Backspace)],
        );
        assert_eq!(
            Terminal::Iterm.overrides(&current)[&Action::DeleteWord],
            vec![KeyStroke::alt_key(AltKey::Backspace), KeyStroke::ctrl('w')]
        );
    }

    #[test]
    fn test_terminal_overrides() {
        let defaults = KeyBindingMap::builtin_defaults();
        let screen = Terminal::Screen.overrides(&defaults);
        assert!(!screen[&Action::MoveToBeginning].contains(&KeyStroke::ctrl('a')));

        let dumb = Terminal::Dumb.overrides(&defaults);
        assert_eq!(dumb[&Action::MoveUp], vec![KeyStroke::ctrl('p')]);

        assert!(Terminal::Kitty.overrides(&defaults).is_empty());
    }
}
