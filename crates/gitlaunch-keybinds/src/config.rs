//! User keybinding configuration.

use crate::binding::KeyStroke;
use crate::context::Context;
use crate::error::{KeybindError, KeybindResult, ValidationError};
use crate::keymap::{Action, ActionBindings};
use crate::parser::{parse_keystrokes, BindingSpec};
use crate::platform::{Platform, Terminal};
use crate::profile::{KeyBindingProfile, Profile};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Action name to configured binding, as written in the file.
pub type RawBindings = BTreeMap<String, BindingSpec>;

/// Keybinding section of the user's configuration file.
///
/// ```toml
/// profile = "emacs"
///
/// [global]
/// soft_cancel = "ctrl+g"
///
/// [contexts.input]
/// delete_word = ["alt+backspace", "ctrl+w"]
///
/// [platforms.darwin]
/// delete_word = "alt+backspace"
///
/// [terminals.tmux]
/// move_to_beginning = "home"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Profile to activate at startup.
    #[serde(default)]
    pub profile: Option<String>,
    /// Overrides applied in every context.
    #[serde(default)]
    pub global: RawBindings,
    /// Overrides per context name.
    #[serde(default)]
    pub contexts: BTreeMap<String, RawBindings>,
    /// Overrides per platform name.
    #[serde(default)]
    pub platforms: BTreeMap<String, RawBindings>,
    /// Overrides per terminal name.
    #[serde(default)]
    pub terminals: BTreeMap<String, RawBindings>,
    /// Replacement definitions for built-in profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// A profile definition in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub global: RawBindings,
    #[serde(default)]
    pub contexts: BTreeMap<String, RawBindings>,
}

impl UserConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> KeybindResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded keybinding config");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> KeybindResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the default location, or defaults if there is no file.
    pub fn load_default() -> KeybindResult<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Get default config path.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gitlaunch").map(|d| d.config_dir().join("keybindings.toml"))
    }

    /// The configured startup profile, if any.
    pub fn selected_profile(&self) -> KeybindResult<Option<Profile>> {
        self.profile.as_deref().map(str::parse).transpose()
    }

    /// Strictly validate the override sections.
    pub fn validate(&self) -> KeybindResult<UserKeyBindings> {
        UserKeyBindings::validate(self)
    }

    /// Build and validate the profiles declared under `[profiles.*]`.
    ///
    /// Any invalid profile fails the whole call.
    pub fn custom_profiles(&self) -> KeybindResult<Vec<KeyBindingProfile>> {
        let mut errors = Vec::new();
        let mut profiles = Vec::new();

        for (name, definition) in &self.profiles {
            let profile_name = match name.parse::<Profile>() {
                Ok(p) => p,
                Err(_) => {
                    errors.push(ValidationError::UnknownSection {
                        kind: "profile",
                        name: name.clone(),
                    });
                    continue;
                }
            };

            let mut profile = KeyBindingProfile::new(profile_name, definition.description.clone());
            profile.contexts.clear();
            let location = format!("profiles.{}", name);
            profile.global = normalize_table(&definition.global, &location, &mut errors);

            for (context_name, table) in &definition.contexts {
                let location = format!("profiles.{}.contexts.{}", name, context_name);
                match context_name.parse::<Context>() {
                    Ok(context) if context.is_global() => {
                        let bindings = normalize_table(table, &location, &mut errors);
                        profile.global.extend(bindings);
                    }
                    Ok(context) => {
                        let bindings = normalize_table(table, &location, &mut errors);
                        profile.contexts.insert(context, bindings);
                    }
                    Err(_) => errors.push(ValidationError::UnknownSection {
                        kind: "context",
                        name: context_name.clone(),
                    }),
                }
            }

            errors.extend(profile.validation_errors());
            profiles.push(profile);
        }

        if errors.is_empty() {
            Ok(profiles)
        } else {
            Err(KeybindError::Validation(errors))
        }
    }
}

/// User overrides with every value parsed into keystrokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserKeyBindings {
    pub global: ActionBindings,
    pub contexts: HashMap<Context, ActionBindings>,
    pub platforms: HashMap<Platform, ActionBindings>,
    pub terminals: HashMap<Terminal, ActionBindings>,
}

impl UserKeyBindings {
    /// Create an empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a configuration, skipping anything malformed.
    ///
    /// Skipped entries are logged and returned so a caller can surface them.
    pub fn from_config(config: &UserConfig) -> (Self, Vec<ValidationError>) {
        let mut errors = Vec::new();
        let bindings = Self::normalize(config, &mut errors);
        for error in &errors {
            warn!(%error, "ignoring keybinding override");
        }
        (bindings, errors)
    }

    /// Normalize a configuration, failing on the first pass if anything is
    /// malformed. All findings are reported together.
    pub fn validate(config: &UserConfig) -> KeybindResult<Self> {
        let mut errors = Vec::new();
        let bindings = Self::normalize(config, &mut errors);
        if errors.is_empty() {
            Ok(bindings)
        } else {
            Err(KeybindError::Validation(errors))
        }
    }

    fn normalize(config: &UserConfig, errors: &mut Vec<ValidationError>) -> Self {
        let mut bindings = Self::new();
        bindings.global = normalize_table(&config.global, "global", errors);

        for (name, table) in &config.contexts {
            let location = format!("contexts.{}", name);
            match name.parse::<Context>() {
                Ok(context) if context.is_global() => {
                    let table = normalize_table(table, &location, errors);
                    bindings.global.extend(table);
                }
                Ok(context) => {
                    let table = normalize_table(table, &location, errors);
                    bindings.contexts.entry(context).or_default().extend(table);
                }
                Err(_) => errors.push(ValidationError::UnknownSection {
                    kind: "context",
                    name: name.clone(),
                }),
            }
        }

        for (name, table) in &config.platforms {
            let location = format!("platforms.{}", name);
            match name.parse::<Platform>() {
                Ok(platform) => {
                    let table = normalize_table(table, &location, errors);
                    bindings.platforms.entry(platform).or_default().extend(table);
                }
                Err(e) => errors.push(e),
            }
        }

        for (name, table) in &config.terminals {
            let location = format!("terminals.{}", name);
            match name.parse::<Terminal>() {
                Ok(terminal) => {
                    let table = normalize_table(table, &location, errors);
                    bindings.terminals.entry(terminal).or_default().extend(table);
                }
                Err(e) => errors.push(e),
            }
        }

        bindings
    }

    /// Add a global override.
    pub fn bind(&mut self, action: Action, keys: Vec<KeyStroke>) -> &mut Self {
        self.global.insert(action, keys);
        self
    }

    /// Add a context override.
    pub fn bind_in_context(
        &mut self,
        context: Context,
        action: Action,
        keys: Vec<KeyStroke>,
    ) -> &mut Self {
        if context.is_global() {
            return self.bind(action, keys);
        }
        self.contexts.entry(context).or_default().insert(action, keys);
        self
    }

    /// Check if no overrides are configured.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
            && self.contexts.values().all(|t| t.is_empty())
            && self.platforms.values().all(|t| t.is_empty())
            && self.terminals.values().all(|t| t.is_empty())
    }

    /// The user layer for one resolution, in application order: global,
    /// context, platform, terminal.
    pub fn layers(
        &self,
        context: Context,
        platform: Platform,
        terminal: Terminal,
    ) -> [Option<&ActionBindings>; 4] {
        [
            Some(&self.global),
            self.contexts.get(&context),
            self.platforms.get(&platform),
            self.terminals.get(&terminal),
        ]
    }
}

/// Validate the override sections of a configuration.
pub fn validate_key_bindings(config: &UserConfig) -> KeybindResult<()> {
    UserKeyBindings::validate(config).map(|_| ())
}

fn normalize_table(
    table: &RawBindings,
    location: &str,
    errors: &mut Vec<ValidationError>,
) -> ActionBindings {
    let mut bindings = ActionBindings::new();

    for (name, spec) in table {
        let action = match name.parse::<Action>() {
            Ok(action) => action,
            Err(_) => {
                errors.push(ValidationError::UnknownAction {
                    location: location.to_string(),
                    name: name.clone(),
                });
                continue;
            }
        };

        match parse_keystrokes(spec) {
            Ok(keys) if keys.is_empty() => errors.push(ValidationError::EmptyBinding {
                location: location.to_string(),
                action,
            }),
            Ok(keys) => {
                bindings.insert(action, keys);
            }
            Err(source) => errors.push(ValidationError::InvalidKeyStroke {
                location: location.to_string(),
                action: name.clone(),
                source,
            }),
        }
    }

    bindings
}
