//! Keybinding profiles and their validation.

use crate::binding::KeyStroke;
use crate::context::Context;
use crate::error::{KeybindError, KeybindResult, ValidationError};
use crate::keymap::{Action, ActionBindings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Actions the `input` context cannot work without.
pub const REQUIRED_INPUT_ACTIONS: [Action; 4] = [
    Action::MoveToBeginning,
    Action::MoveToEnd,
    Action::DeleteWord,
    Action::ClearLine,
];

/// Actions the `results` context cannot work without.
pub const REQUIRED_RESULTS_ACTIONS: [Action; 2] = [Action::MoveUp, Action::MoveDown];

/// A named keybinding philosophy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Familiar readline-ish keys with arrow navigation
    #[default]
    Default,
    /// Emacs keys, Meta for word commands
    Emacs,
    /// Vi-flavoured navigation with Meta-j/k
    Vi,
    /// GNU readline defaults
    Readline,
}

impl Profile {
    /// Every profile, in declaration (cycling) order.
    pub const ALL: [Profile; 4] = [Self::Default, Self::Emacs, Self::Vi, Self::Readline];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Emacs => "emacs",
            Self::Vi => "vi",
            Self::Readline => "readline",
        }
    }

    /// The profile after this one, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Check whether `name` is a profile name.
    pub fn is_valid(name: &str) -> bool {
        name.parse::<Self>().is_ok()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = KeybindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| KeybindError::InvalidProfile(s.to_string()))
    }
}

/// A complete set of global and per-context bindings.
///
/// Context tables only list what differs from the global table; lookups fall
/// back from the context to `global`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindingProfile {
    /// Profile this table defines
    pub name: Profile,
    /// One-line description for profile listings
    pub description: String,
    /// Bindings that apply in every context
    pub global: ActionBindings,
    /// Per-context bindings for `input`, `results` and `search`
    pub contexts: HashMap<Context, ActionBindings>,
}

impl KeyBindingProfile {
    /// Create a profile with empty tables for every context.
    pub fn new(name: Profile, description: impl Into<String>) -> Self {
        let contexts = Context::ALL
            .into_iter()
            .filter(|c| !c.is_global())
            .map(|c| (c, ActionBindings::new()))
            .collect();

        Self {
            name,
            description: description.into(),
            global: ActionBindings::new(),
            contexts,
        }
    }

    /// Add a global binding.
    pub fn bind(&mut self, action: Action, keys: Vec<KeyStroke>) -> &mut Self {
        self.global.insert(action, keys);
        self
    }

    /// Add a context-specific binding.
    ///
    /// Binding in [`Context::Global`] is the same as [`bind`](Self::bind).
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

    /// The keys for an action in a context, falling back to the global table.
    pub fn get_binding(&self, action: Action, context: Context) -> Option<&[KeyStroke]> {
        self.contexts
            .get(&context)
            .and_then(|table| table.get(&action))
            .or_else(|| self.global.get(&action))
            .map(Vec::as_slice)
    }

    /// The profile layer for a context: global entries overlaid with the
    /// context's own entries.
    pub fn bindings_for_context(&self, context: Context) -> ActionBindings {
        let mut merged = self.global.clone();
        if let Some(table) = self.contexts.get(&context) {
            merged.extend(table.iter().map(|(a, k)| (*a, k.clone())));
        }
        merged
    }

    /// Every validation finding for this profile.
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for context in Context::ALL.into_iter().filter(|c| !c.is_global()) {
            if !self.contexts.contains_key(&context) {
                errors.push(ValidationError::MissingContext {
                    profile: self.name,
                    context,
                });
            }
        }

        let required = [
            (Context::Input, &REQUIRED_INPUT_ACTIONS[..]),
            (Context::Results, &REQUIRED_RESULTS_ACTIONS[..]),
        ];
        for (context, actions) in required {
            if !self.contexts.contains_key(&context) {
                continue;
            }
            for &action in actions {
                if self.get_binding(action, context).is_none() {
                    errors.push(ValidationError::MissingAction {
                        profile: self.name,
                        context,
                        action,
                    });
                }
            }
        }

        let tables = std::iter::once((Context::Global, &self.global)).chain(
            Context::ALL
                .into_iter()
                .filter_map(|c| self.contexts.get(&c).map(|t| (c, t))),
        );
        for (context, table) in tables {
            let location = format!("profile '{}' context '{}'", self.name, context);
            for (action, keys) in table {
                if keys.is_empty() {
                    errors.push(ValidationError::EmptyBinding {
                        location: location.clone(),
                        action: *action,
                    });
                }
                for key in keys.iter().filter(|k| !k.is_valid()) {
                    errors.push(ValidationError::UnusableKeyStroke {
                        location: location.clone(),
                        action: *action,
                        keystroke: format!("{:?}", key),
                    });
                }
            }
        }

        errors
    }

    /// Validate the profile; every finding is reported at once.
    pub fn validate(&self) -> KeybindResult<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(KeybindError::Validation(errors))
        }
    }
}

/// Validate a profile for registration.
pub fn validate_profile(profile: &KeyBindingProfile) -> KeybindResult<()> {
    profile.validate()
}
