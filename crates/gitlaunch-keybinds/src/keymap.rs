//! Actions and the resolved keymap.

use crate::binding::KeyStroke;
use crate::error::KeybindError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix of the per-action environment override variables.
pub const ENV_PREFIX: &str = "GITLAUNCH_KEY_";

/// An editing, navigation or workflow action of the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    DeleteWord,
    ClearLine,
    DeleteToEnd,
    MoveToBeginning,
    MoveToEnd,
    MoveUp,
    MoveDown,
    AddToWorkflow,
    ToggleWorkflowView,
    ClearWorkflow,
    SoftCancel,
    Cancel,
    Accept,
}

impl Action {
    /// Number of actions.
    pub const COUNT: usize = 13;

    /// Every action, in declaration order.
    pub const ALL: [Action; Self::COUNT] = [
        Self::DeleteWord,
        Self::ClearLine,
        Self::DeleteToEnd,
        Self::MoveToBeginning,
        Self::MoveToEnd,
        Self::MoveUp,
        Self::MoveDown,
        Self::AddToWorkflow,
        Self::ToggleWorkflowView,
        Self::ClearWorkflow,
        Self::SoftCancel,
        Self::Cancel,
        Self::Accept,
    ];

    /// Configuration name of the action.
    pub fn name(self) -> &'static str {
        match self {
            Self::DeleteWord => "delete_word",
            Self::ClearLine => "clear_line",
            Self::DeleteToEnd => "delete_to_end",
            Self::MoveToBeginning => "move_to_beginning",
            Self::MoveToEnd => "move_to_end",
            Self::MoveUp => "move_up",
            Self::MoveDown => "move_down",
            Self::AddToWorkflow => "add_to_workflow",
            Self::ToggleWorkflowView => "toggle_workflow_view",
            Self::ClearWorkflow => "clear_workflow",
            Self::SoftCancel => "soft_cancel",
            Self::Cancel => "cancel",
            Self::Accept => "accept",
        }
    }

    /// Description for the help screen.
    pub fn description(self) -> &'static str {
        match self {
            Self::DeleteWord => "Delete the word before the cursor",
            Self::ClearLine => "Clear the query line",
            Self::DeleteToEnd => "Delete from the cursor to the end of the line",
            Self::MoveToBeginning => "Move the cursor to the beginning of the line",
            Self::MoveToEnd => "Move the cursor to the end of the line",
            Self::MoveUp => "Select the previous result",
            Self::MoveDown => "Select the next result",
            Self::AddToWorkflow => "Add the selected command to the workflow",
            Self::ToggleWorkflowView => "Show or hide the workflow panel",
            Self::ClearWorkflow => "Remove every command from the workflow",
            Self::SoftCancel => "Leave the current view without quitting",
            Self::Cancel => "Quit the launcher",
            Self::Accept => "Run the selected command",
        }
    }

    /// Name of the environment variable overriding this action.
    pub fn env_var(self) -> String {
        format!("{}{}", ENV_PREFIX, self.name().to_ascii_uppercase())
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = KeybindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| KeybindError::UnknownAction(s.to_string()))
    }
}

/// A partial action table, as authored by a profile or an override layer.
pub type ActionBindings = BTreeMap<Action, Vec<KeyStroke>>;

/// The effective bindings of one context: every action, each with an ordered
/// key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindingMap {
    bindings: [Vec<KeyStroke>; Action::COUNT],
}

impl Default for KeyBindingMap {
    fn default() -> Self {
        Self::empty()
    }
}

impl KeyBindingMap {
    /// A map with no keys bound.
    pub fn empty() -> Self {
        Self {
            bindings: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// The legacy bindings every resolution starts from.
    pub fn builtin_defaults() -> Self {
        let mut map = Self::empty();
        map.set(Action::DeleteWord, vec![KeyStroke::ctrl('w')]);
        map.set(Action::ClearLine, vec![KeyStroke::ctrl('u')]);
        map.set(Action::DeleteToEnd, vec![KeyStroke::ctrl('k')]);
        map.set(Action::MoveToBeginning, vec![KeyStroke::ctrl('a')]);
        map.set(Action::MoveToEnd, vec![KeyStroke::ctrl('e')]);
        map.set(Action::MoveUp, vec![KeyStroke::up(), KeyStroke::ctrl('p')]);
        map.set(Action::MoveDown, vec![KeyStroke::down(), KeyStroke::ctrl('n')]);
        map.set(Action::AddToWorkflow, vec![KeyStroke::tab()]);
        map.set(Action::ToggleWorkflowView, vec![KeyStroke::ctrl('t')]);
        map.set(Action::ClearWorkflow, vec![KeyStroke::ctrl('x')]);
        map.set(Action::SoftCancel, vec![KeyStroke::esc()]);
        map.set(Action::Cancel, vec![KeyStroke::ctrl('c')]);
        map.set(Action::Accept, vec![KeyStroke::enter()]);
        map
    }

    /// Keys bound to an action, in priority order.
    pub fn get(&self, action: Action) -> &[KeyStroke] {
        &self.bindings[action.index()]
    }

    /// Replace the keys bound to an action.
    pub fn set(&mut self, action: Action, keys: Vec<KeyStroke>) {
        self.bindings[action.index()] = keys;
    }

    /// Replace every action present in `layer`, leaving the others untouched.
    ///
    /// Returns the actions that were replaced.
    pub fn apply(&mut self, layer: &ActionBindings) -> Vec<Action> {
        layer
            .iter()
            .map(|(action, keys)| {
                self.set(*action, keys.clone());
                *action
            })
            .collect()
    }

    /// Iterate over all actions and their keys, in action order.
    pub fn iter(&self) -> impl Iterator<Item = (Action, &[KeyStroke])> {
        Action::ALL
            .into_iter()
            .map(move |action| (action, self.get(action)))
    }

    /// The first action bound to a keystroke.
    pub fn get_action(&self, key: &KeyStroke) -> Option<Action> {
        self.iter()
            .find(|(_, keys)| keys.contains(key))
            .map(|(action, _)| action)
    }

    /// The first action whose keystroke encodes exactly to `input`.
    pub fn action_for_bytes(&self, input: &[u8]) -> Option<Action> {
        self.iter()
            .find(|(_, keys)| {
                keys.iter()
                    .any(|k| k.to_bytes().as_deref() == Some(input))
            })
            .map(|(action, _)| action)
    }

    /// Plain action name to keystroke list mapping.
    pub fn to_effective(&self) -> BTreeMap<String, Vec<KeyStroke>> {
        self.iter()
            .map(|(action, keys)| (action.name().to_string(), keys.to_vec()))
            .collect()
    }

    /// Action name to comma-joined notation (`"ctrl+w, alt+backspace"`).
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(action, keys)| {
                let joined = keys
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                (action.name().to_string(), joined)
            })
            .collect()
    }
}
