//! Conflict detection for resolved keymaps.

use crate::binding::KeyStroke;
use crate::context::Context;
use crate::keymap::{Action, KeyBindingMap};
use std::collections::BTreeMap;

/// One keystroke bound to more than one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The shared keystroke
    pub keystroke: KeyStroke,
    /// Every action bound to it, each once, in action order
    pub actions: Vec<Action>,
    /// The context of the map the conflict was found in
    pub context: Option<Context>,
}

impl Conflict {
    /// Create a conflict with no actions yet.
    pub fn new(keystroke: KeyStroke, context: Option<Context>) -> Self {
        Self {
            keystroke,
            actions: Vec::new(),
            context,
        }
    }

    /// Add an action to the conflict.
    pub fn add_action(&mut self, action: Action) {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|a| a.name()).collect();
        write!(
            f,
            "keystroke {} assigned to: [{}]",
            self.keystroke,
            actions.join(", ")
        )
    }
}

/// Report of all conflicts found in one or more maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictReport {
    /// All detected conflicts
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// Create an empty conflict report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conflict to the report.
    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    /// Append every conflict of another report.
    pub fn extend(&mut self, other: ConflictReport) {
        self.conflicts.extend(other.conflicts);
    }

    /// Check if there are any conflicts.
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }

    /// Conflict messages, one per line.
    pub fn messages(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.to_string()).collect()
    }
}

impl std::fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No conflicts detected");
        }

        let lines: Vec<String> = self
            .conflicts
            .iter()
            .map(|conflict| match conflict.context {
                Some(context) => format!("[{}] {}", context, conflict),
                None => conflict.to_string(),
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Find every keystroke shared by two or more actions.
///
/// Keystrokes are compared structurally, so `alt+d` and `alt+delete` never
/// collide even though both mention a "d".
pub fn detect_conflicts(map: &KeyBindingMap) -> ConflictReport {
    detect(map, None)
}

/// Like [`detect_conflicts`], tagging each conflict with its context.
pub fn detect_conflicts_in(map: &KeyBindingMap, context: Context) -> ConflictReport {
    detect(map, Some(context))
}

fn detect(map: &KeyBindingMap, context: Option<Context>) -> ConflictReport {
    let mut by_key: BTreeMap<&KeyStroke, Vec<Action>> = BTreeMap::new();

    for (action, keys) in map.iter() {
        for key in keys {
            let actions = by_key.entry(key).or_default();
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
    }

    let mut report = ConflictReport::new();
    for (key, actions) in by_key {
        if actions.len() > 1 {
            let mut conflict = Conflict::new(key.clone(), context);
            for action in actions {
                conflict.add_action(action);
            }
            report.add(conflict);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::AltKey;

    #[test]
    fn test_defaults_have_no_conflicts() {
        let report = detect_conflicts(&KeyBindingMap::builtin_defaults());
        assert!(!report.has_conflicts());
        assert_eq!(report.to_string(), "No conflicts detected");
    }

    #[test]
    fn test_shared_key_reported_once_with_both_actions() {
        let mut map = KeyBindingMap::builtin_defaults();
        map.set(Action::ClearWorkflow, vec![KeyStroke::ctrl('w')]);

        let report = detect_conflicts(&map);

        assert_eq!(report.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.keystroke, KeyStroke::ctrl('w'));
        assert_eq!(conflict.actions, vec![Action::DeleteWord, Action::ClearWorkflow]);
        insta::assert_snapshot!(
            conflict.to_string(),
            @"keystroke ctrl+w assigned to: [delete_word, clear_workflow]"
        );
    }

    #[test]
    fn test_duplicate_key_within_one_action_is_not_a_conflict() {
        let mut map = KeyBindingMap::builtin_defaults();
        map.set(Action::DeleteWord, vec![KeyStroke::ctrl('w'), KeyStroke::ctrl('w')]);
        assert!(detect_conflicts(&map).is_empty());
    }

    #[test]
    fn test_structural_keys_do_not_collide() {
        let mut map = KeyBindingMap::empty();
        map.set(Action::DeleteWord, vec![KeyStroke::alt('d')]);
        map.set(Action::DeleteToEnd, vec![KeyStroke::alt_key(AltKey::Delete)]);
        map.set(Action::AddToWorkflow, vec![KeyStroke::tab()]);
        map.set(Action::MoveDown, vec![KeyStroke::ctrl('i')]);

        assert!(detect_conflicts(&map).is_empty());
    }

    #[test]
    fn test_three_way_conflict_with_context() {
        let mut map = KeyBindingMap::empty();
        map.set(Action::MoveUp, vec![KeyStroke::up()]);
        map.set(Action::MoveDown, vec![KeyStroke::up()]);
        map.set(Action::Accept, vec![KeyStroke::enter(), KeyStroke::up()]);

        let report = detect_conflicts_in(&map, Context::Results);
        assert_eq!(report.len(), 1);
        insta::assert_snapshot!(
            report.to_string(),
            @"[results] keystroke up assigned to: [move_up, move_down, accept]"
        );
    }

    #[test]
    fn test_conflicts_ordered_by_keystroke() {
        let mut map = KeyBindingMap::empty();
        map.set(Action::DeleteWord, vec![KeyStroke::ctrl('w'), KeyStroke::alt('d')]);
        map.set(Action::ClearLine, vec![KeyStroke::alt('d'), KeyStroke::ctrl('w')]);

        let report = detect_conflicts(&map);
        let keys: Vec<_> = report.iter().map(|c| c.keystroke.clone()).collect();
        assert_eq!(keys, vec![KeyStroke::ctrl('w'), KeyStroke::alt('d')]);
        assert_eq!(
            report.messages(),
            vec![
                "keystroke ctrl+w assigned to: [delete_word, clear_line]".to_string(),
                "keystroke alt+d assigned to: [delete_word, clear_line]".to_string(),
            ]
        );
    }
}
