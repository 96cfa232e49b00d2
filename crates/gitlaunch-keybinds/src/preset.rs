//! Built-in keybinding profiles.

use crate::binding::KeyStroke;
use crate::context::Context;
use crate::keymap::Action;
use crate::profile::{KeyBindingProfile, Profile};

impl Profile {
    /// Load the built-in table for this profile.
    pub fn builtin(self) -> KeyBindingProfile {
        match self {
            Self::Default => default_profile(),
            Self::Emacs => emacs_profile(),
            Self::Vi => vi_profile(),
            Self::Readline => readline_profile(),
        }
    }
}

/// All built-in profiles, in declaration order.
pub fn builtin_profiles() -> Vec<KeyBindingProfile> {
    Profile::ALL.into_iter().map(Profile::builtin).collect()
}

/// Line-editing keys shared by the default, vi and readline profiles.
fn bind_readline_input(profile: &mut KeyBindingProfile) {
    profile
        .bind_in_context(Context::Input, Action::MoveToBeginning, vec![KeyStroke::ctrl('a')])
        .bind_in_context(Context::Input, Action::MoveToEnd, vec![KeyStroke::ctrl('e')])
        .bind_in_context(Context::Input, Action::DeleteWord, vec![KeyStroke::ctrl('w')])
        .bind_in_context(Context::Input, Action::ClearLine, vec![KeyStroke::ctrl('u')])
        .bind_in_context(Context::Input, Action::DeleteToEnd, vec![KeyStroke::ctrl('k')]);
}

/// Workflow keys in the results list, common to every profile.
fn bind_workflow(profile: &mut KeyBindingProfile) {
    profile
        .bind_in_context(Context::Results, Action::AddToWorkflow, vec![KeyStroke::tab()])
        .bind_in_context(
            Context::Results,
            Action::ToggleWorkflowView,
            vec![KeyStroke::ctrl('t')],
        )
        .bind_in_context(Context::Results, Action::ClearWorkflow, vec![KeyStroke::ctrl('x')]);
}

/// Arrow-first keys, readline line editing.
fn default_profile() -> KeyBindingProfile {
    let mut profile = KeyBindingProfile::new(
        Profile::Default,
        "Arrow keys for navigation, readline keys for editing",
    );

    profile
        .bind(Action::SoftCancel, vec![KeyStroke::esc()])
        .bind(Action::Cancel, vec![KeyStroke::ctrl('c')])
        .bind(Action::Accept, vec![KeyStroke::enter()]);

    bind_readline_input(&mut profile);

    profile
        .bind_in_context(
            Context::Results,
            Action::MoveUp,
            vec![KeyStroke::up(), KeyStroke::ctrl('p')],
        )
        .bind_in_context(
            Context::Results,
            Action::MoveDown,
            vec![KeyStroke::down(), KeyStroke::ctrl('n')],
        );
    bind_workflow(&mut profile);

    profile
        .bind_in_context(Context::Search, Action::MoveUp, vec![KeyStroke::up()])
        .bind_in_context(Context::Search, Action::MoveDown, vec![KeyStroke::down()])
        .bind_in_context(Context::Search, Action::DeleteWord, vec![KeyStroke::ctrl('w')])
        .bind_in_context(Context::Search, Action::ClearLine, vec![KeyStroke::ctrl('u')]);

    profile
}

/// Emacs keys: Meta-d kills words, C-g quits the current view.
fn emacs_profile() -> KeyBindingProfile {
    let mut profile =
        KeyBindingProfile::new(Profile::Emacs, "Emacs keys: C-p/C-n, M-d, C-g");

    profile
        .bind(Action::SoftCancel, vec![KeyStroke::ctrl('g')])
        .bind(Action::Cancel, vec![KeyStroke::ctrl('c')])
        .bind(Action::Accept, vec![KeyStroke::enter()]);

    profile
        .bind_in_context(Context::Input, Action::MoveToBeginning, vec![KeyStroke::ctrl('a')])
        .bind_in_context(Context::Input, Action::MoveToEnd, vec![KeyStroke::ctrl('e')])
        .bind_in_context(Context::Input, Action::DeleteWord, vec![KeyStroke::alt('d')])
        .bind_in_context(Context::Input, Action::ClearLine, vec![KeyStroke::ctrl('u')])
        .bind_in_context(Context::Input, Action::DeleteToEnd, vec![KeyStroke::ctrl('k')]);

    profile
        .bind_in_context(
            Context::Results,
            Action::MoveUp,
            vec![KeyStroke::ctrl('p'), KeyStroke::up()],
        )
        .bind_in_context(
            Context::Results,
            Action::MoveDown,
            vec![KeyStroke::ctrl('n'), KeyStroke::down()],
        );
    bind_workflow(&mut profile);

    profile
        .bind_in_context(Context::Search, Action::MoveUp, vec![KeyStroke::ctrl('p')])
        .bind_in_context(Context::Search, Action::MoveDown, vec![KeyStroke::ctrl('n')])
        .bind_in_context(Context::Search, Action::DeleteWord, vec![KeyStroke::alt('d')]);

    profile
}

/// Vi-flavoured: Meta-k/Meta-j walk the results.
fn vi_profile() -> KeyBindingProfile {
    let mut profile = KeyBindingProfile::new(Profile::Vi, "Vi navigation: M-k/M-j, Esc");

    profile
        .bind(Action::SoftCancel, vec![KeyStroke::esc()])
        .bind(Action::Cancel, vec![KeyStroke::ctrl('c')])
        .bind(Action::Accept, vec![KeyStroke::enter()]);

    bind_readline_input(&mut profile);

    profile
        .bind_in_context(
            Context::Results,
            Action::MoveUp,
            vec![KeyStroke::alt('k'), KeyStroke::up()],
        )
        .bind_in_context(
            Context::Results,
            Action::MoveDown,
            vec![KeyStroke::alt('j'), KeyStroke::down()],
        );
    bind_workflow(&mut profile);

    profile
        .bind_in_context(Context::Search, Action::MoveUp, vec![KeyStroke::alt('k')])
        .bind_in_context(Context::Search, Action::MoveDown, vec![KeyStroke::alt('j')]);

    profile
}

/// GNU readline defaults.
fn readline_profile() -> KeyBindingProfile {
    let mut profile =
        KeyBindingProfile::new(Profile::Readline, "GNU readline: C-a, C-e, C-w, C-u, C-k");

    profile
        .bind(Action::SoftCancel, vec![KeyStroke::ctrl('g')])
        .bind(Action::Cancel, vec![KeyStroke::ctrl('c')])
        .bind(Action::Accept, vec![KeyStroke::enter()]);

    bind_readline_input(&mut profile);

    profile
        .bind_in_context(
            Context::Results,
            Action::MoveUp,
            vec![KeyStroke::ctrl('p'), KeyStroke::up()],
        )
        .bind_in_context(
            Context::Results,
            Action::MoveDown,
            vec![KeyStroke::ctrl('n'), KeyStroke::down()],
        );
    bind_workflow(&mut profile);

    profile
        .bind_in_context(Context::Search, Action::MoveUp, vec![KeyStroke::ctrl('p')])
        .bind_in_context(Context::Search, Action::MoveDown, vec![KeyStroke::ctrl('n')]);

    profile
}
