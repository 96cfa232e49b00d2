//! Runtime profile switching and per-keystroke dispatch.

use crate::binding::KeyStroke;
use crate::config::{UserConfig, UserKeyBindings};
use crate::context::{Context, ContextManager};
use crate::error::{KeybindError, KeybindResult, ValidationError};
use crate::keymap::{Action, KeyBindingMap};
use crate::profile::Profile;
use crate::resolver::KeyBindingResolver;
use crossterm::event::KeyEvent;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Listener invoked with `(old, new)` after a profile switch.
pub type SwitchCallback = Box<dyn FnMut(Profile, Profile) + Send>;

/// Owns the resolver and the UI context for one session and tracks the
/// active profile.
pub struct ProfileSwitcher {
    resolver: KeyBindingResolver,
    context: ContextManager,
    active: Profile,
    callbacks: Vec<SwitchCallback>,
}

impl ProfileSwitcher {
    /// Start a session on `initial`, which must be registered.
    pub fn new(resolver: KeyBindingResolver, initial: Profile) -> KeybindResult<Self> {
        if !resolver.is_registered(initial) {
            return Err(KeybindError::ProfileNotFound(initial));
        }

        Ok(Self {
            resolver,
            context: ContextManager::new(),
            active: initial,
            callbacks: Vec::new(),
        })
    }

    /// Apply a user configuration and start on the profile it selects.
    ///
    /// Custom profiles must validate, and the selected profile must resolve
    /// without conflicts in every context. Malformed override entries are
    /// skipped and returned.
    pub fn activate(
        mut resolver: KeyBindingResolver,
        config: &UserConfig,
    ) -> KeybindResult<(Self, Vec<ValidationError>)> {
        let skipped = apply_config(&mut resolver, config)?;
        let initial = config.selected_profile()?.unwrap_or_default();
        check_profile(&mut resolver, initial)?;

        info!(profile = %initial, "activated keybinding profile");
        Ok((Self::new(resolver, initial)?, skipped))
    }

    /// [`activate`](Self::activate) on a resolver with the built-in profiles.
    pub fn from_config(config: &UserConfig) -> KeybindResult<(Self, Vec<ValidationError>)> {
        Self::activate(KeyBindingResolver::with_builtin_profiles(), config)
    }

    /// The active profile.
    pub fn active(&self) -> Profile {
        self.active
    }

    pub fn resolver(&self) -> &KeyBindingResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut KeyBindingResolver {
        &mut self.resolver
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// The context manager, for UI transitions.
    pub fn context_mut(&mut self) -> &mut ContextManager {
        &mut self.context
    }

    /// Register a callback fired after every profile switch.
    pub fn on_switch<F>(&mut self, callback: F)
    where
        F: FnMut(Profile, Profile) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Switch to a profile by name.
    pub fn switch_profile(&mut self, name: &str) -> KeybindResult<()> {
        let profile = name.parse::<Profile>()?;
        self.switch_to(profile)
    }

    /// Switch to a registered profile.
    ///
    /// Switching to the active profile does nothing.
    pub fn switch_to(&mut self, profile: Profile) -> KeybindResult<()> {
        if !self.resolver.is_registered(profile) {
            return Err(KeybindError::ProfileNotFound(profile));
        }
        if profile == self.active {
            return Ok(());
        }

        let old = self.active;
        self.resolver.clear_cache();
        self.active = profile;
        info!(from = %old, to = %profile, "switched keybinding profile");

        for callback in self.callbacks.iter_mut() {
            callback(old, profile);
        }
        Ok(())
    }

    /// Advance to the next registered profile, wrapping around.
    pub fn cycle_profile(&mut self) -> KeybindResult<Profile> {
        let mut next = self.active.next();
        while next != self.active && !self.resolver.is_registered(next) {
            next = next.next();
        }
        self.switch_to(next)?;
        Ok(next)
    }

    /// The effective map for the active profile in the current context.
    pub fn current_bindings(&mut self) -> KeybindResult<Arc<KeyBindingMap>> {
        self.resolver.resolve(self.active, self.context.current())
    }

    /// The action bound to the raw bytes of one keystroke.
    pub fn action_for_input(&mut self, input: &[u8]) -> KeybindResult<Option<Action>> {
        Ok(self.current_bindings()?.action_for_bytes(input))
    }

    /// The action bound to a crossterm key event.
    pub fn action_for_event(&mut self, event: &KeyEvent) -> KeybindResult<Option<Action>> {
        let Some(key) = KeyStroke::from_key_event(event) else {
            return Ok(None);
        };
        Ok(self.current_bindings()?.get_action(&key))
    }

    /// Replace the user configuration.
    ///
    /// If the new configuration has invalid profiles, or leaves the active
    /// profile with conflicts, the previous configuration stays in effect.
    pub fn reload_config(&mut self, config: &UserConfig) -> KeybindResult<Vec<ValidationError>> {
        let snapshot = self.resolver.snapshot();

        let result = apply_config(&mut self.resolver, config).and_then(|skipped| {
            check_profile(&mut self.resolver, self.active)?;
            Ok(skipped)
        });

        match result {
            Ok(skipped) => {
                info!(profile = %self.active, skipped = skipped.len(), "reloaded keybinding config");
                Ok(skipped)
            }
            Err(error) => {
                debug!(%error, "keybinding config rejected, keeping previous");
                self.resolver.restore(snapshot);
                Err(error)
            }
        }
    }
}

fn apply_config(
    resolver: &mut KeyBindingResolver,
    config: &UserConfig,
) -> KeybindResult<Vec<ValidationError>> {
    for profile in config.custom_profiles()? {
        resolver.register_profile(profile)?;
    }
    let (user, skipped) = UserKeyBindings::from_config(config);
    resolver.set_user_bindings(user);
    Ok(skipped)
}

fn check_profile(resolver: &mut KeyBindingResolver, profile: Profile) -> KeybindResult<()> {
    for context in Context::ALL {
        resolver.resolve_checked(profile, context)?;
    }
    Ok(())
}

impl fmt::Debug for ProfileSwitcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileSwitcher")
            .field("active", &self.active)
            .field("context", &self.context)
            .field("resolver", &self.resolver)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Platform, Terminal};
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn resolver() -> KeyBindingResolver {
        KeyBindingResolver::with_builtin_profiles()
            .with_environment(Platform::Linux, Terminal::Xterm)
            .with_env_lookup(HashMap::<String, String>::new())
    }

    fn switcher() -> ProfileSwitcher {
        ProfileSwitcher::new(resolver(), Profile::Default).unwrap()
    }

    #[test]
    fn test_initial_profile_must_be_registered() {
        let empty = KeyBindingResolver::new();
        assert!(matches!(
            ProfileSwitcher::new(empty, Profile::Vi),
            Err(KeybindError::ProfileNotFound(Profile::Vi))
        ));
    }

    #[test]
    fn test_switch_notifies_and_clears_cache() {
        let mut switcher = switcher();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        switcher.on_switch(move |old, new| sink.lock().unwrap().push((old, new)));

        switcher.current_bindings().unwrap();
        assert_eq!(switcher.resolver().cache_len(), 1);

        switcher.switch_profile("emacs").unwrap();
        assert_eq!(switcher.active(), Profile::Emacs);
        assert_eq!(switcher.resolver().cache_len(), 0);
        assert_eq!(*log.lock().unwrap(), vec![(Profile::Default, Profile::Emacs)]);

        // same profile again is a no-op
        switcher.switch_to(Profile::Emacs).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_switch_errors() {
        let mut switcher = switcher();
        assert!(matches!(
            switcher.switch_profile("nano"),
            Err(KeybindError::InvalidProfile(_))
        ));

        let mut partial = KeyBindingResolver::new();
        partial.register_profile(Profile::Default.builtin()).unwrap();
        let mut switcher = ProfileSwitcher::new(partial, Profile::Default).unwrap();
        assert!(matches!(
            switcher.switch_to(Profile::Vi),
            Err(KeybindError::ProfileNotFound(Profile::Vi))
        ));
        assert_eq!(switcher.active(), Profile::Default);
    }

    #[test]
    fn test_cycle_wraps() {
        let mut switcher = switcher();
        let seen: Vec<Profile> = (0..4).map(|_| switcher.cycle_profile().unwrap()).collect();
        assert_eq!(
            seen,
            vec![Profile::Emacs, Profile::Vi, Profile::Readline, Profile::Default]
        );
    }

    #[test]
    fn test_cycle_skips_unregistered() {
        let mut partial = KeyBindingResolver::new();
        partial.register_profile(Profile::Default.builtin()).unwrap();
        partial.register_profile(Profile::Readline.builtin()).unwrap();
        let mut switcher = ProfileSwitcher::new(partial, Profile::Default).unwrap();

        assert_eq!(switcher.cycle_profile().unwrap(), Profile::Readline);
        assert_eq!(switcher.cycle_profile().unwrap(), Profile::Default);
    }

    #[test]
    fn test_dispatch_follows_context() {
        let mut switcher = switcher();
        switcher.switch_to(Profile::Vi).unwrap();

        let alt_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::ALT);
        assert_eq!(switcher.action_for_event(&alt_j).unwrap(), None);

        switcher.context_mut().enter_context(Context::Results);
        assert_eq!(
            switcher.action_for_event(&alt_j).unwrap(),
            Some(Action::MoveDown)
        );
        assert_eq!(switcher.action_for_input(b"\x1bj").unwrap(), Some(Action::MoveDown));
        assert_eq!(switcher.action_for_input(b"\t").unwrap(), Some(Action::AddToWorkflow));

        let plain = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(switcher.action_for_event(&plain).unwrap(), None);
    }

    #[test]
    fn test_activate_from_config() {
        let config = UserConfig::from_toml_str(
            r#"
profile = "readline"

[global]
accept = "ctrl+j"
cancel = "hyper+c"
"#,
        )
        .unwrap();

        let (mut switcher, skipped) = ProfileSwitcher::activate(resolver(), &config).unwrap();
        assert_eq!(switcher.active(), Profile::Readline);
        assert_eq!(skipped.len(), 1);
        assert_eq!(
            switcher.current_bindings().unwrap().get(Action::Accept),
            &[KeyStroke::ctrl('j')]
        );
    }

    #[test]
    fn test_activate_rejects_conflicts() {
        let config = UserConfig::from_toml_str(
            r#"
[contexts.results]
clear_workflow = "tab"
"#,
        )
        .unwrap();

        assert!(matches!(
            ProfileSwitcher::activate(resolver(), &config),
            Err(KeybindError::Conflicts(_))
        ));
    }

    #[test]
    fn test_reload_rolls_back_on_conflict() {
        let mut switcher = switcher();
        let good = UserConfig::from_toml_str("[global]\naccept = \"ctrl+j\"").unwrap();
        switcher.reload_config(&good).unwrap();

        let bad = UserConfig::from_toml_str("[global]\nclear_line = \"ctrl+w\"").unwrap();
        assert!(matches!(
            switcher.reload_config(&bad),
            Err(KeybindError::Conflicts(_))
        ));

        switcher.context_mut().enter_context(Context::Input);
        let map = switcher.current_bindings().unwrap();
        assert_eq!(map.get(Action::Accept), &[KeyStroke::ctrl('j')]);
        assert_eq!(map.get(Action::ClearLine), &[KeyStroke::ctrl('u')]);
    }

    #[test]
    fn test_reload_rolls_back_on_invalid_profile() {
        let mut switcher = switcher();
        let good = UserConfig::from_toml_str(
            r#"
[profiles.vi]
description = "my vi"

[profiles.vi.contexts.input]
move_to_beginning = "ctrl+a"
move_to_end = "ctrl+e"
delete_word = "ctrl+w"
clear_line = "ctrl+u"

[profiles.vi.contexts.results]
move_up = "alt+k"
move_down = "alt+j"

[profiles.vi.contexts.search]
"#,
        )
        .unwrap();
        switcher.reload_config(&good).unwrap();

        let bad = UserConfig::from_toml_str(
            r#"
[global]
accept = "ctrl+j"

[profiles.vi.contexts.input]
move_to_beginning = "ctrl+a"
"#,
        )
        .unwrap();
        assert!(matches!(
            switcher.reload_config(&bad),
            Err(KeybindError::Validation(_))
        ));

        let vi = switcher.resolver().profile(Profile::Vi).unwrap();
        assert_eq!(vi.description, "my vi");
        assert!(vi.validate().is_ok());
        assert!(switcher.resolver().user_bindings().is_empty());
        assert_eq!(
            switcher.current_bindings().unwrap().get(Action::Accept),
            &[KeyStroke::enter()]
        );
    }

    #[test]
    fn test_switcher_moves_across_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<ProfileSwitcher>();

        let shared = Mutex::new(switcher());
        std::thread::scope(|scope| {
            scope.spawn(|| shared.lock().unwrap().switch_to(Profile::Emacs).unwrap());
        });
        assert_eq!(shared.lock().unwrap().active(), Profile::Emacs);
    }
}
