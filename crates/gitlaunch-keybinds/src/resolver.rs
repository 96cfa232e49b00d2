//! Layered keybinding resolution.
//!
//! A resolved map is built from six layers, each replacing the previous one
//! per action:
//!
//! 1. built-in defaults
//! 2. the profile's table for the context, falling back to its global table
//! 3. the platform layer
//! 4. the terminal layer
//! 5. user configuration: global, context, platform, terminal sections
//! 6. `GITLAUNCH_KEY_<ACTION>` environment variables
//!
//! Results are cached per `profile:context:platform:terminal` until
//! [`KeyBindingResolver::clear_cache`].

use crate::binding::KeyStroke;
use crate::config::UserKeyBindings;
use crate::conflict::{detect_conflicts_in, ConflictReport};
use crate::context::Context;
use crate::error::{KeybindError, KeybindResult};
use crate::keymap::{Action, ActionBindings, KeyBindingMap};
use crate::parser::{parse_keystrokes, BindingSpec};
use crate::platform::{EnvLookup, Platform, ProcessEnv, Terminal};
use crate::preset::builtin_profiles;
use crate::profile::{KeyBindingProfile, Profile};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One stage of the resolution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Profile,
    Platform,
    Terminal,
    User,
    Environment,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Profile => "profile",
            Self::Platform => "platform",
            Self::Terminal => "terminal",
            Self::User => "user",
            Self::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Resolved maps for every context of one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualKeyBindingMap {
    pub profile: Profile,
    pub platform: Platform,
    pub terminal: Terminal,
    pub contexts: BTreeMap<Context, Arc<KeyBindingMap>>,
}

impl ContextualKeyBindingMap {
    /// The map for a context.
    pub fn get(&self, context: Context) -> Option<&KeyBindingMap> {
        self.contexts.get(&context).map(Arc::as_ref)
    }

    /// Conflicts across all contexts, tagged with their context.
    pub fn conflicts(&self) -> ConflictReport {
        let mut report = ConflictReport::new();
        for (context, map) in &self.contexts {
            report.extend(detect_conflicts_in(map, *context));
        }
        report
    }
}

/// Registered profiles and user layer, saved for rollback.
pub(crate) struct RegistrySnapshot {
    profiles: HashMap<Profile, KeyBindingProfile>,
    user: UserKeyBindings,
}

/// Merges defaults, profiles, environment adjustments and user overrides
/// into effective keymaps.
pub struct KeyBindingResolver {
    profiles: HashMap<Profile, KeyBindingProfile>,
    platform: Platform,
    terminal: Terminal,
    user: UserKeyBindings,
    env: Box<dyn EnvLookup>,
    cache: HashMap<String, Arc<KeyBindingMap>>,
}

impl KeyBindingResolver {
    /// Create a resolver for the running process with no profiles registered.
    pub fn new() -> Self {
        let platform = Platform::detect();
        let terminal = Terminal::detect(&ProcessEnv);
        debug!(%platform, %terminal, "detected keybinding environment");

        Self {
            profiles: HashMap::new(),
            platform,
            terminal,
            user: UserKeyBindings::default(),
            env: Box::new(ProcessEnv),
            cache: HashMap::new(),
        }
    }

    /// Create a resolver with the four built-in profiles registered.
    pub fn with_builtin_profiles() -> Self {
        let mut resolver = Self::new();
        resolver.profiles = builtin_profiles()
            .into_iter()
            .map(|profile| (profile.name, profile))
            .collect();
        resolver
    }

    /// Override the detected platform and terminal.
    pub fn with_environment(mut self, platform: Platform, terminal: Terminal) -> Self {
        self.platform = platform;
        self.terminal = terminal;
        self.cache.clear();
        self
    }

    /// Read environment overrides from `env` instead of the process.
    pub fn with_env_lookup(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Box::new(env);
        self.cache.clear();
        self
    }

    /// Use `user` as the user configuration layer.
    pub fn with_user_bindings(mut self, user: UserKeyBindings) -> Self {
        self.set_user_bindings(user);
        self
    }

    /// Register a profile, replacing any profile of the same name.
    ///
    /// The profile is validated first; an invalid profile is rejected as a
    /// whole and the registry is left untouched.
    pub fn register_profile(&mut self, profile: KeyBindingProfile) -> KeybindResult<()> {
        profile.validate()?;
        debug!(profile = %profile.name, "registered keybinding profile");
        self.profiles.insert(profile.name, profile);
        self.clear_cache();
        Ok(())
    }

    /// A registered profile.
    pub fn profile(&self, name: Profile) -> Option<&KeyBindingProfile> {
        self.profiles.get(&name)
    }

    pub fn is_registered(&self, name: Profile) -> bool {
        self.profiles.contains_key(&name)
    }

    /// Registered profiles in declaration order.
    pub fn registered_profiles(&self) -> Vec<Profile> {
        Profile::ALL
            .into_iter()
            .filter(|p| self.profiles.contains_key(p))
            .collect()
    }

    /// Replace the user configuration layer.
    pub fn set_user_bindings(&mut self, user: UserKeyBindings) {
        self.user = user;
        self.clear_cache();
    }

    pub fn user_bindings(&self) -> &UserKeyBindings {
        &self.user
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn terminal(&self) -> Terminal {
        self.terminal
    }

    /// Drop every cached map.
    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            debug!(entries = self.cache.len(), "cleared keymap cache");
        }
        self.cache.clear();
    }

    /// Number of cached maps.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            profiles: self.profiles.clone(),
            user: self.user.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: RegistrySnapshot) {
        self.profiles = snapshot.profiles;
        self.user = snapshot.user;
        self.clear_cache();
    }

    fn cache_key(&self, profile: Profile, context: Context) -> String {
        format!("{}:{}:{}:{}", profile, context, self.platform, self.terminal)
    }

    /// The effective map for a profile in a context.
    ///
    /// Repeated calls return the same `Arc` until the cache is cleared.
    /// Environment overrides are read when the map is built, not on hits.
    pub fn resolve(
        &mut self,
        profile: Profile,
        context: Context,
    ) -> KeybindResult<Arc<KeyBindingMap>> {
        let key = self.cache_key(profile, context);
        if let Some(map) = self.cache.get(&key) {
            trace!(%key, "keymap cache hit");
            return Ok(Arc::clone(map));
        }

        trace!(%key, "keymap cache miss");
        let map = Arc::new(self.build(profile, context)?);
        self.cache.insert(key, Arc::clone(&map));
        Ok(map)
    }

    /// [`resolve`](Self::resolve) with profile and context given by name.
    pub fn resolve_by_name(
        &mut self,
        profile: &str,
        context: &str,
    ) -> KeybindResult<Arc<KeyBindingMap>> {
        let profile = profile.parse::<Profile>()?;
        let context = context.parse::<Context>()?;
        self.resolve(profile, context)
    }

    /// Resolve every context of a profile.
    pub fn resolve_contextual(&mut self, profile: Profile) -> KeybindResult<ContextualKeyBindingMap> {
        let mut contexts = BTreeMap::new();
        for context in Context::ALL {
            contexts.insert(context, self.resolve(profile, context)?);
        }

        Ok(ContextualKeyBindingMap {
            profile,
            platform: self.platform,
            terminal: self.terminal,
            contexts,
        })
    }

    /// Resolve and fail if any keystroke is bound to more than one action.
    pub fn resolve_checked(
        &mut self,
        profile: Profile,
        context: Context,
    ) -> KeybindResult<Arc<KeyBindingMap>> {
        let map = self.resolve(profile, context)?;
        let report = detect_conflicts_in(&map, context);
        if report.has_conflicts() {
            return Err(KeybindError::Conflicts(report));
        }
        Ok(map)
    }

    /// Conflicts of a profile across all contexts.
    pub fn conflicts(&mut self, profile: Profile) -> KeybindResult<ConflictReport> {
        Ok(self.resolve_contextual(profile)?.conflicts())
    }

    /// Action name to keystrokes for a profile in a context.
    pub fn effective_keybindings(
        &mut self,
        profile: Profile,
        context: Context,
    ) -> KeybindResult<BTreeMap<String, Vec<KeyStroke>>> {
        Ok(self.resolve(profile, context)?.to_effective())
    }

    fn build(&self, profile: Profile, context: Context) -> KeybindResult<KeyBindingMap> {
        let base = self
            .profiles
            .get(&profile)
            .ok_or(KeybindError::ProfileNotFound(profile))?;

        let mut map = KeyBindingMap::builtin_defaults();

        apply_layer(&mut map, Layer::Profile, &base.bindings_for_context(context));
        let platform = self.platform.overrides(&map);
        apply_layer(&mut map, Layer::Platform, &platform);
        let terminal = self.terminal.overrides(&map);
        apply_layer(&mut map, Layer::Terminal, &terminal);
        for table in self
            .user
            .layers(context, self.platform, self.terminal)
            .into_iter()
            .flatten()
        {
            apply_layer(&mut map, Layer::User, table);
        }
        apply_layer(&mut map, Layer::Environment, &self.env_overrides());

        debug!(%profile, %context, platform = %self.platform, terminal = %self.terminal, "resolved keymap");
        Ok(map)
    }

    fn env_overrides(&self) -> ActionBindings {
        let mut layer = ActionBindings::new();

        for action in Action::ALL {
            let var = action.env_var();
            let Some(value) = self.env.non_empty(&var) else {
                continue;
            };

            match parse_keystrokes(&BindingSpec::Single(value.clone())) {
                Ok(keys) if !keys.is_empty() => {
                    layer.insert(action, keys);
                }
                Ok(_) => warn!(%var, %value, "ignoring empty keybinding override"),
                Err(error) => warn!(%var, %value, %error, "ignoring malformed keybinding override"),
            }
        }

        layer
    }
}

fn apply_layer(map: &mut KeyBindingMap, layer: Layer, bindings: &ActionBindings) {
    if bindings.is_empty() {
        return;
    }
    let replaced = map.apply(bindings);
    trace!(%layer, actions = ?replaced, "applied keybinding layer");
}

impl Default for KeyBindingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyBindingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBindingResolver")
            .field("profiles", &self.registered_profiles())
            .field("platform", &self.platform)
            .field("terminal", &self.terminal)
            .field("user", &self.user)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::AltKey;

    fn resolver() -> KeyBindingResolver {
        KeyBindingResolver::with_builtin_profiles()
            .with_environment(Platform::Linux, Terminal::Xterm)
            .with_env_lookup(HashMap::<String, String>::new())
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cache_key_format() {
        let resolver = resolver();
        assert_eq!(
            resolver.cache_key(Profile::Vi, Context::Results),
            "vi:results:linux:xterm"
        );
    }

    #[test]
    fn test_resolve_is_cached() {
        let mut resolver = resolver();
        let first = resolver.resolve(Profile::Default, Context::Input).unwrap();
        let second = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cache_len(), 1);

        resolver.clear_cache();
        assert_eq!(resolver.cache_len(), 0);
        let third = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn test_unregistered_profile_is_an_error() {
        let mut resolver =
            KeyBindingResolver::new().with_environment(Platform::Linux, Terminal::Xterm);
        assert!(matches!(
            resolver.resolve(Profile::Emacs, Context::Input),
            Err(KeybindError::ProfileNotFound(Profile::Emacs))
        ));
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn test_resolve_by_name() {
        let mut resolver = resolver();
        let map = resolver.resolve_by_name("Emacs", "input").unwrap();
        assert_eq!(map.get(Action::DeleteWord), &[KeyStroke::alt('d')]);

        assert!(matches!(
            resolver.resolve_by_name("nano", "input"),
            Err(KeybindError::InvalidProfile(_))
        ));
        assert!(matches!(
            resolver.resolve_by_name("emacs", "sidebar"),
            Err(KeybindError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_defaults_fill_unbound_actions() {
        let mut resolver = resolver();
        let map = resolver.resolve(Profile::Vi, Context::Search).unwrap();

        // vi/search only binds navigation
        assert_eq!(map.get(Action::DeleteWord), &[KeyStroke::ctrl('w')]);
        assert_eq!(map.get(Action::MoveDown), &[KeyStroke::alt('j')]);
        assert_eq!(map.get(Action::SoftCancel), &[KeyStroke::esc()]);
    }

    #[test]
    fn test_platform_layer() {
        let mut resolver = KeyBindingResolver::with_builtin_profiles()
            .with_environment(Platform::Darwin, Terminal::Generic)
            .with_env_lookup(HashMap::<String, String>::new());
        let map = resolver.resolve(Profile::Emacs, Context::Input).unwrap();
        assert_eq!(
            map.get(Action::DeleteWord),
            &[KeyStroke::alt_key(AltKey::Backspace), KeyStroke::alt('d')]
        );

        let map = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert_eq!(
            map.get(Action::DeleteWord),
            &[KeyStroke::alt_key(AltKey::Backspace), KeyStroke::ctrl('w')]
        );
    }

    #[test]
    fn test_terminal_layer_replaces_platform() {
        let mut resolver = KeyBindingResolver::with_builtin_profiles()
            .with_environment(Platform::Windows, Terminal::Screen)
            .with_env_lookup(HashMap::<String, String>::new());
        let map = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert_eq!(
            map.get(Action::MoveToBeginning),
            &[KeyStroke::home(), KeyStroke::alt('a')]
        );
        assert_eq!(map.get(Action::MoveToEnd), &[KeyStroke::end(), KeyStroke::ctrl('e')]);
    }

    #[test]
    fn test_user_sections_apply_in_order() {
        let mut user = UserKeyBindings::new();
        user.bind(Action::ClearLine, vec![KeyStroke::ctrl('l')])
            .bind(Action::Accept, vec![KeyStroke::ctrl('j')])
            .bind_in_context(Context::Input, Action::ClearLine, vec![KeyStroke::ctrl('y')]);
        user.terminals
            .entry(Terminal::Xterm)
            .or_default()
            .insert(Action::Accept, vec![KeyStroke::ctrl('m')]);

        let mut resolver = resolver().with_user_bindings(user);

        let input = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert_eq!(input.get(Action::ClearLine), &[KeyStroke::ctrl('y')]);
        assert_eq!(input.get(Action::Accept), &[KeyStroke::ctrl('m')]);

        let search = resolver.resolve(Profile::Default, Context::Search).unwrap();
        assert_eq!(search.get(Action::ClearLine), &[KeyStroke::ctrl('l')]);
    }

    #[test]
    fn test_env_layer() {
        let mut resolver = resolver().with_env_lookup(env(&[
            ("GITLAUNCH_KEY_DELETE_WORD", "ctrl+o, alt+backspace"),
            ("GITLAUNCH_KEY_CLEAR_LINE", "hyper+u"),
            ("GITLAUNCH_KEY_ACCEPT", "   "),
        ]));

        let map = resolver.resolve(Profile::Default, Context::Input).unwrap();
        assert_eq!(
            map.get(Action::DeleteWord),
            &[KeyStroke::ctrl('o'), KeyStroke::alt_key(AltKey::Backspace)]
        );
        assert_eq!(map.get(Action::ClearLine), &[KeyStroke::ctrl('u')]);
        assert_eq!(map.get(Action::Accept), &[KeyStroke::enter()]);
    }

    #[test]
    fn test_register_replaces_and_clears_cache() {
        let mut resolver = resolver();
        resolver.resolve(Profile::Vi, Context::Results).unwrap();

        let mut custom = Profile::Vi.builtin();
        custom.bind_in_context(Context::Results, Action::MoveDown, vec![KeyStroke::ctrl('j')]);
        resolver.register_profile(custom).unwrap();
        assert_eq!(resolver.cache_len(), 0);

        let map = resolver.resolve(Profile::Vi, Context::Results).unwrap();
        assert_eq!(map.get(Action::MoveDown), &[KeyStroke::ctrl('j')]);
    }

    #[test]
    fn test_invalid_profile_is_not_registered() {
        let mut resolver = KeyBindingResolver::new();
        let mut broken = Profile::Readline.builtin();
        broken.contexts.remove(&Context::Results);

        assert!(matches!(
            resolver.register_profile(broken),
            Err(KeybindError::Validation(_))
        ));
        assert!(!resolver.is_registered(Profile::Readline));
        assert!(resolver.registered_profiles().is_empty());
    }

    #[test]
    fn test_resolve_checked_promotes_conflicts() {
        let mut user = UserKeyBindings::new();
        user.bind(Action::ClearWorkflow, vec![KeyStroke::ctrl('w')]);
        let mut resolver = resolver().with_user_bindings(user);

        // advisory path still resolves
        assert!(resolver.resolve(Profile::Default, Context::Input).is_ok());

        match resolver.resolve_checked(Profile::Default, Context::Input) {
            Err(KeybindError::Conflicts(report)) => {
                assert_eq!(report.len(), 1);
                assert_eq!(
                    report.conflicts[0].actions,
                    vec![Action::DeleteWord, Action::ClearWorkflow]
                );
            }
            other => panic!("expected conflicts, got {other:?}"),
        }
        assert!(resolver.conflicts(Profile::Default).unwrap().has_conflicts());
    }

    #[test]
    fn test_resolve_contextual_shares_cache() {
        let mut resolver = resolver();
        let all = resolver.resolve_contextual(Profile::Readline).unwrap();
        assert_eq!(all.contexts.len(), Context::ALL.len());
        assert_eq!(resolver.cache_len(), Context::ALL.len());

        let results = resolver.resolve(Profile::Readline, Context::Results).unwrap();
        assert!(Arc::ptr_eq(&all.contexts[&Context::Results], &results));
        assert!(all.conflicts().is_empty());
    }

    #[test]
    fn test_effective_keybindings() {
        let mut resolver = resolver();
        let effective = resolver
            .effective_keybindings(Profile::Readline, Context::Input)
            .unwrap();
        assert_eq!(effective.len(), Action::COUNT);
        assert_eq!(effective["move_to_end"], vec![KeyStroke::ctrl('e')]);
    }
}
