//! UI contexts and the context-transition stack.

use crate::error::KeybindError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A UI state of the launcher with potentially distinct bindings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// Applies everywhere; the root state
    #[default]
    Global,
    /// Typing in the query line
    Input,
    /// Navigating the results list
    Results,
    /// Incremental search over the results
    Search,
}

impl Context {
    /// Every context, in declaration order.
    pub const ALL: [Context; 4] = [Self::Global, Self::Input, Self::Results, Self::Search];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Input => "input",
            Self::Results => "results",
            Self::Search => "search",
        }
    }

    pub fn is_global(self) -> bool {
        self == Self::Global
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = KeybindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| KeybindError::InvalidContext(s.to_string()))
    }
}

/// Listener invoked with `(from, to)` on every context transition.
pub type ContextCallback = Box<dyn FnMut(Context, Context) + Send>;

/// Tracks the active UI context as a stack and notifies listeners.
///
/// Callbacks run synchronously, in registration order, before the transition
/// method returns. They are owned by the manager, so a callback cannot borrow
/// the manager it is registered on. A callback that reaches the manager some
/// other way (an `Arc<Mutex<_>>` handle) must not trigger a
/// transition from inside the callback; the manager does not guard against
/// that re-entry.
pub struct ContextManager {
    current: Context,
    stack: Vec<Context>,
    callbacks: HashMap<Context, Vec<ContextCallback>>,
}

impl ContextManager {
    /// Create a manager in the `global` context.
    pub fn new() -> Self {
        Self {
            current: Context::Global,
            stack: Vec::new(),
            callbacks: HashMap::new(),
        }
    }

    /// The active context.
    pub fn current(&self) -> Context {
        self.current
    }

    /// Number of contexts waiting on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Register a callback fired on transitions into `context`.
    ///
    /// Callbacks registered under [`Context::Global`] fire on every
    /// transition.
    pub fn on_enter<F>(&mut self, context: Context, callback: F)
    where
        F: FnMut(Context, Context) + Send + 'static,
    {
        self.callbacks
            .entry(context)
            .or_default()
            .push(Box::new(callback));
    }

    /// Enter a nested context, remembering the current one.
    pub fn enter_context(&mut self, context: Context) {
        let from = self.current;
        self.stack.push(from);
        self.current = context;
        debug!(%from, to = %context, depth = self.stack.len(), "enter context");
        self.notify(from, context);
    }

    /// Return to the previous context.
    ///
    /// With an empty stack this is a no-op that returns the current context.
    pub fn exit_context(&mut self) -> Context {
        let Some(previous) = self.stack.pop() else {
            return self.current;
        };
        let from = self.current;
        self.current = previous;
        debug!(%from, to = %previous, depth = self.stack.len(), "exit context");
        self.notify(from, previous);
        self.current
    }

    /// Switch context without touching the stack.
    pub fn set_context(&mut self, context: Context) {
        if self.current == context {
            return;
        }
        let from = self.current;
        self.current = context;
        debug!(%from, to = %context, "set context");
        self.notify(from, context);
    }

    /// Drop the stack and return to `global` without notifying.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.current = Context::Global;
    }

    fn notify(&mut self, from: Context, to: Context) {
        if let Some(callbacks) = self.callbacks.get_mut(&to) {
            for callback in callbacks.iter_mut() {
                callback(from, to);
            }
        }
        if !to.is_global() {
            if let Some(callbacks) = self.callbacks.get_mut(&Context::Global) {
                for callback in callbacks.iter_mut() {
                    callback(from, to);
                }
            }
        }
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextManager")
            .field("current", &self.current)
            .field("stack", &self.stack)
            .field(
                "callbacks",
                &self.callbacks.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
