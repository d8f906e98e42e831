//! Publish/subscribe fan-out for protocol messages and UI actions
//!
//! Listeners are kept per key and run in registration order. A listener that
//! returns an error is logged, the remaining listeners of the same emission
//! still run.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use transport::Message;

use crate::actions::{Action, ActionKind};

/// A subscriber to one key of a [`Listeners`] registry.
pub type Listener<T> = Box<dyn FnMut(&T) -> eyre::Result<()> + Send>;

/// Listeners for values of type `T`, keyed by `K`.
pub struct Listeners<K, T> {
    listeners: HashMap<K, Vec<Listener<T>>>,
}

impl<K, T> Default for Listeners<K, T> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }
}

impl<K, T> fmt::Debug for Listeners<K, T>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.listeners.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

impl<K, T> Listeners<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, to run after those already registered for `key`.
    pub fn on(&mut self, key: K, listener: impl FnMut(&T) -> eyre::Result<()> + Send + 'static) {
        self.listeners
            .entry(key)
            .or_default()
            .push(Box::new(listener));
    }

    /// Run every listener for `key`, returning how many there were.
    pub fn emit(&mut self, key: &K, value: &T) -> usize {
        let Some(listeners) = self.listeners.get_mut(key) else {
            tracing::trace!(?key, "no listeners");
            return 0;
        };

        for (index, listener) in listeners.iter_mut().enumerate() {
            if let Err(e) = listener(value) {
                tracing::warn!(?key, index, error = %e, "listener failed");
            }
        }
        listeners.len()
    }

    pub fn count(&self, key: &K) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }
}

/// Which half of the protocol stream a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Keyed by event name
    Event,
    /// Keyed by the command of the request being answered
    Response,
}

impl Category {
    /// The category a message is dispatched under; requests have none.
    pub fn of(message: &Message) -> Option<Category> {
        match message {
            Message::Event(_) => Some(Category::Event),
            Message::Response(_) => Some(Category::Response),
            Message::Request(_) => None,
        }
    }
}

/// Fan-out of inbound events and responses.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    listeners: Listeners<(Category, String), Message>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events named `name`, or responses to the command `name`.
    pub fn on(
        &mut self,
        category: Category,
        name: impl Into<String>,
        listener: impl FnMut(&Message) -> eyre::Result<()> + Send + 'static,
    ) {
        self.listeners.on((category, name.into()), listener);
    }

    /// Hand `message` to the listeners of its name within `category`.
    pub fn emit(&mut self, category: Category, message: &Message) -> usize {
        let key = (category, message.name().to_string());
        self.listeners.emit(&key, message)
    }

    pub fn listener_count(&self, category: Category, name: &str) -> usize {
        self.listeners.count(&(category, name.to_string()))
    }
}

/// Fan-out of UI actions.
#[derive(Debug, Default)]
pub struct ActionDispatcher {
    listeners: Listeners<ActionKind, Action>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &mut self,
        kind: ActionKind,
        listener: impl FnMut(&Action) -> eyre::Result<()> + Send + 'static,
    ) {
        self.listeners.on(kind, listener);
    }

    pub fn emit(&mut self, action: &Action) -> usize {
        self.listeners.emit(&action.kind(), action)
    }
}
