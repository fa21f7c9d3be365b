//! Per-interaction shared state.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde_json::Value;
use tracing::warn;

use crate::{
    action::ActionHandle,
    event_source::{Event, SourceRef},
};

pub type ContextRef = Rc<Context>;

/// State shared by one interaction and the actions it drives.
///
/// A context owns its actions. Once destroyed, the action list and cache are
/// gone for good: lookups return nothing and writes are dropped.
pub struct Context {
    actions: RefCell<Option<Vec<ActionHandle>>>,
    source: RefCell<Option<SourceRef>>,
    event: RefCell<Option<Event>>,
    cache: RefCell<Option<HashMap<String, Value>>>,
}

impl Context {
    pub fn new() -> ContextRef {
        Rc::new(Self {
            actions: RefCell::new(Some(Vec::new())),
            source: RefCell::new(None),
            event: RefCell::new(None),
            cache: RefCell::new(Some(HashMap::new())),
        })
    }

    /// First live action registered under `name`.
    pub fn get_action(&self, name: &str) -> Option<ActionHandle> {
        self.actions
            .borrow()
            .as_ref()?
            .iter()
            .find(|action| action.name() == name)
            .cloned()
    }

    pub fn add_action(&self, action: ActionHandle) {
        match self.actions.borrow_mut().as_mut() {
            Some(actions) => actions.push(action),
            None => warn!(action = %action.name(), "ignoring action added to a destroyed context"),
        }
    }

    pub fn remove_action(&self, action: &ActionHandle) {
        if let Some(actions) = self.actions.borrow_mut().as_mut() {
            if let Some(index) = actions.iter().position(|existing| existing.ptr_eq(action)) {
                actions.remove(index);
            }
        }
    }

    /// Snapshot of the live actions in insertion order, or `None` once the
    /// context has been destroyed.
    pub fn actions(&self) -> Option<Vec<ActionHandle>> {
        self.actions.borrow().clone()
    }

    pub fn action_count(&self) -> usize {
        self.actions.borrow().as_ref().map(Vec::len).unwrap_or_default()
    }

    /// The payload of the dispatch currently in flight.
    pub fn event(&self) -> Option<Event> {
        self.event.borrow().clone()
    }

    pub fn set_event(&self, event: Option<Event>) {
        *self.event.borrow_mut() = event;
    }

    pub fn source(&self) -> Option<SourceRef> {
        self.source.borrow().clone()
    }

    pub fn set_source(&self, source: Option<SourceRef>) {
        *self.source.borrow_mut() = source;
    }

    pub fn get_cache(&self, key: &str) -> Option<Value> {
        self.cache.borrow().as_ref()?.get(key).cloned()
    }

    pub fn set_cache(&self, key: impl Into<String>, value: Value) {
        if let Some(cache) = self.cache.borrow_mut().as_mut() {
            cache.insert(key.into(), value);
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.actions.borrow().is_none()
    }

    /// Destroys every owned action, then drops the action list and cache.
    pub fn destroy(&self) {
        self.set_source(None);
        self.set_event(None);
        // Each action removes itself from the list while being destroyed.
        let snapshot = match self.actions() {
            Some(actions) => actions,
            None => return,
        };
        for action in snapshot {
            action.destroy();
        }
        *self.actions.borrow_mut() = None;
        *self.cache.borrow_mut() = None;
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Option<Vec<String>> = self
            .actions
            .borrow()
            .as_ref()
            .map(|actions| actions.iter().map(|action| action.name().to_string()).collect());
        f.debug_struct("Context")
            .field("actions", &actions)
            .field("event", &self.event.borrow())
            .field("bound", &self.source.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
