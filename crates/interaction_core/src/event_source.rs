//! Event sources that interactions subscribe to.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde_json::Value;
use shared::{domain::TriggerTarget, error::InteractionError};

/// A single emitted event: its name and an arbitrary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub data: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A subscribed listener. Identity is the `Rc` allocation, so `off` must be
/// given a clone of the exact handler passed to `on`.
pub type Handler = Rc<dyn Fn(&Event) -> Result<(), InteractionError>>;

pub type SourceRef = Rc<dyn EventSource>;

pub trait EventSource {
    fn on(&self, event: &str, handler: Handler);
    fn off(&self, event: &str, handler: &Handler);
    /// Delivers `data` to every handler subscribed to `event`, in
    /// subscription order. The first handler error stops delivery and is
    /// returned to the caller.
    fn emit(&self, event: &str, data: Value) -> Result<(), InteractionError>;
}

/// Whether two sources are the same object.
pub fn same_source(a: &SourceRef, b: &SourceRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub(crate) fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// In-memory event source.
#[derive(Default)]
pub struct Emitter {
    listeners: RefCell<HashMap<String, Vec<Handler>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SourceRef {
        Rc::new(Self::new())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .get(event)
            .map(Vec::len)
            .unwrap_or_default()
    }
}

impl EventSource for Emitter {
    fn on(&self, event: &str, handler: Handler) {
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn off(&self, event: &str, handler: &Handler) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(handlers) = listeners.get_mut(event) {
            handlers.retain(|existing| !same_handler(existing, handler));
            if handlers.is_empty() {
                listeners.remove(event);
            }
        }
    }

    fn emit(&self, event: &str, data: Value) -> Result<(), InteractionError> {
        // Handlers may subscribe or unsubscribe while running.
        let handlers = match self.listeners.borrow().get(event) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };
        let event = Event::new(event, data);
        for handler in handlers {
            handler(&event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut events: Vec<_> = listeners
            .iter()
            .map(|(name, handlers)| (name.clone(), handlers.len()))
            .collect();
        events.sort();
        f.debug_struct("Emitter").field("listeners", &events).finish()
    }
}

/// The host-wide targets addressed by `window:` and `document:` triggers.
///
/// Hosts construct one set at startup and hand it to every interaction so
/// that global listeners survive the event source they were declared next to.
#[derive(Clone)]
pub struct GlobalTargets {
    pub window: SourceRef,
    pub document: SourceRef,
}

impl GlobalTargets {
    pub fn new(window: SourceRef, document: SourceRef) -> Self {
        Self { window, document }
    }

    /// The object a trigger with `target` subscribes to, given the bound
    /// source.
    pub fn resolve<'a>(&'a self, target: TriggerTarget, source: &'a SourceRef) -> &'a SourceRef {
        match target {
            TriggerTarget::Source => source,
            TriggerTarget::Window => &self.window,
            TriggerTarget::Document => &self.document,
        }
    }
}

impl Default for GlobalTargets {
    fn default() -> Self {
        Self::new(Emitter::shared(), Emitter::shared())
    }
}

impl fmt::Debug for GlobalTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalTargets").finish_non_exhaustive()
    }
}
