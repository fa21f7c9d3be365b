//! Name to constructor map for action variants.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use shared::error::InteractionError;
use tracing::debug;

use crate::{
    action::{
        Action, ActionConfig, ActionHandle, CallbackAction, ContextCallback, CALLBACK_ACTION_NAME,
    },
    context::ContextRef,
};

pub type ActionConstructor = Rc<dyn Fn() -> Box<dyn Action>>;

/// A registered action variant together with its default configuration.
#[derive(Clone)]
pub struct ActionClass {
    pub name: String,
    pub constructor: ActionConstructor,
    pub default_config: ActionConfig,
}

impl fmt::Debug for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionClass")
            .field("name", &self.name)
            .field("default_config", &self.default_config)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ActionRegistry {
    classes: RefCell<HashMap<String, ActionClass>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<F, A>(
        &self,
        name: impl Into<String>,
        constructor: F,
        default_config: ActionConfig,
    ) where
        F: Fn() -> A + 'static,
        A: Action,
    {
        let name = name.into();
        let constructor: ActionConstructor =
            Rc::new(move || -> Box<dyn Action> { Box::new(constructor()) });
        let replaced = self
            .classes
            .borrow_mut()
            .insert(
                name.clone(),
                ActionClass {
                    name: name.clone(),
                    constructor,
                    default_config,
                },
            )
            .is_some();
        debug!(action = %name, replaced, "registered action");
    }

    pub fn unregister(&self, name: &str) {
        self.classes.borrow_mut().remove(name);
    }

    pub fn get_action_class(&self, name: &str) -> Option<ActionClass> {
        self.classes.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.classes.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the action registered under `name` inside `context` and
    /// initializes it with the registered defaults.
    ///
    /// Returns `Ok(None)` for unregistered names. An action whose init fails
    /// is destroyed again before the error is returned.
    pub fn create(
        &self,
        name: &str,
        context: &ContextRef,
    ) -> Result<Option<ActionHandle>, InteractionError> {
        let Some(class) = self.get_action_class(name) else {
            return Ok(None);
        };
        let action = ActionHandle::attach(
            class.name,
            (class.constructor)(),
            class.default_config,
            context,
        );
        if let Err(err) = action.init() {
            action.destroy();
            return Err(err);
        }
        Ok(Some(action))
    }

    /// Wraps an inline step callback as a `$callback` action in `context`.
    pub fn create_callback(callback: ContextCallback, context: &ContextRef) -> ActionHandle {
        ActionHandle::attach(
            CALLBACK_ACTION_NAME,
            Box::new(CallbackAction::new(callback)),
            ActionConfig::new(),
            context,
        )
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/action_registry_tests.rs"]
mod tests;
