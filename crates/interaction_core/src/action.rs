//! Actions: named units of behaviour owned by a [`Context`].

use std::{
    any::Any,
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use shared::error::{ActionError, InteractionError};
use tracing::warn;

use crate::context::{Context, ContextRef};

/// Name under which inline-callback actions live in their context.
pub const CALLBACK_ACTION_NAME: &str = "$callback";
/// The single method of a callback action.
pub const CALLBACK_METHOD: &str = "execute";

/// Behaviour of one action variant.
///
/// `invoke` is the variant's method table: it answers the method names the
/// variant supports and returns [`ActionError::UnknownMethod`] for anything
/// else.
pub trait Action: Any {
    /// Applies the registered default configuration. Called once, right
    /// after the action joins its context.
    fn init(&mut self, config: &ActionConfig) -> Result<(), serde_json::Error> {
        let _ = config;
        Ok(())
    }

    fn invoke(&mut self, method: &str, context: &Context) -> Result<(), ActionError>;

    /// Releases resources held by the variant. Runs at most once.
    fn destroy(&mut self) {}
}

/// Free-form default configuration attached to a registered action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionConfig(Map<String, Value>);

impl ActionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Overwrites the same-named fields of `target` with this configuration,
    /// last write wins. Keys `target` doesn't declare are ignored.
    pub fn apply_to<T>(&self, target: &mut T) -> Result<(), serde_json::Error>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.0.is_empty() {
            return Ok(());
        }
        let mut merged = serde_json::to_value(&*target)?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in &self.0 {
                fields.insert(key.clone(), value.clone());
            }
        }
        *target = serde_json::from_value(merged)?;
        Ok(())
    }
}

impl From<Map<String, Value>> for ActionConfig {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Non-object values carry no fields and yield an empty configuration.
impl From<Value> for ActionConfig {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }
}

struct ActionInstance {
    name: String,
    config: ActionConfig,
    context: RefCell<Option<Weak<Context>>>,
    behavior: RefCell<Box<dyn Action>>,
}

/// A live action bound to its context.
///
/// Cloning the handle shares the same action.
#[derive(Clone)]
pub struct ActionHandle(Rc<ActionInstance>);

impl ActionHandle {
    /// Creates an action and adds it to `context` immediately; [`init`] is a
    /// separate step.
    ///
    /// [`init`]: ActionHandle::init
    pub fn attach(
        name: impl Into<String>,
        behavior: Box<dyn Action>,
        config: ActionConfig,
        context: &ContextRef,
    ) -> Self {
        let handle = Self(Rc::new(ActionInstance {
            name: name.into(),
            config,
            context: RefCell::new(Some(Rc::downgrade(context))),
            behavior: RefCell::new(behavior),
        }));
        context.add_action(handle.clone());
        handle
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn config(&self) -> &ActionConfig {
        &self.0.config
    }

    /// The owning context; `None` after [`destroy`](ActionHandle::destroy).
    pub fn context(&self) -> Option<ContextRef> {
        self.0.context.borrow().as_ref()?.upgrade()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.context.borrow().is_none()
    }

    pub fn ptr_eq(&self, other: &ActionHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn init(&self) -> Result<(), InteractionError> {
        self.0
            .behavior
            .borrow_mut()
            .init(&self.0.config)
            .map_err(|source| InteractionError::InvalidConfig {
                action: self.0.name.clone(),
                source,
            })
    }

    /// Runs `method` against the owning context.
    pub fn invoke(&self, method: &str) -> Result<(), InteractionError> {
        let name = self.name();
        let context = self.context().ok_or_else(|| {
            InteractionError::from_action(
                name,
                method,
                ActionError::failed("action is not attached to a live context"),
            )
        })?;
        let mut behavior = self.0.behavior.try_borrow_mut().map_err(|_| {
            InteractionError::from_action(name, method, ActionError::failed("action is already running"))
        })?;
        behavior
            .invoke(method, &context)
            .map_err(|err| InteractionError::from_action(name, method, err))
    }

    /// Detaches the action from its context and releases it. Calling this
    /// again is a no-op.
    pub fn destroy(&self) {
        let Some(context) = self.0.context.borrow_mut().take() else {
            return;
        };
        match self.0.behavior.try_borrow_mut() {
            Ok(mut behavior) => behavior.destroy(),
            Err(_) => warn!(action = %self.0.name, "action destroyed from inside its own method"),
        }
        if let Some(context) = context.upgrade() {
            context.remove_action(self);
        }
    }

    /// Borrows the behaviour as its concrete type.
    pub fn with<T: Action, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let behavior = self.0.behavior.borrow();
        let behavior: &dyn Action = &**behavior;
        let behavior: &dyn Any = behavior;
        behavior.downcast_ref::<T>().map(f)
    }

    pub fn with_mut<T: Action, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut behavior = self.0.behavior.borrow_mut();
        let behavior: &mut dyn Action = &mut **behavior;
        let behavior: &mut dyn Any = behavior;
        behavior.downcast_mut::<T>().map(f)
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("name", &self.0.name)
            .field("attached", &!self.is_destroyed())
            .field("config", &self.0.config)
            .finish()
    }
}

pub type ContextCallback = Rc<dyn Fn(&Context)>;

/// Wraps an inline step callback so it can be dispatched like any other
/// action.
pub struct CallbackAction {
    callback: Option<ContextCallback>,
}

impl CallbackAction {
    pub fn new(callback: ContextCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn is_released(&self) -> bool {
        self.callback.is_none()
    }
}

impl Action for CallbackAction {
    fn invoke(&mut self, method: &str, context: &Context) -> Result<(), ActionError> {
        match method {
            CALLBACK_METHOD => {
                if let Some(callback) = &self.callback {
                    callback(context);
                }
                Ok(())
            }
            _ => Err(ActionError::UnknownMethod),
        }
    }

    fn destroy(&mut self) {
        self.callback = None;
    }
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
