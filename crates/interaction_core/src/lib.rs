//! Event-driven interaction engine.
//!
//! An [`Interaction`] turns phased step declarations into listeners on an
//! [`EventSource`], runs the named [`Action`]s of its [`Context`] as events
//! arrive, and only moves between phases along the
//! `start -> processing -> end -> rollback` lifecycle.
//!
//! Everything here is single-threaded. Steps with a debounce or throttle
//! policy schedule local tasks and must be driven inside a
//! [`tokio::task::LocalSet`].

pub mod action;
pub mod action_registry;
pub mod config;
pub mod context;
pub mod event_source;
pub mod interaction;
pub mod interaction_registry;
pub mod timing;

pub use action::{Action, ActionConfig, ActionHandle, CallbackAction, ContextCallback};
pub use action_registry::{ActionClass, ActionRegistry};
pub use context::{Context, ContextRef};
pub use event_source::{Emitter, Event, EventSource, GlobalTargets, Handler, SourceRef};
pub use interaction::{ActionSpec, Interaction, InteractionSteps, Step};
pub use interaction_registry::{InteractionRegistry, InteractionTemplate};
pub use shared::{
    domain::StepName,
    error::{ActionError, ErrorCode, InteractionError},
    protocol::{DebounceOption, InteractionDocument, ThrottleOption},
};
