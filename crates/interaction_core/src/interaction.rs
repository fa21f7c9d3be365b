//! The interaction engine: binds declared steps to event sources and walks
//! the phase lifecycle as events arrive.

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    fmt,
    rc::{Rc, Weak},
};

use shared::{
    domain::{parse_trigger, split_action_reference, StepName},
    error::InteractionError,
    protocol::{
        ActionReference, DebounceOption, InteractionDocument, StepDocument, ThrottleOption,
    },
};
use tracing::{debug, trace, warn};

use crate::{
    action::{ActionHandle, ContextCallback, CALLBACK_METHOD},
    action_registry::ActionRegistry,
    context::{Context, ContextRef},
    event_source::{same_source, Event, GlobalTargets, Handler, SourceRef},
    timing::{self, PendingCall},
};

pub type EnablePredicate = Rc<dyn Fn(&Context) -> bool>;

/// What a step runs when it fires.
#[derive(Clone)]
pub enum ActionSpec {
    /// A `name:method` reference.
    Reference(String),
    /// Several references, run in order.
    References(Vec<String>),
    Callback(ContextCallback),
    /// Anything else. The step is kept but never fires.
    Unsupported,
}

impl ActionSpec {
    pub fn callback(callback: impl Fn(&Context) + 'static) -> Self {
        Self::Callback(Rc::new(callback))
    }
}

impl From<&str> for ActionSpec {
    fn from(value: &str) -> Self {
        Self::Reference(value.to_string())
    }
}

impl From<String> for ActionSpec {
    fn from(value: String) -> Self {
        Self::Reference(value)
    }
}

impl From<Vec<&str>> for ActionSpec {
    fn from(value: Vec<&str>) -> Self {
        Self::References(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ActionSpec {
    fn from(value: Vec<String>) -> Self {
        Self::References(value)
    }
}

impl From<Option<ActionReference>> for ActionSpec {
    fn from(value: Option<ActionReference>) -> Self {
        match value {
            Some(ActionReference::Single(reference)) => Self::Reference(reference),
            Some(ActionReference::Many(references)) => Self::References(references),
            Some(ActionReference::Unsupported(_)) | None => Self::Unsupported,
        }
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
            Self::References(references) => {
                f.debug_tuple("References").field(references).finish()
            }
            Self::Callback(_) => f.write_str("Callback"),
            Self::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// One trigger-to-action binding within a phase.
#[derive(Clone)]
pub struct Step {
    pub trigger: String,
    pub action: ActionSpec,
    pub once: bool,
    pub is_enable: Option<EnablePredicate>,
    pub callback: Option<ContextCallback>,
    pub debounce: Option<DebounceOption>,
    pub throttle: Option<ThrottleOption>,
}

impl Step {
    pub fn new(trigger: impl Into<String>, action: impl Into<ActionSpec>) -> Self {
        Self {
            trigger: trigger.into(),
            action: action.into(),
            once: false,
            is_enable: None,
            callback: None,
            debounce: None,
            throttle: None,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn enabled_when(mut self, predicate: impl Fn(&Context) -> bool + 'static) -> Self {
        self.is_enable = Some(Rc::new(predicate));
        self
    }

    /// Runs `callback` after the step's actions succeed.
    pub fn then(mut self, callback: impl Fn(&Context) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    pub fn debounce(mut self, option: DebounceOption) -> Self {
        self.debounce = Some(option);
        self
    }

    pub fn throttle(mut self, option: ThrottleOption) -> Self {
        self.throttle = Some(option);
        self
    }
}

impl From<StepDocument> for Step {
    fn from(doc: StepDocument) -> Self {
        Self {
            trigger: doc.trigger,
            action: doc.action.into(),
            once: doc.once,
            is_enable: None,
            callback: None,
            debounce: doc.debounce,
            throttle: doc.throttle,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("trigger", &self.trigger)
            .field("action", &self.action)
            .field("once", &self.once)
            .field("is_enable", &self.is_enable.is_some())
            .field("callback", &self.callback.is_some())
            .field("debounce", &self.debounce)
            .field("throttle", &self.throttle)
            .finish()
    }
}

/// The steps of an interaction, grouped by phase. A phase given as an empty
/// list still counts as defined.
#[derive(Debug, Clone, Default)]
pub struct InteractionSteps {
    pub show_enable: Option<Vec<Step>>,
    pub start: Option<Vec<Step>>,
    pub processing: Option<Vec<Step>>,
    pub end: Option<Vec<Step>>,
    pub rollback: Option<Vec<Step>>,
}

impl InteractionSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase(mut self, name: StepName, steps: Vec<Step>) -> Self {
        *self.phase_mut(name) = Some(steps);
        self
    }

    pub fn phase(&self, name: StepName) -> Option<&[Step]> {
        match name {
            StepName::ShowEnable => self.show_enable.as_deref(),
            StepName::Start => self.start.as_deref(),
            StepName::Processing => self.processing.as_deref(),
            StepName::End => self.end.as_deref(),
            StepName::Rollback => self.rollback.as_deref(),
        }
    }

    fn phase_mut(&mut self, name: StepName) -> &mut Option<Vec<Step>> {
        match name {
            StepName::ShowEnable => &mut self.show_enable,
            StepName::Start => &mut self.start,
            StepName::Processing => &mut self.processing,
            StepName::End => &mut self.end,
            StepName::Rollback => &mut self.rollback,
        }
    }
}

impl From<InteractionDocument> for InteractionSteps {
    fn from(doc: InteractionDocument) -> Self {
        let convert = |steps: Option<Vec<StepDocument>>| -> Option<Vec<Step>> {
            steps.map(|steps| steps.into_iter().map(Step::from).collect())
        };
        Self {
            show_enable: convert(doc.show_enable),
            start: convert(doc.start),
            processing: convert(doc.processing),
            end: convert(doc.end),
            rollback: convert(doc.rollback),
        }
    }
}

/// Whether an engine currently in `current` may enter `candidate`.
pub fn is_allow_step(current: Option<StepName>, candidate: StepName, has_end: bool) -> bool {
    if current == Some(candidate) {
        return true;
    }
    match candidate {
        StepName::ShowEnable => true,
        StepName::Processing => current == Some(StepName::Start),
        StepName::Start => current != Some(StepName::Processing),
        StepName::End => matches!(current, Some(StepName::Processing | StepName::Start)),
        StepName::Rollback if has_end => current == Some(StepName::End),
        StepName::Rollback => current == Some(StepName::Start),
    }
}

struct ResolvedAction {
    action: ActionHandle,
    method: String,
}

enum Resolved {
    Single(ResolvedAction),
    Many(Vec<ResolvedAction>),
}

impl Resolved {
    fn execute(&self) -> Result<(), InteractionError> {
        match self {
            Resolved::Single(target) => target.action.invoke(&target.method),
            Resolved::Many(targets) => targets
                .iter()
                .try_for_each(|target| target.action.invoke(&target.method)),
        }
    }
}

struct WrappedHandler {
    handler: Handler,
    pending: Option<PendingCall>,
}

struct BoundStep {
    phase: StepName,
    index: usize,
    step: Step,
    resolved: Option<Resolved>,
    wrapped: RefCell<Option<WrappedHandler>>,
}

impl BoundStep {
    fn key(&self) -> (StepName, usize) {
        (self.phase, self.index)
    }

    fn cancel_pending(&self) {
        if let Some(WrappedHandler {
            pending: Some(pending),
            ..
        }) = self.wrapped.borrow().as_ref()
        {
            pending.cancel();
        }
    }
}

struct InteractionInner {
    context: RefCell<Option<ContextRef>>,
    steps: RefCell<Option<Rc<[Rc<BoundStep>]>>>,
    has_end: bool,
    globals: GlobalTargets,
    source: RefCell<Option<SourceRef>>,
    current: Cell<Option<StepName>>,
    fired: RefCell<HashSet<(StepName, usize)>>,
}

impl InteractionInner {
    fn context(&self) -> Option<ContextRef> {
        self.context.borrow().clone()
    }

    fn steps(&self) -> Option<Rc<[Rc<BoundStep>]>> {
        self.steps.borrow().clone()
    }

    fn is_allow_execute(&self, step: &BoundStep, context: &Context) -> bool {
        if !is_allow_step(self.current.get(), step.phase, self.has_end) {
            return false;
        }
        if step.step.once && self.fired.borrow().contains(&step.key()) {
            return false;
        }
        match &step.step.is_enable {
            Some(predicate) => predicate(context),
            None => true,
        }
    }

    fn after_execute(&self, step: &BoundStep) {
        if step.phase != StepName::ShowEnable && self.current.get() != Some(step.phase) {
            self.current.set(Some(step.phase));
            self.fired.borrow_mut().clear();
        }
        self.fired.borrow_mut().insert(step.key());
    }

    fn dispatch(&self, step: &BoundStep, event: &Event) -> Result<(), InteractionError> {
        let Some(context) = self.context() else {
            return Ok(());
        };
        context.set_event(Some(event.clone()));
        if !self.is_allow_execute(step, &context) {
            trace!(phase = %step.phase, trigger = %step.step.trigger, "step rejected");
            context.set_event(None);
            return Ok(());
        }
        if let Some(resolved) = &step.resolved {
            resolved.execute()?;
        }
        self.after_execute(step);
        debug!(phase = %step.phase, trigger = %step.step.trigger, "step executed");
        if let Some(callback) = &step.step.callback {
            callback(&context);
        }
        Ok(())
    }

    /// The subscribed form of `step`, built on first use and reused after so
    /// that unsubscribing removes the same handler.
    fn handler_for(self: &Rc<Self>, step: &Rc<BoundStep>) -> Option<Handler> {
        step.resolved.as_ref()?;
        if let Some(wrapped) = step.wrapped.borrow().as_ref() {
            return Some(Rc::clone(&wrapped.handler));
        }

        let inner = Rc::downgrade(self);
        let bound: Weak<BoundStep> = Rc::downgrade(step);
        let raw: Handler = Rc::new(move |event: &Event| -> Result<(), InteractionError> {
            match (inner.upgrade(), bound.upgrade()) {
                (Some(inner), Some(step)) => inner.dispatch(&step, event),
                _ => Ok(()),
            }
        });
        let (handler, pending) = match (step.step.debounce, step.step.throttle) {
            (Some(option), _) => {
                let (handler, pending) = timing::debounce(raw, option);
                (handler, Some(pending))
            }
            (None, Some(option)) => {
                let (handler, pending) = timing::throttle(raw, option);
                (handler, Some(pending))
            }
            (None, None) => (raw, None),
        };
        *step.wrapped.borrow_mut() = Some(WrappedHandler {
            handler: Rc::clone(&handler),
            pending,
        });
        Some(handler)
    }
}

/// An interaction bound to one context.
///
/// Cloning shares the same engine.
#[derive(Clone)]
pub struct Interaction {
    inner: Rc<InteractionInner>,
}

impl Interaction {
    /// Resolves every step's action reference against `context`, creating
    /// actions from `actions` when the context has none of that name.
    ///
    /// Fails with [`InteractionError::UnknownAction`] on the first reference
    /// that names an unregistered action. Actions created before the failure
    /// stay in the context.
    pub fn new(
        context: ContextRef,
        mut steps: InteractionSteps,
        actions: &ActionRegistry,
        globals: GlobalTargets,
    ) -> Result<Self, InteractionError> {
        let has_end = steps.end.is_some();
        let mut bound = Vec::new();
        for phase in StepName::ALL {
            let Some(phase_steps) = steps.phase_mut(phase).take() else {
                continue;
            };
            for (index, step) in phase_steps.into_iter().enumerate() {
                let resolved = resolve(&step.action, &context, actions)?;
                bound.push(Rc::new(BoundStep {
                    phase,
                    index,
                    step,
                    resolved,
                    wrapped: RefCell::new(None),
                }));
            }
        }

        Ok(Self {
            inner: Rc::new(InteractionInner {
                context: RefCell::new(Some(context)),
                steps: RefCell::new(Some(bound.into())),
                has_end,
                globals,
                source: RefCell::new(None),
                current: Cell::new(None),
                fired: RefCell::new(HashSet::new()),
            }),
        })
    }

    /// Subscribes every live step to `source`, or to the window/document
    /// targets for prefixed triggers.
    ///
    /// Binding the current source again does nothing. Binding another source
    /// unbinds the current one first; `None` only clears the binding.
    pub fn bind(&self, source: Option<SourceRef>) {
        let inner = &self.inner;
        let Some(steps) = inner.steps() else {
            warn!("bind called on a destroyed interaction");
            return;
        };
        let current = inner.source.borrow().clone();
        match (&current, &source) {
            (Some(current), Some(source)) if same_source(current, source) => return,
            (None, None) => return,
            _ => {}
        }
        if let Some(current) = current {
            self.unbind(&current);
        }

        *inner.source.borrow_mut() = source.clone();
        if let Some(context) = inner.context() {
            context.set_source(source.clone());
        }
        let Some(source) = source else {
            return;
        };

        let mut subscribed = 0usize;
        for step in steps.iter() {
            if let Some(handler) = inner.handler_for(step) {
                let (target, event) = parse_trigger(&step.step.trigger);
                inner.globals.resolve(target, &source).on(event, handler);
                subscribed += 1;
            }
        }
        debug!(subscribed, "interaction bound");
    }

    /// Removes every subscription made for `source` and cancels pending
    /// timed calls. Does nothing unless `source` is the bound source.
    pub fn unbind(&self, source: &SourceRef) {
        let inner = &self.inner;
        let is_current = inner
            .source
            .borrow()
            .as_ref()
            .is_some_and(|current| same_source(current, source));
        if !is_current {
            return;
        }

        *inner.source.borrow_mut() = None;
        if let Some(context) = inner.context() {
            context.set_source(None);
        }
        if let Some(steps) = inner.steps() {
            for step in steps.iter() {
                step.cancel_pending();
                if let Some(handler) = inner.handler_for(step) {
                    let (target, event) = parse_trigger(&step.step.trigger);
                    inner.globals.resolve(target, source).off(event, &handler);
                }
            }
        }
        debug!("interaction unbound");
    }

    /// Unbinds, then destroys the context and every action in it. Later
    /// calls do nothing.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.steps.borrow().is_none() {
            return;
        }
        let source = inner.source.borrow().clone();
        if let Some(source) = source {
            self.unbind(&source);
        }
        let steps = inner.steps.borrow_mut().take();
        if let Some(steps) = steps {
            steps.iter().for_each(|step| step.cancel_pending());
        }
        let context = inner.context.borrow_mut().take();
        if let Some(context) = context {
            context.destroy();
        }
        inner.current.set(None);
        inner.fired.borrow_mut().clear();
        debug!("interaction destroyed");
    }

    /// Returns to the unset phase and forgets which once-steps fired.
    pub fn reset(&self) {
        self.inner.current.set(None);
        self.inner.fired.borrow_mut().clear();
    }

    pub fn current_step(&self) -> Option<StepName> {
        self.inner.current.get()
    }

    /// `None` once destroyed.
    pub fn context(&self) -> Option<ContextRef> {
        self.inner.context()
    }

    pub fn source(&self) -> Option<SourceRef> {
        self.inner.source.borrow().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.source.borrow().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.steps.borrow().is_none()
    }

    pub fn globals(&self) -> &GlobalTargets {
        &self.inner.globals
    }
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("current_step", &self.current_step())
            .field("bound", &self.is_bound())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

fn resolve(
    spec: &ActionSpec,
    context: &ContextRef,
    actions: &ActionRegistry,
) -> Result<Option<Resolved>, InteractionError> {
    let resolved = match spec {
        ActionSpec::Callback(callback) => Resolved::Single(ResolvedAction {
            action: ActionRegistry::create_callback(Rc::clone(callback), context),
            method: CALLBACK_METHOD.to_string(),
        }),
        ActionSpec::Reference(reference) => {
            Resolved::Single(resolve_reference(reference, context, actions)?)
        }
        ActionSpec::References(references) => Resolved::Many(
            references
                .iter()
                .map(|reference| resolve_reference(reference, context, actions))
                .collect::<Result<_, _>>()?,
        ),
        ActionSpec::Unsupported => return Ok(None),
    };
    Ok(Some(resolved))
}

fn resolve_reference(
    reference: &str,
    context: &ContextRef,
    actions: &ActionRegistry,
) -> Result<ResolvedAction, InteractionError> {
    let (name, method) = split_action_reference(reference);
    let action = match context.get_action(name) {
        Some(action) => action,
        None => actions
            .create(name, context)?
            .ok_or_else(|| InteractionError::unknown_action(name))?,
    };
    Ok(ResolvedAction {
        action,
        method: method.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
