//! Debounce and throttle wrappers around step handlers.
//!
//! Deferred calls run as local tasks, so a timed handler must fire inside a
//! [`tokio::task::LocalSet`]. Errors from deferred calls have no caller to
//! return to and are logged instead.

use std::{cell::RefCell, rc::Rc, time::Duration};

use shared::{
    error::InteractionError,
    protocol::{DebounceOption, ThrottleOption},
};
use tokio::{
    task::{self, JoinHandle},
    time::{self, Instant},
};
use tracing::error;

use crate::event_source::{Event, Handler};

/// The deferred invocation of a timed handler, if one is scheduled.
#[derive(Clone, Default)]
pub struct PendingCall(Rc<RefCell<Option<JoinHandle<()>>>>);

impl PendingCall {
    pub fn is_pending(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Aborts the scheduled call. The wrapped handler will not run.
    pub fn cancel(&self) {
        if let Some(task) = self.0.borrow_mut().take() {
            task.abort();
        }
    }

    fn replace(&self, task: JoinHandle<()>) {
        if let Some(previous) = self.0.borrow_mut().replace(task) {
            previous.abort();
        }
    }

    fn clear(&self) {
        self.0.borrow_mut().take();
    }
}

fn run_deferred(inner: &Handler, event: &Event) {
    if let Err(err) = inner(event) {
        error!(event = %event.name, error = %err, "deferred step failed");
    }
}

/// Collapses bursts of calls into one.
///
/// Without `immediate` the call runs once `wait` has passed since the last
/// call of the burst, with that last event. With `immediate` the first call
/// of a burst runs synchronously and the rest of the burst is dropped.
pub fn debounce(inner: Handler, option: DebounceOption) -> (Handler, PendingCall) {
    let pending = PendingCall::default();
    let wait = option.wait_duration();
    let immediate = option.immediate;
    let timer = pending.clone();

    let handler: Handler = Rc::new(move |event: &Event| -> Result<(), InteractionError> {
        let call_now = immediate && !timer.is_pending();
        timer.cancel();

        let later_timer = timer.clone();
        let later_inner = Rc::clone(&inner);
        let later_event = event.clone();
        timer.replace(task::spawn_local(async move {
            time::sleep(wait).await;
            later_timer.clear();
            if !immediate {
                run_deferred(&later_inner, &later_event);
            }
        }));

        if call_now {
            inner(event)
        } else {
            Ok(())
        }
    });
    (handler, pending)
}

struct ThrottleState {
    previous: Option<Instant>,
    last_event: Option<Event>,
}

/// Runs at most once per `wait`.
///
/// `leading` runs the first call of a window synchronously; `trailing`
/// schedules one more call at the end of the window with the most recent
/// event.
pub fn throttle(inner: Handler, option: ThrottleOption) -> (Handler, PendingCall) {
    let pending = PendingCall::default();
    let wait = option.wait_duration();
    let ThrottleOption {
        leading, trailing, ..
    } = option;
    let timer = pending.clone();
    let state = Rc::new(RefCell::new(ThrottleState {
        previous: None,
        last_event: None,
    }));

    let handler: Handler = Rc::new(move |event: &Event| -> Result<(), InteractionError> {
        let now = Instant::now();
        let remaining = {
            let mut state = state.borrow_mut();
            if state.previous.is_none() && !leading {
                state.previous = Some(now);
            }
            state.last_event = Some(event.clone());
            match state.previous {
                Some(previous) => wait.saturating_sub(now.duration_since(previous)),
                None => Duration::ZERO,
            }
        };

        if remaining.is_zero() {
            timer.cancel();
            {
                let mut state = state.borrow_mut();
                state.previous = Some(now);
                state.last_event = None;
            }
            return inner(event);
        }

        if trailing && !timer.is_pending() {
            let later_timer = timer.clone();
            let later_inner = Rc::clone(&inner);
            let later_state = Rc::clone(&state);
            timer.replace(task::spawn_local(async move {
                time::sleep(remaining).await;
                let event = {
                    let mut state = later_state.borrow_mut();
                    state.previous = leading.then(Instant::now);
                    state.last_event.take()
                };
                later_timer.clear();
                if let Some(event) = event {
                    run_deferred(&later_inner, &event);
                }
            }));
        }
        Ok(())
    });
    (handler, pending)
}

#[cfg(test)]
#[path = "tests/timing_tests.rs"]
mod tests;
