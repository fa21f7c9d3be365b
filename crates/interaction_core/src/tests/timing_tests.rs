use super::*;
use serde_json::json;
use std::cell::Cell;
use tokio::task::LocalSet;

fn counting(calls: &Rc<Cell<u32>>) -> Handler {
    let calls = Rc::clone(calls);
    Rc::new(move |_event: &Event| -> Result<(), InteractionError> {
        calls.set(calls.get() + 1);
        Ok(())
    })
}

fn recording(seen: &Rc<RefCell<Vec<i64>>>) -> Handler {
    let seen = Rc::clone(seen);
    Rc::new(move |event: &Event| -> Result<(), InteractionError> {
        seen.borrow_mut().push(event.data.as_i64().unwrap_or_default());
        Ok(())
    })
}

fn fire(handler: &Handler, n: i64) {
    handler(&Event::new("mousemove", json!(n))).expect("handler");
}

async fn settle() {
    time::sleep(Duration::from_millis(25)).await;
}

#[tokio::test(start_paused = true)]
async fn debounce_runs_trailing_call_once() {
    LocalSet::new()
        .run_until(async {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let (handler, pending) = debounce(
                recording(&seen),
                DebounceOption {
                    wait: 20,
                    immediate: false,
                },
            );

            fire(&handler, 1);
            fire(&handler, 2);
            assert!(seen.borrow().is_empty());
            assert!(pending.is_pending());

            settle().await;
            assert_eq!(*seen.borrow(), vec![2]);
            assert!(!pending.is_pending());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn immediate_debounce_runs_first_call_only() {
    LocalSet::new()
        .run_until(async {
            let calls = Rc::new(Cell::new(0));
            let (handler, _pending) = debounce(
                counting(&calls),
                DebounceOption {
                    wait: 20,
                    immediate: true,
                },
            );

            fire(&handler, 1);
            fire(&handler, 2);
            assert_eq!(calls.get(), 1);

            settle().await;
            assert_eq!(calls.get(), 1);

            fire(&handler, 3);
            assert_eq!(calls.get(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn throttle_runs_leading_and_trailing() {
    LocalSet::new()
        .run_until(async {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let (handler, _pending) = throttle(recording(&seen), ThrottleOption::new(20));

            fire(&handler, 1);
            fire(&handler, 2);
            fire(&handler, 3);
            assert_eq!(*seen.borrow(), vec![1]);

            settle().await;
            assert_eq!(*seen.borrow(), vec![1, 3]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn throttle_without_trailing_drops_the_burst() {
    LocalSet::new()
        .run_until(async {
            let calls = Rc::new(Cell::new(0));
            let (handler, pending) = throttle(
                counting(&calls),
                ThrottleOption {
                    trailing: false,
                    ..ThrottleOption::new(20)
                },
            );

            fire(&handler, 1);
            fire(&handler, 2);
            assert_eq!(calls.get(), 1);
            assert!(!pending.is_pending());

            settle().await;
            assert_eq!(calls.get(), 1);

            fire(&handler, 3);
            assert_eq!(calls.get(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn throttle_without_leading_defers_the_first_call() {
    LocalSet::new()
        .run_until(async {
            let calls = Rc::new(Cell::new(0));
            let (handler, _pending) = throttle(
                counting(&calls),
                ThrottleOption {
                    leading: false,
                    ..ThrottleOption::new(20)
                },
            );

            fire(&handler, 1);
            fire(&handler, 2);
            assert_eq!(calls.get(), 0);

            settle().await;
            assert_eq!(calls.get(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_the_scheduled_call() {
    LocalSet::new()
        .run_until(async {
            let calls = Rc::new(Cell::new(0));
            let (handler, pending) = debounce(
                counting(&calls),
                DebounceOption {
                    wait: 20,
                    immediate: false,
                },
            );

            fire(&handler, 1);
            pending.cancel();
            assert!(!pending.is_pending());

            settle().await;
            assert_eq!(calls.get(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn deferred_errors_are_swallowed() {
    LocalSet::new()
        .run_until(async {
            let failing: Handler = Rc::new(|_event: &Event| -> Result<(), InteractionError> {
                Err(InteractionError::missing_method("custom", "test"))
            });
            let (handler, pending) = debounce(
                failing,
                DebounceOption {
                    wait: 20,
                    immediate: false,
                },
            );

            fire(&handler, 1);
            settle().await;
            assert!(!pending.is_pending());
        })
        .await;
}
