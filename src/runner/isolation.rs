//! Per-case isolation: one thread per case, panics caught at the thread boundary,
//! and an optional time limit after which the thread is abandoned.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{trace, warn};

use crate::case::{AssertionMode, CaseContext, SourceLocation, TestCase};
use crate::outcome::{Failure, Outcome};

thread_local! {
    static IN_CASE: Cell<bool> = const { Cell::new(false) };
    static PANIC_LOCATION: RefCell<Option<SourceLocation>> = const { RefCell::new(None) };
}

static HOOK: OnceCell<()> = OnceCell::new();

/// Install the process-wide panic hook once.
///
/// On case threads the hook records where the panic happened and stays silent;
/// the report shows the panic instead. Every other thread keeps the previous hook.
pub(crate) fn install_panic_hook() {
    HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_CASE.with(Cell::get) {
                let location = info
                    .location()
                    .map(|l| SourceLocation::new(l.file(), l.line()));
                PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f` without letting a panic inside it replace the recorded location of an
/// earlier one, so a panicking teardown cannot relocate the body's panic.
pub(crate) fn preserving_panic_location<R>(f: impl FnOnce() -> R) -> R {
    let saved = PANIC_LOCATION.with(|slot| slot.borrow().clone());
    let result = f();
    PANIC_LOCATION.with(|slot| *slot.borrow_mut() = saved);
    result
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `case` on its own thread and wait at most `limit` for it.
///
/// A case still running when the limit passes is detached and reported as timed
/// out; its thread is never joined.
pub(crate) fn run_case(
    case: &Arc<TestCase>,
    mode: AssertionMode,
    position: usize,
    limit: Option<Duration>,
) -> Outcome {
    let (tx, rx) = mpsc::channel();
    let worker_case = Arc::clone(case);
    let spawned = thread::Builder::new()
        .name(format!("verdict-case-{position}"))
        .spawn(move || {
            let outcome = execute(&worker_case, mode);
            // The receiver is gone when the case already timed out.
            let _ = tx.send(outcome);
        });
    if let Err(err) = spawned {
        return Outcome::Failed(Failure::error(
            case,
            format!("could not start case thread: {err}"),
            "runner",
            None,
        ));
    }

    let received = match limit {
        Some(limit) => rx.recv_timeout(limit),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            let limit = limit.unwrap_or_default();
            warn!(case = %case.id(), limit_ms = limit.as_millis() as u64, "case timed out; thread abandoned");
            Outcome::Failed(Failure::timed_out(
                case,
                format!("timed out after {}ms", limit.as_millis()),
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Outcome::Failed(Failure::error(
            case,
            "case thread terminated without reporting an outcome",
            "runner",
            None,
        )),
    }
}

/// Body of a case thread.
fn execute(case: &TestCase, mode: AssertionMode) -> Outcome {
    IN_CASE.with(|flag| flag.set(true));
    trace!(case = %case.id(), ?mode, "case started");

    let mut cx = CaseContext::new(case.id(), mode);
    let invoked = panic::catch_unwind(AssertUnwindSafe(|| case.body().invoke(&mut cx)));
    match invoked {
        Ok(result) => match cx.finish(result) {
            Ok(()) => Outcome::Passed,
            Err(error) => Outcome::Failed(Failure::from_case_error(case, error)),
        },
        Err(payload) => {
            let location = PANIC_LOCATION.with(|slot| slot.borrow_mut().take());
            Outcome::Failed(Failure::error(
                case,
                format!("panicked: {}", panic_message(&payload)),
                "panic",
                location,
            ))
        }
    }
}
