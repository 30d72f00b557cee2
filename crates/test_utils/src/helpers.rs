use std::panic::{catch_unwind, AssertUnwindSafe};

use cels_runtime::prelude::*;

/// An error handler that panics with the fault message, so tests can unwind
/// out of the otherwise-spinning fatal path.
pub fn panicking_error_handler(message: &str) {
    panic!("{message}");
}

/// A yield predicate that ends the tick after every step, making each
/// `run_step` dispatch exactly one step function.
pub fn yield_after_each_step() -> bool {
    true
}

/// Runs `f`, expecting it to report a fault through
/// [`panicking_error_handler`], and returns the fault message.
///
/// # Panics
///
/// Panics when `f` completes without reporting a fault.
pub fn expect_fault<F: FnOnce()>(f: F) -> String {
    let result = catch_unwind(AssertUnwindSafe(f));
    let payload = match result {
        Ok(()) => panic!("expected a fault report"),
        Err(payload) => payload,
    };
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => panic!("unexpected panic payload"),
        },
    }
}

/// Ticks `runtime` until it reports nothing left to run, returning the
/// number of ticks that reported runnable work.
///
/// # Panics
///
/// Panics when the runtime is still runnable after `limit` ticks.
pub fn ticks_until_idle(runtime: &CelsRuntime, limit: usize) -> usize {
    let mut ticks = 0;
    while runtime.run_step() {
        ticks += 1;
        assert!(ticks <= limit, "runtime still runnable after {limit} ticks");
    }
    ticks
}

/// Pushes `MF` as the root record on `controller` and calls into it, with
/// the null context as the return point.
///
/// This is the conventional way a host enters translated code: push the
/// frame, assign its parameters, call `f0`. The returned pointer stays valid
/// while the frame remains pushed, letting tests inspect the record while it
/// runs.
pub fn start_root<MF: Multiframe>(
    controller: &ExecutionController,
    set_params: impl FnOnce(&mut MF),
) -> *mut MF {
    let frame = unsafe { controller.push::<MF>() };
    set_params(frame);
    let frame = frame as *mut MF;
    controller.call(
        ExecutionContext::for_record(frame, MF::ENTRY),
        ExecutionContext::END,
    );
    frame
}
