//! Spawns a task on a second controller and polls it from the main flow.
//!
//! The main record starts a countdown as a task, keeps doing its own work
//! one tick at a time, and picks up the task's result once the handle
//! reports ready.

use cels::prelude::*;

#[derive(Default)]
struct Countdown {
    params: CountdownParams,
    return_value: i32,
    i: i32,
}

#[derive(Default)]
struct CountdownParams {
    suspends: i32,
    value: i32,
}

unsafe impl FrameRecord for Countdown {
    const NAME: Option<&'static str> = Some("countdown");
}

impl Multiframe for Countdown {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl Countdown {
    fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.i < ctx.params.suspends {
            ctx.i += 1;
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f0);
        } else {
            ctx.return_value = ctx.params.value;
            controller.ret();
        }
    }
}

#[derive(Default)]
struct MainLoop {
    return_value: i32,
    task: Task<i32>,
    polls: i32,
}

unsafe impl FrameRecord for MainLoop {
    const NAME: Option<&'static str> = Some("main_loop");
}

impl Multiframe for MainLoop {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl MainLoop {
    fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        unsafe {
            ctx.task.init::<Self, Countdown>(controller, record.cast::<Self>(), |_, frame| {
                frame.params.suspends = 3;
                frame.params.value = 42;
            });
        }
        controller.suspend();
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.task.is_ready() {
            ctx.return_value = ctx.task.result().unwrap_or(-1);
            controller.ret();
        } else {
            ctx.polls += 1;
            println!("main loop: task not ready yet (poll {})", ctx.polls);
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f1);
        }
    }
}

fn main() {
    let cels = Cels::new();
    let record = cels.start::<MainLoop>(|_| {});
    cels.run_to_completion();
    println!("task result: {}", unsafe { (*record).return_value });
}
