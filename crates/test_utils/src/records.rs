//! Frame records in the shape the upstream translator emits: a `params`
//! aggregate, flat slots for locals that live across suspensions, an
//! optional `return_value` slot, and static step functions `f0..fK`.

use cels_runtime::prelude::*;

/// Parameters of [`SumMultiframe`].
#[derive(Default)]
pub struct SumMultiframeParams {
    /// The values to accumulate.
    pub v: [i32; 4],
    /// How many of them to visit.
    pub n: i32,
}

/// Accumulates `params.v[..n]`, suspending once per iteration.
#[derive(Default)]
pub struct SumMultiframe {
    /// Call parameters, assigned by the caller before entry.
    pub params: SumMultiframeParams,
    /// The accumulated sum, valid after the record returns.
    pub return_value: i32,
    s: i32,
    i: i32,
}

unsafe impl FrameRecord for SumMultiframe {
    const NAME: Option<&'static str> = Some("sum_multiframe");
}

impl Multiframe for SumMultiframe {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl SumMultiframe {
    /// Entry step.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    /// Initializes the accumulator locals.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        ctx.s = 0;
        ctx.i = 0;
        controller.jump_to(record.cast::<Self>(), Self::f2);
    }

    /// One accumulation per tick, then the return.
    pub fn f2(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.i < ctx.params.n {
            ctx.s += ctx.params.v[ctx.i as usize];
            ctx.i += 1;
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f2);
        } else {
            ctx.return_value = ctx.s;
            controller.ret();
        }
    }
}

/// Parameters of [`ReturnsConstant`].
#[derive(Default)]
pub struct ReturnsConstantParams {
    /// The value to return.
    pub value: i32,
}

/// Returns `params.value` from its first step, without suspending.
#[derive(Default)]
pub struct ReturnsConstant {
    /// Call parameters, assigned by the caller before entry.
    pub params: ReturnsConstantParams,
    /// The returned value.
    pub return_value: i32,
}

unsafe impl FrameRecord for ReturnsConstant {
    const NAME: Option<&'static str> = Some("returns_constant");
}

impl Multiframe for ReturnsConstant {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl ReturnsConstant {
    /// Entry step: store the value and return.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        ctx.return_value = ctx.params.value;
        controller.ret();
    }
}

/// Calls [`ReturnsConstant`] on the same controller and keeps its result.
#[derive(Default)]
pub struct CallsHelper {
    /// The helper's result, copied in the post-call step.
    pub return_value: i32,
    /// Set once the post-call step has run.
    pub finished: bool,
}

unsafe impl FrameRecord for CallsHelper {
    const NAME: Option<&'static str> = Some("calls_helper");
}

impl Multiframe for CallsHelper {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl CallsHelper {
    /// Entry step: push the helper frame, assign its parameters, call it.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        let helper = unsafe { controller.push::<ReturnsConstant>() };
        helper.params.value = 7;
        let helper = helper as *mut ReturnsConstant;
        controller.call_record(helper, ReturnsConstant::ENTRY, record.cast::<Self>(), Self::f1);
    }

    /// Post-call step: read the helper's return slot, pop its frame, return.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        {
            let helper = unsafe { controller.peek::<ReturnsConstant>() };
            ctx.return_value = helper.return_value;
        }
        controller.pop();
        ctx.finished = true;
        controller.ret();
    }
}

/// Parameters of [`CountdownMultiframe`].
#[derive(Default)]
pub struct CountdownMultiframeParams {
    /// How many times to suspend before returning.
    pub suspends: i32,
    /// The value to return.
    pub value: i32,
}

/// Suspends `params.suspends` times, then returns `params.value`.
#[derive(Default)]
pub struct CountdownMultiframe {
    /// Call parameters, assigned by the caller before entry.
    pub params: CountdownMultiframeParams,
    /// The returned value.
    pub return_value: i32,
    i: i32,
}

unsafe impl FrameRecord for CountdownMultiframe {
    const NAME: Option<&'static str> = Some("countdown");
}

impl Multiframe for CountdownMultiframe {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl CountdownMultiframe {
    /// Entry step.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    /// One suspension per tick until the countdown runs out.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.i < ctx.params.suspends {
            ctx.i += 1;
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f1);
        } else {
            ctx.return_value = ctx.params.value;
            controller.ret();
        }
    }
}

/// Parameters of [`SpawnsCountdown`].
#[derive(Default)]
pub struct SpawnsCountdownParams {
    /// Forwarded to the spawned [`CountdownMultiframe`].
    pub suspends: i32,
    /// Forwarded to the spawned [`CountdownMultiframe`].
    pub value: i32,
}

/// Spawns a [`CountdownMultiframe`] task and polls it to completion.
#[derive(Default)]
pub struct SpawnsCountdown {
    /// Call parameters, assigned by the caller before entry.
    pub params: SpawnsCountdownParams,
    /// The spawned task's handle.
    pub task: Task<i32>,
    /// The task's result, copied once the task is ready.
    pub return_value: i32,
}

unsafe impl FrameRecord for SpawnsCountdown {
    const NAME: Option<&'static str> = Some("spawns_countdown");
}

impl Multiframe for SpawnsCountdown {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl SpawnsCountdown {
    /// Entry step: start the task on a fresh controller, then wait.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        unsafe {
            ctx.task.init::<Self, CountdownMultiframe>(
                controller,
                record.cast::<Self>(),
                |parent, frame| {
                    frame.params.suspends = parent.params.suspends;
                    frame.params.value = parent.params.value;
                },
            );
        }
        controller.suspend();
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    /// Polls the task once per tick; returns once it is ready.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.task.is_ready() {
            ctx.return_value = ctx.task.result().unwrap_or(-1);
            controller.ret();
        } else {
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f1);
        }
    }
}

/// Spawns a [`CountdownMultiframe`] task, then abandons it after one tick.
#[derive(Default)]
pub struct DetachingSpawner {
    /// Call parameters, assigned by the caller before entry.
    pub params: SpawnsCountdownParams,
    /// The spawned task's handle.
    pub task: Task<i32>,
}

unsafe impl FrameRecord for DetachingSpawner {
    const NAME: Option<&'static str> = Some("detaching_spawner");
}

impl DetachingSpawner {
    /// Entry step: start the task, then yield once.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        unsafe {
            ctx.task.init::<Self, CountdownMultiframe>(
                controller,
                record.cast::<Self>(),
                |parent, frame| {
                    frame.params.suspends = parent.params.suspends;
                    frame.params.value = parent.params.value;
                },
            );
        }
        controller.suspend();
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    /// Detaches the task and ends this controller's work.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        ctx.task.detach();
        controller.jump_end();
    }
}

/// Jumps to itself forever without suspending; only a yield predicate ends
/// its ticks.
#[derive(Default)]
pub struct SpinsForever {
    /// Number of step dispatches so far.
    pub steps: i32,
}

unsafe impl FrameRecord for SpinsForever {
    const NAME: Option<&'static str> = Some("spins_forever");
}

impl SpinsForever {
    /// The only step: count and continue.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        ctx.steps += 1;
        controller.jump_to(record.cast::<Self>(), Self::f0);
    }
}

/// Parameters of [`WaitsMultiframe`].
#[derive(Default)]
pub struct WaitsMultiframeParams {
    /// How many times to suspend before returning.
    pub suspends: i32,
}

/// Suspends `params.suspends` times, then returns unit.
#[derive(Default)]
pub struct WaitsMultiframe {
    /// Call parameters, assigned by the caller before entry.
    pub params: WaitsMultiframeParams,
    i: i32,
}

unsafe impl FrameRecord for WaitsMultiframe {
    const NAME: Option<&'static str> = Some("waits");
}

impl Multiframe for WaitsMultiframe {
    type Output = ();
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) {}
}

impl WaitsMultiframe {
    /// Entry step.
    pub fn f0(record: *mut (), controller: &ExecutionController) {
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    /// One suspension per tick until the wait runs out.
    pub fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.i < ctx.params.suspends {
            ctx.i += 1;
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f1);
        } else {
            controller.ret();
        }
    }
}

/// A record larger than small test stacks, for overflow scenarios.
pub struct BulkyRecord {
    /// Payload only there for its size.
    pub bytes: [u8; 100],
}

impl Default for BulkyRecord {
    fn default() -> Self {
        Self { bytes: [0; 100] }
    }
}

unsafe impl FrameRecord for BulkyRecord {}
