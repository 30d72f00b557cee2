use std::{cell::Cell, hint, mem, ptr, ptr::NonNull};

use crate::{
    context::{ExecutionContext, FrameRecord, StepFn},
    error::{default_error_handler, ErrorHandler, Fault},
    runtime::CelsRuntime,
    stack::FrameStack,
};

/// Host predicate polled after every step dispatch; returning true ends the
/// controller's current tick.
///
/// The canonical use on the target hardware is a raster-position check that
/// bounds how much of the frame budget a tick may consume.
pub type YieldFn = fn() -> bool;

/// The default yield predicate: never end a tick early.
pub fn never_yield() -> bool {
    false
}

/// Sink for `CALL` / `RET FROM` trace events, receiving the event label and
/// the record's name.
#[cfg(feature = "named")]
pub type TraceFn = fn(&str, &str);

/// The single-threaded driver of one logical flow.
///
/// A controller owns a [`FrameStack`] of activation records and a *current
/// execution context* naming the step function to dispatch next. It runs
/// that context repeatedly until a step requests suspension, the yield
/// predicate ends the tick, or the context becomes null.
///
/// All methods take `&self`; the controller's state is interior-mutable so
/// that step functions, whose records live inside the controller's own
/// stack, can drive it without aliasing trouble. The controller is not
/// reentrant: a step function must not invoke its own controller's
/// [`run_step`](Self::run_step). It is neither `Send` nor `Sync`.
pub struct ExecutionController {
    stack: FrameStack,
    current: Cell<ExecutionContext>,
    must_suspend: Cell<bool>,
    yield_check: Cell<YieldFn>,
    error_handler: Cell<ErrorHandler>,
    runtime: Cell<Option<NonNull<CelsRuntime>>>,
    #[cfg(feature = "named")]
    trace: Cell<Option<TraceFn>>,
}

impl ExecutionController {
    /// A standalone controller over the given stack.
    ///
    /// The controller starts with the null context, the never-yield
    /// predicate, and the spinning default error handler. Without a runtime
    /// attached, task delegation is fatal.
    pub fn new(stack: FrameStack) -> Self {
        Self {
            stack,
            current: Cell::new(ExecutionContext::END),
            must_suspend: Cell::new(false),
            yield_check: Cell::new(never_yield),
            error_handler: Cell::new(default_error_handler),
            runtime: Cell::new(None),
            #[cfg(feature = "named")]
            trace: Cell::new(None),
        }
    }

    /// The controller's frame stack.
    pub fn stack(&self) -> &FrameStack {
        &self.stack
    }

    /// The context the controller will dispatch next.
    pub fn current_context(&self) -> ExecutionContext {
        self.current.get()
    }

    /// Installs the yield predicate.
    pub fn set_yield_check(&self, yield_check: YieldFn) {
        self.yield_check.set(yield_check);
    }

    /// Installs the error handler.
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        self.error_handler.set(handler);
    }

    /// Installs the sink receiving `CALL` / `RET FROM` events for named
    /// records.
    #[cfg(feature = "named")]
    pub fn set_trace_handler(&self, sink: TraceFn) {
        self.trace.set(Some(sink));
    }

    pub(crate) fn attach_runtime(&self, runtime: NonNull<CelsRuntime>) {
        self.runtime.set(Some(runtime));
    }

    /// Dispatches the current context until suspension, a yield, or the null
    /// context.
    ///
    /// Returns false when there is nothing to do (the context is null) and
    /// true when the controller is still runnable and gave up its tick
    /// voluntarily. The suspension request is cleared on exit.
    pub fn run_step(&self) -> bool {
        while !self.must_suspend.get() {
            let current = self.current.get();
            let Some(step) = current.step() else {
                return false;
            };
            step(current.record(), self);
            if (self.yield_check.get())() {
                break;
            }
        }
        self.must_suspend.set(false);
        true
    }

    /// Requests that [`run_step`](Self::run_step) exit before its next
    /// dispatch.
    ///
    /// This is the only legal suspension site: a step function calls
    /// `suspend`, installs its resumption point with a jump, and returns.
    pub fn suspend(&self) {
        self.must_suspend.set(true);
    }

    /// Replaces the current context.
    pub fn jump(&self, context: ExecutionContext) {
        self.current.set(context);
    }

    /// Replaces the current context with a step of the given record.
    pub fn jump_to<T: FrameRecord>(&self, record: *mut T, step: StepFn) {
        self.jump(ExecutionContext::for_record(record, step));
    }

    /// Sets the null context, terminating this controller's work.
    pub fn jump_end(&self) {
        self.jump(ExecutionContext::END);
    }

    /// Pushes a zero-initialized `T` frame and returns it.
    ///
    /// Reports `"Cels: Stack overflow"` and never returns when the frame
    /// doesn't fit.
    ///
    /// # Safety
    ///
    /// The returned borrow aliases the controller's arena and dies at the
    /// next [`pop`](Self::pop) of this frame. The caller must not hold it,
    /// or any other borrow of the same frame, across a point where the frame
    /// may be popped or re-borrowed.
    pub unsafe fn push<T: FrameRecord>(&self) -> &mut T {
        debug_assert!(mem::align_of::<T>() <= 16);
        match self.stack.push(mem::size_of::<T>(), mem::align_of::<T>()) {
            Some(slot) => {
                let record = slot.cast::<T>().as_ptr();
                unsafe {
                    ptr::write(record, T::default());
                    &mut *record
                }
            }
            None => self.fail(Fault::StackOverflow),
        }
    }

    /// Returns the last-pushed `T` frame.
    ///
    /// Reports `"Cels: Stack peek error"` and never returns when the stack
    /// holds no frame of `T`'s size.
    ///
    /// # Safety
    ///
    /// The top frame must actually be a `T` pushed by
    /// [`push`](Self::push); the stack only checks sizes. The returned
    /// borrow follows the same aliasing rules as `push`'s.
    pub unsafe fn peek<T: FrameRecord>(&self) -> &mut T {
        match self.stack.peek(mem::size_of::<T>()) {
            Some(slot) => unsafe { &mut *slot.cast::<T>().as_ptr() },
            None => self.fail(Fault::StackPeek),
        }
    }

    /// Pops the top frame.
    ///
    /// Reports `"Cels: Stack pop error"` and never returns when the stack is
    /// empty.
    pub fn pop(&self) {
        if !self.stack.pop() {
            self.fail(Fault::StackPop);
        }
    }

    /// Pushes `return_to` as the caller's return context and jumps to
    /// `callee`.
    pub fn call(&self, callee: ExecutionContext, return_to: ExecutionContext) {
        #[cfg(feature = "named")]
        self.trace_event("CALL", callee.name());
        unsafe {
            *self.push::<ExecutionContext>() = return_to;
        }
        self.jump(callee);
    }

    /// The call form emitted by the translator: builds both contexts from
    /// records and steps, then [`call`](Self::call)s.
    pub fn call_record<C: FrameRecord, RR: FrameRecord>(
        &self,
        record: *mut C,
        step: StepFn,
        return_record: *mut RR,
        return_step: StepFn,
    ) {
        self.call(
            ExecutionContext::for_record(record, step),
            ExecutionContext::for_record(return_record, return_step),
        );
    }

    /// Pops the saved return context and jumps to it.
    pub fn ret(&self) {
        let return_to = unsafe { *self.peek::<ExecutionContext>() };
        #[cfg(feature = "named")]
        self.trace_event("RET FROM", self.current.get().name());
        self.pop();
        self.jump(return_to);
    }

    /// Claims a free controller from the attached runtime.
    ///
    /// Fatal when no runtime is attached or the pool is exhausted.
    pub fn find_free_controller(&self) -> &ExecutionController {
        match self.runtime.get() {
            Some(runtime) => unsafe { runtime.as_ref() }.find_free_controller(),
            None => self.fail(Fault::NoRuntime),
        }
    }

    /// Hands this controller back to the attached runtime.
    ///
    /// Fatal when no runtime is attached or this controller isn't one of the
    /// runtime's.
    pub fn release_from_runtime(&self) {
        match self.runtime.get() {
            Some(runtime) => unsafe { runtime.as_ref() }.release_controller(self),
            None => self.fail(Fault::NoRuntime),
        }
    }

    #[cfg(feature = "named")]
    fn trace_event(&self, event: &str, name: Option<&'static str>) {
        if let (Some(sink), Some(name)) = (self.trace.get(), name) {
            sink(event, name);
        }
    }

    fn fail(&self, fault: Fault) -> ! {
        (self.error_handler.get())(fault.message());
        loop {
            hint::spin_loop();
        }
    }
}
