use std::{cell::Cell, ptr};

use crate::{
    context::{ExecutionContext, FrameRecord, Multiframe},
    controller::ExecutionController,
};

/// A handle to an independent flow running a [`Multiframe`] on its own
/// controller.
///
/// The handle lives on the *caller's* frame record. [`init`](Self::init)
/// adopts a freshly claimed controller, installs an internal runner on it,
/// and arranges for the runner to record the task's result in the handle and
/// release the controller when the multiframe returns. The caller either
/// polls [`is_ready`](Self::is_ready) or abandons the handle with
/// [`detach`](Self::detach), after which the task runs to its natural end
/// without touching the handle again.
///
/// The handle's memory must stay live between `init` and either readiness or
/// detachment.
pub struct Task<R: Copy> {
    runner: Cell<*mut ()>,
    on_detach: Cell<Option<fn(*mut ())>>,
    detached: Cell<bool>,
    ready: Cell<bool>,
    result: Cell<Option<R>>,
}

impl<R: Copy> Default for Task<R> {
    fn default() -> Self {
        Self {
            runner: Cell::new(ptr::null_mut()),
            on_detach: Cell::new(None),
            detached: Cell::new(false),
            ready: Cell::new(false),
            result: Cell::new(None),
        }
    }
}

// Task handles live inside caller frame records.
unsafe impl<R: Copy> FrameRecord for Task<R> {}

impl<R: Copy> Task<R> {
    /// Starts `MF` as a task on a freshly claimed controller.
    ///
    /// `parent` is the caller's own frame record; `set_params` is invoked
    /// once at task entry to copy call parameters from the caller's scope
    /// into the new multiframe. Fatal when the launching controller has no
    /// runtime or the pool is exhausted.
    ///
    /// # Safety
    ///
    /// `parent` must point to a live `PF` record that stays valid until the
    /// task's runner has entered the multiframe (its first dispatch). `self`
    /// must stay live until the task is ready or detached.
    pub unsafe fn init<PF, MF>(
        &self,
        launching: &ExecutionController,
        parent: *const PF,
        set_params: fn(&PF, &mut MF),
    ) where
        MF: Multiframe<Output = R>,
    {
        let controller = launching.find_free_controller();
        self.detached.set(false);
        self.ready.set(false);
        self.result.set(None);

        let runner = unsafe { controller.push::<TaskRunner<PF, MF>>() };
        runner.task = self as *const Self as *mut Self;
        runner.parent = parent;
        runner.set_params = set_params;
        let runner = runner as *mut TaskRunner<PF, MF>;

        // The runner is the outermost frame on the task's controller: its
        // return context is the null context, so the runner's own return
        // terminates the controller's dispatch.
        controller.call(
            ExecutionContext::for_record(runner, TaskRunner::<PF, MF>::f0),
            ExecutionContext::END,
        );

        self.runner.set(runner.cast());
        self.on_detach.set(Some(TaskRunner::<PF, MF>::clear_task));
    }

    /// Abandons the handle, letting the task run to its natural end.
    ///
    /// The runner's back-pointer to this handle is cleared, so completion no
    /// longer writes the result or the ready flag. Idempotent.
    pub fn detach(&self) {
        if self.detached.get() {
            return;
        }
        if let Some(on_detach) = self.on_detach.get() {
            on_detach(self.runner.get());
        }
        self.detached.set(true);
    }

    /// True once the task's multiframe has returned, unless the handle was
    /// detached first.
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// The task's result, present once [`is_ready`](Self::is_ready) is true.
    pub fn result(&self) -> Option<R> {
        self.result.get()
    }
}

fn ignore_params<PF, MF>(_: &PF, _: &mut MF) {}

// The task's outermost frame: enters the multiframe with forwarded
// parameters, and on its return records the result and gives the controller
// back to the runtime.
struct TaskRunner<PF, MF: Multiframe> {
    task: *mut Task<MF::Output>,
    parent: *const PF,
    set_params: fn(&PF, &mut MF),
}

impl<PF, MF: Multiframe> Default for TaskRunner<PF, MF> {
    fn default() -> Self {
        Self {
            task: ptr::null_mut(),
            parent: ptr::null(),
            set_params: ignore_params::<PF, MF>,
        }
    }
}

unsafe impl<PF, MF: Multiframe> FrameRecord for TaskRunner<PF, MF> {
    const NAME: Option<&'static str> = Some("Task");
}

impl<PF, MF: Multiframe> TaskRunner<PF, MF> {
    // Entry: push the multiframe, forward parameters, call into it with this
    // runner as the return point.
    fn f0(record: *mut (), controller: &ExecutionController) {
        let runner = unsafe { &mut *record.cast::<Self>() };
        let frame = unsafe { controller.push::<MF>() };
        (runner.set_params)(unsafe { &*runner.parent }, frame);
        controller.call(
            ExecutionContext::for_record(frame as *mut MF, MF::ENTRY),
            ExecutionContext::for_record(record.cast::<Self>(), Self::f1),
        );
    }

    // Resumed when the multiframe returns: record the result unless the
    // handle detached, then unwind the runner's frames and release the
    // controller.
    fn f1(record: *mut (), controller: &ExecutionController) {
        let runner = unsafe { &*record.cast::<Self>() };
        {
            let frame = unsafe { controller.peek::<MF>() };
            if let Some(task) = unsafe { runner.task.as_ref() } {
                task.ready.set(true);
                task.result.set(Some(frame.return_value()));
            }
        }
        controller.pop(); // the multiframe
        controller.ret(); // to the null context saved at init
        controller.pop(); // the runner itself
        controller.release_from_runtime();
    }

    fn clear_task(record: *mut ()) {
        unsafe {
            (*record.cast::<Self>()).task = ptr::null_mut();
        }
    }
}
