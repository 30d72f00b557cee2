use std::{cell::Cell, hint, marker::PhantomPinned, mem, pin::Pin, ptr::NonNull};

use crate::{
    controller::{never_yield, ExecutionController, YieldFn},
    error::{default_error_handler, Error, ErrorHandler, Fault, Result},
    stack::FrameStack,
};

/// The configurable settings used to construct a [`CelsRuntime`].
pub struct RuntimeSettings {
    /// Number of controllers in the pool. Must be at least 1; controller 0
    /// is the main controller.
    pub controllers: usize,

    /// Per-controller frame stack capacity in 32-bit words.
    pub stack_words: usize,

    /// Yield predicate installed into every controller.
    pub yield_check: YieldFn,

    /// Error handler installed into the runtime and every controller.
    pub error_handler: ErrorHandler,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            controllers: 4,
            stack_words: 512,
            yield_check: never_yield,
            error_handler: default_error_handler,
        }
    }
}

// One busy flag per controller, claimed by linear scan.
struct BusyFlags {
    flags: Box<[Cell<bool>]>,
}

impl BusyFlags {
    fn with_len(len: usize) -> Self {
        Self {
            flags: (0..len).map(|_| Cell::new(false)).collect(),
        }
    }

    fn claim_free(&self) -> Option<usize> {
        for (index, flag) in self.flags.iter().enumerate() {
            if flag.get() {
                continue;
            }
            flag.set(true);
            return Some(index);
        }
        None
    }

    fn mark(&self, index: usize) {
        self.flags[index].set(true);
    }

    fn release(&self, index: usize) {
        self.flags[index].set(false);
    }

    fn is_busy(&self, index: usize) -> bool {
        self.flags[index].get()
    }
}

/// A fixed pool of controllers multiplexing independent logical flows.
///
/// The runtime provisions every controller with its own [`FrameStack`] at
/// construction and never allocates again. Controller 0 is the *main
/// controller*: it is busy from construction, is never released, and its
/// null context is the conventional termination signal for the host loop.
///
/// The runtime is pinned because every controller carries a back-pointer to
/// it; it is constructed once at program start and lives until termination,
/// with controllers re-used across task lifetimes.
pub struct CelsRuntime {
    controllers: Box<[ExecutionController]>,
    busy: BusyFlags,
    error_handler: Cell<ErrorHandler>,
    _pinned: PhantomPinned,
}

impl CelsRuntime {
    /// A runtime with the default settings: 4 controllers with 512-word
    /// stacks.
    pub fn new() -> Pin<Box<Self>> {
        match Self::with_settings(RuntimeSettings::default()) {
            Ok(runtime) => runtime,
            Err(_) => unreachable!("default settings are valid"),
        }
    }

    /// A runtime with the provided settings.
    pub fn with_settings(settings: RuntimeSettings) -> Result<Pin<Box<Self>>> {
        if settings.controllers == 0 {
            return Err(Error::NoControllers);
        }
        if settings.stack_words == 0 {
            return Err(Error::EmptyStacks);
        }

        let controllers: Box<[ExecutionController]> = (0..settings.controllers)
            .map(|_| {
                let controller =
                    ExecutionController::new(FrameStack::with_capacity(settings.stack_words));
                controller.set_yield_check(settings.yield_check);
                controller.set_error_handler(settings.error_handler);
                controller
            })
            .collect();

        let runtime = Box::pin(Self {
            controllers,
            busy: BusyFlags::with_len(settings.controllers),
            error_handler: Cell::new(settings.error_handler),
            _pinned: PhantomPinned,
        });

        let backref = NonNull::from(&*runtime);
        for controller in runtime.controllers.iter() {
            controller.attach_runtime(backref);
        }

        // The main controller is busy for the runtime's whole lifetime.
        runtime.busy.mark(0);

        Ok(runtime)
    }

    /// The main controller.
    pub fn main_controller(&self) -> &ExecutionController {
        &self.controllers[0]
    }

    /// The controller at `index`, when in range.
    pub fn controller(&self, index: usize) -> Option<&ExecutionController> {
        self.controllers.get(index)
    }

    /// The number of controllers in the pool.
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// True when the controller at `index` is in use.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range.
    pub fn is_busy(&self, index: usize) -> bool {
        self.busy.is_busy(index)
    }

    /// Installs `handler` into the runtime and all of its controllers.
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        self.error_handler.set(handler);
        for controller in self.controllers.iter() {
            controller.set_error_handler(handler);
        }
    }

    /// Installs `yield_check` into all of the runtime's controllers.
    pub fn set_yield_check(&self, yield_check: YieldFn) {
        for controller in self.controllers.iter() {
            controller.set_yield_check(yield_check);
        }
    }

    /// Claims the first free controller, marking it busy.
    ///
    /// Reports `"Controllers busy"` and never returns when the pool is
    /// exhausted.
    pub fn find_free_controller(&self) -> &ExecutionController {
        match self.busy.claim_free() {
            Some(index) => &self.controllers[index],
            None => self.fail(Fault::ControllersBusy),
        }
    }

    /// Returns `controller` to the pool.
    ///
    /// The controller's stack is not reset; the task runner protocol leaves
    /// it empty before releasing. Reports
    /// `"Controller not managed by runtime"` and never returns when
    /// `controller` isn't one of this runtime's.
    pub fn release_controller(&self, controller: &ExecutionController) {
        let base = self.controllers.as_ptr() as usize;
        let addr = controller as *const ExecutionController as usize;
        let offset = addr.wrapping_sub(base);
        let size = mem::size_of::<ExecutionController>();
        if addr < base || offset % size != 0 || offset / size >= self.controllers.len() {
            self.fail(Fault::ForeignController);
        }
        self.busy.release(offset / size);
    }

    /// One scheduling tick: dispatches every busy controller once, in index
    /// order.
    ///
    /// Returns true while at least one controller reported itself runnable.
    /// The main controller stops reporting runnable once its context is
    /// null, which is the usual signal for the host loop to stop ticking.
    pub fn run_step(&self) -> bool {
        let mut runnable = false;
        for (index, controller) in self.controllers.iter().enumerate() {
            if !self.busy.is_busy(index) {
                continue;
            }
            runnable |= controller.run_step();
        }
        runnable
    }

    fn fail(&self, fault: Fault) -> ! {
        (self.error_handler.get())(fault.message());
        loop {
            hint::spin_loop();
        }
    }
}
