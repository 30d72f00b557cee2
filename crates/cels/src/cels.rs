use std::pin::Pin;

use crate::{
    CelsRuntime, ExecutionContext, ExecutionController, Multiframe, Result, RuntimeSettings,
};

/// A runtime in the conventional configuration, with helpers for driving
/// translated code.
///
/// `Cels` is a convenience for hosts that don't need to wire the runtime by
/// hand: it owns a pinned [`CelsRuntime`] and exposes the usual entry
/// pattern (push a root record on the main controller, assign its
/// parameters, call into it, then tick until done). Hosts that interleave
/// their own per-tick work keep calling [`tick`](Self::tick) from their own
/// loop instead.
pub struct Cels {
    runtime: Pin<Box<CelsRuntime>>,
}

impl Default for Cels {
    fn default() -> Self {
        Self::new()
    }
}

impl Cels {
    /// A runtime with the default settings.
    pub fn new() -> Self {
        Self {
            runtime: CelsRuntime::new(),
        }
    }

    /// A runtime with the provided settings.
    pub fn with_settings(settings: RuntimeSettings) -> Result<Self> {
        Ok(Self {
            runtime: CelsRuntime::with_settings(settings)?,
        })
    }

    /// The wrapped runtime.
    pub fn runtime(&self) -> &CelsRuntime {
        &self.runtime
    }

    /// The runtime's main controller.
    pub fn main_controller(&self) -> &ExecutionController {
        self.runtime.main_controller()
    }

    /// Pushes `MF` as the root record on the main controller and calls into
    /// it.
    ///
    /// `set_params` assigns the record's parameters before entry. The
    /// returned pointer addresses the root frame and stays valid while the
    /// frame remains pushed; hosts read the record's return slot through it
    /// once the run finishes.
    pub fn start<MF: Multiframe>(&self, set_params: fn(&mut MF)) -> *mut MF {
        let controller = self.runtime.main_controller();
        let frame = unsafe { controller.push::<MF>() };
        set_params(frame);
        let frame = frame as *mut MF;
        controller.call(
            ExecutionContext::for_record(frame, MF::ENTRY),
            ExecutionContext::END,
        );
        frame
    }

    /// One scheduling tick over the runtime's busy controllers.
    ///
    /// Returns true while any controller is still runnable.
    pub fn tick(&self) -> bool {
        self.runtime.run_step()
    }

    /// Ticks until no controller reports runnable work.
    pub fn run_to_completion(&self) {
        while self.tick() {}
    }
}
