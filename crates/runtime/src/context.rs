use std::ptr;

use crate::controller::ExecutionController;

/// One slice of a translated function, between two suspension points.
///
/// Step functions receive a type-erased pointer to their own frame record and
/// the controller dispatching them. Before returning, every step must either
/// suspend, install its successor with [`jump`](ExecutionController::jump) /
/// [`call`](ExecutionController::call) / [`ret`](ExecutionController::ret),
/// or terminate the controller's work with
/// [`jump_end`](ExecutionController::jump_end).
pub type StepFn = fn(*mut (), &ExecutionController);

/// Marker for types that can live on a controller's [`FrameStack`]
/// (crate::FrameStack).
///
/// # Safety
///
/// Implementors assert that the type:
///
/// - has no `Drop` glue — popped frames are abandoned, never dropped;
/// - has an alignment of at most 16 bytes, the stack's block alignment;
/// - is fully initialized by its `Default` value, which is written into the
///   zeroed slot on push.
pub unsafe trait FrameRecord: Default + Sized {
    /// Name reported in call traces when the `named` feature is enabled.
    const NAME: Option<&'static str> = None;
}

/// A compiler-emitted frame record with a designated entry step and a return
/// slot.
///
/// Translated functions are emitted as a record type holding a `params`
/// aggregate, one slot per local that is live across a suspension, an
/// optional return slot, and static step functions `f0..fK`. This trait names
/// the pieces the task machinery needs: the entry step (`f0` by convention)
/// and the return slot's type and accessor. The set of record behaviors is
/// closed; no open-ended dispatch is involved.
pub trait Multiframe: FrameRecord {
    /// The value produced in the record's return slot.
    type Output: Copy;

    /// The record's entry step.
    const ENTRY: StepFn;

    /// Reads the return slot. Only meaningful once the record has returned.
    fn return_value(&self) -> Self::Output;
}

/// What a controller runs next: a frame record paired with a step function.
///
/// The *null* context ([`ExecutionContext::END`]) carries no record; reaching
/// it ends the owning controller's dispatch. Contexts are themselves frame
/// records: [`call`](ExecutionController::call) pushes the caller's return
/// context onto the frame stack and [`ret`](ExecutionController::ret) pops
/// it back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExecutionContext {
    record: *mut (),
    step: Option<StepFn>,
    #[cfg(feature = "named")]
    name: Option<&'static str>,
}

impl ExecutionContext {
    /// The null context.
    pub const END: Self = Self {
        record: ptr::null_mut(),
        step: None,
        #[cfg(feature = "named")]
        name: None,
    };

    /// A context for a type-erased record.
    pub fn new(record: *mut (), step: StepFn) -> Self {
        Self {
            record,
            step: Some(step),
            #[cfg(feature = "named")]
            name: None,
        }
    }

    /// A context for a typed record, keeping the record's trace name.
    pub fn for_record<T: FrameRecord>(record: *mut T, step: StepFn) -> Self {
        Self {
            record: record.cast(),
            step: Some(step),
            #[cfg(feature = "named")]
            name: T::NAME,
        }
    }

    /// True for the null context.
    pub fn is_end(&self) -> bool {
        self.record.is_null()
    }

    /// The context's frame record.
    pub fn record(&self) -> *mut () {
        self.record
    }

    /// The context's step function, or `None` for the null context.
    pub fn step(&self) -> Option<StepFn> {
        self.step
    }

    /// The record's trace name, when it exposes one.
    #[cfg(feature = "named")]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::END
    }
}

// Return contexts live on the frame stack between call and ret.
unsafe impl FrameRecord for ExecutionContext {}
