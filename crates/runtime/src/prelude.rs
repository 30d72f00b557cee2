//! A convenient re-export of the types needed to work with the Cels runtime
//!
//! ```
//! use cels_runtime::prelude::*;
//! ```

pub use crate::{
    CelsRuntime, ErrorHandler, ExecutionContext, ExecutionController, FrameRecord, FrameStack,
    Multiframe, RuntimeSettings, StepFn, Task, YieldFn,
};

#[cfg(feature = "named")]
pub use crate::TraceFn;
