//! A convenient re-export of the types used when embedding Cels
//!
//! ```
//! use cels::prelude::*;
//! ```

pub use crate::{
    Cels, CelsRuntime, ExecutionContext, ExecutionController, FrameRecord, FrameStack, Multiframe,
    RuntimeSettings, StepFn, Task,
};
