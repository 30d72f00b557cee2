//! # Cels
//!
//! The top-level interface for running Cels-translated programs.
//!
//! The heavy lifting lives in [`cels_runtime`]: a frame-stack arena, the
//! execution controllers that dispatch compiler-emitted step functions, a
//! fixed controller pool, and the task machinery. This crate re-exports that
//! core and adds [`Cels`], a small wrapper that owns a runtime in the
//! conventional configuration and drives translated code through it.
//!
//! ```
//! use cels::prelude::*;
//! # use cels_test_utils::SumMultiframe;
//!
//! let cels = Cels::new();
//! let record = cels.start::<SumMultiframe>(|frame| {
//!     frame.params.v = [1, 2, 3, 4];
//!     frame.params.n = 4;
//! });
//! cels.run_to_completion();
//! assert_eq!(unsafe { (*record).return_value }, 10);
//! ```

#![warn(missing_docs)]

mod cels;

pub mod prelude;

pub use cels_runtime as runtime;
pub use cels_runtime::{
    default_error_handler, never_yield, CelsRuntime, Error, ErrorHandler, ExecutionContext,
    ExecutionController, Fault, FrameRecord, FrameStack, Multiframe, Result, RuntimeSettings,
    StepFn, Task, YieldFn,
};

#[cfg(feature = "named")]
pub use cels_runtime::TraceFn;

pub use crate::cels::Cels;
