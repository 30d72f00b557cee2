//! The cooperative execution core for Cels-translated programs
//!
//! An upstream translator lowers structured functions into *frame records*:
//! plain structs holding the function's parameters, the locals that are live
//! across a suspension, an optional return slot, and a set of step functions
//! that slice the function at its suspension points. This crate executes
//! those records cooperatively, with no OS scheduler, no heap allocation
//! after initialization, and a fixed memory budget:
//!
//! - [`FrameStack`]: a bump-allocated arena of activation records over a
//!   fixed block of 32-bit words.
//! - [`ExecutionController`]: the single-threaded driver of one logical
//!   flow, dispatching step functions and exposing the call/return/jump
//!   primitives they use.
//! - [`CelsRuntime`]: a fixed pool of controllers driven round-robin, one
//!   tick at a time.
//! - [`Task`]: a handle that runs a record to completion on its own
//!   controller, with ready/detach semantics.
//!
//! Everything here is single-threaded by construction; the types are neither
//! `Send` nor `Sync`.

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

mod context;
mod controller;
mod error;
mod runtime;
mod stack;
mod task;

pub mod prelude;

pub use crate::{
    context::{ExecutionContext, FrameRecord, Multiframe, StepFn},
    controller::{never_yield, ExecutionController, YieldFn},
    error::{default_error_handler, Error, ErrorHandler, Fault, Result},
    runtime::{CelsRuntime, RuntimeSettings},
    stack::FrameStack,
    task::Task,
};

#[cfg(feature = "named")]
pub use crate::controller::TraceFn;
