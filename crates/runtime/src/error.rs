use std::fmt;
use thiserror::Error;

/// The closed set of fatal conditions a controller or runtime can report.
///
/// Faults are delivered to the installed [`ErrorHandler`] as fixed strings;
/// translated programs never observe them as values. They either indicate
/// resource exhaustion (the stack or the controller pool is full) or a
/// protocol violation in a miscompiled frame record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// A frame push would exceed the stack's capacity.
    StackOverflow,
    /// A peek reached past the top of the stack.
    StackPeek,
    /// A pop was issued against an empty stack.
    StackPop,
    /// Every controller in the runtime's pool is in use.
    ControllersBusy,
    /// A released controller doesn't belong to the releasing runtime.
    ForeignController,
    /// A controller was asked to delegate to a runtime it isn't attached to.
    NoRuntime,
}

impl Fault {
    /// The message handed to the error handler, verbatim.
    pub const fn message(self) -> &'static str {
        match self {
            Self::StackOverflow => "Cels: Stack overflow",
            Self::StackPeek => "Cels: Stack peek error",
            Self::StackPop => "Cels: Stack pop error",
            Self::ControllersBusy => "Controllers busy",
            Self::ForeignController => "Controller not managed by runtime",
            Self::NoRuntime => "No runtime set",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Handler invoked with a [`Fault`] message on fatal conditions.
///
/// The handler's contract is to log and halt; it is not expected to return.
/// If it does return, the reporting controller spins forever.
pub type ErrorHandler = fn(&str);

/// The default error handler: spin without reporting.
pub fn default_error_handler(_message: &str) {
    loop {
        std::hint::spin_loop();
    }
}

/// Errors reported while constructing a runtime.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The settings asked for an empty controller pool.
    #[error("a runtime needs at least one controller")]
    NoControllers,
    /// The settings asked for zero-capacity controller stacks.
    #[error("controller stacks need a non-zero word capacity")]
    EmptyStacks,
}

/// The Result type used by the Cels runtime.
pub type Result<T> = std::result::Result<T, Error>;
