//! Dispatch errors and the crate-level [`Error`].

use std::error::Error as StdError;
use std::fmt;

use bfreg_core::{ConfigError, KernelError, MemoryError};
use bfreg_pool::BindError;

/// Errors in selecting or shaping an operation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// No entry point with this name.
    UnknownOp {
        /// The requested name.
        name: String,
    },
    /// Operand count does not match the entry point.
    WrongArity {
        /// Entry point name.
        op: &'static str,
        /// Declared input count.
        expected: usize,
        /// Supplied input count.
        got: usize,
    },
    /// A typed wrapper expected a different number of results.
    ResultCount {
        /// Entry point name.
        op: &'static str,
        /// Results the wrapper can return.
        expected: usize,
        /// Results the entry point declares.
        got: usize,
    },
    /// The pool cannot hold every operand of one call at once.
    PoolTooSmall {
        /// Entry point name.
        op: &'static str,
        /// Registers the call needs.
        needed: usize,
        /// Pool capacity.
        capacity: usize,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOp { name } => write!(f, "unknown operation '{name}'"),
            Self::WrongArity { op, expected, got } => {
                write!(f, "'{op}' takes {expected} operands, got {got}")
            }
            Self::ResultCount { op, expected, got } => {
                write!(f, "'{op}' produces {got} results, caller expects {expected}")
            }
            Self::PoolTooSmall {
                op,
                needed,
                capacity,
            } => write!(
                f,
                "'{op}' needs {needed} registers but the pool has {capacity}"
            ),
        }
    }
}

impl StdError for DispatchError {}

/// Any failure of a [`Context`](crate::Context) operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Options or pool configuration rejected before any foreign call.
    Config(ConfigError),
    /// Binding, marshalling or a kernel call failed.
    Bind(BindError),
    /// The operation could not be dispatched.
    Dispatch(DispatchError),
}

impl Error {
    /// Whether the error reports corruption or exhaustion rather than a
    /// rejected argument.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Bind(e) => e.is_fatal(),
            Self::Dispatch(DispatchError::PoolTooSmall { .. }) => true,
            Self::Dispatch(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Bind(e) => write!(f, "{e}"),
            Self::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Bind(e) => Some(e),
            Self::Dispatch(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<BindError> for Error {
    fn from(e: BindError) -> Self {
        match e {
            BindError::Config(c) => Self::Config(c),
            other => Self::Bind(other),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<KernelError> for Error {
    fn from(e: KernelError) -> Self {
        Self::Bind(e.into())
    }
}

impl From<MemoryError> for Error {
    fn from(e: MemoryError) -> Self {
        Self::Bind(e.into())
    }
}
