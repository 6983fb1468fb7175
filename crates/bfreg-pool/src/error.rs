//! Register-binding error types.

use std::error::Error;
use std::fmt;

use bfreg_core::{ConfigError, KernelError, MemoryError, ValueId};

/// Errors raised while binding values to registers or marshalling them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// A computed slot index fell outside `[0, N)`.
    SlotOutOfRange {
        /// The offending index.
        slot: u32,
        /// Pool capacity N.
        capacity: u32,
    },
    /// The binding table and the slot owner table disagree.
    WrongOwner {
        /// The slot whose owner did not match.
        slot: u32,
        /// The value the binding table pointed at it.
        expected: ValueId,
    },
    /// An operand bound earlier in the same call lost its register.
    OperandEvicted {
        /// The evicted operand.
        value: ValueId,
    },
    /// Foreign memory access failed (alignment or bounds).
    Memory(MemoryError),
    /// A kernel entry point failed.
    Kernel(KernelError),
    /// The pool configuration is invalid.
    Config(ConfigError),
    /// The pool has been torn down.
    TornDown,
}

impl BindError {
    /// Whether the error signals corruption or exhaustion that the
    /// caller cannot recover from by changing arguments.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::TornDown => false,
            Self::Kernel(KernelError::UnknownEntryPoint { .. }) => false,
            Self::Kernel(KernelError::Failed { .. }) => false,
            _ => true,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange { slot, capacity } => {
                write!(f, "invalid register number {slot} (capacity {capacity})")
            }
            Self::WrongOwner { slot, expected } => {
                write!(f, "wrong object found in register {slot}, expected {expected}")
            }
            Self::OperandEvicted { value } => {
                write!(f, "operand {value} was evicted before the kernel call")
            }
            Self::Memory(e) => write!(f, "foreign memory: {e}"),
            Self::Kernel(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::TornDown => write!(f, "register pool has been torn down"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            Self::Kernel(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemoryError> for BindError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}

impl From<KernelError> for BindError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::Memory(m) => Self::Memory(m),
            other => Self::Kernel(other),
        }
    }
}

impl From<ConfigError> for BindError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
