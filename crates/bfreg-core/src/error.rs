//! Error types shared across the bfreg workspace.
//!
//! Grouped by where the failure is detected: option validation before any
//! foreign call ([`ConfigError`]), typed access to foreign memory
//! ([`MemoryError`]), and the kernel entry points themselves
//! ([`KernelError`]).

use std::error::Error;
use std::fmt;

use crate::memory::Ptr;

/// Invalid configuration, detected before any foreign call.
///
/// Always reported, never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Radix is neither 0 nor in `2..=36`.
    InvalidRadix {
        /// The rejected radix.
        value: u32,
    },
    /// Precision outside `PREC_MIN..=PREC_MAX`.
    InvalidPrecision {
        /// The rejected precision.
        value: u32,
    },
    /// Rounding mode name or code not recognised.
    InvalidRoundingMode {
        /// The rejected name or code.
        value: String,
    },
    /// Text format name not recognised.
    InvalidFormat {
        /// The rejected name.
        value: String,
    },
    /// Exponent width outside `EXPN_BITS_MIN..=EXPN_BITS_MAX`.
    InvalidExponentBits {
        /// The rejected width.
        value: u32,
    },
    /// Register pool parameters are unusable.
    InvalidPool {
        /// Which constraint was violated.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRadix { value } => write!(f, "invalid radix {value}"),
            Self::InvalidPrecision { value } => write!(f, "invalid precision {value}"),
            Self::InvalidRoundingMode { value } => write!(f, "invalid rounding mode {value}"),
            Self::InvalidFormat { value } => write!(f, "invalid text format {value}"),
            Self::InvalidExponentBits { value } => write!(f, "invalid exponent bits {value}"),
            Self::InvalidPool { reason } => write!(f, "invalid register pool: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Failure of a typed access to foreign memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// A pointer violates the alignment contract of its view.
    ///
    /// Indicates allocator corruption; fatal.
    Misaligned {
        /// The offending address.
        ptr: Ptr,
        /// Required alignment in bytes.
        align: u32,
    },
    /// An access reaches past the end of linear memory.
    OutOfBounds {
        /// Start of the access.
        ptr: Ptr,
        /// Length of the access in bytes.
        len: usize,
        /// Current memory size in bytes.
        size: usize,
    },
    /// Text read from foreign memory is not UTF-8.
    InvalidUtf8 {
        /// Start of the text.
        ptr: Ptr,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned { ptr, align } => {
                write!(f, "ptr {ptr} not aligned to {align} bytes")
            }
            Self::OutOfBounds { ptr, len, size } => {
                write!(
                    f,
                    "access of {len} bytes at {ptr} exceeds memory size {size}"
                )
            }
            Self::InvalidUtf8 { ptr } => write!(f, "text at {ptr} is not valid UTF-8"),
        }
    }
}

impl Error for MemoryError {}

/// Failure reported by a kernel entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// The foreign allocator could not grow. Fatal, never retried.
    OutOfMemory {
        /// Bytes requested.
        requested: u32,
    },
    /// An entry point reported running out of memory mid-operation. Fatal;
    /// its outputs are not trusted.
    Exhausted {
        /// The entry point that failed.
        entry: String,
    },
    /// The kernel exports no entry point with this name.
    UnknownEntryPoint {
        /// The missing name.
        name: String,
    },
    /// The kernel touched foreign memory illegally.
    Memory(MemoryError),
    /// Any other kernel-side failure.
    Failed {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "foreign allocator exhausted allocating {requested} bytes")
            }
            Self::Exhausted { entry } => {
                write!(f, "kernel entry point {entry} ran out of memory")
            }
            Self::UnknownEntryPoint { name } => write!(f, "unknown kernel entry point {name}"),
            Self::Memory(e) => write!(f, "kernel memory fault: {e}"),
            Self::Failed { reason } => write!(f, "kernel call failed: {reason}"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemoryError> for KernelError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}
