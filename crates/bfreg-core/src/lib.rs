//! Core types and traits for the bfreg register-binding layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! pieces every other crate speaks in terms of: the logical value model
//! and its exponent sentinels, the option surface that is validated
//! before any foreign call, the foreign [`LinearMemory`] with its typed
//! word views, and the [`Kernel`] trait standing in for the compiled
//! arithmetic kernel.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod kernel;
pub mod memory;
pub mod options;
pub mod value;

pub use error::{ConfigError, KernelError, MemoryError};
pub use kernel::{Kernel, Status};
pub use memory::{LinearMemory, Ptr, DOUBLE_SIZE, PAGE_SIZE, WORD_SIZE};
pub use options::{
    FormatOptions, Options, ParseFlags, Precision, ResolvedOptions, RoundingMode, TextFormat,
};
pub use value::{BigFloat, Limb, LogicalValue, ValueClass, ValueId};
