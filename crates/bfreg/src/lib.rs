//! bfreg: managed big-float values over a bounded pool of foreign registers.
//!
//! This is the facade crate re-exporting the public API of the bfreg
//! sub-crates. A compiled arithmetic kernel exposes a handful of 16-byte
//! slots in its linear memory; bfreg makes any number of live values share
//! them through LRU binding, marshals fields in and out around each call,
//! and packs results into IEEE 754 interchange formats.
//!
//! # Quick start
//!
//! ```rust
//! use bfreg::prelude::*;
//! use bfreg_test_utils::SoftKernel;
//!
//! let mut ctx = Context::new(SoftKernel::new(), PoolConfig::new(4)).unwrap();
//! let opts = Options::default();
//!
//! let a = ctx.parse("0.75", &opts).unwrap();
//! let b = ctx.from_f64(0.25).unwrap();
//! let sum = ctx.add(&a, &b, &opts).unwrap();
//!
//! assert_eq!(ctx.to_text(&sum, &opts).unwrap(), "1");
//! assert_eq!(
//!     encode_hex(sum.value(), Precision::Bits(53), 11).unwrap(),
//!     "0x3ff0000000000000"
//! );
//! ctx.teardown().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `bfreg-core` | Value model, options, foreign memory, `Kernel` trait |
//! | [`pool`] | `bfreg-pool` | Register pool, marshalling, scratch buffers |
//! | [`ops`] | `bfreg-ops` | `Context`, operation table, dispatch |
//! | [`export`] | `bfreg-export` | IEEE 754 encoding |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Value model, options, foreign memory and the kernel trait (`bfreg-core`).
pub use bfreg_core as types;

/// Register pool, marshalling protocol and scratch buffers (`bfreg-pool`).
///
/// Most users reach the pool through [`ops::Context`]; use this module to
/// drive a [`pool::RegisterPool`] against a kernel directly.
pub use bfreg_pool as pool;

/// Operation dispatch (`bfreg-ops`).
pub use bfreg_ops as ops;

/// IEEE 754 interchange encoding (`bfreg-export`).
pub use bfreg_export as export;

/// Common imports for typical bfreg usage.
pub mod prelude {
    // Values and options
    pub use bfreg_core::{
        BigFloat, FormatOptions, LogicalValue, Options, ParseFlags, Precision, RoundingMode,
        TextFormat, ValueClass,
    };

    // Kernel seam
    pub use bfreg_core::{Kernel, LinearMemory, Status};

    // Pool
    pub use bfreg_pool::{PoolConfig, PoolStats};

    // Dispatch
    pub use bfreg_ops::{CallOutput, Context, Operand};

    // Export
    pub use bfreg_export::{encode, encode_hex, to_hex};

    // Errors
    pub use bfreg_core::{ConfigError, KernelError, MemoryError};
    pub use bfreg_export::ExportError;
    pub use bfreg_ops::{DispatchError, Error};
    pub use bfreg_pool::BindError;
}
