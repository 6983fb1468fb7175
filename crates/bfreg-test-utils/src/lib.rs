//! Test utilities and a reference kernel for bfreg development.
//!
//! [`SoftKernel`] implements [`Kernel`](bfreg_core::Kernel) over a real
//! [`LinearMemory`](bfreg_core::LinearMemory) with an instrumented
//! allocator, so tests can observe every foreign allocation and release.
//! Its arithmetic runs in binary64; it exists to exercise the binding
//! layer, not to be a multiprecision library.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod convert;
pub mod fixtures;
mod heap;
mod kernel;

pub use convert::{value_from_f64, value_to_f64};
pub use kernel::{SoftKernel, HEAP_BASE};
