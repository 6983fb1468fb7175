//! Operation dispatch for bfreg.
//!
//! A [`Context`] owns a [`Kernel`](bfreg_core::Kernel) and the
//! [`RegisterPool`](bfreg_pool::RegisterPool) carved out of its memory.
//! Values come in through [`Context::from_f64`], [`Context::parse`] and
//! [`Context::copy`], go out through [`Context::to_number`] and
//! [`Context::to_text`], and every arithmetic entry point in [`table::OPS`]
//! runs through the single routine [`Context::call`].
//!
//! ```
//! use bfreg_core::Options;
//! use bfreg_ops::Context;
//! use bfreg_test_utils::SoftKernel;
//!
//! let mut ctx = Context::with_defaults(SoftKernel::new()).unwrap();
//! let opts = Options::default();
//! let a = ctx.from_f64(1.5).unwrap();
//! let sum = ctx.add(&a, "2.5", &opts).unwrap();
//! assert_eq!(ctx.to_number(&sum, &opts).unwrap(), 4.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
mod convert;
pub mod dispatch;
pub mod error;
pub mod operand;
pub mod table;

pub use context::Context;
pub use dispatch::CallOutput;
pub use error::{DispatchError, Error};
pub use operand::Operand;
pub use table::{OpSpec, OpTable, OPS};
