//! IEEE 754 interchange export for bfreg values.
//!
//! Pure bit packing over a value's resident fields: no kernel, no foreign
//! memory. Any `(precision, exponent_bits)` pair in range is a format,
//! so binary16/32/64/128 are just special cases.
//!
//! ```
//! use bfreg_core::{LogicalValue, Precision};
//! use bfreg_export::encode_hex;
//!
//! let one = LogicalValue::from_parts(false, 1, vec![0x8000_0000]);
//! assert_eq!(encode_hex(&one, Precision::Bits(53), 11).unwrap(), "0x3ff0000000000000");
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod bits;
pub mod error;
pub mod ieee;

pub use error::ExportError;
pub use ieee::{encode, encode_hex, encode_into, encode_with_options, to_hex};
