//! Register pool and marshalling protocol for bfreg.
//!
//! A kernel works on a handful of fixed 16-byte slots ("registers") in
//! its linear memory. This crate makes those N slots behave as if every
//! [`BigFloat`](bfreg_core::BigFloat) had a private one.
//!
//! # Architecture
//!
//! ```text
//! RegisterPool
//! ├── register block (N × register_size bytes, one kernel allocation)
//! ├── owners[N]          slot → ValueId   (no lifetime extension)
//! ├── bindings           ValueId → slot   (IndexMap, ≤ N entries)
//! └── LruList            index-linked recency order, O(1) promote/evict
//! ```
//!
//! [`marshal`] translates between a value's fields and a slot's layout,
//! [`scratch`] owns every temporary foreign buffer for the duration of a
//! single call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
mod lru;
pub mod marshal;
pub mod metrics;
pub mod pool;
pub mod scratch;

pub use config::PoolConfig;
pub use error::BindError;
pub use metrics::PoolStats;
pub use pool::RegisterPool;
