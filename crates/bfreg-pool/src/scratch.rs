//! Temporary foreign buffers scoped to a single call.
//!
//! Every buffer allocated here is freed before the helper returns, on the
//! success path and on every error path alike.

use bfreg_core::{Kernel, LinearMemory, Ptr};

use crate::error::BindError;

/// Allocate `size` bytes aligned to `align`, run `f`, then free them.
pub fn with_scratch<K, T, E, F>(kernel: &mut K, size: u32, align: u32, f: F) -> Result<T, E>
where
    K: Kernel,
    E: From<BindError>,
    F: FnOnce(&mut K, Ptr) -> Result<T, E>,
{
    let ptr = kernel.malloc(size).map_err(BindError::from)?;
    if let Err(e) = LinearMemory::check_aligned(ptr, align) {
        kernel.free(ptr);
        return Err(BindError::from(e).into());
    }
    let out = f(kernel, ptr);
    kernel.free(ptr);
    out
}

/// Copy `text` into a fresh NUL-terminated buffer, run `f`, then free it.
pub fn with_cstr<K, T, E, F>(kernel: &mut K, text: &str, f: F) -> Result<T, E>
where
    K: Kernel,
    E: From<BindError>,
    F: FnOnce(&mut K, Ptr) -> Result<T, E>,
{
    let len = u32::try_from(text.len() + 1).map_err(|_| {
        BindError::Kernel(bfreg_core::KernelError::OutOfMemory {
            requested: u32::MAX,
        })
    })?;
    with_scratch(kernel, len, 1, |kernel, ptr| {
        let mem = kernel.memory_mut();
        mem.write_bytes(ptr, text.as_bytes()).map_err(BindError::from)?;
        mem.write_bytes(ptr + len - 1, &[0]).map_err(BindError::from)?;
        f(kernel, ptr)
    })
}
