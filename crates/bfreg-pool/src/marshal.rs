//! Translation between a [`LogicalValue`] and a slot's binary layout.
//!
//! [`serialize`] pushes managed fields into a slot, asking the kernel for
//! a limb buffer of exactly the right length. [`deserialize`] pulls them
//! back after a kernel call. The two are exact inverses for every value,
//! including the no-buffer case.

use bfreg_core::kernel::{SLOT_EXPN, SLOT_LEN, SLOT_SIGN, SLOT_TAB};
use bfreg_core::{Kernel, LinearMemory, LogicalValue, Ptr, WORD_SIZE};

use crate::error::BindError;

/// Initialise the slot at `slot` from `value`.
///
/// The slot must not own a limb buffer (freshly initialised or cleared),
/// since `init` forgets the buffer pointer.
pub fn serialize<K: Kernel>(
    kernel: &mut K,
    value: &LogicalValue,
    slot: Ptr,
) -> Result<(), BindError> {
    LinearMemory::check_aligned(slot, WORD_SIZE)?;
    kernel.init(slot)?;
    let mem = kernel.memory_mut();
    mem.write_sword(slot + SLOT_SIGN, value.sign() as i32)?;
    mem.write_sword(slot + SLOT_EXPN, value.exponent())?;
    kernel.resize(slot, value.limb_count() as u32)?;
    if value.has_buffer() {
        let tab = kernel.memory().read_word(slot + SLOT_TAB)?;
        LinearMemory::check_aligned(tab, WORD_SIZE)?;
        kernel.memory_mut().write_words(tab, value.limbs())?;
    }
    Ok(())
}

/// Resynchronize `value` from the slot at `slot`.
///
/// A zero limb count clears the value's buffer; otherwise the existing
/// buffer is reused when large enough.
pub fn deserialize<K: Kernel>(
    kernel: &K,
    slot: Ptr,
    value: &mut LogicalValue,
) -> Result<(), BindError> {
    LinearMemory::check_aligned(slot, WORD_SIZE)?;
    let mem = kernel.memory();
    let sign = mem.read_sword(slot + SLOT_SIGN)? != 0;
    let expn = mem.read_sword(slot + SLOT_EXPN)?;
    let len = mem.read_word(slot + SLOT_LEN)? as usize;
    value.set_header(sign, expn);
    if len == 0 {
        value.resize_limbs(0);
        return Ok(());
    }
    let tab = mem.read_word(slot + SLOT_TAB)?;
    LinearMemory::check_aligned(tab, WORD_SIZE)?;
    mem.read_words(tab, value.resize_limbs(len))?;
    Ok(())
}

/// Release the slot's limb buffer, leaving it safe to reinitialise.
pub fn clear<K: Kernel>(kernel: &mut K, slot: Ptr) -> Result<(), BindError> {
    kernel.resize(slot, 0)?;
    Ok(())
}

/// Decode the slot at `slot` into a new value.
pub fn read<K: Kernel>(kernel: &K, slot: Ptr) -> Result<LogicalValue, BindError> {
    let mut value = LogicalValue::default();
    deserialize(kernel, slot, &mut value)?;
    Ok(value)
}
