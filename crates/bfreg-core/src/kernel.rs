//! The compiled arithmetic kernel, seen from the binding layer.
//!
//! The kernel owns its [`LinearMemory`] and exposes entry points that take
//! slot pointers or raw byte pointers plus scalar configuration words.
//! Its algorithms are opaque here; this crate only fixes the calling
//! convention and the binary layout of a slot.
//!
//! # Slot layout
//!
//! ```text
//! offset  0  sign   (signed word, 0 or 1)
//! offset  4  expn   (signed word, may be a sentinel)
//! offset  8  len    (unsigned word, limb count)
//! offset 12  tab    (pointer to `len` limbs, kernel-allocated)
//! ```

use std::fmt;

use crate::error::KernelError;
use crate::memory::{LinearMemory, Ptr, WORD_SIZE};
use crate::options::RoundingMode;

/// Byte offset of the sign word inside a slot.
pub const SLOT_SIGN: u32 = 0;
/// Byte offset of the exponent word inside a slot.
pub const SLOT_EXPN: u32 = WORD_SIZE;
/// Byte offset of the limb-count word inside a slot.
pub const SLOT_LEN: u32 = 2 * WORD_SIZE;
/// Byte offset of the limb-buffer pointer inside a slot.
pub const SLOT_TAB: u32 = 3 * WORD_SIZE;
/// Minimum slot size in bytes.
pub const SLOT_SIZE: u32 = 4 * WORD_SIZE;

/// Status word returned by arithmetic entry points.
///
/// Zero means an exact result; other bits report IEEE-style exceptions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    /// Exact result.
    pub const OK: Status = Status(0);
    /// Invalid operation (result is NaN).
    pub const INVALID_OP: u32 = 1 << 0;
    /// Division by zero.
    pub const DIVIDE_ZERO: u32 = 1 << 1;
    /// Overflow.
    pub const OVERFLOW: u32 = 1 << 2;
    /// Underflow.
    pub const UNDERFLOW: u32 = 1 << 3;
    /// Inexact result.
    pub const INEXACT: u32 = 1 << 4;
    /// The kernel ran out of memory mid-operation.
    pub const MEM_ERROR: u32 = 1 << 5;

    /// Whether the result is exact.
    pub fn is_exact(self) -> bool {
        self.0 == 0
    }

    /// Whether `bit` is set.
    pub fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Whether any bit other than [`INEXACT`](Self::INEXACT) is set.
    pub fn is_exceptional(self) -> bool {
        self.0 & !Self::INEXACT != 0
    }

    /// Fail with [`KernelError::Exhausted`] if [`MEM_ERROR`](Self::MEM_ERROR)
    /// is set, otherwise pass the status through.
    pub fn check(self, entry: &str) -> Result<Self, KernelError> {
        if self.has(Self::MEM_ERROR) {
            return Err(KernelError::Exhausted {
                entry: entry.to_string(),
            });
        }
        Ok(self)
    }
}

impl std::ops::BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Self) -> Self {
        Status(self.0 | rhs.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Entry points of the compiled arithmetic kernel.
///
/// All pointers address [`memory`](Kernel::memory). Implementations must
/// keep every slot's limb buffer exactly `len` limbs long.
pub trait Kernel {
    /// The kernel's linear memory.
    fn memory(&self) -> &LinearMemory;

    /// Mutable access to the kernel's linear memory.
    fn memory_mut(&mut self) -> &mut LinearMemory;

    /// Allocate `size` raw bytes, 8-byte aligned.
    ///
    /// Fails with [`KernelError::OutOfMemory`] when memory cannot grow.
    fn malloc(&mut self, size: u32) -> Result<Ptr, KernelError>;

    /// Release an allocation made by [`malloc`](Kernel::malloc).
    fn free(&mut self, ptr: Ptr);

    /// Put the slot at `slot` into the canonical empty state (zero, no
    /// buffer). Does not release a buffer the slot may still point to.
    fn init(&mut self, slot: Ptr) -> Result<(), KernelError>;

    /// Resize the slot's limb buffer to `len` limbs and record `len`.
    /// `len == 0` releases the buffer.
    fn resize(&mut self, slot: Ptr, len: u32) -> Result<(), KernelError>;

    /// Copy `src` into `dst`.
    fn set(&mut self, dst: Ptr, src: Ptr) -> Result<Status, KernelError>;

    /// Store a float64 into `dst` exactly.
    fn set_float64(&mut self, dst: Ptr, value: f64) -> Result<Status, KernelError>;

    /// Round `src` to a float64 and write it to the 8-byte cell at `out`.
    fn get_float64(
        &mut self,
        src: Ptr,
        out: Ptr,
        rounding: RoundingMode,
    ) -> Result<Status, KernelError>;

    /// Parse the null-terminated text at `text` into `dst`.
    fn atof(
        &mut self,
        dst: Ptr,
        text: Ptr,
        radix: u32,
        prec: u32,
        flags: u32,
    ) -> Result<Status, KernelError>;

    /// Format `src` into a freshly allocated byte buffer, store its address
    /// in the word at `out`, and return its length. The caller releases
    /// the buffer.
    fn ftoa(
        &mut self,
        out: Ptr,
        src: Ptr,
        radix: u32,
        prec: u32,
        flags: u32,
    ) -> Result<u32, KernelError>;

    /// Invoke the named arithmetic entry point with
    /// `(outputs..., inputs..., prec, flags)`.
    fn invoke(
        &mut self,
        name: &str,
        outputs: &[Ptr],
        inputs: &[Ptr],
        prec: u32,
        flags: u32,
    ) -> Result<Status, KernelError>;
}
