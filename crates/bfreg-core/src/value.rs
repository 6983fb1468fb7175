//! Logical numeric values and their identity.
//!
//! A [`LogicalValue`] is the managed-side image of one kernel number:
//! `(-1)^sign × 0.1xxx₂ × 2^exponent`, the significand stored as 32-bit
//! limbs with the least significant limb first. Zero, infinity and NaN
//! are encoded through reserved exponent values and carry no limbs.
//!
//! A [`BigFloat`] pairs a value with a [`ValueId`], the identity the
//! register pool binds slots to.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One word of a multi-word significand.
pub type Limb = u32;

/// Width of a [`Limb`] in bits.
pub const LIMB_BITS: u32 = Limb::BITS;

/// Exponent sentinel for zero.
pub const EXPN_ZERO: i32 = i32::MIN;

/// Exponent sentinel for infinity.
pub const EXPN_INF: i32 = i32::MAX - 1;

/// Exponent sentinel for NaN.
pub const EXPN_NAN: i32 = i32::MAX;

/// Counter for unique [`ValueId`] allocation.
static VALUE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`BigFloat`].
///
/// Allocated from a monotonic counter and never reused, so a register
/// binding that outlives its value can be recognised as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u64);

impl ValueId {
    /// Allocate a fresh, unique id.
    pub fn next() -> Self {
        Self(VALUE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classification of a [`LogicalValue`] by its exponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueClass {
    /// Signed zero.
    Zero,
    /// A finite, nonzero number.
    Finite,
    /// Signed infinity.
    Infinite,
    /// Not a number.
    NaN,
}

/// Sign, exponent and optional limb buffer of one number.
///
/// The limb buffer is `None` whenever the limb count is zero, which is
/// always the case for the zero, infinity and NaN sentinels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalValue {
    sign: bool,
    expn: i32,
    limbs: Option<Vec<Limb>>,
}

impl LogicalValue {
    /// Signed zero.
    pub fn zero(sign: bool) -> Self {
        Self {
            sign,
            expn: EXPN_ZERO,
            limbs: None,
        }
    }

    /// Signed infinity.
    pub fn infinity(sign: bool) -> Self {
        Self {
            sign,
            expn: EXPN_INF,
            limbs: None,
        }
    }

    /// Not a number.
    pub fn nan() -> Self {
        Self {
            sign: false,
            expn: EXPN_NAN,
            limbs: None,
        }
    }

    /// Build a value from raw fields. An empty `limbs` vector is stored
    /// as an absent buffer.
    pub fn from_parts(sign: bool, expn: i32, limbs: Vec<Limb>) -> Self {
        Self {
            sign,
            expn,
            limbs: if limbs.is_empty() { None } else { Some(limbs) },
        }
    }

    /// `true` for negative values (including `-0` and `-inf`).
    pub fn sign(&self) -> bool {
        self.sign
    }

    /// Raw exponent, possibly one of the sentinels.
    pub fn exponent(&self) -> i32 {
        self.expn
    }

    /// Significand limbs, least significant first. Empty when absent.
    pub fn limbs(&self) -> &[Limb] {
        self.limbs.as_deref().unwrap_or(&[])
    }

    /// Number of limbs in the significand.
    pub fn limb_count(&self) -> usize {
        self.limbs.as_ref().map_or(0, Vec::len)
    }

    /// Whether a limb buffer is present.
    pub fn has_buffer(&self) -> bool {
        self.limbs.is_some()
    }

    /// Allocated limb capacity, zero when the buffer is absent.
    pub fn limb_capacity(&self) -> usize {
        self.limbs.as_ref().map_or(0, Vec::capacity)
    }

    /// Classify by exponent sentinel.
    pub fn class(&self) -> ValueClass {
        match self.expn {
            EXPN_ZERO => ValueClass::Zero,
            EXPN_INF => ValueClass::Infinite,
            EXPN_NAN => ValueClass::NaN,
            _ => ValueClass::Finite,
        }
    }

    /// Whether this is a signed zero.
    pub fn is_zero(&self) -> bool {
        self.class() == ValueClass::Zero
    }

    /// Whether this is NaN.
    pub fn is_nan(&self) -> bool {
        self.class() == ValueClass::NaN
    }

    /// Whether this is a signed infinity.
    pub fn is_infinite(&self) -> bool {
        self.class() == ValueClass::Infinite
    }

    /// Overwrite sign and exponent.
    pub fn set_header(&mut self, sign: bool, expn: i32) {
        self.sign = sign;
        self.expn = expn;
    }

    /// Resize the limb buffer to exactly `len` limbs and return it for
    /// filling.
    ///
    /// `len == 0` drops the buffer. Otherwise the existing allocation is
    /// reused when its capacity suffices; if not, a buffer of exactly
    /// `len` limbs is allocated. Contents are zeroed either way.
    pub fn resize_limbs(&mut self, len: usize) -> &mut [Limb] {
        if len == 0 {
            self.limbs = None;
            return &mut [];
        }
        match &mut self.limbs {
            Some(buf) if buf.capacity() >= len => {
                buf.clear();
                buf.resize(len, 0);
            }
            slot => {
                let mut buf = Vec::with_capacity(len);
                buf.resize(len, 0);
                *slot = Some(buf);
            }
        }
        match self.limbs.as_deref_mut() {
            Some(buf) => buf,
            None => &mut [],
        }
    }
}

impl Default for LogicalValue {
    fn default() -> Self {
        Self::zero(false)
    }
}

/// A logical value with a register-binding identity.
///
/// Values are logically immutable: operations produce new `BigFloat`s.
/// Cloning allocates a fresh [`ValueId`], so a clone is never mistaken
/// for the original by the register pool.
#[derive(Debug)]
pub struct BigFloat {
    id: ValueId,
    value: LogicalValue,
}

impl BigFloat {
    /// Wrap a logical value under a fresh identity.
    pub fn new(value: LogicalValue) -> Self {
        Self {
            id: ValueId::next(),
            value,
        }
    }

    /// The identity the register pool binds to.
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// The resident logical fields.
    pub fn value(&self) -> &LogicalValue {
        &self.value
    }

    /// Mutable access to the resident fields, used to resynchronize a
    /// value from its register after a kernel call wrote to it.
    ///
    /// Changing fields by hand while the value is bound leaves the
    /// register holding the old fields.
    pub fn value_mut(&mut self) -> &mut LogicalValue {
        &mut self.value
    }

    /// Unwrap into the logical fields.
    pub fn into_value(self) -> LogicalValue {
        self.value
    }
}

impl Clone for BigFloat {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<LogicalValue> for BigFloat {
    fn from(value: LogicalValue) -> Self {
        Self::new(value)
    }
}

impl Default for BigFloat {
    fn default() -> Self {
        Self::new(LogicalValue::default())
    }
}
