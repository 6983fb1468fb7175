//! Ready-made values for tests and benches.

use bfreg_core::{BigFloat, Limb, LogicalValue};

use crate::convert::value_from_f64;

/// A [`BigFloat`] holding `x` exactly.
pub fn big(x: f64) -> BigFloat {
    BigFloat::new(value_from_f64(x))
}

/// A [`BigFloat`] from raw fields.
pub fn raw(sign: bool, expn: i32, limbs: &[Limb]) -> BigFloat {
    BigFloat::new(LogicalValue::from_parts(sign, expn, limbs.to_vec()))
}

/// A finite value with `n` limbs, every limb distinct, leading bit set.
pub fn wide(n: usize) -> BigFloat {
    let mut limbs: Vec<Limb> = (1..=n as Limb).map(|i| i.wrapping_mul(0x0101_0101)).collect();
    if let Some(top) = limbs.last_mut() {
        *top |= 0x8000_0000;
    }
    BigFloat::new(LogicalValue::from_parts(false, 7, limbs))
}

/// `n` distinct small integers `1.0, 2.0, …`.
pub fn counting(n: usize) -> Vec<BigFloat> {
    (1..=n).map(|i| big(i as f64)).collect()
}
