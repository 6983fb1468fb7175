//! Exact conversions between `f64` and [`LogicalValue`].
//!
//! Finite values are normalised so the top limb's most significant bit is
//! the leading one, with trailing zero limbs trimmed.

use bfreg_core::value::{Limb, LogicalValue, EXPN_INF, EXPN_NAN, EXPN_ZERO, LIMB_BITS};

/// Convert a float64 exactly.
pub fn value_from_f64(x: f64) -> LogicalValue {
    if x.is_nan() {
        return LogicalValue::nan();
    }
    let sign = x.is_sign_negative();
    if x.is_infinite() {
        return LogicalValue::infinity(sign);
    }
    if x == 0.0 {
        return LogicalValue::zero(sign);
    }
    let bits = x.abs().to_bits();
    let field = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);
    // |x| = m * 2^k
    let (m, k) = if field == 0 {
        (frac, -1074)
    } else {
        (frac | (1u64 << 52), field - 1075)
    };
    let lz = m.leading_zeros();
    let m = m << lz;
    let expn = k - lz as i32 + 64;
    let hi = (m >> LIMB_BITS) as Limb;
    let lo = m as Limb;
    let limbs = if lo == 0 { vec![hi] } else { vec![lo, hi] };
    LogicalValue::from_parts(sign, expn, limbs)
}

/// Round a value to the nearest float64, ties to even. Bits below the top
/// 64 of the significand are truncated first.
pub fn value_to_f64(v: &LogicalValue) -> f64 {
    let signed = |x: f64| if v.sign() { -x } else { x };
    match v.exponent() {
        EXPN_NAN => return f64::NAN,
        EXPN_INF => return signed(f64::INFINITY),
        EXPN_ZERO => return signed(0.0),
        _ => {}
    }
    let limbs = v.limbs();
    let top = |i: usize| -> u64 {
        limbs
            .len()
            .checked_sub(i + 1)
            .map_or(0, |idx| limbs[idx] as u64)
    };
    let m = (top(0) << LIMB_BITS) | top(1);
    signed(ldexp(m as f64, v.exponent() as i64 - 64))
}

fn ldexp(mut x: f64, mut e: i64) -> f64 {
    while e > 1023 {
        x *= f64::powi(2.0, 1023);
        e -= 1023;
        if x.is_infinite() {
            return x;
        }
    }
    while e < -1022 {
        x *= f64::powi(2.0, -1022);
        e += 1022;
        if x == 0.0 {
            return x;
        }
    }
    x * f64::powi(2.0, e as i32)
}
