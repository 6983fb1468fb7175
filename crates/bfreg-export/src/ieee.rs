//! Fixed-width IEEE 754 interchange encoding.
//!
//! A format with `p` bits of precision and `e` exponent bits occupies
//! `p + e` bits: sign, exponent field, then `p - 1` fraction bits. Values
//! use the `0.1xxx × 2^expn` convention, so the bias is `2^(e-1) - 2`
//! rather than the textbook `2^(e-1) - 1`.
//!
//! Encoding truncates; the value is expected to have been rounded to `p`
//! bits already by whatever produced it.

use bfreg_core::value::LIMB_BITS;
use bfreg_core::{LogicalValue, Options, Precision, ValueClass};

use crate::bits::BitWriter;
use crate::error::ExportError;

/// Encode `value` as `ceil((precision + exponent_bits) / 8)` big-endian bytes.
///
/// Fails without producing output if the value's exponent falls outside
/// the format's normal and subnormal range.
///
/// The output always spans the full format width, whatever the value's
/// class: a zero at a precision near `PREC_MAX` is a buffer of about
/// 128 MiB. The buffer is only allocated once the format is validated.
pub fn encode(
    value: &LogicalValue,
    precision: Precision,
    exponent_bits: u32,
) -> Result<Vec<u8>, ExportError> {
    let Precision::Bits(prec) = precision else {
        return Err(ExportError::UnboundedPrecision);
    };
    Options::default()
        .with_precision(precision)
        .with_exponent_bits(exponent_bits)
        .resolve()?;

    let prec = i64::from(prec);
    let field_max = (1i64 << exponent_bits) - 1;
    let bias = (1i64 << (exponent_bits - 1)) - 2;
    let mut w = BitWriter::new((prec + i64::from(exponent_bits)) as u64);

    match value.class() {
        ValueClass::Zero => {
            w.push_bit(value.sign());
        }
        ValueClass::Infinite => {
            w.push_bit(value.sign());
            w.push_bits(field_max as u64, exponent_bits);
        }
        ValueClass::NaN => {
            w.push_bit(value.sign());
            w.push_bits(field_max as u64, exponent_bits);
            w.push_bit(true);
        }
        ValueClass::Finite => {
            let biased = i64::from(value.exponent()) + bias;
            if biased >= field_max {
                return Err(ExportError::ExponentOverflow {
                    biased,
                    max: field_max - 1,
                });
            }
            let min = 2 - prec;
            if biased < min {
                return Err(ExportError::ExponentUnderflow { biased, min });
            }
            w.push_bit(value.sign());
            let keep_leading = biased <= 0;
            if keep_leading {
                w.push_bits(0, exponent_bits);
                w.skip(biased.unsigned_abs());
            } else {
                w.push_bits(biased as u64, exponent_bits);
            }
            push_significand(&mut w, value, keep_leading);
        }
    }
    Ok(w.finish())
}

/// Limbs from most significant down, dropping the leading one unless
/// the encoding is subnormal. The writer cuts off at the format width.
fn push_significand(w: &mut BitWriter, value: &LogicalValue, keep_leading: bool) {
    let mut skip_first = !keep_leading;
    for &limb in value.limbs().iter().rev() {
        if w.remaining() == 0 {
            break;
        }
        if skip_first {
            w.push_bits(u64::from(limb), LIMB_BITS - 1);
            skip_first = false;
        } else {
            w.push_bits(u64::from(limb), LIMB_BITS);
        }
    }
}

/// Append the encoding of `value` to `out`. On error `out` is untouched.
pub fn encode_into(
    value: &LogicalValue,
    precision: Precision,
    exponent_bits: u32,
    out: &mut Vec<u8>,
) -> Result<(), ExportError> {
    out.extend(encode(value, precision, exponent_bits)?);
    Ok(())
}

/// [`encode`] with the precision and exponent width of `opts`.
pub fn encode_with_options(value: &LogicalValue, opts: &Options) -> Result<Vec<u8>, ExportError> {
    encode(value, opts.precision, opts.exponent_bits)
}

/// Lowercase hex of an encoding, `0x`-prefixed.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// [`encode`] then [`to_hex`].
pub fn encode_hex(
    value: &LogicalValue,
    precision: Precision,
    exponent_bits: u32,
) -> Result<String, ExportError> {
    encode(value, precision, exponent_bits).map(|b| to_hex(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfreg_core::ConfigError;
    use bfreg_test_utils::value_from_f64;
    use proptest::prelude::*;

    const BINARY64: (Precision, u32) = (Precision::Bits(53), 11);
    const BINARY32: (Precision, u32) = (Precision::Bits(24), 8);
    const BINARY16: (Precision, u32) = (Precision::Bits(11), 5);

    fn hex64(x: f64) -> String {
        encode_hex(&value_from_f64(x), BINARY64.0, BINARY64.1).unwrap()
    }

    #[test]
    fn one_is_3ff() {
        assert_eq!(hex64(1.0), "0x3ff0000000000000");
    }

    #[test]
    fn known_binary64_patterns() {
        assert_eq!(hex64(-2.0), "0xc000000000000000");
        assert_eq!(hex64(0.0), "0x0000000000000000");
        assert_eq!(hex64(-0.0), "0x8000000000000000");
        assert_eq!(hex64(f64::INFINITY), "0x7ff0000000000000");
        assert_eq!(hex64(f64::NEG_INFINITY), "0xfff0000000000000");
        assert_eq!(hex64(f64::NAN), "0x7ff8000000000000");
        assert_eq!(hex64(f64::MAX), "0x7fefffffffffffff");
        assert_eq!(hex64(f64::MIN_POSITIVE), "0x0010000000000000");
    }

    #[test]
    fn subnormals() {
        assert_eq!(hex64(f64::from_bits(1)), "0x0000000000000001");
        assert_eq!(hex64(f64::MIN_POSITIVE / 2.0), "0x0008000000000000");
    }

    #[test]
    fn half_precision() {
        let v = value_from_f64(1.0);
        assert_eq!(encode(&v, BINARY16.0, BINARY16.1).unwrap(), vec![0x3c, 0x00]);
        let v = value_from_f64(-65504.0);
        assert_eq!(encode_hex(&v, BINARY16.0, BINARY16.1).unwrap(), "0xfbff");
    }

    #[test]
    fn odd_width_is_left_aligned() {
        // 1 + 3 + 5 = 9 bits in two bytes; bias 2.
        let v = value_from_f64(1.5);
        assert_eq!(encode(&v, Precision::Bits(6), 3).unwrap(), vec![0b0011_1000, 0]);
    }

    #[test]
    fn overflow_writes_nothing() {
        let mut out = vec![0xaa];
        let big = value_from_f64(1e300);
        let err = encode_into(&big, BINARY32.0, BINARY32.1, &mut out).unwrap_err();
        assert!(matches!(err, ExportError::ExponentOverflow { .. }));
        assert_eq!(out, vec![0xaa]);
        let two_pow_1024 = LogicalValue::from_parts(false, 1025, vec![0x8000_0000]);
        assert_eq!(
            encode(&two_pow_1024, BINARY64.0, BINARY64.1),
            Err(ExportError::ExponentOverflow {
                biased: 2047,
                max: 2046
            })
        );
    }

    #[test]
    fn underflow_past_subnormals() {
        let tiny = value_from_f64(1e-300);
        assert!(matches!(
            encode(&tiny, BINARY32.0, BINARY32.1),
            Err(ExportError::ExponentUnderflow { .. })
        ));
    }

    #[test]
    fn unbounded_and_invalid_formats() {
        let v = value_from_f64(1.0);
        assert_eq!(
            encode(&v, Precision::Infinite, 11),
            Err(ExportError::UnboundedPrecision)
        );
        assert_eq!(
            encode(&v, Precision::Bits(53), 2),
            Err(ExportError::Config(ConfigError::InvalidExponentBits {
                value: 2
            }))
        );
        assert!(encode(&v, Precision::Bits(1), 11).is_err());
    }

    #[test]
    fn wide_significand_is_truncated() {
        let v = LogicalValue::from_parts(false, 1, vec![0xffff_ffff, 0xffff_ffff, 0x8000_0001]);
        let bytes = encode(&v, BINARY64.0, BINARY64.1).unwrap();
        // 52 fraction bits: 31 from the top limb, 21 from the next.
        assert_eq!(to_hex(&bytes), "0x3ff00000003fffff");
    }

    #[test]
    fn special_values_fill_the_format_width() {
        for x in [0.0, f64::INFINITY, f64::NAN] {
            let bytes = encode(&value_from_f64(x), Precision::Bits(200), 15).unwrap();
            assert_eq!(bytes.len(), 27);
        }
        let err = encode(&value_from_f64(0.0), Precision::Bits(1 << 30), 11);
        assert!(matches!(err, Err(ExportError::Config(_))));
    }

    #[test]
    fn options_select_format() {
        let v = value_from_f64(1.0);
        let opts = Options::default()
            .with_precision(Precision::Bits(24))
            .with_exponent_bits(8);
        assert_eq!(to_hex(&encode_with_options(&v, &opts).unwrap()), "0x3f800000");
    }

    proptest! {
        #[test]
        fn matches_native_binary64(bits in any::<u64>()) {
            let x = f64::from_bits(bits);
            prop_assume!(!x.is_nan());
            let got = encode(&value_from_f64(x), BINARY64.0, BINARY64.1).unwrap();
            prop_assert_eq!(got, bits.to_be_bytes().to_vec());
        }

        #[test]
        fn matches_native_binary32(bits in any::<u32>()) {
            let x = f32::from_bits(bits);
            prop_assume!(!x.is_nan());
            let got = encode(&value_from_f64(x as f64), BINARY32.0, BINARY32.1).unwrap();
            prop_assert_eq!(got, bits.to_be_bytes().to_vec());
        }

        #[test]
        fn deterministic(bits in any::<u64>(), prec in 2u32..80, eb in 3u32..16) {
            let v = value_from_f64(f64::from_bits(bits));
            let a = encode(&v, Precision::Bits(prec), eb);
            let b = encode(&v, Precision::Bits(prec), eb);
            prop_assert_eq!(&a, &b);
            if let Ok(bytes) = a {
                prop_assert_eq!(bytes.len() as u32, (prec + eb).div_ceil(8));
            }
        }
    }
}
