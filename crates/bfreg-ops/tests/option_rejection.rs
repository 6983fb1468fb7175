//! Option validation happens before any foreign call.
//!
//! Each invalid setting must produce its own error kind, and the kernel
//! must see no allocation, slot initialisation or entry-point call.

use bfreg_core::options::PREC_MIN;
use bfreg_core::{ConfigError, Options, Precision, RoundingMode};
use bfreg_ops::{Context, Error};
use bfreg_pool::PoolConfig;
use bfreg_test_utils::SoftKernel;

fn rejected(opts: Options) -> ConfigError {
    let mut ctx = Context::new(SoftKernel::new(), PoolConfig::new(4)).unwrap();
    let allocs = ctx.kernel().total_allocs();
    let err = ctx.div(1.0, 3.0, &opts).unwrap_err();
    assert_eq!(ctx.kernel().total_allocs(), allocs);
    assert_eq!(ctx.kernel().call_count("set_float64"), 0);
    assert_eq!(ctx.kernel().call_count("div"), 0);
    assert!(!err.is_fatal());
    match err {
        Error::Config(e) => e,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn radix_one() {
    assert_eq!(
        rejected(Options::default().with_radix(1)),
        ConfigError::InvalidRadix { value: 1 }
    );
}

#[test]
fn radix_thirty_seven() {
    assert_eq!(
        rejected(Options::default().with_radix(37)),
        ConfigError::InvalidRadix { value: 37 }
    );
}

#[test]
fn precision_below_minimum() {
    let p = PREC_MIN - 1;
    assert_eq!(
        rejected(Options::default().with_precision(Precision::Bits(p))),
        ConfigError::InvalidPrecision { value: p }
    );
}

#[test]
fn exponent_width_out_of_range() {
    assert_eq!(
        rejected(Options::default().with_exponent_bits(31)),
        ConfigError::InvalidExponentBits { value: 31 }
    );
}

#[test]
fn unrecognised_rounding_mode() {
    let err = "roundHalfDown".parse::<RoundingMode>().unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidRoundingMode {
            value: "roundHalfDown".into()
        }
    );
    assert!(RoundingMode::try_from(9).is_err());
}

#[test]
fn error_kinds_are_distinct() {
    let kinds = [
        ConfigError::InvalidRadix { value: 1 },
        ConfigError::InvalidPrecision { value: 1 },
        ConfigError::InvalidRoundingMode { value: "x".into() },
    ];
    for (i, a) in kinds.iter().enumerate() {
        for b in &kinds[i + 1..] {
            assert_ne!(std::mem::discriminant(a), std::mem::discriminant(b));
        }
    }
}

#[test]
fn valid_extremes_are_accepted() {
    let mut ctx = Context::new(SoftKernel::new(), PoolConfig::new(4)).unwrap();
    for opts in [
        Options::default().with_radix(2),
        Options::default().with_radix(36),
        Options::default().with_precision(Precision::Bits(PREC_MIN)),
        Options::default().with_precision(Precision::Infinite),
        Options::default().with_exponent_bits(3),
    ] {
        ctx.add(1.0, 2.0, &opts).unwrap();
    }
}
