//! End-to-end: ingest, compute, convert and export through the facade.

use bfreg::prelude::*;
use bfreg_test_utils::SoftKernel;

#[test]
fn compute_then_export() {
    let mut ctx = Context::new(SoftKernel::new(), PoolConfig::default()).unwrap();
    let opts = Options::default();

    let third = ctx.div(1.0, 3.0, &opts).unwrap();
    let back = ctx.to_number(&third, &opts).unwrap();
    assert_eq!(back, 1.0 / 3.0);
    assert_eq!(
        encode(third.value(), Precision::Bits(53), 11).unwrap(),
        (1.0f64 / 3.0).to_bits().to_be_bytes().to_vec()
    );

    let single = Options::default().with_precision(Precision::Bits(24));
    let third32 = ctx.div(1.0, 3.0, &single).unwrap();
    assert_eq!(
        encode_hex(third32.value(), Precision::Bits(24), 8).unwrap(),
        format!("{:#010x}", (1.0f32 / 3.0).to_bits())
    );

    ctx.teardown().unwrap();
    assert_eq!(ctx.kernel().live_allocations(), 0);
}

#[test]
fn export_needs_no_kernel() {
    let v = LogicalValue::infinity(true);
    assert_eq!(
        encode_hex(&v, Precision::Bits(11), 5).unwrap(),
        "0xfc00"
    );
}

#[test]
fn errors_classify() {
    let mut ctx = Context::new(SoftKernel::new(), PoolConfig::new(2)).unwrap();
    let opts = Options::default();
    let err = ctx.add(1.0, 2.0, &opts).unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::PoolTooSmall { .. })));
    assert!(err.is_fatal());

    let v = ctx.from_f64(1e300).unwrap();
    let export = encode(v.value(), Precision::Bits(24), 8).unwrap_err();
    assert!(matches!(export, ExportError::ExponentOverflow { .. }));
}

#[test]
fn many_values_few_registers() {
    let mut ctx = Context::new(SoftKernel::new(), PoolConfig::new(3)).unwrap();
    let opts = Options::default();
    let xs: Vec<BigFloat> = (1..=20).map(|i| ctx.from_f64(i as f64).unwrap()).collect();
    let mut total = ctx.from_f64(0.0).unwrap();
    for x in &xs {
        total = ctx.add(&total, x, &opts).unwrap();
    }
    assert_eq!(ctx.to_number(&total, &opts).unwrap(), 210.0);
    assert!(ctx.pool().bound_count() <= 3);
    let stats = ctx.pool().stats().clone();
    assert!(stats.evictions > 0);
    assert!(stats.hits > 0);
}
