//! Benchmark profiles for the bfreg register-binding layer.
//!
//! - [`sample_f64s`]: seeded finite float64 inputs
//! - [`access_pattern`]: seeded value indices with a hot working set
//! - [`churn_context`]: a [`Context`] over a [`SoftKernel`] with a small pool

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use bfreg_ops::Context;
use bfreg_pool::PoolConfig;
use bfreg_test_utils::SoftKernel;

/// `n` finite, nonzero float64s spread over many binades.
pub fn sample_f64s(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            // Mantissa in [1, 2), exponent in [-64, 64), random sign.
            let bits = rng.next_u64();
            let mantissa = 1.0 + (bits >> 11) as f64 / (1u64 << 53) as f64;
            let exp = (rng.next_u32() % 128) as i32 - 64;
            let x = mantissa * 2f64.powi(exp);
            if bits & 1 == 1 {
                -x
            } else {
                x
            }
        })
        .collect()
}

/// `len` indices into `0..values`, with `hot_percent`% of accesses going
/// to the first `hot` values.
pub fn access_pattern(seed: u64, values: usize, hot: usize, hot_percent: u32, len: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let r = rng.next_u64();
            if (r % 100) < u64::from(hot_percent) && hot > 0 {
                (r >> 8) as usize % hot
            } else {
                (r >> 8) as usize % values
            }
        })
        .collect()
}

/// A context with `registers` registers over a kernel with room to grow.
pub fn churn_context(registers: u32) -> Context<SoftKernel> {
    match Context::new(SoftKernel::with_pages(4, 256), PoolConfig::new(registers)) {
        Ok(ctx) => ctx,
        Err(e) => panic!("benchmark context: {e}"),
    }
}
