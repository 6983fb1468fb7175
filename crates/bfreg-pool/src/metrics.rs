//! Register pool counters.
//!
//! [`PoolStats`] accumulates over the pool's lifetime and is read through
//! [`RegisterPool::stats`](crate::RegisterPool::stats).

/// Cumulative binding counters for one pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// `ensure` calls whose value was already resident.
    pub hits: u64,
    /// `ensure` calls that serialized the value into a register.
    pub misses: u64,
    /// Bound registers reclaimed for another value.
    pub evictions: u64,
    /// Registers released explicitly.
    pub releases: u64,
}

impl PoolStats {
    /// Fraction of `ensure` calls that were hits, or `None` before the first.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }
}
