//! The LRU register pool.
//!
//! [`RegisterPool`] binds values to a fixed set of foreign slots. The pool
//! records only [`ValueId`]s, never references: a value can be dropped at
//! any time, and its register is simply reclaimed the next time it reaches
//! the least-recently-used position.
//!
//! Every binding is write-through at bind time and read-back after each
//! kernel call (see [`marshal`](crate::marshal)), so a value's resident
//! fields are always authoritative and eviction never needs to copy data
//! back out of foreign memory.

use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use bfreg_core::{BigFloat, Kernel, LinearMemory, Ptr, ValueId, WORD_SIZE};

use crate::config::PoolConfig;
use crate::error::BindError;
use crate::lru::LruList;
use crate::marshal;
use crate::metrics::PoolStats;

/// A bounded pool of foreign registers with strict LRU eviction.
///
/// The pool does not own the kernel; every operation that touches foreign
/// memory borrows it. Call [`teardown`](Self::teardown) with the same
/// kernel before dropping it to release the foreign allocations.
#[derive(Debug)]
pub struct RegisterPool {
    config: PoolConfig,
    base: Ptr,
    owners: Vec<Option<ValueId>>,
    bindings: IndexMap<ValueId, u32>,
    lru: LruList,
    stats: PoolStats,
    torn_down: bool,
}

impl RegisterPool {
    /// Allocate the register block and initialise every slot.
    pub fn new<K: Kernel>(kernel: &mut K, config: PoolConfig) -> Result<Self, BindError> {
        config.validate()?;
        let base = kernel.malloc(config.block_bytes())?;
        if let Err(e) = LinearMemory::check_aligned(base, WORD_SIZE) {
            kernel.free(base);
            return Err(e.into());
        }
        let pool = Self {
            base,
            owners: vec![None; config.num_registers as usize],
            bindings: IndexMap::with_capacity(config.num_registers as usize),
            lru: LruList::new(config.num_registers),
            stats: PoolStats::default(),
            torn_down: false,
            config,
        };
        for n in 0..pool.capacity() {
            if let Err(e) = kernel.init(pool.slot_ptr(n)?) {
                kernel.free(base);
                return Err(e.into());
            }
        }
        info!(
            base,
            registers = pool.config.num_registers,
            register_size = pool.config.register_size,
            "register pool created"
        );
        Ok(pool)
    }

    /// Number of registers N.
    pub fn capacity(&self) -> u32 {
        self.config.num_registers
    }

    /// The configuration this pool was built from.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Address of the register block.
    pub fn base(&self) -> Ptr {
        self.base
    }

    /// Address of register `n`.
    pub fn slot_ptr(&self, n: u32) -> Result<Ptr, BindError> {
        if n >= self.capacity() {
            return Err(BindError::SlotOutOfRange {
                slot: n,
                capacity: self.capacity(),
            });
        }
        Ok(self.base + n * self.config.register_size)
    }

    /// Register currently bound to `id`, if any.
    pub fn slot_of(&self, id: ValueId) -> Option<u32> {
        self.bindings.get(&id).copied()
    }

    /// Whether `id` currently holds a register.
    pub fn is_bound(&self, id: ValueId) -> bool {
        self.bindings.contains_key(&id)
    }

    /// Number of registers holding a value.
    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Registers from least to most recently used, with their owners.
    pub fn lru_order(&self) -> Vec<(u32, Option<ValueId>)> {
        self.lru
            .iter()
            .map(|n| (n, self.owners[n as usize]))
            .collect()
    }

    /// Counters since creation.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Make sure `value` holds a register and return its address.
    ///
    /// A bound value is promoted to most recently used. Otherwise the
    /// least recently used register is taken; if it is bound, its limb
    /// buffer is released and its owner unbound before `value`'s fields
    /// are written into it.
    ///
    /// The returned pointer stays valid only until a later `ensure` evicts
    /// it; callers binding several values must bind all of them first.
    pub fn ensure<K: Kernel>(&mut self, kernel: &mut K, value: &BigFloat) -> Result<Ptr, BindError> {
        if self.torn_down {
            return Err(BindError::TornDown);
        }
        let id = value.id();
        if let Some(n) = self.slot_of(id) {
            if self.owners.get(n as usize).copied().flatten() != Some(id) {
                return Err(BindError::WrongOwner { slot: n, expected: id });
            }
            self.lru.touch(n);
            self.stats.hits += 1;
            trace!(slot = n, value = %id, "register hit");
            return self.slot_ptr(n);
        }

        let n = self.lru.lru();
        let ptr = self.slot_ptr(n)?;
        if let Some(old) = self.owners[n as usize] {
            marshal::clear(kernel, ptr)?;
            self.owners[n as usize] = None;
            self.bindings.swap_remove(&old);
            self.stats.evictions += 1;
            debug!(slot = n, evicted = %old, value = %id, "register evicted");
        }

        self.owners[n as usize] = Some(id);
        self.bindings.insert(id, n);
        self.lru.touch(n);
        if let Err(e) = marshal::serialize(kernel, value.value(), ptr) {
            // `init` forgets a buffer, so release any `resize` already made.
            if let Err(clear_err) = marshal::clear(kernel, ptr) {
                warn!(slot = n, error = %clear_err, "failed to release buffer after bind error");
            }
            self.unbind_slot(n, id);
            return Err(e);
        }
        self.stats.misses += 1;
        debug!(slot = n, value = %id, limbs = value.value().limb_count(), "register bound");
        Ok(ptr)
    }

    /// Check that `value` still holds the register at `ptr`.
    pub fn verify(&self, value: &BigFloat, ptr: Ptr) -> Result<(), BindError> {
        match self.slot_of(value.id()) {
            Some(n) if self.slot_ptr(n)? == ptr => Ok(()),
            _ => Err(BindError::OperandEvicted { value: value.id() }),
        }
    }

    /// Unbind `id` and release its register's buffer. The register becomes
    /// the next one handed out. Returns whether `id` was bound.
    pub fn release<K: Kernel>(&mut self, kernel: &mut K, id: ValueId) -> Result<bool, BindError> {
        if self.torn_down {
            return Ok(false);
        }
        let Some(n) = self.slot_of(id) else {
            return Ok(false);
        };
        marshal::clear(kernel, self.slot_ptr(n)?)?;
        self.unbind_slot(n, id);
        self.stats.releases += 1;
        debug!(slot = n, value = %id, "register released");
        Ok(true)
    }

    fn unbind_slot(&mut self, n: u32, id: ValueId) {
        self.owners[n as usize] = None;
        self.bindings.swap_remove(&id);
        self.lru.demote(n);
    }

    /// Release every register's limb buffer and the register block.
    ///
    /// Idempotent. The pool rejects further binds afterwards.
    pub fn teardown<K: Kernel>(&mut self, kernel: &mut K) -> Result<(), BindError> {
        if self.torn_down {
            return Ok(());
        }
        for n in 0..self.capacity() {
            if self.owners[n as usize].is_some() {
                marshal::clear(kernel, self.slot_ptr(n)?)?;
                self.owners[n as usize] = None;
            }
        }
        self.bindings.clear();
        kernel.free(self.base);
        self.torn_down = true;
        info!(base = self.base, stats = ?self.stats, "register pool torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfreg_core::value::EXPN_ZERO;
    use bfreg_core::{KernelError, LogicalValue};
    use bfreg_test_utils::fixtures::{big, counting, raw, wide};
    use bfreg_test_utils::SoftKernel;
    use proptest::prelude::*;

    fn pool(k: &mut SoftKernel, n: u32) -> RegisterPool {
        RegisterPool::new(k, PoolConfig::new(n)).unwrap()
    }

    #[test]
    fn new_allocates_one_block() {
        let mut k = SoftKernel::new();
        let p = pool(&mut k, 4);
        assert_eq!(k.live_allocations(), 1);
        assert_eq!(p.capacity(), 4);
        assert_eq!(p.bound_count(), 0);
        assert_eq!(p.slot_ptr(1).unwrap(), p.base() + 16);
    }

    #[test]
    fn slot_index_out_of_range_is_fatal() {
        let mut k = SoftKernel::new();
        let p = pool(&mut k, 2);
        let err = p.slot_ptr(2).unwrap_err();
        assert_eq!(err, BindError::SlotOutOfRange { slot: 2, capacity: 2 });
        assert!(err.is_fatal());
    }

    #[test]
    fn invalid_config_allocates_nothing() {
        let mut k = SoftKernel::new();
        assert!(matches!(
            RegisterPool::new(&mut k, PoolConfig::new(0)),
            Err(BindError::Config(_))
        ));
        assert_eq!(k.live_allocations(), 0);
    }

    #[test]
    fn ensure_twice_is_a_hit() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let v = big(3.0);
        let a = p.ensure(&mut k, &v).unwrap();
        let b = p.ensure(&mut k, &v).unwrap();
        assert_eq!(a, b);
        assert_eq!(p.stats().hits, 1);
        assert_eq!(p.stats().misses, 1);
        assert_eq!(k.call_count("init"), 2 + 1);
    }

    #[test]
    fn ensure_writes_current_fields() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let v = wide(3);
        let ptr = p.ensure(&mut k, &v).unwrap();
        assert_eq!(&k.read_slot(ptr).unwrap(), v.value());
    }

    #[test]
    fn lru_reaccess_protects_value() {
        // Capacity 2: A, B, C, then A again, then D. B must go, A must stay.
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let vs = counting(4);
        let (a, b, c, d) = (&vs[0], &vs[1], &vs[2], &vs[3]);
        p.ensure(&mut k, a).unwrap();
        p.ensure(&mut k, b).unwrap();
        p.ensure(&mut k, c).unwrap();
        assert!(!p.is_bound(a.id()));
        p.ensure(&mut k, a).unwrap();
        assert!(!p.is_bound(b.id()));
        p.ensure(&mut k, d).unwrap();
        assert!(p.is_bound(a.id()));
        assert!(!p.is_bound(b.id()));
        assert!(!p.is_bound(c.id()));
        assert!(p.is_bound(d.id()));
    }

    #[test]
    fn touching_changes_victim() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let vs = counting(3);
        p.ensure(&mut k, &vs[0]).unwrap();
        p.ensure(&mut k, &vs[1]).unwrap();
        p.ensure(&mut k, &vs[0]).unwrap();
        p.ensure(&mut k, &vs[2]).unwrap();
        assert!(p.is_bound(vs[0].id()));
        assert!(!p.is_bound(vs[1].id()));
    }

    #[test]
    fn eviction_releases_buffer_exactly_once() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let vs: Vec<_> = (0..6).map(|_| wide(2)).collect();
        for (i, v) in vs.iter().enumerate() {
            p.ensure(&mut k, v).unwrap();
            assert!(p.bound_count() <= 2);
            // Register block plus one limb buffer per bound value.
            assert_eq!(k.live_allocations(), 1 + p.bound_count());
            assert_eq!(p.stats().evictions, i.saturating_sub(1) as u64);
        }
        assert_eq!(k.total_frees(), 4);
    }

    #[test]
    fn dropped_value_slot_is_reclaimed() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 1);
        let id = {
            let gone = wide(3);
            p.ensure(&mut k, &gone).unwrap();
            gone.id()
        };
        assert!(p.is_bound(id));
        let next = big(1.0);
        p.ensure(&mut k, &next).unwrap();
        assert!(!p.is_bound(id));
        assert_eq!(k.live_allocations(), 2);
    }

    #[test]
    fn release_frees_and_prefers_slot() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 3);
        let vs = counting(3);
        for v in &vs {
            p.ensure(&mut k, v).unwrap();
        }
        let slot_b = p.slot_of(vs[1].id()).unwrap();
        assert!(p.release(&mut k, vs[1].id()).unwrap());
        assert!(!p.release(&mut k, vs[1].id()).unwrap());
        assert_eq!(p.lru_order()[0], (slot_b, None));
        let e = big(9.0);
        p.ensure(&mut k, &e).unwrap();
        assert_eq!(p.slot_of(e.id()), Some(slot_b));
        assert!(p.is_bound(vs[0].id()));
        assert_eq!(p.stats().evictions, 0);
    }

    #[test]
    fn verify_detects_evicted_operand() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 1);
        let vs = counting(2);
        let ptr = p.ensure(&mut k, &vs[0]).unwrap();
        p.verify(&vs[0], ptr).unwrap();
        p.ensure(&mut k, &vs[1]).unwrap();
        assert_eq!(
            p.verify(&vs[0], ptr),
            Err(BindError::OperandEvicted { value: vs[0].id() })
        );
    }

    #[test]
    fn failed_serialize_leaves_slot_free() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let v = wide(2);
        k.fail_next("resize");
        assert!(p.ensure(&mut k, &v).is_err());
        assert!(!p.is_bound(v.id()));
        assert_eq!(p.bound_count(), 0);
        p.ensure(&mut k, &v).unwrap();
        assert!(p.is_bound(v.id()));
    }

    #[test]
    fn serialize_failure_after_resize_releases_buffer() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let v = wide(3);
        k.fail_after("resize");
        assert!(p.ensure(&mut k, &v).is_err());
        assert!(!p.is_bound(v.id()));
        assert_eq!(k.live_allocations(), 1);
        let ptr = p.ensure(&mut k, &v).unwrap();
        assert_eq!(&k.read_slot(ptr).unwrap(), v.value());
        assert_eq!(k.live_allocations(), 2);
    }

    #[test]
    fn failed_teardown_can_be_retried() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 2);
        let v = wide(2);
        p.ensure(&mut k, &v).unwrap();
        k.fail_next("resize");
        assert!(matches!(
            p.teardown(&mut k),
            Err(BindError::Kernel(KernelError::Failed { .. }))
        ));
        assert!(!p.is_torn_down());
        assert_eq!(k.live_allocations(), 2);
        p.teardown(&mut k).unwrap();
        assert_eq!(k.live_allocations(), 0);
        assert!(p.is_torn_down());
    }

    #[test]
    fn raw_fields_round_trip_through_a_register() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 1);
        for v in [
            raw(true, -40, &[0xdead_beef, 0x8000_0000]),
            raw(false, 3, &[0xffff_ffff]),
            raw(false, EXPN_ZERO, &[]),
        ] {
            let ptr = p.ensure(&mut k, &v).unwrap();
            assert_eq!(&marshal::read(&k, ptr).unwrap(), v.value());
        }
        assert_eq!(p.stats().evictions, 2);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 3);
        let vs: Vec<_> = (0..5).map(wide).collect();
        for v in &vs {
            p.ensure(&mut k, v).unwrap();
        }
        p.teardown(&mut k).unwrap();
        assert_eq!(k.live_allocations(), 0);
        p.teardown(&mut k).unwrap();
        assert_eq!(p.ensure(&mut k, &vs[0]), Err(BindError::TornDown));
    }

    #[test]
    fn empty_value_binds_without_buffer() {
        let mut k = SoftKernel::new();
        let mut p = pool(&mut k, 1);
        let z = BigFloat::new(LogicalValue::zero(true));
        let ptr = p.ensure(&mut k, &z).unwrap();
        assert_eq!(k.live_allocations(), 1);
        assert_eq!(&k.read_slot(ptr).unwrap(), z.value());
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(
            cap in 1u32..6,
            picks in proptest::collection::vec(0usize..12, 1..80),
        ) {
            let mut k = SoftKernel::new();
            let mut p = pool(&mut k, cap);
            let vs: Vec<_> = (0..12).map(|i| wide(1 + i % 3)).collect();
            for i in picks {
                let ptr = p.ensure(&mut k, &vs[i]).unwrap();
                prop_assert!(p.bound_count() <= cap as usize);
                prop_assert_eq!(k.live_allocations(), 1 + p.bound_count());
                prop_assert_eq!(&k.read_slot(ptr).unwrap(), vs[i].value());
            }
            p.teardown(&mut k).unwrap();
            prop_assert_eq!(k.live_allocations(), 0);
        }
    }
}
