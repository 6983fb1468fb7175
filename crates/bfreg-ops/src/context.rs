//! [`Context`]: one kernel plus its register pool.

use tracing::warn;

use bfreg_core::{BigFloat, Kernel};
use bfreg_pool::{PoolConfig, RegisterPool};

use crate::error::Error;
use crate::table::OpTable;

/// Owns a kernel and the register pool carved out of its memory.
///
/// Every value-level operation goes through `&mut self`. Values are not
/// tied to a context by lifetime; a value can be used with any context,
/// it is simply serialized again on first use.
///
/// Dropping the context tears the pool down on a best-effort basis; call
/// [`teardown`](Self::teardown) to observe failures.
#[derive(Debug)]
pub struct Context<K: Kernel> {
    pub(crate) kernel: K,
    pub(crate) pool: RegisterPool,
    pub(crate) table: OpTable,
}

impl<K: Kernel> Context<K> {
    /// Carve a register pool out of `kernel`'s memory.
    pub fn new(mut kernel: K, config: PoolConfig) -> Result<Self, Error> {
        let pool = RegisterPool::new(&mut kernel, config)?;
        Ok(Self {
            kernel,
            pool,
            table: OpTable::builtin(),
        })
    }

    /// [`new`](Self::new) with the default pool shape.
    pub fn with_defaults(kernel: K) -> Result<Self, Error> {
        Self::new(kernel, PoolConfig::default())
    }

    /// The kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Mutable access to the kernel. Writing into bound registers behind
    /// the pool's back breaks resynchronization.
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// The register pool.
    pub fn pool(&self) -> &RegisterPool {
        &self.pool
    }

    /// The operation table.
    pub fn ops(&self) -> &OpTable {
        &self.table
    }

    /// Give up `value`'s register, if it holds one.
    pub fn release(&mut self, value: &BigFloat) -> Result<bool, Error> {
        Ok(self.pool.release(&mut self.kernel, value.id())?)
    }

    /// Release every register buffer and the register block.
    pub fn teardown(&mut self) -> Result<(), Error> {
        Ok(self.pool.teardown(&mut self.kernel)?)
    }
}

impl<K: Kernel> Drop for Context<K> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.teardown(&mut self.kernel) {
            warn!(error = %e, "register pool teardown failed on drop");
        }
    }
}
