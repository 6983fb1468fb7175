//! Register pool configuration.

use bfreg_core::kernel::SLOT_SIZE;
use bfreg_core::{ConfigError, WORD_SIZE};

/// Shape of the register pool.
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of registers N. Default: 8.
    ///
    /// A single dispatch call needs one register per input and output,
    /// so binary operations need at least 3.
    pub num_registers: u32,

    /// Size of each register in bytes. Default: 16.
    ///
    /// Must hold the slot layout and be a multiple of the word size.
    pub register_size: u32,
}

impl PoolConfig {
    /// Default register count.
    pub const DEFAULT_NUM_REGISTERS: u32 = 8;

    /// Default register size in bytes.
    pub const DEFAULT_REGISTER_SIZE: u32 = SLOT_SIZE;

    /// Config with `num_registers` registers of the default size.
    pub fn new(num_registers: u32) -> Self {
        Self {
            num_registers,
            register_size: Self::DEFAULT_REGISTER_SIZE,
        }
    }

    /// Total bytes of the register block.
    pub fn block_bytes(&self) -> u32 {
        self.num_registers * self.register_size
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_registers == 0 {
            return Err(ConfigError::InvalidPool {
                reason: "num_registers must be at least 1".into(),
            });
        }
        if self.register_size < SLOT_SIZE || self.register_size % WORD_SIZE != 0 {
            return Err(ConfigError::InvalidPool {
                reason: format!(
                    "register_size {} must be a multiple of {WORD_SIZE} and at least {SLOT_SIZE}",
                    self.register_size
                ),
            });
        }
        if self.num_registers.checked_mul(self.register_size).is_none() {
            return Err(ConfigError::InvalidPool {
                reason: "register block exceeds the address space".into(),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NUM_REGISTERS)
    }
}
