//! First-fit allocator over a [`LinearMemory`] with per-pointer accounting.

use indexmap::IndexMap;

use bfreg_core::{KernelError, LinearMemory, Ptr, PAGE_SIZE};

const ALIGN: u32 = 8;

/// Allocation bookkeeping kept outside linear memory.
#[derive(Debug)]
pub(crate) struct Heap {
    top: Ptr,
    live: IndexMap<Ptr, u32>,
    free: Vec<(Ptr, u32)>,
    pub(crate) total_allocs: u64,
    pub(crate) total_frees: u64,
}

impl Heap {
    pub(crate) fn new(base: Ptr) -> Self {
        Self {
            top: base,
            live: IndexMap::new(),
            free: Vec::new(),
            total_allocs: 0,
            total_frees: 0,
        }
    }

    pub(crate) fn alloc(&mut self, mem: &mut LinearMemory, size: u32) -> Result<Ptr, KernelError> {
        let rounded = size.max(1).div_ceil(ALIGN) * ALIGN;
        let ptr = match self.free.iter().position(|&(_, len)| len >= rounded) {
            Some(pos) => {
                let (ptr, len) = self.free.swap_remove(pos);
                if len > rounded {
                    self.free.push((ptr + rounded, len - rounded));
                }
                ptr
            }
            None => self.bump(mem, rounded, size)?,
        };
        mem.bytes_mut(ptr, rounded as usize)?.fill(0);
        self.live.insert(ptr, rounded);
        self.total_allocs += 1;
        Ok(ptr)
    }

    fn bump(&mut self, mem: &mut LinearMemory, rounded: u32, requested: u32) -> Result<Ptr, KernelError> {
        let oom = KernelError::OutOfMemory { requested };
        let end = self.top.checked_add(rounded).ok_or(oom.clone())?;
        if end as usize > mem.size() {
            let missing = end as usize - mem.size();
            let pages = missing.div_ceil(PAGE_SIZE) as u32;
            mem.grow(pages).ok_or(oom)?;
        }
        let ptr = self.top;
        self.top = end;
        Ok(ptr)
    }

    /// Panics on a pointer that is not live: a double free in the binding
    /// layer is a bug the tests must surface.
    pub(crate) fn release(&mut self, ptr: Ptr) {
        let Some(len) = self.live.swap_remove(&ptr) else {
            panic!("free of unallocated pointer {ptr}");
        };
        self.free.push((ptr, len));
        self.total_frees += 1;
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn live_bytes(&self) -> u64 {
        self.live.values().map(|&len| len as u64).sum()
    }

    pub(crate) fn is_live(&self, ptr: Ptr) -> bool {
        self.live.contains_key(&ptr)
    }
}
