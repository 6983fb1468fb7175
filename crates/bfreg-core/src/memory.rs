//! Typed views over the kernel's linear memory.
//!
//! [`LinearMemory`] is one contiguous, growable little-endian byte buffer
//! addressed by 32-bit pointers, the way a compiled kernel sees its heap.
//! Word and float accessors enforce natural alignment and report
//! violations as [`MemoryError::Misaligned`] instead of silently reading
//! across a boundary.

use std::ops::Range;

use crate::error::MemoryError;
use crate::value::Limb;

/// Address inside a [`LinearMemory`].
pub type Ptr = u32;

/// Native word size of the kernel, in bytes.
pub const WORD_SIZE: u32 = 4;

/// Size of one float64 cell, in bytes.
pub const DOUBLE_SIZE: u32 = 8;

/// Growth granularity, in bytes.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Growable linear memory with a hard page limit.
#[derive(Clone, Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    max_pages: u32,
}

impl LinearMemory {
    /// Create a zeroed memory of `initial_pages`, growable to `max_pages`.
    pub fn new(initial_pages: u32, max_pages: u32) -> Self {
        let max_pages = max_pages.max(initial_pages);
        Self {
            bytes: vec![0; initial_pages as usize * PAGE_SIZE],
            max_pages,
        }
    }

    /// Current size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Current size in pages.
    pub fn pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Page limit.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Grow by `delta` pages, returning the previous page count, or `None`
    /// if the limit would be exceeded (memory is left unchanged).
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let old = self.pages();
        let new = old.checked_add(delta)?;
        if new > self.max_pages {
            return None;
        }
        self.bytes.resize(new as usize * PAGE_SIZE, 0);
        Some(old)
    }

    /// Check that `ptr` is a multiple of `align`.
    pub fn check_aligned(ptr: Ptr, align: u32) -> Result<(), MemoryError> {
        if ptr % align != 0 {
            return Err(MemoryError::Misaligned { ptr, align });
        }
        Ok(())
    }

    fn range(&self, ptr: Ptr, len: usize) -> Result<Range<usize>, MemoryError> {
        let start = ptr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds {
                ptr,
                len,
                size: self.bytes.len(),
            }),
        }
    }

    /// Borrow `len` bytes at `ptr`.
    pub fn bytes(&self, ptr: Ptr, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.range(ptr, len)?;
        Ok(&self.bytes[range])
    }

    /// Mutably borrow `len` bytes at `ptr`.
    pub fn bytes_mut(&mut self, ptr: Ptr, len: usize) -> Result<&mut [u8], MemoryError> {
        let range = self.range(ptr, len)?;
        Ok(&mut self.bytes[range])
    }

    /// Copy `src` into memory at `ptr`.
    pub fn write_bytes(&mut self, ptr: Ptr, src: &[u8]) -> Result<(), MemoryError> {
        self.bytes_mut(ptr, src.len())?.copy_from_slice(src);
        Ok(())
    }

    fn word_bytes(&self, ptr: Ptr) -> Result<[u8; 4], MemoryError> {
        Self::check_aligned(ptr, WORD_SIZE)?;
        let mut out = [0; 4];
        out.copy_from_slice(self.bytes(ptr, WORD_SIZE as usize)?);
        Ok(out)
    }

    /// Read an unsigned word.
    pub fn read_word(&self, ptr: Ptr) -> Result<u32, MemoryError> {
        self.word_bytes(ptr).map(u32::from_le_bytes)
    }

    /// Read a signed word.
    pub fn read_sword(&self, ptr: Ptr) -> Result<i32, MemoryError> {
        self.word_bytes(ptr).map(i32::from_le_bytes)
    }

    /// Write an unsigned word.
    pub fn write_word(&mut self, ptr: Ptr, value: u32) -> Result<(), MemoryError> {
        Self::check_aligned(ptr, WORD_SIZE)?;
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    /// Write a signed word.
    pub fn write_sword(&mut self, ptr: Ptr, value: i32) -> Result<(), MemoryError> {
        Self::check_aligned(ptr, WORD_SIZE)?;
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    /// Copy `dst.len()` consecutive words starting at `ptr` into `dst`.
    pub fn read_words(&self, ptr: Ptr, dst: &mut [Limb]) -> Result<(), MemoryError> {
        Self::check_aligned(ptr, WORD_SIZE)?;
        let src = self.bytes(ptr, dst.len() * WORD_SIZE as usize)?;
        for (word, chunk) in dst.iter_mut().zip(src.chunks_exact(WORD_SIZE as usize)) {
            *word = Limb::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Copy `src` into consecutive words starting at `ptr`.
    pub fn write_words(&mut self, ptr: Ptr, src: &[Limb]) -> Result<(), MemoryError> {
        Self::check_aligned(ptr, WORD_SIZE)?;
        let dst = self.bytes_mut(ptr, src.len() * WORD_SIZE as usize)?;
        for (chunk, word) in dst.chunks_exact_mut(WORD_SIZE as usize).zip(src) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Read a float64 from an 8-byte-aligned cell.
    pub fn read_f64(&self, ptr: Ptr) -> Result<f64, MemoryError> {
        Self::check_aligned(ptr, DOUBLE_SIZE)?;
        let mut out = [0; 8];
        out.copy_from_slice(self.bytes(ptr, DOUBLE_SIZE as usize)?);
        Ok(f64::from_le_bytes(out))
    }

    /// Write a float64 to an 8-byte-aligned cell.
    pub fn write_f64(&mut self, ptr: Ptr, value: f64) -> Result<(), MemoryError> {
        Self::check_aligned(ptr, DOUBLE_SIZE)?;
        self.write_bytes(ptr, &value.to_le_bytes())
    }

    /// Length of the null-terminated string at `ptr`, excluding the
    /// terminator.
    pub fn cstr_len(&self, ptr: Ptr) -> Result<usize, MemoryError> {
        let tail = self.bytes(ptr, self.bytes.len().saturating_sub(ptr as usize))?;
        tail.iter().position(|&b| b == 0).ok_or(MemoryError::OutOfBounds {
            ptr,
            len: tail.len() + 1,
            size: self.bytes.len(),
        })
    }

    /// Decode `len` bytes at `ptr` as UTF-8, or up to the first null byte
    /// when `len` is `None`.
    pub fn read_str(&self, ptr: Ptr, len: Option<usize>) -> Result<String, MemoryError> {
        let len = match len {
            Some(len) => len,
            None => self.cstr_len(ptr)?,
        };
        let bytes = self.bytes(ptr, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| MemoryError::InvalidUtf8 { ptr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem() -> LinearMemory {
        LinearMemory::new(1, 2)
    }

    #[test]
    fn word_round_trip_is_little_endian() {
        let mut m = mem();
        m.write_word(8, 0x0102_0304).unwrap();
        assert_eq!(m.bytes(8, 4).unwrap(), &[4, 3, 2, 1]);
        assert_eq!(m.read_word(8).unwrap(), 0x0102_0304);
        m.write_sword(12, -5).unwrap();
        assert_eq!(m.read_sword(12).unwrap(), -5);
    }

    #[test]
    fn misaligned_word_access_is_rejected() {
        let mut m = mem();
        assert_eq!(
            m.read_word(6),
            Err(MemoryError::Misaligned { ptr: 6, align: 4 })
        );
        assert!(m.write_word(1, 0).is_err());
        assert_eq!(
            m.read_f64(4),
            Err(MemoryError::Misaligned { ptr: 4, align: 8 })
        );
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let m = mem();
        let end = m.size() as Ptr;
        assert!(matches!(
            m.read_word(end),
            Err(MemoryError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn grow_respects_limit() {
        let mut m = mem();
        assert_eq!(m.grow(1), Some(1));
        assert_eq!(m.pages(), 2);
        assert_eq!(m.grow(1), None);
        assert_eq!(m.pages(), 2);
    }

    #[test]
    fn words_bulk_copy() {
        let mut m = mem();
        m.write_words(64, &[1, 2, 0xdead_beef]).unwrap();
        let mut out = [0; 3];
        m.read_words(64, &mut out).unwrap();
        assert_eq!(out, [1, 2, 0xdead_beef]);
    }

    #[test]
    fn cstr_reads_until_null() {
        let mut m = mem();
        m.write_bytes(100, b"1.5e3\0junk").unwrap();
        assert_eq!(m.cstr_len(100).unwrap(), 5);
        assert_eq!(m.read_str(100, None).unwrap(), "1.5e3");
        assert_eq!(m.read_str(100, Some(3)).unwrap(), "1.5");
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut m = mem();
        m.write_bytes(16, &[0xff, 0xfe, 0]).unwrap();
        assert_eq!(
            m.read_str(16, None),
            Err(MemoryError::InvalidUtf8 { ptr: 16 })
        );
    }
}
