//! MSB-first bit packing into a fixed-width byte buffer.

/// Writes bits most significant first, dropping everything past `width`.
#[derive(Debug)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    pos: u64,
    width: u64,
}

impl BitWriter {
    /// A zeroed buffer of `ceil(width / 8)` bytes.
    pub(crate) fn new(width: u64) -> Self {
        Self {
            bytes: vec![0; width.div_ceil(8) as usize],
            pos: 0,
            width,
        }
    }

    /// Bits still writable.
    pub(crate) fn remaining(&self) -> u64 {
        self.width - self.pos
    }

    pub(crate) fn push_bit(&mut self, bit: bool) {
        if self.pos >= self.width {
            return;
        }
        if bit {
            self.bytes[(self.pos / 8) as usize] |= 0x80 >> (self.pos % 8);
        }
        self.pos += 1;
    }

    /// The low `count` bits of `value`, high bit first.
    pub(crate) fn push_bits(&mut self, value: u64, count: u32) {
        for i in (0..count).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    /// Advance over `count` zero bits.
    pub(crate) fn skip(&mut self, count: u64) {
        self.pos = self.pos.saturating_add(count).min(self.width);
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_high_bit_first() {
        let mut w = BitWriter::new(12);
        w.push_bit(true);
        w.push_bits(0b101, 3);
        w.skip(4);
        w.push_bits(0xf, 4);
        assert_eq!(w.remaining(), 0);
        assert_eq!(w.finish(), vec![0b1101_0000, 0b1111_0000]);
    }

    #[test]
    fn truncates_at_width() {
        let mut w = BitWriter::new(4);
        w.push_bits(0xff, 8);
        w.skip(100);
        assert_eq!(w.finish(), vec![0xf0]);
    }
}
