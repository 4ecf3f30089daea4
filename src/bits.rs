//! Bit-level output for the entropy coded stream.
//!
//! JPEG XL packs fields least-significant-bit first. The writer keeps a
//! 64-bit accumulator and stores it as eight little-endian bytes after every
//! write, advancing only over the bytes that are complete. The backing buffer
//! is sized once from an upper bound; running past it is a caller bug and
//! panics.

/// Slack kept past the requested capacity so a full 8-byte store is always
/// in bounds.
const STORE_SLACK: usize = 64;

/// LSB-first bit writer with a pre-sized buffer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bytes_written: usize,
    bits_in_buffer: usize,
    buffer: u64,
}

impl BitWriter {
    /// Create an empty writer with no storage. Call [`BitWriter::allocate`]
    /// before writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer able to hold `max_bits` bits.
    pub fn with_capacity_bits(max_bits: usize) -> Self {
        let mut writer = Self::new();
        writer.allocate(max_bits);
        writer
    }

    /// Reserve room for `max_bits` bits.
    ///
    /// # Panics
    ///
    /// Panics if the writer already holds data.
    pub fn allocate(&mut self, max_bits: usize) {
        assert!(self.data.is_empty(), "bit writer allocated twice");
        self.data = vec![0; max_bits / 8 + STORE_SLACK];
    }

    /// Append the low `count` bits of `bits`.
    ///
    /// `count` must be at most 56 and `bits` must not have bits set at or above
    /// `count`.
    #[inline]
    pub fn write(&mut self, count: usize, bits: u64) {
        debug_assert!(count <= 56);
        debug_assert!(count == 0 || bits >> count == 0, "stray high bits");
        self.buffer |= bits << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.store();
        let bytes = self.bits_in_buffer / 8;
        self.bits_in_buffer -= bytes * 8;
        self.buffer >>= bytes * 8;
        self.bytes_written += bytes;
    }

    /// Append a batch of entries, each holding up to 64 bits.
    ///
    /// The result is identical to calling [`BitWriter::write`] once per entry.
    pub fn write_multiple(&mut self, nbits: &[u64], bits: &[u64]) {
        debug_assert_eq!(nbits.len(), bits.len());
        for (&count, &value) in nbits.iter().zip(bits) {
            debug_assert!(count <= 64);
            self.buffer |= value << self.bits_in_buffer;
            self.store();
            let shift = 64 - self.bits_in_buffer;
            self.bits_in_buffer += count as usize;
            if self.bits_in_buffer >= 64 {
                self.buffer = value.checked_shr(shift as u32).unwrap_or(0);
                self.bits_in_buffer -= 64;
                self.bytes_written += 8;
            }
        }
        self.store();
        let bytes = self.bits_in_buffer / 8;
        self.bits_in_buffer -= bytes * 8;
        self.buffer = self.buffer.checked_shr((bytes * 8) as u32).unwrap_or(0);
        self.bytes_written += bytes;
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn zero_pad_to_byte(&mut self) {
        if self.bits_in_buffer != 0 {
            self.write(8 - self.bits_in_buffer, 0);
        }
    }

    #[inline]
    fn store(&mut self) {
        let pos = self.bytes_written;
        self.data[pos..pos + 8].copy_from_slice(&self.buffer.to_le_bytes());
    }

    /// Number of complete bytes written so far.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Bits pending in the accumulator (always below 8 between calls).
    #[inline]
    pub fn bits_in_buffer(&self) -> usize {
        self.bits_in_buffer
    }

    /// Pending bits, right-aligned.
    #[inline]
    pub fn buffer(&self) -> u64 {
        self.buffer
    }

    /// Complete bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.bytes_written]
    }

    /// Total number of bits written.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bytes_written * 8 + self.bits_in_buffer
    }

    /// Zero-pad and return the written bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.data.is_empty() {
            return Vec::new();
        }
        self.zero_pad_to_byte();
        self.data.truncate(self.bytes_written);
        self.data
    }
}
