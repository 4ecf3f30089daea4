//! Bit-depth classes.
//!
//! Each class fixes the per-symbol code length bounds of the raw alphabet,
//! how many bytes a sample occupies in the input, and how the raw codes are
//! folded into 16-entry tables for the lane-parallel emitter. The last entry
//! of each bound table belongs to the merged run-length symbol.

use super::prefix::{PrefixCode, NUM_RAW_SYMBOLS};

/// Behaviour that differs between bit-depth classes.
pub trait BitDepth: Copy + Send + Sync + 'static {
    /// Minimum code length per raw symbol.
    const MIN_RAW_LENGTH: &'static [u8];
    /// Maximum code length per raw symbol.
    const MAX_RAW_LENGTH: &'static [u8];
    /// Bytes per sample in the input buffer.
    const INPUT_BYTES: usize;
    /// Upper bound on encoded bits for one sample, used to size writers.
    const MAX_ENCODED_BITS_PER_SAMPLE: usize;

    /// Declared bits per sample.
    fn bitdepth(self) -> usize;

    /// Number of raw symbols residuals can reach.
    fn num_symbols(self, doing_ycocg: bool) -> usize;

    /// Fold the raw code into 16-entry tables.
    fn prepare_for_simd(nbits: &[u8; NUM_RAW_SYMBOLS], bits: &[u8; NUM_RAW_SYMBOLS])
        -> ([u8; 16], [u8; 16]);

    /// Code length and bits of `token` read through the folded tables.
    fn lane_lookup(token: u32, code: &PrefixCode) -> (u32, u32);
}

fn direct_tables(
    nbits: &[u8; NUM_RAW_SYMBOLS],
    bits: &[u8; NUM_RAW_SYMBOLS],
) -> ([u8; 16], [u8; 16]) {
    debug_assert!(nbits[16..].iter().all(|&n| n == 0));
    let mut nbits_simd = [0u8; 16];
    let mut bits_simd = [0u8; 16];
    nbits_simd.copy_from_slice(&nbits[..16]);
    bits_simd.copy_from_slice(&bits[..16]);
    (nbits_simd, bits_simd)
}

/// Two tokens sharing a code that differs only in the top bit.
fn check_paired(nbits: &[u8; NUM_RAW_SYMBOLS], bits: &[u8; NUM_RAW_SYMBOLS], low: usize) {
    debug_assert_eq!(nbits[low], 8);
    debug_assert_eq!(nbits[low + 1], 8);
    debug_assert_eq!(bits[low] & 0x80, 0);
    debug_assert_eq!(bits[low + 1], bits[low] | 0x80);
}

/// Samples of 1 to 8 bits.
#[derive(Debug, Clone, Copy)]
pub struct UpTo8Bits(usize);

impl UpTo8Bits {
    pub fn new(bitdepth: usize) -> Self {
        debug_assert!((1..=8).contains(&bitdepth));
        Self(bitdepth)
    }
}

impl BitDepth for UpTo8Bits {
    const MIN_RAW_LENGTH: &'static [u8] = &[0; 12];
    const MAX_RAW_LENGTH: &'static [u8] = &[7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 10];
    const INPUT_BYTES: usize = 1;
    const MAX_ENCODED_BITS_PER_SAMPLE: usize = 16;

    fn bitdepth(self) -> usize {
        self.0
    }

    fn num_symbols(self, doing_ycocg: bool) -> usize {
        self.0 + if doing_ycocg { 3 } else { 2 }
    }

    fn prepare_for_simd(
        nbits: &[u8; NUM_RAW_SYMBOLS],
        bits: &[u8; NUM_RAW_SYMBOLS],
    ) -> ([u8; 16], [u8; 16]) {
        direct_tables(nbits, bits)
    }

    #[inline]
    fn lane_lookup(token: u32, code: &PrefixCode) -> (u32, u32) {
        let idx = token as usize;
        (
            u32::from(code.raw_nbits_simd[idx]),
            u32::from(code.raw_bits_simd[idx]),
        )
    }
}

/// Samples of 9 to 13 bits.
#[derive(Debug, Clone, Copy)]
pub struct From9To13Bits(usize);

impl From9To13Bits {
    pub fn new(bitdepth: usize) -> Self {
        debug_assert!((9..=13).contains(&bitdepth));
        Self(bitdepth)
    }
}

impl BitDepth for From9To13Bits {
    const MIN_RAW_LENGTH: &'static [u8] = &[0; 17];
    const MAX_RAW_LENGTH: &'static [u8] = &[8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 10];
    const INPUT_BYTES: usize = 2;
    const MAX_ENCODED_BITS_PER_SAMPLE: usize = 22;

    fn bitdepth(self) -> usize {
        self.0
    }

    fn num_symbols(self, doing_ycocg: bool) -> usize {
        self.0 + if doing_ycocg { 3 } else { 2 }
    }

    fn prepare_for_simd(
        nbits: &[u8; NUM_RAW_SYMBOLS],
        bits: &[u8; NUM_RAW_SYMBOLS],
    ) -> ([u8; 16], [u8; 16]) {
        direct_tables(nbits, bits)
    }

    #[inline]
    fn lane_lookup(token: u32, code: &PrefixCode) -> (u32, u32) {
        let idx = token as usize;
        (
            u32::from(code.raw_nbits_simd[idx]),
            u32::from(code.raw_bits_simd[idx]),
        )
    }
}

/// Samples of exactly 14 bits. Tokens 15 and 16 share one table slot.
#[derive(Debug, Clone, Copy)]
pub struct Exactly14Bits;

impl BitDepth for Exactly14Bits {
    const MIN_RAW_LENGTH: &'static [u8] = &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 8, 7];
    const MAX_RAW_LENGTH: &'static [u8] = &[7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 8, 8, 10];
    const INPUT_BYTES: usize = 2;
    const MAX_ENCODED_BITS_PER_SAMPLE: usize = 23;

    fn bitdepth(self) -> usize {
        14
    }

    fn num_symbols(self, _doing_ycocg: bool) -> usize {
        17
    }

    fn prepare_for_simd(
        nbits: &[u8; NUM_RAW_SYMBOLS],
        bits: &[u8; NUM_RAW_SYMBOLS],
    ) -> ([u8; 16], [u8; 16]) {
        check_paired(nbits, bits, 15);
        direct_tables(&truncate_after(nbits, 16), &truncate_after(bits, 16))
    }

    #[inline]
    fn lane_lookup(token: u32, code: &PrefixCode) -> (u32, u32) {
        let idx = token.min(15) as usize;
        let high = if token == 16 { 0x80 } else { 0 };
        (
            u32::from(code.raw_nbits_simd[idx]),
            u32::from(code.raw_bits_simd[idx]) | high,
        )
    }
}

/// Samples of 15 or 16 bits. Tokens 13..=18 share three table slots.
#[derive(Debug, Clone, Copy)]
pub struct MoreThan14Bits(usize);

impl MoreThan14Bits {
    pub fn new(bitdepth: usize) -> Self {
        debug_assert!((15..=16).contains(&bitdepth));
        Self(bitdepth)
    }
}

impl BitDepth for MoreThan14Bits {
    const MIN_RAW_LENGTH: &'static [u8] = &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 8, 8, 8, 8, 8, 7];
    const MAX_RAW_LENGTH: &'static [u8] = &[7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 10];
    const INPUT_BYTES: usize = 2;
    const MAX_ENCODED_BITS_PER_SAMPLE: usize = 25;

    fn bitdepth(self) -> usize {
        self.0
    }

    fn num_symbols(self, _doing_ycocg: bool) -> usize {
        19
    }

    fn prepare_for_simd(
        nbits: &[u8; NUM_RAW_SYMBOLS],
        bits: &[u8; NUM_RAW_SYMBOLS],
    ) -> ([u8; 16], [u8; 16]) {
        check_paired(nbits, bits, 13);
        check_paired(nbits, bits, 15);
        check_paired(nbits, bits, 17);
        let mut nbits_simd = [0u8; 16];
        let mut bits_simd = [0u8; 16];
        nbits_simd[..14].copy_from_slice(&nbits[..14]);
        bits_simd[..14].copy_from_slice(&bits[..14]);
        nbits_simd[14] = nbits[15];
        bits_simd[14] = bits[15];
        nbits_simd[15] = nbits[17];
        bits_simd[15] = bits[17];
        (nbits_simd, bits_simd)
    }

    #[inline]
    fn lane_lookup(token: u32, code: &PrefixCode) -> (u32, u32) {
        let (idx, high) = if token > 12 {
            ((token + 13) >> 1, if token & 1 == 0 { 0x80 } else { 0 })
        } else {
            (token, 0)
        };
        (
            u32::from(code.raw_nbits_simd[idx as usize]),
            u32::from(code.raw_bits_simd[idx as usize]) | high,
        )
    }
}

fn truncate_after(values: &[u8; NUM_RAW_SYMBOLS], len: usize) -> [u8; NUM_RAW_SYMBOLS] {
    let mut out = *values;
    out[len..].fill(0);
    out
}
