//! Length-limited prefix codes for residual and run-length tokens.
//!
//! Raw residual tokens and run-length tokens share one Brotli-style prefix
//! code over a 512-symbol alphabet: raw tokens occupy symbols `0..19`, run
//! lengths start at [`LZ77_OFFSET`]. Code lengths are chosen in two levels.
//! Level one codes the raw tokens plus one merged symbol standing for "any
//! run-length token"; level two splits that merged symbol into the 33 run
//! tokens so the combined length never exceeds 15 bits.
//!
//! Lengths come from an exact dynamic program over (symbol, Kraft budget)
//! that minimises total coded bits under per-symbol bounds; codes are then
//! assigned canonically and bit-reversed for LSB-first emission.

use crate::bits::BitWriter;

use super::depth::BitDepth;
use super::hybrid::encode_hybrid_uint_lz77;

/// Raw residual tokens.
pub const NUM_RAW_SYMBOLS: usize = 19;
/// Run-length tokens.
pub const NUM_LZ77: usize = 33;
/// Runs shorter than this many pixels (after the literal) use the cache.
pub const LZ77_CACHE_SIZE: usize = 32;
/// First alphabet symbol used for run-length tokens.
pub const LZ77_OFFSET: u32 = 224;
/// Runs must be longer than this to be coded as a run.
pub const LZ77_MIN_LENGTH: usize = 7;

/// Longest code the decoder accepts.
const MAX_CODE_LENGTH: u8 = 15;
/// Code-length alphabet: lengths 0-15, repeat-previous (16), repeat-zero (17).
const NUM_CODE_LENGTH_SYMBOLS: usize = 18;
const CODE_LENGTH_ORDER: [usize; NUM_CODE_LENGTH_SYMBOLS] =
    [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];
/// Fixed code used for the code-length code lengths (values 0..=5).
const CODE_LENGTH_LENGTH_NBITS: [u8; 6] = [2, 4, 3, 2, 2, 4];
const CODE_LENGTH_LENGTH_BITS: [u8; 6] = [0, 7, 3, 2, 1, 15];
const REPEAT_ZERO: usize = 17;

/// Prefix code shared by every group for one channel slot.
#[derive(Debug, Clone)]
pub struct PrefixCode {
    pub(crate) raw_nbits: [u8; NUM_RAW_SYMBOLS],
    pub(crate) raw_bits: [u8; NUM_RAW_SYMBOLS],
    pub(crate) raw_nbits_simd: [u8; 16],
    pub(crate) raw_bits_simd: [u8; 16],
    pub(crate) lz77_nbits: [u8; NUM_LZ77],
    pub(crate) lz77_bits: [u16; NUM_LZ77],
    lz77_cache_bits: [u64; LZ77_CACHE_SIZE],
    lz77_cache_nbits: [u8; LZ77_CACHE_SIZE],
}

impl PrefixCode {
    /// Build the code for one channel from token histograms.
    ///
    /// # Panics
    ///
    /// Panics if the histograms cannot produce a complete code within the
    /// depth class bounds (fewer than two used symbols, or more raw symbols
    /// than the class allows).
    pub fn new<D: BitDepth>(
        raw_counts: &[u64; NUM_RAW_SYMBOLS],
        lz77_counts: &[u64; NUM_LZ77],
    ) -> Self {
        let mut numraw = NUM_RAW_SYMBOLS;
        while numraw > 0 && raw_counts[numraw - 1] == 0 {
            numraw -= 1;
        }
        assert!(
            numraw < D::MIN_RAW_LENGTH.len(),
            "{numraw} raw symbols exceed the depth class"
        );

        let mut level1_counts = [0u64; NUM_RAW_SYMBOLS + 1];
        level1_counts[..numraw].copy_from_slice(&raw_counts[..numraw]);
        level1_counts[numraw] = lz77_counts.iter().sum();
        let level1_nbits = compute_code_lengths(
            &level1_counts[..=numraw],
            &D::MIN_RAW_LENGTH[..=numraw],
            &D::MAX_RAW_LENGTH[..=numraw],
        );

        let mut num_lz77 = NUM_LZ77;
        while num_lz77 > 0 && lz77_counts[num_lz77 - 1] == 0 {
            num_lz77 -= 1;
        }
        let level2_budget = MAX_CODE_LENGTH - level1_nbits[numraw];
        let level2_nbits = compute_code_lengths(
            &lz77_counts[..num_lz77],
            &[0; NUM_LZ77][..num_lz77],
            &[level2_budget; NUM_LZ77][..num_lz77],
        );

        let mut raw_nbits = [0u8; NUM_RAW_SYMBOLS];
        raw_nbits[..numraw].copy_from_slice(&level1_nbits[..numraw]);
        let mut lz77_nbits = [0u8; NUM_LZ77];
        for (dst, &len) in lz77_nbits.iter_mut().zip(&level2_nbits) {
            if len != 0 {
                *dst = level1_nbits[numraw] + len;
            }
        }

        let mut raw_bits = [0u8; NUM_RAW_SYMBOLS];
        let mut lz77_bits = [0u16; NUM_LZ77];
        compute_canonical_code(&raw_nbits, &mut raw_bits, &lz77_nbits, &mut lz77_bits);
        let (raw_nbits_simd, raw_bits_simd) = D::prepare_for_simd(&raw_nbits, &raw_bits);

        let mut lz77_cache_bits = [0u64; LZ77_CACHE_SIZE];
        let mut lz77_cache_nbits = [0u8; LZ77_CACHE_SIZE];
        for count in 0..LZ77_CACHE_SIZE {
            let t = encode_hybrid_uint_lz77(count as u32);
            let token = t.token as usize;
            lz77_cache_nbits[count] = lz77_nbits[token] + t.nbits as u8 + raw_nbits[0];
            lz77_cache_bits[count] = (((u64::from(t.bits) << lz77_nbits[token])
                | u64::from(lz77_bits[token]))
                << raw_nbits[0])
                | u64::from(raw_bits[0]);
        }

        Self {
            raw_nbits,
            raw_bits,
            raw_nbits_simd,
            raw_bits_simd,
            lz77_nbits,
            lz77_bits,
            lz77_cache_bits,
            lz77_cache_nbits,
        }
    }

    /// Code lengths of the raw tokens (0 = unused).
    pub fn raw_lengths(&self) -> &[u8; NUM_RAW_SYMBOLS] {
        &self.raw_nbits
    }

    /// Code lengths of the run-length tokens (0 = unused).
    pub fn lz77_lengths(&self) -> &[u8; NUM_LZ77] {
        &self.lz77_nbits
    }

    /// Literal zero followed by the run token for `count`, as `(nbits, bits)`.
    ///
    /// `count` is the run length minus [`LZ77_MIN_LENGTH`] + 1.
    #[inline]
    pub(crate) fn run_bits(&self, count: u32) -> (usize, u64) {
        if (count as usize) < LZ77_CACHE_SIZE {
            return (
                self.lz77_cache_nbits[count as usize] as usize,
                self.lz77_cache_bits[count as usize],
            );
        }
        let t = encode_hybrid_uint_lz77(count);
        let token = t.token as usize;
        let lz77_nbits = self.lz77_nbits[token];
        let nbits = lz77_nbits as usize + t.nbits as usize + self.raw_nbits[0] as usize;
        let bits = (((u64::from(t.bits) << lz77_nbits) | u64::from(self.lz77_bits[token]))
            << self.raw_nbits[0])
            | u64::from(self.raw_bits[0]);
        (nbits, bits)
    }

    /// Serialize the code lengths as a Brotli-style complex prefix code.
    pub fn write_to(&self, writer: &mut BitWriter) {
        let mut code_length_counts = [0u64; NUM_CODE_LENGTH_SYMBOLS];
        code_length_counts[REPEAT_ZERO] = 3 + 2 * (NUM_LZ77 as u64 - 1);
        for &len in self.raw_nbits.iter().chain(&self.lz77_nbits) {
            code_length_counts[len as usize] += 1;
        }
        let code_length_nbits = compute_code_lengths(
            &code_length_counts,
            &[0; NUM_CODE_LENGTH_SYMBOLS],
            &[5; NUM_CODE_LENGTH_SYMBOLS],
        );

        // HSKIP: no code lengths skipped.
        writer.write(2, 0b00);

        let mut num_code_lengths = NUM_CODE_LENGTH_SYMBOLS;
        while code_length_nbits[CODE_LENGTH_ORDER[num_code_lengths - 1]] == 0 {
            num_code_lengths -= 1;
        }
        for &sym in &CODE_LENGTH_ORDER[..num_code_lengths] {
            let len = code_length_nbits[sym] as usize;
            writer.write(
                CODE_LENGTH_LENGTH_NBITS[len] as usize,
                u64::from(CODE_LENGTH_LENGTH_BITS[len]),
            );
        }

        let mut code_length_bits = [0u16; NUM_CODE_LENGTH_SYMBOLS];
        compute_canonical_code(&[], &mut [], &code_length_nbits, &mut code_length_bits);
        let write_length = |writer: &mut BitWriter, len: usize| {
            writer.write(
                code_length_nbits[len] as usize,
                u64::from(code_length_bits[len]),
            );
        };

        for &len in &self.raw_nbits {
            write_length(&mut *writer, len as usize);
        }

        // 205 zero lengths up to the first run-length symbol: 5, then
        // (5 - 2) * 8 + 3 = 27, then (27 - 2) * 8 + 5 = 205.
        const _: () = assert!(LZ77_OFFSET as usize - NUM_RAW_SYMBOLS == 205);
        write_length(&mut *writer, REPEAT_ZERO);
        writer.write(3, 0b010);
        write_length(&mut *writer, REPEAT_ZERO);
        writer.write(3, 0b000);
        write_length(&mut *writer, REPEAT_ZERO);
        writer.write(3, 0b010);

        let mut num_lz77 = NUM_LZ77;
        while self.lz77_nbits[num_lz77 - 1] == 0 {
            num_lz77 -= 1;
        }
        for &len in &self.lz77_nbits[..num_lz77] {
            write_length(&mut *writer, len as usize);
        }
    }
}

/// Optimal code lengths with `min_limit[i] <= len[i] <= max_limit[i]` and a
/// complete code. Zero-frequency symbols get length 0.
pub fn compute_code_lengths(freqs: &[u64], min_limit: &[u8], max_limit: &[u8]) -> Vec<u8> {
    debug_assert_eq!(freqs.len(), min_limit.len());
    debug_assert_eq!(freqs.len(), max_limit.len());

    let mut compact_freqs = Vec::with_capacity(freqs.len());
    let mut compact_min = Vec::with_capacity(freqs.len());
    let mut compact_max = Vec::with_capacity(freqs.len());
    for ((&f, &lo), &hi) in freqs.iter().zip(min_limit).zip(max_limit) {
        if f != 0 {
            compact_freqs.push(f);
            compact_min.push(lo.max(1));
            compact_max.push(hi);
        }
    }

    let compact_nbits = compute_code_lengths_non_zero(&compact_freqs, &compact_min, &compact_max);
    let mut used = compact_nbits.into_iter();
    freqs
        .iter()
        .map(|&f| if f != 0 { used.next().unwrap_or(0) } else { 0 })
        .collect()
}

fn compute_code_lengths_non_zero(freqs: &[u64], min_limit: &[u8], max_limit: &[u8]) -> Vec<u8> {
    let n = freqs.len();
    let mut nbits = vec![0u8; n];
    if n == 0 {
        return nbits;
    }
    for (lo, hi) in min_limit.iter().zip(max_limit) {
        assert!(lo <= hi, "code length bounds {lo} > {hi}");
    }

    let precision = max_limit.iter().copied().max().unwrap_or(0) as usize;
    let freqsum: u64 = freqs.iter().sum();
    let infty = freqsum * precision as u64;
    let width = (1usize << precision) + 1;

    // cost[sym * width + off]: cheapest coding of the first `sym` symbols
    // using `off` units of a 2^precision Kraft budget.
    let mut cost = vec![infty; width * (n + 1)];
    cost[0] = 0;
    for sym in 0..n {
        let (row, next) = cost[sym * width..(sym + 2) * width].split_at_mut(width);
        for bits in min_limit[sym]..=max_limit[sym] {
            let off_delta = 1usize << (precision - bits as usize);
            let add = freqs[sym] * u64::from(bits);
            for off in 0..width - off_delta {
                let candidate = row[off] + add;
                let slot = &mut next[off + off_delta];
                if candidate < *slot {
                    *slot = candidate;
                }
            }
        }
    }

    let mut off = 1usize << precision;
    assert_ne!(cost[n * width + off], infty, "no complete code within bounds");
    for sym in (0..n).rev() {
        for bits in min_limit[sym]..=max_limit[sym] {
            let off_delta = 1usize << (precision - bits as usize);
            if off_delta <= off
                && cost[(sym + 1) * width + off]
                    == cost[sym * width + off - off_delta] + freqs[sym] * u64::from(bits)
            {
                off -= off_delta;
                nbits[sym] = bits;
                break;
            }
        }
    }
    nbits
}

/// Assign canonical codes over two alphabets that share one code.
///
/// Codes are ordered by length, then by position (all of `first` before
/// `second`), and stored bit-reversed. Unused (length 0) symbols get 0.
pub fn compute_canonical_code(
    first_nbits: &[u8],
    first_bits: &mut [u8],
    second_nbits: &[u8],
    second_bits: &mut [u16],
) {
    let mut bl_count = [0u16; MAX_CODE_LENGTH as usize + 1];
    for &len in first_nbits.iter().chain(second_nbits) {
        bl_count[len as usize] += 1;
    }
    bl_count[0] = 0;

    let mut next_code = [0u16; MAX_CODE_LENGTH as usize + 1];
    let mut code = 0u16;
    for bits in 1..=MAX_CODE_LENGTH as usize {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    for (&len, out) in first_nbits.iter().zip(first_bits.iter_mut()) {
        debug_assert!(len <= 8);
        if len == 0 {
            continue;
        }
        *out = reverse_bits(next_code[len as usize], len) as u8;
        next_code[len as usize] += 1;
    }
    for (&len, out) in second_nbits.iter().zip(second_bits.iter_mut()) {
        if len == 0 {
            continue;
        }
        *out = reverse_bits(next_code[len as usize], len);
        next_code[len as usize] += 1;
    }
}

/// Reverse the low `length` bits of `code`.
#[inline]
fn reverse_bits(code: u16, length: u8) -> u16 {
    let mut result = 0u16;
    let mut code = code;
    for _ in 0..length {
        result = (result << 1) | (code & 1);
        code >>= 1;
    }
    result
}
