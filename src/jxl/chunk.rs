//! Run-length and token emission for predicted rows.
//!
//! A [`RowProcessor`] walks a channel's rows in fixed chunks, keeps the
//! length of the current run of zero residuals and hands each chunk to a
//! [`ChunkSink`]. Two sinks exist: [`SampleCollector`] counts tokens for the
//! histograms, [`ChunkEncoder`] writes them with the final prefix code.
//!
//! A run is coded as a literal zero followed by a run-length token that
//! repeats the previous symbol, so only runs longer than
//! [`LZ77_MIN_LENGTH`] are worth a token.

use std::marker::PhantomData;

use crate::bits::BitWriter;
use crate::simd::Kernel;

use super::depth::BitDepth;
use super::hybrid::{encode_hybrid_uint_000, encode_hybrid_uint_lz77};
use super::prefix::{PrefixCode, LZ77_MIN_LENGTH, NUM_LZ77, NUM_RAW_SYMBOLS};

/// Pixels handled per chunk, independent of the vector width in use.
pub const CHUNK_SIZE: usize = 16;

/// Consumer of predicted chunks.
pub trait ChunkSink {
    /// `run` zero residuals precede this chunk; `residuals[skip..n]` follow
    /// them. A zero `run` means no run token.
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize);

    /// Flush a trailing run.
    fn finalize(&mut self, run: usize);
}

/// Run-length state machine for one channel.
pub struct RowProcessor<S> {
    sink: S,
    run: usize,
    kernel: Kernel,
}

impl<S: ChunkSink> RowProcessor<S> {
    pub fn new(sink: S, kernel: Kernel) -> Self {
        Self {
            sink,
            run: 0,
            kernel,
        }
    }

    #[inline]
    fn process_chunk(&mut self, px: &[i32], left: &[i32], top: &[i32], topleft: &[i32], n: usize) {
        let mut residuals = [0u32; CHUNK_SIZE];
        let prefix = self
            .kernel
            .predict_chunk(px, left, top, topleft, &mut residuals)
            .min(n);
        if prefix == n && (self.run > 0 || prefix > LZ77_MIN_LENGTH) {
            self.run += prefix;
        } else if prefix + self.run > LZ77_MIN_LENGTH {
            self.sink.chunk(self.run + prefix, &residuals, prefix, n);
            self.run = 0;
        } else {
            self.sink.chunk(0, &residuals, 0, n);
        }
        debug_assert!(self.run == 0 || self.run > LZ77_MIN_LENGTH);
    }

    /// Process `xs` samples. Each slice must extend at least to `xs`
    /// rounded up to a whole chunk.
    pub fn process_row(
        &mut self,
        row: &[i32],
        left: &[i32],
        top: &[i32],
        topleft: &[i32],
        xs: usize,
    ) {
        let mut x = 0;
        while x < xs {
            let n = CHUNK_SIZE.min(xs - x);
            self.process_chunk(&row[x..], &left[x..], &top[x..], &topleft[x..], n);
            x += CHUNK_SIZE;
        }
    }

    /// Flush the pending run and return the sink.
    pub fn finalize(mut self) -> S {
        self.sink.finalize(self.run);
        self.run = 0;
        self.sink
    }
}

/// Accumulates raw and run-length token counts.
pub struct SampleCollector<'a> {
    raw_counts: &'a mut [u64; NUM_RAW_SYMBOLS],
    lz77_counts: &'a mut [u64; NUM_LZ77],
}

impl<'a> SampleCollector<'a> {
    pub fn new(
        raw_counts: &'a mut [u64; NUM_RAW_SYMBOLS],
        lz77_counts: &'a mut [u64; NUM_LZ77],
    ) -> Self {
        Self {
            raw_counts,
            lz77_counts,
        }
    }

    fn rle(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.raw_counts[0] += 1;
        let token = encode_hybrid_uint_lz77((count - LZ77_MIN_LENGTH - 1) as u32).token;
        self.lz77_counts[token as usize] += 1;
    }
}

impl ChunkSink for SampleCollector<'_> {
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize) {
        self.rle(run);
        for &r in &residuals[skip..n] {
            self.raw_counts[encode_hybrid_uint_000(r).token as usize] += 1;
        }
    }

    fn finalize(&mut self, _run: usize) {}
}

/// Writes tokens with a finished prefix code.
pub struct ChunkEncoder<'a, D> {
    code: &'a PrefixCode,
    output: &'a mut BitWriter,
    kernel: Kernel,
    depth: PhantomData<D>,
}

impl<'a, D: BitDepth> ChunkEncoder<'a, D> {
    pub fn new(code: &'a PrefixCode, output: &'a mut BitWriter, kernel: Kernel) -> Self {
        Self {
            code,
            output,
            kernel,
            depth: PhantomData,
        }
    }

    fn encode_rle(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let (nbits, bits) = self.code.run_bits((count - LZ77_MIN_LENGTH - 1) as u32);
        self.output.write(nbits, bits);
    }
}

impl<D: BitDepth> ChunkSink for ChunkEncoder<'_, D> {
    fn chunk(&mut self, run: usize, residuals: &[u32; CHUNK_SIZE], skip: usize, n: usize) {
        self.encode_rle(run);
        match self.kernel.lanes() {
            8 => encode_chunk_lanes::<D, 8>(residuals, skip, n, self.code, self.output),
            4 => encode_chunk_lanes::<D, 4>(residuals, skip, n, self.code, self.output),
            _ => encode_chunk_scalar(residuals, skip, n, self.code, self.output),
        }
    }

    fn finalize(&mut self, run: usize) {
        self.encode_rle(run);
    }
}

/// One write per residual through the full code tables.
pub(crate) fn encode_chunk_scalar(
    residuals: &[u32; CHUNK_SIZE],
    skip: usize,
    n: usize,
    code: &PrefixCode,
    output: &mut BitWriter,
) {
    for &r in &residuals[skip..n] {
        let t = encode_hybrid_uint_000(r);
        let token = t.token as usize;
        let code_nbits = code.raw_nbits[token];
        debug_assert!(code_nbits != 0, "token {token} has no code");
        output.write(
            code_nbits as usize + t.nbits as usize,
            u64::from(code.raw_bits[token]) | (u64::from(t.bits) << code_nbits),
        );
    }
}

/// Tokenize `LANES` residuals at a time through the folded 16-entry tables,
/// merge neighbouring lanes into 64-bit entries and write them in one batch.
pub(crate) fn encode_chunk_lanes<D: BitDepth, const LANES: usize>(
    residuals: &[u32; CHUNK_SIZE],
    skip: usize,
    n: usize,
    code: &PrefixCode,
    output: &mut BitWriter,
) {
    debug_assert!(LANES % 2 == 0 && CHUNK_SIZE % LANES == 0);
    let mut nbits64 = [0u64; CHUNK_SIZE / 2];
    let mut bits64 = [0u64; CHUNK_SIZE / 2];

    for base in (0..CHUNK_SIZE).step_by(LANES) {
        let mut nbits = [0u32; LANES];
        let mut bits = [0u32; LANES];
        for lane in 0..LANES {
            let r = residuals[base + lane];
            let token = 32 - r.leading_zeros();
            let extra_nbits = token.saturating_sub(1);
            let extra_bits = r.saturating_sub(1 << extra_nbits);
            let (code_nbits, code_bits) = D::lane_lookup(token, code);
            let keep = base + lane >= skip && base + lane < n;
            nbits[lane] = if keep { code_nbits + extra_nbits } else { 0 };
            bits[lane] = if keep {
                code_bits | (extra_bits << code_nbits)
            } else {
                0
            };
        }
        for pair in (0..LANES).step_by(2) {
            let slot = (base + pair) / 2;
            nbits64[slot] = u64::from(nbits[pair]) + u64::from(nbits[pair + 1]);
            bits64[slot] = u64::from(bits[pair]) | (u64::from(bits[pair + 1]) << nbits[pair]);
        }
    }
    output.write_multiple(&nbits64, &bits64);
}

/// Samples of padding left of each row buffer.
const ROW_PADDING: usize = 32;

/// Two alternating row buffers for one channel.
///
/// The slot left of `x = 0` holds the left neighbour used at the image
/// edge: the first sample of the row above, or zero on the first row. The
/// first row predicts from its left neighbour only.
pub struct ChannelRows {
    rows: [Vec<i32>; 2],
}

impl ChannelRows {
    /// Buffers for rows of up to `width` samples.
    pub fn new(width: usize) -> Self {
        let len = ROW_PADDING + width.div_ceil(CHUNK_SIZE) * CHUNK_SIZE + ROW_PADDING;
        Self {
            rows: [vec![0; len], vec![0; len]],
        }
    }

    /// Storage for row `y`, starting at `x = 0`.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [i32] {
        &mut self.rows[y & 1][ROW_PADDING..]
    }

    /// Set the edge neighbours of row `y` once it has been filled.
    pub fn fix_edges(&mut self, y: usize) {
        let [even, odd] = &mut self.rows;
        let (cur, prev) = if y & 1 == 0 { (even, odd) } else { (odd, even) };
        let edge = if y > 0 { prev[ROW_PADDING] } else { 0 };
        cur[ROW_PADDING - 1] = edge;
        prev[ROW_PADDING - 1] = edge;
    }

    /// Feed the first `xs` samples of row `y` to `processor`.
    pub fn process<S: ChunkSink>(&self, y: usize, processor: &mut RowProcessor<S>, xs: usize) {
        let cur = &self.rows[y & 1];
        let prev = &self.rows[(y + 1) & 1];
        let left = &cur[ROW_PADDING - 1..];
        let (top, topleft) = if y == 0 {
            (left, left)
        } else {
            (&prev[ROW_PADDING..], &prev[ROW_PADDING - 1..])
        };
        processor.process_row(&cur[ROW_PADDING..], left, top, topleft, xs);
    }
}
