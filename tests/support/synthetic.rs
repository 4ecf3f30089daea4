//! Deterministic test images.

use fjxl::ColorType;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Interleaved samples plus their layout.
#[derive(Debug, Clone)]
pub struct TestImage {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
    pub bit_depth: u8,
    pub samples: Vec<u16>,
}

impl TestImage {
    pub fn channels(&self) -> usize {
        self.color_type.channels()
    }

    /// Raw input bytes: one byte per sample up to 8 bits, two above.
    pub fn to_bytes(&self, big_endian: bool) -> Vec<u8> {
        if self.bit_depth <= 8 {
            return self.samples.iter().map(|&v| v as u8).collect();
        }
        self.samples
            .iter()
            .flat_map(|&v| {
                if big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }

    /// Raw bytes with each row padded to `stride` bytes.
    pub fn to_strided_bytes(&self, stride: usize) -> Vec<u8> {
        let packed = self.to_bytes(false);
        let row = packed.len() / self.height as usize;
        let mut out = vec![0xA5u8; stride * self.height as usize];
        for (y, src) in packed.chunks_exact(row).enumerate() {
            out[y * stride..y * stride + row].copy_from_slice(src);
        }
        out
    }
}

fn max_value(bit_depth: u8) -> u32 {
    (1u32 << bit_depth) - 1
}

/// Uniform noise over the full sample range.
pub fn noise(width: u32, height: u32, color_type: ColorType, bit_depth: u8, seed: u64) -> TestImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = width as usize * height as usize * color_type.channels();
    let max = max_value(bit_depth);
    TestImage {
        width,
        height,
        color_type,
        bit_depth,
        samples: (0..n).map(|_| rng.gen_range(0..=max) as u16).collect(),
    }
}

/// Smooth diagonal gradient with light noise, like a photo.
pub fn gradient(
    width: u32,
    height: u32,
    color_type: ColorType,
    bit_depth: u8,
    seed: u64,
) -> TestImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let channels = color_type.channels();
    let max = max_value(bit_depth) as i64;
    let span = i64::from(width + height).max(1);
    let mut samples = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..i64::from(height) {
        for x in 0..i64::from(width) {
            for c in 0..channels as i64 {
                let base = (x * (c + 1) + y * (3 - c.min(2))) * max / (2 * span);
                let jitter = rng.gen_range(-2..=2i64);
                samples.push((base + jitter).clamp(0, max) as u16);
            }
        }
    }
    TestImage {
        width,
        height,
        color_type,
        bit_depth,
        samples,
    }
}

/// A single colour everywhere: long zero-residual runs.
pub fn flat(width: u32, height: u32, color_type: ColorType, bit_depth: u8, value: u16) -> TestImage {
    let n = width as usize * height as usize * color_type.channels();
    TestImage {
        width,
        height,
        color_type,
        bit_depth,
        samples: vec![value; n],
    }
}

/// 8-bit image drawn from a handful of saturated colours in blocks.
pub fn few_colors(width: u32, height: u32, color_type: ColorType, seed: u64) -> TestImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let channels = color_type.channels();
    let palette: Vec<Vec<u16>> = (0..6)
        .map(|i| {
            (0..channels)
                .map(|c| ((i * 97 + c * 61 + 13) % 256) as u16)
                .collect()
        })
        .collect();
    let mut samples = Vec::with_capacity(width as usize * height as usize * channels);
    let mut current = 0;
    for y in 0..height as usize {
        for x in 0..width as usize {
            if (x + y * 7) % 9 == 0 {
                current = rng.gen_range(0..palette.len());
            }
            samples.extend_from_slice(&palette[current]);
        }
    }
    TestImage {
        width,
        height,
        color_type,
        bit_depth: 8,
        samples,
    }
}
