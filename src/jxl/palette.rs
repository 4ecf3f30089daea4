//! Palette detection for 8-bit images with few distinct colours.
//!
//! Pixels are packed into a `u32` (channel `c` in byte `c`) and hashed into
//! a fixed table. Any hash collision between two distinct colours, or more
//! colours than the palette can hold, disables the palette. Colour 0 is
//! always present at index 0 and never stored in the table.

use log::trace;

/// log2 of the hash table size.
const HASH_EXP: u32 = 16;

/// Number of hash table slots.
pub const HASH_SIZE: usize = 1 << HASH_EXP;

/// Largest palette, counting the implicit zero colour.
pub const MAX_COLORS: usize = 512;

const HASH_MULTIPLIER: u32 = 2_654_435_761;

/// Hash table slot of a packed pixel.
#[inline]
pub fn pixel_hash(pixel: u32) -> usize {
    (pixel.wrapping_mul(HASH_MULTIPLIER) >> (32 - HASH_EXP)) as usize
}

/// Pack `bytes` (one byte per channel) into a little-endian `u32`.
#[inline]
pub fn pack_pixel(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (c, &b)| acc | (u32::from(b) << (8 * c)))
}

/// A detected palette and its reverse lookup.
#[derive(Debug, Clone)]
pub struct Palette {
    /// Packed colours; `colors[0]` is always zero.
    colors: Vec<u32>,
    /// Palette index per hash slot.
    lookup: Vec<u16>,
    channels: usize,
}

impl Palette {
    /// Scan an 8-bit image and build a palette if it qualifies.
    ///
    /// `data` holds `height` rows of `stride` bytes, each starting with
    /// `width * channels` samples.
    pub fn detect(
        data: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
    ) -> Option<Palette> {
        debug_assert!((1..=4).contains(&channels));
        let mut table = vec![0u32; HASH_SIZE];
        let mut seen_zero = false;

        for y in 0..height {
            let row = &data[y * stride..y * stride + width * channels];
            for px in row.chunks_exact(channels) {
                let p = pack_pixel(px);
                let slot = pixel_hash(p);
                if p == 0 {
                    // Zero shares slot 0 with any colour hashing there.
                    if table[slot] != 0 {
                        return None;
                    }
                    seen_zero = true;
                    continue;
                }
                if table[slot] != 0 && table[slot] != p {
                    return None;
                }
                if slot == pixel_hash(0) && seen_zero {
                    return None;
                }
                table[slot] = p;
            }
        }

        let mut entries: Vec<u32> = Vec::new();
        let mut have_color = false;
        let mut min_g = u8::MAX;
        let mut max_g = 0u8;
        for &p in table.iter().filter(|&&p| p != 0) {
            let [p0, p1, p2, _] = p.to_le_bytes();
            if p0 != p1 || p0 != p2 {
                have_color = true;
            }
            min_g = min_g.min(p1);
            max_g = max_g.max(p1);
            entries.push(p);
            if entries.len() + 1 > MAX_COLORS {
                trace!("palette rejected: more than {MAX_COLORS} colours");
                return None;
            }
        }

        // Grey ramps without many holes predict better than they index.
        let g_range = i32::from(max_g) - i32::from(min_g);
        if !have_color && (g_range as f32) < entries.len() as f32 * 1.4 {
            trace!("palette rejected: dense greyscale ({} levels)", entries.len());
            return None;
        }

        entries.sort_by(|&a, &b| {
            luma_key(a, channels)
                .partial_cmp(&luma_key(b, channels))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut colors = Vec::with_capacity(entries.len() + 1);
        colors.push(0);
        colors.extend_from_slice(&entries);

        let mut lookup = vec![0u16; HASH_SIZE];
        for (index, &p) in colors.iter().enumerate().skip(1) {
            lookup[pixel_hash(p)] = index as u16;
        }

        Some(Palette {
            colors,
            lookup,
            channels,
        })
    }

    /// Number of palette colours, including the zero colour.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false: the zero colour is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Channels per colour.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Packed colours in index order.
    #[inline]
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Channel `c` of colour `index`.
    #[inline]
    pub fn component(&self, index: usize, c: usize) -> u8 {
        (self.colors[index] >> (8 * c)) as u8
    }

    /// Palette index of a packed pixel that occurs in the image.
    #[inline]
    pub fn index_of(&self, pixel: u32) -> usize {
        usize::from(self.lookup[pixel_hash(pixel)])
    }
}

/// Sort key: luma, weighted by alpha for four-channel images.
fn luma_key(p: u32, channels: usize) -> f32 {
    let [r, g, b, a] = p.to_le_bytes();
    let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b) + 0.01;
    if channels == 4 {
        luma * f32::from(a)
    } else {
        luma
    }
}
