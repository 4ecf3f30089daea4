//! Hybrid-uint tokenization.
//!
//! A value becomes a token plus `nbits` raw extra bits. Residuals use the
//! `000` configuration (token 0 for zero, otherwise `floor(log2(v)) + 1`),
//! run lengths use the `400` configuration (values below 16 are their own
//! token).

/// A tokenized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridUint {
    pub token: u32,
    pub nbits: u32,
    pub bits: u32,
}

#[inline]
fn floor_log2(value: u32) -> u32 {
    31 - value.leading_zeros()
}

/// Tokenize a residual (split exponent 0, no msb/lsb in token).
#[inline]
pub fn encode_hybrid_uint_000(value: u32) -> HybridUint {
    if value == 0 {
        return HybridUint {
            token: 0,
            nbits: 0,
            bits: 0,
        };
    }
    let n = floor_log2(value);
    HybridUint {
        token: n + 1,
        nbits: n,
        bits: value - (1 << n),
    }
}

/// Tokenize a run length (split exponent 4, no msb/lsb in token).
#[inline]
pub fn encode_hybrid_uint_lz77(value: u32) -> HybridUint {
    if value < 16 {
        return HybridUint {
            token: value,
            nbits: 0,
            bits: 0,
        };
    }
    let n = floor_log2(value);
    HybridUint {
        token: 16 + n - 4,
        nbits: n,
        bits: value - (1 << n),
    }
}

/// Zigzag a signed residual: `v >= 0` maps to `2v`, `v < 0` to `-2v - 1`.
#[inline]
pub fn pack_signed(value: i32) -> u32 {
    ((value as u32) << 1) ^ (((!value) as u32 >> 31).wrapping_sub(1))
}

/// Inverse of [`pack_signed`].
#[inline]
pub fn unpack_signed(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
