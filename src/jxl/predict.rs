//! Gradient predictor in a feature-agnostic module.
//!
//! This scalar implementation defines the residuals every kernel must
//! reproduce. SIMD paths in [`crate::simd`] are checked against it.

use super::chunk::CHUNK_SIZE;
use super::hybrid::pack_signed;

/// Clamped gradient prediction from the west, north and north-west samples.
///
/// Returns `left + top - topleft` when it lies between `left` and `top`,
/// otherwise whichever of `left` or `top` it overshoots toward.
#[inline]
pub fn predict(left: i32, top: i32, topleft: i32) -> i32 {
    let ac = left.wrapping_sub(topleft);
    let ab = left.wrapping_sub(top);
    let bc = top.wrapping_sub(topleft);
    let grad = ac.wrapping_add(top);
    let clamp = if (ab ^ bc) < 0 { top } else { left };
    if (ac ^ bc) < 0 {
        grad
    } else {
        clamp
    }
}

/// Packed residuals for one chunk, returning how many leading residuals are
/// zero.
///
/// Every slice must hold at least [`CHUNK_SIZE`] samples; `left`, `top` and
/// `topleft` are aligned with `px`.
pub fn predict_chunk(
    px: &[i32],
    left: &[i32],
    top: &[i32],
    topleft: &[i32],
    residuals: &mut [u32; CHUNK_SIZE],
) -> usize {
    let mut prefix = 0;
    let mut in_prefix = true;
    for i in 0..CHUNK_SIZE {
        let r = pack_signed(px[i].wrapping_sub(predict(left[i], top[i], topleft[i])));
        residuals[i] = r;
        if in_prefix && r == 0 {
            prefix += 1;
        } else {
            in_prefix = false;
        }
    }
    prefix
}
