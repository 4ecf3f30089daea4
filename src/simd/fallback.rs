//! Scalar reference kernels.

use crate::jxl::chunk::CHUNK_SIZE;

/// Packed gradient-predictor residuals for one chunk and the number of
/// leading zero residuals.
///
/// `px`, `left`, `top` and `topleft` must each hold at least
/// [`CHUNK_SIZE`] samples aligned with each other.
#[inline]
pub fn predict_chunk(
    px: &[i32],
    left: &[i32],
    top: &[i32],
    topleft: &[i32],
    residuals: &mut [u32; CHUNK_SIZE],
) -> usize {
    crate::jxl::predict::predict_chunk(px, left, top, topleft, residuals)
}
