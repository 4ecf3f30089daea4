//! x86_64 predictor kernels using SSE2 and AVX2.
//!
//! Samples are held as 32-bit lanes. The scalar predictor's branches become
//! sign-mask selects; zigzag packing is `2r` for non-negative residuals and
//! `!(2r)` for negative ones.

use crate::jxl::chunk::CHUNK_SIZE;
use std::arch::x86_64::*;

// ============================================================================
// SSE2
// ============================================================================

/// `mask ? a : b` per 32-bit lane.
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn select_sse2(mask: __m128i, a: __m128i, b: __m128i) -> __m128i {
    _mm_or_si128(_mm_and_si128(mask, a), _mm_andnot_si128(mask, b))
}

/// Predict one chunk with four lanes per step.
///
/// # Safety
/// Caller must ensure SSE2 is available and that every slice holds at least
/// [`CHUNK_SIZE`] samples.
#[target_feature(enable = "sse2")]
pub unsafe fn predict_chunk_sse2(
    px: &[i32],
    left: &[i32],
    top: &[i32],
    topleft: &[i32],
    residuals: &mut [u32; CHUNK_SIZE],
) -> usize {
    debug_assert!(px.len() >= CHUNK_SIZE && left.len() >= CHUNK_SIZE);
    debug_assert!(top.len() >= CHUNK_SIZE && topleft.len() >= CHUNK_SIZE);

    let zero = _mm_setzero_si128();
    let ones = _mm_set1_epi32(-1);
    let mut zero_mask = 0u32;

    for i in (0..CHUNK_SIZE).step_by(4) {
        let p = _mm_loadu_si128(px.as_ptr().add(i) as *const __m128i);
        let l = _mm_loadu_si128(left.as_ptr().add(i) as *const __m128i);
        let t = _mm_loadu_si128(top.as_ptr().add(i) as *const __m128i);
        let tl = _mm_loadu_si128(topleft.as_ptr().add(i) as *const __m128i);

        let ac = _mm_sub_epi32(l, tl);
        let ab = _mm_sub_epi32(l, t);
        let bc = _mm_sub_epi32(t, tl);
        let grad = _mm_add_epi32(ac, t);

        let clamp = select_sse2(_mm_cmplt_epi32(_mm_xor_si128(ab, bc), zero), t, l);
        let pred = select_sse2(_mm_cmplt_epi32(_mm_xor_si128(ac, bc), zero), grad, clamp);

        let res = _mm_sub_epi32(p, pred);
        let twice = _mm_add_epi32(res, res);
        let packed = select_sse2(
            _mm_cmplt_epi32(res, zero),
            _mm_xor_si128(twice, ones),
            twice,
        );
        _mm_storeu_si128(residuals.as_mut_ptr().add(i) as *mut __m128i, packed);

        let is_zero = _mm_cmpeq_epi32(packed, zero);
        zero_mask |= (_mm_movemask_ps(_mm_castsi128_ps(is_zero)) as u32) << i;
    }

    (!zero_mask).trailing_zeros() as usize
}

// ============================================================================
// AVX2
// ============================================================================

/// Predict one chunk with eight lanes per step.
///
/// # Safety
/// Caller must ensure AVX2 is available and that every slice holds at least
/// [`CHUNK_SIZE`] samples.
#[target_feature(enable = "avx2")]
pub unsafe fn predict_chunk_avx2(
    px: &[i32],
    left: &[i32],
    top: &[i32],
    topleft: &[i32],
    residuals: &mut [u32; CHUNK_SIZE],
) -> usize {
    debug_assert!(px.len() >= CHUNK_SIZE && left.len() >= CHUNK_SIZE);
    debug_assert!(top.len() >= CHUNK_SIZE && topleft.len() >= CHUNK_SIZE);

    let zero = _mm256_setzero_si256();
    let ones = _mm256_set1_epi32(-1);
    let mut zero_mask = 0u32;

    for i in (0..CHUNK_SIZE).step_by(8) {
        let p = _mm256_loadu_si256(px.as_ptr().add(i) as *const __m256i);
        let l = _mm256_loadu_si256(left.as_ptr().add(i) as *const __m256i);
        let t = _mm256_loadu_si256(top.as_ptr().add(i) as *const __m256i);
        let tl = _mm256_loadu_si256(topleft.as_ptr().add(i) as *const __m256i);

        let ac = _mm256_sub_epi32(l, tl);
        let ab = _mm256_sub_epi32(l, t);
        let bc = _mm256_sub_epi32(t, tl);
        let grad = _mm256_add_epi32(ac, t);

        // blendv picks the second operand where the mask's sign bit is set.
        let clamp = _mm256_blendv_epi8(l, t, _mm256_cmpgt_epi32(zero, _mm256_xor_si256(ab, bc)));
        let pred = _mm256_blendv_epi8(
            clamp,
            grad,
            _mm256_cmpgt_epi32(zero, _mm256_xor_si256(ac, bc)),
        );

        let res = _mm256_sub_epi32(p, pred);
        let twice = _mm256_add_epi32(res, res);
        let packed = _mm256_blendv_epi8(
            twice,
            _mm256_xor_si256(twice, ones),
            _mm256_cmpgt_epi32(zero, res),
        );
        _mm256_storeu_si256(residuals.as_mut_ptr().add(i) as *mut __m256i, packed);

        let is_zero = _mm256_cmpeq_epi32(packed, zero);
        zero_mask |= (_mm256_movemask_ps(_mm256_castsi256_ps(is_zero)) as u32) << i;
    }

    (!zero_mask).trailing_zeros() as usize
}
