//! SIMD kernels with runtime CPU feature detection.
//!
//! The encoder picks a [`Kernel`] once per frame. Every kernel produces the
//! same residuals and the same bytes; the scalar kernel in [`fallback`] is
//! the reference and is always available. Vector kernels only exist on
//! x86_64 with the `simd` feature.

pub mod fallback;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
#[cfg_attr(docsrs, doc(cfg(feature = "simd")))]
pub mod x86_64;

use crate::jxl::chunk::CHUNK_SIZE;

/// Instruction set behind a [`Kernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Portable scalar code.
    Scalar,
    /// 128-bit SSE2, four 32-bit lanes.
    Sse2,
    /// 256-bit AVX2, eight 32-bit lanes.
    Avx2,
}

/// A kernel the current CPU can run.
///
/// Only obtainable through [`Kernel::detect`], [`Kernel::available`] or
/// [`Kernel::SCALAR`], so holding one proves the instructions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kernel(KernelKind);

impl Kernel {
    /// The portable reference kernel.
    pub const SCALAR: Kernel = Kernel(KernelKind::Scalar);

    /// Widest kernel supported by this CPU.
    pub fn detect() -> Self {
        Self::available().pop().unwrap_or(Self::SCALAR)
    }

    /// All kernels supported by this CPU, narrowest first.
    pub fn available() -> Vec<Self> {
        #[allow(unused_mut)]
        let mut kernels = vec![Self::SCALAR];
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        {
            if is_x86_feature_detected!("sse2") {
                kernels.push(Kernel(KernelKind::Sse2));
            }
            if is_x86_feature_detected!("avx2") {
                kernels.push(Kernel(KernelKind::Avx2));
            }
        }
        kernels
    }

    /// Instruction set of this kernel.
    pub fn kind(self) -> KernelKind {
        self.0
    }

    /// Lanes processed together when emitting tokens.
    pub fn lanes(self) -> usize {
        match self.0 {
            KernelKind::Scalar => 1,
            KernelKind::Sse2 => 4,
            KernelKind::Avx2 => 8,
        }
    }

    /// Packed residuals for one chunk plus the count of leading zeros.
    ///
    /// See [`fallback::predict_chunk`] for the contract.
    #[inline]
    pub fn predict_chunk(
        self,
        px: &[i32],
        left: &[i32],
        top: &[i32],
        topleft: &[i32],
        residuals: &mut [u32; CHUNK_SIZE],
    ) -> usize {
        assert!(
            px.len() >= CHUNK_SIZE
                && left.len() >= CHUNK_SIZE
                && top.len() >= CHUNK_SIZE
                && topleft.len() >= CHUNK_SIZE
        );
        match self.0 {
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: a Kernel is only constructed after feature detection.
            KernelKind::Avx2 => unsafe {
                x86_64::predict_chunk_avx2(px, left, top, topleft, residuals)
            },
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: as above.
            KernelKind::Sse2 => unsafe {
                x86_64::predict_chunk_sse2(px, left, top, topleft, residuals)
            },
            _ => fallback::predict_chunk(px, left, top, topleft, residuals),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::detect()
    }
}

/// Predict one chunk with the widest available kernel.
pub fn predict_chunk(
    px: &[i32],
    left: &[i32],
    top: &[i32],
    topleft: &[i32],
    residuals: &mut [u32; CHUNK_SIZE],
) -> usize {
    Kernel::detect().predict_chunk(px, left, top, topleft, residuals)
}
