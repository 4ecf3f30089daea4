//! Error types for the encoder.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported while validating encoder input.
///
/// Only parameter validation is recoverable. Internal invariants (bit writer
/// capacity, pull buffer size) are programmer errors and panic instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Width or height exceeds what the size header can express.
    #[error("image too large: {width}x{height} (max {max}x{max})")]
    ImageTooLarge { width: u32, height: u32, max: u32 },

    /// Bits per sample outside the supported range.
    #[error("unsupported bit depth: {0} (supported: 1-16)")]
    UnsupportedBitDepth(u8),

    /// Effort outside 1-10.
    #[error("invalid effort: {0} (must be 1-10)")]
    InvalidEffort(u8),

    /// Row stride cannot hold a full row of pixels.
    #[error("row stride {stride} is smaller than a packed row of {row_bytes} bytes")]
    InvalidRowStride { stride: usize, row_bytes: usize },

    /// Pixel buffer is shorter than the geometry requires.
    #[error("invalid data length: expected at least {expected}, got {actual}")]
    InvalidDataLength { expected: usize, actual: usize },
}
