//! Fast lossless JPEG XL encoder.
//!
//! Produces a modular, single-frame codestream with a fixed gradient
//! predictor, YCoCg for colour images (or a palette when an 8-bit image has
//! few colours), and per-channel prefix codes with run-length tokens.
//! Groups of 256x256 pixels are encoded independently and in parallel.
//!
//! # Example
//!
//! ```rust
//! use fjxl::jxl::{encode, JxlOptions};
//! use fjxl::ColorType;
//!
//! let pixels = vec![255, 0, 0, 0, 255, 0]; // 2x1 RGB
//! let options = JxlOptions::builder(2, 1).color_type(ColorType::Rgb).build();
//! let jxl_bytes = encode(&pixels, &options).unwrap();
//! assert_eq!(&jxl_bytes[..2], &[0xFF, 0x0A]);
//! ```
//!
//! For streaming output, use [`FrameState`] directly:
//!
//! ```rust
//! use fjxl::jxl::{FrameState, JxlOptions};
//! use fjxl::parallel::SequentialRunner;
//!
//! # fn main() -> fjxl::Result<()> {
//! let pixels = vec![7u8; 64 * 64];
//! let options = JxlOptions::builder(64, 64)
//!     .color_type(fjxl::ColorType::Gray)
//!     .build();
//! let mut frame = FrameState::prepare(&pixels, &options, &SequentialRunner)?;
//! frame.prepare_header(true, true);
//! let mut out = Vec::new();
//! let mut chunk = [0u8; 256];
//! loop {
//!     let n = frame.write_output(&mut chunk);
//!     if n == 0 {
//!         break;
//!     }
//!     out.extend_from_slice(&chunk[..n]);
//! }
//! assert_eq!(out.len(), frame.output_size());
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod depth;
pub mod frame;
pub mod header;
pub mod hybrid;
pub mod palette;
pub mod predict;
pub mod prefix;

use log::debug;

use crate::color::ColorType;
use crate::error::{Error, Result};
use crate::parallel::ParallelRunner;
use crate::simd::Kernel;

pub use frame::FrameState;
pub use palette::Palette;

/// Largest width or height the size header can express.
pub const MAX_DIMENSION: u32 = 1 << 30;

/// Highest supported bits per sample.
pub const MAX_BIT_DEPTH: u8 = 16;

/// Effort range; 2 and above enable palette detection.
pub const MIN_EFFORT: u8 = 1;
pub const MAX_EFFORT: u8 = 10;

/// Encoding options.
///
/// Use [`JxlOptions::builder`] to create options with a fluent API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JxlOptions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Channel layout of the pixel data.
    pub color_type: ColorType,
    /// Bits per sample, 1-16. Up to 8 bits are read as one byte per sample,
    /// more as two.
    pub bit_depth: u8,
    /// Bytes between the starts of consecutive rows. `None` means tightly
    /// packed.
    pub row_stride: Option<usize>,
    /// Byte order of two-byte samples.
    pub big_endian: bool,
    /// 1-10. Controls how many rows are sampled for the entropy codes;
    /// 2 and above also try a palette for 8-bit images.
    pub effort: u8,
    /// Force a SIMD kernel. `None` detects the widest one.
    pub kernel: Option<Kernel>,
}

impl Default for JxlOptions {
    fn default() -> Self {
        Self {
            // Dimensions must be set via builder or a preset.
            width: 0,
            height: 0,
            color_type: ColorType::Rgb,
            bit_depth: 8,
            row_stride: None,
            big_endian: false,
            effort: 2,
            kernel: None,
        }
    }
}

impl JxlOptions {
    /// Preset 0: fast. Effort 1, no palette search.
    pub fn fast(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            effort: 1,
            ..Default::default()
        }
    }

    /// Preset 1: balanced. Effort 2, palette search on.
    pub fn balanced(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            effort: 2,
            ..Default::default()
        }
    }

    /// Preset 2: max. Effort 10, samples the most rows per group.
    pub fn max(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            effort: MAX_EFFORT,
            ..Default::default()
        }
    }

    /// Create from preset (0=fast, 1=balanced, 2=max).
    pub fn from_preset(width: u32, height: u32, preset: u8) -> Self {
        match preset {
            0 => Self::fast(width, height),
            2 => Self::max(width, height),
            _ => Self::balanced(width, height),
        }
    }

    /// Create a builder for [`JxlOptions`].
    ///
    /// Color type defaults to RGB, bit depth to 8, effort to 2.
    pub fn builder(width: u32, height: u32) -> JxlOptionsBuilder {
        JxlOptionsBuilder::new(width, height)
    }

    /// Bytes per sample in the input.
    pub fn bytes_per_sample(&self) -> usize {
        if self.bit_depth <= 8 {
            1
        } else {
            2
        }
    }

    /// Bytes of one tightly packed row.
    pub fn packed_row_bytes(&self) -> usize {
        self.width as usize * self.color_type.channels() * self.bytes_per_sample()
    }

    /// Check the options against a buffer of `data_len` bytes and return
    /// the row stride to use.
    pub fn validate(&self, data_len: usize) -> Result<usize> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::ImageTooLarge {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }
        if self.bit_depth == 0 || self.bit_depth > MAX_BIT_DEPTH {
            return Err(Error::UnsupportedBitDepth(self.bit_depth));
        }
        if !(MIN_EFFORT..=MAX_EFFORT).contains(&self.effort) {
            return Err(Error::InvalidEffort(self.effort));
        }

        let row_bytes = self.packed_row_bytes();
        let stride = self.row_stride.unwrap_or(row_bytes);
        if stride < row_bytes {
            return Err(Error::InvalidRowStride { stride, row_bytes });
        }

        let expected = stride
            .checked_mul(height as usize - 1)
            .and_then(|v| v.checked_add(row_bytes))
            .ok_or(Error::InvalidDataLength {
                expected: usize::MAX,
                actual: data_len,
            })?;
        if data_len < expected {
            return Err(Error::InvalidDataLength {
                expected,
                actual: data_len,
            });
        }
        Ok(stride)
    }
}

/// Builder for [`JxlOptions`].
#[derive(Debug, Clone)]
pub struct JxlOptionsBuilder {
    options: JxlOptions,
}

impl JxlOptionsBuilder {
    /// Create a new builder with image dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            options: JxlOptions {
                width,
                height,
                ..Default::default()
            },
        }
    }

    pub fn color_type(mut self, color_type: ColorType) -> Self {
        self.options.color_type = color_type;
        self
    }

    pub fn bit_depth(mut self, bit_depth: u8) -> Self {
        self.options.bit_depth = bit_depth;
        self
    }

    /// None means tightly packed rows.
    pub fn row_stride(mut self, stride: Option<usize>) -> Self {
        self.options.row_stride = stride;
        self
    }

    pub fn big_endian(mut self, value: bool) -> Self {
        self.options.big_endian = value;
        self
    }

    pub fn effort(mut self, effort: u8) -> Self {
        self.options.effort = effort;
        self
    }

    /// Force a kernel from [`Kernel::available`].
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.options.kernel = Some(kernel);
        self
    }

    /// Apply a preset's effort while retaining the image layout.
    pub fn preset(mut self, preset: u8) -> Self {
        self.options.effort =
            JxlOptions::from_preset(self.options.width, self.options.height, preset).effort;
        self
    }

    /// Build the [`JxlOptions`].
    #[must_use]
    pub fn build(self) -> JxlOptions {
        self.options
    }
}

/// Encode raw pixel data as a standalone JPEG XL file.
///
/// # Example
///
/// ```rust
/// use fjxl::jxl::{encode, JxlOptions};
/// use fjxl::ColorType;
///
/// let pixels = vec![0u8, 0, 255, 255]; // 2x1 gray + alpha
/// let options = JxlOptions::builder(2, 1)
///     .color_type(ColorType::GrayAlpha)
///     .build();
/// let jxl_bytes = encode(&pixels, &options).unwrap();
/// assert!(!jxl_bytes.is_empty());
/// ```
#[must_use = "encoding is expensive; use the returned bytes"]
pub fn encode(data: &[u8], options: &JxlOptions) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_into(&mut output, data, options)?;
    Ok(output)
}

/// Encode raw pixel data into a caller-provided buffer.
///
/// The `output` buffer will be cleared and reused, allowing callers to avoid
/// repeated allocations across multiple encodes. Groups are encoded on the
/// rayon thread pool when the `parallel` feature is enabled.
#[must_use = "this `Result` may indicate an encoding error"]
pub fn encode_into(output: &mut Vec<u8>, data: &[u8], options: &JxlOptions) -> Result<()> {
    #[cfg(feature = "parallel")]
    let runner = crate::parallel::RayonRunner;
    #[cfg(not(feature = "parallel"))]
    let runner = crate::parallel::SequentialRunner;

    encode_into_with(output, data, options, &runner)
}

/// [`encode_into`] with an explicit parallel runner.
#[must_use = "this `Result` may indicate an encoding error"]
pub fn encode_into_with<R: ParallelRunner + ?Sized>(
    output: &mut Vec<u8>,
    data: &[u8],
    options: &JxlOptions,
    runner: &R,
) -> Result<()> {
    output.clear();

    let mut frame = FrameState::prepare(data, options, runner)?;
    frame.prepare_header(true, true);

    output.resize(frame.max_required_output(), 0);
    let mut total = 0;
    loop {
        let written = frame.write_output(&mut output[total..]);
        if written == 0 {
            break;
        }
        total += written;
    }
    output.truncate(total);

    debug!(
        "{}x{} {:?} {}-bit: {} bytes",
        options.width, options.height, options.color_type, options.bit_depth, total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let opts = JxlOptions::builder(10, 20).build();
        assert_eq!((opts.width, opts.height), (10, 20));
        assert_eq!(opts.color_type, ColorType::Rgb);
        assert_eq!(opts.bit_depth, 8);
        assert_eq!(opts.effort, 2);
        assert_eq!(opts.row_stride, None);
        assert!(!opts.big_endian);
    }

    #[test]
    fn test_presets() {
        assert_eq!(JxlOptions::from_preset(1, 1, 0).effort, 1);
        assert_eq!(JxlOptions::from_preset(1, 1, 1).effort, 2);
        assert_eq!(JxlOptions::from_preset(1, 1, 2).effort, 10);
        let opts = JxlOptions::builder(4, 4)
            .color_type(ColorType::Gray)
            .bit_depth(12)
            .preset(2)
            .build();
        assert_eq!(opts.effort, 10);
        assert_eq!(opts.color_type, ColorType::Gray);
        assert_eq!(opts.bit_depth, 12);
    }

    #[test]
    fn test_validate_dimensions() {
        let opts = JxlOptions::builder(0, 5).build();
        assert_eq!(
            opts.validate(100),
            Err(Error::InvalidDimensions {
                width: 0,
                height: 5
            })
        );
        let opts = JxlOptions::builder(MAX_DIMENSION + 1, 1).build();
        assert!(matches!(opts.validate(0), Err(Error::ImageTooLarge { .. })));
    }

    #[test]
    fn test_validate_bit_depth_and_effort() {
        for depth in [0u8, 17, 24, 32] {
            let opts = JxlOptions::builder(1, 1).bit_depth(depth).build();
            assert_eq!(opts.validate(8), Err(Error::UnsupportedBitDepth(depth)));
        }
        for effort in [0u8, 11] {
            let opts = JxlOptions::builder(1, 1).effort(effort).build();
            assert_eq!(opts.validate(3), Err(Error::InvalidEffort(effort)));
        }
    }

    #[test]
    fn test_validate_stride_and_length() {
        let opts = JxlOptions::builder(4, 3)
            .color_type(ColorType::Rgba)
            .bit_depth(16)
            .build();
        assert_eq!(opts.packed_row_bytes(), 32);
        assert_eq!(opts.validate(96), Ok(32));
        assert_eq!(
            opts.validate(95),
            Err(Error::InvalidDataLength {
                expected: 96,
                actual: 95
            })
        );

        let strided = JxlOptions {
            row_stride: Some(40),
            ..opts
        };
        // The last row needs no padding.
        assert_eq!(strided.validate(40 * 2 + 32), Ok(40));

        let short = JxlOptions {
            row_stride: Some(31),
            ..opts
        };
        assert_eq!(
            short.validate(1000),
            Err(Error::InvalidRowStride {
                stride: 31,
                row_bytes: 32
            })
        );
    }

    #[test]
    fn test_encode_into_reuses_buffer() {
        let pixels = vec![9u8; 3 * 5 * 5];
        let opts = JxlOptions::builder(5, 5).build();
        let mut buf = vec![1u8; 10_000];
        encode_into(&mut buf, &pixels, &opts).unwrap();
        let fresh = encode(&pixels, &opts).unwrap();
        assert_eq!(buf, fresh);
    }

    #[test]
    fn test_encode_rejects_short_data() {
        let opts = JxlOptions::builder(2, 2).build();
        assert!(matches!(
            encode(&[0u8; 11], &opts),
            Err(Error::InvalidDataLength { .. })
        ));
    }
}
