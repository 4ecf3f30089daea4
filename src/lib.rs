//! # fjxl
//!
//! A fast lossless JPEG XL encoder written in Rust.
//!
//! - **Fixed pipeline**: gradient prediction, YCoCg for colour images, a
//!   palette for 8-bit images with few colours, and per-channel prefix codes
//!   with run-length tokens. No search, so encoding runs at memory speed.
//! - **Any layout**: 1 to 4 channels, 1 to 16 bits per sample, big- or
//!   little-endian 16-bit input, arbitrary row stride.
//! - **Performance**: SSE2/AVX2 kernels chosen at runtime and 256x256 groups
//!   encoded in parallel. Output bytes never depend on the CPU or thread
//!   count.
//! - **Streaming**: [`jxl::FrameState`] writes the codestream into
//!   caller-sized chunks.
//!
//! ## Quickstart
//!
//! ```rust
//! use fjxl::jxl::{self, JxlOptions};
//! use fjxl::ColorType;
//!
//! # fn main() -> fjxl::Result<()> {
//! // 3x1 RGB pixels (red, green, blue)
//! let pixels = vec![255, 0, 0, 0, 255, 0, 0, 0, 255];
//! let options = JxlOptions::builder(3, 1).color_type(ColorType::Rgb).build();
//! let jxl_bytes = jxl::encode(&pixels, &options)?;
//! assert!(!jxl_bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ### 16-bit input
//!
//! ```rust
//! use fjxl::jxl::{encode, JxlOptions};
//! use fjxl::ColorType;
//!
//! # fn main() -> fjxl::Result<()> {
//! let pixels: Vec<u8> = [1000u16, 2000, 3000, 65535]
//!     .iter()
//!     .flat_map(|v| v.to_be_bytes())
//!     .collect();
//! let options = JxlOptions::builder(2, 1)
//!     .color_type(ColorType::GrayAlpha)
//!     .bit_depth(16)
//!     .big_endian(true)
//!     .preset(2) // max effort
//!     .build();
//! let jxl_bytes = encode(&pixels, &options)?;
//! assert!(!jxl_bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ### Buffer reuse
//!
//! ```rust
//! use fjxl::jxl::{encode_into, JxlOptions};
//!
//! # fn main() -> fjxl::Result<()> {
//! let pixels = vec![255, 0, 0, 0, 255, 0]; // 2 RGB pixels
//! let mut buf = Vec::new();
//! encode_into(&mut buf, &pixels, &JxlOptions::fast(2, 1))?;
//! assert!(!buf.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//! - `simd` (default): SSE2/AVX2 predictor kernels with runtime detection.
//! - `parallel` (default): Encode groups on the rayon thread pool.
//!
//! ## Safety and performance notes
//! - Unsafe is only compiled when `simd` is enabled; otherwise `forbid(unsafe_code)` is applied.
//! - Prefer `encode_into` when encoding repeatedly to reuse allocations.
//! - Effort 1 skips palette detection and samples the fewest rows.

#![cfg_attr(docsrs, feature(doc_cfg))]
// Allow unsafe code only when the SIMD feature is enabled
#![cfg_attr(not(feature = "simd"), forbid(unsafe_code))]

pub mod bits;
pub mod color;
pub mod error;
pub mod jxl;
pub mod parallel;
pub mod simd;

pub use color::ColorType;
pub use error::{Error, Result};
pub use jxl::{encode, encode_into, FrameState, JxlOptions};
