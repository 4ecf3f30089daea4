//! Pixel layouts and the reversible luma/chroma transform.

/// Channel layout of interleaved input pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorType {
    /// Single luminance channel.
    Gray,
    /// Luminance followed by alpha.
    GrayAlpha,
    /// Red, green, blue.
    #[default]
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ColorType {
    /// Number of interleaved channels.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            ColorType::Gray => 1,
            ColorType::GrayAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    /// Whether the last channel is alpha.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayAlpha | ColorType::Rgba)
    }

    /// Whether the layout carries three colour channels.
    #[inline]
    pub const fn is_color(self) -> bool {
        matches!(self, ColorType::Rgb | ColorType::Rgba)
    }

    /// Layout for a channel count, if valid.
    pub const fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(ColorType::Gray),
            2 => Some(ColorType::GrayAlpha),
            3 => Some(ColorType::Rgb),
            4 => Some(ColorType::Rgba),
            _ => None,
        }
    }
}

/// Forward YCoCg-R transform. Returns `(y, co, cg)`.
#[inline]
pub fn rgb_to_ycocg(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let co = r - b;
    let tmp = b + (co >> 1);
    let cg = g - tmp;
    let y = tmp + (cg >> 1);
    (y, co, cg)
}

/// Inverse of [`rgb_to_ycocg`]. Returns `(r, g, b)`.
#[inline]
pub fn ycocg_to_rgb(y: i32, co: i32, cg: i32) -> (i32, i32, i32) {
    let tmp = y - (cg >> 1);
    let g = cg + tmp;
    let b = tmp - (co >> 1);
    let r = b + co;
    (r, g, b)
}
