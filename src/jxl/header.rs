//! Hand-built headers: image header, frame header, TOC and the DC-global
//! section that carries the shared entropy codes.
//!
//! Every field here has a fixed value for this encoder, so the headers are
//! written bit by bit rather than through a general bundle serializer.

use crate::bits::BitWriter;
use crate::simd::Kernel;

use super::chunk::{ChannelRows, ChunkEncoder, RowProcessor};
use super::depth::UpTo8Bits;
use super::palette::Palette;
use super::prefix::{PrefixCode, LZ77_OFFSET};

/// Codestream signature.
const SIGNATURE: u64 = 0x0AFF;

/// Write a `U32(1 + u(9), 1 + u(13), 1 + u(18), 1 + u(30))` dimension.
fn write_size(output: &mut BitWriter, size: usize) {
    debug_assert!(size > 0);
    let value = (size - 1) as u64;
    if value < (1 << 9) {
        output.write(2, 0b00);
        output.write(9, value);
    } else if value < (1 << 13) {
        output.write(2, 0b01);
        output.write(13, value);
    } else if value < (1 << 18) {
        output.write(2, 0b10);
        output.write(18, value);
    } else {
        output.write(2, 0b11);
        output.write(30, value);
    }
}

/// `bits_per_sample` of a `BitDepth` bundle (integer samples).
fn write_bits_per_sample(output: &mut BitWriter, bitdepth: usize) {
    match bitdepth {
        8 => output.write(2, 0b00),
        10 => output.write(2, 0b01),
        12 => output.write(2, 0b10),
        _ => {
            output.write(2, 0b11);
            output.write(6, (bitdepth - 1) as u64);
        }
    }
}

/// Standalone image header: signature, size and image metadata, padded to
/// a byte boundary.
pub fn write_image_header(
    output: &mut BitWriter,
    width: usize,
    height: usize,
    bitdepth: usize,
    channels: usize,
) {
    let have_alpha = channels == 2 || channels == 4;

    output.write(16, SIGNATURE);

    output.write(1, 0); // not small
    write_size(output, height);
    output.write(3, 0); // no aspect ratio
    write_size(output, width);

    output.write(1, 0); // metadata not all_default
    output.write(1, 0); // no extra fields
    output.write(1, 0); // integer samples
    write_bits_per_sample(output, bitdepth);
    output.write(1, u64::from(bitdepth <= 14)); // 16-bit buffers suffice

    if have_alpha {
        output.write(2, 0b01); // one extra channel
        if bitdepth == 8 {
            output.write(1, 1); // default: 8-bit alpha
        } else {
            output.write(1, 0);
            output.write(2, 0b00); // alpha
            output.write(1, 0); // integer samples
            write_bits_per_sample(output, bitdepth);
            output.write(2, 0b00); // no dim shift
            output.write(2, 0b00); // no name
            output.write(1, 0); // not premultiplied
        }
    } else {
        output.write(2, 0b00);
    }

    output.write(1, 0); // not XYB
    if channels > 2 {
        output.write(1, 1); // sRGB
    } else {
        output.write(1, 0);
        output.write(1, 0); // no ICC
        output.write(2, 1); // grey
        output.write(2, 1); // D65
        output.write(1, 0); // no gamma
        output.write(2, 0b10); // transfer function 2 + u(4)
        output.write(4, 11); // sRGB transfer
        output.write(2, 1); // relative intent
    }
    output.write(2, 0b00); // no extensions

    output.write(1, 1); // default transform data
    output.zero_pad_to_byte();
}

/// Modular frame header with default group size and a single pass.
pub fn write_frame_header(output: &mut BitWriter, channels: usize, is_last: bool) {
    let have_alpha = channels == 2 || channels == 4;

    output.write(1, 0); // not all_default
    output.write(2, 0b00); // regular frame
    output.write(1, 1); // modular
    output.write(2, 0b00); // no flags
    output.write(1, 0); // not YCbCr
    output.write(2, 0b00); // no upsampling
    if have_alpha {
        output.write(2, 0b00);
    }
    output.write(2, 0b01); // 256x256 groups
    output.write(2, 0b00); // one pass
    output.write(1, 0); // full-size frame at the origin
    output.write(2, 0b00); // replace blending
    if have_alpha {
        output.write(2, 0b00);
    }
    output.write(1, u64::from(is_last));
    if !is_last {
        output.write(2, 0b00); // not saved as a reference
        output.write(1, 0); // would be saved after the colour transform
    }
    output.write(2, 0b00); // unnamed
    output.write(1, 0); // restoration filter not all_default
    output.write(1, 0); // no gaborish
    output.write(2, 0); // no EPF
    output.write(2, 0b00); // no filter extensions
    output.write(2, 0b00); // no frame extensions
}

/// Table of contents: one byte-size entry per section, byte aligned at both
/// ends.
pub fn write_toc(output: &mut BitWriter, section_sizes: &[usize]) {
    output.write(1, 0); // no permutation
    output.zero_pad_to_byte();
    for &size in section_sizes {
        let size = size as u64;
        if size < 1 << 10 {
            output.write(2, 0b00);
            output.write(10, size);
        } else if size - 1024 < 1 << 14 {
            output.write(2, 0b01);
            output.write(14, size - 1024);
        } else if size - 17408 < 1 << 22 {
            output.write(2, 0b10);
            output.write(22, size - 17408);
        } else {
            output.write(2, 0b11);
            output.write(30, size - 4_211_712);
        }
    }
    output.zero_pad_to_byte();
}

/// Prefix code and symbol sequence of the fixed MA tree: one leaf per
/// channel, each with the gradient predictor.
const TREE_SYMBOL_BITS: [u64; 6] = [0b00, 0b10, 0b001, 0b101, 0b0011, 0b0111];
const TREE_SYMBOL_NBITS: [usize; 6] = [2, 2, 3, 3, 4, 4];
const TREE_SYMBOLS: [usize; 26] = [
    1, 2, 1, 4, 1, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0,
];

/// Global modular section shared by both modes: tree, LZ77 parameters,
/// context map, histograms and the global image's group header.
fn write_dc_global_common(output: &mut BitWriter, codes: &[PrefixCode; 4]) {
    output.write(1, 1); // default dequantization
    output.write(1, 1); // global tree and histograms
    output.write(1, 0); // no LZ77 for the tree

    output.write(1, 1); // simple tree context map
    output.write(2, 0); // one cluster
    output.write(1, 1); // prefix coded
    output.write(4, 0); // hybrid uint 000
    output.write(6, 0b100011); // alphabet size 4
    output.write(2, 1); // simple prefix code
    output.write(2, 3); // four symbols
    for symbol in 0..4 {
        output.write(2, symbol);
    }
    output.write(1, 0); // first tree shape
    for &symbol in &TREE_SYMBOLS {
        output.write(TREE_SYMBOL_NBITS[symbol], TREE_SYMBOL_BITS[symbol]);
    }

    output.write(1, 1); // LZ77 on
    debug_assert_eq!(LZ77_OFFSET, 224);
    output.write(2, 0b00); // symbol offset 224
    output.write(4, 0b1010); // minimum length 7
    output.write(4, 4); // length config 400
    output.write(3, 0);
    output.write(3, 0);

    output.write(1, 1); // simple context map
    output.write(2, 3); // 3 bits per entry
    for context in [4, 3, 2, 1, 0] {
        output.write(3, context);
    }

    output.write(1, 1); // prefix codes
    output.write(4, 0); // distance config 000
    for _ in codes {
        output.write(4, 0); // symbol config 000
    }

    output.write(5, 0b00001); // distance alphabet of 2
    for _ in codes {
        // 1 + 2^8 + 0: raw symbols plus the run-length tokens.
        output.write(1, 1);
        output.write(4, 8);
        output.write(8, 0);
    }

    // Distance histogram: a single symbol.
    output.write(2, 1);
    output.write(2, 0);
    output.write(1, 1);

    for code in codes {
        code.write_to(output);
    }

    output.write(1, 1); // global tree
    output.write(1, 1); // default weighted predictor
}

/// DC-global section for direct coding, with the YCoCg transform when the
/// image has colour.
pub fn write_dc_global(
    output: &mut BitWriter,
    channels: usize,
    codes: &[PrefixCode; 4],
    is_single_group: bool,
) {
    write_dc_global_common(output, codes);
    if channels > 2 {
        output.write(2, 0b01); // one transform
        output.write(2, 0b00); // RCT
        output.write(5, 0b00000); // from channel 0
        output.write(2, 0b00); // YCoCg
    } else {
        output.write(2, 0b00);
    }
    if !is_single_group {
        output.zero_pad_to_byte();
    }
}

/// DC-global section for palette coding: transform header followed by the
/// palette itself, one row per channel, coded with `codes[0]`.
pub fn write_dc_global_palette(
    output: &mut BitWriter,
    codes: &[PrefixCode; 4],
    palette: &Palette,
    kernel: Kernel,
    is_single_group: bool,
) {
    let channels = palette.channels();
    let pcolors = palette.len();

    write_dc_global_common(output, codes);
    output.write(2, 0b01); // one transform
    output.write(2, 0b01); // palette
    output.write(5, 0b00000); // from channel 0
    match channels {
        1 => output.write(2, 0b00),
        3 => output.write(2, 0b01),
        4 => output.write(2, 0b10),
        _ => {
            output.write(2, 0b11);
            output.write(13, (channels - 1) as u64);
        }
    }
    if pcolors < 256 {
        output.write(2, 0b00);
        output.write(8, pcolors as u64);
    } else {
        output.write(2, 0b01);
        output.write(10, (pcolors - 256) as u64);
    }
    output.write(2, 0b00); // no deltas
    output.write(4, 0); // zero delta predictor

    let mut rows = ChannelRows::new(pcolors);
    let mut processor = RowProcessor::new(
        ChunkEncoder::<UpTo8Bits>::new(&codes[0], output, kernel),
        kernel,
    );
    for c in 0..channels {
        for (i, sample) in rows.row_mut(c)[..pcolors].iter_mut().enumerate() {
            *sample = i32::from(palette.component(i, c));
        }
        rows.fix_edges(c);
        rows.process(c, &mut processor, pcolors);
    }
    processor.finalize();

    if !is_single_group {
        output.zero_pad_to_byte();
    }
}

/// Header of a modular group stream: global tree, default weighted
/// predictor, no transforms.
pub fn write_group_header(output: &mut BitWriter) {
    output.write(1, 1);
    output.write(1, 1);
    output.write(2, 0b00);
}
