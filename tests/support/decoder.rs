//! Minimal reader for the codestreams fjxl writes.
//!
//! Only the subset the encoder emits is understood: a standalone image
//! header, one modular frame with a fixed MA tree, prefix-coded histograms
//! with LZ77 zero runs, and either the YCoCg or the palette transform.
//! Anything else fails an assertion.
#![allow(dead_code)]

/// LSB-first bit reader over a byte slice.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read(&mut self, n: usize) -> u64 {
        let mut v = 0u64;
        for i in 0..n {
            let byte = self.data[(self.pos + i) / 8];
            v |= u64::from((byte >> ((self.pos + i) % 8)) & 1) << i;
        }
        self.pos += n;
        v
    }

    fn peek(&self, n: usize) -> u64 {
        let mut v = 0u64;
        for i in 0..n {
            let Some(byte) = self.data.get((self.pos + i) / 8) else {
                break;
            };
            v |= u64::from((byte >> ((self.pos + i) % 8)) & 1) << i;
        }
        v
    }

    pub fn expect(&mut self, n: usize, value: u64, what: &str) {
        assert_eq!(self.read(n), value, "unexpected {what}");
    }

    pub fn skip_to_byte(&mut self) {
        let pad = (8 - self.pos % 8) % 8;
        assert_eq!(self.read(pad), 0, "non-zero padding");
    }

    pub fn byte_pos(&self) -> usize {
        assert_eq!(self.pos % 8, 0);
        self.pos / 8
    }

    pub fn bit_pos(&self) -> usize {
        self.pos
    }
}

/// Canonical prefix code, decoded one bit at a time.
#[derive(Debug, Clone)]
struct Huffman {
    counts: [u16; 16],
    symbols: Vec<u16>,
    single: Option<u16>,
}

impl Huffman {
    fn from_lengths(lengths: &[u8]) -> Self {
        let mut counts = [0u16; 16];
        for &l in lengths {
            counts[l as usize] += 1;
        }
        counts[0] = 0;
        let mut symbols = Vec::new();
        for len in 1..16u8 {
            for (s, &l) in lengths.iter().enumerate() {
                if l == len {
                    symbols.push(s as u16);
                }
            }
        }
        let single = (symbols.len() == 1).then(|| symbols[0]);
        Self {
            counts,
            symbols,
            single,
        }
    }

    fn decode(&self, br: &mut BitReader<'_>) -> u16 {
        if let Some(symbol) = self.single {
            return symbol;
        }
        let (mut code, mut first, mut index) = (0i32, 0i32, 0i32);
        for len in 1..16 {
            code |= br.read(1) as i32;
            let count = i32::from(self.counts[len]);
            if code - first < count {
                return self.symbols[(index + code - first) as usize];
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        panic!("invalid prefix code");
    }
}

const CODE_LENGTH_ORDER: [usize; 18] = [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Read a Brotli-style prefix code over `alphabet` symbols.
fn read_prefix_code(br: &mut BitReader<'_>, alphabet: usize) -> Huffman {
    let hskip = br.read(2) as usize;
    if hskip == 1 {
        let nsym = br.read(2) as usize + 1;
        let bits = usize::BITS as usize - (alphabet - 1).leading_zeros() as usize;
        let symbols: Vec<usize> = (0..nsym).map(|_| br.read(bits) as usize).collect();
        assert_eq!(nsym, 1, "only single-symbol simple codes are written");
        let mut lengths = vec![0u8; alphabet];
        lengths[symbols[0]] = 1;
        return Huffman::from_lengths(&lengths);
    }

    const LENGTHS: [u8; 16] = [2, 2, 2, 3, 2, 2, 2, 4, 2, 2, 2, 3, 2, 2, 2, 4];
    const VALUES: [u8; 16] = [0, 4, 3, 2, 0, 4, 3, 1, 0, 4, 3, 2, 0, 4, 3, 5];
    let mut cl_lengths = [0u8; 18];
    let mut space = 32i32;
    for &sym in &CODE_LENGTH_ORDER[hskip..] {
        let v = br.peek(4) as usize;
        br.read(LENGTHS[v] as usize);
        let len = VALUES[v];
        cl_lengths[sym] = len;
        if len != 0 {
            space -= 32 >> len;
            if space <= 0 {
                break;
            }
        }
    }
    assert_eq!(space, 0, "incomplete code length code");
    let cl_code = Huffman::from_lengths(&cl_lengths);

    let mut lengths = vec![0u8; alphabet];
    let mut symbol = 0usize;
    let mut prev_len = 8u8;
    let mut repeat = 0usize;
    let mut repeat_len = 0u8;
    let mut space = 32768i32;
    while symbol < alphabet && space > 0 {
        let code_len = cl_code.decode(br) as u8;
        if code_len < 16 {
            repeat = 0;
            lengths[symbol] = code_len;
            symbol += 1;
            if code_len != 0 {
                prev_len = code_len;
                space -= 32768 >> code_len;
            }
        } else {
            let extra_bits = if code_len == 16 { 2 } else { 3 };
            let new_len = if code_len == 16 { prev_len } else { 0 };
            if repeat_len != new_len {
                repeat = 0;
                repeat_len = new_len;
            }
            let old_repeat = repeat;
            if repeat > 0 {
                repeat = (repeat - 2) << extra_bits;
            }
            repeat += br.read(extra_bits) as usize + 3;
            let delta = repeat - old_repeat;
            assert!(symbol + delta <= alphabet, "repeat past the alphabet");
            lengths[symbol..symbol + delta].fill(repeat_len);
            symbol += delta;
            if repeat_len != 0 {
                space -= delta as i32 * (32768 >> repeat_len);
            }
        }
    }
    assert_eq!(space, 0, "incomplete prefix code");
    Huffman::from_lengths(&lengths)
}

/// Hybrid integer with split exponent 0 (config 000).
fn read_uint_000(br: &mut BitReader<'_>, token: u32) -> u32 {
    if token == 0 {
        return 0;
    }
    let n = token - 1;
    (1 << n) | br.read(n as usize) as u32
}

/// Hybrid integer with split exponent 4 (config 400).
fn read_uint_400(br: &mut BitReader<'_>, token: u32) -> u32 {
    if token < 16 {
        return token;
    }
    let n = 4 + token - 16;
    (1 << n) | br.read(n as usize) as u32
}

fn unpack_signed(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

/// Clamped gradient predictor.
fn gradient(left: i32, top: i32, topleft: i32) -> i32 {
    let (lo, hi) = if left < top { (left, top) } else { (top, left) };
    let grad = left.wrapping_add(top).wrapping_sub(topleft);
    if topleft > hi {
        lo
    } else if topleft < lo {
        hi
    } else {
        grad
    }
}

/// Token statistics gathered while decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenStats {
    pub literals: usize,
    pub runs: usize,
    pub run_pixels: usize,
}

/// Entropy decoder for one modular stream: one prefix code per channel
/// slot and an LZ77 window of the last decoded value.
struct SymbolReader<'c> {
    codes: &'c [Huffman],
    last: u32,
    pending: usize,
    stats: TokenStats,
}

impl<'c> SymbolReader<'c> {
    fn new(codes: &'c [Huffman]) -> Self {
        Self {
            codes,
            last: 0,
            pending: 0,
            stats: TokenStats::default(),
        }
    }

    fn next(&mut self, br: &mut BitReader<'_>, code: usize) -> u32 {
        if self.pending > 0 {
            self.pending -= 1;
            self.stats.run_pixels += 1;
            return self.last;
        }
        let symbol = u32::from(self.codes[code].decode(br));
        if symbol >= 224 {
            let length = read_uint_400(br, symbol - 224) as usize + 7;
            self.stats.runs += 1;
            self.pending = length - 1;
            self.stats.run_pixels += 1;
            return self.last;
        }
        self.stats.literals += 1;
        self.last = read_uint_000(br, symbol);
        self.last
    }

    fn finish_channel(&self) {
        assert_eq!(self.pending, 0, "run crosses a channel boundary");
    }
}

/// Decode a `width x height` channel predicted with the gradient.
fn read_channel(
    br: &mut BitReader<'_>,
    reader: &mut SymbolReader<'_>,
    code: usize,
    width: usize,
    height: usize,
) -> Vec<i32> {
    let mut px = vec![0i32; width * height];
    for y in 0..height {
        for x in 0..width {
            let (left, top, topleft) = match (x, y) {
                (0, 0) => (0, 0, 0),
                (_, 0) => {
                    let l = px[x - 1];
                    (l, l, l)
                }
                (0, _) => {
                    let t = px[(y - 1) * width];
                    (t, t, t)
                }
                _ => (
                    px[y * width + x - 1],
                    px[(y - 1) * width + x],
                    px[(y - 1) * width + x - 1],
                ),
            };
            let residual = unpack_signed(reader.next(br, code));
            px[y * width + x] = residual.wrapping_add(gradient(left, top, topleft));
        }
    }
    reader.finish_channel();
    px
}

/// Everything the tests want to know about a decoded codestream.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub bit_depth: usize,
    /// Interleaved samples in input channel order.
    pub samples: Vec<u16>,
    pub palette_colors: Option<usize>,
    pub num_sections: usize,
    pub stats: TokenStats,
}

fn read_size(br: &mut BitReader<'_>) -> usize {
    let selector = br.read(2) as usize;
    br.read([9, 13, 18, 30][selector]) as usize + 1
}

fn read_bits_per_sample(br: &mut BitReader<'_>) -> usize {
    match br.read(2) {
        0 => 8,
        1 => 10,
        2 => 12,
        _ => br.read(6) as usize + 1,
    }
}

fn read_toc_entry(br: &mut BitReader<'_>) -> usize {
    let selector = br.read(2) as usize;
    let n = [10, 14, 22, 30][selector];
    br.read(n) as usize + [0, 1024, 17408, 4_211_712][selector]
}

const TREE_SYMBOLS: [u64; 26] = [
    1, 2, 1, 4, 1, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0, 0, 5, 0, 0, 0,
];
const TREE_SYMBOL_BITS: [u64; 6] = [0b00, 0b10, 0b001, 0b101, 0b0011, 0b0111];
const TREE_SYMBOL_NBITS: [usize; 6] = [2, 2, 3, 3, 4, 4];

/// Shared part of the global section, returning the four channel codes.
fn read_global_codes(br: &mut BitReader<'_>) -> Vec<Huffman> {
    br.expect(1, 1, "default dequantization");
    br.expect(1, 1, "global tree flag");
    br.expect(1, 0, "tree LZ77");
    br.expect(1, 1, "simple tree context map");
    br.expect(2, 0, "tree context map bits");
    br.expect(1, 1, "tree prefix coding");
    br.expect(4, 0, "tree uint config");
    br.expect(6, 0b100011, "tree alphabet");
    br.expect(2, 1, "tree simple code");
    br.expect(2, 3, "tree symbol count");
    for s in 0..4 {
        br.expect(2, s, "tree symbol");
    }
    br.expect(1, 0, "tree shape");
    for &s in &TREE_SYMBOLS {
        let s = s as usize;
        br.expect(TREE_SYMBOL_NBITS[s], TREE_SYMBOL_BITS[s], "tree token");
    }

    br.expect(1, 1, "LZ77 enabled");
    br.expect(2, 0, "LZ77 symbol offset");
    br.expect(4, 0b1010, "LZ77 min length");
    br.expect(4, 4, "LZ77 length config");
    br.expect(3, 0, "LZ77 length msb");
    br.expect(3, 0, "LZ77 length lsb");

    br.expect(1, 1, "simple context map");
    br.expect(2, 3, "context map bits");
    for cluster in [4, 3, 2, 1, 0] {
        br.expect(3, cluster, "context cluster");
    }

    br.expect(1, 1, "prefix codes");
    for _ in 0..5 {
        br.expect(4, 0, "uint config");
    }

    let mut alphabets = Vec::new();
    for _ in 0..5 {
        let size = if br.read(1) == 0 {
            1
        } else {
            let n = br.read(4) as usize;
            1 + (1 << n) + br.read(n) as usize
        };
        alphabets.push(size);
    }
    assert_eq!(alphabets, vec![2, 257, 257, 257, 257]);

    let distance = read_prefix_code(br, alphabets[0]);
    assert_eq!(distance.single, Some(1));
    let codes = (0..4).map(|_| read_prefix_code(br, 257)).collect();

    br.expect(1, 1, "global tree in global stream");
    br.expect(1, 1, "default weighted predictor");
    codes
}

/// Parse a full codestream and undo every transform.
pub fn decode(data: &[u8]) -> Decoded {
    let mut br = BitReader::new(data);
    br.expect(16, 0x0AFF, "signature");
    br.expect(1, 0, "small size flag");
    let height = read_size(&mut br);
    br.expect(3, 0, "aspect ratio");
    let width = read_size(&mut br);

    br.expect(1, 0, "metadata all_default");
    br.expect(1, 0, "extra fields");
    br.expect(1, 0, "float samples");
    let bit_depth = read_bits_per_sample(&mut br);
    assert_eq!(br.read(1), u64::from(bit_depth <= 14), "16-bit buffer flag");
    let have_alpha = match br.read(2) {
        0 => false,
        1 => {
            if br.read(1) == 0 {
                br.expect(2, 0, "alpha channel type");
                br.expect(1, 0, "alpha float");
                assert_eq!(read_bits_per_sample(&mut br), bit_depth);
                br.expect(2, 0, "dim shift");
                br.expect(2, 0, "name");
                br.expect(1, 0, "premultiplied");
            } else {
                assert_eq!(bit_depth, 8, "default alpha is 8-bit");
            }
            true
        }
        n => panic!("unexpected extra channel selector {n}"),
    };
    br.expect(1, 0, "xyb");
    let is_color = if br.read(1) == 1 {
        true
    } else {
        br.expect(1, 0, "icc");
        br.expect(2, 1, "grey colour space");
        br.expect(2, 1, "white point");
        br.expect(1, 0, "gamma");
        br.expect(2, 0b10, "transfer selector");
        br.expect(4, 11, "transfer function");
        br.expect(2, 1, "rendering intent");
        false
    };
    br.expect(2, 0, "metadata extensions");
    br.expect(1, 1, "transform data");
    br.skip_to_byte();

    let channels = usize::from(is_color) * 2 + 1 + usize::from(have_alpha);

    br.expect(1, 0, "frame all_default");
    br.expect(2, 0, "frame type");
    br.expect(1, 1, "modular");
    br.expect(2, 0, "frame flags");
    br.expect(1, 0, "ycbcr");
    br.expect(2, 0, "upsampling");
    if have_alpha {
        br.expect(2, 0, "ec upsampling");
    }
    br.expect(2, 1, "group size shift");
    br.expect(2, 0, "passes");
    br.expect(1, 0, "custom size");
    br.expect(2, 0, "blending");
    if have_alpha {
        br.expect(2, 0, "ec blending");
    }
    if br.read(1) == 0 {
        br.expect(2, 0, "save as reference");
        br.expect(1, 0, "save before colour transform");
    }
    br.expect(2, 0, "frame name");
    br.expect(1, 0, "restoration all_default");
    br.expect(1, 0, "gaborish");
    br.expect(2, 0, "epf");
    br.expect(2, 0, "lf extensions");
    br.expect(2, 0, "frame extensions");
    br.expect(1, 0, "toc permutation");
    br.skip_to_byte();

    let groups_x = width.div_ceil(256);
    let groups_y = height.div_ceil(256);
    let num_groups = groups_x * groups_y;
    let dc_groups = width.div_ceil(2048) * height.div_ceil(2048);
    let single = num_groups == 1;
    let num_sections = if single { 1 } else { 2 + dc_groups + num_groups };

    let sizes: Vec<usize> = (0..num_sections).map(|_| read_toc_entry(&mut br)).collect();
    br.skip_to_byte();
    let mut offsets = Vec::with_capacity(num_sections);
    let mut offset = br.byte_pos();
    for &size in &sizes {
        offsets.push(offset);
        offset += size;
    }
    assert_eq!(offset, data.len(), "sections must fill the codestream");
    let section = |i: usize| &data[offsets[i]..offsets[i] + sizes[i]];
    if !single {
        for (i, &size) in sizes.iter().enumerate().take(2 + dc_groups).skip(1) {
            assert_eq!(size, 0, "section {i} should be empty");
        }
    }

    let mut gr = BitReader::new(section(0));
    let codes = read_global_codes(&mut gr);

    #[derive(Clone, Copy)]
    enum Transform {
        None,
        Ycocg,
        Palette { colors: usize, nb: usize },
    }
    let transform = match gr.read(2) {
        0 => Transform::None,
        1 => match gr.read(2) {
            0 => {
                gr.expect(5, 0, "rct begin");
                gr.expect(2, 0, "rct type");
                Transform::Ycocg
            }
            1 => {
                gr.expect(5, 0, "palette begin");
                let nb = match gr.read(2) {
                    0 => 1,
                    1 => 3,
                    2 => 4,
                    _ => gr.read(13) as usize + 1,
                };
                let colors = match gr.read(2) {
                    0 => gr.read(8) as usize,
                    1 => gr.read(10) as usize + 256,
                    n => panic!("palette size selector {n}"),
                };
                gr.expect(2, 0, "palette deltas");
                gr.expect(4, 0, "palette predictor");
                Transform::Palette { colors, nb }
            }
            n => panic!("unexpected transform {n}"),
        },
        n => panic!("unexpected transform count {n}"),
    };

    let mut stats = TokenStats::default();
    let add = |stats: &mut TokenStats, s: TokenStats| {
        stats.literals += s.literals;
        stats.runs += s.runs;
        stats.run_pixels += s.run_pixels;
    };

    // Decoded stream channels, full size.
    let stream_channels = match transform {
        Transform::Palette { nb, .. } => {
            assert_eq!(nb, channels);
            1
        }
        _ => channels,
    };
    let mut planes = vec![vec![0i32; width * height]; stream_channels];
    let mut meta: Vec<i32> = Vec::new();

    let mut global_reader = SymbolReader::new(&codes);
    let mut next_code = 0;
    if let Transform::Palette { colors, nb } = transform {
        meta = read_channel(&mut gr, &mut global_reader, 0, colors, nb);
        next_code = 1;
    }
    if single {
        for (i, plane) in planes.iter_mut().enumerate() {
            *plane = read_channel(&mut gr, &mut global_reader, next_code + i, width, height);
        }
    }
    add(&mut stats, global_reader.stats);
    if !single {
        gr.skip_to_byte();
    }
    assert!(
        gr.bit_pos().div_ceil(8) == section(0).len(),
        "trailing bytes in the global section"
    );

    if !single {
        for g in 0..num_groups {
            let x0 = (g % groups_x) * 256;
            let y0 = (g / groups_x) * 256;
            let xs = (width - x0).min(256);
            let ys = (height - y0).min(256);
            let bytes = section(2 + dc_groups + g);
            let mut br = BitReader::new(bytes);
            br.expect(1, 1, "group global tree");
            br.expect(1, 1, "group weighted predictor");
            br.expect(2, 0, "group transforms");
            let mut reader = SymbolReader::new(&codes);
            for (c, plane) in planes.iter_mut().enumerate() {
                let px = read_channel(&mut br, &mut reader, c, xs, ys);
                for y in 0..ys {
                    plane[(y0 + y) * width + x0..(y0 + y) * width + x0 + xs]
                        .copy_from_slice(&px[y * xs..(y + 1) * xs]);
                }
            }
            assert_eq!(br.bit_pos().div_ceil(8), bytes.len(), "group {g} size");
            add(&mut stats, reader.stats);
        }
    }

    let mut samples = vec![0u16; width * height * channels];
    let palette_colors = match transform {
        Transform::Palette { colors, .. } => {
            for (i, &index) in planes[0].iter().enumerate() {
                let index = usize::try_from(index).expect("negative palette index");
                assert!(index < colors, "palette index {index} out of range");
                for c in 0..channels {
                    samples[i * channels + c] = meta[c * colors + index] as u16;
                }
            }
            Some(colors)
        }
        Transform::Ycocg => {
            for i in 0..width * height {
                let (y, co, cg) = (planes[0][i], planes[1][i], planes[2][i]);
                let tmp = y - (cg >> 1);
                let g = cg + tmp;
                let b = tmp - (co >> 1);
                let r = b + co;
                samples[i * channels] = r as u16;
                samples[i * channels + 1] = g as u16;
                samples[i * channels + 2] = b as u16;
                if channels == 4 {
                    samples[i * channels + 3] = planes[3][i] as u16;
                }
            }
            None
        }
        Transform::None => {
            for i in 0..width * height {
                for c in 0..channels {
                    samples[i * channels + c] = planes[c][i] as u16;
                }
            }
            None
        }
    };

    Decoded {
        width,
        height,
        channels,
        bit_depth,
        samples,
        palette_colors,
        num_sections,
        stats,
    }
}
