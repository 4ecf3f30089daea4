//! Frame orchestration and output assembly.
//!
//! [`FrameState::prepare`] samples the image, builds the four prefix codes,
//! writes the DC-global section and encodes every 256x256 group through a
//! [`ParallelRunner`]. The frame header and TOC depend on the final section
//! sizes, so they are written separately by [`FrameState::prepare_header`].
//! [`FrameState::write_output`] then streams header and sections into
//! caller-provided buffers, concatenating the per-channel writers of a
//! section at bit granularity.

use std::sync::OnceLock;

use log::{debug, trace};

use crate::bits::BitWriter;
use crate::color::rgb_to_ycocg;
use crate::error::Result;
use crate::parallel::ParallelRunner;
use crate::simd::Kernel;

use super::chunk::{
    ChannelRows, ChunkEncoder, ChunkSink, RowProcessor, SampleCollector, CHUNK_SIZE,
};
use super::depth::{BitDepth, Exactly14Bits, From9To13Bits, MoreThan14Bits, UpTo8Bits};
use super::header::{
    write_dc_global, write_dc_global_palette, write_frame_header, write_group_header,
    write_image_header, write_toc,
};
use super::hybrid::{encode_hybrid_uint_000, pack_signed};
use super::palette::{pack_pixel, Palette};
use super::prefix::{PrefixCode, NUM_LZ77, NUM_RAW_SYMBOLS};
use super::JxlOptions;

/// Side of a group in pixels.
const GROUP_DIM: usize = 256;

/// Side of a DC group in pixels.
const DC_GROUP_DIM: usize = 2048;

/// Prior token counts added to the sampled histograms.
const BASE_RAW_COUNTS: [u64; NUM_RAW_SYMBOLS] = [
    3843, 852, 1270, 1214, 1014, 727, 481, 300, 159, 51, 5, 1, 1, 1, 1, 1, 1, 1, 1,
];

const BASE_LZ77_COUNTS: [u64; NUM_LZ77] = [
    29, 27, 25, 23, 21, 21, 19, 18, 21, 17, 16, 15, 15, 14, 13, 13, 137, 98, 61, 34, 1, 1, 1, 1,
    1, 1, 1, 1, 0, 0, 0, 0, 0,
];

/// Bytes kept free at the end of an output slice while copying.
const OUTPUT_TAIL: usize = 8;

/// Smallest slice [`FrameState::write_output`] accepts.
const MIN_OUTPUT_CHUNK: usize = 32;

/// Borrowed input pixels.
#[derive(Clone, Copy)]
struct Image<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
    big_endian: bool,
}

impl<'a> Image<'a> {
    /// Bytes of `xs` pixels of row `y` starting at column `x0`.
    #[inline]
    fn row(&self, y: usize, x0: usize, xs: usize, input_bytes: usize) -> &'a [u8] {
        let pixel_bytes = self.channels * input_bytes;
        let start = y * self.stride + x0 * pixel_bytes;
        &self.data[start..start + xs * pixel_bytes]
    }
}

/// Rectangle of rows processed together. Rows before `yskip` only serve as
/// the top neighbours of the first processed row.
#[derive(Debug, Clone, Copy)]
struct Area {
    x0: usize,
    y0: usize,
    xs: usize,
    ys: usize,
    yskip: usize,
}

/// Read sample `i` of a row.
#[inline]
fn load_sample(bytes: &[u8], i: usize, input_bytes: usize, big_endian: bool) -> i32 {
    if input_bytes == 1 {
        i32::from(bytes[i])
    } else {
        let pair = [bytes[2 * i], bytes[2 * i + 1]];
        i32::from(if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        })
    }
}

/// Convert one input row into the channel buffers, applying YCoCg to colour
/// images.
fn fill_row(
    input: &[u8],
    xs: usize,
    input_bytes: usize,
    big_endian: bool,
    y: usize,
    rows: &mut [ChannelRows],
) {
    let s = |i: usize| load_sample(input, i, input_bytes, big_endian);
    match rows {
        [gray] => {
            let gray = gray.row_mut(y);
            for (x, v) in gray[..xs].iter_mut().enumerate() {
                *v = s(x);
            }
        }
        [gray, alpha] => {
            let gray = gray.row_mut(y);
            let alpha = alpha.row_mut(y);
            for x in 0..xs {
                gray[x] = s(2 * x);
                alpha[x] = s(2 * x + 1);
            }
        }
        [luma, co, cg] => {
            let (luma, co, cg) = (luma.row_mut(y), co.row_mut(y), cg.row_mut(y));
            for x in 0..xs {
                (luma[x], co[x], cg[x]) = rgb_to_ycocg(s(3 * x), s(3 * x + 1), s(3 * x + 2));
            }
        }
        [luma, co, cg, alpha] => {
            let (luma, co, cg) = (luma.row_mut(y), co.row_mut(y), cg.row_mut(y));
            let alpha = alpha.row_mut(y);
            for x in 0..xs {
                (luma[x], co[x], cg[x]) = rgb_to_ycocg(s(4 * x), s(4 * x + 1), s(4 * x + 2));
                alpha[x] = s(4 * x + 3);
            }
        }
        _ => unreachable!("1 to 4 channels"),
    }
}

/// Feed the channels of `area` to one processor each, then finalize them.
fn process_image_area<D: BitDepth, S: ChunkSink>(
    image: &Image<'_>,
    area: Area,
    processors: Vec<RowProcessor<S>>,
) {
    let mut processors = processors;
    let mut rows: Vec<ChannelRows> = (0..image.channels)
        .map(|_| ChannelRows::new(GROUP_DIM))
        .collect();

    for y in 0..area.ys {
        let input = image.row(area.y0 + y, area.x0, area.xs, D::INPUT_BYTES);
        fill_row(input, area.xs, D::INPUT_BYTES, image.big_endian, y, &mut rows);
        for channel in rows.iter_mut() {
            channel.fix_edges(y);
        }
        if y < area.yskip {
            continue;
        }
        for (channel, processor) in rows.iter().zip(processors.iter_mut()) {
            channel.process(y, processor, area.xs);
        }
    }
    for processor in processors {
        processor.finalize();
    }
}

/// Feed the palette indices of `area` to a single processor.
fn process_palette_area<S: ChunkSink>(
    image: &Image<'_>,
    area: Area,
    palette: &Palette,
    mut processor: RowProcessor<S>,
) {
    let mut rows = ChannelRows::new(GROUP_DIM);
    for y in 0..area.ys {
        let input = image.row(area.y0 + y, area.x0, area.xs, 1);
        let indices = rows.row_mut(y);
        for (index, px) in indices.iter_mut().zip(input.chunks_exact(image.channels)) {
            *index = palette.index_of(pack_pixel(px)) as i32;
        }
        rows.fix_edges(y);
        if y >= area.yskip {
            rows.process(y, &mut processor, area.xs);
        }
    }
    processor.finalize();
}

/// Token histograms for the four codes.
struct Histograms {
    raw: [[u64; NUM_RAW_SYMBOLS]; 4],
    lz77: [[u64; NUM_LZ77]; 4],
}

impl Histograms {
    fn new() -> Self {
        Self {
            raw: [[0; NUM_RAW_SYMBOLS]; 4],
            lz77: [[0; NUM_LZ77]; 4],
        }
    }

    /// Processors counting into codes `first..first + n`.
    fn collectors(
        &mut self,
        first: usize,
        n: usize,
        kernel: Kernel,
    ) -> Vec<RowProcessor<SampleCollector<'_>>> {
        self.raw
            .iter_mut()
            .zip(self.lz77.iter_mut())
            .skip(first)
            .take(n)
            .map(|(raw, lz77)| RowProcessor::new(SampleCollector::new(raw, lz77), kernel))
            .collect()
    }
}

/// Geometry of the group grid.
#[derive(Debug, Clone, Copy)]
struct GroupGrid {
    groups_x: usize,
    groups_y: usize,
    dc_groups: usize,
}

impl GroupGrid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            groups_x: width.div_ceil(GROUP_DIM),
            groups_y: height.div_ceil(GROUP_DIM),
            dc_groups: width.div_ceil(DC_GROUP_DIM) * height.div_ceil(DC_GROUP_DIM),
        }
    }

    fn num_groups(&self) -> usize {
        self.groups_x * self.groups_y
    }

    fn is_single_group(&self) -> bool {
        self.num_groups() == 1
    }

    /// Sections in the TOC.
    fn num_sections(&self) -> usize {
        if self.is_single_group() {
            1
        } else {
            2 + self.dc_groups + self.num_groups()
        }
    }

    /// Section holding group `g`.
    fn section_of(&self, g: usize) -> usize {
        if self.is_single_group() {
            0
        } else {
            2 + self.dc_groups + g
        }
    }

    /// Origin and size of group `g`.
    fn group_rect(&self, g: usize, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let x0 = (g % self.groups_x) * GROUP_DIM;
        let y0 = (g / self.groups_x) * GROUP_DIM;
        (x0, y0, (width - x0).min(GROUP_DIM), (height - y0).min(GROUP_DIM))
    }
}

/// Rows of group `g` sampled for the histograms: the middle `2 * effort`
/// rows (scaled for short groups) over a chunk-aligned width.
fn sample_area(grid: &GroupGrid, g: usize, width: usize, height: usize, effort: usize) -> Area {
    let (x0, y_offset, xs, y_max) = grid.group_rect(g, width, height);
    let y_begin = y_offset + y_max.saturating_sub(2 * effort) / 2;
    let y_count = (2 * effort * y_max / GROUP_DIM).min(y_offset + y_max - y_begin - 1);
    Area {
        x0,
        y0: y_begin,
        xs: xs / CHUNK_SIZE * CHUNK_SIZE,
        ys: 1 + y_count,
        yskip: 1,
    }
}

/// Encode one group of directly coded channels into `output`.
fn write_ac_section<D: BitDepth>(
    image: &Image<'_>,
    area: Area,
    is_single_group: bool,
    codes: &[PrefixCode; 4],
    kernel: Kernel,
    output: &mut [BitWriter; 4],
) {
    for (c, writer) in output.iter_mut().enumerate().take(image.channels) {
        // Channel 0 of a single group continues the DC-global writer.
        if is_single_group && c == 0 {
            continue;
        }
        writer.allocate(area.xs * area.ys * D::MAX_ENCODED_BITS_PER_SAMPLE + 4);
    }
    if !is_single_group {
        write_group_header(&mut output[0]);
    }

    let processors = output
        .iter_mut()
        .zip(codes)
        .take(image.channels)
        .map(|(writer, code)| RowProcessor::new(ChunkEncoder::<D>::new(code, writer, kernel), kernel))
        .collect();
    process_image_area::<D, _>(image, area, processors);
}

/// Encode the palette indices of one group into `output`.
fn write_ac_section_palette(
    image: &Image<'_>,
    area: Area,
    is_single_group: bool,
    codes: &[PrefixCode; 4],
    palette: &Palette,
    kernel: Kernel,
    output: &mut BitWriter,
) {
    if !is_single_group {
        output.allocate(16 * area.xs * area.ys + 4);
        write_group_header(output);
    }
    // In a single group the palette itself is channel 0.
    let code = &codes[usize::from(is_single_group)];
    let processor = RowProcessor::new(ChunkEncoder::<UpTo8Bits>::new(code, output, kernel), kernel);
    process_palette_area(image, area, palette, processor);
}

/// Encoder state between preparing a frame and pulling its bytes.
pub struct FrameState {
    width: usize,
    height: usize,
    channels: usize,
    bitdepth: usize,
    kernel: Kernel,
    palette: Option<Palette>,
    header: Option<BitWriter>,
    /// Per-section writers, one per channel.
    group_data: Vec<[BitWriter; 4]>,
    cursor: OutputCursor,
}

impl std::fmt::Debug for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameState")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bitdepth", &self.bitdepth)
            .field("kernel", &self.kernel)
            .field("palette_colors", &self.palette.as_ref().map(Palette::len))
            .field("sections", &self.group_data.len())
            .finish()
    }
}

impl FrameState {
    /// Validate the input, then encode all sections of one frame.
    pub fn prepare<R: ParallelRunner + ?Sized>(
        data: &[u8],
        options: &JxlOptions,
        runner: &R,
    ) -> Result<FrameState> {
        let stride = options.validate(data.len())?;
        let image = Image {
            data,
            width: options.width as usize,
            height: options.height as usize,
            stride,
            channels: options.color_type.channels(),
            big_endian: options.big_endian,
        };
        let effort = usize::from(options.effort);
        let kernel = options.kernel.unwrap_or_else(Kernel::detect);
        let bitdepth = usize::from(options.bit_depth);

        let state = match bitdepth {
            1..=8 => encode_frame(&image, UpTo8Bits::new(bitdepth), effort, kernel, runner),
            9..=13 => encode_frame(&image, From9To13Bits::new(bitdepth), effort, kernel, runner),
            14 => encode_frame(&image, Exactly14Bits, effort, kernel, runner),
            _ => encode_frame(&image, MoreThan14Bits::new(bitdepth), effort, kernel, runner),
        };
        debug!(
            "encoded {}x{} frame: {} sections, {} bytes before headers",
            state.width,
            state.height,
            state.group_data.len(),
            state.sections_size()
        );
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn bit_depth(&self) -> usize {
        self.bitdepth
    }

    /// Kernel the frame was encoded with.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// The palette, when the image was palette coded.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Number of TOC sections.
    pub fn num_sections(&self) -> usize {
        self.group_data.len()
    }

    /// Byte size of each section, channel writers concatenated and padded.
    fn section_sizes(&self) -> Vec<usize> {
        self.group_data
            .iter()
            .map(|writers| {
                let bits: usize = writers[..self.channels].iter().map(BitWriter::bit_len).sum();
                bits.div_ceil(8)
            })
            .collect()
    }

    fn sections_size(&self) -> usize {
        self.section_sizes().iter().sum()
    }

    /// Write the frame header and TOC, optionally preceded by the image
    /// header. Must be called before [`FrameState::write_output`].
    pub fn prepare_header(&mut self, add_image_header: bool, is_last: bool) {
        let sizes = self.section_sizes();
        let mut header = BitWriter::with_capacity_bits(1000 + sizes.len() * 32);
        if add_image_header {
            write_image_header(
                &mut header,
                self.width,
                self.height,
                self.bitdepth,
                self.channels,
            );
        }
        write_frame_header(&mut header, self.channels, is_last);
        write_toc(&mut header, &sizes);
        trace!("header: {} bytes, toc {:?}", header.bytes_written(), sizes);
        self.header = Some(header);
        self.cursor = OutputCursor::default();
    }

    /// Exact number of bytes [`FrameState::write_output`] produces in total
    /// once the header is prepared.
    pub fn output_size(&self) -> usize {
        let header = match &self.header {
            Some(header) => header.bytes_written(),
            None => (1000 + self.group_data.len() * 32) / 8,
        };
        header + self.sections_size()
    }

    /// A buffer of this size receives the whole frame in one call.
    pub fn max_required_output(&self) -> usize {
        self.output_size() + MIN_OUTPUT_CHUNK
    }

    /// Copy the next bytes of the frame into `output`, returning how many
    /// were written. Returns 0 once everything has been written.
    ///
    /// # Panics
    ///
    /// Panics if `output` is shorter than 32 bytes or the header has not
    /// been prepared.
    pub fn write_output(&mut self, output: &mut [u8]) -> usize {
        assert!(
            output.len() >= MIN_OUTPUT_CHUNK,
            "output chunk of {} bytes, need at least {MIN_OUTPUT_CHUNK}",
            output.len()
        );
        let Some(header) = self.header.as_ref() else {
            panic!("prepare_header must be called before write_output");
        };

        let nbc = self.channels;
        let num_writers = 1 + self.group_data.len() * nbc;
        let cursor = &mut self.cursor;
        let mut pos = 0;

        loop {
            if cursor.writer >= num_writers || output.len() - pos <= OUTPUT_TAIL {
                return pos;
            }
            let writer = if cursor.writer == 0 {
                header
            } else {
                let index = cursor.writer - 1;
                &self.group_data[index / nbc][index % nbc]
            };

            let full = (output.len() - pos - OUTPUT_TAIL).min(writer.bytes_written() - cursor.byte_pos);
            let src = &writer.bytes()[cursor.byte_pos..cursor.byte_pos + full];
            let dst = &mut output[pos..pos + full];
            if cursor.bits_in_buffer == 0 {
                dst.copy_from_slice(src);
            } else {
                cursor.append_shifted(src, dst);
            }
            pos += full;
            cursor.byte_pos += full;

            if cursor.byte_pos == writer.bytes_written() {
                if writer.bits_in_buffer() != 0 {
                    pos += cursor.add_bits(writer.bits_in_buffer(), writer.buffer(), &mut output[pos..]);
                }
                cursor.byte_pos = 0;
                cursor.writer += 1;
                // Sections start on a byte boundary.
                if (cursor.writer - 1) % nbc == 0 && cursor.bits_in_buffer != 0 {
                    let pad = 8 - cursor.bits_in_buffer;
                    pos += cursor.add_bits(pad, 0, &mut output[pos..]);
                }
            }
        }
    }
}

/// Position of the output stream and the bits not yet flushed to bytes.
#[derive(Debug, Default, Clone, Copy)]
struct OutputCursor {
    /// 0 is the header, `1 + section * channels + c` the section writers.
    writer: usize,
    byte_pos: usize,
    bits_in_buffer: usize,
    bit_buffer: u64,
}

impl OutputCursor {
    /// Append up to 8 bits, storing only the bytes completed.
    #[inline]
    fn add_bits(&mut self, count: usize, bits: u64, output: &mut [u8]) -> usize {
        self.bit_buffer |= bits << self.bits_in_buffer;
        self.bits_in_buffer += count;
        let bytes = self.bits_in_buffer / 8;
        output[..bytes].copy_from_slice(&self.bit_buffer.to_le_bytes()[..bytes]);
        self.bits_in_buffer -= bytes * 8;
        self.bit_buffer = self.bit_buffer.checked_shr((bytes * 8) as u32).unwrap_or(0);
        bytes
    }

    /// Copy whole bytes while a partial byte is pending.
    fn append_shifted(&mut self, src: &[u8], dst: &mut [u8]) {
        let shift = self.bits_in_buffer;
        debug_assert!(shift > 0 && shift < 8);
        let mut i = 0;
        while i + 8 < src.len() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&src[i..i + 8]);
            let chunk = u64::from_le_bytes(word);
            let out = self.bit_buffer | (chunk << shift);
            dst[i..i + 8].copy_from_slice(&out.to_le_bytes());
            self.bit_buffer = chunk >> (64 - shift);
            i += 8;
        }
        for (j, &byte) in src.iter().enumerate().skip(i) {
            self.add_bits(8, u64::from(byte), &mut dst[j..]);
        }
    }
}

/// Sample, build codes and encode every section for one depth class.
fn encode_frame<D: BitDepth, R: ParallelRunner + ?Sized>(
    image: &Image<'_>,
    depth: D,
    effort: usize,
    kernel: Kernel,
    runner: &R,
) -> FrameState {
    let (width, height, channels) = (image.width, image.height, image.channels);
    let bitdepth = depth.bitdepth();

    let palette = if effort >= 2 && bitdepth == 8 {
        Palette::detect(image.data, width, height, image.stride, channels)
    } else {
        None
    };

    let grid = GroupGrid::new(width, height);
    let single = grid.is_single_group();
    debug!(
        "{}x{} {}-bit x{}: {} class, {} groups, kernel {:?}, palette {}",
        width,
        height,
        bitdepth,
        channels,
        std::any::type_name::<D>().rsplit("::").next().unwrap_or_default(),
        grid.num_groups(),
        kernel.kind(),
        palette
            .as_ref()
            .map_or_else(|| "off".to_string(), |p| format!("{} colours", p.len())),
    );

    let mut histograms = Histograms::new();
    for g in 0..grid.num_groups() {
        let area = sample_area(&grid, g, width, height, effort);
        if area.xs == 0 {
            continue;
        }
        match &palette {
            Some(palette) => {
                let first = usize::from(single);
                let mut collectors = histograms.collectors(first, 1, kernel);
                if let Some(collector) = collectors.pop() {
                    process_palette_area(image, area, palette, collector);
                }
            }
            None => {
                let collectors = histograms.collectors(0, channels, kernel);
                process_image_area::<D, _>(image, area, collectors);
            }
        }
    }
    if let Some(palette) = &palette {
        count_palette_tokens(palette, kernel, &mut histograms);
    }
    trace!("sampled raw histograms: {:?}", histograms.raw);

    let doing_ycocg = channels > 2 && palette.is_none();
    let mut base_raw = BASE_RAW_COUNTS;
    base_raw[depth.num_symbols(doing_ycocg)..].fill(0);
    for (raw, lz77) in histograms.raw.iter_mut().zip(histograms.lz77.iter_mut()) {
        for (count, base) in raw.iter_mut().zip(base_raw) {
            *count = (*count << 8) + base;
        }
        for (count, base) in lz77.iter_mut().zip(BASE_LZ77_COUNTS) {
            *count = (*count << 8) + base;
        }
    }

    if let Some(palette) = &palette {
        let token = encode_hybrid_uint_000(pack_signed(palette.len() as i32 - 1)).token as usize;
        // Every index residual must have a code.
        let index_code = usize::from(single);
        for count in &mut histograms.raw[index_code][..=token] {
            *count = (*count).max(1);
        }
        for count in &mut histograms.raw[0][..=token] {
            *count = (*count).max(1);
        }
        // Only the palette rows use these.
        for count in histograms.raw[0].iter_mut().take(10).skip(token + 1) {
            *count = (*count).max(1);
        }
    }

    let codes: [PrefixCode; 4] =
        std::array::from_fn(|i| PrefixCode::new::<D>(&histograms.raw[i], &histograms.lz77[i]));

    let mut group_data: Vec<[BitWriter; 4]> = (0..grid.num_sections())
        .map(|_| <[BitWriter; 4]>::default())
        .collect();

    let pcolors = palette.as_ref().map_or(0, Palette::len);
    let dc_global = &mut group_data[0][0];
    dc_global.allocate(
        100_000
            + pcolors * channels * 16
            + if single {
                width * height * D::MAX_ENCODED_BITS_PER_SAMPLE
            } else {
                0
            },
    );
    match &palette {
        Some(palette) => write_dc_global_palette(dc_global, &codes, palette, kernel, single),
        None => write_dc_global(dc_global, channels, &codes, single),
    }
    trace!("DC global: {} bits", dc_global.bit_len());

    let encode_group = |g: usize, output: &mut [BitWriter; 4]| {
        let (x0, y0, xs, ys) = grid.group_rect(g, width, height);
        let area = Area {
            x0,
            y0,
            xs,
            ys,
            yskip: 0,
        };
        match &palette {
            Some(palette) => write_ac_section_palette(
                image,
                area,
                single,
                &codes,
                palette,
                kernel,
                &mut output[0],
            ),
            None => write_ac_section::<D>(image, area, single, &codes, kernel, output),
        }
    };

    if single {
        encode_group(0, &mut group_data[0]);
    } else {
        let slots: Vec<OnceLock<[BitWriter; 4]>> =
            (0..grid.num_groups()).map(|_| OnceLock::new()).collect();
        runner.run(grid.num_groups(), &|g| {
            let mut output = <[BitWriter; 4]>::default();
            encode_group(g, &mut output);
            let _ = slots[g].set(output);
        });
        for (g, slot) in slots.into_iter().enumerate() {
            let output = slot
                .into_inner()
                .unwrap_or_else(|| panic!("parallel runner skipped group {g}"));
            trace!(
                "group {g}: {} bits",
                output.iter().map(BitWriter::bit_len).sum::<usize>()
            );
            group_data[grid.section_of(g)] = output;
        }
    }

    FrameState {
        width,
        height,
        channels,
        bitdepth,
        kernel,
        palette,
        header: None,
        group_data,
        cursor: OutputCursor::default(),
    }
}

/// Count the tokens of the palette rows into the first code.
fn count_palette_tokens(palette: &Palette, kernel: Kernel, histograms: &mut Histograms) {
    let pcolors = palette.len();
    let mut rows = ChannelRows::new(pcolors);
    let mut collectors = histograms.collectors(0, 1, kernel);
    let Some(mut processor) = collectors.pop() else {
        return;
    };
    for c in 0..palette.channels() {
        for (i, sample) in rows.row_mut(c)[..pcolors].iter_mut().enumerate() {
            *sample = i32::from(palette.component(i, c));
        }
        rows.fix_edges(c);
        rows.process(c, &mut processor, pcolors);
    }
    processor.finalize();
}
