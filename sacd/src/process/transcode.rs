//! DSD stream transcoding for stereo sources.
//!
//! ## Source layouts
//!
//! - **DFF / SACD**: byte interleaved, MSB first (`L0 R0 L1 R1 ...`)
//! - **DSF**: per-channel blocks (4096 bytes by default), usually LSB first
//!
//! ## Output modes
//!
//! - **Native**: 4 bytes of left channel followed by 4 bytes of right
//!   channel, MSB first (32-bit big-endian DSD words per channel)
//! - **DoP**: DSD over PCM. Every 16 DSD bits of a channel become one 24-bit
//!   sample whose top byte is a marker alternating between `0x05` and
//!   `0xFA`. Samples are written as little-endian 32-bit words, so the
//!   output is twice the size of the input.

use anyhow::{Result, bail, ensure};
use log::debug;

use crate::structs::container::DSF_BLOCK_SIZE;
use crate::utils::bit_reverse::reverse_bits;
use crate::utils::errors::TranscodeError;

pub const DOP_MARKER_1: u8 = 0x05;
pub const DOP_MARKER_2: u8 = 0xFA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    Dff,
    Dsf {
        lsb_first: bool,
        block_size_per_channel: usize,
    },
    /// Raw DSD audio from SACD sectors, laid out like DFF.
    Sacd,
}

impl SourceLayout {
    pub fn dsf(lsb_first: bool) -> Self {
        SourceLayout::Dsf {
            lsb_first,
            block_size_per_channel: DSF_BLOCK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Native,
    Dop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub source: SourceLayout,
    pub mode: OutputMode,
}

impl StreamFormat {
    pub fn new(source: SourceLayout, mode: OutputMode) -> Self {
        Self { source, mode }
    }

    /// Smallest input unit that can be transcoded on its own.
    pub fn granule(&self) -> usize {
        match (self.source, self.mode) {
            (SourceLayout::Dsf {
                block_size_per_channel,
                ..
            }, _) => block_size_per_channel * 2,
            (_, OutputMode::Native) => 8,
            (_, OutputMode::Dop) => 4,
        }
    }

    pub fn output_len(&self, input_len: usize) -> usize {
        match self.mode {
            OutputMode::Native => input_len,
            OutputMode::Dop => input_len * 2,
        }
    }

    /// Output sample rate for a DSD rate: DoP frames carry 16 bits per
    /// channel, native words carry 32.
    pub fn output_rate(&self, dsd_rate: u32) -> u32 {
        match self.mode {
            OutputMode::Native => dsd_rate / 32,
            OutputMode::Dop => dsd_rate / 16,
        }
    }
}

fn check_destination(needed: usize, dst: &[u8]) -> Result<()> {
    if dst.len() < needed {
        bail!(TranscodeError::DestinationTooSmall {
            needed,
            available: dst.len(),
        });
    }
    Ok(())
}

#[inline(always)]
fn dop_word(marker: u8, first: u8, second: u8) -> [u8; 4] {
    [0x00, second, first, marker]
}

/// Regroups byte interleaved stereo into 4+4 byte channel words.
/// Trailing bytes that do not fill an 8 byte group are ignored.
pub fn dff_to_native(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let len = src.len() - src.len() % 8;
    check_destination(len, dst)?;

    for (s, d) in src[..len].chunks_exact(8).zip(dst.chunks_exact_mut(8)) {
        d.copy_from_slice(&[s[0], s[2], s[4], s[6], s[1], s[3], s[5], s[7]]);
    }

    Ok(len)
}

/// Byte interleaved stereo to DoP. `marker` carries the alternation across
/// calls and must start at [`DOP_MARKER_1`].
pub fn dff_to_dop(src: &[u8], dst: &mut [u8], marker: &mut u8) -> Result<usize> {
    let len = src.len() - src.len() % 4;
    check_destination(len * 2, dst)?;

    for (s, d) in src[..len].chunks_exact(4).zip(dst.chunks_exact_mut(8)) {
        d[..4].copy_from_slice(&dop_word(*marker, s[0], s[2]));
        d[4..].copy_from_slice(&dop_word(*marker, s[1], s[3]));
        *marker ^= 0xFF;
    }

    Ok(len * 2)
}

fn check_block_size(block_size: usize) -> Result<()> {
    ensure!(
        block_size != 0 && block_size % 4 == 0,
        TranscodeError::InvalidBlockSize(block_size)
    );
    Ok(())
}

/// DSF stereo blocks to 4+4 byte channel words. Only whole stereo blocks
/// (`2 * block_size` bytes) are converted.
pub fn dsf_to_native(
    src: &[u8],
    dst: &mut [u8],
    lsb_first: bool,
    block_size: usize,
) -> Result<usize> {
    check_block_size(block_size)?;
    let stereo_block = block_size * 2;
    let len = src.len() - src.len() % stereo_block;
    check_destination(len, dst)?;

    let map = |b: u8| if lsb_first { reverse_bits(b) } else { b };

    for (block, out) in src[..len]
        .chunks_exact(stereo_block)
        .zip(dst.chunks_exact_mut(stereo_block))
    {
        let (left, right) = block.split_at(block_size);
        for ((l, r), d) in left
            .chunks_exact(4)
            .zip(right.chunks_exact(4))
            .zip(out.chunks_exact_mut(8))
        {
            d[0] = map(l[0]);
            d[1] = map(l[1]);
            d[2] = map(l[2]);
            d[3] = map(l[3]);
            d[4] = map(r[0]);
            d[5] = map(r[1]);
            d[6] = map(r[2]);
            d[7] = map(r[3]);
        }
    }

    Ok(len)
}

/// DSF stereo blocks to DoP.
pub fn dsf_to_dop(
    src: &[u8],
    dst: &mut [u8],
    lsb_first: bool,
    block_size: usize,
    marker: &mut u8,
) -> Result<usize> {
    check_block_size(block_size)?;
    let stereo_block = block_size * 2;
    let len = src.len() - src.len() % stereo_block;
    check_destination(len * 2, dst)?;

    let map = |b: u8| if lsb_first { reverse_bits(b) } else { b };

    for (block, out) in src[..len]
        .chunks_exact(stereo_block)
        .zip(dst.chunks_exact_mut(stereo_block * 2))
    {
        let (left, right) = block.split_at(block_size);
        for ((l, r), d) in left
            .chunks_exact(2)
            .zip(right.chunks_exact(2))
            .zip(out.chunks_exact_mut(8))
        {
            d[..4].copy_from_slice(&dop_word(*marker, map(l[0]), map(l[1])));
            d[4..].copy_from_slice(&dop_word(*marker, map(r[0]), map(r[1])));
            *marker ^= 0xFF;
        }
    }

    Ok(len * 2)
}

/// Stateful transcoder for one stream.
///
/// Keeps the DoP marker phase between calls and carries input bytes that do
/// not fill a whole granule over to the next [`Transcoder::push`].
#[derive(Debug)]
pub struct Transcoder {
    format: StreamFormat,
    marker: u8,
    carry: Vec<u8>,
    out: Vec<u8>,
}

impl Transcoder {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            format,
            marker: DOP_MARKER_1,
            carry: Vec::new(),
            out: Vec::new(),
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Transcodes `src` into `dst` and returns the number of bytes written.
    /// Bytes beyond the last whole granule are ignored.
    pub fn transcode(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        match (self.format.source, self.format.mode) {
            (SourceLayout::Dff | SourceLayout::Sacd, OutputMode::Native) => dff_to_native(src, dst),
            (SourceLayout::Dff | SourceLayout::Sacd, OutputMode::Dop) => {
                dff_to_dop(src, dst, &mut self.marker)
            }
            (
                SourceLayout::Dsf {
                    lsb_first,
                    block_size_per_channel,
                },
                OutputMode::Native,
            ) => dsf_to_native(src, dst, lsb_first, block_size_per_channel),
            (
                SourceLayout::Dsf {
                    lsb_first,
                    block_size_per_channel,
                },
                OutputMode::Dop,
            ) => dsf_to_dop(src, dst, lsb_first, block_size_per_channel, &mut self.marker),
        }
    }

    /// Transcodes `src` after any carried-over bytes and hands the result to
    /// `sink` in one call. Returns the number of bytes delivered.
    pub fn push(&mut self, src: &[u8], sink: &mut dyn FnMut(&[u8])) -> Result<usize> {
        if let SourceLayout::Dsf {
            block_size_per_channel,
            ..
        } = self.format.source
        {
            check_block_size(block_size_per_channel)?;
        }
        let granule = self.format.granule();

        let mut input = std::mem::take(&mut self.carry);
        input.extend_from_slice(src);
        let usable = input.len() - input.len() % granule;

        let mut out = std::mem::take(&mut self.out);
        out.resize(self.format.output_len(usable), 0);
        let written = self.transcode(&input[..usable], &mut out);

        input.drain(..usable);
        self.carry = input;

        let written = match written {
            Ok(n) => n,
            Err(e) => {
                self.out = out;
                return Err(e);
            }
        };

        if written > 0 {
            sink(&out[..written]);
        }
        self.out = out;

        Ok(written)
    }

    /// Discards carried bytes that never completed a granule.
    pub fn flush(&mut self) {
        if !self.carry.is_empty() {
            debug!("Dropping {} trailing DSD bytes", self.carry.len());
            self.carry.clear();
        }
    }

    /// Restarts the DoP marker sequence and drops carried bytes.
    pub fn reset(&mut self) {
        self.carry.clear();
        self.marker = DOP_MARKER_1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    fn native_to_dff(src: &[u8]) -> Vec<u8> {
        let mut out = vec![0; src.len()];
        for (s, d) in src.chunks_exact(8).zip(out.chunks_exact_mut(8)) {
            for k in 0..4 {
                d[2 * k] = s[k];
                d[2 * k + 1] = s[4 + k];
            }
        }
        out
    }

    #[test]
    fn test_dff_native_inverse() -> Result<()> {
        for len in [8, 64, 4704] {
            let src = ramp(len);
            let mut dst = vec![0; len];
            assert_eq!(dff_to_native(&src, &mut dst)?, len);
            assert_eq!(native_to_dff(&dst), src);
        }
        Ok(())
    }

    #[test]
    fn test_dff_native_layout() -> Result<()> {
        let src = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut dst = [0u8; 8];
        assert_eq!(dff_to_native(&src, &mut dst)?, 8);
        assert_eq!(dst, [0, 2, 4, 6, 1, 3, 5, 7]);
        Ok(())
    }

    #[test]
    fn test_dff_dop_markers() -> Result<()> {
        let src = ramp(32);
        let mut dst = vec![0; 64];
        let mut marker = DOP_MARKER_1;
        assert_eq!(dff_to_dop(&src, &mut dst, &mut marker)?, 64);

        let markers: Vec<u8> = dst.chunks_exact(4).map(|w| w[3]).collect();
        for (i, m) in markers.iter().enumerate() {
            let expected = if (i / 2) % 2 == 0 {
                DOP_MARKER_1
            } else {
                DOP_MARKER_2
            };
            assert_eq!(*m, expected, "word {i}");
        }

        assert_eq!(&dst[..4], &[0x00, src[2], src[0], DOP_MARKER_1]);
        assert_eq!(&dst[4..8], &[0x00, src[3], src[1], DOP_MARKER_1]);
        Ok(())
    }

    #[test]
    fn test_destination_too_small() {
        let src = ramp(16);
        let mut dst = vec![0; 31];
        let mut marker = DOP_MARKER_1;
        assert!(dff_to_dop(&src, &mut dst, &mut marker).is_err());
        assert!(dff_to_native(&src, &mut dst[..15]).is_err());
    }

    #[test]
    fn test_dsf_native() -> Result<()> {
        let block = 8;
        let mut src = vec![0u8; block * 2];
        src[..block].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        src[block..].copy_from_slice(&[0x80, 0x40, 0xC0, 0x20, 0xA0, 0x60, 0xE0, 0x10]);

        let mut dst = vec![0; 16];
        assert_eq!(dsf_to_native(&src, &mut dst, true, block)?, 16);
        assert_eq!(
            dst,
            [
                0x80, 0x40, 0xC0, 0x20, 0x01, 0x02, 0x03, 0x04, 0xA0, 0x60, 0xE0, 0x10, 0x05,
                0x06, 0x07, 0x08
            ]
        );

        let mut plain = vec![0; 16];
        dsf_to_native(&src, &mut plain, false, block)?;
        assert_eq!(&plain[..8], &[0x01, 0x02, 0x03, 0x04, 0x80, 0x40, 0xC0, 0x20]);
        Ok(())
    }

    #[test]
    fn test_dsf_dop() -> Result<()> {
        let src = ramp(2 * DSF_BLOCK_SIZE);
        let mut dst = vec![0; 4 * DSF_BLOCK_SIZE];
        let mut marker = DOP_MARKER_1;
        let n = dsf_to_dop(&src, &mut dst, true, DSF_BLOCK_SIZE, &mut marker)?;
        assert_eq!(n, 4 * DSF_BLOCK_SIZE);

        let h = DSF_BLOCK_SIZE;
        assert_eq!(
            &dst[..8],
            &[
                0x00,
                reverse_bits(src[1]),
                reverse_bits(src[0]),
                DOP_MARKER_1,
                0x00,
                reverse_bits(src[h + 1]),
                reverse_bits(src[h]),
                DOP_MARKER_1
            ]
        );
        assert_eq!(dst[11], DOP_MARKER_2);
        assert_eq!(dst[15], DOP_MARKER_2);
        assert_eq!(dst[19], DOP_MARKER_1);
        Ok(())
    }

    #[test]
    fn test_transcoder_carries_partial_groups() -> Result<()> {
        let src = ramp(24);
        let mut whole = vec![0; 24];
        dff_to_native(&src, &mut whole)?;

        let mut transcoder = Transcoder::new(StreamFormat::new(SourceLayout::Sacd, OutputMode::Native));
        let mut out = Vec::new();
        let mut calls = 0;
        for part in [&src[..5], &src[5..13], &src[13..]] {
            transcoder.push(part, &mut |b| {
                calls += 1;
                out.extend_from_slice(b);
            })?;
        }

        assert_eq!(out, whole);
        assert_eq!(calls, 2);
        Ok(())
    }

    #[test]
    fn test_transcoder_rejects_bad_block_size() {
        for block_size_per_channel in [0, 6] {
            let mut transcoder = Transcoder::new(StreamFormat::new(
                SourceLayout::Dsf {
                    lsb_first: true,
                    block_size_per_channel,
                },
                OutputMode::Native,
            ));
            let err = transcoder
                .push(&[0x69; 64], &mut |_| panic!("no output expected"))
                .err()
                .expect("invalid block size");
            assert!(matches!(
                err.downcast_ref::<TranscodeError>(),
                Some(TranscodeError::InvalidBlockSize(n)) if *n == block_size_per_channel
            ));
        }
    }

    #[test]
    fn test_transcoder_dop_phase_continues() -> Result<()> {
        let mut transcoder = Transcoder::new(StreamFormat::new(SourceLayout::Dff, OutputMode::Dop));
        let mut out = Vec::new();
        transcoder.push(&ramp(4), &mut |b| out.extend_from_slice(b))?;
        transcoder.push(&ramp(4), &mut |b| out.extend_from_slice(b))?;

        assert_eq!(out.len(), 16);
        assert_eq!(out[3], DOP_MARKER_1);
        assert_eq!(out[11], DOP_MARKER_2);

        transcoder.reset();
        out.clear();
        transcoder.push(&ramp(4), &mut |b| out.extend_from_slice(b))?;
        assert_eq!(out[3], DOP_MARKER_1);
        Ok(())
    }

    #[test]
    fn test_output_rates() {
        let dop = StreamFormat::new(SourceLayout::Sacd, OutputMode::Dop);
        assert_eq!(dop.output_rate(2_822_400), 176_400);
        assert_eq!(dop.granule(), 4);

        let native = StreamFormat::new(SourceLayout::dsf(true), OutputMode::Native);
        assert_eq!(native.output_rate(2_822_400), 88_200);
        assert_eq!(native.granule(), 8192);
    }
}
