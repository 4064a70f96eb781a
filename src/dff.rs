use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use crate::byteorder::{WriteBytesBe, WriteBytesLe};
use crate::join_bytes_be;
use sacd::structs::container::{DFF_CMPR_DSD, DFF_CMPR_DST};
use sacd::structs::scarlet_book::SACD_FRAME_RATE;
use sacdd_macros::{ToBytes, dff_chunk};

/// DSDIFF 1.5
pub const DFF_VERSION: u32 = 0x0105_0000;

/// Bytes of chunk ID and size preceding every chunk body.
const CHUNK_HEADER_SIZE: u64 = 12;

pub trait DffChunk {
    fn chunk_id(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    /// ID, 64-bit big-endian size, body and a pad byte for odd sizes.
    fn to_bytes(&self) -> Vec<u8> {
        let data = self.chunk_data();
        let mut out = Vec::with_capacity(data.len() + 13);
        out.extend_from_slice(self.chunk_id());
        out.extend_from_slice(&(data.len() as u64).to_be_bytes());
        out.extend_from_slice(&data);
        if data.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

/// Length prefixed string padded to an even total size.
#[derive(Debug, Clone)]
pub struct PString(pub &'static str);

impl WriteBytesBe for PString {
    fn write_be(&self, dst: &mut Vec<u8>) {
        let bytes = &self.0.as_bytes()[..self.0.len().min(255)];
        dst.push(bytes.len() as u8);
        dst.extend_from_slice(bytes);
        if bytes.len() % 2 == 0 {
            dst.push(0);
        }
    }
}

impl WriteBytesLe for PString {
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.write_be(dst);
    }
}

#[derive(Debug, ToBytes)]
#[dff_chunk(b"FVER")]
pub struct FormatVersion {
    pub version: u32,
}

#[derive(Debug, ToBytes)]
#[dff_chunk(b"FS  ")]
pub struct SampleRate {
    pub sample_rate: u32,
}

#[derive(Debug, ToBytes)]
#[dff_chunk(b"CHNL")]
pub struct Channels {
    pub count: u16,
    pub ids: Vec<[u8; 4]>,
}

impl Channels {
    pub fn with_count(count: u16) -> Self {
        let ids = match count {
            2 => vec![*b"SLFT", *b"SRGT"],
            5 => vec![*b"MLFT", *b"MRGT", *b"C   ", *b"LS  ", *b"RS  "],
            6 => vec![*b"MLFT", *b"MRGT", *b"C   ", *b"LFE ", *b"LS  ", *b"RS  "],
            n => (0..n)
                .map(|i| {
                    let id = format!("C{:03}", i % 1000);
                    let mut out = [b' '; 4];
                    out.copy_from_slice(&id.as_bytes()[..4]);
                    out
                })
                .collect(),
        };
        Self { count, ids }
    }
}

#[derive(Debug, ToBytes)]
#[dff_chunk(b"CMPR")]
pub struct Compression {
    pub compression_type: [u8; 4],
    pub name: PString,
}

impl Compression {
    pub fn dsd() -> Self {
        Self {
            compression_type: DFF_CMPR_DSD,
            name: PString("not compressed"),
        }
    }

    pub fn dst() -> Self {
        Self {
            compression_type: DFF_CMPR_DST,
            name: PString("DST Encoded"),
        }
    }
}

#[derive(Debug, ToBytes)]
#[dff_chunk(b"FRTE")]
pub struct FrameInfo {
    pub frame_count: u32,
    pub frame_rate: u16,
}

/// `PROP` chunk of form type `SND `.
pub struct Properties {
    pub sample_rate: SampleRate,
    pub channels: Channels,
    pub compression: Compression,
}

impl DffChunk for Properties {
    fn chunk_id(&self) -> &[u8; 4] {
        b"PROP"
    }

    fn chunk_data(&self) -> Vec<u8> {
        let mut vec = b"SND ".to_vec();
        vec.extend(self.sample_rate.to_bytes());
        vec.extend(self.channels.to_bytes());
        vec.extend(self.compression.to_bytes());
        vec
    }
}

/// DSDIFF writer for plain DSD or DST frame payloads.
///
/// Chunk sizes that depend on the payload are written as zero and patched
/// by [`DffWriter::finish`].
pub struct DffWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    sample_rate: u32,
    channels: u32,
    dst: bool,
    form_size_position: u64,
    data_size_position: u64,
    frame_info_position: u64,
    data_written: u64,
    frames_written: u32,
}

impl<W: Write + Seek> DffWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            sample_rate: sacd::structs::scarlet_book::SACD_SAMPLING_FREQUENCY,
            channels: 2,
            dst: false,
            form_size_position: 0,
            data_size_position: 0,
            frame_info_position: 0,
            data_written: 0,
            frames_written: 0,
        }
    }

    pub fn configure_audio_format(
        &mut self,
        sample_rate: u32,
        channels: u32,
        dst: bool,
    ) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.sample_rate = sample_rate;
        self.channels = channels;
        self.dst = dst;
        Ok(())
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(b"FRM8")?;
        self.form_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_be_bytes())?;
        self.writer.write_all(b"DSD ")?;

        FormatVersion {
            version: DFF_VERSION,
        }
        .write_all(&mut self.writer)?;

        Properties {
            sample_rate: SampleRate {
                sample_rate: self.sample_rate,
            },
            channels: Channels::with_count(self.channels as u16),
            compression: if self.dst {
                Compression::dst()
            } else {
                Compression::dsd()
            },
        }
        .write_all(&mut self.writer)?;

        self.writer
            .write_all(if self.dst { b"DST " } else { b"DSD " })?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_be_bytes())?;

        if self.dst {
            self.frame_info_position = self.writer.stream_position()?;
            FrameInfo {
                frame_count: 0,
                frame_rate: SACD_FRAME_RATE as u16,
            }
            .write_all(&mut self.writer)?;
        }

        Ok(())
    }

    /// Appends byte interleaved, MSB-first DSD.
    pub fn write_dsd(&mut self, data: &[u8]) -> io::Result<()> {
        if self.dst {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Plain DSD written to a DST stream",
            ));
        }
        self.writer.write_all(data)?;
        self.data_written += data.len() as u64;
        Ok(())
    }

    /// Appends one DST frame as a `DSTF` chunk.
    pub fn write_dst_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if !self.dst {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "DST frame written to a plain DSD stream",
            ));
        }

        let size = frame.len() as u64;
        self.writer.write_all(&join_bytes_be!(*b"DSTF", size))?;
        self.writer.write_all(frame)?;
        if size % 2 == 1 {
            self.writer.write_all(&[0])?;
        }

        self.data_written += size;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        if !self.dst && self.data_written % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        self.writer.flush()?;

        let end = self.writer.stream_position()?;
        let data_start = self.data_size_position + 8;
        let data_size = if self.dst {
            end - data_start
        } else {
            self.data_written
        };

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&data_size.to_be_bytes())?;

        if self.dst {
            self.writer
                .seek(SeekFrom::Start(self.frame_info_position + CHUNK_HEADER_SIZE))?;
            self.writer.write_all(&self.frames_written.to_be_bytes())?;
        }

        self.writer.seek(SeekFrom::Start(self.form_size_position))?;
        self.writer.write_all(&(end - CHUNK_HEADER_SIZE).to_be_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    pub fn stats(&self) -> DffStats {
        DffStats {
            data_written: self.data_written,
            frames_written: self.frames_written,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DffStats {
    pub data_written: u64,
    pub frames_written: u32,
    pub sample_rate: u32,
    pub channels: u32,
}
