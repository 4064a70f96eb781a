use std::io::{self, BufWriter, Seek, SeekFrom, Write};

pub const W64_RIFF_GUID: [u8; 16] = [
    0x72, 0x69, 0x66, 0x66, 0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00,
];
pub const W64_WAVE_GUID: [u8; 16] = [
    0x77, 0x61, 0x76, 0x65, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_FMT_GUID: [u8; 16] = [
    0x66, 0x6D, 0x74, 0x20, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_DATA_GUID: [u8; 16] = [
    0x64, 0x61, 0x74, 0x61, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

/// Size of a W64 chunk header: GUID plus 64-bit size.
const W64_CHUNK_HEADER: u64 = 24;

/// DoP words are carried as 24-bit PCM.
pub const DOP_BITS_PER_SAMPLE: u32 = 24;

/// Sony Wave64 writer for DSD over PCM streams.
///
/// Players that understand DoP recognise the marker byte in each 24-bit
/// word and pass the DSD through untouched.
pub struct W64Writer<W: Write + Seek> {
    writer: BufWriter<W>,
    data_size_position: u64,
    data_written: u64,
    sample_rate: u32,
    channels: u32,
    file_size_position: u64,
}

impl<W: Write + Seek> W64Writer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            data_size_position: 0,
            data_written: 0,
            sample_rate: 176_400,
            channels: 2,
            file_size_position: 0,
        }
    }

    /// `sample_rate` is the PCM carrier rate, a sixteenth of the DSD rate.
    pub fn configure_audio_format(&mut self, sample_rate: u32, channels: u32) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.sample_rate = sample_rate;
        self.channels = channels;
        Ok(())
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(&W64_RIFF_GUID)?;
        self.file_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?;
        self.writer.write_all(&W64_WAVE_GUID)?;

        self.writer.write_all(&W64_FMT_GUID)?;
        self.writer
            .write_all(&(W64_CHUNK_HEADER + 16).to_le_bytes())?;

        let bytes_per_sample = DOP_BITS_PER_SAMPLE / 8;
        let block_align = self.channels * bytes_per_sample;
        self.writer.write_all(&1u16.to_le_bytes())?;
        self.writer
            .write_all(&(self.channels as u16).to_le_bytes())?;
        self.writer.write_all(&self.sample_rate.to_le_bytes())?;
        self.writer
            .write_all(&(self.sample_rate * block_align).to_le_bytes())?;
        self.writer.write_all(&(block_align as u16).to_le_bytes())?;
        self.writer
            .write_all(&(DOP_BITS_PER_SAMPLE as u16).to_le_bytes())?;

        self.writer.write_all(&W64_DATA_GUID)?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?;

        Ok(())
    }

    /// Writes 32-bit little-endian DoP words as packed 24-bit samples.
    /// The zero low byte of each word is dropped.
    pub fn write_dop_words(&mut self, words: &[u8]) -> io::Result<()> {
        if words.len() % 4 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "DoP payload is not a whole number of words",
            ));
        }

        let mut packed = Vec::with_capacity(words.len() / 4 * 3);
        for word in words.chunks_exact(4) {
            packed.extend_from_slice(&word[1..4]);
        }
        self.writer.write_all(&packed)?;
        self.data_written += packed.len() as u64;
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer
            .write_all(&(self.data_written + W64_CHUNK_HEADER).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.file_size_position))?;
        self.writer.write_all(&current_pos.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    pub fn stats(&self) -> W64Stats {
        W64Stats {
            data_written: self.data_written,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

#[derive(Debug, Clone)]
pub struct W64Stats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u32,
}
