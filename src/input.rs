use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Result, bail};
use sacd::structs::container::{DFF_FRM8_ID, DSF_MAGIC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// ISO image of an SACD, 2048 or 2064 bytes per sector.
    SacdImage,
    Dsf,
    Dff,
}

impl InputKind {
    /// Guesses the input kind from the first four bytes. Anything that is
    /// not a DSD container is treated as a disc image.
    pub fn sniff(magic: &[u8]) -> Self {
        match magic.get(..4) {
            Some(m) if m == DSF_MAGIC => InputKind::Dsf,
            Some(m) if m == DFF_FRM8_ID => InputKind::Dff,
            _ => InputKind::SacdImage,
        }
    }
}

/// Seekable input that knows what kind of file it reads.
pub struct InputReader<R: Read + Seek> {
    reader: R,
    kind: InputKind,
}

impl InputReader<BufReader<File>> {
    /// Opens a file. Disc images need random access, so stdin is refused.
    pub fn open<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        if path.to_string_lossy() == "-" {
            bail!("Pipe input is not supported, a seekable file is required");
        }

        let file = File::open(path)?;
        Self::from_reader(BufReader::with_capacity(256 * 1024, file))
    }
}

impl<R: Read + Seek> InputReader<R> {
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.seek(SeekFrom::Start(0))?;
        let read = reader.read(&mut magic)?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader,
            kind: InputKind::sniff(&magic[..read]),
        })
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads `length` bytes starting at `offset` in chunks of at most
    /// `chunk_size`. The callback returns `Ok(false)` to stop early.
    /// A file shorter than the range ends the loop without error.
    pub fn process_chunks<F>(
        &mut self,
        offset: u64,
        length: u64,
        chunk_size: usize,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; chunk_size];
        let mut remaining = length;

        while remaining > 0 {
            let want = (remaining.min(chunk_size as u64)) as usize;
            let bytes_read = self.reader.read(&mut buffer[..want])?;
            if bytes_read == 0 {
                log::warn!("Input ended {remaining} bytes before the declared data end");
                break;
            }
            remaining -= bytes_read as u64;

            if !callback(&buffer[..bytes_read])? {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sniff() {
        assert_eq!(InputKind::sniff(b"DSD \x1c\0\0\0"), InputKind::Dsf);
        assert_eq!(InputKind::sniff(b"FRM8"), InputKind::Dff);
        assert_eq!(InputKind::sniff(&[0; 2048]), InputKind::SacdImage);
        assert_eq!(InputKind::sniff(b"DS"), InputKind::SacdImage);
    }

    #[test]
    fn test_process_range() -> Result<()> {
        let data: Vec<u8> = (0..=255).collect();
        let mut input = InputReader::from_reader(Cursor::new(data))?;
        assert_eq!(input.kind(), InputKind::SacdImage);

        let mut seen = Vec::new();
        let mut calls = 0;
        input.process_chunks(10, 25, 8, |chunk| {
            calls += 1;
            seen.extend_from_slice(chunk);
            Ok(true)
        })?;
        assert_eq!(calls, 4);
        assert_eq!(seen, (10..35).collect::<Vec<u8>>());

        let mut total = 0;
        input.process_chunks(250, 100, 4, |chunk| {
            total += chunk.len();
            Ok(total < 4)
        })?;
        assert_eq!(total, 4);
        Ok(())
    }
}
