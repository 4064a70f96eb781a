use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::command::ExtractMode;
use crate::dff::DffWriter;
use crate::wav::W64Writer;

pub fn create_path_with_suffix(base_path: &Path, suffix: &str) -> PathBuf {
    let mut path = base_path.to_path_buf();
    let new_name = format!(
        "{}.{}",
        base_path.file_name().unwrap_or_default().to_string_lossy(),
        suffix
    );
    path.set_file_name(new_name);
    path
}

pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(existing_ext) if existing_ext == expected_ext => base_path.to_path_buf(),
        Some(_) => create_path_with_suffix(base_path, expected_ext),
        None => base_path.with_extension(expected_ext),
    }
}

/// Output file for one track. With several tracks the track number is added
/// before the extension: `album.03.dff`.
pub fn create_track_path(base_path: &Path, mode: ExtractMode, track: Option<usize>) -> PathBuf {
    let ext = mode.extension();
    let base = if base_path.extension().is_some_and(|e| e == ext) {
        base_path.with_extension("")
    } else {
        base_path.to_path_buf()
    };

    match track {
        Some(number) => create_path_with_suffix(&base, &format!("{number:02}.{ext}")),
        None => create_path_with_extension(&base, ext),
    }
}

pub enum AudioWriter {
    Dff(DffWriter<File>),
    Native(BufWriter<File>),
    W64(W64Writer<File>),
}

impl AudioWriter {
    pub fn create_dff(path: &Path, sample_rate: u32, channel_count: u32, dst: bool) -> Result<Self> {
        let mut dff_writer = DffWriter::new(File::create(path)?);
        dff_writer.configure_audio_format(sample_rate, channel_count, dst)?;
        dff_writer.write_header()?;
        Ok(AudioWriter::Dff(dff_writer))
    }

    pub fn create_native(path: &Path) -> Result<Self> {
        Ok(AudioWriter::Native(BufWriter::new(File::create(path)?)))
    }

    /// `sample_rate` is the DoP carrier rate.
    pub fn create_w64(path: &Path, sample_rate: u32, channel_count: u32) -> Result<Self> {
        let mut w64_writer = W64Writer::new(File::create(path)?);
        w64_writer.configure_audio_format(sample_rate, channel_count)?;
        w64_writer.write_header()?;
        Ok(AudioWriter::W64(w64_writer))
    }

    pub fn write_audio(&mut self, data: &[u8]) -> Result<()> {
        match self {
            AudioWriter::Dff(w) => w.write_dsd(data)?,
            AudioWriter::Native(w) => w.write_all(data)?,
            AudioWriter::W64(w) => w.write_dop_words(data)?,
        }
        Ok(())
    }

    pub fn write_dst_frame(&mut self, frame: &[u8]) -> Result<()> {
        match self {
            AudioWriter::Dff(w) => w.write_dst_frame(frame)?,
            _ => bail!("DST frames can only be stored in a DSDIFF file"),
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        match self {
            AudioWriter::Dff(w) => w.finish()?,
            AudioWriter::Native(w) => w.flush()?,
            AudioWriter::W64(w) => w.finish()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_handling() {
        assert_eq!(
            create_path_with_extension(Path::new("out/album"), "dff"),
            PathBuf::from("out/album.dff")
        );
        assert_eq!(
            create_path_with_extension(Path::new("album.dff"), "dff"),
            PathBuf::from("album.dff")
        );
        assert_eq!(
            create_path_with_extension(Path::new("album.v2"), "wav"),
            PathBuf::from("album.v2.wav")
        );
    }

    #[test]
    fn test_track_paths() {
        let base = Path::new("rips/album.dff");
        assert_eq!(
            create_track_path(base, ExtractMode::Dff, Some(3)),
            PathBuf::from("rips/album.03.dff")
        );
        assert_eq!(
            create_track_path(base, ExtractMode::Dff, None),
            PathBuf::from("rips/album.dff")
        );
        assert_eq!(
            create_track_path(Path::new("album"), ExtractMode::Dop, Some(12)),
            PathBuf::from("album.12.wav")
        );
        assert_eq!(
            create_track_path(Path::new("album"), ExtractMode::Native, None),
            PathBuf::from("album.dsd")
        );
    }
}
