//! DSF and DSDIFF (DFF) container headers.
//!
//! Only the information needed to stream the audio payload is extracted:
//! sample rate, channel count, bit order, block layout and the byte range of
//! the sample data.

use std::io::{Read, Seek, SeekFrom};

use anyhow::{Result, bail, ensure};
use log::{debug, warn};

use crate::utils::errors::ContainerError;

pub const DSF_MAGIC: [u8; 4] = *b"DSD ";
const DSF_FMT_ID: [u8; 4] = *b"fmt ";
const DSF_DATA_ID: [u8; 4] = *b"data";
const DSF_HEADER_CHUNK_SIZE: u64 = 28;
const DSF_FMT_CHUNK_SIZE: u64 = 52;

/// Per-channel block size mandated by the DSF format.
pub const DSF_BLOCK_SIZE: usize = 4096;

pub const DFF_FRM8_ID: [u8; 4] = *b"FRM8";
const DFF_DSD_FORM: [u8; 4] = *b"DSD ";
const DFF_FVER_ID: [u8; 4] = *b"FVER";
const DFF_PROP_ID: [u8; 4] = *b"PROP";
const DFF_SND_FORM: [u8; 4] = *b"SND ";
const DFF_DSD_DATA_ID: [u8; 4] = *b"DSD ";
const DFF_DST_DATA_ID: [u8; 4] = *b"DST ";
pub const DFF_CMPR_DSD: [u8; 4] = *b"DSD ";
pub const DFF_CMPR_DST: [u8; 4] = *b"DST ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Dsf,
    Dff,
}

/// Location and format of the DSD payload inside a container file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsdStreamInfo {
    pub kind: ContainerKind,
    pub sample_rate: u32,
    pub channel_count: u32,
    /// DSF 1-bit samples are stored LSB first.
    pub lsb_first: bool,
    /// DSF block size per channel; zero for byte interleaved DFF.
    pub block_size_per_channel: usize,
    /// Samples per channel, when the header declares it.
    pub sample_count: Option<u64>,
    pub data_offset: u64,
    pub data_length: u64,
}

impl DsdStreamInfo {
    /// Reads the header of a DSF or DFF file and leaves the reader at the
    /// first byte of sample data.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let magic: [u8; 4] = read_array(reader)?;
        reader.seek(SeekFrom::Start(0))?;

        let info = match magic {
            DSF_MAGIC => read_dsf(reader)?,
            DFF_FRM8_ID => read_dff(reader)?,
            other => bail!(ContainerError::UnknownSignature(other)),
        };
        debug!("{info:?}");

        reader.seek(SeekFrom::Start(info.data_offset))?;
        Ok(info)
    }

    pub fn duration_secs(&self) -> f64 {
        let samples = self.sample_count.unwrap_or_else(|| {
            self.data_length.saturating_mul(8) / self.channel_count.max(1) as u64
        });
        samples as f64 / self.sample_rate.max(1) as f64
    }
}

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

fn read_u64_le<R: Read>(reader: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

fn read_u16_be<R: Read>(reader: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(read_array(reader)?))
}

fn read_u32_be<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(read_array(reader)?))
}

fn read_u64_be<R: Read>(reader: &mut R) -> Result<u64> {
    Ok(u64::from_be_bytes(read_array(reader)?))
}

fn read_dsf<R: Read + Seek>(reader: &mut R) -> Result<DsdStreamInfo> {
    let _magic: [u8; 4] = read_array(reader)?;
    let header_size = read_u64_le(reader)?;
    ensure!(
        header_size == DSF_HEADER_CHUNK_SIZE,
        "Invalid DSF header chunk size {header_size}"
    );
    let _file_size = read_u64_le(reader)?;
    let _metadata_pointer = read_u64_le(reader)?;

    if read_array::<4, _>(reader)? != DSF_FMT_ID {
        bail!(ContainerError::MissingChunk("fmt "));
    }
    let fmt_size = read_u64_le(reader)?;
    ensure!(
        fmt_size == DSF_FMT_CHUNK_SIZE,
        "Invalid DSF fmt chunk size {fmt_size}"
    );
    let _format_version = read_u32_le(reader)?;
    let format_id = read_u32_le(reader)?;
    ensure!(format_id == 0, "Unsupported DSF format id {format_id}");
    let _channel_type = read_u32_le(reader)?;
    let channel_count = read_u32_le(reader)?;
    let sample_rate = read_u32_le(reader)?;
    let bits_per_sample = read_u32_le(reader)?;
    let sample_count = read_u64_le(reader)?;
    let block_size_per_channel = read_u32_le(reader)?;
    let _reserved = read_u32_le(reader)?;
    if block_size_per_channel == 0 || block_size_per_channel % 4 != 0 {
        bail!(ContainerError::InvalidBlockSize(block_size_per_channel));
    }

    let lsb_first = match bits_per_sample {
        1 => true,
        8 => false,
        other => bail!(ContainerError::InvalidBitsPerSample(other)),
    };

    reader.seek(SeekFrom::Start(DSF_HEADER_CHUNK_SIZE + DSF_FMT_CHUNK_SIZE))?;
    if read_array::<4, _>(reader)? != DSF_DATA_ID {
        bail!(ContainerError::MissingChunk("data"));
    }
    let data_chunk_size = read_u64_le(reader)?;
    let data_offset = reader.stream_position()?;

    Ok(DsdStreamInfo {
        kind: ContainerKind::Dsf,
        sample_rate,
        channel_count,
        lsb_first,
        block_size_per_channel: block_size_per_channel as usize,
        sample_count: Some(sample_count),
        data_offset,
        data_length: data_chunk_size.saturating_sub(12),
    })
}

#[derive(Debug, Default)]
struct DffProperties {
    sample_rate: Option<u32>,
    channel_count: Option<u16>,
    compression: Option<[u8; 4]>,
}

/// End of a chunk body including the pad byte of odd sized chunks.
fn chunk_end(id: [u8; 4], offset: u64, size: u64) -> Result<u64> {
    offset
        .checked_add(size)
        .and_then(|end| end.checked_add(size & 1))
        .ok_or_else(|| ContainerError::ChunkOverflow { id, offset, size }.into())
}

fn read_dff_properties<R: Read + Seek>(reader: &mut R, end: u64) -> Result<DffProperties> {
    if read_array::<4, _>(reader)? != DFF_SND_FORM {
        bail!(ContainerError::MissingChunk("SND "));
    }

    let mut props = DffProperties::default();
    while reader.stream_position()?.saturating_add(12) <= end {
        let id: [u8; 4] = read_array(reader)?;
        let size = read_u64_be(reader)?;
        let next = chunk_end(id, reader.stream_position()?, size)?;

        match &id {
            b"FS  " => props.sample_rate = Some(read_u32_be(reader)?),
            b"CHNL" => props.channel_count = Some(read_u16_be(reader)?),
            b"CMPR" => props.compression = Some(read_array(reader)?),
            _ => debug!("Skipping PROP chunk {}", String::from_utf8_lossy(&id)),
        }
        reader.seek(SeekFrom::Start(next))?;
    }

    Ok(props)
}

fn read_dff<R: Read + Seek>(reader: &mut R) -> Result<DsdStreamInfo> {
    let _magic: [u8; 4] = read_array(reader)?;
    let form_size = read_u64_be(reader)?;
    if read_array::<4, _>(reader)? != DFF_DSD_FORM {
        bail!(ContainerError::MissingChunk("DSD form"));
    }
    let form_end = chunk_end(DFF_FRM8_ID, 12, form_size)?;

    let mut props = None;
    while reader.stream_position()?.saturating_add(12) <= form_end {
        let id: [u8; 4] = read_array(reader)?;
        let size = read_u64_be(reader)?;
        let body = reader.stream_position()?;
        let next = chunk_end(id, body, size)?;

        match id {
            DFF_FVER_ID => {
                let version: [u8; 4] = read_array(reader)?;
                debug!(
                    "DFF version {}.{}.{}.{}",
                    version[0], version[1], version[2], version[3]
                );
            }
            DFF_PROP_ID => props = Some(read_dff_properties(reader, body + size)?),
            DFF_DSD_DATA_ID | DFF_DST_DATA_ID => {
                let props = props.ok_or(ContainerError::MissingChunk("PROP"))?;
                let compression = props.compression.unwrap_or(DFF_CMPR_DSD);
                if id == DFF_DST_DATA_ID || compression != DFF_CMPR_DSD {
                    bail!(ContainerError::CompressedPayload(compression));
                }

                let channel_count =
                    props.channel_count.ok_or(ContainerError::MissingChunk("CHNL"))? as u32;
                let sample_rate = props.sample_rate.ok_or(ContainerError::MissingChunk("FS  "))?;

                return Ok(DsdStreamInfo {
                    kind: ContainerKind::Dff,
                    sample_rate,
                    channel_count,
                    lsb_first: false,
                    block_size_per_channel: 0,
                    sample_count: Some(size.saturating_mul(8) / channel_count.max(1) as u64),
                    data_offset: body,
                    data_length: size,
                });
            }
            _ => warn!("Skipping DFF chunk {}", String::from_utf8_lossy(&id)),
        }
        reader.seek(SeekFrom::Start(next))?;
    }

    bail!(ContainerError::MissingChunk("DSD "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub fn dsf_file(channels: u32, bits_per_sample: u32, payload: &[u8]) -> Vec<u8> {
        let mut f = Vec::new();
        let total = 28 + 52 + 12 + payload.len() as u64;
        f.extend_from_slice(b"DSD ");
        f.extend_from_slice(&28u64.to_le_bytes());
        f.extend_from_slice(&total.to_le_bytes());
        f.extend_from_slice(&0u64.to_le_bytes());
        f.extend_from_slice(b"fmt ");
        f.extend_from_slice(&52u64.to_le_bytes());
        for v in [1u32, 0, 2, channels, 2_822_400, bits_per_sample] {
            f.extend_from_slice(&v.to_le_bytes());
        }
        let samples = payload.len() as u64 * 8 / channels as u64;
        f.extend_from_slice(&samples.to_le_bytes());
        f.extend_from_slice(&4096u32.to_le_bytes());
        f.extend_from_slice(&0u32.to_le_bytes());
        f.extend_from_slice(b"data");
        f.extend_from_slice(&(12 + payload.len() as u64).to_le_bytes());
        f.extend_from_slice(payload);
        f
    }

    pub fn dff_file(compression: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"DSD ");

        body.extend_from_slice(b"FVER");
        body.extend_from_slice(&4u64.to_be_bytes());
        body.extend_from_slice(&[1, 5, 0, 0]);

        let mut prop = Vec::new();
        prop.extend_from_slice(b"SND ");
        prop.extend_from_slice(b"FS  ");
        prop.extend_from_slice(&4u64.to_be_bytes());
        prop.extend_from_slice(&2_822_400u32.to_be_bytes());
        prop.extend_from_slice(b"CHNL");
        prop.extend_from_slice(&10u64.to_be_bytes());
        prop.extend_from_slice(&2u16.to_be_bytes());
        prop.extend_from_slice(b"SLFTSRGT");
        prop.extend_from_slice(b"CMPR");
        prop.extend_from_slice(&19u64.to_be_bytes());
        prop.extend_from_slice(compression);
        prop.push(14);
        prop.extend_from_slice(b"not compressed");
        prop.push(0);

        body.extend_from_slice(b"PROP");
        body.extend_from_slice(&(prop.len() as u64).to_be_bytes());
        body.extend_from_slice(&prop);

        body.extend_from_slice(b"DSD ");
        body.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        body.extend_from_slice(payload);

        let mut f = Vec::new();
        f.extend_from_slice(b"FRM8");
        f.extend_from_slice(&(body.len() as u64).to_be_bytes());
        f.extend_from_slice(&body);
        f
    }

    #[test]
    fn test_dsf_header() -> Result<()> {
        let payload = vec![0x69; 8192];
        let file = dsf_file(2, 1, &payload);
        let mut reader = Cursor::new(file);
        let info = DsdStreamInfo::read(&mut reader)?;

        assert_eq!(info.kind, ContainerKind::Dsf);
        assert_eq!(info.channel_count, 2);
        assert_eq!(info.sample_rate, 2_822_400);
        assert!(info.lsb_first);
        assert_eq!(info.block_size_per_channel, DSF_BLOCK_SIZE);
        assert_eq!(info.data_offset, 92);
        assert_eq!(info.data_length, 8192);
        assert_eq!(reader.position(), 92);

        Ok(())
    }

    #[test]
    fn test_dff_header() -> Result<()> {
        let payload = vec![0x55; 64];
        let file = dff_file(&DFF_CMPR_DSD, &payload);
        let info = DsdStreamInfo::read(&mut Cursor::new(&file))?;

        assert_eq!(info.kind, ContainerKind::Dff);
        assert_eq!(info.channel_count, 2);
        assert!(!info.lsb_first);
        assert_eq!(info.data_length, 64);
        assert_eq!(
            &file[info.data_offset as usize..][..64],
            payload.as_slice()
        );

        Ok(())
    }

    #[test]
    fn test_dsf_rejects_bad_block_size() {
        for block_size in [0u32, 4094] {
            let mut file = dsf_file(2, 1, &[0; 64]);
            file[72..76].copy_from_slice(&block_size.to_le_bytes());
            let err = DsdStreamInfo::read(&mut Cursor::new(file))
                .err()
                .expect("bad block size");
            assert!(matches!(
                err.downcast_ref::<ContainerError>(),
                Some(ContainerError::InvalidBlockSize(n)) if *n == block_size
            ));
        }
    }

    #[test]
    fn test_dsf_truncated_fmt_chunk() {
        let file = dsf_file(2, 1, &[0; 64]);
        for len in [40, 70, 84] {
            assert!(DsdStreamInfo::read(&mut Cursor::new(&file[..len])).is_err());
        }
    }

    #[test]
    fn test_dff_oversized_chunk() {
        let mut file = dff_file(&DFF_CMPR_DSD, &[0; 16]);
        file[20..28].copy_from_slice(&u64::MAX.to_be_bytes());
        let err = DsdStreamInfo::read(&mut Cursor::new(file))
            .err()
            .expect("oversized chunk");
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::ChunkOverflow { id, .. }) if id == b"FVER"
        ));

        let mut file = dff_file(&DFF_CMPR_DSD, &[0; 16]);
        file[4..12].copy_from_slice(&(u64::MAX - 4).to_be_bytes());
        assert!(DsdStreamInfo::read(&mut Cursor::new(file)).is_err());
    }

    #[test]
    fn test_duration_with_huge_data_length() {
        let info = DsdStreamInfo {
            kind: ContainerKind::Dsf,
            sample_rate: 2_822_400,
            channel_count: 2,
            lsb_first: true,
            block_size_per_channel: DSF_BLOCK_SIZE,
            sample_count: Some(2_822_400),
            data_offset: 92,
            data_length: u64::MAX,
        };
        assert_eq!(info.duration_secs(), 1.0);
        assert!(
            DsdStreamInfo {
                sample_count: None,
                ..info
            }
            .duration_secs()
                > 0.0
        );
    }

    #[test]
    fn test_rejects_dst_and_unknown() {
        let file = dff_file(&DFF_CMPR_DST, &[0; 16]);
        assert!(DsdStreamInfo::read(&mut Cursor::new(file)).is_err());

        let err = DsdStreamInfo::read(&mut Cursor::new(b"RIFF0000".to_vec()));
        assert!(err.is_err());
    }
}
