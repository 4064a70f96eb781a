use anyhow::{Result, anyhow};
use log::trace;

use crate::log_or_err;
use crate::process::reassemble::DstPipeline;
use crate::process::transcode::Transcoder;
use crate::structs::audio_sector::{AudioFrameHeader, AudioFrameInfo, AudioPacketInfo};
use crate::structs::scarlet_book::{AudioPacketDataType, MAX_PACKET_INFO_COUNT};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DemuxError;

#[derive(Debug, Clone, Copy)]
pub struct DemuxState {
    pub fail_level: log::Level,
    /// Selects the MSB-first frame header layout.
    pub big_endian: bool,
}

impl Default for DemuxState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            big_endian: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioPacket<'a> {
    pub info: AudioPacketInfo,
    pub dst_encoded: bool,
    pub payload: &'a [u8],
}

impl AudioPacket<'_> {
    pub fn is_audio(&self) -> bool {
        self.info.data_type == AudioPacketDataType::Audio
    }
}

/// Everything found in one audio sector.
#[derive(Debug, Default)]
pub struct SectorPackets<'a> {
    pub headers: Vec<AudioFrameHeader>,
    pub frames: Vec<AudioFrameInfo>,
    pub packets: Vec<AudioPacket<'a>>,
    /// Parsing stopped early; `packets` holds what was complete before that.
    pub truncated: bool,
}

impl<'a> SectorPackets<'a> {
    pub fn audio(&self) -> impl Iterator<Item = &AudioPacket<'a>> {
        self.packets.iter().filter(|p| p.is_audio())
    }
}

/// Splits an audio sector into its descriptors and packet payloads.
///
/// Truncated tables or a packet running past the sector end stop the walk.
/// The problem is logged at warn level, so it only turns into an error when
/// `fail_level` is `Warn` (strict mode).
pub fn split_sector<'a>(state: &DemuxState, sector: &'a [u8]) -> Result<SectorPackets<'a>> {
    let length = sector.len();
    let mut out = SectorPackets::default();
    let mut index = 0;

    'sector: while index < length {
        let header = AudioFrameHeader::from_byte(sector[index], state.big_endian);
        index += 1;
        out.headers.push(header);

        let packet_count = header.packet_info_count;
        let mut infos = Vec::new();
        if (1..=MAX_PACKET_INFO_COUNT).contains(&packet_count) {
            let table_len = packet_count as usize * AudioPacketInfo::SIZE;
            if index + table_len > length {
                log_or_err!(
                    state,
                    log::Level::Warn,
                    anyhow!(DemuxError::TruncatedPacketInfo { index, length })
                );
                out.truncated = true;
                break;
            }

            let reader = &mut BsIoSliceReader::from_slice(&sector[index..index + table_len]);
            for _ in 0..packet_count {
                infos.push(AudioPacketInfo::read(reader)?);
            }
            index += table_len;
        } else {
            trace!("Header at {} declares {packet_count} packets, skipping", index - 1);
        }

        let frame_table_len = header.frame_info_count as usize * header.frame_info_size();
        if index + frame_table_len > length {
            log_or_err!(
                state,
                log::Level::Warn,
                anyhow!(DemuxError::TruncatedFrameInfo { index, length })
            );
            out.truncated = true;
            break;
        }

        let reader = &mut BsIoSliceReader::from_slice(&sector[index..index + frame_table_len]);
        for _ in 0..header.frame_info_count {
            out.frames
                .push(AudioFrameInfo::read(reader, header.dst_encoded)?);
        }
        index += frame_table_len;

        for info in infos {
            let packet_length = info.packet_length as usize;
            if index + packet_length > length {
                log_or_err!(
                    state,
                    log::Level::Warn,
                    anyhow!(DemuxError::PacketOverrun {
                        index,
                        packet_length,
                        length,
                    })
                );
                out.truncated = true;
                break 'sector;
            }

            out.packets.push(AudioPacket {
                info,
                dst_encoded: header.dst_encoded,
                payload: &sector[index..index + packet_length],
            });
            index += packet_length;
        }
    }

    Ok(out)
}

/// Drives audio sectors of one area into a sink.
///
/// Raw DSD payloads of a sector are gathered and transcoded in one go. DST
/// packets go through the [`DstPipeline`], which reassembles, decodes and
/// transcodes whole frames.
pub struct Demultiplexer {
    state: DemuxState,
    transcoder: Transcoder,
    dst: Option<DstPipeline>,
    raw: Vec<u8>,
    sectors: u64,
}

impl Demultiplexer {
    pub fn new(transcoder: Transcoder) -> Self {
        Self {
            state: DemuxState::default(),
            transcoder,
            dst: None,
            raw: Vec::new(),
            sectors: 0,
        }
    }

    pub fn with_dst(mut self, pipeline: DstPipeline) -> Self {
        self.dst = Some(pipeline);
        self
    }

    /// Sets the failure level for malformed sectors.
    ///
    /// - `log::Level::Error`: log and skip the rest of the sector (default)
    /// - `log::Level::Warn`: fail (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
        if let Some(dst) = &mut self.dst {
            dst.set_fail_level(level);
        }
    }

    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.state.big_endian = big_endian;
    }

    pub fn sectors_processed(&self) -> u64 {
        self.sectors
    }

    pub fn dst_pipeline(&self) -> Option<&DstPipeline> {
        self.dst.as_ref()
    }

    pub fn process_sector(&mut self, sector: &[u8], sink: &mut dyn FnMut(&[u8])) -> Result<()> {
        let packets = split_sector(&self.state, sector)?;
        self.sectors += 1;

        self.raw.clear();
        for packet in packets.audio() {
            if !packet.dst_encoded {
                self.raw.extend_from_slice(packet.payload);
                continue;
            }

            match &mut self.dst {
                Some(dst) => dst.push(packet.info.frame_start, packet.payload, sink)?,
                None => {
                    log_or_err!(
                        self.state,
                        log::Level::Warn,
                        anyhow!(DemuxError::MissingDecompressor)
                    );
                    break;
                }
            }
        }

        if !self.raw.is_empty() {
            self.transcoder.push(&self.raw, sink)?;
        }

        Ok(())
    }

    /// Flushes the last DST frame and any trailing raw bytes.
    pub fn finish(&mut self, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
        if let Some(dst) = &mut self.dst {
            dst.finish(sink)?;
        }
        self.transcoder.flush();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::process::reassemble::tests::RecordingDecompressor;
    use crate::process::transcode::{OutputMode, SourceLayout, StreamFormat};

    /// Builds one sector: a header, packet descriptors and payloads.
    pub fn audio_sector(dst_encoded: bool, packets: &[(bool, AudioPacketDataType, &[u8])]) -> Vec<u8> {
        let header = AudioFrameHeader {
            dst_encoded,
            reserved: false,
            frame_info_count: 0,
            packet_info_count: packets.len() as u8,
        };

        let mut sector = vec![header.to_little_endian_byte()];
        for (frame_start, data_type, payload) in packets {
            let info = AudioPacketInfo {
                frame_start: *frame_start,
                data_type: *data_type,
                packet_length: payload.len() as u16,
            };
            sector.extend_from_slice(&info.to_bytes());
        }
        for (_, _, payload) in packets {
            sector.extend_from_slice(payload);
        }
        sector
    }

    fn native() -> Transcoder {
        Transcoder::new(StreamFormat::new(SourceLayout::Sacd, OutputMode::Native))
    }

    #[test]
    fn test_raw_sector_to_native() -> Result<()> {
        let samples: Vec<u8> = (0..16).collect();
        let mut sector = vec![0x20, 0x10, 0x10];
        sector.extend_from_slice(&samples);

        let mut demux = Demultiplexer::new(native());
        let mut calls = Vec::new();
        demux.process_sector(&sector, &mut |b| calls.push(b.to_vec()))?;

        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![0, 2, 4, 6, 1, 3, 5, 7, 8, 10, 12, 14, 9, 11, 13, 15]
        );
        Ok(())
    }

    #[test]
    fn test_sectors_to_dop_keep_marker_phase() -> Result<()> {
        let dop = Transcoder::new(StreamFormat::new(SourceLayout::Sacd, OutputMode::Dop));
        let mut demux = Demultiplexer::new(dop);

        let first = audio_sector(false, &[(true, AudioPacketDataType::Audio, &[1, 2, 3, 4, 5, 6])]);
        let second = audio_sector(
            false,
            &[(false, AudioPacketDataType::Audio, &[7, 8, 9, 10, 11, 12])],
        );

        let mut calls = Vec::new();
        demux.process_sector(&first, &mut |b| calls.push(b.to_vec()))?;
        demux.process_sector(&second, &mut |b| calls.push(b.to_vec()))?;
        demux.finish(&mut |b| calls.push(b.to_vec()))?;

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], vec![0, 3, 1, 0x05, 0, 4, 2, 0x05]);
        assert_eq!(
            calls[1],
            vec![
                0, 7, 5, 0xFA, 0, 8, 6, 0xFA, //
                0, 11, 9, 0x05, 0, 12, 10, 0x05,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_skips_non_audio_packets() -> Result<()> {
        let sector = audio_sector(
            false,
            &[
                (true, AudioPacketDataType::Supplementary, &[0xEE; 5]),
                (false, AudioPacketDataType::Audio, &[1; 8]),
                (false, AudioPacketDataType::Padding, &[0; 3]),
                (false, AudioPacketDataType::Audio, &[2; 8]),
            ],
        );

        let packets = split_sector(&DemuxState::default(), &sector)?;
        assert_eq!(packets.packets.len(), 4);
        assert_eq!(packets.audio().count(), 2);
        assert!(!packets.truncated);

        let mut demux = Demultiplexer::new(native());
        let mut out = Vec::new();
        demux.process_sector(&sector, &mut |b| out.extend_from_slice(b))?;
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..8], &[1; 8]);
        Ok(())
    }

    #[test]
    fn test_truncated_sector() -> Result<()> {
        let mut sector = audio_sector(
            false,
            &[
                (true, AudioPacketDataType::Audio, &[1; 8]),
                (false, AudioPacketDataType::Audio, &[2; 8]),
            ],
        );
        sector.truncate(sector.len() - 1);

        let packets = split_sector(&DemuxState::default(), &sector)?;
        assert!(packets.truncated);
        assert_eq!(packets.packets.len(), 1);

        let strict = DemuxState {
            fail_level: log::Level::Warn,
            ..Default::default()
        };
        assert!(split_sector(&strict, &sector).is_err());

        // frame info table cut short
        let short = [0b0000_0100, 0x00];
        assert!(split_sector(&DemuxState::default(), &short)?.truncated);
        Ok(())
    }

    #[test]
    fn test_big_endian_header() -> Result<()> {
        let header = AudioFrameHeader {
            packet_info_count: 1,
            ..Default::default()
        };
        let mut sector = vec![header.to_big_endian_byte()];
        sector.extend_from_slice(&[0x10, 0x08]);
        sector.extend_from_slice(&[7; 8]);

        let state = DemuxState {
            big_endian: true,
            ..Default::default()
        };
        let packets = split_sector(&state, &sector)?;
        assert_eq!(packets.packets.len(), 1);
        assert_eq!(packets.packets[0].payload, &[7; 8]);
        Ok(())
    }

    #[test]
    fn test_invalid_packet_count_skips_table() -> Result<()> {
        // seven packets is out of range, the header carries none
        let sector = [0b1110_0000, 0, 0];
        let packets = split_sector(&DemuxState::default(), &sector)?;
        assert_eq!(packets.headers.len(), 3);
        assert!(packets.packets.is_empty());
        Ok(())
    }

    #[test]
    fn test_dst_sectors() -> Result<()> {
        let decoder = RecordingDecompressor::default();
        let calls = decoder.calls.clone();
        let pipeline = DstPipeline::new(Box::new(decoder), native(), Arc::new(AtomicBool::new(false)));
        let mut demux = Demultiplexer::new(native()).with_dst(pipeline);

        let first = audio_sector(
            true,
            &[
                (true, AudioPacketDataType::Audio, &[1; 10]),
                (false, AudioPacketDataType::Audio, &[1; 5]),
            ],
        );
        let second = audio_sector(true, &[(true, AudioPacketDataType::Audio, &[2; 8])]);

        let mut frames = 0;
        let mut sink = |_: &[u8]| frames += 1;
        demux.process_sector(&first, &mut sink)?;
        demux.process_sector(&second, &mut sink)?;
        assert_eq!(*calls.lock().unwrap(), vec![(15, 15, 1)]);

        demux.finish(&mut sink)?;
        assert_eq!(frames, 2);
        assert_eq!(demux.sectors_processed(), 2);
        Ok(())
    }

    #[test]
    fn test_dst_without_decompressor() -> Result<()> {
        let sector = audio_sector(true, &[(true, AudioPacketDataType::Audio, &[1; 10])]);
        let mut demux = Demultiplexer::new(native());
        let mut out = 0;
        demux.process_sector(&sector, &mut |_| out += 1)?;
        assert_eq!(out, 0);

        demux.set_fail_level(log::Level::Warn);
        assert!(demux.process_sector(&sector, &mut |_| ()).is_err());
        Ok(())
    }
}
