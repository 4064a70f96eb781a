//! Disc session: sector geometry detection, TOC loading and track access.
//!
//! All records are read through [`SectorReader`] in whole sectors. For
//! images with 2064 byte physical sectors the 12 byte lead-in (and the 4
//! trailing bytes) of every sector is stripped, so the record readers only
//! ever see 2048 byte logical sectors and record-relative offsets.

use std::fmt::{Display, Formatter};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Result, bail};
use log::{debug, info, warn};

use crate::process::demux::Demultiplexer;
use crate::process::reassemble::{DstDecompressor, DstPipeline};
use crate::process::transcode::{OutputMode, SourceLayout, StreamFormat, Transcoder};
use crate::structs::album_info::SacdAlbumInfo;
use crate::structs::area_toc::{AreaKind, SacdAreaToc};
use crate::structs::master_toc::SacdToc;
use crate::structs::scarlet_book::{
    FrameFormat, MASTER_TEXT_SECTOR, SACD_LSN_SIZE, SACD_PSN_LEAD_IN, SACD_PSN_SIZE,
    START_OF_MASTER_TOC, TRACK_TEXT_SECTORS,
};
use crate::structs::track_info::{SacdTrackOffset, SacdTrackText, SacdTrackTime};
use crate::structs::track_time::TrackTime;
use crate::utils::byte_cursor::ByteCursor;
use crate::utils::errors::{DemuxError, DiscError, TranscodeError};

/// Sectors fetched per read while streaming a track.
const READ_BATCH_SECTORS: u32 = 32;

/// Random access byte source for disc images.
pub trait SectorReader {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl<R: Read + Seek> SectorReader for R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorLayout {
    #[default]
    Logical2048,
    Physical2064,
}

impl SectorLayout {
    pub fn sector_size(&self) -> usize {
        match self {
            SectorLayout::Logical2048 => SACD_LSN_SIZE,
            SectorLayout::Physical2064 => SACD_PSN_SIZE,
        }
    }

    pub fn lead_in(&self) -> usize {
        match self {
            SectorLayout::Logical2048 => 0,
            SectorLayout::Physical2064 => SACD_PSN_LEAD_IN,
        }
    }

    /// Byte offset of a sector's start in the image.
    pub fn sector_offset(&self, sector: u32) -> u64 {
        sector as u64 * self.sector_size() as u64
    }
}

impl Display for SectorLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bytes per sector", self.sector_size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaPreference {
    /// Stereo when present, multichannel otherwise.
    #[default]
    Auto,
    Stereo,
    MultiChannel,
}

/// Parameters the audio pipeline needs for one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaGeometry {
    pub layout: SectorLayout,
    pub kind: AreaKind,
    pub channel_count: u32,
    pub sample_frequency: u32,
    pub frame_format: FrameFormat,
}

impl AreaGeometry {
    pub fn is_dst(&self) -> bool {
        self.frame_format == FrameFormat::Dst
    }

    pub fn stream_format(&self, mode: OutputMode) -> Result<StreamFormat> {
        if self.channel_count != 2 {
            bail!(TranscodeError::UnsupportedChannelCount(self.channel_count));
        }
        Ok(StreamFormat::new(SourceLayout::Sacd, mode))
    }

    /// Builds the demultiplexer for this area. DST areas need a decoder.
    pub fn demultiplexer(
        &self,
        mode: OutputMode,
        decompressor: Option<Box<dyn DstDecompressor>>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Demultiplexer> {
        let format = self.stream_format(mode)?;
        let demux = Demultiplexer::new(Transcoder::new(format));

        match decompressor {
            Some(decompressor) => Ok(demux.with_dst(DstPipeline::new(
                decompressor,
                Transcoder::new(format),
                cancel,
            ))),
            None if self.is_dst() => bail!(DemuxError::MissingDecompressor),
            None => Ok(demux),
        }
    }
}

/// The selected audio area with its track tables.
#[derive(Debug, Clone)]
pub struct SacdArea {
    pub start_sector: u32,
    pub toc: SacdAreaToc,
    pub offsets: Vec<SacdTrackOffset>,
    pub times: Vec<SacdTrackTime>,
    pub texts: Vec<SacdTrackText>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    /// 1-based.
    pub number: usize,
    pub title: Option<String>,
    pub performer: Option<String>,
    pub start_sector: u32,
    /// Inclusive.
    pub end_sector: u32,
    pub start_byte: u64,
    /// Exclusive.
    pub end_byte: u64,
    pub start: TrackTime,
    pub duration: TrackTime,
}

impl TrackInfo {
    pub fn sector_count(&self) -> u32 {
        self.end_sector
            .saturating_add(1)
            .saturating_sub(self.start_sector)
    }

    /// Track title, falling back to `<name>_TrackN`.
    pub fn display_title(&self, name: &str) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("{name}_Track{}", self.number))
    }

    pub fn display_performer(&self) -> &str {
        self.performer.as_deref().unwrap_or("Unknown artist")
    }
}

pub struct Disc<R: SectorReader> {
    reader: R,
    layout: SectorLayout,
    toc: SacdToc,
    album_info: Option<SacdAlbumInfo>,
    area: SacdArea,
}

impl<R: SectorReader> Disc<R> {
    /// Probes the sector size, then loads the master TOC, master text and
    /// the area picked by `preference`.
    pub fn open(mut reader: R, preference: AreaPreference) -> Result<Self> {
        let (layout, toc) = probe(&mut reader)?;
        info!("SACD image detected, {layout}");

        let mut disc = Self {
            reader,
            layout,
            toc,
            album_info: None,
            area: SacdArea {
                start_sector: 0,
                toc: SacdAreaToc::default(),
                offsets: Vec::new(),
                times: Vec::new(),
                texts: Vec::new(),
            },
        };

        let text = disc.read_sectors(MASTER_TEXT_SECTOR, 1)?;
        disc.album_info = SacdAlbumInfo::read(
            &mut ByteCursor::new(&text),
            disc.toc.primary_character_set(),
        );
        if disc.album_info.is_none() {
            debug!("No master text at sector {MASTER_TEXT_SECTOR}");
        }

        disc.select_area(preference)?;
        Ok(disc)
    }

    pub fn layout(&self) -> SectorLayout {
        self.layout
    }

    pub fn toc(&self) -> &SacdToc {
        &self.toc
    }

    pub fn album_info(&self) -> Option<&SacdAlbumInfo> {
        self.album_info.as_ref()
    }

    pub fn area(&self) -> &SacdArea {
        &self.area
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Loads the area TOC and its track tables.
    ///
    /// The first copy of the area TOC is used; when its signature is bad the
    /// second copy is tried.
    pub fn select_area(&mut self, preference: AreaPreference) -> Result<&SacdArea> {
        let toc = &self.toc;
        let (name, copies) = match preference {
            AreaPreference::Stereo => ("stereo", [toc.area_1_toc_1_start, toc.area_1_toc_2_start]),
            AreaPreference::MultiChannel => (
                "multichannel",
                [toc.area_2_toc_1_start, toc.area_2_toc_2_start],
            ),
            AreaPreference::Auto if toc.has_two_channel_area() => {
                ("stereo", [toc.area_1_toc_1_start, toc.area_1_toc_2_start])
            }
            AreaPreference::Auto => (
                "multichannel",
                [toc.area_2_toc_1_start, toc.area_2_toc_2_start],
            ),
        };

        if copies[0] == 0 {
            bail!(DiscError::MissingArea(name));
        }

        let mut selected = None;
        for start in copies.into_iter().filter(|&s| s != 0) {
            let sector = self.read_sectors(start, 1)?;
            match SacdAreaToc::read(&mut ByteCursor::new(&sector)) {
                Some(area_toc) => {
                    selected = Some((start, area_toc));
                    break;
                }
                None => warn!("{}", DiscError::InvalidAreaToc(start)),
            }
        }
        let Some((start_sector, area_toc)) = selected else {
            bail!(DiscError::InvalidAreaToc(copies[0]));
        };

        info!(
            "Using {} area at sector {start_sector}: {} tracks, {} channels, {}",
            area_toc.kind, area_toc.track_count, area_toc.channel_count, area_toc.frame_format
        );

        let track_count = area_toc.track_count as usize;

        let sector = self.read_sectors(start_sector.saturating_add(1), 1)?;
        let offsets = SacdTrackOffset::read(&mut ByteCursor::new(&sector), track_count)
            .unwrap_or_else(|| {
                warn!("Track offset list missing, treating the area as one track");
                vec![SacdTrackOffset {
                    start_sector: area_toc.track_start,
                    length_sectors: area_toc
                        .track_end
                        .saturating_add(1)
                        .saturating_sub(area_toc.track_start),
                    end_sector: area_toc.track_end,
                }]
            });

        let sector = self.read_sectors(start_sector.saturating_add(2), 1)?;
        let times =
            SacdTrackTime::read(&mut ByteCursor::new(&sector), track_count).unwrap_or_default();

        let texts = if area_toc.track_text_offset == 0 {
            Vec::new()
        } else {
            let sectors = self.read_sectors(
                start_sector.saturating_add(area_toc.track_text_offset as u32),
                TRACK_TEXT_SECTORS,
            )?;
            SacdTrackText::read(
                &mut ByteCursor::new(&sectors),
                track_count,
                area_toc.character_set(),
            )
            .unwrap_or_default()
        };

        self.area = SacdArea {
            start_sector,
            toc: area_toc,
            offsets,
            times,
            texts,
        };
        Ok(&self.area)
    }

    pub fn geometry(&self) -> AreaGeometry {
        let toc = &self.area.toc;
        AreaGeometry {
            layout: self.layout,
            kind: toc.kind,
            channel_count: toc.channel_count as u32,
            sample_frequency: toc.sample_frequency,
            frame_format: toc.frame_format,
        }
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        let sector_size = self.layout.sector_size() as u64;
        self.area
            .offsets
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                let time = self.area.times.get(i).copied().unwrap_or_default();
                let text = self.area.texts.get(i);
                TrackInfo {
                    number: i + 1,
                    title: text.and_then(|t| t.title()).map(str::to_owned),
                    performer: text.and_then(|t| t.performer()).map(str::to_owned),
                    start_sector: offset.start_sector,
                    end_sector: offset.end_sector,
                    start_byte: offset.start_sector as u64 * sector_size,
                    end_byte: (offset.end_sector as u64 + 1) * sector_size,
                    start: time.start,
                    duration: time.duration,
                }
            })
            .collect()
    }

    pub fn track(&self, number: usize) -> Result<TrackInfo> {
        let mut tracks = self.tracks();
        let available = tracks.len();
        if number == 0 || number > available {
            bail!(DiscError::TrackOutOfRange {
                requested: number,
                available,
            });
        }
        Ok(tracks.swap_remove(number - 1))
    }

    /// Reads `count` sectors starting at `start` and returns their logical
    /// 2048 byte payloads back to back.
    pub fn read_sectors(&mut self, start: u32, count: u32) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(count as usize * SACD_LSN_SIZE);
        self.for_each_sector(start, count, &mut |sector| {
            out.extend_from_slice(sector);
            Ok(())
        })?;
        Ok(out)
    }

    /// Streams the audio sectors of a track to `sink`, one logical sector
    /// per call.
    pub fn read_track_sectors(
        &mut self,
        number: usize,
        sink: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        let track = self.track(number)?;
        let count = track.sector_count();
        if count == 0 {
            bail!(DiscError::EmptyTrack(number));
        }

        debug!(
            "Track {number}: sectors {}..={}",
            track.start_sector, track.end_sector
        );
        self.for_each_sector(track.start_sector, count, sink)
    }

    fn for_each_sector(
        &mut self,
        start: u32,
        count: u32,
        sink: &mut dyn FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        let sector_size = self.layout.sector_size();
        let lead_in = self.layout.lead_in();
        let mut buf = vec![0u8; READ_BATCH_SECTORS as usize * sector_size];

        let mut sector = start;
        let end = start
            .checked_add(count)
            .ok_or(DiscError::SectorRangeOverflow { start, count })?;
        while sector < end {
            let batch = (end - sector).min(READ_BATCH_SECTORS);
            let bytes = &mut buf[..batch as usize * sector_size];
            self.reader
                .read_at(self.layout.sector_offset(sector), bytes)?;

            for raw in bytes.chunks_exact(sector_size) {
                sink(&raw[lead_in..lead_in + SACD_LSN_SIZE])?;
            }
            sector += batch;
        }

        Ok(())
    }
}

/// Finds the master TOC at sector 510, first assuming 2048 byte sectors,
/// then 2064 byte sectors.
fn probe<R: SectorReader>(reader: &mut R) -> Result<(SectorLayout, SacdToc)> {
    let mut buf = vec![0u8; SACD_LSN_SIZE];

    for layout in [SectorLayout::Logical2048, SectorLayout::Physical2064] {
        let offset = layout.sector_offset(START_OF_MASTER_TOC) + layout.lead_in() as u64;
        if let Err(e) = reader.read_at(offset, &mut buf) {
            debug!("Probe at {offset} failed: {e}");
            continue;
        }

        if let Some(toc) = SacdToc::read(&mut ByteCursor::new(&buf)) {
            return Ok((layout, toc));
        }
    }

    bail!(DiscError::UnrecognizedDisc)
}
