use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use anyhow::{Result, anyhow};
use indicatif::ProgressBar;
use log::Level;

use crate::cli::command::ExtractMode;
use crate::input::InputReader;
use sacd::process::demux::{DemuxState, split_sector};
use sacd::process::disc::{AreaGeometry, Disc, TrackInfo};
use sacd::process::reassemble::DstReassembler;
use sacd::process::transcode::{OutputMode, SourceLayout, StreamFormat, Transcoder};
use sacd::structs::container::{ContainerKind, DsdStreamInfo};
use sacd::utils::buffer_pool::BufferPool;

const CHUNK_SIZE: usize = 64 * 1024;

/// Describes the file the writer side opens for the next track.
#[derive(Debug, Clone)]
pub struct TrackJob {
    /// Track number added to the output name, `None` for a single output.
    pub output_index: Option<usize>,
    pub title: String,
    /// DSD sampling frequency.
    pub sample_rate: u32,
    pub channel_count: u32,
    pub dst: bool,
}

#[derive(Debug)]
pub enum ExtractEvent {
    TrackStart(TrackJob),
    /// Transcoded or raw DSD, depending on the mode.
    Audio(Vec<u8>),
    DstFrame(Vec<u8>),
    TrackEnd,
}

pub enum ExtractSource {
    Disc {
        disc: Disc<BufReader<File>>,
        tracks: Vec<TrackInfo>,
        album: String,
    },
    Container {
        input: InputReader<BufReader<File>>,
        info: DsdStreamInfo,
    },
}

pub struct ExtractorThreadConfig {
    pub source: ExtractSource,
    pub mode: ExtractMode,
    pub fail_level: Level,
    pub tx: mpsc::Sender<Result<ExtractEvent>>,
    pub pb_clone: Option<ProgressBar>,
    pub cancel: Arc<AtomicBool>,
}

/// Forwards events to the writer. A closed channel raises the cancel flag
/// so the reading loops stop at the next sector or chunk.
struct EventSender<'a> {
    tx: &'a mpsc::Sender<Result<ExtractEvent>>,
    cancel: &'a AtomicBool,
}

impl EventSender<'_> {
    fn send(&self, event: ExtractEvent) {
        if self.tx.send(Ok(event)).is_err() {
            self.cancel.store(true, Ordering::Relaxed);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancelled() {
            return Err(anyhow!("Extraction cancelled"));
        }
        Ok(())
    }
}

pub fn spawn_extractor_thread(config: ExtractorThreadConfig) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || -> Result<()> {
        let ExtractorThreadConfig {
            source,
            mode,
            fail_level,
            tx,
            pb_clone,
            cancel,
        } = config;

        let sender = EventSender {
            tx: &tx,
            cancel: &cancel,
        };

        let result = match source {
            ExtractSource::Disc {
                mut disc,
                tracks,
                album,
            } => extract_disc(&mut disc, &tracks, &album, mode, fail_level, &sender, &pb_clone),
            ExtractSource::Container { mut input, info } => {
                extract_container(&mut input, &info, mode, &sender, &pb_clone)
            }
        };

        match result {
            Err(_) if sender.cancelled() => {
                log::debug!("Writer stopped, extraction cancelled");
                Ok(())
            }
            Err(e) => match tx.send(Err(e)) {
                Err(mpsc::SendError(Err(e))) => Err(e),
                _ => Ok(()),
            },
            Ok(()) => Ok(()),
        }
    })
}

fn extract_disc(
    disc: &mut Disc<BufReader<File>>,
    tracks: &[TrackInfo],
    album: &str,
    mode: ExtractMode,
    fail_level: Level,
    sender: &EventSender,
    pb: &Option<ProgressBar>,
) -> Result<()> {
    let geometry = disc.geometry();
    let numbered = tracks.len() > 1;
    let mut sectors_done = 0u64;

    for track in tracks {
        sender.ensure_running()?;

        let title = track.display_title(album);
        log::info!(
            "Track {}: {} / {} ({}, {} sectors)",
            track.number,
            title,
            track.display_performer(),
            track.duration,
            track.sector_count()
        );
        if let Some(pb) = pb {
            pb.set_message(format!("track {}: {title}", track.number));
        }

        sender.send(ExtractEvent::TrackStart(TrackJob {
            output_index: numbered.then_some(track.number),
            title,
            sample_rate: geometry.sample_frequency,
            channel_count: geometry.channel_count,
            dst: geometry.is_dst(),
        }));

        let mut on_sector = || -> Result<()> {
            sectors_done += 1;
            if let Some(pb) = pb {
                pb.set_position(sectors_done);
            }
            sender.ensure_running()
        };

        match mode.output_mode() {
            Some(output) => {
                transcode_track(disc, &geometry, track, output, fail_level, sender, &mut on_sector)?
            }
            None if geometry.is_dst() => {
                dst_frames_track(disc, track, fail_level, sender, &mut on_sector)?
            }
            None => raw_track(disc, track, fail_level, sender, &mut on_sector)?,
        }

        sender.send(ExtractEvent::TrackEnd);
    }

    log::info!("Processing complete: {} tracks, {sectors_done} sectors", tracks.len());
    Ok(())
}

fn transcode_track(
    disc: &mut Disc<BufReader<File>>,
    geometry: &AreaGeometry,
    track: &TrackInfo,
    output: OutputMode,
    fail_level: Level,
    sender: &EventSender,
    on_sector: &mut dyn FnMut() -> Result<()>,
) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let mut demux = geometry.demultiplexer(output, None, cancel)?;
    demux.set_fail_level(fail_level);

    let mut emit = |buf: &[u8]| sender.send(ExtractEvent::Audio(buf.to_vec()));

    disc.read_track_sectors(track.number, &mut |sector| {
        demux.process_sector(sector, &mut emit)?;
        on_sector()
    })?;
    demux.finish(&mut emit)?;

    log::debug!(
        "Track {}: {} sectors demultiplexed",
        track.number,
        demux.sectors_processed()
    );
    Ok(())
}

/// Plain DSD areas store DFF ordered bytes, so payloads are written as is.
fn raw_track(
    disc: &mut Disc<BufReader<File>>,
    track: &TrackInfo,
    fail_level: Level,
    sender: &EventSender,
    on_sector: &mut dyn FnMut() -> Result<()>,
) -> Result<()> {
    let state = DemuxState {
        fail_level,
        ..DemuxState::default()
    };

    disc.read_track_sectors(track.number, &mut |sector| {
        let packets = split_sector(&state, sector)?;
        let audio: Vec<u8> = packets
            .audio()
            .filter(|p| !p.dst_encoded)
            .flat_map(|p| p.payload.iter().copied())
            .collect();
        if !audio.is_empty() {
            sender.send(ExtractEvent::Audio(audio));
        }
        on_sector()
    })
}

/// Reassembles DST frames and passes them on undecoded.
fn dst_frames_track(
    disc: &mut Disc<BufReader<File>>,
    track: &TrackInfo,
    fail_level: Level,
    sender: &EventSender,
    on_sector: &mut dyn FnMut() -> Result<()>,
) -> Result<()> {
    let state = DemuxState {
        fail_level,
        ..DemuxState::default()
    };
    let mut reassembler = DstReassembler::new(BufferPool::default());
    reassembler.set_fail_level(fail_level);

    disc.read_track_sectors(track.number, &mut |sector| {
        let packets = split_sector(&state, sector)?;
        for packet in packets.audio().filter(|p| p.dst_encoded) {
            if let Some(frame) = reassembler.push(packet.info.frame_start, packet.payload)? {
                sender.send(ExtractEvent::DstFrame(frame.as_ref().to_vec()));
                reassembler.recycle(frame);
            }
        }
        on_sector()
    })?;

    if let Some(frame) = reassembler.finish() {
        sender.send(ExtractEvent::DstFrame(frame.as_ref().to_vec()));
        reassembler.recycle(frame);
    }

    log::debug!(
        "Track {}: {} DST frames",
        track.number,
        reassembler.frame_index()
    );
    Ok(())
}

fn extract_container(
    input: &mut InputReader<BufReader<File>>,
    info: &DsdStreamInfo,
    mode: ExtractMode,
    sender: &EventSender,
    pb: &Option<ProgressBar>,
) -> Result<()> {
    let output = mode
        .output_mode()
        .ok_or_else(|| anyhow!("DSF/DFF input can only be converted to native DSD or DoP"))?;

    let source = match info.kind {
        ContainerKind::Dff => SourceLayout::Dff,
        ContainerKind::Dsf => SourceLayout::Dsf {
            lsb_first: info.lsb_first,
            block_size_per_channel: info.block_size_per_channel,
        },
    };
    let mut transcoder = Transcoder::new(StreamFormat::new(source, output));

    sender.send(ExtractEvent::TrackStart(TrackJob {
        output_index: None,
        title: String::new(),
        sample_rate: info.sample_rate,
        channel_count: info.channel_count,
        dst: false,
    }));

    let mut emit = |buf: &[u8]| sender.send(ExtractEvent::Audio(buf.to_vec()));
    let mut bytes_read = 0u64;

    input.process_chunks(info.data_offset, info.data_length, CHUNK_SIZE, |chunk| {
        transcoder.push(chunk, &mut emit)?;
        bytes_read += chunk.len() as u64;
        if let Some(pb) = pb {
            pb.set_position(bytes_read);
        }
        Ok(!sender.cancelled())
    })?;
    transcoder.flush();

    sender.ensure_running()?;
    sender.send(ExtractEvent::TrackEnd);

    log::info!("Processing complete: {bytes_read} bytes");
    Ok(())
}
