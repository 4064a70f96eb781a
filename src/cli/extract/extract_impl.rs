use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use anyhow::{Result, anyhow, bail};
use indicatif::MultiProgress;
use log::Level;

use super::extractor_thread::{ExtractSource, ExtractorThreadConfig, spawn_extractor_thread};
use super::handler::{ExtractHandler, HandlerContext};
use super::progress::{create_progress_bar, finalize_progress_bar};
use crate::cli::command::{Cli, ExtractArgs, ExtractMode};
use crate::input::{InputKind, InputReader};
use sacd::process::disc::Disc;
use sacd::structs::container::DsdStreamInfo;
use sacd::utils::errors::TranscodeError;

pub fn cmd_extract(args: &ExtractArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Extracting: {} (strict mode: {}, mode: {:?})",
        args.input.display(),
        cli.strict,
        args.mode
    );

    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };

    let base_path = args.output_path.clone();
    match &base_path {
        Some(path) => log::info!("Output path specified: {}", path.display()),
        None => log::info!("No output path given, audio is processed but not written"),
    }

    let (source, total, unit) = open_source(args)?;

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, total, unit)?),
        None => None,
    };

    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));

    let extract_thread = spawn_extractor_thread(ExtractorThreadConfig {
        source,
        mode: args.mode,
        fail_level,
        tx,
        pb_clone: pb.clone(),
        cancel: cancel.clone(),
    });

    let mut handler = ExtractHandler::default();
    let start_time = std::time::Instant::now();
    let ctx = HandlerContext {
        base_path: &base_path,
        mode: args.mode,
        pb: &pb,
        start_time,
    };

    while let Ok(result) = rx.recv() {
        let handled = result.and_then(|event| handler.handle_event(event, &ctx));
        if let Err(e) = handled {
            cancel.store(true, Ordering::Relaxed);
            if let Some(pb) = &pb {
                pb.finish_with_message("extraction failed");
            }
            return Err(e);
        }
    }

    handler.finalize()?;

    match extract_thread.join() {
        Ok(Ok(())) => {
            finalize_progress_bar(&pb, handler.audio_duration_secs, start_time);
            log::info!(
                "Extraction completed: {} track(s), {} bytes{}",
                handler.tracks_written,
                handler.bytes_received,
                if handler.dst_frames > 0 {
                    format!(", {} DST frames", handler.dst_frames)
                } else {
                    String::new()
                }
            );
        }
        Ok(Err(e)) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("extraction failed");
            }
            return Err(e);
        }
        Err(_) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("extraction thread panicked");
            }
            return Err(anyhow!("Extraction thread panicked"));
        }
    }

    Ok(())
}

/// Opens the input and checks the requested mode against it before any
/// output is created. Returns the source with its progress total and unit.
fn open_source(args: &ExtractArgs) -> Result<(ExtractSource, u64, &'static str)> {
    let mut input = InputReader::open(&args.input)?;

    match input.kind() {
        InputKind::SacdImage => {
            let disc = Disc::open(input.into_inner(), args.area.into())?;
            let geometry = disc.geometry();
            log::info!(
                "Using {} area: {} channels, {} Hz, {}",
                geometry.kind,
                geometry.channel_count,
                geometry.sample_frequency,
                geometry.frame_format
            );

            if let Some(output) = args.mode.output_mode() {
                if geometry.is_dst() {
                    bail!(
                        "The {} area is DST coded and no DST decoder is available; \
                         use --mode dff to store the DST frames",
                        geometry.kind
                    );
                }
                geometry.stream_format(output)?;
            }

            let tracks = match args.track {
                Some(number) => vec![disc.track(number)?],
                None => disc.tracks(),
            };
            if tracks.is_empty() {
                bail!("The selected area has no tracks");
            }

            let total = tracks.iter().map(|t| t.sector_count() as u64).sum::<u64>();
            let album = disc
                .album_info()
                .and_then(|a| a.title())
                .unwrap_or("Unknown album")
                .to_string();

            Ok((
                ExtractSource::Disc {
                    disc,
                    tracks,
                    album,
                },
                total,
                "sectors",
            ))
        }
        kind @ (InputKind::Dsf | InputKind::Dff) => {
            if args.mode == ExtractMode::Dff {
                bail!("{kind:?} input is already a DSD container; use --mode native or --mode dop");
            }
            if args.track.is_some() {
                log::warn!("--track is ignored for {kind:?} input");
            }

            let info = DsdStreamInfo::read(input.get_mut())?;
            if info.channel_count != 2 {
                bail!(TranscodeError::UnsupportedChannelCount(info.channel_count));
            }
            log::info!(
                "{kind:?} file: {} channels, {} Hz, {} bytes of audio",
                info.channel_count,
                info.sample_rate,
                info.data_length
            );

            let total = info.data_length;
            Ok((ExtractSource::Container { input, info }, total, "bytes"))
        }
    }
}
