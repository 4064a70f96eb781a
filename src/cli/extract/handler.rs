use std::path::PathBuf;

use anyhow::Result;
use indicatif::ProgressBar;
use sacd::process::transcode::{OutputMode, SourceLayout, StreamFormat};
use sacd::structs::scarlet_book::SACD_FRAME_RATE;

use super::extractor_thread::{ExtractEvent, TrackJob};
use super::output::{AudioWriter, create_track_path};
use crate::cli::command::ExtractMode;
use crate::timestamp::time_str;

/// Events between progress message refreshes.
const MESSAGE_INTERVAL: u64 = 64;

pub struct HandlerContext<'a> {
    pub base_path: &'a Option<PathBuf>,
    pub mode: ExtractMode,
    pub pb: &'a Option<ProgressBar>,
    pub start_time: std::time::Instant,
}

/// Writer side of an extraction: one output file per track.
#[derive(Default)]
pub struct ExtractHandler {
    writer: Option<AudioWriter>,
    current_path: Option<PathBuf>,
    current_job: Option<TrackJob>,
    events: u64,
    pub tracks_written: usize,
    pub bytes_received: u64,
    pub dst_frames: u64,
    pub audio_duration_secs: f64,
}

impl ExtractHandler {
    pub fn handle_event(&mut self, event: ExtractEvent, ctx: &HandlerContext) -> Result<()> {
        match event {
            ExtractEvent::TrackStart(job) => self.start_track(job, ctx)?,
            ExtractEvent::Audio(data) => {
                self.bytes_received += data.len() as u64;
                if let Some(job) = &self.current_job {
                    self.audio_duration_secs += audio_secs(job, ctx.mode, data.len());
                }
                if let Some(writer) = &mut self.writer {
                    writer.write_audio(&data)?;
                }
            }
            ExtractEvent::DstFrame(frame) => {
                self.bytes_received += frame.len() as u64;
                self.dst_frames += 1;
                self.audio_duration_secs += 1.0 / SACD_FRAME_RATE as f64;
                if let Some(writer) = &mut self.writer {
                    writer.write_dst_frame(&frame)?;
                }
            }
            ExtractEvent::TrackEnd => self.end_track()?,
        }

        self.events += 1;
        if self.events.is_multiple_of(MESSAGE_INTERVAL) {
            self.update_message(ctx);
        }
        Ok(())
    }

    /// Closes a writer left open by an interrupted stream.
    pub fn finalize(&mut self) -> Result<()> {
        if self.current_job.is_some() {
            log::warn!("Stream ended inside a track, closing the partial output");
            self.end_track()?;
        }
        Ok(())
    }

    fn start_track(&mut self, job: TrackJob, ctx: &HandlerContext) -> Result<()> {
        self.finalize()?;

        if let Some(base_path) = ctx.base_path {
            let path = create_track_path(base_path, ctx.mode, job.output_index);
            log::info!("Creating audio file: {}", path.display());

            let writer = match ctx.mode {
                ExtractMode::Dff => {
                    AudioWriter::create_dff(&path, job.sample_rate, job.channel_count, job.dst)?
                }
                ExtractMode::Native => AudioWriter::create_native(&path)?,
                ExtractMode::Dop => {
                    let rate = StreamFormat::new(SourceLayout::Sacd, OutputMode::Dop)
                        .output_rate(job.sample_rate);
                    AudioWriter::create_w64(&path, rate, job.channel_count)?
                }
            };
            self.writer = Some(writer);
            self.current_path = Some(path);
        }

        self.current_job = Some(job);
        Ok(())
    }

    fn end_track(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.finish()?;
            if let Some(path) = self.current_path.take() {
                log::debug!("Finished {}", path.display());
            }
        }
        if self.current_job.take().is_some() {
            self.tracks_written += 1;
        }
        Ok(())
    }

    fn update_message(&self, ctx: &HandlerContext) {
        if let Some(pb) = ctx.pb {
            let elapsed = ctx.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let realtime_multiplier = self.audio_duration_secs / elapsed;
                pb.set_message(format!(
                    "speed: {realtime_multiplier:.1}x | timestamp: {}",
                    time_str(self.audio_duration_secs)
                ));
            }
        }
    }
}

/// Playing time of one delivered buffer.
fn audio_secs(job: &TrackJob, mode: ExtractMode, len: usize) -> f64 {
    let bytes_per_sec = job.sample_rate as f64 / 8.0 * job.channel_count as f64;
    if bytes_per_sec == 0.0 {
        return 0.0;
    }
    let expansion = match mode {
        ExtractMode::Dop => 2.0,
        ExtractMode::Dff | ExtractMode::Native => 1.0,
    };
    len as f64 / expansion / bytes_per_sec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> TrackJob {
        TrackJob {
            output_index: Some(1),
            title: "Test".to_string(),
            sample_rate: 2_822_400,
            channel_count: 2,
            dst: false,
        }
    }

    #[test]
    fn test_audio_secs() {
        assert_eq!(audio_secs(&job(), ExtractMode::Native, 705_600), 1.0);
        assert_eq!(audio_secs(&job(), ExtractMode::Dop, 705_600), 0.5);
    }

    #[test]
    fn test_counts_without_output() -> Result<()> {
        let base_path = None;
        let ctx = HandlerContext {
            base_path: &base_path,
            mode: ExtractMode::Dff,
            pb: &None,
            start_time: std::time::Instant::now(),
        };

        let mut handler = ExtractHandler::default();
        handler.handle_event(ExtractEvent::TrackStart(job()), &ctx)?;
        handler.handle_event(ExtractEvent::DstFrame(vec![0; 15]), &ctx)?;
        handler.handle_event(ExtractEvent::TrackEnd, &ctx)?;
        handler.handle_event(ExtractEvent::TrackStart(job()), &ctx)?;
        handler.handle_event(ExtractEvent::Audio(vec![0; 8]), &ctx)?;
        handler.finalize()?;

        assert_eq!(handler.tracks_written, 2);
        assert_eq!(handler.dst_frames, 1);
        assert_eq!(handler.bytes_received, 23);
        Ok(())
    }
}
