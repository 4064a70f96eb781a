use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use log::{error, trace};

use crate::log_or_err;
use crate::process::transcode::Transcoder;
use crate::structs::scarlet_book::DST_FRAME_OUTPUT_SIZE;
use crate::utils::buffer_pool::BufferPool;
use crate::utils::errors::DemuxError;

/// External DST decoder.
///
/// Implementations are usually stateful and must see frames in order:
/// `frame_index` strictly increases by one per call, starting at 1.
pub trait DstDecompressor: Send {
    fn decode(&mut self, frame: &[u8], frame_size: usize, frame_index: u32) -> Result<Vec<u8>>;

    /// Size of every decoded buffer.
    fn output_size(&self) -> usize {
        DST_FRAME_OUTPUT_SIZE
    }
}

/// A complete compressed DST frame.
#[derive(Debug)]
pub struct DstFrame {
    pub data: Vec<u8>,
    /// Sum of the packet lengths that made up the frame.
    pub frame_size: usize,
    pub frame_index: u32,
}

impl AsRef<[u8]> for DstFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug)]
pub struct ReassemblerState {
    pub fail_level: log::Level,
    buffer: Vec<u8>,
    /// Zero when no frame is pending. A frame that starts with an empty
    /// packet therefore stays closed and its continuations are orphans.
    declared_frame_size: usize,
    frame_index: u32,
}

impl Default for ReassemblerState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            buffer: Vec::new(),
            declared_frame_size: 0,
            frame_index: 0,
        }
    }
}

/// Joins the AUDIO packets of a DST coded area into whole frames.
///
/// A packet flagged `frame_start` completes the frame in progress (if any)
/// and opens a new one; other packets extend the open frame.
#[derive(Debug, Default)]
pub struct DstReassembler {
    pool: BufferPool,
    state: ReassemblerState,
}

impl DstReassembler {
    pub fn new(pool: BufferPool) -> Self {
        Self {
            pool,
            state: ReassemblerState::default(),
        }
    }

    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }

    pub fn is_pending(&self) -> bool {
        self.state.declared_frame_size != 0
    }

    pub fn declared_frame_size(&self) -> usize {
        self.state.declared_frame_size
    }

    /// Index of the last frame handed out.
    pub fn frame_index(&self) -> u32 {
        self.state.frame_index
    }

    /// Feeds one AUDIO packet and returns the frame it completed, if any.
    pub fn push(&mut self, frame_start: bool, payload: &[u8]) -> Result<Option<DstFrame>> {
        let state = &mut self.state;

        if !frame_start {
            if state.declared_frame_size == 0 {
                log_or_err!(
                    state,
                    log::Level::Warn,
                    anyhow::anyhow!(DemuxError::OrphanContinuation(payload.len()))
                );
                return Ok(None);
            }

            state.buffer.extend_from_slice(payload);
            state.declared_frame_size += payload.len();
            return Ok(None);
        }

        let completed = self.take_pending();

        let state = &mut self.state;
        if state.buffer.capacity() == 0 {
            state.buffer = self.pool.acquire();
        }
        state.buffer.extend_from_slice(payload);
        state.declared_frame_size = payload.len();

        Ok(completed)
    }

    /// Hands out the frame still open at end of stream.
    pub fn finish(&mut self) -> Option<DstFrame> {
        self.take_pending()
    }

    /// Drops any open frame. The frame index keeps counting so a stateful
    /// decoder stays in step.
    pub fn reset(&mut self) {
        self.state.buffer.clear();
        self.state.declared_frame_size = 0;
    }

    /// Returns a frame buffer to the pool once the caller is done with it.
    pub fn recycle(&self, frame: DstFrame) {
        self.pool.release(frame.data);
    }

    fn take_pending(&mut self) -> Option<DstFrame> {
        let state = &mut self.state;
        if state.declared_frame_size == 0 {
            return None;
        }

        state.frame_index += 1;
        let frame = DstFrame {
            data: std::mem::replace(&mut state.buffer, self.pool.acquire()),
            frame_size: state.declared_frame_size,
            frame_index: state.frame_index,
        };
        state.declared_frame_size = 0;

        trace!(
            "DST frame {} complete: {} bytes",
            frame.frame_index, frame.frame_size
        );

        Some(frame)
    }
}

/// Reassembler, decoder and transcoder chained for one DST coded area.
pub struct DstPipeline {
    reassembler: DstReassembler,
    decompressor: Box<dyn DstDecompressor>,
    transcoder: Transcoder,
    cancel: Arc<AtomicBool>,
    delivered: u64,
    dropped: u64,
}

impl DstPipeline {
    pub fn new(
        decompressor: Box<dyn DstDecompressor>,
        transcoder: Transcoder,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reassembler: DstReassembler::default(),
            decompressor,
            transcoder,
            cancel,
            delivered: 0,
            dropped: 0,
        }
    }

    pub fn set_fail_level(&mut self, level: log::Level) {
        self.reassembler.set_fail_level(level);
    }

    pub fn reassembler(&self) -> &DstReassembler {
        &self.reassembler
    }

    /// Frames handed to the sink so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Frames lost to decoder errors or cancellation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(
        &mut self,
        frame_start: bool,
        payload: &[u8],
        sink: &mut dyn FnMut(&[u8]),
    ) -> Result<()> {
        if let Some(frame) = self.reassembler.push(frame_start, payload)? {
            self.deliver(frame, sink)?;
        }
        Ok(())
    }

    pub fn finish(&mut self, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
        if let Some(frame) = self.reassembler.finish() {
            self.deliver(frame, sink)?;
        }
        self.transcoder.flush();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.reassembler.reset();
        self.transcoder.reset();
    }

    fn deliver(&mut self, frame: DstFrame, sink: &mut dyn FnMut(&[u8])) -> Result<()> {
        let decoded = self
            .decompressor
            .decode(&frame.data, frame.frame_size, frame.frame_index);
        let frame_index = frame.frame_index;
        self.reassembler.recycle(frame);

        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                error!("DST frame {frame_index} failed to decode: {e:#}");
                self.dropped += 1;
                return Ok(());
            }
        };

        if self.cancel.load(Ordering::Relaxed) {
            trace!("Cancelled, discarding DST frame {frame_index}");
            self.dropped += 1;
            return Ok(());
        }

        self.transcoder.push(&decoded, sink)?;
        self.delivered += 1;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::process::transcode::{OutputMode, SourceLayout, StreamFormat};

    /// Records every call and returns a buffer filled with the frame index.
    #[derive(Clone, Default)]
    pub struct RecordingDecompressor {
        pub calls: Arc<Mutex<Vec<(usize, usize, u32)>>>,
        pub fail_on: Option<u32>,
    }

    impl DstDecompressor for RecordingDecompressor {
        fn decode(&mut self, frame: &[u8], frame_size: usize, frame_index: u32) -> Result<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .push((frame.len(), frame_size, frame_index));
            if self.fail_on == Some(frame_index) {
                anyhow::bail!("corrupt frame");
            }
            Ok(vec![frame_index as u8; 16])
        }

        fn output_size(&self) -> usize {
            16
        }
    }

    #[test]
    fn test_frame_spanning_packets() -> Result<()> {
        let mut reassembler = DstReassembler::default();

        assert!(reassembler.push(true, &[1; 10])?.is_none());
        assert!(reassembler.push(false, &[2; 5])?.is_none());
        assert_eq!(reassembler.declared_frame_size(), 15);

        let frame = reassembler.push(true, &[3; 8])?.expect("first frame");
        assert_eq!(frame.frame_size, 15);
        assert_eq!(frame.frame_index, 1);
        assert_eq!(&frame.data[..10], &[1; 10]);
        assert_eq!(&frame.data[10..], &[2; 5]);
        reassembler.recycle(frame);

        assert!(reassembler.is_pending());
        assert_eq!(reassembler.declared_frame_size(), 8);

        let last = reassembler.finish().expect("second frame");
        assert_eq!(last.frame_index, 2);
        assert_eq!(last.data, vec![3; 8]);
        assert!(reassembler.finish().is_none());
        Ok(())
    }

    #[test]
    fn test_orphan_continuation() -> Result<()> {
        let mut reassembler = DstReassembler::default();
        assert!(reassembler.push(false, &[0; 4])?.is_none());
        assert!(!reassembler.is_pending());

        reassembler.set_fail_level(log::Level::Warn);
        assert!(reassembler.push(false, &[0; 4]).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_frame_start_stays_closed() -> Result<()> {
        let mut reassembler = DstReassembler::default();
        assert!(reassembler.push(true, &[])?.is_none());
        assert!(!reassembler.is_pending());
        assert!(reassembler.push(false, &[9; 4])?.is_none());
        assert_eq!(reassembler.declared_frame_size(), 0);

        assert!(reassembler.push(true, &[3; 2])?.is_none());
        let frame = reassembler.finish().expect("frame");
        assert_eq!(frame.as_ref(), &[3, 3]);
        assert_eq!(frame.frame_index, 1);
        Ok(())
    }

    #[test]
    fn test_reset_keeps_index() -> Result<()> {
        let mut reassembler = DstReassembler::default();
        reassembler.push(true, &[0; 4])?;
        reassembler.push(true, &[0; 4])?;
        reassembler.reset();
        assert!(reassembler.finish().is_none());

        reassembler.push(true, &[0; 4])?;
        assert_eq!(reassembler.finish().map(|f| f.frame_index), Some(2));
        Ok(())
    }

    fn pipeline(decoder: RecordingDecompressor, cancel: Arc<AtomicBool>) -> DstPipeline {
        DstPipeline::new(
            Box::new(decoder),
            Transcoder::new(StreamFormat::new(SourceLayout::Sacd, OutputMode::Native)),
            cancel,
        )
    }

    #[test]
    fn test_pipeline_single_decode() -> Result<()> {
        let decoder = RecordingDecompressor::default();
        let calls = decoder.calls.clone();
        let mut pipeline = pipeline(decoder, Arc::new(AtomicBool::new(false)));

        let mut out = Vec::new();
        let mut sink = |b: &[u8]| out.push(b.to_vec());
        pipeline.push(true, &[0; 10], &mut sink)?;
        pipeline.push(false, &[0; 5], &mut sink)?;
        pipeline.push(true, &[0; 8], &mut sink)?;

        assert_eq!(*calls.lock().unwrap(), vec![(15, 15, 1)]);
        assert!(pipeline.reassembler().is_pending());

        pipeline.finish(&mut sink)?;
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec![2; 16]);
        Ok(())
    }

    #[test]
    fn test_pipeline_drops_failed_frames() -> Result<()> {
        let decoder = RecordingDecompressor {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut pipeline = pipeline(decoder, Arc::new(AtomicBool::new(false)));

        let mut delivered = 0;
        let mut sink = |_: &[u8]| delivered += 1;
        for _ in 0..3 {
            pipeline.push(true, &[0; 4], &mut sink)?;
        }
        pipeline.finish(&mut sink)?;

        assert_eq!(delivered, 2);
        assert_eq!(pipeline.dropped(), 1);
        Ok(())
    }

    #[test]
    fn test_pipeline_cancel_still_decodes() -> Result<()> {
        let decoder = RecordingDecompressor::default();
        let calls = decoder.calls.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let mut pipeline = pipeline(decoder, cancel.clone());

        let mut delivered = 0;
        let mut sink = |_: &[u8]| delivered += 1;
        pipeline.push(true, &[0; 4], &mut sink)?;
        cancel.store(true, Ordering::Relaxed);
        pipeline.push(true, &[0; 4], &mut sink)?;
        pipeline.finish(&mut sink)?;

        assert_eq!(delivered, 0);
        let indices: Vec<u32> = calls.lock().unwrap().iter().map(|c| c.2).collect();
        assert_eq!(indices, vec![1, 2]);
        Ok(())
    }
}
