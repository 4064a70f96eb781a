#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum DiscError {
    #[error("No master TOC found at sector 510 for either 2048 or 2064 byte sectors")]
    UnrecognizedDisc,

    #[error("Master TOC does not reference a {0} area")]
    MissingArea(&'static str),

    #[error("Area TOC at sector {0} has an unexpected signature")]
    InvalidAreaToc(u32),

    #[error("Track {requested} out of range, area has {available} tracks")]
    TrackOutOfRange { requested: usize, available: usize },

    #[error("Track {0} has an empty sector range")]
    EmptyTrack(usize),

    #[error("Sector range of {count} sectors from {start} runs past the last addressable sector")]
    SectorRangeOverflow { start: u32, count: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    #[error("Packet info table truncated at byte {index} of {length}")]
    TruncatedPacketInfo { index: usize, length: usize },

    #[error("Frame info truncated at byte {index} of {length}")]
    TruncatedFrameInfo { index: usize, length: usize },

    #[error("Packet of {packet_length} bytes at byte {index} overruns sector of {length}")]
    PacketOverrun {
        index: usize,
        packet_length: usize,
        length: usize,
    },

    #[error("DST packet continues a frame that was never started ({0} bytes dropped)")]
    OrphanContinuation(usize),

    #[error("DST coded area requires a DST decompressor")]
    MissingDecompressor,
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("{name} record truncated: need {needed} bytes, have {available}")]
    Truncated {
        name: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Track text offset {offset} for track {track} lies outside the text area")]
    TrackTextOutOfRange { track: usize, offset: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Destination buffer too small: need {needed} bytes, have {available}")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("DSF block size must be a non-zero multiple of 4, got {0}")]
    InvalidBlockSize(usize),

    #[error("Only stereo streams can be transcoded, got {0} channels")]
    UnsupportedChannelCount(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum ContainerError {
    #[error("Unknown container signature {0:?}")]
    UnknownSignature([u8; 4]),

    #[error("Missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("Compressed DSDIFF payload ({0:?}) is not supported")]
    CompressedPayload([u8; 4]),

    #[error("Unsupported DSF bits per sample: {0}")]
    InvalidBitsPerSample(u32),

    #[error("DSF block size per channel must be a non-zero multiple of 4, got {0}")]
    InvalidBlockSize(u32),

    #[error("Chunk {id:?} of {size} bytes at offset {offset} overruns the file")]
    ChunkOverflow { id: [u8; 4], offset: u64, size: u64 },
}
