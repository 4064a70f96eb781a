#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Parser and audio pipeline for Super Audio CD (Scarlet Book) disc images
//! and DSD files.
//!
//! ### Disc Organization
//!
//! **Sectors**: 2048 byte logical sectors, or 2064 byte physical sectors
//! carrying a 12 byte lead-in. The master TOC sits at sector 510.
//! **Areas**: up to two audio areas (stereo and multichannel), each with its
//! own TOC, track lists and track text.
//!
//! ### Audio Sectors
//!
//! Each audio sector starts with a frame header, packet and frame
//! descriptors, followed by packet payloads. Audio is stored either as
//! plain DSD (3-in-14 or 3-in-16 sector packing) or as DST compressed
//! frames that may span several packets and sectors.
//!
//! ### Output
//!
//! - Native DSD: 32-bit big-endian words per channel
//! - DoP: DSD bits carried in 24-bit PCM samples with alternating markers
//!
//! ## Quick Start
//!
//! 1. Open an image with [`process::disc::Disc`]
//! 2. Build a [`process::demux::Demultiplexer`] from the area geometry
//! 3. Stream track sectors through it into a sink
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! use sacd::process::disc::{AreaPreference, Disc};
//! use sacd::process::transcode::OutputMode;
//!
//! let mut disc = Disc::open(File::open("album.iso")?, AreaPreference::Stereo)?;
//!
//! for track in disc.tracks() {
//!     println!("{:02} {}", track.number, track.display_title("album"));
//! }
//!
//! let cancel = Arc::new(AtomicBool::new(false));
//! let mut demux = disc
//!     .geometry()
//!     .demultiplexer(OutputMode::Dop, None, cancel)?;
//!
//! let mut dop = Vec::new();
//! disc.read_track_sectors(1, &mut |sector| {
//!     demux.process_sector(sector, &mut |words| dop.extend_from_slice(words))
//! })?;
//! demux.finish(&mut |words| dop.extend_from_slice(words))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Disc access and the audio pipeline.
///
/// 1. **Disc** ([`process::disc`]): Sector size probe, TOC and track tables.
///
/// 2. **Demultiplexing** ([`process::demux`]): Splits audio sectors into
///    packets and routes them.
///
/// 3. **Reassembly** ([`process::reassemble`]): Joins DST packets into frames
///    for an external decoder.
///
/// 4. **Transcoding** ([`process::transcode`]): Native and DoP output.
pub mod process;

/// Data structures representing Scarlet Book and DSD container components.
///
/// - **Master TOC** ([`structs::master_toc`]): Disc and album identification
/// - **Area TOC** ([`structs::area_toc`]): Per-area audio parameters
/// - **Master Text** ([`structs::album_info`]): Album and disc strings
/// - **Track Lists** ([`structs::track_info`]): Offsets, times and text
/// - **Audio Sectors** ([`structs::audio_sector`]): Frame and packet descriptors
/// - **Containers** ([`structs::container`]): DSF and DFF headers
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Byte Cursor** ([`utils::byte_cursor`]): Positional big/little-endian reads
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **Bit Reversal** ([`utils::bit_reverse`]): LSB/MSB-first conversion
/// - **Text** ([`utils::text`]): Character set decoding
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Buffer Management** ([`utils::buffer_pool`]): Memory allocation
pub mod utils;
