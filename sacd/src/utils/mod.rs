//! Utility functions and supporting infrastructure.
//!
//! Provides positional byte reading for TOC records, bit-level reading for
//! audio sector descriptors, bit reversal for LSB-first DSD, error types and
//! buffer management for DST frame reassembly.

pub mod bit_reverse;
pub mod bitstream_io;
pub mod buffer_pool;
pub mod byte_cursor;
pub mod errors;
pub mod text;
