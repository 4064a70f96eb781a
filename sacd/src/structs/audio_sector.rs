//! Audio sector descriptors.
//!
//! Every audio sector starts with a one byte frame header, followed by up to
//! six 2-byte packet descriptors and a number of 3 or 4 byte frame
//! descriptors. Packet payloads follow back to back.
//!
//! ## Frame header
//!
//! Two bit layouts are in use. In the LSB-first layout `dst_encoded` is
//! bit 0, the reserved flag bit 1, `frame_info_count` bits 2-4 and
//! `packet_info_count` bits 5-7. The MSB-first layout mirrors it.
//!
//! ## Packet descriptor (16 bits, MSB first)
//!
//! ```text
//! frame_start:1 reserved:1 data_type:3 packet_length:11
//! ```

use std::io;

use crate::structs::scarlet_book::AudioPacketDataType;
use crate::structs::track_time::TrackTime;
use crate::utils::bitstream_io::BsIoSliceReader;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFrameHeader {
    pub dst_encoded: bool,
    pub reserved: bool,
    pub frame_info_count: u8,
    pub packet_info_count: u8,
}

impl AudioFrameHeader {
    pub fn from_little_endian_byte(byte: u8) -> Self {
        Self {
            dst_encoded: byte & 0x01 != 0,
            reserved: byte & 0x02 != 0,
            frame_info_count: (byte >> 2) & 0x07,
            packet_info_count: (byte >> 5) & 0x07,
        }
    }

    pub fn from_big_endian_byte(byte: u8) -> Self {
        Self {
            dst_encoded: byte & 0x80 != 0,
            reserved: byte & 0x40 != 0,
            frame_info_count: (byte >> 3) & 0x07,
            packet_info_count: byte & 0x07,
        }
    }

    pub fn from_byte(byte: u8, big_endian: bool) -> Self {
        if big_endian {
            Self::from_big_endian_byte(byte)
        } else {
            Self::from_little_endian_byte(byte)
        }
    }

    pub fn to_little_endian_byte(&self) -> u8 {
        (self.dst_encoded as u8)
            | (self.reserved as u8) << 1
            | (self.frame_info_count & 0x07) << 2
            | (self.packet_info_count & 0x07) << 5
    }

    pub fn to_big_endian_byte(&self) -> u8 {
        (self.dst_encoded as u8) << 7
            | (self.reserved as u8) << 6
            | (self.frame_info_count & 0x07) << 3
            | (self.packet_info_count & 0x07)
    }

    pub fn to_byte(&self, big_endian: bool) -> u8 {
        if big_endian {
            self.to_big_endian_byte()
        } else {
            self.to_little_endian_byte()
        }
    }

    /// Size of each frame descriptor following this header.
    pub fn frame_info_size(&self) -> usize {
        if self.dst_encoded { 4 } else { 3 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioPacketInfo {
    pub frame_start: bool,
    pub data_type: AudioPacketDataType,
    pub packet_length: u16,
}

impl AudioPacketInfo {
    pub const SIZE: usize = 2;

    pub fn read(reader: &mut BsIoSliceReader) -> io::Result<Self> {
        let frame_start = reader.get()?;
        reader.skip_n(1)?;
        let data_type = AudioPacketDataType::from(reader.get_n::<u8>(3)?);
        let packet_length = reader.get_n(11)?;

        Ok(Self {
            frame_start,
            data_type,
            packet_length,
        })
    }

    pub fn from_bytes(b1: u8, b2: u8) -> Self {
        Self {
            frame_start: b1 & 0x80 != 0,
            data_type: AudioPacketDataType::from((b1 >> 3) & 0x07),
            packet_length: ((b1 as u16 & 0x07) << 8) | b2 as u16,
        }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        let len = self.packet_length & 0x07FF;
        [
            (self.frame_start as u8) << 7 | self.data_type.code() << 3 | (len >> 8) as u8,
            len as u8,
        ]
    }
}

/// Channel layout hint carried by DST frame descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFrameInfo {
    pub time_code: TrackTime,
    pub channel_bit_2: bool,
    pub channel_bit_3: bool,
    /// Sectors spanned by the frame; only coded for DST frames.
    pub sector_count: u8,
}

impl AudioFrameInfo {
    pub fn read(reader: &mut BsIoSliceReader, dst_encoded: bool) -> io::Result<Self> {
        let time_code = TrackTime::new(reader.get_n(8)?, reader.get_n(8)?, reader.get_n(8)?);

        if !dst_encoded {
            return Ok(Self {
                time_code,
                ..Default::default()
            });
        }

        let extra: u8 = reader.get_n(8)?;
        Ok(Self {
            time_code,
            channel_bit_3: extra & 0x01 != 0,
            channel_bit_2: extra & 0x02 != 0,
            sector_count: (extra >> 2) & 0x1F,
        })
    }

    pub fn channel_count(&self) -> u32 {
        match (self.channel_bit_2, self.channel_bit_3) {
            (true, false) => 6,
            (false, true) => 5,
            _ => 2,
        }
    }
}
