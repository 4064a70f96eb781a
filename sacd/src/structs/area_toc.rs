//! Area TOC (`TWOCHTOC` / `MULCHTOC`).
//!
//! Describes one audio area: sample rate, frame format, channel layout, the
//! sector range holding audio and where the track tables live. List offsets
//! (track text, index list, access list) count sectors from the start of the
//! area TOC; text offsets count bytes from the start of the record.

use std::fmt::{Display, Formatter};

use log::trace;

use crate::structs::master_toc::{LocaleTable, Version, read_locales};
use crate::structs::scarlet_book::{
    CharacterSet, FrameFormat, MULTI_CHANNEL_TOC_SIGN, TWO_CHANNEL_TOC_SIGN,
};
use crate::structs::track_time::TrackTime;
use crate::utils::byte_cursor::ByteCursor;
use crate::utils::text::decode_text;

/// Sample frequency code unit: 64 * 44100 Hz is coded as 4.
const SAMPLE_FREQUENCY_UNIT: u32 = 16 * 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaKind {
    #[default]
    TwoChannel,
    MultiChannel,
}

impl Display for AreaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AreaKind::TwoChannel => write!(f, "2-channel stereo"),
            AreaKind::MultiChannel => write!(f, "multichannel"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SacdAreaToc {
    pub kind: AreaKind,
    pub version: Version,
    /// Size of the area TOC in sectors.
    pub size: u16,
    pub max_byte_rate: u32,
    pub sample_frequency: u32,
    pub frame_format: FrameFormat,
    pub channel_count: u8,
    pub loudspeaker_config: u8,
    pub max_available_channels: u8,
    pub area_mute_flags: u8,
    pub track_attribute: u8,
    pub total_playtime: TrackTime,
    pub track_offset: u8,
    pub track_count: u8,
    pub track_start: u32,
    pub track_end: u32,
    pub text_channel_count: u8,
    pub locales: Vec<LocaleTable>,
    pub track_text_offset: u16,
    pub index_list_offset: u16,
    pub access_list_offset: u16,
    pub area_description: String,
    pub copyright: String,
    pub area_description_phonetic: String,
    pub copyright_phonetic: String,
}

impl SacdAreaToc {
    pub fn read(cursor: &mut ByteCursor) -> Option<Self> {
        let start = cursor.position();
        let kind = match &cursor.read_magic() {
            m if m == TWO_CHANNEL_TOC_SIGN => AreaKind::TwoChannel,
            m if m == MULTI_CHANNEL_TOC_SIGN => AreaKind::MultiChannel,
            _ => {
                cursor.seek(start);
                return None;
            }
        };

        let version = Version::read(cursor);
        let size = cursor.read_u16();
        cursor.skip(4);
        let max_byte_rate = cursor.read_u32();
        let sample_frequency = cursor.read_u8() as u32 * SAMPLE_FREQUENCY_UNIT;
        let frame_format = FrameFormat::from(cursor.read_u8());
        cursor.skip(10);
        let channel_count = cursor.read_u8();
        let loudspeaker_config = cursor.read_u8();
        let max_available_channels = cursor.read_u8();
        let area_mute_flags = cursor.read_u8();
        cursor.skip(12);
        let track_attribute = cursor.read_u8();
        cursor.skip(15);
        let total_playtime = TrackTime::read(cursor);
        cursor.skip(1);
        let track_offset = cursor.read_u8();
        let track_count = cursor.read_u8();
        cursor.skip(2);
        let track_start = cursor.read_u32();
        let track_end = cursor.read_u32();
        let text_channel_count = cursor.read_u8();
        cursor.skip(7);
        let locales = read_locales(cursor);
        cursor.skip(8);
        let track_text_offset = cursor.read_u16();
        let index_list_offset = cursor.read_u16();
        let access_list_offset = cursor.read_u16();
        cursor.skip(10);
        let area_description_offset = cursor.read_u16();
        let copyright_offset = cursor.read_u16();
        let area_description_phonetic_offset = cursor.read_u16();
        let copyright_phonetic_offset = cursor.read_u16();

        let charset = locales
            .first()
            .map(|l| l.character_set)
            .unwrap_or_default();
        let data = cursor.data();
        let text = |offset: u16| record_text(data, start, offset, charset);

        let toc = Self {
            kind,
            version,
            size,
            max_byte_rate,
            sample_frequency,
            frame_format,
            channel_count,
            loudspeaker_config,
            max_available_channels,
            area_mute_flags,
            track_attribute,
            total_playtime,
            track_offset,
            track_count,
            track_start,
            track_end,
            text_channel_count,
            locales,
            track_text_offset,
            index_list_offset,
            access_list_offset,
            area_description: text(area_description_offset),
            copyright: text(copyright_offset),
            area_description_phonetic: text(area_description_phonetic_offset),
            copyright_phonetic: text(copyright_phonetic_offset),
        };
        trace!("{toc:?}");

        Some(toc)
    }

    pub fn is_dst(&self) -> bool {
        self.frame_format == FrameFormat::Dst
    }

    pub fn character_set(&self) -> CharacterSet {
        self.locales
            .first()
            .map(|l| l.character_set)
            .unwrap_or_default()
    }
}

/// NUL-terminated string at a record-relative byte offset. Zero means absent.
pub(crate) fn record_text(
    data: &[u8],
    record_start: usize,
    offset: u16,
    charset: CharacterSet,
) -> String {
    if offset == 0 {
        return String::new();
    }

    let mut cursor = ByteCursor::with_position(data, record_start + offset as usize);
    decode_text(cursor.read_c_string_bytes(), charset)
}
