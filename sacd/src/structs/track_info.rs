//! Per-track tables of an audio area.
//!
//! - `SACDTRL1` ([`SacdTrackOffset`]): start sector and length of each track
//! - `SACDTRL2` ([`SacdTrackTime`]): start time code and duration
//! - `SACDTTxt` ([`SacdTrackText`]): title, performer and friends
//!
//! The two list records hold two parallel arrays of 255 slots each; only the
//! first `track_count` slots are meaningful.

use std::collections::BTreeMap;

use log::{trace, warn};

use crate::structs::scarlet_book::{
    CharacterSet, MAX_TRACK_SLOTS, TRACK_LIST_OFFSET_SIGN, TRACK_LIST_TIME_SIGN, TRACK_TEXT_SIGN,
    TrackTextKind,
};
use crate::structs::track_time::TrackTime;
use crate::utils::byte_cursor::ByteCursor;
use crate::utils::text::decode_text;

/// Record-relative offset of the second array in the track list records.
pub const TRACK_LIST_SECOND_ARRAY: usize = MAX_TRACK_SLOTS * 4 + 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SacdTrackOffset {
    pub start_sector: u32,
    pub length_sectors: u32,
    /// Last sector of the track, inclusive.
    pub end_sector: u32,
}

impl SacdTrackOffset {
    pub fn read(cursor: &mut ByteCursor, track_count: usize) -> Option<Vec<Self>> {
        let start = cursor.position();
        if cursor.read_magic() != *TRACK_LIST_OFFSET_SIGN {
            trace!("No SACDTRL1 at {start}");
            cursor.seek(start);
            return None;
        }

        let track_count = track_count.min(MAX_TRACK_SLOTS);
        let starts: Vec<u32> = (0..track_count).map(|_| cursor.read_u32()).collect();
        cursor.seek(start + TRACK_LIST_SECOND_ARRAY);

        Some(
            starts
                .into_iter()
                .map(|start_sector| {
                    let length_sectors = cursor.read_u32();
                    Self {
                        start_sector,
                        length_sectors,
                        end_sector: start_sector.saturating_add(length_sectors).saturating_sub(1),
                    }
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SacdTrackTime {
    pub start: TrackTime,
    pub duration: TrackTime,
    pub end: TrackTime,
}

impl SacdTrackTime {
    pub fn read(cursor: &mut ByteCursor, track_count: usize) -> Option<Vec<Self>> {
        let start = cursor.position();
        if cursor.read_magic() != *TRACK_LIST_TIME_SIGN {
            trace!("No SACDTRL2 at {start}");
            cursor.seek(start);
            return None;
        }

        let read_slot = |cursor: &mut ByteCursor| {
            let time = TrackTime::read(cursor);
            cursor.skip(1);
            time
        };

        let track_count = track_count.min(MAX_TRACK_SLOTS);
        let starts: Vec<TrackTime> = (0..track_count).map(|_| read_slot(cursor)).collect();
        cursor.seek(start + TRACK_LIST_SECOND_ARRAY);

        Some(
            starts
                .into_iter()
                .map(|start| {
                    let duration = read_slot(cursor);
                    Self {
                        start,
                        duration,
                        end: start + duration,
                    }
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SacdTrackText {
    pub fields: BTreeMap<TrackTextKind, String>,
}

impl SacdTrackText {
    /// Reads the text of every track. Offsets are relative to the record
    /// start; a track whose offset points outside the buffer gets no text.
    pub fn read(
        cursor: &mut ByteCursor,
        track_count: usize,
        charset: CharacterSet,
    ) -> Option<Vec<Self>> {
        let start = cursor.position();
        if cursor.read_magic() != *TRACK_TEXT_SIGN {
            trace!("No SACDTTxt at {start}");
            cursor.seek(start);
            return None;
        }

        let offsets: Vec<u16> = (0..track_count).map(|_| cursor.read_u16()).collect();

        let texts = offsets
            .into_iter()
            .enumerate()
            .map(|(track, offset)| {
                let pos = start + offset as usize;
                if offset == 0 || pos >= cursor.len() {
                    warn!("Track {} text offset {offset} out of range", track + 1);
                    return Self::default();
                }

                cursor.seek(pos);
                let type_count = cursor.read_u8();
                cursor.skip(3);

                let mut fields = BTreeMap::new();
                for _ in 0..type_count {
                    let kind = TrackTextKind::from(cursor.read_u8());
                    cursor.skip(1);
                    let text = decode_text(cursor.read_c_string_padded_bytes(), charset);
                    fields.insert(kind, text);
                }

                Self { fields }
            })
            .collect();

        Some(texts)
    }

    pub fn get(&self, kind: TrackTextKind) -> Option<&str> {
        self.fields
            .get(&kind)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.get(TrackTextKind::Title)
    }

    pub fn performer(&self) -> Option<&str> {
        self.get(TrackTextKind::Performer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn track_offset_record(tracks: &[(u32, u32)]) -> Vec<u8> {
        let mut rec = vec![0u8; 2048];
        rec[..8].copy_from_slice(TRACK_LIST_OFFSET_SIGN);
        for (i, (start, len)) in tracks.iter().enumerate() {
            rec[8 + i * 4..12 + i * 4].copy_from_slice(&start.to_be_bytes());
            let at = TRACK_LIST_SECOND_ARRAY + i * 4;
            rec[at..at + 4].copy_from_slice(&len.to_be_bytes());
        }
        rec
    }

    pub fn track_time_record(tracks: &[(TrackTime, TrackTime)]) -> Vec<u8> {
        let mut rec = vec![0u8; 2048];
        rec[..8].copy_from_slice(TRACK_LIST_TIME_SIGN);
        for (i, (start, duration)) in tracks.iter().enumerate() {
            rec[8 + i * 4..11 + i * 4].copy_from_slice(&[
                start.minutes,
                start.seconds,
                start.frames,
            ]);
            let at = TRACK_LIST_SECOND_ARRAY + i * 4;
            rec[at..at + 3].copy_from_slice(&[duration.minutes, duration.seconds, duration.frames]);
        }
        rec
    }

    /// Four sector track text record; each track gets the given (tag, text) entries.
    pub fn track_text_record(tracks: &[Vec<(u8, &str)>]) -> Vec<u8> {
        let mut rec = vec![0u8; 4 * 2048];
        rec[..8].copy_from_slice(TRACK_TEXT_SIGN);

        let mut pos = 8 + tracks.len() * 2;
        pos = (pos + 3) & !3;
        for (i, entries) in tracks.iter().enumerate() {
            rec[8 + i * 2..10 + i * 2].copy_from_slice(&(pos as u16).to_be_bytes());
            rec[pos] = entries.len() as u8;
            pos += 4;
            for (tag, text) in entries {
                rec[pos] = *tag;
                pos += 2;
                rec[pos..pos + text.len()].copy_from_slice(text.as_bytes());
                pos += text.len() + 1;
                pos = (pos + 3) & !3;
            }
        }
        rec
    }

    #[test]
    fn test_track_offsets() {
        let rec = track_offset_record(&[(552, 20), (572, 28)]);
        let offsets = SacdTrackOffset::read(&mut ByteCursor::new(&rec), 2).expect("trl1");

        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].start_sector, 552);
        assert_eq!(offsets[0].end_sector, 571);
        assert_eq!(offsets[1].length_sectors, 28);
        assert_eq!(offsets[1].end_sector, 599);
    }

    #[test]
    fn test_track_offsets_saturate() {
        let rec = track_offset_record(&[(0xFFFF_FFF0, 0x100), (600, 0)]);
        let offsets = SacdTrackOffset::read(&mut ByteCursor::new(&rec), 2).expect("trl1");

        assert_eq!(offsets[0].end_sector, u32::MAX - 1);
        assert_eq!(offsets[1].end_sector, 599);
    }

    #[test]
    fn test_track_times() {
        let rec = track_time_record(&[
            (TrackTime::new(0, 2, 0), TrackTime::new(3, 59, 70)),
            (TrackTime::new(4, 1, 70), TrackTime::new(0, 10, 10)),
        ]);
        let times = SacdTrackTime::read(&mut ByteCursor::new(&rec), 2).expect("trl2");

        assert_eq!(times[0].end, TrackTime::new(4, 1, 70));
        assert_eq!(times[1].start, times[0].end);
        assert_eq!(times[1].duration.duration(), 10);
    }

    #[test]
    fn test_track_text() {
        let rec = track_text_record(&[
            vec![(0x01, "So What"), (0x02, "Miles Davis")],
            vec![(0x01, "Blue in Green"), (0x44, "?")],
        ]);
        let texts =
            SacdTrackText::read(&mut ByteCursor::new(&rec), 2, CharacterSet::Iso646).expect("text");

        assert_eq!(texts[0].title(), Some("So What"));
        assert_eq!(texts[0].performer(), Some("Miles Davis"));
        assert_eq!(texts[1].title(), Some("Blue in Green"));
        assert_eq!(texts[1].performer(), None);
        assert_eq!(texts[1].get(TrackTextKind::Unknown(0x44)), Some("?"));
    }

    #[test]
    fn test_foreign_signature() {
        let rec = track_offset_record(&[(552, 20)]);
        let mut cursor = ByteCursor::new(&rec);
        assert!(SacdTrackTime::read(&mut cursor, 1).is_none());
        assert_eq!(cursor.position(), 0);
        assert!(SacdTrackText::read(&mut cursor, 1, CharacterSet::Unknown).is_none());
    }
}
