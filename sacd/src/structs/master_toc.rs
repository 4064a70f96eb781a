//! Master TOC (`SACDMTOC`), the disc level table at sector 510.
//!
//! ## Layout
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0      | signature |
//! | 8      | version (major, minor) |
//! | 16     | album set size, album sequence number |
//! | 24     | album catalog number (16) |
//! | 40     | album genres (4 x 4) |
//! | 64     | area 1 TOC 1/2 start, area 2 TOC 1/2 start |
//! | 80     | disc type hybrid flag |
//! | 84     | area 1/2 TOC size |
//! | 88     | disc catalog number (16) |
//! | 104    | disc genres (4 x 4) |
//! | 120    | disc date (year, month, day) |
//! | 128    | text channel count |
//! | 136    | text channels (8 x 4) |
//!
//! "Area 1" is the two-channel area and "area 2" the multichannel area.

use log::trace;

use crate::structs::scarlet_book::{
    CharacterSet, Genre, GenreCategory, MASTER_TOC_SIGN, MAX_GENRE_COUNT, MAX_LANGUAGE_COUNT,
};
use crate::utils::byte_cursor::ByteCursor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub fn read(cursor: &mut ByteCursor) -> Self {
        Self {
            major: cursor.read_u8(),
            minor: cursor.read_u8(),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenreTable {
    pub category: GenreCategory,
    pub genre: Genre,
}

impl GenreTable {
    pub fn read(cursor: &mut ByteCursor) -> Self {
        let category = GenreCategory::from(cursor.read_u8());
        cursor.skip(2);
        let genre = Genre::from(cursor.read_u8());
        Self { category, genre }
    }

    pub fn is_used(&self) -> bool {
        self.category != GenreCategory::NotUsed
    }
}

/// One text channel: ISO 639 language code plus character set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleTable {
    pub language_code: String,
    pub character_set: CharacterSet,
}

impl LocaleTable {
    pub fn read(cursor: &mut ByteCursor) -> Self {
        let code = cursor.take(2);
        let language_code = if code.first().is_none_or(|&b| b == 0) {
            String::new()
        } else {
            String::from_utf8_lossy(code).into_owned()
        };
        let character_set = CharacterSet::from(cursor.read_u8());
        cursor.skip(1);

        Self {
            language_code,
            character_set,
        }
    }
}

pub(crate) fn read_locales(cursor: &mut ByteCursor) -> Vec<LocaleTable> {
    (0..MAX_LANGUAGE_COUNT)
        .map(|_| LocaleTable::read(cursor))
        .collect()
}

fn read_genres(cursor: &mut ByteCursor) -> [GenreTable; MAX_GENRE_COUNT] {
    std::array::from_fn(|_| GenreTable::read(cursor))
}

/// Release date from the master TOC. Zero fields mean "not specified".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl std::fmt::Display for DiscDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SacdToc {
    pub version: Version,
    pub album_set_size: u16,
    pub album_sequence_number: u16,
    pub album_catalog_number: String,
    pub album_genres: [GenreTable; MAX_GENRE_COUNT],
    pub area_1_toc_1_start: u32,
    pub area_1_toc_2_start: u32,
    pub area_2_toc_1_start: u32,
    pub area_2_toc_2_start: u32,
    pub hybrid: bool,
    pub area_1_toc_size: u16,
    pub area_2_toc_size: u16,
    pub disc_catalog_number: String,
    pub disc_genres: [GenreTable; MAX_GENRE_COUNT],
    pub disc_date: DiscDate,
    pub text_channel_count: u8,
    pub locales: Vec<LocaleTable>,
}

impl SacdToc {
    /// Reads a master TOC at the cursor. On a signature mismatch the cursor
    /// is left where it was and `None` is returned.
    pub fn read(cursor: &mut ByteCursor) -> Option<Self> {
        let start = cursor.position();
        if cursor.read_magic() != *MASTER_TOC_SIGN {
            cursor.seek(start);
            return None;
        }

        let version = Version::read(cursor);
        cursor.skip(6);
        let album_set_size = cursor.read_u16();
        let album_sequence_number = cursor.read_u16();
        cursor.skip(4);
        let album_catalog_number = cursor.read_fixed_string(16);
        let album_genres = read_genres(cursor);
        cursor.skip(8);

        let area_1_toc_1_start = cursor.read_u32();
        let area_1_toc_2_start = cursor.read_u32();
        let area_2_toc_1_start = cursor.read_u32();
        let area_2_toc_2_start = cursor.read_u32();
        let hybrid = cursor.read_u8() == 1;
        cursor.skip(3);
        let area_1_toc_size = cursor.read_u16();
        let area_2_toc_size = cursor.read_u16();
        let disc_catalog_number = cursor.read_fixed_string(16);
        let disc_genres = read_genres(cursor);

        let disc_date = DiscDate {
            year: cursor.read_u16(),
            month: cursor.read_u8(),
            day: cursor.read_u8(),
        };
        cursor.skip(4);
        let text_channel_count = cursor.read_u8().min(MAX_LANGUAGE_COUNT as u8);
        cursor.skip(7);
        let locales = read_locales(cursor);

        let toc = Self {
            version,
            album_set_size,
            album_sequence_number,
            album_catalog_number,
            album_genres,
            area_1_toc_1_start,
            area_1_toc_2_start,
            area_2_toc_1_start,
            area_2_toc_2_start,
            hybrid,
            area_1_toc_size,
            area_2_toc_size,
            disc_catalog_number,
            disc_genres,
            disc_date,
            text_channel_count,
            locales,
        };
        trace!("{toc:?}");

        Some(toc)
    }

    pub fn has_two_channel_area(&self) -> bool {
        self.area_1_toc_1_start != 0
    }

    pub fn has_multi_channel_area(&self) -> bool {
        self.area_2_toc_1_start != 0
    }

    /// Character set of the first text channel, used for master text.
    pub fn primary_character_set(&self) -> CharacterSet {
        self.locales
            .first()
            .map(|l| l.character_set)
            .unwrap_or_default()
    }

    /// First genre entry that is in use, album level before disc level.
    pub fn primary_genre(&self) -> Option<Genre> {
        self.album_genres
            .iter()
            .chain(self.disc_genres.iter())
            .find(|g| g.is_used())
            .map(|g| g.genre)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a 2048 byte master TOC record.
    pub fn master_toc_record(area_1: u32, area_2: u32) -> Vec<u8> {
        let mut rec = vec![0u8; 2048];
        rec[..8].copy_from_slice(MASTER_TOC_SIGN);
        rec[8] = 1;
        rec[9] = 20;
        rec[16..18].copy_from_slice(&1u16.to_be_bytes());
        rec[18..20].copy_from_slice(&1u16.to_be_bytes());
        rec[24..30].copy_from_slice(b"CAT-01");
        rec[40..44].copy_from_slice(&[1, 0, 0, 14]);
        rec[64..68].copy_from_slice(&area_1.to_be_bytes());
        let copy = |start: u32| if start == 0 { 0 } else { start + 3 };
        rec[68..72].copy_from_slice(&copy(area_1).to_be_bytes());
        rec[72..76].copy_from_slice(&area_2.to_be_bytes());
        rec[76..80].copy_from_slice(&copy(area_2).to_be_bytes());
        rec[80] = 1;
        rec[84..86].copy_from_slice(&3u16.to_be_bytes());
        rec[86..88].copy_from_slice(&3u16.to_be_bytes());
        rec[120..122].copy_from_slice(&2004u16.to_be_bytes());
        rec[122] = 6;
        rec[123] = 15;
        rec[128] = 1;
        rec[136..140].copy_from_slice(&[b'e', b'n', 2, 0]);
        rec
    }

    #[test]
    fn test_master_toc() {
        let rec = master_toc_record(540, 0);
        let toc = SacdToc::read(&mut ByteCursor::new(&rec)).expect("toc");

        assert_eq!(toc.version, Version { major: 1, minor: 20 });
        assert_eq!(toc.album_catalog_number, "CAT-01");
        assert_eq!(toc.album_genres[0].genre, Genre::Jazz);
        assert_eq!(toc.primary_genre(), Some(Genre::Jazz));
        assert_eq!(toc.area_1_toc_1_start, 540);
        assert_eq!(toc.area_1_toc_2_start, 543);
        assert!(toc.has_two_channel_area());
        assert!(!toc.has_multi_channel_area());
        assert!(toc.hybrid);
        assert_eq!(toc.disc_date.to_string(), "2004-06-15");
        assert_eq!(toc.locales.len(), MAX_LANGUAGE_COUNT);
        assert_eq!(toc.locales[0].language_code, "en");
        assert_eq!(toc.primary_character_set(), CharacterSet::Iso8859_1);
        assert_eq!(toc.locales[1].language_code, "");
    }

    #[test]
    fn test_wrong_signature_keeps_position() {
        let mut rec = master_toc_record(540, 0);
        rec[..8].copy_from_slice(b"TWOCHTOC");
        let mut cursor = ByteCursor::with_position(&rec, 0);

        assert!(SacdToc::read(&mut cursor).is_none());
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_magic(), *b"TWOCHTOC");
    }
}
