//! Master text (`SACDText`) at sector 511: album and disc strings.

use log::trace;

use crate::structs::area_toc::record_text;
use crate::structs::scarlet_book::{CharacterSet, MASTER_TEXT_SIGN};
use crate::utils::byte_cursor::ByteCursor;

/// Offset of the string pool from the start of the record.
pub const MASTER_TEXT_POOL_START: usize = 48;
pub const MASTER_TEXT_POOL_SIZE: usize = 1024;

const MASTER_TEXT_FIELDS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SacdAlbumInfo {
    pub album_title: String,
    pub album_artist: String,
    pub album_publisher: String,
    pub album_copyright: String,
    pub album_title_phonetic: String,
    pub album_artist_phonetic: String,
    pub album_publisher_phonetic: String,
    pub album_copyright_phonetic: String,
    pub disc_title: String,
    pub disc_artist: String,
    pub disc_publisher: String,
    pub disc_copyright: String,
    pub disc_title_phonetic: String,
    pub disc_artist_phonetic: String,
    pub disc_publisher_phonetic: String,
    pub disc_copyright_phonetic: String,
}

impl SacdAlbumInfo {
    /// Returns `None` for a foreign signature or when every offset is zero.
    pub fn read(cursor: &mut ByteCursor, charset: CharacterSet) -> Option<Self> {
        let start = cursor.position();
        if cursor.read_magic() != *MASTER_TEXT_SIGN {
            cursor.seek(start);
            return None;
        }
        cursor.skip(8);

        let offsets: [u16; MASTER_TEXT_FIELDS] = std::array::from_fn(|_| cursor.read_u16());
        if offsets.iter().all(|&o| o == 0) {
            trace!("Master text present but empty");
            return None;
        }

        // Strings live in the pool; anything pointing outside it is ignored.
        let pool_end = start + MASTER_TEXT_POOL_START + MASTER_TEXT_POOL_SIZE;
        let data = cursor.data();
        let data = &data[..pool_end.min(data.len())];
        let [
            album_title,
            album_artist,
            album_publisher,
            album_copyright,
            album_title_phonetic,
            album_artist_phonetic,
            album_publisher_phonetic,
            album_copyright_phonetic,
            disc_title,
            disc_artist,
            disc_publisher,
            disc_copyright,
            disc_title_phonetic,
            disc_artist_phonetic,
            disc_publisher_phonetic,
            disc_copyright_phonetic,
        ] = offsets.map(|offset| {
            if (offset as usize) < MASTER_TEXT_POOL_START {
                String::new()
            } else {
                record_text(data, start, offset, charset)
            }
        });

        cursor.seek(start + MASTER_TEXT_POOL_START);

        Some(Self {
            album_title,
            album_artist,
            album_publisher,
            album_copyright,
            album_title_phonetic,
            album_artist_phonetic,
            album_publisher_phonetic,
            album_copyright_phonetic,
            disc_title,
            disc_artist,
            disc_publisher,
            disc_copyright,
            disc_title_phonetic,
            disc_artist_phonetic,
            disc_publisher_phonetic,
            disc_copyright_phonetic,
        })
    }

    /// Album title, or the disc title for single-disc releases that only fill
    /// in the disc fields.
    pub fn title(&self) -> Option<&str> {
        [&self.album_title, &self.disc_title]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
    }

    pub fn artist(&self) -> Option<&str> {
        [&self.album_artist, &self.disc_artist]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Master text record with an album title and artist.
    pub fn master_text_record(title: &str, artist: &str) -> Vec<u8> {
        let mut rec = vec![0u8; 2048];
        rec[..8].copy_from_slice(MASTER_TEXT_SIGN);

        let title_at = MASTER_TEXT_POOL_START;
        let artist_at = title_at + title.len() + 1;
        rec[16..18].copy_from_slice(&(title_at as u16).to_be_bytes());
        rec[18..20].copy_from_slice(&(artist_at as u16).to_be_bytes());
        rec[title_at..title_at + title.len()].copy_from_slice(title.as_bytes());
        rec[artist_at..artist_at + artist.len()].copy_from_slice(artist.as_bytes());
        rec
    }

    #[test]
    fn test_album_info() {
        let rec = master_text_record("Kind of Blue", "Miles Davis");
        let info =
            SacdAlbumInfo::read(&mut ByteCursor::new(&rec), CharacterSet::Iso646).expect("text");

        assert_eq!(info.album_title, "Kind of Blue");
        assert_eq!(info.album_artist, "Miles Davis");
        assert_eq!(info.album_publisher, "");
        assert_eq!(info.disc_title, "");
        assert_eq!(info.title(), Some("Kind of Blue"));
        assert_eq!(info.artist(), Some("Miles Davis"));
    }

    #[test]
    fn test_empty_or_foreign() {
        let mut rec = vec![0u8; 2048];
        rec[..8].copy_from_slice(MASTER_TEXT_SIGN);
        assert!(SacdAlbumInfo::read(&mut ByteCursor::new(&rec), CharacterSet::Unknown).is_none());

        rec[..8].copy_from_slice(b"SACD_Man");
        let mut cursor = ByteCursor::new(&rec);
        assert!(SacdAlbumInfo::read(&mut cursor, CharacterSet::Unknown).is_none());
        assert_eq!(cursor.position(), 0);
    }
}
