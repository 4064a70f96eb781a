//! Scarlet Book constants and coded enumerations.
//!
//! Values that appear as single bytes in TOC records are decoded through
//! `From<u8>` so that unknown codes fall back to a defined default instead of
//! failing the record.

use std::fmt::{Display, Formatter};

/// Logical sector size of an SACD image.
pub const SACD_LSN_SIZE: usize = 2048;

/// Physical sector size of raw 2064 byte rips (12 byte header + 2048 + 4 byte EDC).
pub const SACD_PSN_SIZE: usize = 2064;

/// Bytes preceding the user data in a physical sector.
pub const SACD_PSN_LEAD_IN: usize = 12;

/// Sector holding the first copy of the master TOC.
pub const START_OF_MASTER_TOC: u32 = 510;

/// Sector holding master text (album information).
pub const MASTER_TEXT_SECTOR: u32 = 511;

/// Sectors occupied by the per-track text area.
pub const TRACK_TEXT_SECTORS: u32 = 4;

pub const SACD_FRAME_RATE: u32 = 75;

pub const SACD_SAMPLING_FREQUENCY: u32 = 2_822_400;

pub const SAMPLES_PER_FRAME: usize = 588;

/// Bytes of one channel of DSD64 per SACD frame (588 samples * 64 / 8).
pub const FRAME_SIZE_64: usize = SAMPLES_PER_FRAME * 64 / 8;

/// Decoded size of a stereo DSD64 DST frame.
pub const DST_FRAME_OUTPUT_SIZE: usize = FRAME_SIZE_64 * 2;

pub const MAX_PACKET_SIZE: usize = 2045;

pub const MAX_PACKET_INFO_COUNT: u8 = 6;

pub const MAX_LANGUAGE_COUNT: usize = 8;

pub const MAX_GENRE_COUNT: usize = 4;

/// Upper bound of a compressed DST frame.
pub const MAX_DST_SIZE: usize = 64 * 1024;

/// Track slots in the SACDTRL1/SACDTRL2 tables.
pub const MAX_TRACK_SLOTS: usize = 255;

pub const MASTER_TOC_SIGN: &[u8; 8] = b"SACDMTOC";
pub const TWO_CHANNEL_TOC_SIGN: &[u8; 8] = b"TWOCHTOC";
pub const MULTI_CHANNEL_TOC_SIGN: &[u8; 8] = b"MULCHTOC";
pub const MASTER_TEXT_SIGN: &[u8; 8] = b"SACDText";
pub const MASTER_MAN_SIGN: &[u8; 8] = b"SACD_Man";
pub const TRACK_TEXT_SIGN: &[u8; 8] = b"SACDTTxt";
pub const TRACK_LIST_OFFSET_SIGN: &[u8; 8] = b"SACDTRL1";
pub const TRACK_LIST_TIME_SIGN: &[u8; 8] = b"SACDTRL2";
pub const INDEX_LIST_SIGN: &[u8; 8] = b"SACD_IGL";
pub const ACCESS_LIST_SIGN: &[u8; 8] = b"SACD_ACC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Dst,
    Dsd3In14,
    Dsd3In16,
}

impl From<u8> for FrameFormat {
    fn from(value: u8) -> Self {
        match value {
            2 => Self::Dsd3In14,
            3 => Self::Dsd3In16,
            _ => Self::Dst,
        }
    }
}

impl Display for FrameFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dst => write!(f, "DST"),
            Self::Dsd3In14 => write!(f, "DSD 3 in 14"),
            Self::Dsd3In16 => write!(f, "DSD 3 in 16"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterSet {
    #[default]
    Unknown,
    Iso646,
    Iso8859_1,
    Ris506,
    Ksc5601,
    Gb2312,
    Big5,
    Iso8859_1Esc,
}

impl From<u8> for CharacterSet {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            1 => Self::Iso646,
            2 => Self::Iso8859_1,
            3 => Self::Ris506,
            4 => Self::Ksc5601,
            5 => Self::Gb2312,
            6 => Self::Big5,
            7 => Self::Iso8859_1Esc,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenreCategory {
    #[default]
    NotUsed,
    General,
    Japanese,
}

impl From<u8> for GenreCategory {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::General,
            2 => Self::Japanese,
            _ => Self::NotUsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Genre {
    #[default]
    Other,
    NotDefined,
    AdultContemporary,
    AlternativeRock,
    ChildrensMusic,
    Classical,
    ContemporaryChristian,
    Country,
    Dance,
    EasyListening,
    Erotic,
    Folk,
    Gospel,
    HipHop,
    Jazz,
    Latin,
    Musical,
    NewAge,
    Opera,
    Operetta,
    PopMusic,
    Rap,
    Reggae,
    RockMusic,
    RhythmAndBlues,
    SoundEffects,
    SoundTrack,
    SpokenWord,
    WorldMusic,
    Blues,
}

const GENRES: [Genre; 30] = [
    Genre::Other,
    Genre::NotDefined,
    Genre::AdultContemporary,
    Genre::AlternativeRock,
    Genre::ChildrensMusic,
    Genre::Classical,
    Genre::ContemporaryChristian,
    Genre::Country,
    Genre::Dance,
    Genre::EasyListening,
    Genre::Erotic,
    Genre::Folk,
    Genre::Gospel,
    Genre::HipHop,
    Genre::Jazz,
    Genre::Latin,
    Genre::Musical,
    Genre::NewAge,
    Genre::Opera,
    Genre::Operetta,
    Genre::PopMusic,
    Genre::Rap,
    Genre::Reggae,
    Genre::RockMusic,
    Genre::RhythmAndBlues,
    Genre::SoundEffects,
    Genre::SoundTrack,
    Genre::SpokenWord,
    Genre::WorldMusic,
    Genre::Blues,
];

impl From<u8> for Genre {
    fn from(value: u8) -> Self {
        GENRES.get(value as usize).copied().unwrap_or(Genre::Other)
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Genre::NotDefined => "Not defined",
            Genre::AdultContemporary => "Adult Contemporary",
            Genre::AlternativeRock => "Alternative Rock",
            Genre::ChildrensMusic => "Children's Music",
            Genre::Classical => "Classical",
            Genre::ContemporaryChristian => "Contemporary Christian",
            Genre::Country => "Country",
            Genre::Dance => "Dance",
            Genre::EasyListening => "Easy Listening",
            Genre::Erotic => "Erotic",
            Genre::Folk => "Folk",
            Genre::Gospel => "Gospel",
            Genre::HipHop => "Hip Hop",
            Genre::Jazz => "Jazz",
            Genre::Latin => "Latin",
            Genre::Musical => "Musical",
            Genre::NewAge => "New Age",
            Genre::Opera => "Opera",
            Genre::Operetta => "Operetta",
            Genre::PopMusic => "Pop Music",
            Genre::Rap => "Rap",
            Genre::Reggae => "Reggae",
            Genre::RockMusic => "Rock Music",
            Genre::RhythmAndBlues => "Rhythm & Blues",
            Genre::SoundEffects => "Sound Effects",
            Genre::SoundTrack => "Sound Track",
            Genre::SpokenWord => "Spoken Word",
            Genre::WorldMusic => "World Music",
            Genre::Blues => "Blues",
            Genre::Other => "Other",
        };
        write!(f, "{name}")
    }
}

/// Kind of an entry in the per-track text area.
///
/// The high bit selects the phonetic variant of the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackTextKind {
    Title,
    Performer,
    Songwriter,
    Composer,
    Arranger,
    Message,
    ExtraMessage,
    TitlePhonetic,
    PerformerPhonetic,
    SongwriterPhonetic,
    ComposerPhonetic,
    ArrangerPhonetic,
    MessagePhonetic,
    ExtraMessagePhonetic,
    Unknown(u8),
}

impl From<u8> for TrackTextKind {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Title,
            0x02 => Self::Performer,
            0x03 => Self::Songwriter,
            0x04 => Self::Composer,
            0x05 => Self::Arranger,
            0x06 => Self::Message,
            0x07 => Self::ExtraMessage,
            0x81 => Self::TitlePhonetic,
            0x82 => Self::PerformerPhonetic,
            0x83 => Self::SongwriterPhonetic,
            0x84 => Self::ComposerPhonetic,
            0x85 => Self::ArrangerPhonetic,
            0x86 => Self::MessagePhonetic,
            0x87 => Self::ExtraMessagePhonetic,
            other => Self::Unknown(other),
        }
    }
}

impl Display for TrackTextKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "Title"),
            Self::Performer => write!(f, "Performer"),
            Self::Songwriter => write!(f, "Songwriter"),
            Self::Composer => write!(f, "Composer"),
            Self::Arranger => write!(f, "Arranger"),
            Self::Message => write!(f, "Message"),
            Self::ExtraMessage => write!(f, "Extra message"),
            Self::TitlePhonetic => write!(f, "Title (phonetic)"),
            Self::PerformerPhonetic => write!(f, "Performer (phonetic)"),
            Self::SongwriterPhonetic => write!(f, "Songwriter (phonetic)"),
            Self::ComposerPhonetic => write!(f, "Composer (phonetic)"),
            Self::ArrangerPhonetic => write!(f, "Arranger (phonetic)"),
            Self::MessagePhonetic => write!(f, "Message (phonetic)"),
            Self::ExtraMessagePhonetic => write!(f, "Extra message (phonetic)"),
            Self::Unknown(tag) => write!(f, "Unknown ({tag:#04X})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioPacketDataType {
    Audio,
    #[default]
    Supplementary,
    Padding,
}

impl From<u8> for AudioPacketDataType {
    fn from(value: u8) -> Self {
        match value {
            2 => Self::Audio,
            7 => Self::Padding,
            _ => Self::Supplementary,
        }
    }
}

impl AudioPacketDataType {
    pub fn code(self) -> u8 {
        match self {
            Self::Audio => 2,
            Self::Supplementary => 3,
            Self::Padding => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coded_defaults() {
        assert_eq!(FrameFormat::from(0), FrameFormat::Dst);
        assert_eq!(FrameFormat::from(3), FrameFormat::Dsd3In16);
        assert_eq!(FrameFormat::from(9), FrameFormat::Dst);

        assert_eq!(AudioPacketDataType::from(2), AudioPacketDataType::Audio);
        assert_eq!(AudioPacketDataType::from(7), AudioPacketDataType::Padding);
        assert_eq!(
            AudioPacketDataType::from(5),
            AudioPacketDataType::Supplementary
        );

        assert_eq!(Genre::from(5), Genre::Classical);
        assert_eq!(Genre::from(29), Genre::Blues);
        assert_eq!(Genre::from(30), Genre::Other);

        assert_eq!(CharacterSet::from(0x0B), CharacterSet::Ris506);
        assert_eq!(TrackTextKind::from(0x82), TrackTextKind::PerformerPhonetic);
        assert_eq!(TrackTextKind::from(0x10), TrackTextKind::Unknown(0x10));
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(FRAME_SIZE_64, 4704);
        assert_eq!(DST_FRAME_OUTPUT_SIZE, 9408);
        assert_eq!(SACD_SAMPLING_FREQUENCY / SACD_FRAME_RATE, 37632);
    }
}
