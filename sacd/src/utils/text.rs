use encoding_rs::{BIG5, EUC_KR, Encoding, GBK, SHIFT_JIS, UTF_8, WINDOWS_1252};

use crate::structs::scarlet_book::CharacterSet;

fn encoding_for(charset: CharacterSet) -> &'static Encoding {
    match charset {
        CharacterSet::Iso8859_1 | CharacterSet::Iso8859_1Esc => WINDOWS_1252,
        CharacterSet::Ris506 => SHIFT_JIS,
        CharacterSet::Ksc5601 => EUC_KR,
        CharacterSet::Gb2312 => GBK,
        CharacterSet::Big5 => BIG5,
        CharacterSet::Iso646 | CharacterSet::Unknown => UTF_8,
    }
}

/// Decodes a text field in the character set declared by its text channel.
///
/// Malformed sequences are replaced rather than rejected; disc text is
/// informational and frequently mislabelled.
pub fn decode_text(bytes: &[u8], charset: CharacterSet) -> String {
    let (text, _, had_errors) = encoding_for(charset).decode(bytes);
    if had_errors {
        log::debug!("Replaced malformed {charset:?} sequences in disc text");
    }
    text.trim_end_matches('\0').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1() {
        assert_eq!(decode_text(b"Caf\xE9", CharacterSet::Iso8859_1), "Café");
    }

    #[test]
    fn test_shift_jis() {
        assert_eq!(
            decode_text(b"\x83\x65\x83\x58\x83\x67", CharacterSet::Ris506),
            "テスト"
        );
    }

    #[test]
    fn test_fallback_utf8() {
        assert_eq!(decode_text("Ångström ".as_bytes(), CharacterSet::Unknown), "Ångström");
    }
}
