//! Lenient positional reader for Scarlet Book records.
//!
//! TOC records are fixed-offset layouts inside sector buffers. Reading past
//! the end never fails: integers read as zero, strings as empty, and the
//! cursor is clamped to the end of the buffer. Callers that care about
//! truncation check [`ByteCursor::remaining`] up front.

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn with_position(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    /// Takes up to `n` bytes, fewer at the end of the buffer.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let end = self.pos.saturating_add(n).min(self.data.len());
        let out = &self.data[self.pos..end];
        self.pos = end;
        out
    }

    fn take_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let src = self.take(N);
        out[..src.len()].copy_from_slice(src);
        out
    }

    pub fn read_u8(&mut self) -> u8 {
        self.take_array::<1>()[0]
    }

    pub fn read_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take_array())
    }

    pub fn read_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take_array())
    }

    pub fn read_u16_le(&mut self) -> u16 {
        u16::from_le_bytes(self.take_array())
    }

    pub fn read_u32_le(&mut self) -> u32 {
        u32::from_le_bytes(self.take_array())
    }

    pub fn read_u64_le(&mut self) -> u64 {
        u64::from_le_bytes(self.take_array())
    }

    pub fn read_u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take_array())
    }

    /// Two consecutive big-endian `u32` words joined high word first.
    pub fn read_big_endian_u64_from_two_u32(&mut self) -> u64 {
        let hi = self.read_u32() as u64;
        let lo = self.read_u32() as u64;
        (hi << 32) | lo
    }

    pub fn read_magic(&mut self) -> [u8; 8] {
        self.take_array()
    }

    pub fn read_fourcc(&mut self) -> [u8; 4] {
        self.take_array()
    }

    /// Reads a fixed-width text field. A leading NUL marks the field unused;
    /// otherwise the text runs to the first NUL or the end of the field.
    pub fn read_fixed_string(&mut self, len: usize) -> String {
        let raw = self.take(len);
        if raw.first().is_none_or(|&b| b == 0) {
            return String::new();
        }

        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        lossy(&raw[..end]).trim_end().to_string()
    }

    /// Reads bytes up to and including the terminating NUL.
    pub fn read_c_string_bytes(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                &rest[..end]
            }
            None => {
                self.pos = self.data.len();
                rest
            }
        }
    }

    pub fn read_c_string(&mut self) -> String {
        lossy(self.read_c_string_bytes()).into_owned()
    }

    /// Like [`Self::read_c_string_bytes`] but also consumes the NUL run that
    /// pads the string to its slot.
    pub fn read_c_string_padded_bytes(&mut self) -> &'a [u8] {
        let s = self.read_c_string_bytes();
        while self.data.get(self.pos) == Some(&0) {
            self.pos += 1;
        }
        s
    }

    pub fn read_c_string_padded(&mut self) -> String {
        lossy(self.read_c_string_padded_bytes()).into_owned()
    }
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_and_clamping() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u16(), 0x1234);
        assert_eq!(cursor.read_u8(), 0x56);
        assert_eq!(cursor.read_u32(), 0x789A_0000);
        assert_eq!(cursor.position(), 5);
        assert_eq!(cursor.read_u32(), 0);
        assert_eq!(cursor.remaining(), 0);

        cursor.seek(100);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_u64_from_two_words() {
        let data = [0, 0, 0, 1, 0, 0, 0, 2];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_big_endian_u64_from_two_u32(), (1 << 32) | 2);
    }

    #[test]
    fn test_strings() {
        let data = b"ABC\0\0\0DEF\0GH";
        let mut cursor = ByteCursor::new(data);

        assert_eq!(cursor.read_c_string(), "ABC");
        assert_eq!(cursor.position(), 4);

        cursor.seek(0);
        assert_eq!(cursor.read_c_string_padded(), "ABC");
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.read_c_string(), "DEF");
        assert_eq!(cursor.read_c_string(), "GH");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_fixed_string() {
        let mut field = [0u8; 16];
        field[..5].copy_from_slice(b"SACD1");
        let mut cursor = ByteCursor::new(&field);
        assert_eq!(cursor.read_fixed_string(16), "SACD1");
        assert_eq!(cursor.position(), 16);

        let unused = [0u8, b'X', b'Y'];
        let mut cursor = ByteCursor::new(&unused);
        assert_eq!(cursor.read_fixed_string(3), "");
        assert_eq!(cursor.position(), 3);
    }
}
