/// Byte to bit-reversed byte (`0b0000_0001` becomes `0b1000_0000`).
pub const BIT_REVERSE_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut b = i as u8;
        b = (b & 0xF0) >> 4 | (b & 0x0F) << 4;
        b = (b & 0xCC) >> 2 | (b & 0x33) << 2;
        b = (b & 0xAA) >> 1 | (b & 0x55) << 1;
        table[i] = b;
        i += 1;
    }
    table
}

#[inline(always)]
pub fn reverse_bits(byte: u8) -> u8 {
    BIT_REVERSE_TABLE[byte as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_is_involution() {
        for b in 0..=255u8 {
            assert_eq!(reverse_bits(reverse_bits(b)), b);
            assert_eq!(reverse_bits(b), b.reverse_bits());
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(reverse_bits(0x01), 0x80);
        assert_eq!(reverse_bits(0x69), 0x96);
        assert_eq!(reverse_bits(0xF0), 0x0F);
    }
}
