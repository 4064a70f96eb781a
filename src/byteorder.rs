pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

pub trait WriteBytesBe {
    fn write_be(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le_be {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
        impl WriteBytesBe for $t { #[inline] fn write_be(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_be_bytes()); }}
    )+ }
}

impl_num_le_be!(u8, u16, u32, u64);

macro_rules! impl_collection {
    ($trait:ident, $method:ident) => {
        impl<T: $trait> $trait for Vec<T> {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
        impl<T: $trait, const N: usize> $trait for [T; N] {
            #[inline]
            fn $method(&self, dst: &mut Vec<u8>) {
                self.iter().for_each(|item| item.$method(dst));
            }
        }
    };
}

impl_collection!(WriteBytesLe, write_le);
impl_collection!(WriteBytesBe, write_be);

/// Concatenates the big-endian encodings of the given values.
#[macro_export]
macro_rules! join_bytes_be {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::byteorder::WriteBytesBe::write_be(&$value, &mut vec); )+
        vec
    }};
}

#[cfg(test)]
mod tests {
    use crate::byteorder::{WriteBytesBe, WriteBytesLe};
    use sacdd_macros::ToBytes;

    #[derive(ToBytes)]
    struct ChannelEntry {
        count: u16,
        rate: u32,
        id: [u8; 4],
    }

    #[test]
    fn test_field_order_and_endianness() {
        let s = ChannelEntry {
            count: 0x0002,
            rate: 2_822_400,
            id: *b"SLFT",
        };

        let vec_le = &mut Vec::new();
        let vec_be = &mut Vec::new();

        s.write_le(vec_le);
        s.write_be(vec_be);

        let expected_le = [0x02, 0x00, 0x00, 0x11, 0x2B, 0x00, b'S', b'L', b'F', b'T'];
        let expected_be = [0x00, 0x02, 0x00, 0x2B, 0x11, 0x00, b'S', b'L', b'F', b'T'];

        assert_eq!(&vec_le[..], &expected_le);
        assert_eq!(&vec_be[..], &expected_be);
    }

    #[test]
    fn test_join_bytes_be() {
        let v = crate::join_bytes_be!(1u8, 0x0102u16, vec![3u8, 4]);
        assert_eq!(v, vec![1, 1, 2, 3, 4]);
    }
}
